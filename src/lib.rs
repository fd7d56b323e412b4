#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # bgremove-client
//!
//! Background removal through a remote image edit service, with the
//! upload → process → download flow modelled as an explicit state machine.
//!
//! The crate has two halves:
//!
//! - **Remote client**: [`ClaidClient`] sends one image (as a data URI) to the
//!   image edit API, asks for `remove_background` with PNG output, and
//!   fetches the result from the temporary URL the service returns.
//! - **Flow controller**: [`FlowController`] tracks what the user has
//!   uploaded, whether a removal is running, the result and the last error,
//!   and builds the `<name>_nobg.png` download.
//!
//! ## Features
//!
//! - **Typed transfer object**: [`ImageDataUri`] always carries its MIME type
//! - **Tagged responses**: [`EditOutcome`] separates "fetch from URL" from
//!   "result inline"
//! - **Injected configuration**: [`ClientConfig`] holds the credential;
//!   nothing is read from the environment behind your back
//! - **Stale result protection**: results for superseded requests are dropped
//! - **CLI Integration**: Optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgremove_client::{
//!     services::{save_download, SelectedFile},
//!     ClaidClient, FlowController, FlowEvent, Phase,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Reads CLAID_API_KEY (and optional CLAID_API_URL) once, here
//! let client = ClaidClient::from_env()?;
//!
//! let mut flow = FlowController::new();
//! flow.handle(FlowEvent::FileSelected(SelectedFile::from_path("photo.jpg")))?;
//! flow.remove_background(&client).await?;
//!
//! if flow.phase() == Phase::Done {
//!     let download = flow.download()?;
//!     save_download(&download, ".")?; // writes ./photo_nobg.png
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface, spinner and tracing setup
//! - `tracing-json`: JSON log output for the CLI
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! bgremove-client = { version = "0.1", default-features = false }
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod remote;
pub mod services;
pub mod tracing_config;
pub mod types;

// Public API exports
pub use config::{ApiKey, ClientConfig, ClientConfigBuilder};
pub use controller::{
    FlowController, FlowEffect, FlowError, FlowEvent, FlowState, Phase, RemovalTicket, Upload,
};
pub use error::{BgRemovalError, Result};
pub use remote::{BackgroundRemover, ClaidClient, EditOutcome};
pub use services::{save_download, SelectedFile};
pub use types::{download_file_name, Download, ImageDataUri};

pub use tracing_config::{TracingConfig, TracingFormat};

#[cfg(feature = "cli")]
pub use tracing_config::init_cli_tracing;

/// Remove the background from a data URI using configuration from the environment
///
/// Convenience wrapper for one-off calls; hold on to a [`ClaidClient`] when
/// making several.
///
/// # Examples
///
/// ```rust,no_run
/// # async fn example() -> anyhow::Result<()> {
/// let input = "data:image/jpeg;base64,/9j/4AAQSkZJRg==";
/// let output = bgremove_client::remove_background(input).await?;
/// assert!(output.starts_with("data:"));
/// # Ok(())
/// # }
/// ```
pub async fn remove_background(image: &str) -> Result<String> {
    let image: ImageDataUri = image.parse()?;
    let client = ClaidClient::from_env()?;
    let output = client.remove_background(&image).await?;
    Ok(output.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_malformed_input_before_any_io() {
        let err = remove_background("not a data uri").await.unwrap_err();
        assert!(matches!(err, BgRemovalError::InvalidDataUri(_)));
    }
}
