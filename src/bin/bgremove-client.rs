//! Background removal CLI tool
//!
//! Command-line front end for the bgremove-client library: loads an image,
//! sends it to the remote background removal service and saves the result.

#[cfg(feature = "cli")]
use bgremove_client::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
