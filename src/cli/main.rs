//! Background Removal CLI Tool
//!
//! Drives one upload through the flow controller: select → remove → download.

use super::config::CliConfigBuilder;
use crate::{
    controller::{FlowController, FlowError, FlowEvent, FlowState},
    remote::{BackgroundRemover, ClaidClient},
    services::{save_download, SelectedFile},
    tracing_config::{events, init_cli_tracing, spans, TracingFormat},
};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, Instrument};

/// Remove the background from an image using a remote image edit service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-client")]
pub struct Cli {
    /// Image to remove the background from
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory the result is saved to [default: your downloads folder]
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Service credential
    #[arg(long, env = "CLAID_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Image edit endpoint
    #[arg(long, env = "CLAID_API_URL")]
    pub api_url: Option<String>,

    /// Request timeout in seconds [default: no timeout]
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output: console, compact (no colors), or json when built with it
    #[arg(long, value_name = "FORMAT", default_value = "console")]
    pub log_format: TracingFormat,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = init_cli_tracing(cli.verbose, cli.log_format).context("Failed to initialize tracing")?;

    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;
    let output_dir = CliConfigBuilder::output_dir(&cli);
    debug!(config = ?config, output_dir = %output_dir.display(), "Configuration resolved");

    let remover = ClaidClient::new(config.clone())
        .context("Failed to create background removal client")?;

    let start_time = Instant::now();
    let saved = run(&cli.input, &remover, &output_dir)
        .instrument(spans::session(&session_id, &config.endpoint))
        .await?;

    println!("✅ Saved {}", saved.display());
    debug!(elapsed_ms = start_time.elapsed().as_millis() as u64, "Done");
    Ok(())
}

/// Take one file through the whole flow and return where the result was saved
async fn run(input: &Path, remover: &dyn BackgroundRemover, output_dir: &Path) -> Result<PathBuf> {
    let file = SelectedFile::from_path(input);
    let span = spans::upload(file.name());
    let mut controller = FlowController::new();

    async {
        controller
            .handle(FlowEvent::FileSelected(file))
            .map_err(|e| explain(&e))
            .with_context(|| format!("Cannot use {}", input.display()))?;
        if let Some(preview) = controller.preview() {
            events::progress(&format!(
                "🖼️  Loaded {} ({}, {} bytes)",
                input.display(),
                preview.mime_type(),
                preview.decoded_len()
            ));
        }

        let spinner = create_spinner("Removing background, please wait...");
        let outcome = controller.remove_background(remover).await;
        spinner.finish_and_clear();
        outcome.map_err(|e| explain(&e))?;

        if let FlowState::Error { message, cause, .. } = controller.state() {
            anyhow::bail!("{message} ({cause})");
        }

        let download = controller.download().map_err(|e| explain(&e))?;
        save_download(&download, output_dir).context("Failed to save the processed image")
    }
    .instrument(span)
    .await
}

/// Turn a controller error into an error carrying any detail it holds
fn explain(error: &FlowError) -> anyhow::Error {
    match error {
        FlowError::Validation { content_type } => {
            anyhow::anyhow!("{error} (detected content type: {content_type})")
        },
        FlowError::Preview { reason } | FlowError::Download { reason } => {
            anyhow::anyhow!("{error} ({reason})")
        },
        other => anyhow::anyhow!("{other}"),
    }
}

fn create_spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use clap::CommandFactory;
    use mockito::Server;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_config(endpoint: &str, key: Option<&str>) -> ClientConfig {
        let mut builder = ClientConfig::builder().endpoint(endpoint);
        if let Some(key) = key {
            builder = builder.api_key(key);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "bgremove-client",
            "photo.jpg",
            "-o",
            "out",
            "--timeout-secs",
            "20",
            "-vv",
            "--log-format",
            "compact",
        ])
        .unwrap();

        assert_eq!(cli.input, PathBuf::from("photo.jpg"));
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert_eq!(cli.timeout_secs, Some(20));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, TracingFormat::Compact);

        let cli = Cli::try_parse_from(["bgremove-client", "photo.jpg"]).unwrap();
        assert_eq!(cli.log_format, TracingFormat::Console);
        assert!(Cli::try_parse_from(["bgremove-client", "a.png", "--log-format", "xml"]).is_err());
    }

    #[tokio::test]
    async fn test_run_saves_result() {
        let mut server = Server::new_async().await;
        let tmp_url = format!("{}/tmp/out.png", server.url());
        let _edit = server
            .mock("POST", "/edit")
            .with_status(200)
            .with_body(json!({ "status": "succeeded", "output": { "tmp_url": tmp_url } }).to_string())
            .create_async()
            .await;
        let _fetch = server
            .mock("GET", "/tmp/out.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(b"no-background")
            .create_async()
            .await;

        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("portrait.jpeg");
        std::fs::write(&input, b"jpeg-bytes").unwrap();
        let output_dir = temp_dir.path().join("downloads");

        let client = ClaidClient::new(test_config(&format!("{}/edit", server.url()), Some("k")))
            .unwrap();
        let saved = run(&input, &client, &output_dir).await.unwrap();

        assert_eq!(saved, output_dir.join("portrait_nobg.png"));
        assert_eq!(std::fs::read(saved).unwrap(), b"no-background");
    }

    #[tokio::test]
    async fn test_run_reports_missing_key() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("portrait.png");
        std::fs::write(&input, b"png-bytes").unwrap();

        let client = ClaidClient::new(test_config("http://127.0.0.1:1/edit", None)).unwrap();
        let err = run(&input, &client, temp_dir.path()).await.unwrap_err();

        let message = format!("{err:#}");
        assert!(message.contains("Failed to remove background"));
        assert!(message.contains("CLAID_API_KEY is not configured."));
    }

    #[tokio::test]
    async fn test_run_rejects_non_images() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("notes.txt");
        std::fs::write(&input, b"text").unwrap();

        let client = ClaidClient::new(test_config("http://127.0.0.1:1/edit", Some("k"))).unwrap();
        let err = run(&input, &client, temp_dir.path()).await.unwrap_err();

        assert!(format!("{err:#}").contains("Please upload a valid image file"));
    }
}
