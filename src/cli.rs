///
/// This module implements the CLI interface for harpin-upload: argument parsing,
/// wiring settings and credentials into the core workflow, and the final summary.
///
/// All workflow logic (validation, concurrency gate, upload orchestration,
/// retries) lives in the [`harpin-upload-core`] crate. This module is strictly
/// CLI glue.
///
/// ## How To Use
/// - Command line: `harpin-upload <SOURCE_ID> <FILE>` with `HARPIN_CLIENT_ID`
///   and `HARPIN_REFRESH_TOKEN` set (a `.env` file works too).
/// - Programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`harpin-upload-core`]: ../../harpin-upload-core/
use crate::load_config::load_config;
use crate::progress::TransferBar;
use clap::Parser;
use harpin_upload_core::client::HarpinClient;
use harpin_upload_core::contract::Credentials;
use harpin_upload_core::error::UploadError;
use harpin_upload_core::ingest::{run_upload, UploadReport};
use harpin_upload_core::progress::{NoProgress, ProgressObserver};
use std::path::PathBuf;
use std::sync::Arc;

const BANNER_WIDTH: usize = 60;

/// Upload a CSV file to harpin AI and wait until it is imported.
#[derive(Parser, Debug)]
#[clap(
    name = "harpin-upload",
    version,
    about = "Upload a CSV file to harpin AI and wait until it is imported",
    after_help = "Environment variables required:\n  \
        HARPIN_CLIENT_ID      Client ID for authentication\n  \
        HARPIN_REFRESH_TOKEN  Refresh token for authentication\n\n\
        Exit codes:\n  \
        0  Success (import completed)\n  \
        1  User error (bad arguments, file not found, invalid source, auth failure, concurrency limit)\n  \
        2  System error (API errors, network failures after retries, upload or import failed)\n\n\
        Example:\n  harpin-upload vMiY4q data_2026_01_06.csv"
)]
pub struct Cli {
    /// Source ID to upload into (must be a flatFile source)
    pub source_id: String,

    /// Path to the CSV file to upload
    pub file: PathBuf,

    /// Optional YAML file overriding built-in settings
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Do not draw a progress bar for the file transfer
    #[clap(long)]
    pub no_progress: bool,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<UploadReport, UploadError> {
    tracing::info!(source_id = %cli.source_id, file = ?cli.file, "harpin AI CSV upload starting");

    let settings =
        load_config(cli.config.as_ref()).map_err(|e| UploadError::Config(format!("{e:#}")))?;
    settings.trace_loaded();

    // Checked before anything touches the network.
    let credentials = Credentials::from_env()?;

    let client = HarpinClient::new(&settings).map_err(UploadError::ClientInit)?;

    let observer: Arc<dyn ProgressObserver> = if cli.no_progress {
        Arc::new(NoProgress)
    } else {
        let name = cli
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Arc::new(TransferBar::new(&name))
    };

    run_upload(
        &client,
        &settings,
        &credentials,
        &cli.source_id,
        &cli.file,
        observer,
    )
    .await
}

/// Final summary printed on success.
pub fn render_summary(report: &UploadReport) -> String {
    let rule = "=".repeat(BANNER_WIDTH);
    format!(
        "\n{rule}\nUPLOAD SUMMARY\n{rule}\n\
         ✓ File: {}\n\
         ✓ Total Records: {}\n\
         ✓ Imported Records: {}\n\
         ✓ Duration: {:.1} seconds\n\
         {rule}",
        report.file_name,
        report.total_records,
        report.imported_records,
        report.duration.as_secs_f64(),
    )
}

/// Diagnostic printed to stderr before a failing exit.
pub fn render_error(err: &UploadError) -> String {
    let mut message = format!("✗ {err}");
    if let UploadError::SourceNotFound {
        source_system,
        available,
        ..
    } = err
    {
        if available.is_empty() {
            message.push_str(&format!("\nNo {source_system} sources available"));
        } else {
            message.push_str(&format!("\nAvailable {source_system} sources:"));
            for source in available {
                message.push_str(&format!(
                    "\n  ID: {}, Name: {}",
                    source.id.as_deref().unwrap_or("N/A"),
                    source.name.as_deref().unwrap_or("N/A")
                ));
            }
        }
    }
    message
}
