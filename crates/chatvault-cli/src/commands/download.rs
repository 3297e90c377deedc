use std::path::Path;

use chatvault_core::sync::{DownloadProgress, DownloadReport, MessageSynchronizer, SyncOptions};
use chatvault_core::{ArchiveConfig, ArchiveStore, GraphClient};

use crate::error::CliError;

pub async fn run_download(
    config: &ArchiveConfig,
    output_dir: &Path,
    options: SyncOptions,
) -> Result<DownloadReport, CliError> {
    let client = GraphClient::new(config)?;
    let store = ArchiveStore::new(output_dir);
    let synchronizer =
        MessageSynchronizer::new(&client, &store, config.content_endpoint_prefix());

    let report = synchronizer
        .download_all(options, |progress| {
            println!("{}", format_progress_line(progress));
        })
        .await?;
    println!("{}", format_download_total(&report));
    Ok(report)
}

/// One line per progress event, printed while the download runs.
pub fn format_progress_line(progress: DownloadProgress<'_>) -> String {
    match progress {
        DownloadProgress::Started {
            conversation_id,
            display_name,
        } => format!("Processing chat {display_name} (id {conversation_id})"),
        DownloadProgress::Finished(entry) => format!("  {}", entry.summary),
    }
}

pub fn format_download_total(report: &DownloadReport) -> String {
    let totals = report.totals();
    let mut total = format!(
        "Downloaded {} chats: {} messages written",
        report.conversations.len(),
        totals.written()
    );
    if totals.hosted.failed > 0 {
        total.push_str(&format!(
            ", {} hosted contents unavailable",
            totals.hosted.failed
        ));
    }
    total
}
