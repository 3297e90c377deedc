use std::path::Path;

use chatvault_core::render::{ArchiveRenderer, BodyTransformer, RenderReport, Templates};
use chatvault_core::{ArchiveConfig, ArchiveStore};

use crate::error::CliError;

pub async fn run_generate_html(
    config: &ArchiveConfig,
    output_dir: &Path,
) -> Result<RenderReport, CliError> {
    let store = ArchiveStore::new(output_dir);
    let data_dir = store.data_dir();
    if !tokio::fs::try_exists(&data_dir).await? {
        return Err(CliError::NoArchive(data_dir.display().to_string()));
    }

    let templates = Templates::new(config.timezone);
    let transformer = BodyTransformer::new(&store, config.content_endpoint_prefix());
    let report = ArchiveRenderer::new(&store, &templates, transformer)
        .render_all()
        .await?;

    for line in format_render_lines(&report) {
        println!("{line}");
    }
    Ok(report)
}

pub fn format_render_lines(report: &RenderReport) -> Vec<String> {
    let mut lines = report
        .skipped
        .iter()
        .map(|skipped| {
            format!(
                "Skipped chat {}: {}",
                skipped.conversation_id, skipped.reason
            )
        })
        .collect::<Vec<_>>();
    lines.push(format!(
        "Rendered {} chats; index at {}",
        report.entries.len(),
        report.index_path.display()
    ));
    lines
}
