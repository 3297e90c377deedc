use std::path::PathBuf;

use chatvault_core::hosted::ResolveSummary;
use chatvault_core::sync::{
    ConversationSync, DownloadProgress, DownloadReport, SyncOptions, SyncSummary,
};
use chatvault_core::{ArchiveConfig, ArchiveStore, StoreKey};
use clap::Parser;

use crate::cli::{Cli, Commands, DEFAULT_OUTPUT_DIR};
use crate::commands::download::{format_download_total, format_progress_line, run_download};
use crate::commands::generate::{format_render_lines, run_generate_html};
use crate::error::CliError;

#[test]
fn download_flags_parse() {
    let cli = Cli::try_parse_from(["chatvault", "download", "--force", "--trust-preview"]).unwrap();
    assert_eq!(cli.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
    assert!(matches!(
        cli.command,
        Commands::Download {
            force: true,
            trust_preview: true
        }
    ));

    let cli = Cli::try_parse_from(["chatvault", "download"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Download {
            force: false,
            trust_preview: false
        }
    ));
}

#[test]
fn generate_html_accepts_both_spellings() {
    for name in ["generate-html", "generate_html"] {
        let cli = Cli::try_parse_from(["chatvault", name, "--output-dir", "/tmp/out"]).unwrap();
        assert!(matches!(cli.command, Commands::GenerateHtml));
        assert_eq!(cli.output_dir, PathBuf::from("/tmp/out"));
    }
}

#[test]
fn unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["chatvault", "upload"]).is_err());
    assert!(Cli::try_parse_from(["chatvault"]).is_err());
}

#[test]
fn token_flag_overrides_configuration() {
    let cli = Cli::try_parse_from(["chatvault", "--token", "abc", "download"]).unwrap();
    let config = ArchiveConfig::default().with_access_token(cli.token);
    assert_eq!(config.require_access_token().unwrap(), "abc");
}

#[test]
fn download_lines_summarize_each_chat() {
    let report = DownloadReport {
        conversations: vec![
            ConversationSync {
                conversation_id: "c1".to_string(),
                display_name: "Team".to_string(),
                summary: SyncSummary {
                    saved: 2,
                    updated: 1,
                    hosted: ResolveSummary {
                        fetched: 1,
                        skipped: 0,
                        failed: 1,
                    },
                    ..SyncSummary::default()
                },
            },
            ConversationSync {
                conversation_id: "c2".to_string(),
                display_name: "Ada, Bo".to_string(),
                summary: SyncSummary {
                    skipped_fast_path: true,
                    ..SyncSummary::default()
                },
            },
        ],
    };

    let lines = report
        .conversations
        .iter()
        .flat_map(|entry| {
            [
                format_progress_line(DownloadProgress::Started {
                    conversation_id: &entry.conversation_id,
                    display_name: &entry.display_name,
                }),
                format_progress_line(DownloadProgress::Finished(entry)),
            ]
        })
        .collect::<Vec<_>>();

    assert_eq!(
        lines,
        vec![
            "Processing chat Team (id c1)",
            "  Message counts: 2 saved, 1 updated",
            "Processing chat Ada, Bo (id c2)",
            "  No new messages in the chat since last run",
        ]
    );
    assert_eq!(
        format_download_total(&report),
        "Downloaded 2 chats: 3 messages written, 1 hosted contents unavailable"
    );
}

#[test]
fn download_total_omits_failures_when_none() {
    assert_eq!(
        format_download_total(&DownloadReport::default()),
        "Downloaded 0 chats: 0 messages written"
    );
}

#[tokio::test]
async fn download_requires_access_token() {
    let dir = tempfile::tempdir().unwrap();
    let error = run_download(&ArchiveConfig::default(), dir.path(), SyncOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        CliError::Core(chatvault_core::Error::Configuration(_))
    ));
    assert!(error.to_string().contains("CHATVAULT_ACCESS_TOKEN"));
}

#[tokio::test]
async fn generate_html_requires_downloaded_data() {
    let dir = tempfile::tempdir().unwrap();
    let error = run_generate_html(&ArchiveConfig::default(), dir.path())
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::NoArchive(_)));
}

#[tokio::test]
async fn generate_html_writes_documents_and_index() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArchiveStore::new(dir.path());
    store
        .write_bytes(
            &StoreKey::Conversation {
                conversation_id: "c1",
            },
            br#"{"id": "c1", "topic": "Team"}"#,
        )
        .await
        .unwrap();
    store
        .write_bytes(
            &StoreKey::Message {
                conversation_id: "c1",
                message_id: "1700000000000",
            },
            br#"{"id": "1700000000000", "body": {"contentType": "html", "content": "hello"}}"#,
        )
        .await
        .unwrap();

    let report = run_generate_html(&ArchiveConfig::default(), dir.path())
        .await
        .unwrap();

    assert_eq!(report.entries.len(), 1);
    let page = std::fs::read_to_string(dir.path().join("html").join("c1.html")).unwrap();
    assert!(page.contains("<p>hello</p>"));
    assert!(dir.path().join("html").join("index.html").exists());

    let lines = format_render_lines(&report);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Rendered 1 chats; index at "));
}
