use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_OUTPUT_DIR: &str = "archive";

#[derive(Parser)]
#[command(name = "chatvault")]
#[command(about = "Archive Microsoft Teams chats locally and render them as HTML")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Archive root; data/ and html/ live underneath
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Graph access token (overrides CHATVAULT_ACCESS_TOKEN)
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download new and changed messages for every chat
    Download {
        /// Scan every message instead of stopping at the first unchanged one
        #[arg(long)]
        force: bool,
        /// Skip chats whose newest message is already archived
        #[arg(long)]
        trust_preview: bool,
    },
    /// Render the archive to HTML
    #[command(name = "generate-html", alias = "generate_html")]
    GenerateHtml,
}
