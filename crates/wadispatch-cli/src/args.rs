use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use uuid::Uuid;

/// Author and inspect WhatsApp campaigns
///
/// `preview` works offline on a contacts CSV. The other commands talk to
/// the hosted backend configured in `wadispatch.toml` or through
/// `WADISPATCH__*` environment variables.
#[derive(Parser, Debug)]
#[command(version, about, name = "wadispatch")]
pub struct Args {
    /// Configuration file; defaults to ./wadispatch.toml or
    /// /etc/wadispatch/config.toml when present
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a contacts CSV and estimate the campaign offline
    Preview(PreviewArgs),
    /// List campaigns with per-status counts
    Campaigns,
    /// List API configurations
    Apis,
    /// Run the connection test of an API configuration
    TestApi {
        /// API configuration id
        id: Uuid,
    },
}

#[derive(ClapArgs, Debug, Default)]
pub struct PreviewArgs {
    /// Contacts CSV with a telefone/phone/numero column
    pub csv: PathBuf,

    /// Text message template rendered for the first contact
    #[arg(long, short)]
    pub message: Option<PathBuf>,

    /// Minimum delay between sends, in seconds
    #[arg(long)]
    pub min_delay: Option<u32>,

    /// Maximum delay between sends, in seconds
    #[arg(long)]
    pub max_delay: Option<u32>,

    /// Pause after this many sends; 0 disables pauses
    #[arg(long)]
    pub pause_after: Option<u32>,

    /// Pause length, in seconds
    #[arg(long)]
    pub pause_duration: Option<u32>,

    /// Daily sending limit
    #[arg(long)]
    pub daily_limit: Option<u32>,
}
