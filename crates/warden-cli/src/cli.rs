//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use warden_domain::{PunishmentType, SourceKind};

/// Warden - Import legacy punishment histories into one store.
#[derive(Debug, Parser)]
#[command(name = "warden")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Punishment store database
    #[arg(short, long, global = true, env = "WARDEN_STORE")]
    pub store: Option<PathBuf>,

    /// Import configuration file
    #[arg(short, long, global = true, env = "WARDEN_IMPORT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (IDs and counts only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import punishments from a legacy plugin
    Import(ImportArgs),

    /// List punishments in the store
    Entries(EntriesArgs),

    /// Show past import runs
    History(HistoryArgs),

    /// Show or change CLI settings
    Config(ConfigArgs),
}

/// Arguments for the import command.
#[derive(Debug, Parser)]
pub struct ImportArgs {
    /// Legacy format to read
    #[arg(value_enum)]
    pub source: SourceArg,

    /// Database file, or the server directory for vanilla ban lists
    #[arg(short, long)]
    pub path: PathBuf,

    /// Batch sizing preset, replacing the configured sizes
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Records per committed batch
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Mark a failed batch's records failed without retrying
    #[arg(long)]
    pub no_retry: bool,
}

/// Arguments for the entries command.
#[derive(Debug, Parser)]
pub struct EntriesArgs {
    /// Filter by punishment type
    #[arg(short, long, value_enum)]
    pub kind: Option<KindArg>,

    /// Filter by the source the details came from
    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,

    /// Filter by victim UUID
    #[arg(short, long)]
    pub victim: Option<String>,

    /// Maximum number of results
    #[arg(short, long, default_value = "50")]
    pub limit: usize,
}

/// Arguments for the history command.
#[derive(Debug, Parser)]
pub struct HistoryArgs {
    /// Maximum number of runs
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

/// Arguments for settings management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Settings management actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Show the effective settings
    Show,

    /// Print the settings file location
    Path,

    /// Set the default store database
    SetStore {
        /// Database path
        path: PathBuf,
    },

    /// Set the default import configuration file
    SetImportConfig {
        /// TOML file path
        path: PathBuf,
    },

    /// Set the default output format
    SetFormat {
        /// Output format
        #[arg(value_enum)]
        format: CliFormat,
    },
}

/// Legacy source argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SourceArg {
    /// AdvancedBan SQLite database
    Advancedban,
    /// LiteBans SQLite database
    Litebans,
    /// Vanilla banned-players.json / banned-ips.json
    Vanilla,
    /// Pre-1.7.6 banned-players.txt / banned-ips.txt
    VanillaLegacy,
}

/// Punishment type argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum KindArg {
    /// Bans
    Ban,
    /// Mutes
    Mute,
    /// Warnings
    Warn,
    /// Kicks
    Kick,
}

/// Batch sizing preset argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum PresetArg {
    /// Short transactions
    Small,
    /// Balanced defaults
    Default,
    /// Large transactions for one-off migrations
    Bulk,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<SourceArg> for SourceKind {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Advancedban => SourceKind::AdvancedBan,
            SourceArg::Litebans => SourceKind::LiteBans,
            SourceArg::Vanilla => SourceKind::Vanilla,
            SourceArg::VanillaLegacy => SourceKind::VanillaLegacy,
        }
    }
}

impl From<KindArg> for PunishmentType {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Ban => PunishmentType::Ban,
            KindArg::Mute => PunishmentType::Mute,
            KindArg::Warn => PunishmentType::Warn,
            KindArg::Kick => PunishmentType::Kick,
        }
    }
}
