//! CLI argument definitions for `draftdesk`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use desk_modes::COMPOSER_CONTEXT;
use desk_persistence::{CheckpointId, DraftId};

#[derive(Parser)]
#[command(
    name = "draftdesk",
    version,
    about = "Draftdesk - versioned drafts with autosave",
    long_about = "Keep versioned drafts of notes and comments.\n\n\
                  Every save records an immutable checkpoint; the composer \
                  autosaves while you type."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow draft text to appear in logs.
    #[arg(long = "log-content", global = true)]
    pub log_content: bool,

    /// Settings file (default: the platform config directory).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Draft storage directory (overrides the settings file).
    #[arg(long = "store", value_name = "DIR", global = true)]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the interaction modes in display order.
    Modes,

    /// Checkpoint a text file (or stdin) as a draft.
    Save(SaveArgs),

    /// Show the checkpoint history of a draft.
    History(HistoryArgs),

    /// Print a draft's text.
    Show(ShowArgs),

    /// Write a comment line by line with autosave.
    Compose(ComposeArgs),
}

#[derive(Parser)]
pub struct SaveArgs {
    /// File to read; stdin when omitted.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Append to an existing draft instead of starting a new one.
    #[arg(long = "draft", value_name = "ID")]
    pub draft: Option<DraftId>,

    #[arg(long = "context", default_value = COMPOSER_CONTEXT)]
    pub context: String,

    /// Record the checkpoint as automatic (subject to retention).
    #[arg(long = "auto")]
    pub auto: bool,
}

#[derive(Parser)]
pub struct HistoryArgs {
    #[arg(value_name = "DRAFT")]
    pub draft: DraftId,

    #[arg(long = "context", default_value = COMPOSER_CONTEXT)]
    pub context: String,
}

#[derive(Parser)]
pub struct ShowArgs {
    #[arg(value_name = "DRAFT")]
    pub draft: DraftId,

    #[arg(long = "context", default_value = COMPOSER_CONTEXT)]
    pub context: String,

    /// Checkpoint to print (default: the current one).
    #[arg(long = "checkpoint", value_name = "ID")]
    pub checkpoint: Option<CheckpointId>,
}

#[derive(Parser)]
pub struct ComposeArgs {
    /// Continue an existing draft.
    #[arg(long = "draft", value_name = "ID")]
    pub draft: Option<DraftId>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
