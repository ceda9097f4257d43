//! CLI argument definitions for the HL7 workbench.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "hl7-workbench",
    version,
    about = "HL7 Workbench - Generate, validate, de-identify, and compare synthetic HL7 v2.x messages",
    long_about = "Generate structurally valid synthetic HL7 v2.x messages for integration testing,\n\
                  validate arbitrary messages against the shipped definitions and vendor dialects,\n\
                  de-identify real-looking payloads, and diff messages field by field.\n\
                  No real patient data is ever used or required."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

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

    /// Allow field values (potential PHI) to appear in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,

    /// Standards directory override (default: HL7_STANDARDS_DIR or the
    /// shipped standards/).
    #[arg(long = "standards-dir", value_name = "DIR", global = true)]
    pub standards_dir: Option<PathBuf>,

    /// Session store override (default: HL7_SESSION_STORE or
    /// ~/.hl7-workbench/sessions.json).
    #[arg(long = "session-store", value_name = "PATH", global = true)]
    pub session_store: Option<PathBuf>,

    /// Enhanced value source endpoint; omit to use only the built-in
    /// datasets.
    #[arg(long = "enhance-endpoint", value_name = "URL", global = true)]
    pub enhance_endpoint: Option<String>,

    /// Timeout in seconds for enhanced value source requests.
    #[arg(long = "enhance-timeout", value_name = "SECS", default_value_t = 5, global = true)]
    pub enhance_timeout: u64,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate one or more synthetic messages.
    Generate(GenerateArgs),

    /// Validate a message file against the definitions.
    Validate(ValidateArgs),

    /// Replace PHI-bearing fields in a message file.
    Deidentify(DeidentifyArgs),

    /// Compare two message files field by field.
    Diff(DiffArgs),

    /// Manage sessions of locked field values.
    #[command(subcommand)]
    Session(SessionCommand),

    /// Inspect the loaded standards.
    #[command(subcommand)]
    Standards(StandardsCommand),
}

#[derive(Parser)]
pub struct GenerateArgs {
    /// Message type to generate (e.g. ADT^A01).
    #[arg(long = "message-type", short = 't', value_name = "TYPE")]
    pub message_type: String,

    /// Sending facility placed in MSH-4.
    #[arg(long, default_value = "DEMO_HOSPITAL", value_name = "NAME")]
    pub facility: String,

    /// Session whose locked values to apply (default: current session).
    #[arg(long, value_name = "NAME")]
    pub session: Option<String>,

    /// Number of messages to generate.
    #[arg(long, default_value_t = 1, value_name = "N")]
    pub count: usize,

    /// Validate each generated message and fail on errors.
    #[arg(long)]
    pub validate: bool,

    /// Write output to a file instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Message file ('-' for stdin).
    #[arg(value_name = "FILE")]
    pub input: String,

    /// Message type to validate against (e.g. ADT^A01; default: the type
    /// declared in MSH-9).
    #[arg(long = "message-type", short = 't', value_name = "TYPE")]
    pub message_type: Option<String>,

    /// Vendor dialect overlay to apply on top of the base definitions.
    #[arg(long, value_name = "VENDOR")]
    pub vendor: Option<String>,

    /// Report format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: ReportFormatArg,
}

#[derive(Parser)]
pub struct DeidentifyArgs {
    /// Message file ('-' for stdin).
    #[arg(value_name = "FILE")]
    pub input: String,

    /// Write output to a file instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Parser)]
pub struct DiffArgs {
    /// First message file.
    #[arg(value_name = "FILE_A")]
    pub a: String,

    /// Second message file.
    #[arg(value_name = "FILE_B")]
    pub b: String,

    /// Include unchanged entries in the listing.
    #[arg(long)]
    pub all: bool,

    /// Report format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: ReportFormatArg,
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// Lock a field path to a value in the current session (creates a
    /// temporary session when none is current).
    Lock {
        /// Field path, e.g. PID.3 or PID.5.1.
        path: String,
        /// Value to lock.
        value: String,
    },

    /// Remove a lock from the current session.
    Clear {
        /// Field path, e.g. PID.3.
        path: String,
    },

    /// Save the current session under a permanent name.
    Save { name: String },

    /// Switch the current session.
    Use { name: String },

    /// List sessions.
    List,

    /// Delete a session immediately.
    Remove { name: String },

    /// Export a session as a shareable template.
    Export {
        name: String,
        /// Write the template to a file instead of stdout.
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },

    /// Import a session template file ('-' for stdin).
    Import { file: String },
}

#[derive(Subcommand)]
pub enum StandardsCommand {
    /// Verify the standards directory digests and print a summary.
    Verify,

    /// List the segments in the loaded registry.
    Segments,

    /// List supported message types and vendor dialects.
    Types,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReportFormatArg {
    Text,
    Json,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
