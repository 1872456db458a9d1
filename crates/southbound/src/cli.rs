//! Clap derive structures for the `southbound` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// southbound -- gNMI requests against configured network devices
#[derive(Debug, Parser)]
#[command(
    name = "southbound",
    version,
    about = "Issue gNMI requests against configured network devices",
    long_about = "Connects to a device from the inventory file and runs a single gNMI\n\
        Capabilities, Get, Set or Subscribe call.\n\n\
        Requests for capabilities, get and set are written in protobuf text format,\n\
        e.g. 'path: <elem: <name: \"interfaces\">>'.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Device inventory file (defaults to the platform config dir)
    #[arg(long, env = "SOUTHBOUND_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Device table name from the inventory
    #[arg(long, short = 'd', env = "SOUTHBOUND_DEVICE", global = true)]
    pub device: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Connect and request timeout in seconds (overrides the inventory)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Fail on unusable TLS material instead of falling back to skip-verify
    #[arg(long, global = true)]
    pub strict_tls: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Protobuf text format (default)
    Text,
    /// Pretty-printed JSON (one compact object per line for subscribe)
    Json,
    /// YAML
    Yaml,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List devices in the inventory
    #[command(alias = "ls")]
    Devices,

    /// Query the device's supported models, encodings and gNMI version
    #[command(alias = "caps")]
    Capabilities(CapabilitiesArgs),

    /// Read data from the device
    Get(RequestArgs),

    /// Modify data on the device
    Set(RequestArgs),

    /// Subscribe to telemetry updates
    #[command(alias = "sub")]
    Subscribe(SubscribeArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct CapabilitiesArgs {
    /// CapabilityRequest in text format (empty by default)
    #[arg(default_value = "")]
    pub request: String,
}

#[derive(Debug, Args)]
pub struct RequestArgs {
    /// Request message in protobuf text format
    pub request: String,
}

#[derive(Debug, Args)]
pub struct SubscribeArgs {
    /// Path to subscribe to, e.g. /interfaces/interface[name=eth0]/state (repeatable)
    #[arg(long = "path", short = 'p', required = true)]
    pub paths: Vec<String>,

    /// Common prefix for every path
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Subscription list mode: once, poll or stream
    #[arg(long, default_value = "stream")]
    pub mode: String,

    /// Per-path stream mode: on_change, sample or target_defined
    #[arg(long, default_value = "")]
    pub stream_mode: String,

    /// Sample interval in nanoseconds
    #[arg(long, default_value_t = 0)]
    pub sample_interval: u64,

    /// Heartbeat interval in nanoseconds
    #[arg(long, default_value_t = 0)]
    pub heartbeat_interval: u64,

    /// Only send updates, no initial state
    #[arg(long)]
    pub updates_only: bool,

    /// Origin attached to every path (e.g. openconfig)
    #[arg(long, default_value = "")]
    pub origin: String,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
