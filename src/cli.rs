use std::{path::PathBuf, time::Duration};

use clap::Parser;

/// Options for the daemon; values are `None` when not provided on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Parser)]
#[command(name = "inkstat", version)]
#[command(about = "inkstat - system and UPS status on a 2.13\" e-paper HAT")]
pub struct RunOptions {
    /// Config file path (default: ~/.inkstat/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Target period of one sample/render cycle, e.g. "1s" or "500ms"
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub refresh_rate: Option<Duration>,

    /// Force a full (ghost-clearing) refresh once this much time has passed
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub full_update_interval: Option<Duration>,

    /// Draw the frame upright instead of rotated 180°
    #[arg(long)]
    pub no_rotate: bool,

    /// Log verbosity
    #[arg(long, value_name = "LEVEL", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: Option<String>,

    /// Send logs to syslog instead of stderr
    #[arg(long)]
    pub syslog: bool,

    /// Render a single frame, then blank the panel and exit
    #[arg(long)]
    pub once: bool,

    /// Run without touching the panel, gauge or GPIO
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_duration(raw: &str) -> std::result::Result<Duration, String> {
    humantime::parse_duration(raw).map_err(|e| e.to_string())
}
