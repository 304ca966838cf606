use std::path::PathBuf;

use clap::Parser;

/// Tether: drive the webview bridge against an in-process host.
#[derive(Parser, Debug)]
#[command(name = "tether", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log filter override (e.g. "tether=debug").
    #[arg(long)]
    pub log_level: Option<String>,

    /// Label of a window the host should know about. Repeatable.
    #[arg(short = 'w', long = "window", value_name = "LABEL")]
    pub windows: Vec<String>,

    /// Label of the window the bridge runs in.
    #[arg(short = 'c', long, default_value = "main")]
    pub current: String,

    /// Host globals as JSON (`{"__windows": [...], "__currentWindow": {...}}`).
    /// Takes precedence over --window/--current.
    #[arg(long, value_name = "JSON")]
    pub globals: Option<String>,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    pub print_config: bool,
}

pub fn parse() -> Args {
    Args::parse()
}
