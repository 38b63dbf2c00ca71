use std::path::PathBuf;

use clap::Parser;

/// Serve a fix log dump the way the logger presents it over USB
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Raw dump of the log flash
    #[arg(short, long)]
    pub flash: PathBuf,

    /// Bytes of the dump used by the log
    #[arg(long, default_value_t = 4_000_000)]
    pub log_capacity: u32,

    /// Requested size of the emulated disk in bytes
    #[arg(short, long, default_value_t = 64_000_000)]
    pub size: u64,

    /// Volume label
    #[arg(short, long, default_value = "GLOGGER")]
    pub label: String,

    /// Firmware image published as FW.UF2
    #[arg(long)]
    pub firmware: Option<PathBuf>,

    /// Write the whole disk image here
    #[arg(short, long)]
    pub image: Option<PathBuf>,

    /// Write the generated GPX here
    #[arg(short, long)]
    pub gpx: Option<PathBuf>,
}
