use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;

use loadwatch::stats::KnownSourceSet;

/// Command-line options shared by the loadwatch binaries.
#[derive(Parser, Debug, Clone)]
pub struct MonitorOpts {
    /// Base URL of the monitored backend
    #[arg(
        short = 'u',
        long = "url",
        default_value = "http://localhost:8080",
        help = "Base URL of the monitored backend"
    )]
    pub url: String,

    /// Snapshot feed poll interval in milliseconds
    #[arg(long = "snapshot-interval", default_value_t = 1500)]
    pub snapshot_interval_ms: u64,

    /// Event feed poll interval in milliseconds
    #[arg(long = "events-interval", default_value_t = 1200)]
    pub events_interval_ms: u64,

    /// UI refresh rate in frames per second
    #[arg(long, default_value_t = 10)]
    pub fps: u64,

    /// YAML file with display classification (known attack sources)
    #[arg(long = "config")]
    pub config_file: Option<PathBuf>,

    /// Append diagnostics to this file instead of the terminal
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Suppress the footer hint
    #[arg(long)]
    pub quiet: bool,
}

/// Sidecar configuration. Everything in here affects display only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub known_attack_sources: Vec<String>,
}

impl MonitorConfig {
    pub fn load(path: &Path) -> anyhow::Result<MonitorConfig> {
        let file =
            File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        serde_yaml::from_reader(file)
            .with_context(|| format!("cannot parse {}", path.display()))
    }

    pub fn known_sources(&self) -> KnownSourceSet {
        KnownSourceSet::new(self.known_attack_sources.iter().cloned())
    }
}
