//! Server configuration
//!
//! Every option can come from a command-line flag or a `TOOLMAP_*`
//! environment variable; flags win.

use crate::graph::CascadeDepth;
use clap::Parser;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "toolmap", version, about = "Tool map graph server")]
pub struct ServerConfig {
    /// Bind address
    #[arg(long, default_value = "127.0.0.1", env = "TOOLMAP_ADDRESS")]
    pub address: String,

    /// Port
    #[arg(long, default_value_t = 3000, env = "TOOLMAP_PORT")]
    pub port: u16,

    /// Graph document location
    #[arg(long, default_value = "./data/graph-data.json", env = "TOOLMAP_DATA")]
    pub data_path: PathBuf,

    /// Leaderboard document location
    #[arg(long, default_value = "./data/rankings.json", env = "TOOLMAP_RANKINGS")]
    pub rankings_path: PathBuf,

    /// Reach of category deletes
    #[arg(long, value_enum, default_value_t = CascadeDepth::Direct, env = "TOOLMAP_CASCADE")]
    pub cascade: CascadeDepth,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info", env = "TOOLMAP_LOG")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 3000,
            data_path: PathBuf::from("./data/graph-data.json"),
            rankings_path: PathBuf::from("./data/rankings.json"),
            cascade: CascadeDepth::Direct,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// `address:port` string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
