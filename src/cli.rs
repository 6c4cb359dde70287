use std::path::PathBuf;

use color_eyre::Result;

#[derive(clap::Parser)]
pub(crate) struct Cli {
    /// UDP port the relay and custom-sound engine listen on.
    #[clap(long, default_value_t = 9100)]
    pub(crate) port: u16,
}

/// The two environment variables spec §6 "Configuration" allows: a database
/// connection string (absence falls back to filesystem-only mode) and the
/// base directory downloaded/converted assets are written under.
pub(crate) struct Config {
    pub(crate) database_url: Option<String>,
    pub(crate) asset_dir: PathBuf,
}

impl Config {
    pub(crate) fn from_env() -> Result<Config> {
        let database_url = std::env::var("VOXRELAY_DATABASE_URL").ok();
        let asset_dir = std::env::var("VOXRELAY_ASSET_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./assets"));
        Ok(Config { database_url, asset_dir })
    }
}
