//! Optional config file loading. Search order: ./nlscrape.toml, then
//! $XDG_CONFIG_HOME/nlscrape/config.toml (or ~/.config/nlscrape/config.toml).
//!
//! Values here are defaults; CLI flags override them, and orchestrators
//! receive the resolved values at construction. Nothing reads config at a
//! distance.

use serde::Deserialize;
use std::path::PathBuf;

/// Config file contents. All fields optional; only present keys override
/// defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Source site root, e.g. "https://novelasligera.com".
    pub base_url: Option<String>,
    /// Default output directory for scrape results when -o is not set.
    pub output_dir: Option<PathBuf>,
    /// Catalog database file used by the import subcommand.
    pub catalog_path: Option<PathBuf>,
    /// Directory receiving transcoded covers on import.
    pub upload_dir: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Delay in seconds between chapter requests.
    pub request_delay_secs: Option<u64>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Number of HTTP attempts for transient failures.
    pub retry_count: Option<u32>,
    /// Delay in seconds before each retry (e.g. [1, 2, 4]).
    pub retry_backoff_secs: Option<Vec<u64>>,
}

/// Missing file returns Ok(None). Invalid TOML or an I/O error reading a
/// present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("nlscrape.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("nlscrape").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            return Ok(Some(config));
        }
    }
    Ok(None)
}
