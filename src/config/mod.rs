use std::path::PathBuf;

use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

use crate::table::DEFAULT_NEW_ITEM_LABEL;

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Postgres URL used when promoting a breakdown; promotion is disabled without it
    #[serde(default)]
    pub database_url: Option<String>,
    /// Directory that exports are written to
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
    /// Description given to rows added in the editor
    #[serde(default = "default_new_item_label")]
    pub new_item_label: String,
    /// File that receives logs while the editor owns the terminal
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("exports")
}

fn default_new_item_label() -> String {
    DEFAULT_NEW_ITEM_LABEL.to_string()
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables from a `.env` file are loaded first if it exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string()));
        envy::from_iter::<_, Config>(vars).unwrap()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = from_pairs(&[]);
        assert_eq!(config.database_url(), None);
        assert_eq!(config.export_dir, PathBuf::from("exports"));
        assert_eq!(config.new_item_label, "new item");
        assert!(config.log_file.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/quotes"),
            ("EXPORT_DIR", "/tmp/out"),
            ("NEW_ITEM_LABEL", "nuevo artículo"),
            ("LOG_FILE", "/tmp/breakdown.log"),
        ]);
        assert_eq!(config.database_url(), Some("postgres://localhost/quotes"));
        assert_eq!(config.export_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.new_item_label, "nuevo artículo");
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/breakdown.log")));
    }

    #[test]
    fn blank_database_url_disables_promotion() {
        let config = from_pairs(&[("DATABASE_URL", "  ")]);
        assert_eq!(config.database_url(), None);
    }
}
