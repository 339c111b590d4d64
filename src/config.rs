use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Secrets and endpoints that must be present before any stage runs.
///
/// A missing variable is the only fatal startup error in the pipeline.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub gemini_api_key: String,
    pub supabase_url: String,
    pub supabase_key: String,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            gemini_api_key: require_var("GEMINI_API_KEY")?,
            supabase_url: require_var("SUPABASE_URL")?,
            supabase_key: require_var("SUPABASE_KEY")?,
        })
    }
}

fn require_var(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{} environment variable not set", name))
}

pub fn root_dir() -> String {
    env::var("ROOT").unwrap_or_else(|_| ".".to_string())
}

/// Tunables with working defaults, optionally overridden by a settings.yml
/// file under the root directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub webdriver_url: String,
    /// Cap on scraped postings per run; None means "all advertised today".
    pub job_limit: Option<usize>,
    /// Jobs per normalization request.
    pub chunk_size: usize,
    /// Jobs per raw batch file.
    pub batch_size: usize,
    pub scrape_attempts: u32,
    pub retry_delay_secs: u64,
    pub headless: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            job_limit: None,
            chunk_size: 5,
            batch_size: 20,
            scrape_attempts: 3,
            retry_delay_secs: 30,
            headless: true,
        }
    }
}

impl Settings {
    pub fn load(root: &str) -> Result<Self> {
        let path = PathBuf::from(root).join("settings.yml");
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let settings: Settings =
            serde_yaml::from_str(&content).with_context(|| "Failed to parse settings YAML")?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.chunk_size, 5);
        assert_eq!(settings.batch_size, 20);
        assert_eq!(settings.scrape_attempts, 3);
        assert!(settings.job_limit.is_none());
        assert!(settings.headless);
    }

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_fields() {
        let settings: Settings = serde_yaml::from_str("chunk_size: 8\njob_limit: 40\n").unwrap();
        assert_eq!(settings.chunk_size, 8);
        assert_eq!(settings.job_limit, Some(40));
        assert_eq!(settings.batch_size, 20);
        assert_eq!(settings.webdriver_url, "http://localhost:9515");
    }
}
