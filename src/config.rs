use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::embed::ModelConfig;
use crate::embed::openai::DEFAULT_BASE_URL;
use crate::eval::batch::Defaults;
use crate::metric::Metric;

pub const CONFIG_FILE: &str = "simscore.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub files: FileConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Hard limit per embedding request
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub cache: PathBuf,
    pub test_cases: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub model: String,
    /// Requested output dimensionality (0 = the model's native size)
    pub dimensions: usize,
    pub metric: Metric,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 5,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            cache: PathBuf::from(".cache.json"),
            test_cases: PathBuf::from("test-cases.json"),
            output: PathBuf::from("output.csv"),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-large".to_string(),
            dimensions: 1536,
            metric: Metric::Cosine,
        }
    }
}

impl Config {
    /// Load `simscore.toml` from `root`, falling back to defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading config from {}", config_path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("parsing config from {}", config_path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Write current config to disk (for `simscore init`).
    pub fn save(&self, root: &Path) -> Result<()> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("creating directory {}", root.display()))?;
        let config_path = root.join(CONFIG_FILE);
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)
            .with_context(|| format!("writing config to {}", config_path.display()))?;
        Ok(())
    }

    /// Resolve a configured file path against `root` unless it is absolute.
    pub fn resolve(root: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }

    pub fn defaults(&self) -> Defaults {
        Defaults {
            model: ModelConfig::new(
                &self.defaults.model,
                Some(self.defaults.dimensions).filter(|&d| d > 0),
            ),
            metric: self.defaults.metric,
        }
    }

    /// Read the API key named by `provider.api_key_env`.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.provider.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.provider.timeout_secs, 5);
        assert_eq!(
            config.defaults().model,
            ModelConfig::new("text-embedding-3-large", Some(1536))
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[provider]\ntimeout_secs = 30\n\n[defaults]\nmodel = \"nomic-embed-text\"\nmetric = \"manhattan\"\n",
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.provider.timeout_secs, 30);
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.defaults.metric, Metric::Manhattan);
        // The dimension default still applies when only the model is overridden.
        assert_eq!(config.defaults().model.key(), "nomic-embed-text[1536]");
        assert_eq!(config.files.cache, PathBuf::from(".cache.json"));
    }

    #[test]
    fn zero_dimensions_means_native() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[defaults]\ndimensions = 0\n").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.defaults().model.key(), "text-embedding-3-large");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.files.output = PathBuf::from("reports/scores.csv");
        config.save(dir.path()).unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn invalid_metric_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[defaults]\nmetric = \"dot\"\n").unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config"));
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let root = Path::new("/work");
        assert_eq!(
            Config::resolve(root, Path::new("output.csv")),
            PathBuf::from("/work/output.csv")
        );
        assert_eq!(
            Config::resolve(root, Path::new("/tmp/c.json")),
            PathBuf::from("/tmp/c.json")
        );
    }
}
