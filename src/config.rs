use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub links: LinkConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Graph-wide settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphConfig {
    /// Only links resolving inside this domain (or its subdomains) become
    /// LINKS_TO edges. When unset, each page's own host is used.
    #[serde(default)]
    pub base_domain: Option<String>,
}

/// Link extraction settings
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// URL path prefixes that mark site navigation targets
    #[serde(default = "default_navigation_paths")]
    pub navigation_paths: Vec<String>,
    /// URL path prefixes that mark reference material
    #[serde(default = "default_reference_paths")]
    pub reference_paths: Vec<String>,
    /// Page region → weight in [0, 1] used by link strength
    #[serde(default = "default_position_weights")]
    pub position_weights: BTreeMap<String, f64>,
    /// Weight for links with no (or an unknown) position
    #[serde(default = "default_unknown_weight")]
    pub default_position_weight: f64,
    /// Fan per-page extraction out across the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

/// Validation settings
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_true")]
    pub flag_orphans: bool,
    #[serde(default = "default_true")]
    pub flag_order_gaps: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            navigation_paths: default_navigation_paths(),
            reference_paths: default_reference_paths(),
            position_weights: default_position_weights(),
            default_position_weight: default_unknown_weight(),
            parallel: default_parallel(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            flag_orphans: true,
            flag_order_gaps: true,
        }
    }
}

fn default_navigation_paths() -> Vec<String> {
    ["/about", "/contact", "/home", "/index", "/sitemap", "/search", "/login"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_reference_paths() -> Vec<String> {
    ["/reference", "/references", "/glossary", "/docs", "/faq", "/policies", "/terms"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_position_weights() -> BTreeMap<String, f64> {
    [
        ("header", 1.0),
        ("navigation", 0.9),
        ("nav", 0.9),
        ("heading", 0.85),
        ("main", 0.7),
        ("content", 0.7),
        ("body", 0.7),
        ("sidebar", 0.5),
        ("footer", 0.3),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), *v))
    .collect()
}

fn default_unknown_weight() -> f64 {
    0.5
}

fn default_parallel() -> bool {
    true
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in SITEGRAPH_CONFIG environment variable
    /// 2. ./sitegraph.toml in current directory
    ///
    /// A missing default file yields the built-in defaults; a missing file
    /// named by SITEGRAPH_CONFIG is an error.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let (config_path, explicit) = match std::env::var("SITEGRAPH_CONFIG") {
            Ok(path) => (PathBuf::from(path), true),
            Err(_) => (PathBuf::from("sitegraph.toml"), false),
        };

        if !explicit && !config_path.exists() {
            log::debug!("No {} found, using default configuration", config_path.display());
            return Ok(Self::default());
        }

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse sitegraph config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if let Some(domain) = &self.graph.base_domain {
            if domain.trim().is_empty() {
                anyhow::bail!("graph.base_domain must not be empty when set");
            }
        }

        for (position, weight) in &self.links.position_weights {
            if !(0.0..=1.0).contains(weight) {
                anyhow::bail!(
                    "links.position_weights.{} must be between 0.0 and 1.0 (got {})",
                    position,
                    weight
                );
            }
        }

        if !(0.0..=1.0).contains(&self.links.default_position_weight) {
            anyhow::bail!("links.default_position_weight must be between 0.0 and 1.0");
        }

        if let Some(path) = self
            .links
            .navigation_paths
            .iter()
            .chain(&self.links.reference_paths)
            .find(|p| !p.starts_with('/'))
        {
            anyhow::bail!("link path patterns must start with '/': {}", path);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide cwd and env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const TEST_CONFIG: &str = r#"
[graph]
base_domain = "example.ac.uk"

[links]
navigation_paths = ["/about", "/study"]
parallel = false

[links.position_weights]
header = 1.0
footer = 0.2

[validation]
flag_orphans = false
"#;

    /// Restores cwd when dropped (e.g. on panic).
    struct CwdGuard(std::path::PathBuf);
    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.0);
        }
    }

    #[test]
    fn test_from_toml_str() {
        let config = Config::from_toml_str(TEST_CONFIG).unwrap();
        assert_eq!(config.graph.base_domain.as_deref(), Some("example.ac.uk"));
        assert_eq!(config.links.navigation_paths, vec!["/about", "/study"]);
        assert_eq!(config.links.position_weights.get("footer"), Some(&0.2));
        assert!(!config.links.parallel);
        assert!(!config.validation.flag_orphans);
        assert!(config.validation.flag_order_gaps);
        // unspecified sections keep their defaults
        assert_eq!(config.links.reference_paths, default_reference_paths());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.graph.base_domain.is_none());
        assert_eq!(config.links.position_weights.get("header"), Some(&1.0));
        assert_eq!(config.links.default_position_weight, 0.5);
    }

    #[test]
    fn test_weight_out_of_range_rejected() {
        let err = Config::from_toml_str("[links.position_weights]\nheader = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("header"));
    }

    #[test]
    fn test_relative_path_pattern_rejected() {
        let err = Config::from_toml_str("[links]\nreference_paths = [\"docs\"]\n").unwrap_err();
        assert!(err.to_string().contains("docs"));
    }

    #[test]
    fn test_config_load_from_env_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("custom.toml");
        fs::write(&config_path, TEST_CONFIG).unwrap();

        let original = std::env::var("SITEGRAPH_CONFIG").ok();
        std::env::set_var("SITEGRAPH_CONFIG", config_path.to_str().unwrap());
        let config = Config::load();
        std::env::remove_var("SITEGRAPH_CONFIG");
        if let Some(v) = original {
            std::env::set_var("SITEGRAPH_CONFIG", v);
        }

        let config = config.unwrap();
        assert_eq!(config.graph.base_domain.as_deref(), Some("example.ac.uk"));
    }

    #[test]
    fn test_config_missing_default_file_uses_defaults() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        let _cwd = CwdGuard(original_dir);
        std::env::set_current_dir(temp_dir.path()).unwrap();

        let original = std::env::var("SITEGRAPH_CONFIG").ok();
        std::env::remove_var("SITEGRAPH_CONFIG");
        let config = Config::load();
        if let Some(v) = original {
            std::env::set_var("SITEGRAPH_CONFIG", v);
        }

        assert!(config.unwrap().graph.base_domain.is_none());
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("SITEGRAPH_CONFIG").ok();
        std::env::set_var("SITEGRAPH_CONFIG", "nonexistent.toml");
        let config = Config::load();
        assert!(config.is_err());
        std::env::remove_var("SITEGRAPH_CONFIG");
        if let Some(v) = original {
            std::env::set_var("SITEGRAPH_CONFIG", v);
        }
    }
}
