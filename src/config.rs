//! Configuration management for partscout using the prefer crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::ExtractionMode;
use crate::scrapers::browser::{BrowserEngineConfig, PageLoadConfig};
use crate::scrapers::extract::{ContextConfig, FieldMapping, PartNumberConfig};
use crate::scrapers::{ListingProfile, SiteProfile};

/// Default catalog origin for resolving relative links.
pub const DEFAULT_BASE_URL: &str = "https://vn.misumi-ec.com";

/// Query parameter selecting one part on a product page.
pub const DEFAULT_PART_PARAM: &str = "partNumber";

/// Run loop behaviour (`[run]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub mode: ExtractionMode,
    /// Extra attempts per URL after the first failure.
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Pause between pages.
    #[serde(default = "default_inter_page_delay_ms")]
    pub inter_page_delay_ms: u64,
    /// Start a fresh browser for every URL.
    #[serde(default)]
    pub session_per_url: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Input column holding product URLs. Defaults to the first column whose
    /// header contains "url".
    #[serde(default)]
    pub url_column: Option<String>,
    #[serde(default = "default_true")]
    pub dedupe_urls: bool,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub part_numbers: PartNumberConfig,
    /// When set, every part without its own price is looked up on
    /// `<page url>?<param>=<part number>` for that page's JSON-LD price.
    #[serde(default)]
    pub part_price_param: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::default(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            inter_page_delay_ms: default_inter_page_delay_ms(),
            session_per_url: false,
            base_url: default_base_url(),
            url_column: None,
            dedupe_urls: true,
            context: ContextConfig::default(),
            part_numbers: PartNumberConfig::default(),
            part_price_param: None,
        }
    }
}

fn default_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    3000
}

fn default_inter_page_delay_ms() -> u64 {
    1000
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_true() -> bool {
    true
}

/// Output files (`[output]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    /// File name stem; the processed input range is appended.
    #[serde(default = "default_stem")]
    pub stem: String,
    /// Prefix the CSV with a UTF-8 byte order mark (for spreadsheet apps).
    #[serde(default)]
    pub csv_bom: bool,
    /// Start the table with the part record columns in canonical order.
    #[serde(default = "default_true")]
    pub seed_columns: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            stem: default_stem(),
            csv_bom: false,
            seed_columns: true,
        }
    }
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_stem() -> String {
    "product_specifications".to_string()
}

/// Configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserEngineConfig,
    #[serde(default)]
    pub page: PageLoadConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub site: SiteProfile,
    #[serde(default)]
    pub fields: FieldMapping,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub listing: ListingProfile,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers partscout config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("partscout").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config {}: {}", path.display(), e);
                            Self::default_with_env()
                        }
                    }
                } else {
                    Self::default_with_env()
                }
            }
            Err(_) => Self::default_with_env(),
        }
    }

    /// Default config with environment variable overrides applied.
    pub fn default_with_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load configuration from a specific file path.
    /// Supports TOML, YAML and JSON based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config.with_env_overrides())
    }

    /// Parse config text, choosing the format from `path`'s extension.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, String> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        match ext {
            "json" => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {}", e)),
        }
    }

    /// Apply `PARTSCOUT_*` and `BROWSER_URL` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var("PARTSCOUT_HEADLESS") {
            if let Some(headless) = parse_bool(&value) {
                self.browser.headless = headless;
            }
        }
        if let Ok(url) = std::env::var("BROWSER_URL") {
            if !url.trim().is_empty() {
                self.browser.remote_url = Some(url);
            }
        }
        if let Ok(chrome) = std::env::var("PARTSCOUT_CHROME") {
            if !chrome.trim().is_empty() {
                self.browser.chrome_path = Some(PathBuf::from(chrome));
            }
        }
        if let Ok(dir) = std::env::var("PARTSCOUT_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output.dir = dir;
            }
        }
        self
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Serialize the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {}", e))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Runtime settings resolved from config and CLI.
#[derive(Debug, Clone)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub output_stem: String,
}

impl Settings {
    /// Resolve settings from `config`; relative output paths are taken from
    /// the config file's directory, or the working directory without one.
    pub fn from_config(config: &Config) -> Self {
        let base = config
            .base_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            output_dir: config.resolve_path(&config.output.dir, &base),
            output_stem: config.output.stem.clone(),
        }
    }
}

/// Load config from an explicit path or by discovery, plus settings.
pub async fn load_settings(config_path: Option<&Path>) -> anyhow::Result<(Settings, Config)> {
    let config = match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::load_from_path(path).await.map_err(|e| anyhow::anyhow!(e))?
        }
        None => Config::load().await,
    };
    let settings = Settings::from_config(&config);
    Ok((settings, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::locator::LocatorSpec;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("", Path::new("partscout.toml")).unwrap();
        assert_eq!(config.run, RunConfig::default());
        assert_eq!(config.browser.window_width, 1920);
        assert_eq!(config.run.context.window, 500);
        assert_eq!(config.output.stem, "product_specifications");
    }

    #[test]
    fn toml_sections_override_defaults() {
        let config = Config::parse(
            r#"
            [browser]
            headless = false
            locale = "vi-VN"

            [run]
            mode = "context"
            retries = 0
            session_per_url = true

            [run.context]
            window = 200

            [site]
            part_table = [{ by = "class_contains", value = "PartsTable" }]
            "#,
            Path::new("partscout.toml"),
        )
        .unwrap();
        assert!(!config.browser.headless);
        assert_eq!(config.browser.locale, "vi-VN");
        assert_eq!(config.run.mode, ExtractionMode::Context);
        assert_eq!(config.run.retries, 0);
        assert!(config.run.session_per_url);
        assert_eq!(config.run.context.window, 200);
        assert_eq!(config.site.part_table, vec![LocatorSpec::class_contains("PartsTable")]);
        assert_eq!(config.page, PageLoadConfig::default());
    }

    #[test]
    fn yaml_and_json_are_supported() {
        let yaml = Config::parse("output:\n  dir: /tmp/out\n  csv_bom: true\n", Path::new("c.yaml")).unwrap();
        assert_eq!(yaml.output.dir, "/tmp/out");
        assert!(yaml.output.csv_bom);

        let json = Config::parse(r#"{"page": {"settle_delay_ms": 0}}"#, Path::new("c.json")).unwrap();
        assert_eq!(json.page.settle_delay_ms, 0);
        assert!(json.page.scroll);
    }

    #[test]
    fn bad_config_reports_format() {
        let err = Config::parse("[run\nretries = ", Path::new("c.toml")).unwrap_err();
        assert!(err.contains("TOML"));
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let config = Config::default();
        assert_eq!(
            config.resolve_path("out", Path::new("/etc/partscout")),
            PathBuf::from("/etc/partscout/out")
        );
        assert_eq!(config.resolve_path("/abs", Path::new("/x")), PathBuf::from("/abs"));
    }

    #[test]
    fn field_rules_are_configurable() {
        let config = Config::parse(
            r#"
            [[fields.rules]]
            field = "weight"
            keywords = [["khoi", "luong"]]
            check = "numeric"
            "#,
            Path::new("c.toml"),
        )
        .unwrap();
        assert_eq!(config.fields.rules.len(), 1);
        assert_eq!(
            config.fields.field_for("Khoi luong (g)").map(|r| r.field),
            Some(crate::models::Field::Weight)
        );
    }

    #[test]
    fn bool_env_values() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
