//! Loader for crawl configuration with YAML + environment overlays.
//!
//! Sources are merged in order: YAML files or inline snippets, then
//! `PLAYSCRAPE__SECTION__KEY` environment variables. String values may
//! reference other variables as `${VAR}`; those are expanded recursively (up
//! to a fixed depth) before the typed structs are built. Every field has a
//! default, so an empty source set yields a usable config apart from the
//! required driver location and app ids, which [`PlayscrapeConfig::validate`]
//! checks.
use config::{Config, ConfigError, Environment, File};
use playscrape_common::observability::LogFormat;
use playscrape_common::{AppTarget, ConfigurationError};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "PLAYSCRAPE";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayscrapeConfig {
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the chromedriver binary lives and how to talk to it.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    #[serde(default)]
    pub location: Option<PathBuf>,
    #[serde(default = "default_driver_port")]
    pub port: u16,
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
    /// Settle delay after navigating to a storefront page.
    #[serde(default = "default_navigation_delay_ms")]
    pub navigation_delay_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            location: None,
            port: default_driver_port(),
            startup_timeout_secs: default_startup_timeout_secs(),
            navigation_delay_ms: default_navigation_delay_ms(),
        }
    }
}

impl DriverConfig {
    pub fn navigation_delay(&self) -> Duration {
        Duration::from_millis(self.navigation_delay_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    #[serde(default)]
    pub app_ids: Vec<String>,
    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: u32,
    /// `null` disables early stopping on a stalled page.
    #[serde(default = "default_stall_limit")]
    pub stall_limit: Option<u32>,
    #[serde(default = "default_true")]
    pub expand_truncated: bool,
    #[serde(default)]
    pub settle: SettleConfig,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            app_ids: Vec::new(),
            max_scrolls: default_max_scrolls(),
            stall_limit: default_stall_limit(),
            expand_truncated: true,
            settle: SettleConfig::default(),
        }
    }
}

/// Settle behaviour after each scroll; the tag is `mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SettleConfig {
    Fixed {
        #[serde(default = "default_settle_delay_ms")]
        delay_ms: u64,
    },
    Poll {
        #[serde(default = "default_poll_interval_ms")]
        interval_ms: u64,
        #[serde(default = "default_poll_timeout_ms")]
        timeout_ms: u64,
    },
}

impl Default for SettleConfig {
    fn default() -> Self {
        SettleConfig::Fixed {
            delay_ms: default_settle_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Also write `<dir>/<app_id>-source.html` with the crawled page's HTML.
    #[serde(default)]
    pub save_page_source: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            save_page_source: false,
        }
    }
}

/// Pre-flight check of every app id against the storefront.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_validation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_validation_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_true")]
    pub emit_stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: default_log_format(),
            filter: default_log_filter(),
            emit_stderr: true,
        }
    }
}

fn default_driver_port() -> u16 {
    9515
}
fn default_startup_timeout_secs() -> u64 {
    10
}
fn default_navigation_delay_ms() -> u64 {
    6000
}
fn default_max_scrolls() -> u32 {
    10
}
fn default_stall_limit() -> Option<u32> {
    Some(2)
}
fn default_true() -> bool {
    true
}
fn default_settle_delay_ms() -> u64 {
    2000
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_poll_timeout_ms() -> u64 {
    6000
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_validation_timeout_secs() -> u64 {
    15
}
fn default_log_format() -> LogFormat {
    LogFormat::Text
}
fn default_log_filter() -> String {
    "info".into()
}

/// Split a comma-separated id list. Duplicates are dropped, first one wins.
///
/// ```
/// use playscrape_config::parse_app_ids;
///
/// let ids = parse_app_ids("com.a, com.b,com.a").unwrap();
/// let ids: Vec<_> = ids.iter().map(|t| t.as_str()).collect();
/// assert_eq!(ids, ["com.a", "com.b"]);
/// assert!(parse_app_ids("").is_err());
/// ```
pub fn parse_app_ids(raw: &str) -> Result<Vec<AppTarget>, ConfigurationError> {
    if raw.trim().is_empty() {
        return Err(ConfigurationError::NoAppIds);
    }
    targets_from(raw.split(','))
}

fn targets_from<I, S>(ids: I) -> Result<Vec<AppTarget>, ConfigurationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut targets: Vec<AppTarget> = Vec::new();
    for id in ids {
        let target = AppTarget::new(id)?;
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    if targets.is_empty() {
        return Err(ConfigurationError::NoAppIds);
    }
    Ok(targets)
}

impl PlayscrapeConfig {
    /// App ids as crawl targets, in the configured order.
    pub fn app_targets(&self) -> Result<Vec<AppTarget>, ConfigurationError> {
        if self.crawl.app_ids.iter().all(|id| id.trim().is_empty()) {
            return Err(ConfigurationError::NoAppIds);
        }
        targets_from(&self.crawl.app_ids)
    }

    /// Driver binary path with `~` and `$VAR` expanded.
    pub fn driver_location(&self) -> Result<PathBuf, ConfigurationError> {
        let raw = self
            .driver
            .location
            .as_ref()
            .ok_or(ConfigurationError::MissingDriverLocation)?;
        let raw = raw.to_string_lossy();
        if raw.trim().is_empty() {
            return Err(ConfigurationError::MissingDriverLocation);
        }
        let expanded = shellexpand::full(&raw)
            .map_err(|e| ConfigurationError::Invalid(format!("driver location: {e}")))?;
        Ok(PathBuf::from(expanded.into_owned()))
    }

    /// Check everything that must hold before a browser session opens.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.crawl.max_scrolls == 0 {
            return Err(ConfigurationError::ZeroMaxScrolls);
        }
        if let SettleConfig::Poll { interval_ms: 0, .. } = self.crawl.settle {
            return Err(ConfigurationError::Invalid(
                "settle.interval_ms must be positive".into(),
            ));
        }
        self.app_targets()?;
        let driver = self.driver_location()?;
        if !driver.is_file() {
            return Err(ConfigurationError::DriverNotFound(driver));
        }
        Ok(())
    }
}

// Recursive `${VAR}` expansion across strings nested in arrays/objects.
fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct PlayscrapeConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env: Environment,
}

impl Default for PlayscrapeConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayscrapeConfigLoader {
    /// Start with `PLAYSCRAPE__` env overrides; files and snippets are added on top.
    ///
    /// ```
    /// use playscrape_config::PlayscrapeConfigLoader;
    ///
    /// let config = PlayscrapeConfigLoader::new()
    ///     .with_yaml_str("crawl:\n  max_scrolls: 3")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.crawl.max_scrolls, 3);
    /// assert_eq!(config.crawl.stall_limit, Some(2));
    /// assert_eq!(config.driver.port, 9515);
    /// ```
    pub fn new() -> Self {
        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("crawl.app_ids");
        Self {
            builder: Config::builder(),
            env,
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so deployments can rely purely on
    /// environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use playscrape_config::{PlayscrapeConfigLoader, SettleConfig};
    ///
    /// let cfg = PlayscrapeConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// crawl:
    ///   app_ids: ["com.example.app"]
    ///   settle:
    ///     mode: poll
    ///     interval_ms: 250
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.app_targets().unwrap()[0].as_str(), "com.example.app");
    /// assert_eq!(
    ///     cfg.crawl.settle,
    ///     SettleConfig::Poll { interval_ms: 250, timeout_ms: 6000 }
    /// );
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    pub fn load(self) -> Result<PlayscrapeConfig, ConfigError> {
        let cfg = self.builder.add_source(self.env).build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: PlayscrapeConfig =
            serde_json::from_value(v).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use temp_env;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("VENDOR", Some("nhs")), ("PKG", Some("online"))], || {
            let mut v = json!([
                "com.$VENDOR",
                { "id": "com.${VENDOR}.${PKG}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["com.nhs", { "id": "com.nhs.online" }, 42, true, null])
            );
        });
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${PLAYSCRAPE_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${PLAYSCRAPE_DOES_NOT_EXIST}"));
    }

    #[test]
    fn empty_id_list_is_rejected() {
        assert_eq!(parse_app_ids(""), Err(ConfigurationError::NoAppIds));
        assert_eq!(parse_app_ids("com.a,,com.b"), Err(ConfigurationError::BlankAppId));
        assert_eq!(
            PlayscrapeConfig::default().app_targets(),
            Err(ConfigurationError::NoAppIds)
        );
    }

    #[test]
    fn zero_max_scrolls_fails_validation_first() {
        let mut cfg = PlayscrapeConfig::default();
        cfg.crawl.max_scrolls = 0;
        assert_eq!(cfg.validate(), Err(ConfigurationError::ZeroMaxScrolls));
    }

    #[test]
    fn missing_driver_location_fails_validation() {
        let mut cfg = PlayscrapeConfig::default();
        cfg.crawl.app_ids = vec!["com.example".into()];
        assert_eq!(cfg.validate(), Err(ConfigurationError::MissingDriverLocation));
    }

    #[test]
    fn driver_location_must_exist() {
        let mut cfg = PlayscrapeConfig::default();
        cfg.crawl.app_ids = vec!["com.example".into()];
        cfg.driver.location = Some(PathBuf::from("/nonexistent/chromedriver"));
        assert_eq!(
            cfg.validate(),
            Err(ConfigurationError::DriverNotFound(PathBuf::from(
                "/nonexistent/chromedriver"
            )))
        );
    }

    #[test]
    fn tilde_in_driver_location_expands_to_home() {
        temp_env::with_var("HOME", Some("/home/tester"), || {
            let mut cfg = PlayscrapeConfig::default();
            cfg.driver.location = Some(PathBuf::from("~/bin/chromedriver"));
            assert_eq!(
                cfg.driver_location().unwrap(),
                PathBuf::from("/home/tester/bin/chromedriver")
            );
        });
    }
}
