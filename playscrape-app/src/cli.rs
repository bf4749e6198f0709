use clap::Parser;
use playscrape_common::ConfigurationError;
use playscrape_config::{parse_app_ids, PlayscrapeConfig};
use std::path::PathBuf;

/// Scrape Google Play reviews for a list of apps into `<output-dir>/<app_id>.json`.
#[derive(Debug, Parser)]
#[command(name = "playscrape", version)]
pub struct Cli {
    /// Path to the chromedriver binary.
    #[arg(long, value_name = "PATH", env = "PLAYSCRAPE_DRIVER_LOCATION")]
    pub driver_location: Option<PathBuf>,

    /// Comma-separated app ids, e.g. `com.nhs.online.nhsonline`.
    #[arg(long, value_name = "ID,ID,...", env = "PLAYSCRAPE_APP_IDS")]
    pub app_ids: Option<String>,

    /// Maximum scroll actions per app [config default: 10].
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_scrolls: Option<u32>,

    /// YAML configuration file. `playscrape.yaml` is read when present.
    #[arg(long, value_name = "FILE", env = "PLAYSCRAPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory the per-app JSON files are written to [config default: data].
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Skip the storefront HTTP check of each app id.
    #[arg(long)]
    pub skip_validation: bool,

    /// Also save each app's rendered HTML as `<output-dir>/<app_id>-source.html`.
    #[arg(long)]
    pub save_page_source: bool,
}

impl Cli {
    /// Command-line values win over file and environment configuration.
    pub fn apply(&self, config: &mut PlayscrapeConfig) -> Result<(), ConfigurationError> {
        if let Some(location) = &self.driver_location {
            config.driver.location = Some(location.clone());
        }
        if let Some(raw) = &self.app_ids {
            config.crawl.app_ids = parse_app_ids(raw)?
                .into_iter()
                .map(|t| t.as_str().to_string())
                .collect();
        }
        if let Some(max) = self.max_scrolls {
            config.crawl.max_scrolls = max;
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if self.skip_validation {
            config.validation.enabled = false;
        }
        if self.save_page_source {
            config.output.save_page_source = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("playscrape").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_config() {
        let cli = parse(&[
            "--driver-location",
            "/opt/chromedriver",
            "--app-ids",
            "com.a, com.b",
            "--max-scrolls",
            "3",
            "--output-dir",
            "out",
            "--skip-validation",
            "--save-page-source",
        ]);
        let mut config = PlayscrapeConfig::default();
        cli.apply(&mut config).unwrap();

        assert_eq!(config.driver.location, Some(PathBuf::from("/opt/chromedriver")));
        assert_eq!(config.crawl.app_ids, ["com.a", "com.b"]);
        assert_eq!(config.crawl.max_scrolls, 3);
        assert_eq!(config.output.dir, PathBuf::from("out"));
        assert!(!config.validation.enabled);
        assert!(config.output.save_page_source);
    }

    #[test]
    fn absent_flags_leave_config_alone() {
        let mut config = PlayscrapeConfig::default();
        config.crawl.max_scrolls = 7;
        Cli {
            driver_location: None,
            app_ids: None,
            max_scrolls: None,
            config: None,
            output_dir: None,
            skip_validation: false,
            save_page_source: false,
        }
        .apply(&mut config)
        .unwrap();

        assert_eq!(config.crawl.max_scrolls, 7);
        assert!(config.validation.enabled);
        assert!(!config.output.save_page_source);
    }

    #[test]
    fn zero_scrolls_rejected_at_parse() {
        let result = Cli::try_parse_from(["playscrape", "--max-scrolls", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn blank_app_id_is_a_configuration_error() {
        let cli = parse(&["--app-ids", "com.a,,com.b"]);
        let mut config = PlayscrapeConfig::default();
        assert_eq!(
            cli.apply(&mut config),
            Err(ConfigurationError::BlankAppId)
        );
    }
}
