#[macro_use]
extern crate tracing;

mod args;
mod log_config;

pub use args::{
    Args,
    Command,
};
use eyre::bail;
pub use log_config::{
    LogFormat,
    LogLevel,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashMap,
    path::Path,
    time::Duration,
};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = ".sentry-exporter.yaml";
/// Environment variables with this prefix override file values, e.g. `SENTRY_EXPORTER_TOKEN`.
pub const ENV_PREFIX: &str = "SENTRY_EXPORTER";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing)]
    pub token: String,
    #[serde(default)]
    pub organisation_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<url::Url>,
    /// Request timeout in seconds.
    pub timeout: u64,
    pub ttl_organisation: u64,
    pub ttl_teams: u64,
    pub ttl_projects: u64,
    /// Comma separated project slugs. Empty includes all projects.
    #[serde(default)]
    pub include_projects: String,
    /// Comma separated team slugs. Empty includes all teams.
    #[serde(default)]
    pub include_teams: String,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub log_format: LogFormat,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl config::Source for Config {
    fn clone_into_box(&self) -> Box<dyn config::Source + Send + Sync> {
        Box::new((*self).clone())
    }

    fn collect(&self) -> Result<config::Map<String, config::Value>, config::ConfigError> {
        let mut cache = HashMap::<String, config::Value>::new();
        if !self.token.is_empty() {
            cache.insert("token".to_string(), self.token.clone().into());
        }
        if !self.organisation_name.is_empty() {
            cache.insert("organisation_name".to_string(), self.organisation_name.clone().into());
        }
        if let Some(url) = &self.api_url {
            cache.insert("api_url".to_string(), url.to_string().into());
        }
        cache.insert("timeout".to_string(), self.timeout.into());
        cache.insert("ttl_organisation".to_string(), self.ttl_organisation.into());
        cache.insert("ttl_teams".to_string(), self.ttl_teams.into());
        cache.insert("ttl_projects".to_string(), self.ttl_projects.into());
        if !self.include_projects.is_empty() {
            cache.insert("include_projects".to_string(), self.include_projects.clone().into());
        }
        if !self.include_teams.is_empty() {
            cache.insert("include_teams".to_string(), self.include_teams.clone().into());
        }
        cache.insert("log_level".to_string(), self.log_level.to_string().into());
        cache.insert("log_format".to_string(), self.log_format.to_string().into());
        Ok(cache)
    }
}

impl Config {
    /// Layer defaults, the config file, `SENTRY_EXPORTER_*` environment variables and
    /// command-line arguments, in increasing order of precedence.
    pub fn new(args: &Args) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder().add_source(Config::default());

        builder = match &args.config {
            Some(path) => builder.add_source(config::File::from(path.as_path()).format(config::FileFormat::Yaml)),
            None => builder.add_source(
                config::File::from(Path::new(DEFAULT_CONFIG_FILE))
                    .format(config::FileFormat::Yaml)
                    .required(false),
            ),
        };

        builder = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .add_source(args.clone());

        let cfg: Self = builder.build()?.try_deserialize()?;
        debug!(
            organisation = %cfg.organisation_name,
            api_url = ?cfg.api_url,
            include_projects = %cfg.include_projects,
            include_teams = %cfg.include_teams,
            "Loaded configuration"
        );
        Ok(cfg)
    }

    /// Check the settings a collection cycle cannot do without.
    pub fn validate(&self) -> eyre::Result<()> {
        if self.token.trim().is_empty() {
            bail!("No Sentry token configured, use --token, SENTRY_EXPORTER_TOKEN or `token` in the config file");
        }
        if self.organisation_name.trim().is_empty() {
            bail!(
                "No organisation configured, use --organisation, SENTRY_EXPORTER_ORGANISATION_NAME or \
                 `organisation_name` in the config file"
            );
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn organisation_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_organisation)
    }

    pub fn teams_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_teams)
    }

    pub fn projects_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_projects)
    }

    pub fn include_projects(&self) -> Vec<String> {
        split_list(&self.include_projects)
    }

    pub fn include_teams(&self) -> Vec<String> {
        split_list(&self.include_teams)
    }
}

/// Split a comma separated list, dropping blank entries.
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_has_original_ttls() {
        let config = Config::default();
        assert_eq!(config.organisation_ttl(), Duration::from_secs(86400));
        assert_eq!(config.teams_ttl(), Duration::from_secs(3600));
        assert_eq!(config.projects_ttl(), Duration::from_secs(600));
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.include_projects().is_empty());
    }

    #[test]
    fn splits_lists_and_drops_blanks() {
        assert_eq!(split_list("api, worker,,web "), vec!["api", "worker", "web"]);
        assert!(split_list("").is_empty());
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn args_override_the_config_file() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.child("sentry-exporter.yaml");
        std::fs::write(
            &path,
            "token: from-file\norganisation_name: acme\nttl_projects: 120\ninclude_projects: api\napi_url: https://sentry.example.com/api/0/\n",
        )
        .unwrap();

        let args = Args::parse_from([
            "sentry-exporter",
            "--config",
            path.to_str().unwrap(),
            "--token",
            "from-args",
            "--include-teams",
            "core, web",
            "collect",
        ]);
        let config = Config::new(&args).unwrap();

        assert_eq!(config.token, "from-args");
        assert_eq!(config.organisation_name, "acme");
        assert_eq!(config.projects_ttl(), Duration::from_secs(120));
        assert_eq!(config.teams_ttl(), Duration::from_secs(3600));
        assert_eq!(config.include_projects(), vec!["api"]);
        assert_eq!(config.include_teams(), vec!["core", "web"]);
        assert_eq!(
            config.api_url.as_ref().map(|u| u.as_str()),
            Some("https://sentry.example.com/api/0/")
        );
        config.validate().unwrap();
    }

    #[test]
    fn missing_config_file_is_an_error_when_given_explicitly() {
        let args = Args::parse_from(["sentry-exporter", "--config", "/does/not/exist.yaml", "collect"]);
        assert!(Config::new(&args).is_err());
    }

    #[test]
    fn validation_requires_token_and_organisation() {
        let mut config = Config::default();
        assert!(config.validate().unwrap_err().to_string().contains("token"));

        config.token = "secret".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("organisation"));

        config.organisation_name = "acme".to_string();
        assert!(config.validate().is_ok());
    }
}
