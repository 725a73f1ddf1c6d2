use crate::log_config::{
    LogFormat,
    LogLevel,
};
use clap::{
    Parser,
    Subcommand,
};
use std::{
    path::PathBuf,
    time::Duration,
};

/// Export your Sentry metrics to Prometheus
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Config file (default is $CURRENT_DIR/.sentry-exporter.yaml)
    #[clap(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error
    #[clap(long = "loglevel", value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Log format: text|json
    #[clap(long = "logformat", value_name = "FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Sentry API token
    #[clap(long, value_name = "TOKEN", global = true)]
    pub token: Option<String>,

    /// Sentry organisation to query for statistics
    #[clap(long, value_name = "SLUG", global = true)]
    pub organisation: Option<String>,

    /// Comma separated projects to include in the export (default include all projects)
    #[clap(long = "include-projects", value_name = "SLUGS", global = true)]
    pub include_projects: Option<String>,

    /// Comma separated teams to include in the export (default include all teams)
    #[clap(long = "include-teams", value_name = "SLUGS", global = true)]
    pub include_teams: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run a single collection cycle and print the metrics in Prometheus text format
    Collect,
    /// Run a collection cycle every interval and print the metrics of each
    Watch {
        /// Time between the start of two cycles, e.g. "60s" or "5m"
        #[clap(long, default_value = "60s", value_parser = parse_interval)]
        interval: Duration,
    },
    /// Print the metrics this exporter produces
    Describe,
}

/// A humantime duration that is not zero.
fn parse_interval(value: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(value).map_err(|err| err.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(interval)
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(token) = &self.token {
                cache.insert("token".to_string(), token.clone().into());
            }
            if let Some(organisation) = &self.organisation {
                cache.insert("organisation_name".to_string(), organisation.clone().into());
            }
            if let Some(include_projects) = &self.include_projects {
                cache.insert("include_projects".to_string(), include_projects.clone().into());
            }
            if let Some(include_teams) = &self.include_teams {
                cache.insert("include_teams".to_string(), include_teams.clone().into());
            }
            if let Some(log_level) = &self.log_level {
                cache.insert("log_level".to_string(), log_level.to_string().into());
            }
            if let Some(log_format) = &self.log_format {
                cache.insert("log_format".to_string(), log_format.to_string().into());
            }
            Ok(cache)
        }
    }
}
