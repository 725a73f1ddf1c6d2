use color_eyre::Result;
use sentry_client::HttpSentryClient;
use sentry_exporter_collector::{
    encode_text,
    CollectorSettings,
    IncludeFilters,
    MetricDescriptor,
    RetryPolicy,
    SentryCollector,
    Ttls,
};
use sentry_exporter_config::{
    Command,
    Config,
};
use std::{
    sync::Arc,
    time::Duration,
};
use tokio::time::MissedTickBehavior;

pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(self, command: Command) -> Result<()> {
        match command {
            Command::Describe => {
                println!("{}", format_descriptors(&sentry_exporter_collector::descriptors()));
                Ok(())
            }
            Command::Collect => {
                let collector = self.collector()?;
                print_cycle(&collector).await
            }
            Command::Watch { interval } => {
                let collector = self.collector()?;
                watch(&collector, interval).await
            }
        }
    }

    fn collector(&self) -> Result<SentryCollector> {
        self.config.validate()?;

        let client = HttpSentryClient::new(
            &self.config.token,
            self.config.api_url.as_ref().map(|url| url.as_str()),
            Some(self.config.request_timeout()),
        )?;

        let settings = CollectorSettings {
            organisation_name: self.config.organisation_name.clone(),
            ttls: Ttls {
                organisation: self.config.organisation_ttl(),
                teams: self.config.teams_ttl(),
                projects: self.config.projects_ttl(),
            },
            filters: IncludeFilters::new(self.config.include_projects(), self.config.include_teams()),
            retry: RetryPolicy::default(),
        };

        info!(
            organisation = %settings.organisation_name,
            ttls = ?settings.ttls,
            "Created Sentry collector"
        );

        Ok(SentryCollector::new(Arc::new(client), settings))
    }
}

async fn print_cycle(collector: &SentryCollector) -> Result<()> {
    let samples = collector.collect().await;
    print!("{}", encode_text(&samples)?);
    Ok(())
}

/// Collect every `interval` until interrupted. The collector, and with it the hierarchy cache
/// and the stat window, lives across cycles.
async fn watch(collector: &SentryCollector, interval: Duration) -> Result<()> {
    info!(interval = %humantime::format_duration(interval), "Collecting periodically");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = print_cycle(collector).await {
                    error!(error = %err, "Could not export metrics");
                }
                println!();
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                return Ok(());
            }
        }
    }
}

fn format_descriptors(descriptors: &[MetricDescriptor]) -> String {
    descriptors
        .iter()
        .map(|d| format!("{} ({}) [{}]\n    {}", d.name, d.kind, d.label_names.join(", "), d.help))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_are_listed_with_labels() {
        let text = format_descriptors(&sentry_exporter_collector::descriptors());
        assert!(text.contains("sentry_project_info (counter) [organisation, team, project]"));
        assert!(text.contains("sentry_project_errors (gauge) [organisation, project, query]"));
        assert!(text.contains("sentry_api_calls (gauge) [status]"));
    }

    #[test]
    fn collector_requires_credentials() {
        let app = App::new(Config::default());
        assert!(app.collector().is_err());
    }
}
