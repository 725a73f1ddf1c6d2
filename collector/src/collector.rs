use crate::{
    cache::{
        HierarchyCache,
        Ttls,
    },
    clock::{
        Clock,
        SystemClock,
    },
    counters::{
        ApiCallCounters,
        CallOutcome,
    },
    filters::IncludeFilters,
    metrics::{
        descriptors,
        MetricDescriptor,
        MetricSample,
    },
    retry::RetryPolicy,
    stats::{
        ScalarStat,
        StatFetcher,
        StatWindow,
    },
};
use futures::future::join_all;
use sentry_client::{
    QueryKind,
    SentryApi,
};
use std::sync::Arc;
use strum::IntoEnumIterator as _;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub organisation_name: String,
    pub ttls: Ttls,
    pub filters: IncludeFilters,
    pub retry: RetryPolicy,
}

impl CollectorSettings {
    pub fn new(organisation_name: impl Into<String>) -> Self {
        Self {
            organisation_name: organisation_name.into(),
            ttls: Ttls::default(),
            filters: IncludeFilters::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Turns the Sentry organisation hierarchy and project stats into metric samples.
///
/// The hierarchy is cached between cycles. Cycles are serialised: a second `collect` waits
/// until the running one has finished.
pub struct SentryCollector {
    api: Arc<dyn SentryApi>,
    clock: Arc<dyn Clock>,
    settings: CollectorSettings,
    counters: Arc<ApiCallCounters>,
    cache: Mutex<HierarchyCache>,
}

impl SentryCollector {
    pub fn new(api: Arc<dyn SentryApi>, settings: CollectorSettings) -> Self {
        Self {
            api,
            clock: Arc::new(SystemClock),
            settings,
            counters: Default::default(),
            cache: Default::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn describe(&self) -> Vec<MetricDescriptor> {
        descriptors()
    }

    /// Run a collection cycle with the configured include filters.
    pub async fn collect(&self) -> Vec<MetricSample> {
        self.collect_cycle(&self.settings.filters).await
    }

    /// Run a collection cycle. The returned samples are unordered.
    #[instrument(level = "debug", skip_all)]
    pub async fn collect_cycle(&self, filters: &IncludeFilters) -> Vec<MetricSample> {
        let mut cache = self.cache.lock().await;
        let started = self.clock.now();
        self.counters.reset();
        debug!(now = started.timestamp(), "Compiling metrics");

        let refreshed = cache
            .refresh(
                &*self.api,
                &self.settings.organisation_name,
                &self.settings.ttls,
                started,
                &self.counters,
            )
            .await;
        debug!(?refreshed, "Refreshed hierarchy");

        let window = cache.refresh_state().error_scan_window(started);
        let mut samples = Vec::new();

        match cache.organisation().map(|org| org.slug.clone()) {
            Some(org_slug) => {
                samples.extend(linkage_samples(&cache, &org_slug, filters));
                let stats = self.fetch_stats(&cache, &org_slug, filters, window).await;
                samples.extend(
                    stats
                        .into_iter()
                        .map(|stat| MetricSample::project_errors(&org_slug, &stat.project, stat.query, stat.value)),
                );
            }
            None => warn!(
                organisation = %self.settings.organisation_name,
                "Organisation unavailable, only exporting API call counts"
            ),
        }

        cache.refresh_state_mut().advance_error_scan(window.end);

        let counts = self.counters.snapshot();
        for outcome in CallOutcome::iter() {
            samples.push(MetricSample::api_calls(outcome, counts.get(outcome) as f64));
        }

        let finished = self.clock.now();
        debug!(
            now = finished.timestamp(),
            duration = (finished - started).num_seconds(),
            samples = samples.len(),
            "Done compiling metrics"
        );
        samples
    }

    /// Fetch one scalar per included (project, query kind) concurrently and wait for all of them.
    /// Pairs whose fetch failed are left out.
    async fn fetch_stats(
        &self,
        cache: &HierarchyCache,
        org_slug: &str,
        filters: &IncludeFilters,
        window: StatWindow,
    ) -> Vec<ScalarStat> {
        let fetcher = StatFetcher::new(self.api.clone(), self.counters.clone(), self.settings.retry);

        let handles: Vec<_> = cache
            .projects()
            .iter()
            .filter(|project| filters.should_fetch(&project.slug, cache.teams()))
            .flat_map(|project| QueryKind::iter().map(move |query| (project.slug.clone(), query)))
            .map(|(project, query)| {
                let fetcher = fetcher.clone();
                let org_slug = org_slug.to_string();
                tokio::spawn(async move {
                    match fetcher.fetch_scalar(&org_slug, &project, query, window).await {
                        Ok(value) => Some(ScalarStat { project, query, value }),
                        Err(err) => {
                            error!(%project, %query, error = %err, "Could not fetch project stats");
                            None
                        }
                    }
                })
            })
            .collect();

        debug!(tasks = handles.len(), "Waiting for project stats");

        join_all(handles)
            .await
            .into_iter()
            .filter_map(|joined| match joined {
                Ok(stat) => stat,
                Err(err) => {
                    error!(error = %err, "Project stats task did not complete");
                    None
                }
            })
            .collect()
    }
}

/// One info sample per (team, project) reference where both pass the filters.
fn linkage_samples(cache: &HierarchyCache, org_slug: &str, filters: &IncludeFilters) -> Vec<MetricSample> {
    cache
        .teams()
        .iter()
        .filter(|team| filters.includes_team(&team.slug))
        .flat_map(|team| {
            team.projects
                .iter()
                .filter(|project| filters.includes_project(&project.slug))
                .map(|project| MetricSample::project_info(org_slug, &team.slug, &project.slug))
        })
        .collect()
}
