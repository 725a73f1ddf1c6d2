use crate::{
    counters::ApiCallCounters,
    stats::StatWindow,
};
use chrono::{
    DateTime,
    TimeDelta,
    Utc,
};
use sentry_client::{
    ApiError,
    Organisation,
    Project,
    SentryApi,
    Team,
};
use std::{
    collections::HashSet,
    future::Future,
    time::Duration,
};
use strum::Display;

/// How far back, in seconds, the very first stat fetch looks.
pub const BOOTSTRAP_LOOKBACK_SECS: i64 = 10;

/// An independently TTL-gated part of the cached hierarchy.
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum Segment {
    Organisation,
    Teams,
    Projects,
}

/// Maximum age of each cached segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ttls {
    pub organisation: Duration,
    pub teams: Duration,
    pub projects: Duration,
}

impl Default for Ttls {
    fn default() -> Self {
        Self {
            organisation: Duration::from_secs(86400),
            teams: Duration::from_secs(3600),
            projects: Duration::from_secs(600),
        }
    }
}

impl Ttls {
    pub fn get(&self, segment: Segment) -> Duration {
        match segment {
            Segment::Organisation => self.organisation,
            Segment::Teams => self.teams,
            Segment::Projects => self.projects,
        }
    }
}

/// Time of the last successful refresh per segment, plus the end of the last error scan.
///
/// Every field only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshState {
    pub organisation: Option<DateTime<Utc>>,
    pub teams: Option<DateTime<Utc>>,
    pub projects: Option<DateTime<Utc>>,
    pub errors: Option<DateTime<Utc>>,
}

impl RefreshState {
    pub fn get(&self, segment: Segment) -> Option<DateTime<Utc>> {
        match segment {
            Segment::Organisation => self.organisation,
            Segment::Teams => self.teams,
            Segment::Projects => self.projects,
        }
    }

    /// Whether `segment` was refreshed no longer than `ttl` before `now`.
    pub fn is_fresh(&self, segment: Segment, ttl: Duration, now: DateTime<Utc>) -> bool {
        let Some(last) = self.get(segment) else {
            return false;
        };
        match TimeDelta::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(last) <= ttl,
            // Too large to represent, never expires.
            Err(_) => true,
        }
    }

    pub fn advance(&mut self, segment: Segment, now: DateTime<Utc>) {
        let slot = match segment {
            Segment::Organisation => &mut self.organisation,
            Segment::Teams => &mut self.teams,
            Segment::Projects => &mut self.projects,
        };
        advance_to(slot, now);
    }

    pub fn advance_error_scan(&mut self, at: DateTime<Utc>) {
        advance_to(&mut self.errors, at);
    }

    /// The stat window of a cycle starting at `now`: from the end of the previous scan, or
    /// [`BOOTSTRAP_LOOKBACK_SECS`] before `now` on the first cycle.
    pub fn error_scan_window(&self, now: DateTime<Utc>) -> StatWindow {
        let start = self
            .errors
            .unwrap_or(now - TimeDelta::seconds(BOOTSTRAP_LOOKBACK_SECS))
            .min(now);
        StatWindow { start, end: now }
    }
}

fn advance_to(slot: &mut Option<DateTime<Utc>>, at: DateTime<Utc>) {
    if slot.map_or(true, |last| last < at) {
        *slot = Some(at);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Within TTL, nothing fetched.
    Fresh,
    Refreshed,
    /// The fetch failed, the previous snapshot stays in place.
    Failed,
    /// No organisation has been fetched yet, so there is nothing to refresh against.
    Skipped,
}

/// What a hierarchy refresh did to each segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyRefresh {
    pub organisation: RefreshOutcome,
    pub teams: RefreshOutcome,
    pub projects: RefreshOutcome,
}

/// Last fetched organisation, teams and projects.
///
/// Segments are replaced wholesale on a successful refresh and left untouched otherwise.
#[derive(Debug, Clone, Default)]
pub struct HierarchyCache {
    organisation: Option<Organisation>,
    teams: Vec<Team>,
    projects: Vec<Project>,
    refresh: RefreshState,
}

impl HierarchyCache {
    pub fn organisation(&self) -> Option<&Organisation> {
        self.organisation.as_ref()
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn refresh_state(&self) -> &RefreshState {
        &self.refresh
    }

    pub fn refresh_state_mut(&mut self) -> &mut RefreshState {
        &mut self.refresh
    }

    /// Refresh every stale segment, organisation first since the others depend on it.
    pub async fn refresh(
        &mut self,
        api: &dyn SentryApi,
        organisation_name: &str,
        ttls: &Ttls,
        now: DateTime<Utc>,
        counters: &ApiCallCounters,
    ) -> HierarchyRefresh {
        let organisation = self
            .refresh_organisation(api, organisation_name, ttls.get(Segment::Organisation), now, counters)
            .await;
        let teams = self.refresh_teams(api, ttls.get(Segment::Teams), now, counters).await;
        let projects = self.refresh_projects(api, ttls.get(Segment::Projects), now, counters).await;
        HierarchyRefresh {
            organisation,
            teams,
            projects,
        }
    }

    pub async fn refresh_organisation(
        &mut self,
        api: &dyn SentryApi,
        name: &str,
        ttl: Duration,
        now: DateTime<Utc>,
        counters: &ApiCallCounters,
    ) -> RefreshOutcome {
        refresh_if_stale(
            &mut self.refresh,
            &mut self.organisation,
            Segment::Organisation,
            ttl,
            now,
            || async move { counters.track(api.organisation(name).await).map(Some) },
        )
        .await
    }

    pub async fn refresh_teams(
        &mut self,
        api: &dyn SentryApi,
        ttl: Duration,
        now: DateTime<Utc>,
        counters: &ApiCallCounters,
    ) -> RefreshOutcome {
        let Some(org) = self.organisation.clone() else {
            warn!(segment = %Segment::Teams, "No organisation fetched yet, skipping refresh");
            return RefreshOutcome::Skipped;
        };
        refresh_if_stale(&mut self.refresh, &mut self.teams, Segment::Teams, ttl, now, || async move {
            counters.track(api.organisation_teams(&org).await)
        })
        .await
    }

    pub async fn refresh_projects(
        &mut self,
        api: &dyn SentryApi,
        ttl: Duration,
        now: DateTime<Utc>,
        counters: &ApiCallCounters,
    ) -> RefreshOutcome {
        let Some(org) = self.organisation.clone() else {
            warn!(segment = %Segment::Projects, "No organisation fetched yet, skipping refresh");
            return RefreshOutcome::Skipped;
        };
        refresh_if_stale(
            &mut self.refresh,
            &mut self.projects,
            Segment::Projects,
            ttl,
            now,
            || fetch_all_projects(api, &org, counters),
        )
        .await
    }
}

async fn refresh_if_stale<T, F, Fut>(
    refresh: &mut RefreshState,
    slot: &mut T,
    segment: Segment,
    ttl: Duration,
    now: DateTime<Utc>,
    fetch: F,
) -> RefreshOutcome
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    if refresh.is_fresh(segment, ttl, now) {
        trace!(%segment, "TTL not expired, using cached value");
        return RefreshOutcome::Fresh;
    }

    info!(%segment, "TTL expired, refreshing");
    match fetch().await {
        Ok(value) => {
            *slot = value;
            refresh.advance(segment, now);
            RefreshOutcome::Refreshed
        }
        Err(err) if err.is_not_found() => {
            error!(%segment, error = %err, "Could not refresh, the resource does not exist");
            RefreshOutcome::Failed
        }
        Err(err) => {
            error!(%segment, error = %err, "Could not refresh, keeping the cached value");
            RefreshOutcome::Failed
        }
    }
}

/// Walk the paginated project listing to the end. Any failing page fails the whole listing.
async fn fetch_all_projects(
    api: &dyn SentryApi,
    org: &Organisation,
    counters: &ApiCallCounters,
) -> Result<Vec<Project>, ApiError> {
    let mut projects = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = counters.track(api.organisation_projects_page(org, cursor.as_deref()).await)?;
        projects.extend(page.projects);
        match page.next_cursor {
            Some(next) if !seen.insert(next.clone()) => {
                warn!(cursor = %next, "Project listing returned an already visited cursor, stopping");
                break;
            }
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    debug!(org = %org.slug, count = projects.len(), "Fetched organisation projects");
    Ok(projects)
}
