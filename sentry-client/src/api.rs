use crate::{
    error::Result,
    types::{
        Organisation,
        ProjectPage,
        QueryKind,
        StatBucket,
        Team,
    },
};
use chrono::{
    DateTime,
    Utc,
};
use futures::future::BoxFuture;

/// Stats are always requested in 10 second buckets.
pub const STATS_RESOLUTION: &str = "10s";

/// The calls the exporter makes against the Sentry API.
///
/// Every call may fail independently; callers decide whether and how to retry.
pub trait SentryApi: Send + Sync {
    /// Fetch the organisation with the given slug.
    fn organisation<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Organisation>>;

    /// Fetch all teams of an organisation, including the projects each team owns.
    fn organisation_teams<'a>(&'a self, org: &'a Organisation) -> BoxFuture<'a, Result<Vec<Team>>>;

    /// Fetch one page of the organisation wide project listing. `cursor` is `None` for the first page.
    fn organisation_projects_page<'a>(
        &'a self,
        org: &'a Organisation,
        cursor: Option<&'a str>,
    ) -> BoxFuture<'a, Result<ProjectPage>>;

    /// Fetch bucketed event counts of `query` for a project over `[since, until)`.
    fn project_stats<'a>(
        &'a self,
        org_slug: &'a str,
        project_slug: &'a str,
        query: QueryKind,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        resolution: &'a str,
    ) -> BoxFuture<'a, Result<Vec<StatBucket>>>;
}
