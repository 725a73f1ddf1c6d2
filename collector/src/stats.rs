use crate::{
    counters::ApiCallCounters,
    retry::RetryPolicy,
};
use chrono::{
    DateTime,
    Utc,
};
use sentry_client::{
    ApiError,
    QueryKind,
    SentryApi,
    StatBucket,
    STATS_RESOLUTION,
};
use std::sync::Arc;

/// The half-open interval `[start, end)` stats are requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Event count of one query kind for one project over a cycle's window.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarStat {
    pub project: String,
    pub query: QueryKind,
    pub value: f64,
}

/// Sum the counts of all buckets. Negative counts are treated as zero.
pub fn sum_buckets(buckets: &[StatBucket]) -> f64 {
    buckets.iter().map(|bucket| bucket.count().max(0.0)).sum()
}

/// Fetches and reduces the stats of a single (project, query kind) pair.
#[derive(Clone)]
pub struct StatFetcher {
    api: Arc<dyn SentryApi>,
    counters: Arc<ApiCallCounters>,
    retry: RetryPolicy,
}

impl StatFetcher {
    pub fn new(api: Arc<dyn SentryApi>, counters: Arc<ApiCallCounters>, retry: RetryPolicy) -> Self {
        Self { api, counters, retry }
    }

    /// Every attempt is recorded in the API call counters. After the last failed attempt its
    /// error is returned.
    pub async fn fetch_scalar(
        &self,
        org_slug: &str,
        project_slug: &str,
        query: QueryKind,
        window: StatWindow,
    ) -> Result<f64, ApiError> {
        let buckets = self
            .retry
            .run(|attempt| async move {
                debug!(project = project_slug, %query, attempt, "Fetching error counts");
                let result = self
                    .api
                    .project_stats(org_slug, project_slug, query, window.start, window.end, STATS_RESOLUTION)
                    .await;
                if let Err(err) = &result {
                    debug!(project = project_slug, %query, attempt, error = %err, "Could not fetch stats");
                }
                self.counters.track(result)
            })
            .await?;
        Ok(sum_buckets(&buckets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bucket_list_sums_to_zero() {
        assert_eq!(sum_buckets(&[]), 0.0);
    }

    #[test]
    fn sum_is_independent_of_bucket_order() {
        let forward = [StatBucket(10, 5.0), StatBucket(20, 7.0)];
        let backward = [StatBucket(20, 7.0), StatBucket(10, 5.0)];
        assert_eq!(sum_buckets(&forward), 12.0);
        assert_eq!(sum_buckets(&backward), 12.0);
    }

    #[test]
    fn sum_is_never_negative() {
        assert_eq!(sum_buckets(&[StatBucket(10, -3.0), StatBucket(20, 2.0)]), 2.0);
    }
}
