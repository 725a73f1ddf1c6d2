//! # Sentry Exporter Collector
//!
//! Collects error statistics from the Sentry API and turns them into Prometheus metrics.
//!
//! ## Architecture
//!
//! - **`cache`**: TTL-gated cache of the organisation, its teams and its projects
//! - **`stats`**: Per (project, query kind) stat fetching with bounded retry
//! - **`collector`**: `SentryCollector`, which refreshes the cache, fans out the stat fetches
//!   and joins them into one set of samples per cycle
//! - **`metrics`**: Metric descriptors, samples and the text exposition encoder
//!
//! A cycle refreshes the hierarchy (organisation, then teams and projects), emits one
//! `sentry_project_info` sample per team/project link, fetches the stats of every included
//! project concurrently and finally reports how many Sentry API calls succeeded or failed.

#[macro_use]
extern crate tracing;

pub mod cache;
pub mod clock;
pub mod collector;
pub mod counters;
pub mod filters;
pub mod metrics;
pub mod retry;
pub mod stats;

pub use cache::{
    HierarchyCache,
    HierarchyRefresh,
    RefreshOutcome,
    RefreshState,
    Segment,
    Ttls,
};
pub use clock::{
    Clock,
    ManualClock,
    SystemClock,
};
pub use collector::{
    CollectorSettings,
    SentryCollector,
};
pub use counters::{
    ApiCallCounters,
    ApiCallCounts,
    CallOutcome,
};
pub use filters::IncludeFilters;
pub use metrics::{
    descriptors,
    encode_text,
    MetricDescriptor,
    MetricKind,
    MetricSample,
};
pub use retry::RetryPolicy;
pub use stats::{
    sum_buckets,
    ScalarStat,
    StatFetcher,
    StatWindow,
};
