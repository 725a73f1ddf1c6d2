//! Minimal client for the parts of the Sentry web API the exporter needs:
//! organisations, teams, the organisation wide project listing and project stats.

#[macro_use]
extern crate tracing;

mod api;
mod error;
mod http;
mod types;

pub use api::{
    SentryApi,
    STATS_RESOLUTION,
};
pub use error::{
    ApiError,
    Result,
};
pub use http::{
    next_cursor,
    HttpSentryClient,
    DEFAULT_API_URL,
    DEFAULT_TIMEOUT,
};
pub use types::{
    Organisation,
    Project,
    ProjectPage,
    ProjectRef,
    QueryKind,
    StatBucket,
    Team,
};
