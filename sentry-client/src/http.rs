use crate::{
    api::SentryApi,
    error::{
        ApiError,
        Result,
    },
    types::{
        Organisation,
        Project,
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
use futures::{
    future::BoxFuture,
    FutureExt as _,
};
use reqwest::{
    header::{
        HeaderMap,
        HeaderValue,
        AUTHORIZATION,
        LINK,
    },
    StatusCode,
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://sentry.io/api/0/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// [`SentryApi`] implementation talking to the Sentry web API over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpSentryClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSentryClient {
    pub fn new(token: &str, base_url: Option<&str>, timeout: Option<Duration>) -> Result<Self> {
        let mut base_url = Url::parse(base_url.unwrap_or(DEFAULT_API_URL))?;
        // `Url::join` drops the last path segment unless it ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::Other("token contains invalid header characters".to_string()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;

        debug!(%base_url, "Instantiated Sentry client");

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<(T, HeaderMap)> {
        trace!(%url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Err(ApiError::NotFound(url.path().to_string())),
            status if !status.is_success() => {
                return Err(ApiError::Status {
                    status,
                    url: url.to_string(),
                })
            }
            _ => {}
        }
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        let value = serde_json::from_slice(&body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })?;
        Ok((value, headers))
    }
}

impl SentryApi for HttpSentryClient {
    fn organisation<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Organisation>> {
        async move {
            debug!(org = name, "Querying API for organisation");
            let url = self.endpoint(&format!("organizations/{name}/"))?;
            let (org, _) = self.get_json(url).await?;
            Ok(org)
        }
        .boxed()
    }

    fn organisation_teams<'a>(&'a self, org: &'a Organisation) -> BoxFuture<'a, Result<Vec<Team>>> {
        async move {
            debug!(org = %org.slug, "Querying API for organisation teams");
            let url = self.endpoint(&format!("organizations/{}/teams/", org.slug))?;
            let (teams, _) = self.get_json(url).await?;
            Ok(teams)
        }
        .boxed()
    }

    fn organisation_projects_page<'a>(
        &'a self,
        org: &'a Organisation,
        cursor: Option<&'a str>,
    ) -> BoxFuture<'a, Result<ProjectPage>> {
        async move {
            debug!(org = %org.slug, ?cursor, "Querying API for organisation projects");
            let mut url = self.endpoint(&format!("organizations/{}/projects/", org.slug))?;
            if let Some(cursor) = cursor {
                url.query_pairs_mut().append_pair("cursor", cursor);
            }
            let (projects, headers): (Vec<Project>, _) = self.get_json(url).await?;
            let next_cursor = headers
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_cursor);
            Ok(ProjectPage { projects, next_cursor })
        }
        .boxed()
    }

    fn project_stats<'a>(
        &'a self,
        org_slug: &'a str,
        project_slug: &'a str,
        query: QueryKind,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        resolution: &'a str,
    ) -> BoxFuture<'a, Result<Vec<StatBucket>>> {
        async move {
            let mut url = self.endpoint(&format!("projects/{org_slug}/{project_slug}/stats/"))?;
            url.query_pairs_mut()
                .append_pair("stat", query.into())
                .append_pair("since", &since.timestamp().to_string())
                .append_pair("until", &until.timestamp().to_string())
                .append_pair("resolution", resolution);
            let (buckets, _) = self.get_json(url).await?;
            Ok(buckets)
        }
        .boxed()
    }
}

/// Extract the cursor of the next page from a Sentry `Link` header.
///
/// Sentry always sends a `rel="next"` entry; `results="false"` marks the end of the listing.
pub fn next_cursor(link_header: &str) -> Option<String> {
    link_header.split(',').find_map(|entry| {
        let mut is_next = false;
        let mut has_results = false;
        let mut cursor = None;
        for param in entry.split(';').skip(1) {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"');
            match key.trim() {
                "rel" => is_next = value == "next",
                "results" => has_results = value == "true",
                "cursor" => cursor = Some(value.to_string()),
                _ => {}
            }
        }
        if is_next && has_results {
            cursor
        } else {
            None
        }
    })
}
