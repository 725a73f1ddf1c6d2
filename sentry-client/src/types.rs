use serde::{
    Deserialize,
    Serialize,
};
use strum::{
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organisation {
    pub slug: String,
    #[serde(default)]
    pub name: String,
}

/// A project as referenced from a team listing. Only the slug matters for linking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub slug: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub projects: Vec<ProjectRef>,
}

impl Team {
    pub fn owns_project(&self, project_slug: &str) -> bool {
        self.projects.iter().any(|p| p.slug == project_slug)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub slug: String,
    #[serde(default)]
    pub name: String,
}

/// One page of the organisation wide project listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPage {
    pub projects: Vec<Project>,
    /// Cursor of the following page, `None` once the listing is exhausted.
    pub next_cursor: Option<String>,
}

/// A `[timestamp, count]` pair as returned by the project stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatBucket(pub i64, pub f64);

impl StatBucket {
    pub fn timestamp(&self) -> i64 {
        self.0
    }

    pub fn count(&self) -> f64 {
        self.1
    }
}

/// The categories of event counts tracked per project.
#[derive(
    Debug, Clone, Copy, Display, EnumIter, EnumString, IntoStaticStr, Serialize, Deserialize, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QueryKind {
    Received,
    Rejected,
    Blacklisted,
    Generated,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn query_kinds_use_lowercase_wire_names() {
        let names: Vec<String> = QueryKind::iter().map(|q| q.to_string()).collect();
        assert_eq!(names, vec!["received", "rejected", "blacklisted", "generated"]);
        for kind in QueryKind::iter() {
            let name: &'static str = kind.into();
            assert_eq!(name, kind.to_string());
            assert_eq!(QueryKind::from_str(name).unwrap(), kind);
        }
    }

    #[test]
    fn stat_buckets_decode_from_pairs() {
        let buckets: Vec<StatBucket> = serde_json::from_str("[[1625990400, 5], [1625990410, 7.0]]").unwrap();
        assert_eq!(buckets, vec![StatBucket(1625990400, 5.0), StatBucket(1625990410, 7.0)]);
        assert_eq!(buckets[1].timestamp(), 1625990410);
        assert_eq!(buckets[1].count(), 7.0);
    }

    #[test]
    fn team_listing_decodes_nested_projects() {
        let team: Team = serde_json::from_str(
            r#"{"id": "2", "slug": "core", "name": "Core", "projects": [{"slug": "api", "name": "API"}, {"slug": "worker"}]}"#,
        )
        .unwrap();
        assert!(team.owns_project("api"));
        assert!(team.owns_project("worker"));
        assert!(!team.owns_project("web"));
    }
}
