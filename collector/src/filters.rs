use sentry_client::Team;
use std::collections::HashSet;

/// Project and team slugs to restrict the export to. An empty set includes everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeFilters {
    projects: HashSet<String>,
    teams: HashSet<String>,
}

impl IncludeFilters {
    pub fn new<P, T>(projects: P, teams: T) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            projects: projects.into_iter().map(Into::into).collect(),
            teams: teams.into_iter().map(Into::into).collect(),
        }
    }

    pub fn includes_project(&self, slug: &str) -> bool {
        self.projects.is_empty() || self.projects.contains(slug)
    }

    pub fn includes_team(&self, slug: &str) -> bool {
        self.teams.is_empty() || self.teams.contains(slug)
    }

    /// Whether at least one included team owns the project. Always true without a team filter.
    pub fn reachable_from_included_team(&self, project_slug: &str, teams: &[Team]) -> bool {
        self.teams.is_empty()
            || teams
                .iter()
                .any(|team| self.teams.contains(&team.slug) && team.owns_project(project_slug))
    }

    /// Whether stats of a project from the flat project list should be fetched.
    pub fn should_fetch(&self, project_slug: &str, teams: &[Team]) -> bool {
        self.includes_project(project_slug) && self.reachable_from_included_team(project_slug, teams)
    }
}
