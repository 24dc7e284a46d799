/*!
 * Content Store
 * Repository capability over the portfolio tables, with a PostgreSQL and an
 * in-memory implementation.
 */
pub mod memory;
pub mod postgres;
pub mod seed;

use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::db::models::{
    AdminUser, Analytics, Certification, CertificationPatch, ContactMessage, Learning,
    LearningPatch, NewAdmin, NewCertification, NewContactMessage, NewLearning, NewPageView,
    NewProject, NewSkill, PageCount, PageView, Project, ProjectPatch, Skill, SkillPatch,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// How many paths the analytics summary reports.
pub const TOP_PAGES_LIMIT: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read/write access to every content entity.
///
/// `update_*` returns `Ok(None)` and `delete_*` returns `Ok(false)` when the id
/// does not exist; callers decide how to report that.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    async fn health_check(&self) -> StoreResult<Duration>;

    async fn list_skills(&self) -> StoreResult<Vec<Skill>>;
    async fn create_skill(&self, new: NewSkill) -> StoreResult<Skill>;
    async fn update_skill(&self, id: Uuid, patch: SkillPatch) -> StoreResult<Option<Skill>>;
    async fn delete_skill(&self, id: Uuid) -> StoreResult<bool>;

    async fn list_projects(&self) -> StoreResult<Vec<Project>>;
    async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>>;
    async fn create_project(&self, new: NewProject) -> StoreResult<Project>;
    async fn update_project(&self, id: Uuid, patch: ProjectPatch)
        -> StoreResult<Option<Project>>;
    async fn delete_project(&self, id: Uuid) -> StoreResult<bool>;

    async fn list_certifications(&self) -> StoreResult<Vec<Certification>>;
    async fn create_certification(&self, new: NewCertification) -> StoreResult<Certification>;
    async fn update_certification(
        &self,
        id: Uuid,
        patch: CertificationPatch,
    ) -> StoreResult<Option<Certification>>;
    async fn delete_certification(&self, id: Uuid) -> StoreResult<bool>;

    /// Published learnings only.
    async fn list_published_learnings(&self) -> StoreResult<Vec<Learning>>;
    /// Every learning, drafts included.
    async fn list_learnings(&self) -> StoreResult<Vec<Learning>>;
    async fn get_learning(&self, id: Uuid) -> StoreResult<Option<Learning>>;
    async fn create_learning(&self, new: NewLearning) -> StoreResult<Learning>;
    async fn update_learning(
        &self,
        id: Uuid,
        patch: LearningPatch,
    ) -> StoreResult<Option<Learning>>;
    async fn delete_learning(&self, id: Uuid) -> StoreResult<bool>;

    async fn list_messages(&self) -> StoreResult<Vec<ContactMessage>>;
    async fn create_message(&self, new: NewContactMessage) -> StoreResult<ContactMessage>;
    async fn mark_message_read(&self, id: Uuid) -> StoreResult<bool>;
    async fn delete_message(&self, id: Uuid) -> StoreResult<bool>;

    async fn record_page_view(&self, new: NewPageView) -> StoreResult<PageView>;
    async fn analytics(&self) -> StoreResult<Analytics>;

    async fn find_admin(&self, username: &str) -> StoreResult<Option<AdminUser>>;
    async fn create_admin(&self, new: NewAdmin) -> StoreResult<AdminUser>;
}

// ============================================================================
// Ordering shared by the in-memory store (PgStore expresses the same in SQL)
// ============================================================================

pub fn sort_skills(skills: &mut [Skill]) {
    skills.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
}

/// Featured first, then explicit order, then newest first.
pub fn sort_projects(projects: &mut [Project]) {
    projects.sort_by_key(|p| (Reverse(p.featured), p.order, Reverse(p.created_at)));
}

pub fn sort_certifications(certs: &mut [Certification]) {
    certs.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then_with(|| b.issue_date.cmp(&a.issue_date))
    });
}

pub fn sort_learnings(learnings: &mut [Learning]) {
    learnings.sort_by_key(|l| (l.order, Reverse(l.created_at)));
}

pub fn sort_messages(messages: &mut [ContactMessage]) {
    messages.sort_by_key(|m| Reverse(m.created_at));
}

/// Apply the `search` and `tech` query filters to an already ordered list.
pub fn filter_projects(
    projects: Vec<Project>,
    search: Option<&str>,
    tech: Option<&str>,
) -> Vec<Project> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    let tech = tech.map(str::trim).filter(|s| !s.is_empty());
    projects
        .into_iter()
        .filter(|p| search.map_or(true, |q| p.matches_search(q)))
        .filter(|p| tech.map_or(true, |t| p.uses_tech(t)))
        .collect()
}

/// Distinct tech tags across all projects, sorted lexicographically.
pub fn technologies(projects: &[Project]) -> Vec<String> {
    let set: std::collections::BTreeSet<&str> = projects
        .iter()
        .flat_map(|p| p.tech_stack.iter().map(String::as_str))
        .collect();
    set.into_iter().map(str::to_string).collect()
}

/// Summarize page views: totals plus the busiest paths, count desc then path asc.
pub fn summarize_page_views<'a>(paths: impl IntoIterator<Item = &'a str>) -> Analytics {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    let mut total_views = 0;
    for path in paths {
        total_views += 1;
        *counts.entry(path).or_default() += 1;
    }

    let unique_paths = counts.len() as i64;
    let mut top_pages: Vec<PageCount> = counts
        .into_iter()
        .map(|(path, count)| PageCount {
            path: path.to_string(),
            count,
        })
        .collect();
    top_pages.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.path.cmp(&b.path)));
    top_pages.truncate(TOP_PAGES_LIMIT);

    Analytics {
        total_views,
        unique_paths,
        top_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    fn project(title: &str, featured: bool, order: i32, age_mins: i64, tech: &[&str]) -> Project {
        let mut p = Project::from_new(NewProject {
            title: title.to_string(),
            description: format!("{title} description"),
            full_description: None,
            tech_stack: tech.iter().map(|t| t.to_string()).collect(),
            image_url: None,
            live_url: None,
            github_url: None,
            featured,
            order,
        });
        p.created_at = Utc::now() - ChronoDuration::minutes(age_mins);
        p
    }

    #[test]
    fn test_sort_projects_featured_then_order_then_newest() {
        let mut projects = vec![
            project("b", false, 1, 10, &[]),
            project("a", false, 1, 5, &[]),
            project("featured", true, 9, 100, &[]),
            project("first", false, 0, 50, &[]),
        ];
        sort_projects(&mut projects);
        let titles: Vec<&str> = projects.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["featured", "first", "a", "b"]);
    }

    #[test]
    fn test_sort_skills_by_order_then_name() {
        let skill = |name: &str, order| {
            Skill::from_new(NewSkill {
                name: name.to_string(),
                category: "backend".to_string(),
                proficiency: 80,
                order,
            })
        };
        let mut skills = vec![skill("Rust", 1), skill("Go", 1), skill("SQL", 0)];
        sort_skills(&mut skills);
        let names: Vec<&str> = skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["SQL", "Go", "Rust"]);
    }

    #[test]
    fn test_sort_certifications_by_order_then_latest_issue() {
        let cert = |name: &str, issued: &str, order| {
            Certification::from_new(NewCertification {
                name: name.to_string(),
                issuer: "Issuer".to_string(),
                issue_date: issued.to_string(),
                expiry_date: None,
                credential_id: None,
                credential_url: None,
                order,
            })
        };
        let mut certs = vec![
            cert("old", "2021-03-01", 1),
            cert("pinned", "2019-01-01", 0),
            cert("new", "2024-06-15", 1),
        ];
        sort_certifications(&mut certs);
        let names: Vec<&str> = certs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["pinned", "new", "old"]);
    }

    #[test]
    fn test_sort_learnings_same_order_newest_first() {
        let learning = |title: &str, order, age_mins| {
            let mut l = Learning::from_new(NewLearning {
                title: title.to_string(),
                excerpt: "excerpt".to_string(),
                content: None,
                category: "rust".to_string(),
                date: "2024-01-01".to_string(),
                read_time: "5 min".to_string(),
                published: true,
                order,
            });
            l.created_at = Utc::now() - ChronoDuration::minutes(age_mins);
            l
        };
        let mut learnings = vec![
            learning("older", 0, 60),
            learning("later", 1, 0),
            learning("newer", 0, 5),
        ];
        sort_learnings(&mut learnings);
        let titles: Vec<&str> = learnings.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["newer", "older", "later"]);
    }

    #[test]
    fn test_sort_messages_newest_first() {
        let message = |name: &str, age_mins| {
            let mut m = ContactMessage::from_new(NewContactMessage {
                name: name.to_string(),
                email: "a@b.dev".to_string(),
                message: "Hello there, nice site".to_string(),
            });
            m.created_at = Utc::now() - ChronoDuration::minutes(age_mins);
            m
        };
        let mut messages = vec![message("middle", 10), message("oldest", 90), message("latest", 1)];
        sort_messages(&mut messages);
        let names: Vec<&str> = messages.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["latest", "middle", "oldest"]);
    }

    #[test]
    fn test_technologies_sorted_and_deduplicated() {
        let projects = vec![
            project("x", false, 0, 0, &["Kubernetes", "Docker"]),
            project("y", false, 0, 0, &["Docker", "Express"]),
        ];
        assert_eq!(
            technologies(&projects),
            vec!["Docker", "Express", "Kubernetes"]
        );
    }

    #[test]
    fn test_filter_projects_by_search_and_tech() {
        let projects = vec![
            project("Cloud Platform", true, 0, 0, &["Docker", "Kubernetes"]),
            project("Chat", false, 1, 0, &["Redis", "WebSocket"]),
        ];
        let by_search = filter_projects(projects.clone(), Some("redis"), None);
        assert_eq!(by_search.len(), 1);
        assert_eq!(by_search[0].title, "Chat");

        let by_tech = filter_projects(projects.clone(), None, Some("docker"));
        assert_eq!(by_tech.len(), 1);
        assert_eq!(by_tech[0].title, "Cloud Platform");

        let both = filter_projects(projects.clone(), Some("cloud"), Some("redis"));
        assert!(both.is_empty());

        let blank = filter_projects(projects, Some("  "), Some(""));
        assert_eq!(blank.len(), 2);
    }

    #[test]
    fn test_summarize_page_views_counts_and_limits() {
        let mut paths: Vec<String> = (0..12).map(|i| format!("/p{i:02}")).collect();
        paths.extend(["/".to_string(), "/".to_string(), "/p05".to_string()]);
        let analytics = summarize_page_views(paths.iter().map(String::as_str));
        assert_eq!(analytics.total_views, 15);
        assert_eq!(analytics.unique_paths, 13);
        assert_eq!(analytics.top_pages.len(), TOP_PAGES_LIMIT);
        assert_eq!(analytics.top_pages[0], PageCount { path: "/".to_string(), count: 2 });
        assert_eq!(analytics.top_pages[1].path, "/p05");
        assert_eq!(analytics.top_pages[2].path, "/p00");
    }

    #[test]
    fn test_summarize_page_views_empty() {
        let analytics = summarize_page_views(std::iter::empty());
        assert_eq!(analytics.total_views, 0);
        assert_eq!(analytics.unique_paths, 0);
        assert!(analytics.top_pages.is_empty());
    }
}
