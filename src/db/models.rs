//! Database Models - structs representing the content tables (used by sqlx/serde).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Skill categories, in the order the site groups them.
pub const SKILL_CATEGORIES: &[&str] = &["languages", "frameworks", "tools", "practices"];

pub const MIN_PROFICIENCY: i32 = 0;
pub const MAX_PROFICIENCY: i32 = 100;

/// Skill model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub proficiency: i32,
    #[sqlx(rename = "sort_order")]
    pub order: i32,
}

/// New skill for insertion
#[derive(Debug, Clone)]
pub struct NewSkill {
    pub name: String,
    pub category: String,
    pub proficiency: i32,
    pub order: i32,
}

/// Partial skill update
#[derive(Debug, Clone, Default)]
pub struct SkillPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub proficiency: Option<i32>,
    pub order: Option<i32>,
}

impl Skill {
    pub fn from_new(new: NewSkill) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            category: new.category,
            proficiency: new.proficiency,
            order: new.order,
        }
    }

    pub fn apply(&mut self, patch: SkillPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(proficiency) = patch.proficiency {
            self.proficiency = proficiency;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
    }
}

/// Project model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub full_description: Option<String>,
    pub tech_stack: Vec<String>,
    pub image_url: Option<String>,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub featured: bool,
    #[sqlx(rename = "sort_order")]
    pub order: i32,
    pub created_at: DateTime<Utc>,
}

/// New project for insertion
#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub full_description: Option<String>,
    pub tech_stack: Vec<String>,
    pub image_url: Option<String>,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub featured: bool,
    pub order: i32,
}

/// Partial project update.
///
/// Nullable columns use `Option<Option<_>>`: `None` keeps the stored value,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub full_description: Option<Option<String>>,
    pub tech_stack: Option<Vec<String>>,
    pub image_url: Option<Option<String>>,
    pub live_url: Option<Option<String>>,
    pub github_url: Option<Option<String>>,
    pub featured: Option<bool>,
    pub order: Option<i32>,
}

impl Project {
    pub fn from_new(new: NewProject) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            full_description: new.full_description,
            tech_stack: new.tech_stack,
            image_url: new.image_url,
            live_url: new.live_url,
            github_url: new.github_url,
            featured: new.featured,
            order: new.order,
            created_at: Utc::now(),
        }
    }

    pub fn apply(&mut self, patch: ProjectPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(full_description) = patch.full_description {
            self.full_description = full_description;
        }
        if let Some(tech_stack) = patch.tech_stack {
            self.tech_stack = tech_stack;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = image_url;
        }
        if let Some(live_url) = patch.live_url {
            self.live_url = live_url;
        }
        if let Some(github_url) = patch.github_url {
            self.github_url = github_url;
        }
        if let Some(featured) = patch.featured {
            self.featured = featured;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
    }

    /// Case-insensitive match against title, description and tech tags.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self
                .tech_stack
                .iter()
                .any(|t| t.to_lowercase().contains(&query))
    }

    pub fn uses_tech(&self, tech: &str) -> bool {
        let tech = tech.to_lowercase();
        self.tech_stack.iter().any(|t| t.to_lowercase() == tech)
    }
}

/// Certification model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    pub id: Uuid,
    pub name: String,
    pub issuer: String,
    pub issue_date: String,
    pub expiry_date: Option<String>,
    pub credential_id: Option<String>,
    pub credential_url: Option<String>,
    #[sqlx(rename = "sort_order")]
    pub order: i32,
}

/// New certification for insertion
#[derive(Debug, Clone)]
pub struct NewCertification {
    pub name: String,
    pub issuer: String,
    pub issue_date: String,
    pub expiry_date: Option<String>,
    pub credential_id: Option<String>,
    pub credential_url: Option<String>,
    pub order: i32,
}

/// Partial certification update (same nullable convention as [`ProjectPatch`])
#[derive(Debug, Clone, Default)]
pub struct CertificationPatch {
    pub name: Option<String>,
    pub issuer: Option<String>,
    pub issue_date: Option<String>,
    pub expiry_date: Option<Option<String>>,
    pub credential_id: Option<Option<String>>,
    pub credential_url: Option<Option<String>>,
    pub order: Option<i32>,
}

impl Certification {
    pub fn from_new(new: NewCertification) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            issuer: new.issuer,
            issue_date: new.issue_date,
            expiry_date: new.expiry_date,
            credential_id: new.credential_id,
            credential_url: new.credential_url,
            order: new.order,
        }
    }

    pub fn apply(&mut self, patch: CertificationPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(issuer) = patch.issuer {
            self.issuer = issuer;
        }
        if let Some(issue_date) = patch.issue_date {
            self.issue_date = issue_date;
        }
        if let Some(expiry_date) = patch.expiry_date {
            self.expiry_date = expiry_date;
        }
        if let Some(credential_id) = patch.credential_id {
            self.credential_id = credential_id;
        }
        if let Some(credential_url) = patch.credential_url {
            self.credential_url = credential_url;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
    }

    /// A certification is active when it never expires or expires strictly
    /// after `now`. An expiry date that cannot be parsed is treated as expired.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry_date.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(raw) => parse_display_date(raw).is_some_and(|expiry| expiry > now),
        }
    }

    pub fn view_at(self, now: DateTime<Utc>) -> CertificationView {
        let active = self.is_active_at(now);
        CertificationView {
            certification: self,
            active,
        }
    }
}

/// Certification as served to clients, with the derived `active` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificationView {
    #[serde(flatten)]
    pub certification: Certification,
    pub active: bool,
}

/// Parse the loose date strings used on the site: `YYYY`, `YYYY-MM`,
/// `YYYY-MM-DD` or a full RFC 3339 timestamp. Partial dates resolve to the
/// first instant of the period, in UTC.
pub fn parse_display_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{raw}-01-01"), "%Y-%m-%d"))
        .ok()?;
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

/// Learning (blog-like article) model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Learning {
    pub id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub content: Option<String>,
    pub category: String,
    pub date: String,
    pub read_time: String,
    pub published: bool,
    #[sqlx(rename = "sort_order")]
    pub order: i32,
    pub created_at: DateTime<Utc>,
}

/// New learning for insertion
#[derive(Debug, Clone)]
pub struct NewLearning {
    pub title: String,
    pub excerpt: String,
    pub content: Option<String>,
    pub category: String,
    pub date: String,
    pub read_time: String,
    pub published: bool,
    pub order: i32,
}

/// Partial learning update
#[derive(Debug, Clone, Default)]
pub struct LearningPatch {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<Option<String>>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub read_time: Option<String>,
    pub published: Option<bool>,
    pub order: Option<i32>,
}

impl Learning {
    pub fn from_new(new: NewLearning) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: new.title,
            excerpt: new.excerpt,
            content: new.content,
            category: new.category,
            date: new.date,
            read_time: new.read_time,
            published: new.published,
            order: new.order,
            created_at: Utc::now(),
        }
    }

    pub fn apply(&mut self, patch: LearningPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(excerpt) = patch.excerpt {
            self.excerpt = excerpt;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(read_time) = patch.read_time {
            self.read_time = read_time;
        }
        if let Some(published) = patch.published {
            self.published = published;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
    }
}

/// Contact message model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// New contact message from the public form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactMessage {
    pub fn from_new(new: NewContactMessage) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            message: new.message,
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// Page view model (append-only)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub id: Uuid,
    pub path: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPageView {
    pub path: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

impl PageView {
    pub fn from_new(new: NewPageView) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: new.path,
            referrer: new.referrer,
            user_agent: new.user_agent,
            created_at: Utc::now(),
        }
    }
}

/// Visit count for one path
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PageCount {
    pub path: String,
    pub count: i64,
}

/// Aggregate page-view analytics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_views: i64,
    pub unique_paths: i64,
    pub top_pages: Vec<PageCount>,
}

/// Admin user model
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// New admin for insertion; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub username: String,
    pub password_hash: String,
}

impl AdminUser {
    pub fn from_new(new: NewAdmin) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: new.username,
            password_hash: new.password_hash,
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> AdminSummary {
        AdminSummary {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// Admin identity exposed to clients and kept in the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSummary {
    pub id: Uuid,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cert(expiry: Option<&str>) -> Certification {
        Certification::from_new(NewCertification {
            name: "CKA".to_string(),
            issuer: "CNCF".to_string(),
            issue_date: "2023-05".to_string(),
            expiry_date: expiry.map(str::to_string),
            credential_id: None,
            credential_url: None,
            order: 0,
        })
    }

    #[test]
    fn test_parse_display_date_accepts_partial_dates() {
        let month = parse_display_date("2027-01").unwrap();
        assert_eq!(month, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
        let day = parse_display_date("2024-10-15").unwrap();
        assert_eq!(day, Utc.with_ymd_and_hms(2024, 10, 15, 0, 0, 0).unwrap());
        let year = parse_display_date("2030").unwrap();
        assert_eq!(year, Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
        assert!(parse_display_date("2024-10-15T08:00:00Z").is_some());
        assert!(parse_display_date("next year").is_none());
    }

    #[test]
    fn test_certification_active_without_expiry() {
        assert!(cert(None).is_active_at(Utc::now()));
        assert!(cert(Some("")).is_active_at(Utc::now()));
    }

    #[test]
    fn test_certification_active_boundary_is_strict() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        assert!(!cert(Some("2026-05")).is_active_at(now));
        assert!(cert(Some("2026-05-02")).is_active_at(now));
        assert!(!cert(Some("2025-08")).is_active_at(now));
    }

    #[test]
    fn test_certification_unparseable_expiry_is_inactive() {
        assert!(!cert(Some("soon")).is_active_at(Utc::now()));
    }

    #[test]
    fn test_certification_view_serializes_flat() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let json = serde_json::to_value(cert(Some("2027-01")).view_at(now)).unwrap();
        assert_eq!(json["active"], true);
        assert_eq!(json["issueDate"], "2023-05");
        assert_eq!(json["expiryDate"], "2027-01");
    }

    #[test]
    fn test_project_patch_keeps_and_clears_fields() {
        let mut project = Project::from_new(NewProject {
            title: "Site".to_string(),
            description: "Portfolio".to_string(),
            full_description: None,
            tech_stack: vec!["Rust".to_string()],
            image_url: None,
            live_url: Some("https://example.com".to_string()),
            github_url: Some("https://github.com".to_string()),
            featured: false,
            order: 1,
        });
        project.apply(ProjectPatch {
            featured: Some(true),
            live_url: Some(None),
            ..Default::default()
        });
        assert!(project.featured);
        assert_eq!(project.live_url, None);
        assert_eq!(project.github_url.as_deref(), Some("https://github.com"));
        assert_eq!(project.title, "Site");
    }

    #[test]
    fn test_project_search_and_tech_filters() {
        let project = Project::from_new(NewProject {
            title: "ML Pipeline".to_string(),
            description: "Orchestrates training".to_string(),
            full_description: None,
            tech_stack: vec!["Python".to_string(), "FastAPI".to_string()],
            image_url: None,
            live_url: None,
            github_url: None,
            featured: false,
            order: 0,
        });
        assert!(project.matches_search("pipeline"));
        assert!(project.matches_search("fast"));
        assert!(!project.matches_search("kubernetes"));
        assert!(project.uses_tech("python"));
        assert!(!project.uses_tech("py"));
    }

    #[test]
    fn test_admin_password_hash_not_serialized() {
        let admin = AdminUser::from_new(NewAdmin {
            username: "admin".to_string(),
            password_hash: "$2b$04$secret".to_string(),
        });
        let json = serde_json::to_string(&admin).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"username\":\"admin\""));
    }
}
