/*!
 * Request validation
 * Body schemas for every write route. Each schema collects all violations
 * before failing so clients get the complete list in one response.
 */
use regex::Regex;
use serde::Deserialize;

use crate::db::models::{
    parse_display_date, CertificationPatch, LearningPatch, NewCertification, NewContactMessage,
    NewLearning, NewPageView, NewProject, NewSkill, ProjectPatch, SkillPatch, MAX_PROFICIENCY,
    MIN_PROFICIENCY, SKILL_CATEGORIES,
};
use crate::error::{ApiError, FieldError};

pub const DEFAULT_PROFICIENCY: i64 = 80;
pub const MIN_MESSAGE_CHARS: usize = 10;
pub const MAX_MESSAGE_CHARS: usize = 5000;
pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_PATH_CHARS: usize = 2048;
pub const MIN_ADMIN_PASSWORD_CHARS: usize = 6;

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

fn is_http_url(url: &str) -> bool {
    (url.starts_with("https://") || url.starts_with("http://")) && !url.contains(char::is_whitespace)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Present and not blank; the trimmed value.
    fn required(&mut self, field: &str, value: Option<String>) -> String {
        match non_blank(value) {
            Some(v) => v,
            None => {
                self.fail(field, "Required");
                String::new()
            }
        }
    }

    /// Patch variant of `required`: may be absent, must not be blank.
    fn present(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let value = value?;
        match non_blank(Some(value)) {
            Some(v) => Some(v),
            None => {
                self.fail(field, "Must not be empty");
                None
            }
        }
    }

    fn max_chars(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.fail(field, format!("Must be at most {max} characters"));
        }
    }

    fn url(&mut self, field: &str, value: &str) {
        if !is_http_url(value) {
            self.fail(field, "Must be an http(s) URL");
        }
    }

    fn date(&mut self, field: &str, value: &str) {
        if !value.is_empty() && parse_display_date(value).is_none() {
            self.fail(field, "Must be a date like 2024-01 or 2024-01-31");
        }
    }

    fn category(&mut self, field: &str, value: String) -> String {
        let value = value.to_lowercase();
        if !value.is_empty() && !SKILL_CATEGORIES.contains(&value.as_str()) {
            self.fail(
                field,
                format!("Must be one of: {}", SKILL_CATEGORIES.join(", ")),
            );
        }
        value
    }

    fn tech_stack(&mut self, field: &str, tags: Vec<String>) -> Vec<String> {
        let tags: Vec<String> = tags.into_iter().map(|t| t.trim().to_string()).collect();
        if tags.iter().any(|t| t.is_empty()) {
            self.fail(field, "Technology names must not be empty");
        }
        tags
    }

    /// Nullable optional text for creation: blank means absent.
    fn optional_url(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let value = non_blank(value)?;
        self.url(field, &value);
        Some(value)
    }

    /// Nullable text for patches: absent keeps, blank clears.
    fn nullable(&mut self, value: Option<String>) -> Option<Option<String>> {
        value.map(|v| non_blank(Some(v)))
    }

    fn nullable_url(&mut self, field: &str, value: Option<String>) -> Option<Option<String>> {
        let value = self.nullable(value)?;
        if let Some(url) = &value {
            self.url(field, url);
        }
        Some(value)
    }

    fn finish<T>(self, value: T) -> Result<T, ApiError> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

fn clamp_proficiency(value: i64) -> i32 {
    value.clamp(MIN_PROFICIENCY as i64, MAX_PROFICIENCY as i64) as i32
}

// ============================================================================
// Public writes
// ============================================================================

/// Body of POST /api/contact
#[derive(Debug, Default, Deserialize)]
pub struct ContactInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

impl ContactInput {
    pub fn validate(self) -> Result<NewContactMessage, ApiError> {
        let mut check = Checker::default();

        let name = check.required("name", self.name);
        check.max_chars("name", &name, MAX_NAME_CHARS);

        let email = check.required("email", self.email);
        if !email.is_empty() && !is_valid_email(&email) {
            check.fail("email", "Invalid email address");
        }

        let message = check.required("message", self.message);
        if !message.is_empty() {
            let len = message.chars().count();
            if len < MIN_MESSAGE_CHARS {
                check.fail(
                    "message",
                    format!("Message must be at least {MIN_MESSAGE_CHARS} characters"),
                );
            } else if len > MAX_MESSAGE_CHARS {
                check.fail(
                    "message",
                    format!("Message must be at most {MAX_MESSAGE_CHARS} characters"),
                );
            }
        }

        check.finish(NewContactMessage {
            name,
            email,
            message,
        })
    }
}

/// Body of POST /api/analytics/pageview
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewInput {
    pub path: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

impl PageViewInput {
    /// `fallback_user_agent` is the request's User-Agent header, used when the
    /// body does not carry one.
    pub fn validate(self, fallback_user_agent: Option<String>) -> Result<NewPageView, ApiError> {
        let mut check = Checker::default();
        let path = check.required("path", self.path);
        check.max_chars("path", &path, MAX_PATH_CHARS);

        check.finish(NewPageView {
            path,
            referrer: non_blank(self.referrer),
            user_agent: non_blank(self.user_agent).or_else(|| non_blank(fallback_user_agent)),
        })
    }
}

// ============================================================================
// Admin writes
// ============================================================================

/// Body of POST/PUT /api/admin/skills
#[derive(Debug, Default, Deserialize)]
pub struct SkillInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub proficiency: Option<i64>,
    pub order: Option<i32>,
}

impl SkillInput {
    pub fn validate_new(self) -> Result<NewSkill, ApiError> {
        let mut check = Checker::default();
        let name = check.required("name", self.name);
        let category = check.required("category", self.category);
        let category = check.category("category", category);

        check.finish(NewSkill {
            name,
            category,
            proficiency: clamp_proficiency(self.proficiency.unwrap_or(DEFAULT_PROFICIENCY)),
            order: self.order.unwrap_or(0),
        })
    }

    pub fn validate_patch(self) -> Result<SkillPatch, ApiError> {
        let mut check = Checker::default();
        let name = check.present("name", self.name);
        let category = check
            .present("category", self.category)
            .map(|c| check.category("category", c));

        check.finish(SkillPatch {
            name,
            category,
            proficiency: self.proficiency.map(clamp_proficiency),
            order: self.order,
        })
    }
}

/// Body of POST/PUT /api/admin/projects
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub full_description: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub featured: Option<bool>,
    pub order: Option<i32>,
}

impl ProjectInput {
    pub fn validate_new(self) -> Result<NewProject, ApiError> {
        let mut check = Checker::default();
        let title = check.required("title", self.title);
        let description = check.required("description", self.description);
        let tech_stack = check.tech_stack("techStack", self.tech_stack.unwrap_or_default());
        let live_url = check.optional_url("liveUrl", self.live_url);
        let github_url = check.optional_url("githubUrl", self.github_url);

        check.finish(NewProject {
            title,
            description,
            full_description: non_blank(self.full_description),
            tech_stack,
            image_url: non_blank(self.image_url),
            live_url,
            github_url,
            featured: self.featured.unwrap_or(false),
            order: self.order.unwrap_or(0),
        })
    }

    pub fn validate_patch(self) -> Result<ProjectPatch, ApiError> {
        let mut check = Checker::default();
        let title = check.present("title", self.title);
        let description = check.present("description", self.description);
        let tech_stack = self
            .tech_stack
            .map(|tags| check.tech_stack("techStack", tags));
        let full_description = check.nullable(self.full_description);
        let image_url = check.nullable(self.image_url);
        let live_url = check.nullable_url("liveUrl", self.live_url);
        let github_url = check.nullable_url("githubUrl", self.github_url);

        check.finish(ProjectPatch {
            title,
            description,
            full_description,
            tech_stack,
            image_url,
            live_url,
            github_url,
            featured: self.featured,
            order: self.order,
        })
    }
}

/// Body of POST/PUT /api/admin/certifications
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationInput {
    pub name: Option<String>,
    pub issuer: Option<String>,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
    pub credential_id: Option<String>,
    pub credential_url: Option<String>,
    pub order: Option<i32>,
}

impl CertificationInput {
    pub fn validate_new(self) -> Result<NewCertification, ApiError> {
        let mut check = Checker::default();
        let name = check.required("name", self.name);
        let issuer = check.required("issuer", self.issuer);
        let issue_date = check.required("issueDate", self.issue_date);
        check.date("issueDate", &issue_date);
        let expiry_date = non_blank(self.expiry_date);
        if let Some(expiry) = &expiry_date {
            check.date("expiryDate", expiry);
        }
        let credential_url = check.optional_url("credentialUrl", self.credential_url);

        check.finish(NewCertification {
            name,
            issuer,
            issue_date,
            expiry_date,
            credential_id: non_blank(self.credential_id),
            credential_url,
            order: self.order.unwrap_or(0),
        })
    }

    pub fn validate_patch(self) -> Result<CertificationPatch, ApiError> {
        let mut check = Checker::default();
        let name = check.present("name", self.name);
        let issuer = check.present("issuer", self.issuer);
        let issue_date = check.present("issueDate", self.issue_date);
        if let Some(date) = &issue_date {
            check.date("issueDate", date);
        }
        let expiry_date = check.nullable(self.expiry_date);
        if let Some(Some(date)) = &expiry_date {
            check.date("expiryDate", date);
        }
        let credential_id = check.nullable(self.credential_id);
        let credential_url = check.nullable_url("credentialUrl", self.credential_url);

        check.finish(CertificationPatch {
            name,
            issuer,
            issue_date,
            expiry_date,
            credential_id,
            credential_url,
            order: self.order,
        })
    }
}

/// Body of POST/PUT /api/admin/learnings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningInput {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub read_time: Option<String>,
    pub published: Option<bool>,
    pub order: Option<i32>,
}

impl LearningInput {
    pub fn validate_new(self) -> Result<NewLearning, ApiError> {
        let mut check = Checker::default();
        let title = check.required("title", self.title);
        let excerpt = check.required("excerpt", self.excerpt);
        let category = check.required("category", self.category);
        let date = check.required("date", self.date);
        let read_time = check.required("readTime", self.read_time);

        check.finish(NewLearning {
            title,
            excerpt,
            content: non_blank(self.content),
            category,
            date,
            read_time,
            published: self.published.unwrap_or(true),
            order: self.order.unwrap_or(0),
        })
    }

    pub fn validate_patch(self) -> Result<LearningPatch, ApiError> {
        let mut check = Checker::default();
        let title = check.present("title", self.title);
        let excerpt = check.present("excerpt", self.excerpt);
        let content = check.nullable(self.content);
        let category = check.present("category", self.category);
        let date = check.present("date", self.date);
        let read_time = check.present("readTime", self.read_time);

        check.finish(LearningPatch {
            title,
            excerpt,
            content,
            category,
            date,
            read_time,
            published: self.published,
            order: self.order,
        })
    }
}
