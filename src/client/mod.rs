/*!
 * Portfolio client
 * Fetches each public section from a running API and renders it as text.
 * A section is loading, failed or loaded; there are no retries and no cache.
 */
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::db::models::{CertificationView, ContactMessage, Learning, Project, Skill, SKILL_CATEGORIES};
use crate::error::{ErrorResponse, FieldError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL {0:?}")]
    BaseUrl(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("rejected with {} violation(s)", .0.len())]
    Rejected(Vec<FieldError>),
}

/// Observable state of one fetched collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Loading,
    Failed(String),
    Loaded(Vec<T>),
}

impl<T> Section<T> {
    pub fn from_result(result: Result<Vec<T>, ClientError>) -> Self {
        match result {
            Ok(items) => Section::Loaded(items),
            Err(e) => Section::Failed(e.to_string()),
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            Section::Loaded(items) => items,
            _ => &[],
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Section::Loaded(_))
    }
}

#[derive(Debug, Serialize)]
struct ContactBody<'a> {
    name: &'a str,
    email: &'a str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct PageViewBody<'a> {
    path: &'a str,
}

#[derive(Debug, Deserialize)]
struct ContactCreated {
    message: ContactMessage,
}

#[derive(Clone)]
pub struct PortfolioClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PortfolioClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|_| ClientError::BaseUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::BaseUrl(base_url.to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|_| ClientError::BaseUrl(format!("{}{}", self.base_url, path)))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let response = self.http.get(self.url(path)?).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error.unwrap_or_default(),
                Err(_) => String::new(),
            };
            return Err(ClientError::Status { status, message });
        }
        Ok(response.json().await?)
    }

    pub async fn skills(&self) -> Result<Vec<Skill>, ClientError> {
        self.get_json("/api/skills", &[]).await
    }

    pub async fn projects(
        &self,
        search: Option<&str>,
        tech: Option<&str>,
    ) -> Result<Vec<Project>, ClientError> {
        let mut query = Vec::new();
        if let Some(search) = search {
            query.push(("search", search));
        }
        if let Some(tech) = tech {
            query.push(("tech", tech));
        }
        self.get_json("/api/projects", &query).await
    }

    pub async fn certifications(&self) -> Result<Vec<CertificationView>, ClientError> {
        self.get_json("/api/certifications", &[]).await
    }

    pub async fn learnings(&self) -> Result<Vec<Learning>, ClientError> {
        self.get_json("/api/learnings", &[]).await
    }

    pub async fn technologies(&self) -> Result<Vec<String>, ClientError> {
        self.get_json("/api/technologies", &[]).await
    }

    /// Submit the contact form. Validation failures come back as
    /// `ClientError::Rejected` with every violation.
    pub async fn send_contact(
        &self,
        name: &str,
        email: &str,
        message: &str,
    ) -> Result<ContactMessage, ClientError> {
        let response = self
            .http
            .post(self.url("/api/contact")?)
            .json(&ContactBody {
                name,
                email,
                message,
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::CREATED {
            return Ok(response.json::<ContactCreated>().await?.message);
        }

        let body = response.json::<ErrorResponse>().await.ok();
        match body {
            Some(ErrorResponse {
                errors: Some(errors),
                ..
            }) if status == StatusCode::BAD_REQUEST => Err(ClientError::Rejected(errors)),
            Some(body) => Err(ClientError::Status {
                status,
                message: body.error.unwrap_or_default(),
            }),
            None => Err(ClientError::Status {
                status,
                message: String::new(),
            }),
        }
    }

    /// Record a page view without waiting for the result. Failures are only
    /// logged.
    pub fn record_page_view(&self, path: &str) -> JoinHandle<()> {
        let client = self.clone();
        let path = path.to_string();
        tokio::spawn(async move {
            let url = match client.url("/api/analytics/pageview") {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping page view");
                    return;
                }
            };
            let sent = client
                .http
                .post(url)
                .json(&PageViewBody { path: &path })
                .send()
                .await;
            if let Err(e) = sent {
                tracing::debug!(error = %e, path = %path, "Failed to record page view");
            }
        })
    }

    /// Fetch every public section concurrently.
    pub async fn load_portfolio(&self) -> Portfolio {
        let (skills, projects, certifications, learnings) = tokio::join!(
            self.skills(),
            self.projects(None, None),
            self.certifications(),
            self.learnings(),
        );
        Portfolio {
            skills: Section::from_result(skills),
            projects: Section::from_result(projects),
            certifications: Section::from_result(certifications),
            learnings: Section::from_result(learnings),
        }
    }
}

/// Every public section of the site.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub skills: Section<Skill>,
    pub projects: Section<Project>,
    pub certifications: Section<CertificationView>,
    pub learnings: Section<Learning>,
}

impl Default for Portfolio {
    fn default() -> Self {
        Self {
            skills: Section::Loading,
            projects: Section::Loading,
            certifications: Section::Loading,
            learnings: Section::Loading,
        }
    }
}

impl Portfolio {
    pub fn render(&self, now: DateTime<Utc>) -> String {
        [
            render_skills(&self.skills),
            render_projects(&self.projects),
            render_certifications(&self.certifications, now),
            render_learnings(&self.learnings),
        ]
        .join("\n")
    }
}

// ============================================================================
// Renderers
// ============================================================================

fn render_section<T>(title: &str, section: &Section<T>, body: impl Fn(&[T]) -> String) -> String {
    let noun = title.to_lowercase();
    let content = match section {
        Section::Loading => format!("  Loading {noun}...\n"),
        Section::Failed(reason) => {
            tracing::debug!(section = %noun, reason = %reason, "Section failed to load");
            format!("  Could not load {noun}. Please try again later.\n")
        }
        Section::Loaded(items) if items.is_empty() => format!("  No {noun} yet.\n"),
        Section::Loaded(items) => body(items),
    };
    format!("{title}\n{content}")
}

pub fn render_skills(section: &Section<Skill>) -> String {
    render_section("Skills", section, |skills| {
        let mut out = String::new();
        let mut categories: Vec<&str> = SKILL_CATEGORIES.to_vec();
        for skill in skills {
            if !categories.contains(&skill.category.as_str()) {
                categories.push(&skill.category);
            }
        }

        for category in categories {
            let in_group: Vec<&Skill> = skills.iter().filter(|s| s.category == category).collect();
            if in_group.is_empty() {
                continue;
            }
            out.push_str(&format!("  {category}\n"));
            for skill in in_group {
                out.push_str(&format!("    - {} ({}%)\n", skill.name, skill.proficiency));
            }
        }
        out
    })
}

pub fn render_projects(section: &Section<Project>) -> String {
    render_section("Projects", section, |projects| {
        let mut out = String::new();
        for project in projects {
            let badge = if project.featured { " [featured]" } else { "" };
            out.push_str(&format!("  * {}{}\n", project.title, badge));
            out.push_str(&format!("    {}\n", project.description));
            if !project.tech_stack.is_empty() {
                out.push_str(&format!("    Tech: {}\n", project.tech_stack.join(", ")));
            }
            let links: Vec<String> = [("Live", &project.live_url), ("Code", &project.github_url)]
                .into_iter()
                .filter_map(|(label, url)| url.as_ref().map(|u| format!("{label}: {u}")))
                .collect();
            if !links.is_empty() {
                out.push_str(&format!("    {}\n", links.join(" | ")));
            }
        }
        out
    })
}

/// The `Active` label is decided against `now`, not the flag the server sent.
pub fn render_certifications(section: &Section<CertificationView>, now: DateTime<Utc>) -> String {
    render_section("Certifications", section, |certs| {
        let mut out = String::new();
        for view in certs {
            let cert = &view.certification;
            let mut line = format!("  - {}, {} (issued {}", cert.name, cert.issuer, cert.issue_date);
            if let Some(expiry) = &cert.expiry_date {
                line.push_str(&format!(", expires {expiry}"));
            }
            line.push(')');
            if cert.is_active_at(now) {
                line.push_str(" [Active]");
            }
            out.push_str(&line);
            out.push('\n');
        }
        out
    })
}

pub fn render_learnings(section: &Section<Learning>) -> String {
    render_section("Learnings", section, |learnings| {
        let mut out = String::new();
        for learning in learnings {
            out.push_str(&format!(
                "  - {} ({}, {}, {})\n    {}\n",
                learning.title, learning.category, learning.date, learning.read_time, learning.excerpt
            ));
        }
        out
    })
}
