/**
 * Content Routes
 * Public, read-only endpoints for every portfolio section
 */
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::{parse_id, AppState};
use crate::db::models::{CertificationView, Learning, Project, Skill};
use crate::error::{ApiError, ApiResult};
use crate::store::{filter_projects, technologies};

/// Query parameters for GET /api/projects
#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    pub search: Option<String>,
    pub tech: Option<String>,
}

/// GET /api/skills
pub async fn list_skills(State(state): State<AppState>) -> ApiResult<Json<Vec<Skill>>> {
    Ok(Json(state.store.list_skills().await?))
}

/// GET /api/projects?search=&tech=
pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<Json<Vec<Project>>> {
    let projects = state.store.list_projects().await?;
    Ok(Json(filter_projects(
        projects,
        query.search.as_deref(),
        query.tech.as_deref(),
    )))
}

/// GET /api/projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    let id = parse_id(&id, "Project")?;
    state
        .store
        .get_project(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Project"))
}

/// GET /api/certifications
/// Each certification carries `active`, computed at request time.
pub async fn list_certifications(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CertificationView>>> {
    let now = Utc::now();
    let certs = state.store.list_certifications().await?;
    Ok(Json(certs.into_iter().map(|c| c.view_at(now)).collect()))
}

/// GET /api/learnings
pub async fn list_learnings(State(state): State<AppState>) -> ApiResult<Json<Vec<Learning>>> {
    Ok(Json(state.store.list_published_learnings().await?))
}

/// GET /api/learnings/{id}
/// Drafts are hidden from the public API.
pub async fn get_learning(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Learning>> {
    let id = parse_id(&id, "Learning")?;
    state
        .store
        .get_learning(id)
        .await?
        .filter(|l| l.published)
        .map(Json)
        .ok_or(ApiError::NotFound("Learning"))
}

/// GET /api/technologies
pub async fn list_technologies(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let projects = state.store.list_projects().await?;
    Ok(Json(technologies(&projects)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{get, test_state};
    use crate::db::models::{NewCertification, NewLearning, NewProject};
    use crate::store::seed::seed_content;
    use axum::http::StatusCode;

    fn project(title: &str, tech: &[&str], featured: bool, order: i32) -> NewProject {
        NewProject {
            title: title.to_string(),
            description: format!("{title} description"),
            full_description: None,
            tech_stack: tech.iter().map(|t| t.to_string()).collect(),
            image_url: None,
            live_url: None,
            github_url: None,
            featured,
            order,
        }
    }

    fn learning(title: &str, published: bool) -> NewLearning {
        NewLearning {
            title: title.to_string(),
            excerpt: "excerpt".to_string(),
            content: None,
            category: "Rust".to_string(),
            date: "2024-01-01".to_string(),
            read_time: "3 min read".to_string(),
            published,
            order: 0,
        }
    }

    #[tokio::test]
    async fn test_featured_project_listed_first() {
        let state = test_state();
        state
            .store
            .create_project(project("Plain", &["Go"], false, 0))
            .await
            .unwrap();
        state
            .store
            .create_project(project("Star", &["Rust"], true, 9))
            .await
            .unwrap();

        let res = get(&state, "/api/projects").await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body[0]["title"], "Star");
        assert_eq!(res.body[0]["featured"], true);
    }

    #[tokio::test]
    async fn test_project_search_and_tech_filters() {
        let state = test_state();
        for p in [
            project("Compiler", &["Rust", "LLVM"], false, 1),
            project("Dashboard", &["React", "TypeScript"], false, 2),
            project("Scraper", &["Rust"], false, 3),
        ] {
            state.store.create_project(p).await.unwrap();
        }

        let res = get(&state, "/api/projects?tech=rust").await;
        assert_eq!(res.body.as_array().unwrap().len(), 2);

        let res = get(&state, "/api/projects?search=dash").await;
        assert_eq!(res.body.as_array().unwrap().len(), 1);

        let res = get(&state, "/api/projects?search=llvm&tech=Rust").await;
        let titles: Vec<&str> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Compiler"]);
    }

    #[tokio::test]
    async fn test_get_project_by_id_and_unknown() {
        let state = test_state();
        let created = state
            .store
            .create_project(project("Site", &[], false, 0))
            .await
            .unwrap();

        let res = get(&state, &format!("/api/projects/{}", created.id)).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["techStack"], serde_json::json!([]));

        let res = get(&state, &format!("/api/projects/{}", uuid::Uuid::new_v4())).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body["error"], "Project not found");

        let res = get(&state, "/api/projects/not-a-uuid").await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_certifications_carry_active_flag() {
        let state = test_state();
        for (name, expiry) in [("Current", Some("2999-01")), ("Lapsed", Some("2001-01")), ("Forever", None)] {
            state
                .store
                .create_certification(NewCertification {
                    name: name.to_string(),
                    issuer: "Issuer".to_string(),
                    issue_date: "2000-01".to_string(),
                    expiry_date: expiry.map(str::to_string),
                    credential_id: None,
                    credential_url: None,
                    order: 0,
                })
                .await
                .unwrap();
        }

        let res = get(&state, "/api/certifications").await;
        let certs = res.body.as_array().unwrap();
        assert_eq!(certs.len(), 3);
        for cert in certs {
            let expected = cert["name"] != "Lapsed";
            assert_eq!(cert["active"], expected, "{}", cert["name"]);
        }
    }

    #[tokio::test]
    async fn test_learnings_hide_drafts() {
        let state = test_state();
        state
            .store
            .create_learning(learning("Public", true))
            .await
            .unwrap();
        let draft = state
            .store
            .create_learning(learning("Draft", false))
            .await
            .unwrap();

        let res = get(&state, "/api/learnings").await;
        let rows = res.body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows.iter().all(|l| l["published"] == true));

        let res = get(&state, &format!("/api/learnings/{}", draft.id)).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body["error"], "Learning not found");
    }

    #[tokio::test]
    async fn test_technologies_sorted_and_distinct_after_seed() {
        let state = test_state();
        seed_content(state.store.as_ref()).await.unwrap();

        let res = get(&state, "/api/technologies").await;
        let tech: Vec<String> = serde_json::from_value(res.body).unwrap();
        let mut expected = tech.clone();
        expected.sort();
        expected.dedup();
        assert_eq!(tech, expected);
        assert!(tech.contains(&"PostgreSQL".to_string()));
    }

    #[tokio::test]
    async fn test_skills_listing_after_seed() {
        let state = test_state();
        seed_content(state.store.as_ref()).await.unwrap();
        let res = get(&state, "/api/skills").await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(!res.body.as_array().unwrap().is_empty());
    }
}
