//! One-time startup seed for empty content tables.

use super::{ContentStore, StoreError, StoreResult};
use crate::db::models::{NewAdmin, NewCertification, NewLearning, NewProject, NewSkill};

/// Username of the single admin account.
pub const ADMIN_USERNAME: &str = "admin";

const SKILLS: &[(&str, &str, i32, i32)] = &[
    ("TypeScript", "languages", 95, 1),
    ("JavaScript", "languages", 95, 2),
    ("Python", "languages", 85, 3),
    ("Go", "languages", 75, 4),
    ("Java", "languages", 80, 5),
    ("SQL", "languages", 85, 6),
    ("React", "frameworks", 95, 1),
    ("Node.js", "frameworks", 90, 2),
    ("Next.js", "frameworks", 85, 3),
    ("Express", "frameworks", 90, 4),
    ("Django", "frameworks", 75, 5),
    ("FastAPI", "frameworks", 80, 6),
    ("Docker", "tools", 85, 1),
    ("Kubernetes", "tools", 70, 2),
    ("AWS", "tools", 80, 3),
    ("Git", "tools", 95, 4),
    ("PostgreSQL", "tools", 85, 5),
    ("Redis", "tools", 75, 6),
    ("CI/CD", "practices", 85, 1),
    ("TDD", "practices", 80, 2),
    ("Agile", "practices", 90, 3),
    ("System Design", "practices", 85, 4),
];

fn projects() -> Vec<NewProject> {
    let project = |title: &str,
                   description: &str,
                   tech: &[&str],
                   featured: bool,
                   live: bool,
                   github: bool,
                   order: i32| NewProject {
        title: title.to_string(),
        description: description.to_string(),
        full_description: None,
        tech_stack: tech.iter().map(|t| t.to_string()).collect(),
        image_url: None,
        live_url: live.then(|| "https://example.com".to_string()),
        github_url: github.then(|| "https://github.com".to_string()),
        featured,
        order,
    };

    vec![
        project(
            "Cloud Infrastructure Platform",
            "A cloud management platform for provisioning, monitoring and scaling \
             infrastructure across providers, with real-time metrics and automated scaling.",
            &["TypeScript", "React", "Node.js", "PostgreSQL", "Docker", "Kubernetes"],
            true,
            true,
            true,
            1,
        ),
        project(
            "Real-time Collaboration Suite",
            "A collaborative workspace with real-time document editing, video conferencing \
             and project management.",
            &["React", "WebSocket", "Redis", "PostgreSQL", "WebRTC"],
            false,
            true,
            true,
            2,
        ),
        project(
            "ML Pipeline Orchestrator",
            "An end-to-end pipeline tool for training, versioning and deploying ML models.",
            &["Python", "FastAPI", "TensorFlow", "Docker", "Airflow"],
            false,
            false,
            true,
            3,
        ),
        project(
            "Developer Analytics Dashboard",
            "Analytics for engineering teams: productivity, code quality and sprint velocity.",
            &["Next.js", "GraphQL", "PostgreSQL", "Chart.js"],
            false,
            true,
            false,
            4,
        ),
    ]
}

fn certifications() -> Vec<NewCertification> {
    let cert = |name: &str,
                issuer: &str,
                issued: &str,
                expires: Option<&str>,
                credential_id: &str,
                url: &str,
                order: i32| NewCertification {
        name: name.to_string(),
        issuer: issuer.to_string(),
        issue_date: issued.to_string(),
        expiry_date: expires.map(str::to_string),
        credential_id: Some(credential_id.to_string()),
        credential_url: Some(url.to_string()),
        order,
    };

    vec![
        cert(
            "AWS Solutions Architect Professional",
            "Amazon Web Services",
            "2024-01",
            Some("2027-01"),
            "AWS-SAP-2024",
            "https://aws.amazon.com/verification",
            1,
        ),
        cert(
            "Google Cloud Professional Developer",
            "Google Cloud",
            "2023-08",
            Some("2025-08"),
            "GCP-PD-2023",
            "https://cloud.google.com/certification",
            2,
        ),
        cert(
            "Kubernetes Administrator (CKA)",
            "Cloud Native Computing Foundation",
            "2023-05",
            Some("2026-05"),
            "CKA-2023-12345",
            "https://cncf.io/certification",
            3,
        ),
        cert(
            "MongoDB Database Administrator",
            "MongoDB University",
            "2023-03",
            None,
            "MDB-DBA-2023",
            "https://university.mongodb.com",
            4,
        ),
    ]
}

fn learnings() -> Vec<NewLearning> {
    let learning = |title: &str,
                    excerpt: &str,
                    category: &str,
                    date: &str,
                    read_time: &str,
                    order: i32| NewLearning {
        title: title.to_string(),
        excerpt: excerpt.to_string(),
        content: None,
        category: category.to_string(),
        date: date.to_string(),
        read_time: read_time.to_string(),
        published: true,
        order,
    };

    vec![
        learning(
            "Building Scalable Microservices with Event-Driven Architecture",
            "Patterns for loosely coupled microservices using event sourcing and CQRS.",
            "Architecture",
            "2024-10-15",
            "8 min read",
            1,
        ),
        learning(
            "TypeScript 5.0: Advanced Type Patterns",
            "Conditional types, mapped types and template literal types in practice.",
            "TypeScript",
            "2024-09-22",
            "6 min read",
            2,
        ),
        learning(
            "Optimizing React Performance at Scale",
            "Memoization, code splitting and virtualization for large React apps.",
            "React",
            "2024-08-30",
            "10 min read",
            3,
        ),
        learning(
            "Infrastructure as Code with Terraform",
            "Modules, state management and CI/CD integration with Terraform.",
            "DevOps",
            "2024-07-18",
            "12 min read",
            4,
        ),
        learning(
            "Database Sharding Strategies",
            "Horizontal scaling patterns and sharding strategies for high-traffic databases.",
            "Database",
            "2024-06-25",
            "7 min read",
            5,
        ),
        learning(
            "The Art of Code Review",
            "Running code reviews that improve quality, share knowledge and build culture.",
            "Engineering",
            "2024-05-12",
            "5 min read",
            6,
        ),
    ]
}

/// Seed skills, projects, certifications and learnings, each only when its
/// table is empty.
pub async fn seed_content(store: &dyn ContentStore) -> StoreResult<()> {
    tracing::info!(backend = store.backend(), "Starting content seed...");

    if store.list_skills().await?.is_empty() {
        tracing::info!(count = SKILLS.len(), "Seeding skills");
        for &(name, category, proficiency, order) in SKILLS {
            store
                .create_skill(NewSkill {
                    name: name.to_string(),
                    category: category.to_string(),
                    proficiency,
                    order,
                })
                .await?;
        }
    } else {
        tracing::debug!("Skills already exist, skipping");
    }

    if store.list_projects().await?.is_empty() {
        tracing::info!("Seeding projects");
        for project in projects() {
            store.create_project(project).await?;
        }
    } else {
        tracing::debug!("Projects already exist, skipping");
    }

    if store.list_certifications().await?.is_empty() {
        tracing::info!("Seeding certifications");
        for cert in certifications() {
            store.create_certification(cert).await?;
        }
    } else {
        tracing::debug!("Certifications already exist, skipping");
    }

    if store.list_learnings().await?.is_empty() {
        tracing::info!("Seeding learnings");
        for learning in learnings() {
            store.create_learning(learning).await?;
        }
    } else {
        tracing::debug!("Learnings already exist, skipping");
    }

    tracing::info!("Content seed completed");
    Ok(())
}

/// Create the admin account from a pre-computed bcrypt hash unless one exists.
/// Returns whether an account was created.
pub async fn seed_admin(store: &dyn ContentStore, password_hash: &str) -> StoreResult<bool> {
    if store.find_admin(ADMIN_USERNAME).await?.is_some() {
        tracing::debug!("Admin account already exists, skipping bootstrap");
        return Ok(false);
    }

    match store
        .create_admin(NewAdmin {
            username: ADMIN_USERNAME.to_string(),
            password_hash: password_hash.to_string(),
        })
        .await
    {
        Ok(_) => {
            tracing::info!("Admin account bootstrapped from ADMIN_PASSWORD_HASH");
            Ok(true)
        }
        // Another instance won the race.
        Err(StoreError::Conflict(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{technologies, MemoryStore};

    #[tokio::test]
    async fn test_seed_content_fills_empty_tables_once() {
        let store = MemoryStore::new();
        seed_content(&store).await.unwrap();
        seed_content(&store).await.unwrap();

        assert_eq!(store.list_skills().await.unwrap().len(), SKILLS.len());
        assert_eq!(store.list_projects().await.unwrap().len(), 4);
        assert_eq!(store.list_certifications().await.unwrap().len(), 4);
        assert_eq!(store.list_learnings().await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_seeded_projects_rank_featured_first() {
        let store = MemoryStore::new();
        seed_content(&store).await.unwrap();
        let projects = store.list_projects().await.unwrap();
        assert!(projects[0].featured);
        assert_eq!(projects.iter().filter(|p| p.featured).count(), 1);
    }

    #[tokio::test]
    async fn test_seeded_technologies_start_alphabetically() {
        let store = MemoryStore::new();
        seed_content(&store).await.unwrap();
        let tech = technologies(&store.list_projects().await.unwrap());
        let mut sorted = tech.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(tech, sorted);
        assert_eq!(&tech[..3], &["Airflow", "Chart.js", "Docker"]);
    }

    #[tokio::test]
    async fn test_seed_admin_only_once() {
        let store = MemoryStore::new();
        assert!(seed_admin(&store, "$2b$04$hash").await.unwrap());
        assert!(!seed_admin(&store, "$2b$04$other").await.unwrap());
        let admin = store.find_admin(ADMIN_USERNAME).await.unwrap().unwrap();
        assert_eq!(admin.password_hash, "$2b$04$hash");
    }
}
