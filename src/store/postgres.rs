//! PostgreSQL content store (sqlx).

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::{ContentStore, StoreError, StoreResult, TOP_PAGES_LIMIT};
use crate::db::models::{
    AdminUser, Analytics, Certification, CertificationPatch, ContactMessage, Learning,
    LearningPatch, NewAdmin, NewCertification, NewContactMessage, NewLearning, NewPageView,
    NewProject, NewSkill, PageCount, PageView, Project, ProjectPatch, Skill, SkillPatch,
};

const SKILL_COLUMNS: &str = "id, name, category, proficiency, sort_order";
const PROJECT_COLUMNS: &str = "id, title, description, full_description, tech_stack, image_url, \
     live_url, github_url, featured, sort_order, created_at";
const CERTIFICATION_COLUMNS: &str = "id, name, issuer, issue_date, expiry_date, credential_id, \
     credential_url, sort_order";
const LEARNING_COLUMNS: &str = "id, title, excerpt, content, category, date, read_time, \
     published, sort_order, created_at";
const MESSAGE_COLUMNS: &str = "id, name, email, message, read, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        self.pool.as_ref()
    }
}

/// Row read that holds the row lock until the surrounding transaction ends,
/// so concurrent patches to one row apply one after the other.
fn select_for_update(table: &str, columns: &str) -> String {
    format!("SELECT {columns} FROM {table} WHERE id = $1 FOR UPDATE")
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[async_trait]
impl ContentStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> StoreResult<Duration> {
        let start = Instant::now();
        sqlx::query("SELECT 1").fetch_one(self.pool()).await?;
        Ok(start.elapsed())
    }

    // ------------------------------------------------------------------------
    // Skills
    // ------------------------------------------------------------------------

    async fn list_skills(&self) -> StoreResult<Vec<Skill>> {
        let skills = sqlx::query_as::<_, Skill>(&format!(
            "SELECT {SKILL_COLUMNS} FROM skills ORDER BY sort_order ASC, name ASC"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(skills)
    }

    async fn create_skill(&self, new: NewSkill) -> StoreResult<Skill> {
        let skill = sqlx::query_as::<_, Skill>(&format!(
            r#"
            INSERT INTO skills (id, name, category, proficiency, sort_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SKILL_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.category)
        .bind(new.proficiency)
        .bind(new.order)
        .fetch_one(self.pool())
        .await?;
        Ok(skill)
    }

    async fn update_skill(&self, id: Uuid, patch: SkillPatch) -> StoreResult<Option<Skill>> {
        let mut tx = self.pool().begin().await?;
        let existing = sqlx::query_as::<_, Skill>(&select_for_update("skills", SKILL_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(mut skill) = existing else {
            return Ok(None);
        };
        skill.apply(patch);

        let updated = sqlx::query_as::<_, Skill>(&format!(
            r#"
            UPDATE skills
            SET name = $1, category = $2, proficiency = $3, sort_order = $4
            WHERE id = $5
            RETURNING {SKILL_COLUMNS}
            "#
        ))
        .bind(&skill.name)
        .bind(&skill.category)
        .bind(skill.proficiency)
        .bind(skill.order)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_skill(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM skills WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------------

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            ORDER BY featured DESC, sort_order ASC, created_at DESC
            "#
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(projects)
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(project)
    }

    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (id, title, description, full_description, tech_stack,
                                  image_url, live_url, github_url, featured, sort_order, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now())
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.full_description)
        .bind(&new.tech_stack)
        .bind(&new.image_url)
        .bind(&new.live_url)
        .bind(&new.github_url)
        .bind(new.featured)
        .bind(new.order)
        .fetch_one(self.pool())
        .await?;
        Ok(project)
    }

    async fn update_project(
        &self,
        id: Uuid,
        patch: ProjectPatch,
    ) -> StoreResult<Option<Project>> {
        let mut tx = self.pool().begin().await?;
        let existing =
            sqlx::query_as::<_, Project>(&select_for_update("projects", PROJECT_COLUMNS))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(mut project) = existing else {
            return Ok(None);
        };
        project.apply(patch);

        let updated = sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET title = $1, description = $2, full_description = $3, tech_stack = $4,
                image_url = $5, live_url = $6, github_url = $7, featured = $8, sort_order = $9
            WHERE id = $10
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.full_description)
        .bind(&project.tech_stack)
        .bind(&project.image_url)
        .bind(&project.live_url)
        .bind(&project.github_url)
        .bind(project.featured)
        .bind(project.order)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------------
    // Certifications
    // ------------------------------------------------------------------------

    async fn list_certifications(&self) -> StoreResult<Vec<Certification>> {
        let certs = sqlx::query_as::<_, Certification>(&format!(
            "SELECT {CERTIFICATION_COLUMNS} FROM certifications ORDER BY sort_order ASC, issue_date DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(certs)
    }

    async fn create_certification(&self, new: NewCertification) -> StoreResult<Certification> {
        let cert = sqlx::query_as::<_, Certification>(&format!(
            r#"
            INSERT INTO certifications (id, name, issuer, issue_date, expiry_date,
                                        credential_id, credential_url, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CERTIFICATION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.issuer)
        .bind(&new.issue_date)
        .bind(&new.expiry_date)
        .bind(&new.credential_id)
        .bind(&new.credential_url)
        .bind(new.order)
        .fetch_one(self.pool())
        .await?;
        Ok(cert)
    }

    async fn update_certification(
        &self,
        id: Uuid,
        patch: CertificationPatch,
    ) -> StoreResult<Option<Certification>> {
        let mut tx = self.pool().begin().await?;
        let existing = sqlx::query_as::<_, Certification>(&select_for_update(
            "certifications",
            CERTIFICATION_COLUMNS,
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut cert) = existing else {
            return Ok(None);
        };
        cert.apply(patch);

        let updated = sqlx::query_as::<_, Certification>(&format!(
            r#"
            UPDATE certifications
            SET name = $1, issuer = $2, issue_date = $3, expiry_date = $4,
                credential_id = $5, credential_url = $6, sort_order = $7
            WHERE id = $8
            RETURNING {CERTIFICATION_COLUMNS}
            "#
        ))
        .bind(&cert.name)
        .bind(&cert.issuer)
        .bind(&cert.issue_date)
        .bind(&cert.expiry_date)
        .bind(&cert.credential_id)
        .bind(&cert.credential_url)
        .bind(cert.order)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_certification(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM certifications WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------------
    // Learnings
    // ------------------------------------------------------------------------

    async fn list_published_learnings(&self) -> StoreResult<Vec<Learning>> {
        let learnings = sqlx::query_as::<_, Learning>(&format!(
            r#"
            SELECT {LEARNING_COLUMNS}
            FROM learnings
            WHERE published = true
            ORDER BY sort_order ASC, created_at DESC
            "#
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(learnings)
    }

    async fn list_learnings(&self) -> StoreResult<Vec<Learning>> {
        let learnings = sqlx::query_as::<_, Learning>(&format!(
            "SELECT {LEARNING_COLUMNS} FROM learnings ORDER BY sort_order ASC, created_at DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(learnings)
    }

    async fn get_learning(&self, id: Uuid) -> StoreResult<Option<Learning>> {
        let learning = sqlx::query_as::<_, Learning>(&format!(
            "SELECT {LEARNING_COLUMNS} FROM learnings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(learning)
    }

    async fn create_learning(&self, new: NewLearning) -> StoreResult<Learning> {
        let learning = sqlx::query_as::<_, Learning>(&format!(
            r#"
            INSERT INTO learnings (id, title, excerpt, content, category, date, read_time,
                                   published, sort_order, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
            RETURNING {LEARNING_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.excerpt)
        .bind(&new.content)
        .bind(&new.category)
        .bind(&new.date)
        .bind(&new.read_time)
        .bind(new.published)
        .bind(new.order)
        .fetch_one(self.pool())
        .await?;
        Ok(learning)
    }

    async fn update_learning(
        &self,
        id: Uuid,
        patch: LearningPatch,
    ) -> StoreResult<Option<Learning>> {
        let mut tx = self.pool().begin().await?;
        let existing =
            sqlx::query_as::<_, Learning>(&select_for_update("learnings", LEARNING_COLUMNS))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(mut learning) = existing else {
            return Ok(None);
        };
        learning.apply(patch);

        let updated = sqlx::query_as::<_, Learning>(&format!(
            r#"
            UPDATE learnings
            SET title = $1, excerpt = $2, content = $3, category = $4, date = $5,
                read_time = $6, published = $7, sort_order = $8
            WHERE id = $9
            RETURNING {LEARNING_COLUMNS}
            "#
        ))
        .bind(&learning.title)
        .bind(&learning.excerpt)
        .bind(&learning.content)
        .bind(&learning.category)
        .bind(&learning.date)
        .bind(&learning.read_time)
        .bind(learning.published)
        .bind(learning.order)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_learning(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM learnings WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------------
    // Contact messages
    // ------------------------------------------------------------------------

    async fn list_messages(&self) -> StoreResult<Vec<ContactMessage>> {
        let messages = sqlx::query_as::<_, ContactMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM contact_messages ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(messages)
    }

    async fn create_message(&self, new: NewContactMessage) -> StoreResult<ContactMessage> {
        let message = sqlx::query_as::<_, ContactMessage>(&format!(
            r#"
            INSERT INTO contact_messages (id, name, email, message, read, created_at)
            VALUES ($1, $2, $3, $4, false, now())
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.message)
        .fetch_one(self.pool())
        .await?;
        Ok(message)
    }

    async fn mark_message_read(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE contact_messages SET read = true WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_message(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM contact_messages WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------------
    // Page views
    // ------------------------------------------------------------------------

    async fn record_page_view(&self, new: NewPageView) -> StoreResult<PageView> {
        let view = sqlx::query_as::<_, PageView>(
            r#"
            INSERT INTO page_views (id, path, referrer, user_agent, created_at)
            VALUES ($1, $2, $3, $4, now())
            RETURNING id, path, referrer, user_agent, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.path)
        .bind(&new.referrer)
        .bind(&new.user_agent)
        .fetch_one(self.pool())
        .await?;
        Ok(view)
    }

    async fn analytics(&self) -> StoreResult<Analytics> {
        let (total_views, unique_paths): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COUNT(DISTINCT path) FROM page_views")
                .fetch_one(self.pool())
                .await?;

        let top_pages = sqlx::query_as::<_, PageCount>(
            r#"
            SELECT path, COUNT(*) AS count
            FROM page_views
            GROUP BY path
            ORDER BY count DESC, path ASC
            LIMIT $1
            "#,
        )
        .bind(TOP_PAGES_LIMIT as i64)
        .fetch_all(self.pool())
        .await?;

        Ok(Analytics {
            total_views,
            unique_paths,
            top_pages,
        })
    }

    // ------------------------------------------------------------------------
    // Admin users
    // ------------------------------------------------------------------------

    async fn find_admin(&self, username: &str) -> StoreResult<Option<AdminUser>> {
        let admin = sqlx::query_as::<_, AdminUser>(
            "SELECT id, username, password_hash, created_at FROM admin_users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await?;
        Ok(admin)
    }

    async fn create_admin(&self, new: NewAdmin) -> StoreResult<AdminUser> {
        sqlx::query_as::<_, AdminUser>(
            r#"
            INSERT INTO admin_users (id, username, password_hash, created_at)
            VALUES ($1, $2, $3, now())
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.username)
        .bind(&new.password_hash)
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("admin '{}' already exists", new.username))
            } else {
                StoreError::Database(e)
            }
        })
    }
}
