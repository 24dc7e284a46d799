//! In-memory content store, used when no database is configured and in tests.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    sort_certifications, sort_learnings, sort_messages, sort_projects, sort_skills,
    summarize_page_views, ContentStore, StoreError, StoreResult,
};
use crate::db::models::{
    AdminUser, Analytics, Certification, CertificationPatch, ContactMessage, Learning,
    LearningPatch, NewAdmin, NewCertification, NewContactMessage, NewLearning, NewPageView,
    NewProject, NewSkill, PageView, Project, ProjectPatch, Skill, SkillPatch,
};

#[derive(Debug, Default)]
struct Tables {
    skills: Vec<Skill>,
    projects: Vec<Project>,
    certifications: Vec<Certification>,
    learnings: Vec<Learning>,
    messages: Vec<ContactMessage>,
    page_views: Vec<PageView>,
    admins: Vec<AdminUser>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn update_in<T, P>(
    rows: &mut [T],
    id: Uuid,
    id_of: impl Fn(&T) -> Uuid,
    apply: impl FnOnce(&mut T, P),
    patch: P,
) -> Option<T>
where
    T: Clone,
{
    let row = rows.iter_mut().find(|row| id_of(row) == id)?;
    apply(row, patch);
    Some(row.clone())
}

fn remove_from<T>(rows: &mut Vec<T>, id: Uuid, id_of: impl Fn(&T) -> Uuid) -> bool {
    let before = rows.len();
    rows.retain(|row| id_of(row) != id);
    rows.len() != before
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> StoreResult<Duration> {
        let start = Instant::now();
        let _tables = self.tables.read().await;
        Ok(start.elapsed())
    }

    async fn list_skills(&self) -> StoreResult<Vec<Skill>> {
        let mut skills = self.tables.read().await.skills.clone();
        sort_skills(&mut skills);
        Ok(skills)
    }

    async fn create_skill(&self, new: NewSkill) -> StoreResult<Skill> {
        let skill = Skill::from_new(new);
        self.tables.write().await.skills.push(skill.clone());
        Ok(skill)
    }

    async fn update_skill(&self, id: Uuid, patch: SkillPatch) -> StoreResult<Option<Skill>> {
        let mut tables = self.tables.write().await;
        Ok(update_in(&mut tables.skills, id, |s| s.id, Skill::apply, patch))
    }

    async fn delete_skill(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(remove_from(&mut tables.skills, id, |s| s.id))
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let mut projects = self.tables.read().await.projects.clone();
        sort_projects(&mut projects);
        Ok(projects)
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let tables = self.tables.read().await;
        Ok(tables.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        let project = Project::from_new(new);
        self.tables.write().await.projects.push(project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        id: Uuid,
        patch: ProjectPatch,
    ) -> StoreResult<Option<Project>> {
        let mut tables = self.tables.write().await;
        Ok(update_in(&mut tables.projects, id, |p| p.id, Project::apply, patch))
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(remove_from(&mut tables.projects, id, |p| p.id))
    }

    async fn list_certifications(&self) -> StoreResult<Vec<Certification>> {
        let mut certs = self.tables.read().await.certifications.clone();
        sort_certifications(&mut certs);
        Ok(certs)
    }

    async fn create_certification(&self, new: NewCertification) -> StoreResult<Certification> {
        let cert = Certification::from_new(new);
        self.tables.write().await.certifications.push(cert.clone());
        Ok(cert)
    }

    async fn update_certification(
        &self,
        id: Uuid,
        patch: CertificationPatch,
    ) -> StoreResult<Option<Certification>> {
        let mut tables = self.tables.write().await;
        Ok(update_in(
            &mut tables.certifications,
            id,
            |c| c.id,
            Certification::apply,
            patch,
        ))
    }

    async fn delete_certification(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(remove_from(&mut tables.certifications, id, |c| c.id))
    }

    async fn list_published_learnings(&self) -> StoreResult<Vec<Learning>> {
        let mut learnings: Vec<Learning> = self
            .tables
            .read()
            .await
            .learnings
            .iter()
            .filter(|l| l.published)
            .cloned()
            .collect();
        sort_learnings(&mut learnings);
        Ok(learnings)
    }

    async fn list_learnings(&self) -> StoreResult<Vec<Learning>> {
        let mut learnings = self.tables.read().await.learnings.clone();
        sort_learnings(&mut learnings);
        Ok(learnings)
    }

    async fn get_learning(&self, id: Uuid) -> StoreResult<Option<Learning>> {
        let tables = self.tables.read().await;
        Ok(tables.learnings.iter().find(|l| l.id == id).cloned())
    }

    async fn create_learning(&self, new: NewLearning) -> StoreResult<Learning> {
        let learning = Learning::from_new(new);
        self.tables.write().await.learnings.push(learning.clone());
        Ok(learning)
    }

    async fn update_learning(
        &self,
        id: Uuid,
        patch: LearningPatch,
    ) -> StoreResult<Option<Learning>> {
        let mut tables = self.tables.write().await;
        Ok(update_in(&mut tables.learnings, id, |l| l.id, Learning::apply, patch))
    }

    async fn delete_learning(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(remove_from(&mut tables.learnings, id, |l| l.id))
    }

    async fn list_messages(&self) -> StoreResult<Vec<ContactMessage>> {
        let mut messages = self.tables.read().await.messages.clone();
        sort_messages(&mut messages);
        Ok(messages)
    }

    async fn create_message(&self, new: NewContactMessage) -> StoreResult<ContactMessage> {
        let message = ContactMessage::from_new(new);
        self.tables.write().await.messages.push(message.clone());
        Ok(message)
    }

    async fn mark_message_read(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_message(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(remove_from(&mut tables.messages, id, |m| m.id))
    }

    async fn record_page_view(&self, new: NewPageView) -> StoreResult<PageView> {
        let view = PageView::from_new(new);
        self.tables.write().await.page_views.push(view.clone());
        Ok(view)
    }

    async fn analytics(&self) -> StoreResult<Analytics> {
        let tables = self.tables.read().await;
        Ok(summarize_page_views(
            tables.page_views.iter().map(|v| v.path.as_str()),
        ))
    }

    async fn find_admin(&self, username: &str) -> StoreResult<Option<AdminUser>> {
        let tables = self.tables.read().await;
        Ok(tables
            .admins
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn create_admin(&self, new: NewAdmin) -> StoreResult<AdminUser> {
        let mut tables = self.tables.write().await;
        if tables.admins.iter().any(|a| a.username == new.username) {
            return Err(StoreError::Conflict(format!(
                "admin '{}' already exists",
                new.username
            )));
        }
        let admin = AdminUser::from_new(new);
        tables.admins.push(admin.clone());
        Ok(admin)
    }
}
