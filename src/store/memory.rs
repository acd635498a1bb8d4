// src/store/memory.rs

use std::{
    collections::HashMap,
    sync::Mutex,
};

use async_trait::async_trait;
use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::RwLock;

use crate::{
    exam::bank::sample_without_replacement,
    models::{
        question::{Question, QuestionFilter},
        session::ExamSession,
        template::ExamTemplate,
    },
    store::{QuestionStore, SessionStore, StoreError, TemplateStore},
};

/// In-process question store.
pub struct MemoryQuestionStore {
    questions: RwLock<HashMap<String, Question>>,
    rng: Mutex<StdRng>,
}

impl Default for MemoryQuestionStore {
    fn default() -> Self {
        Self {
            questions: RwLock::new(HashMap::new()),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

impl MemoryQuestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose sampling is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            questions: RwLock::new(HashMap::new()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

/// Stable listing order: creation time, then id.
fn sort_questions(questions: &mut [Question]) {
    questions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

#[async_trait]
impl QuestionStore for MemoryQuestionStore {
    async fn get_by_id(&self, id: &str) -> Result<Option<Question>, StoreError> {
        Ok(self.questions.read().await.get(id).cloned())
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<Question>, StoreError> {
        let questions = self.questions.read().await;
        Ok(ids.iter().filter_map(|id| questions.get(id).cloned()).collect())
    }

    async fn sample(
        &self,
        count: usize,
        filter: &QuestionFilter,
    ) -> Result<Vec<Question>, StoreError> {
        let mut pool: Vec<Question> = self
            .questions
            .read()
            .await
            .values()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect();
        // HashMap iteration order is not stable; sort so seeded runs repeat.
        sort_questions(&mut pool);

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        Ok(sample_without_replacement(pool, count, &mut *rng))
    }

    async fn list(&self, filter: &QuestionFilter) -> Result<Vec<Question>, StoreError> {
        let mut list: Vec<Question> = self
            .questions
            .read()
            .await
            .values()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect();
        sort_questions(&mut list);
        Ok(list)
    }

    async fn bulk_insert(&self, questions: Vec<Question>) -> Result<usize, StoreError> {
        let mut store = self.questions.write().await;

        let mut seen = std::collections::HashSet::new();
        for q in &questions {
            if store.contains_key(&q.id) || !seen.insert(q.id.as_str()) {
                return Err(StoreError::Duplicate(q.id.clone()));
            }
        }

        let inserted = questions.len();
        for q in questions {
            store.insert(q.id.clone(), q);
        }
        Ok(inserted)
    }

    async fn update(&self, question: Question) -> Result<bool, StoreError> {
        let mut store = self.questions.write().await;
        match store.get_mut(&question.id) {
            Some(existing) => {
                // Creation time belongs to the original record.
                let created_at = existing.created_at;
                *existing = Question {
                    created_at,
                    ..question
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.questions.write().await.remove(id).is_some())
    }
}

/// In-process session store.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, ExamSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &str) -> Result<Option<ExamSession>, StoreError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn put(&self, session: &ExamSession) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ExamSession>, StoreError> {
        let mut list: Vec<ExamSession> = self.sessions.read().await.values().cloned().collect();
        list.sort_by(|a, b| b.start_time.cmp(&a.start_time).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn has_open_session_with(&self, question_id: &str) -> Result<bool, StoreError> {
        Ok(self.sessions.read().await.values().any(|s| {
            !s.status.is_terminal() && s.question_ids.iter().any(|id| id == question_id)
        }))
    }
}

/// In-process template store.
#[derive(Default)]
pub struct MemoryTemplateStore {
    templates: RwLock<HashMap<String, ExamTemplate>>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn get(&self, id: &str) -> Result<Option<ExamTemplate>, StoreError> {
        Ok(self.templates.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<ExamTemplate>, StoreError> {
        let mut list: Vec<ExamTemplate> = self.templates.read().await.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn put(&self, template: &ExamTemplate) -> Result<(), StoreError> {
        self.templates
            .write()
            .await
            .insert(template.id.clone(), template.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.templates.write().await.remove(id).is_some())
    }
}
