// src/exam/bank.rs

use std::{collections::HashMap, sync::Arc};

use rand::{Rng, seq::SliceRandom};

use crate::{
    exam::error::ExamError,
    models::question::{Question, QuestionFilter},
    store::QuestionStore,
};

/// Picks up to `count` items uniformly at random, each at most once.
///
/// The returned order is itself random and becomes the presentation order.
pub fn sample_without_replacement<T, R>(mut pool: Vec<T>, count: usize, rng: &mut R) -> Vec<T>
where
    R: Rng + ?Sized,
{
    pool.shuffle(rng);
    pool.truncate(count);
    pool
}

/// Read-only view over the question store used by the exam core.
#[derive(Clone)]
pub struct QuestionBank {
    store: Arc<dyn QuestionStore>,
}

impl QuestionBank {
    pub fn new(store: Arc<dyn QuestionStore>) -> Self {
        Self { store }
    }

    /// Samples questions for a new exam.
    ///
    /// Asking for more than the pool holds returns the whole pool; an empty
    /// match is `NoMatchingQuestions`.
    pub async fn sample(
        &self,
        count: usize,
        filter: &QuestionFilter,
    ) -> Result<Vec<Question>, ExamError> {
        if count == 0 {
            return Err(ExamError::InvalidInput(
                "question count must be at least 1".to_string(),
            ));
        }

        let questions = self.store.sample(count, filter).await?;
        if questions.is_empty() {
            return Err(ExamError::NoMatchingQuestions);
        }

        Ok(questions)
    }

    /// Loads the questions of a session in session order.
    pub async fn load_ordered(&self, ids: &[String]) -> Result<Vec<Question>, ExamError> {
        let by_id: HashMap<String, Question> = self
            .store
            .get_many(ids)
            .await?
            .into_iter()
            .map(|q| (q.id.clone(), q))
            .collect();

        ids.iter()
            .map(|id| {
                by_id
                    .get(id)
                    .cloned()
                    .ok_or_else(|| ExamError::QuestionMissing(id.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashSet};

    use chrono::Utc;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        models::question::{CorrectAnswer, QuestionKind},
        store::memory::MemoryQuestionStore,
    };

    fn question(id: &str, category: &str) -> Question {
        Question {
            id: id.to_string(),
            text: format!("Question {}", id),
            kind: QuestionKind::Single,
            options: vec!["A".into(), "B".into(), "C".into()],
            correct_answer: CorrectAnswer::Single(0),
            explanation: None,
            category: Some(category.to_string()),
            difficulty: None,
            created_at: Some(Utc::now()),
        }
    }

    async fn bank_with(questions: Vec<Question>) -> QuestionBank {
        let store = MemoryQuestionStore::with_seed(7);
        store.bulk_insert(questions).await.unwrap();
        QuestionBank::new(Arc::new(store))
    }

    #[test]
    fn test_sample_helper_never_repeats() {
        let mut rng = StdRng::seed_from_u64(42);
        for count in 0..=10 {
            let picked = sample_without_replacement((0..10).collect::<Vec<_>>(), count, &mut rng);
            assert_eq!(picked.len(), count);
            let distinct: HashSet<_> = picked.iter().collect();
            assert_eq!(distinct.len(), count);
        }
    }

    #[test]
    fn test_sample_helper_clamps_to_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let picked = sample_without_replacement(vec![1, 2, 3], 10, &mut rng);
        let as_set: BTreeSet<_> = picked.into_iter().collect();
        assert_eq!(as_set, BTreeSet::from([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_sample_by_category() {
        // 5 questions in "X", 3 in "Y".
        let mut pool: Vec<Question> = (0..5).map(|i| question(&format!("x{}", i), "X")).collect();
        pool.extend((0..3).map(|i| question(&format!("y{}", i), "Y")));
        let bank = bank_with(pool).await;

        let filter = QuestionFilter {
            category: Some("X".to_string()),
            ..Default::default()
        };
        let picked = bank.sample(3, &filter).await.unwrap();

        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|q| q.category.as_deref() == Some("X")));
        let ids: HashSet<_> = picked.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_sample_more_than_available_returns_all_matches() {
        let bank = bank_with(vec![question("a", "X"), question("b", "X"), question("c", "Y")]).await;
        let filter = QuestionFilter {
            category: Some("X".to_string()),
            ..Default::default()
        };

        let picked = bank.sample(50, &filter).await.unwrap();
        assert_eq!(picked.len(), 2);
    }

    #[tokio::test]
    async fn test_sample_without_matches_fails() {
        let bank = bank_with(vec![question("a", "X")]).await;
        let filter = QuestionFilter {
            category: Some("Z".to_string()),
            ..Default::default()
        };

        let err = bank.sample(3, &filter).await.unwrap_err();
        assert!(matches!(err, ExamError::NoMatchingQuestions));
    }

    #[tokio::test]
    async fn test_sample_zero_count_is_invalid() {
        let bank = bank_with(vec![question("a", "X")]).await;
        let err = bank.sample(0, &QuestionFilter::default()).await.unwrap_err();
        assert!(matches!(err, ExamError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_load_ordered_keeps_session_order() {
        let bank = bank_with(vec![question("a", "X"), question("b", "X"), question("c", "X")]).await;
        let ids = vec!["c".to_string(), "a".to_string(), "b".to_string()];

        let loaded = bank.load_ordered(&ids).await.unwrap();
        let loaded_ids: Vec<_> = loaded.iter().map(|q| q.id.clone()).collect();
        assert_eq!(loaded_ids, ids);

        let err = bank
            .load_ordered(&["a".to_string(), "gone".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ExamError::QuestionMissing(id) if id == "gone"));
    }
}
