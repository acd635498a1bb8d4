// tests/postgres_store_tests.rs
//
// These run against a real database:
//   DATABASE_URL=postgres://... cargo test --test postgres_store_tests -- --ignored

use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use exam_portal::{
    models::{
        question::{CorrectAnswer, Difficulty, Question, QuestionFilter, QuestionKind},
        session::{Answer, ExamConfig, ExamSession},
        template::ExamTemplate,
    },
    store::{
        QuestionStore, SessionStore, StoreError, TemplateStore,
        postgres::{self, PgQuestionStore, PgSessionStore, PgTemplateStore},
    },
};
use sqlx::{PgPool, postgres::PgPoolOptions};

async fn pool() -> PgPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    postgres::migrate(&pool)
        .await
        .expect("Failed to migrate database");
    pool
}

/// Category unique to one test run, so runs do not see each other's rows.
fn unique_category() -> String {
    format!("cat-{}", &uuid::Uuid::new_v4().to_string()[..8])
}

fn question(category: &str, kind: QuestionKind) -> Question {
    let correct_answer = match kind {
        QuestionKind::Single => CorrectAnswer::Single(1),
        QuestionKind::Multiple => CorrectAnswer::Multiple(BTreeSet::from([0, 1])),
    };
    Question {
        id: uuid::Uuid::new_v4().to_string(),
        text: "Which one?".to_string(),
        kind,
        options: vec!["A".to_string(), "B".to_string(), "BLANK".to_string()],
        correct_answer,
        explanation: Some("Because".to_string()),
        category: Some(category.to_string()),
        difficulty: Some(Difficulty::Medium),
        created_at: Some(Utc::now()),
    }
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn questions_round_trip_and_sample() {
    let store = PgQuestionStore::new(pool().await);
    let category = unique_category();

    let mut batch: Vec<Question> = (0..5)
        .map(|_| question(&category, QuestionKind::Single))
        .collect();
    batch.push(question(&category, QuestionKind::Multiple));
    assert_eq!(store.bulk_insert(batch.clone()).await.unwrap(), 6);

    let loaded = store.get_by_id(&batch[5].id).await.unwrap().unwrap();
    assert_eq!(loaded.kind, QuestionKind::Multiple);
    assert_eq!(loaded.correct_answer, batch[5].correct_answer);
    assert_eq!(loaded.options, batch[5].options);

    let filter = QuestionFilter {
        category: Some(category.clone()),
        ..Default::default()
    };
    let sample = store.sample(4, &filter).await.unwrap();
    assert_eq!(sample.len(), 4);
    let ids: BTreeSet<&str> = sample.iter().map(|q| q.id.as_str()).collect();
    assert_eq!(ids.len(), 4);

    // Asking for more than exists returns everything that matches
    let sample = store.sample(50, &filter).await.unwrap();
    assert_eq!(sample.len(), 6);

    let multiples = QuestionFilter {
        category: Some(category.clone()),
        kind: Some(QuestionKind::Multiple),
        ..Default::default()
    };
    assert_eq!(store.list(&multiples).await.unwrap().len(), 1);

    for q in &batch {
        assert!(store.delete(&q.id).await.unwrap());
    }
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn bulk_insert_is_all_or_nothing() {
    let store = PgQuestionStore::new(pool().await);
    let category = unique_category();

    let existing = question(&category, QuestionKind::Single);
    store.bulk_insert(vec![existing.clone()]).await.unwrap();

    let fresh = question(&category, QuestionKind::Single);
    let err = store
        .bulk_insert(vec![fresh.clone(), existing.clone()])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));
    assert!(store.get_by_id(&fresh.id).await.unwrap().is_none());

    store.delete(&existing.id).await.unwrap();
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn sessions_upsert() {
    let pool = pool().await;
    let questions = PgQuestionStore::new(pool.clone());
    let sessions = PgSessionStore::new(pool);
    let category = unique_category();

    let bank = vec![
        question(&category, QuestionKind::Single),
        question(&category, QuestionKind::Multiple),
    ];
    questions.bulk_insert(bank.clone()).await.unwrap();

    let now = Utc::now();
    let config = ExamConfig {
        category: Some(category),
        time_limit_minutes: Some(20),
        ..Default::default()
    };
    let mut session = ExamSession::start("ada".to_string(), &bank, config, now).unwrap();
    sessions.put(&session).await.unwrap();
    assert!(sessions.has_open_session_with(&bank[0].id).await.unwrap());

    session
        .apply_progress(
            vec![Answer::Choice(1), Answer::Choices(vec![0])],
            1,
            now + Duration::minutes(2),
        )
        .unwrap();
    sessions.put(&session).await.unwrap();

    let loaded = sessions.get(&session.id).await.unwrap().unwrap();
    assert_eq!(loaded.answers, session.answers);
    assert_eq!(loaded.question_ids, session.question_ids);
    assert_eq!(loaded.config, session.config);
    assert_eq!(
        loaded.progress.map(|p| p.current_question_index),
        Some(1)
    );

    session
        .complete(&bank, session.answers.clone(), now + Duration::minutes(5))
        .unwrap();
    sessions.put(&session).await.unwrap();

    let loaded = sessions.get(&session.id).await.unwrap().unwrap();
    assert!(loaded.status.is_terminal());
    assert_eq!(loaded.score, Some(50.0));
    assert_eq!(loaded.duration_seconds, Some(300));
    assert!(!sessions.has_open_session_with(&bank[0].id).await.unwrap());

    for q in &bank {
        questions.delete(&q.id).await.unwrap();
    }
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn templates_crud() {
    let store = PgTemplateStore::new(pool().await);

    let mut template = ExamTemplate {
        id: uuid::Uuid::new_v4().to_string(),
        name: "Midterm".to_string(),
        total_questions: 10,
        category: Some(unique_category()),
        difficulty: Some(Difficulty::Hard),
        time_limit_minutes: Some(45),
        created_at: Some(Utc::now()),
    };
    store.put(&template).await.unwrap();

    template.name = "Final".to_string();
    store.put(&template).await.unwrap();

    let loaded = store.get(&template.id).await.unwrap().unwrap();
    assert_eq!(loaded.name, "Final");
    assert_eq!(loaded.total_questions, 10);
    assert_eq!(loaded.difficulty, Some(Difficulty::Hard));

    assert!(store.delete(&template.id).await.unwrap());
    assert!(!store.delete(&template.id).await.unwrap());
}
