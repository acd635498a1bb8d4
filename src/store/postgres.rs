// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    models::{
        question::{CorrectAnswer, Question, QuestionFilter},
        session::{Answer, ExamConfig, ExamSession, ProgressSnapshot},
        template::ExamTemplate,
    },
    store::{QuestionStore, SessionStore, StoreError, TemplateStore},
};

/// Applies the bundled migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const QUESTION_COLUMNS: &str = "id, text, type, options, correct_answer, explanation, category, difficulty, created_at";

/// Row shape of the 'questions' table.
#[derive(FromRow)]
struct QuestionRow {
    id: String,
    text: String,
    /// `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    question_type: String,
    options: Json<Vec<String>>,
    correct_answer: Json<CorrectAnswer>,
    explanation: Option<String>,
    category: Option<String>,
    difficulty: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = StoreError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: row.id.clone(),
            reason,
        };

        let kind = row.question_type.parse().map_err(corrupt)?;
        let difficulty = row
            .difficulty
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(corrupt)?;

        Ok(Question {
            id: row.id,
            text: row.text,
            kind,
            options: row.options.0,
            correct_answer: row.correct_answer.0,
            explanation: row.explanation,
            category: row.category,
            difficulty,
            created_at: row.created_at,
        })
    }
}

fn into_questions(rows: Vec<QuestionRow>) -> Result<Vec<Question>, StoreError> {
    rows.into_iter().map(Question::try_from).collect()
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &QuestionFilter) {
    builder.push(" WHERE TRUE");
    if let Some(category) = &filter.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(difficulty) = filter.difficulty {
        builder.push(" AND difficulty = ").push_bind(difficulty.as_str());
    }
    if let Some(kind) = filter.kind {
        builder.push(" AND type = ").push_bind(kind.as_str());
    }
}

fn map_unique_violation(err: sqlx::Error, id: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Duplicate(id.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[derive(Clone)]
pub struct PgQuestionStore {
    pool: PgPool,
}

impl PgQuestionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionStore for PgQuestionStore {
    async fn get_by_id(&self, id: &str) -> Result<Option<Question>, StoreError> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM questions WHERE id = $1",
            QUESTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Question::try_from).transpose()
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<Question>, StoreError> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM questions WHERE id = ANY($1)",
            QUESTION_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        into_questions(rows)
    }

    async fn sample(
        &self,
        count: usize,
        filter: &QuestionFilter,
    ) -> Result<Vec<Question>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM questions",
            QUESTION_COLUMNS
        ));
        push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY RANDOM() LIMIT ")
            .push_bind(i64::try_from(count).unwrap_or(i64::MAX));

        let rows: Vec<QuestionRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        into_questions(rows)
    }

    async fn list(&self, filter: &QuestionFilter) -> Result<Vec<Question>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM questions",
            QUESTION_COLUMNS
        ));
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at, id");

        let rows: Vec<QuestionRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        into_questions(rows)
    }

    async fn bulk_insert(&self, questions: Vec<Question>) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;

        for q in &questions {
            sqlx::query(
                r#"
                INSERT INTO questions
                (id, text, type, options, correct_answer, explanation, category, difficulty, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, NOW()))
                "#,
            )
            .bind(&q.id)
            .bind(&q.text)
            .bind(q.kind.as_str())
            .bind(Json(&q.options))
            .bind(Json(&q.correct_answer))
            .bind(&q.explanation)
            .bind(&q.category)
            .bind(q.difficulty.map(|d| d.as_str()))
            .bind(q.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, &q.id))?;
        }

        tx.commit().await?;
        Ok(questions.len())
    }

    async fn update(&self, question: Question) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE questions SET
                text = $2, type = $3, options = $4, correct_answer = $5,
                explanation = $6, category = $7, difficulty = $8
            WHERE id = $1
            "#,
        )
        .bind(&question.id)
        .bind(&question.text)
        .bind(question.kind.as_str())
        .bind(Json(&question.options))
        .bind(Json(&question.correct_answer))
        .bind(&question.explanation)
        .bind(&question.category)
        .bind(question.difficulty.map(|d| d.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

const SESSION_COLUMNS: &str = "id, user_name, question_ids, answers, status, start_time, end_time, duration_seconds, config, score, progress, auto_submitted";

/// Row shape of the 'exam_sessions' table.
#[derive(FromRow)]
struct SessionRow {
    id: String,
    user_name: String,
    question_ids: Json<Vec<String>>,
    answers: Json<Vec<Answer>>,
    status: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    duration_seconds: Option<i64>,
    config: Json<ExamConfig>,
    score: Option<f64>,
    progress: Option<Json<ProgressSnapshot>>,
    auto_submitted: bool,
}

impl TryFrom<SessionRow> for ExamSession {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|reason| StoreError::Corrupt {
            id: row.id.clone(),
            reason,
        })?;

        Ok(ExamSession {
            id: row.id,
            user_name: row.user_name,
            question_ids: row.question_ids.0,
            answers: row.answers.0,
            status,
            start_time: row.start_time,
            end_time: row.end_time,
            duration_seconds: row.duration_seconds,
            config: row.config.0,
            score: row.score,
            progress: row.progress.map(|p| p.0),
            auto_submitted: row.auto_submitted,
        })
    }
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, id: &str) -> Result<Option<ExamSession>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM exam_sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ExamSession::try_from).transpose()
    }

    async fn put(&self, session: &ExamSession) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO exam_sessions
            (id, user_name, question_ids, answers, status, start_time, end_time,
             duration_seconds, config, score, progress, auto_submitted)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                answers = EXCLUDED.answers,
                status = EXCLUDED.status,
                end_time = EXCLUDED.end_time,
                duration_seconds = EXCLUDED.duration_seconds,
                score = EXCLUDED.score,
                progress = EXCLUDED.progress,
                auto_submitted = EXCLUDED.auto_submitted
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_name)
        .bind(Json(&session.question_ids))
        .bind(Json(&session.answers))
        .bind(session.status.as_str())
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(session.duration_seconds)
        .bind(Json(&session.config))
        .bind(session.score)
        .bind(session.progress.as_ref().map(Json))
        .bind(session.auto_submitted)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ExamSession>, StoreError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM exam_sessions ORDER BY start_time DESC, id",
            SESSION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ExamSession::try_from).collect()
    }

    async fn has_open_session_with(&self, question_id: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM exam_sessions
                WHERE status = 'in_progress' AND question_ids ? $1
            )
            "#,
        )
        .bind(question_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

/// Row shape of the 'exam_templates' table.
#[derive(FromRow)]
struct TemplateRow {
    id: String,
    name: String,
    total_questions: i32,
    category: Option<String>,
    difficulty: Option<String>,
    time_limit_minutes: Option<i32>,
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<TemplateRow> for ExamTemplate {
    type Error = StoreError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: row.id.clone(),
            reason,
        };

        let total_questions = usize::try_from(row.total_questions)
            .map_err(|e| corrupt(e.to_string()))?;
        let time_limit_minutes = row
            .time_limit_minutes
            .map(u32::try_from)
            .transpose()
            .map_err(|e| corrupt(e.to_string()))?;
        let difficulty = row
            .difficulty
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(corrupt)?;

        Ok(ExamTemplate {
            id: row.id,
            name: row.name,
            total_questions,
            category: row.category,
            difficulty,
            time_limit_minutes,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgTemplateStore {
    pool: PgPool,
}

impl PgTemplateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateStore for PgTemplateStore {
    async fn get(&self, id: &str) -> Result<Option<ExamTemplate>, StoreError> {
        let row = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT id, name, total_questions, category, difficulty, time_limit_minutes, created_at
            FROM exam_templates
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ExamTemplate::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<ExamTemplate>, StoreError> {
        let rows = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT id, name, total_questions, category, difficulty, time_limit_minutes, created_at
            FROM exam_templates
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ExamTemplate::try_from).collect()
    }

    async fn put(&self, template: &ExamTemplate) -> Result<(), StoreError> {
        let total_questions = i32::try_from(template.total_questions).map_err(|e| {
            StoreError::Corrupt {
                id: template.id.clone(),
                reason: e.to_string(),
            }
        })?;
        let time_limit_minutes = template
            .time_limit_minutes
            .map(i32::try_from)
            .transpose()
            .map_err(|e| StoreError::Corrupt {
                id: template.id.clone(),
                reason: e.to_string(),
            })?;

        sqlx::query(
            r#"
            INSERT INTO exam_templates
            (id, name, total_questions, category, difficulty, time_limit_minutes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, NOW()))
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                total_questions = EXCLUDED.total_questions,
                category = EXCLUDED.category,
                difficulty = EXCLUDED.difficulty,
                time_limit_minutes = EXCLUDED.time_limit_minutes
            "#,
        )
        .bind(&template.id)
        .bind(&template.name)
        .bind(total_questions)
        .bind(&template.category)
        .bind(template.difficulty.map(|d| d.as_str()))
        .bind(time_limit_minutes)
        .bind(template.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM exam_templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
