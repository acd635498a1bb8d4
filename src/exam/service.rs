// src/exam/service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use validator::Validate;

use crate::{
    config::{DEFAULT_QUESTION_COUNT, MAX_QUESTION_COUNT, MAX_TIME_LIMIT_MINUTES},
    exam::{
        bank::QuestionBank,
        error::ExamError,
        locks::SessionLocks,
        report::{GroupStats, group_sessions},
        scoring::{self, ScoreReport},
    },
    models::{
        question::{CorrectAnswer, PublicQuestion, Question, QuestionFilter, QuestionKind},
        session::{Answer, ExamConfig, ExamSession, StartExamRequest},
    },
    store::{QuestionStore, SessionStore, TemplateStore},
};

/// Returned by `start_exam`. Carries no answer keys.
#[derive(Debug, Clone, Serialize)]
pub struct StartedExam {
    pub session_id: String,
    pub questions: Vec<PublicQuestion>,
    pub time_limit_minutes: Option<u32>,
    pub start_time: DateTime<Utc>,
    pub remaining_seconds: Option<i64>,
}

/// Where a session stands when it is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamPhase {
    /// Still open; the client keeps going.
    Running,
    /// The time limit had passed and this read finalised the session.
    AutoSubmitted,
    /// Was already terminal before this read.
    Finished,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamState {
    pub phase: ExamPhase,
    pub session: ExamSession,
    pub questions: Vec<PublicQuestion>,
    pub remaining_seconds: Option<i64>,
    /// Present once the session is terminal.
    pub result: Option<ExamResultSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveOutcome {
    Saved {
        last_saved_at: DateTime<Utc>,
        remaining_seconds: Option<i64>,
    },
    /// The write was dropped because time ran out; the session was finalised instead.
    AutoSubmitted { result: ExamResultSummary },
}

/// Post-submission view of one question.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionReview {
    pub question_id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionKind,
    pub options: Vec<String>,
    pub correct_answer: CorrectAnswer,
    pub submitted: Answer,
    pub is_correct: bool,
    pub explanation: Option<String>,
    pub category: Option<String>,
}

/// What the export and report layer consumes.
#[derive(Debug, Clone, Serialize)]
pub struct ExamResultSummary {
    pub session: ExamSession,
    #[serde(flatten)]
    pub score: ScoreReport,
    pub review: Vec<QuestionReview>,
}

impl ExamResultSummary {
    fn build(session: &ExamSession, questions: &[Question], score: ScoreReport) -> Self {
        let review = questions
            .iter()
            .zip(&session.answers)
            .map(|(q, submitted)| QuestionReview {
                question_id: q.id.clone(),
                text: q.text.clone(),
                question_type: q.kind,
                options: q.options.clone(),
                correct_answer: q.correct_answer.clone(),
                submitted: submitted.clone(),
                is_correct: scoring::is_correct(q, submitted),
                explanation: q.explanation.clone(),
                category: q.category.clone(),
            })
            .collect();

        Self {
            session: session.clone(),
            score,
            review,
        }
    }
}

/// Ties sampling, the session lifecycle and scoring together for the
/// student-facing operations.
pub struct ExamService {
    bank: QuestionBank,
    questions: Arc<dyn QuestionStore>,
    sessions: Arc<dyn SessionStore>,
    templates: Arc<dyn TemplateStore>,
    locks: SessionLocks,
    /// Held shared while an exam is sampled and stored, exclusively while a
    /// question is deleted, so a delete never races a new session.
    catalog: RwLock<()>,
}

impl ExamService {
    pub fn new(
        questions: Arc<dyn QuestionStore>,
        sessions: Arc<dyn SessionStore>,
        templates: Arc<dyn TemplateStore>,
    ) -> Self {
        Self {
            bank: QuestionBank::new(questions.clone()),
            questions,
            sessions,
            templates,
            locks: SessionLocks::new(),
            catalog: RwLock::new(()),
        }
    }

    /// Samples questions and opens a new session.
    pub async fn start_exam(
        &self,
        mut req: StartExamRequest,
        now: DateTime<Utc>,
    ) -> Result<StartedExam, ExamError> {
        // Length limits apply to the trimmed name.
        req.user_name = req.user_name.trim().to_string();
        if let Err(validation_errors) = req.validate() {
            return Err(ExamError::InvalidInput(validation_errors.to_string()));
        }
        let user_name = req.user_name.clone();

        let (count, config) = match req.template_id {
            Some(template_id) => {
                let template = self
                    .templates
                    .get(&template_id)
                    .await?
                    .ok_or_else(|| ExamError::TemplateNotFound(template_id.clone()))?;
                let config = ExamConfig {
                    category: template.category,
                    difficulty: template.difficulty,
                    time_limit_minutes: template.time_limit_minutes,
                    template_id: Some(template.id),
                };
                (template.total_questions, config)
            }
            None => {
                let config = ExamConfig {
                    category: req
                        .category
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty()),
                    difficulty: req.difficulty,
                    time_limit_minutes: req.time_limit_minutes,
                    template_id: None,
                };
                (req.total_questions.unwrap_or(DEFAULT_QUESTION_COUNT), config)
            }
        };

        if count == 0 || count > MAX_QUESTION_COUNT {
            return Err(ExamError::InvalidInput(format!(
                "total_questions must be between 1 and {}",
                MAX_QUESTION_COUNT
            )));
        }
        if let Some(limit) = config.time_limit_minutes {
            if limit == 0 || limit > MAX_TIME_LIMIT_MINUTES {
                return Err(ExamError::InvalidInput(format!(
                    "time_limit_minutes must be between 1 and {}",
                    MAX_TIME_LIMIT_MINUTES
                )));
            }
        }

        let filter = QuestionFilter {
            category: config.category.clone(),
            difficulty: config.difficulty,
            kind: None,
        };
        let _catalog = self.catalog.read().await;
        let questions = self.bank.sample(count, &filter).await.inspect_err(|e| {
            tracing::warn!("Cannot start exam for {}: {}", user_name, e);
        })?;

        let session = ExamSession::start(user_name, &questions, config, now)?;
        self.sessions.put(&session).await?;

        tracing::info!(
            "Exam {} started for {} with {} questions",
            session.id,
            session.user_name,
            questions.len()
        );

        Ok(StartedExam {
            session_id: session.id.clone(),
            questions: questions.iter().map(Question::to_public).collect(),
            time_limit_minutes: session.config.time_limit_minutes,
            start_time: session.start_time,
            remaining_seconds: session.remaining_seconds(now),
        })
    }

    /// Reads a session for resume. An expired open session is finalised here.
    pub async fn get_exam_state(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ExamState, ExamError> {
        let _guard = self.locks.acquire(session_id).await;

        let mut session = self.load_session(session_id).await?;
        let questions = self.bank.load_ordered(&session.question_ids).await?;

        let (phase, result) = if session.is_expired(now) {
            let summary = self.auto_submit(&mut session, &questions, now).await?;
            (ExamPhase::AutoSubmitted, Some(summary))
        } else if session.status.is_terminal() {
            let score = scoring::score(&questions, &session.answers)?;
            (
                ExamPhase::Finished,
                Some(ExamResultSummary::build(&session, &questions, score)),
            )
        } else {
            (ExamPhase::Running, None)
        };

        Ok(ExamState {
            phase,
            remaining_seconds: session.remaining_seconds(now),
            questions: questions.iter().map(Question::to_public).collect(),
            session,
            result,
        })
    }

    /// Stores a client auto-save. Last write wins.
    pub async fn save_progress(
        &self,
        session_id: &str,
        answers: Vec<Answer>,
        current_index: usize,
        now: DateTime<Utc>,
    ) -> Result<SaveOutcome, ExamError> {
        let _guard = self.locks.acquire(session_id).await;

        let mut session = self.load_session(session_id).await?;
        if session.status.is_terminal() {
            tracing::warn!("Rejected progress save for finished exam {}", session_id);
            return Err(ExamError::SessionAlreadyTerminal);
        }

        let questions = self.bank.load_ordered(&session.question_ids).await?;
        if session.is_expired(now) {
            let result = self.auto_submit(&mut session, &questions, now).await?;
            return Ok(SaveOutcome::AutoSubmitted { result });
        }

        check_answers(&questions, &answers)?;
        session.apply_progress(answers, current_index, now)?;
        self.sessions.put(&session).await?;

        tracing::debug!("Progress saved for exam {} at question {}", session_id, current_index);

        Ok(SaveOutcome::Saved {
            last_saved_at: now,
            remaining_seconds: session.remaining_seconds(now),
        })
    }

    /// Finalises a session with the submitted answers.
    pub async fn submit_exam(
        &self,
        session_id: &str,
        answers: Vec<Answer>,
        now: DateTime<Utc>,
    ) -> Result<ExamResultSummary, ExamError> {
        let _guard = self.locks.acquire(session_id).await;

        let mut session = self.load_session(session_id).await?;
        if session.status.is_terminal() {
            tracing::warn!("Rejected re-submission of exam {}", session_id);
            return Err(ExamError::AlreadyCompleted);
        }

        let questions = self.bank.load_ordered(&session.question_ids).await?;
        check_answers(&questions, &answers)?;

        let score = session.complete(&questions, answers, now)?;
        self.sessions.put(&session).await?;

        tracing::info!(
            "Exam {} submitted by {}: {}/{} ({}%)",
            session.id,
            session.user_name,
            score.correct_count,
            score.total_questions,
            score.percentage
        );

        Ok(ExamResultSummary::build(&session, &questions, score))
    }

    /// Rebuilds the result of a finished session against the current question data.
    pub async fn get_exam_result(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ExamResultSummary, ExamError> {
        let state = self.get_exam_state(session_id, now).await?;
        state.result.ok_or(ExamError::StillInProgress)
    }

    /// Removes a question from the bank.
    ///
    /// Refused while an in-progress session still refers to it, since that
    /// session could no longer be scored. Returns false if the id is unknown.
    pub async fn delete_question(&self, question_id: &str) -> Result<bool, ExamError> {
        let _catalog = self.catalog.write().await;

        if self.sessions.has_open_session_with(question_id).await? {
            tracing::warn!("Refused to delete question {} used by an open exam", question_id);
            return Err(ExamError::QuestionInUse(question_id.to_string()));
        }

        Ok(self.questions.delete(question_id).await?)
    }

    pub async fn list_sessions(&self) -> Result<Vec<ExamSession>, ExamError> {
        Ok(self.sessions.list_all().await?)
    }

    pub async fn session_stats(&self) -> Result<Vec<GroupStats>, ExamError> {
        let sessions = self.sessions.list_all().await?;
        Ok(group_sessions(&sessions))
    }

    async fn load_session(&self, session_id: &str) -> Result<ExamSession, ExamError> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or_else(|| ExamError::SessionNotFound(session_id.to_string()))
    }

    async fn auto_submit(
        &self,
        session: &mut ExamSession,
        questions: &[Question],
        now: DateTime<Utc>,
    ) -> Result<ExamResultSummary, ExamError> {
        let score = session.complete_expired(questions, now)?;
        self.sessions.put(session).await?;

        tracing::info!(
            "Exam {} auto-submitted after time limit: {}/{} ({}%)",
            session.id,
            score.correct_count,
            score.total_questions,
            score.percentage
        );

        Ok(ExamResultSummary::build(session, questions, score))
    }
}

/// Rejects answer vectors that do not fit the session's questions.
fn check_answers(questions: &[Question], answers: &[Answer]) -> Result<(), ExamError> {
    if questions.len() != answers.len() {
        return Err(ExamError::InvalidInput(format!(
            "expected {} answers, got {}",
            questions.len(),
            answers.len()
        )));
    }
    for (position, (question, answer)) in questions.iter().zip(answers).enumerate() {
        question
            .check_answer(answer)
            .map_err(|msg| ExamError::InvalidInput(format!("answer {}: {}", position + 1, msg)))?;
    }
    Ok(())
}
