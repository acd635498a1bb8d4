// src/exam/session.rs

//! Lifecycle of one exam attempt.
//!
//! `InProgress -> Completed` through submit or lazy time-limit detection.
//! Terminal sessions are never written again.

use chrono::{DateTime, Duration, Utc};

use crate::{
    exam::{
        error::ExamError,
        scoring::{self, ScoreReport},
    },
    models::{
        question::Question,
        session::{Answer, ExamConfig, ExamSession, ProgressSnapshot, SessionStatus},
    },
};

impl ExamSession {
    /// Creates a fresh in-progress session over the sampled questions.
    pub fn start(
        user_name: String,
        questions: &[Question],
        config: ExamConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, ExamError> {
        if questions.is_empty() {
            return Err(ExamError::InvalidInput(
                "an exam needs at least one question".to_string(),
            ));
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_name,
            question_ids: questions.iter().map(|q| q.id.clone()).collect(),
            answers: questions
                .iter()
                .map(|q| Answer::unanswered_for(q.kind))
                .collect(),
            status: SessionStatus::InProgress,
            start_time: now,
            end_time: None,
            duration_seconds: None,
            config,
            score: None,
            progress: None,
            auto_submitted: false,
        })
    }

    /// The instant the time limit runs out, if there is one.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.config
            .time_limit_minutes
            .map(|minutes| self.start_time + Duration::minutes(i64::from(minutes)))
    }

    /// True iff a time limit is set, the session is still open and `now` is past the deadline.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::InProgress
            && self.deadline().is_some_and(|deadline| now > deadline)
    }

    /// Seconds left before the deadline, floored at zero. None without a limit
    /// or once the session is terminal.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.status.is_terminal() {
            return None;
        }
        self.deadline()
            .map(|deadline| (deadline - now).num_seconds().max(0))
    }

    /// Records a client auto-save. The answer vector replaces the stored one wholesale.
    pub fn apply_progress(
        &mut self,
        answers: Vec<Answer>,
        current_index: usize,
        now: DateTime<Utc>,
    ) -> Result<(), ExamError> {
        if self.status.is_terminal() {
            return Err(ExamError::SessionAlreadyTerminal);
        }
        if self.is_expired(now) {
            return Err(ExamError::TimeExpired);
        }
        self.check_answer_count(&answers)?;
        if current_index >= self.question_ids.len() {
            return Err(ExamError::InvalidInput(format!(
                "current index {} is out of range",
                current_index
            )));
        }

        self.answers = answers.clone();
        self.progress = Some(ProgressSnapshot {
            current_question_index: current_index,
            answers,
            last_saved_at: now,
        });
        Ok(())
    }

    /// Finalises the session with the given answers and scores it.
    ///
    /// The end time never runs past the deadline, so the recorded duration is
    /// bounded by the time limit however late the submission arrives.
    pub fn complete(
        &mut self,
        questions: &[Question],
        final_answers: Vec<Answer>,
        now: DateTime<Utc>,
    ) -> Result<ScoreReport, ExamError> {
        if self.status.is_terminal() {
            return Err(ExamError::AlreadyCompleted);
        }
        self.check_answer_count(&final_answers)?;
        self.check_questions(questions)?;

        let report = scoring::score(questions, &final_answers)?;

        let mut end_time = now.max(self.start_time);
        if let Some(deadline) = self.deadline() {
            end_time = end_time.min(deadline);
        }

        self.answers = final_answers;
        self.end_time = Some(end_time);
        self.duration_seconds = Some((end_time - self.start_time).num_seconds());
        self.score = Some(report.percentage);
        self.status = SessionStatus::Completed;
        Ok(report)
    }

    /// Auto-submits an expired session with the answers last persisted.
    ///
    /// Unsaved client edits are lost. The end time is exactly the deadline.
    pub fn complete_expired(
        &mut self,
        questions: &[Question],
        now: DateTime<Utc>,
    ) -> Result<ScoreReport, ExamError> {
        if self.status.is_terminal() {
            return Err(ExamError::AlreadyCompleted);
        }
        let deadline = match self.deadline() {
            Some(deadline) if now > deadline => deadline,
            _ => {
                return Err(ExamError::InvalidInput(
                    "session has not reached its time limit".to_string(),
                ));
            }
        };

        let answers = self.answers.clone();
        let report = self.complete(questions, answers, deadline)?;
        self.auto_submitted = true;
        Ok(report)
    }

    fn check_answer_count(&self, answers: &[Answer]) -> Result<(), ExamError> {
        if answers.len() != self.question_ids.len() {
            return Err(ExamError::InvalidInput(format!(
                "expected {} answers, got {}",
                self.question_ids.len(),
                answers.len()
            )));
        }
        Ok(())
    }

    fn check_questions(&self, questions: &[Question]) -> Result<(), ExamError> {
        let matches = questions.len() == self.question_ids.len()
            && questions
                .iter()
                .zip(&self.question_ids)
                .all(|(q, id)| &q.id == id);
        if !matches {
            return Err(ExamError::InvalidInput(
                "questions do not match the session".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::question::{CorrectAnswer, QuestionKind};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question {
                id: format!("q{}", i),
                text: "Pick".to_string(),
                kind: QuestionKind::Single,
                options: vec!["A".into(), "B".into()],
                correct_answer: CorrectAnswer::Single(0),
                explanation: None,
                category: None,
                difficulty: None,
                created_at: None,
            })
            .collect()
    }

    fn limited(minutes: u32) -> ExamConfig {
        ExamConfig {
            time_limit_minutes: Some(minutes),
            ..Default::default()
        }
    }

    #[test]
    fn test_start_initialises_unanswered_slots() {
        let qs = questions(4);
        let session = ExamSession::start("ann".into(), &qs, ExamConfig::default(), t0()).unwrap();

        assert_eq!(session.status, SessionStatus::InProgress);
        assert_eq!(session.answers.len(), session.question_ids.len());
        assert!(session.answers.iter().all(|a| !a.is_answered()));
        assert_eq!(session.score, None);
        assert_eq!(session.start_time, t0());
    }

    #[test]
    fn test_start_without_questions_fails() {
        assert!(ExamSession::start("ann".into(), &[], ExamConfig::default(), t0()).is_err());
    }

    #[test]
    fn test_expiry_is_strictly_after_deadline() {
        let session = ExamSession::start("ann".into(), &questions(1), limited(30), t0()).unwrap();

        assert!(!session.is_expired(t0() + Duration::minutes(30)));
        assert!(session.is_expired(t0() + Duration::minutes(30) + Duration::seconds(1)));
        assert_eq!(session.remaining_seconds(t0() + Duration::minutes(10)), Some(20 * 60));
        assert_eq!(session.remaining_seconds(t0() + Duration::minutes(40)), Some(0));
    }

    #[test]
    fn test_no_limit_never_expires() {
        let session =
            ExamSession::start("ann".into(), &questions(1), ExamConfig::default(), t0()).unwrap();
        assert!(!session.is_expired(t0() + Duration::days(30)));
        assert_eq!(session.remaining_seconds(t0()), None);
    }

    #[test]
    fn test_progress_overwrites_answers() {
        let mut session = ExamSession::start("ann".into(), &questions(2), limited(30), t0()).unwrap();
        let now = t0() + Duration::minutes(5);

        session
            .apply_progress(vec![Answer::Choice(1), Answer::Choice(0)], 1, now)
            .unwrap();
        session
            .apply_progress(vec![Answer::Choice(0), Answer::UNANSWERED], 0, now)
            .unwrap();

        assert_eq!(session.answers, vec![Answer::Choice(0), Answer::UNANSWERED]);
        let progress = session.progress.as_ref().unwrap();
        assert_eq!(progress.current_question_index, 0);
        assert_eq!(progress.last_saved_at, now);
    }

    #[test]
    fn test_progress_after_deadline_is_not_applied() {
        let mut session = ExamSession::start("ann".into(), &questions(1), limited(30), t0()).unwrap();

        let err = session
            .apply_progress(vec![Answer::Choice(0)], 0, t0() + Duration::minutes(31))
            .unwrap_err();
        assert!(matches!(err, ExamError::TimeExpired));
        assert_eq!(session.answers, vec![Answer::UNANSWERED]);
        assert!(session.progress.is_none());
    }

    #[test]
    fn test_progress_rejects_wrong_length_and_index() {
        let mut session =
            ExamSession::start("ann".into(), &questions(2), ExamConfig::default(), t0()).unwrap();

        assert!(matches!(
            session.apply_progress(vec![Answer::Choice(0)], 0, t0()),
            Err(ExamError::InvalidInput(_))
        ));
        assert!(matches!(
            session.apply_progress(vec![Answer::Choice(0), Answer::Choice(0)], 2, t0()),
            Err(ExamError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_completed_session_is_immutable() {
        let qs = questions(2);
        let mut session = ExamSession::start("ann".into(), &qs, ExamConfig::default(), t0()).unwrap();
        let final_answers = vec![Answer::Choice(0), Answer::Choice(1)];
        session
            .complete(&qs, final_answers.clone(), t0() + Duration::minutes(3))
            .unwrap();

        let err = session
            .apply_progress(vec![Answer::Choice(1), Answer::Choice(1)], 0, t0())
            .unwrap_err();
        assert!(matches!(err, ExamError::SessionAlreadyTerminal));
        assert_eq!(session.answers, final_answers);

        let err = session
            .complete(&qs, vec![Answer::Choice(0), Answer::Choice(0)], t0())
            .unwrap_err();
        assert!(matches!(err, ExamError::AlreadyCompleted));
        assert_eq!(session.score, Some(50.0));
    }

    #[test]
    fn test_complete_records_duration_and_score() {
        let qs = questions(4);
        let mut session = ExamSession::start("ann".into(), &qs, limited(30), t0()).unwrap();
        let report = session
            .complete(
                &qs,
                vec![
                    Answer::Choice(0),
                    Answer::Choice(0),
                    Answer::Choice(0),
                    Answer::Choice(1),
                ],
                t0() + Duration::minutes(12),
            )
            .unwrap();

        assert_eq!(report.percentage, 75.0);
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.end_time, Some(t0() + Duration::minutes(12)));
        assert_eq!(session.duration_seconds, Some(12 * 60));
        assert_eq!(session.score, Some(75.0));
        assert!(!session.auto_submitted);
    }

    #[test]
    fn test_late_submit_is_clamped_to_deadline() {
        let qs = questions(1);
        let mut session = ExamSession::start("ann".into(), &qs, limited(30), t0()).unwrap();
        session
            .complete(&qs, vec![Answer::Choice(0)], t0() + Duration::hours(5))
            .unwrap();

        assert_eq!(session.end_time, Some(t0() + Duration::minutes(30)));
        assert_eq!(session.duration_seconds, Some(30 * 60));
    }

    #[test]
    fn test_expired_completion_is_clock_exact() {
        let qs = questions(2);
        let mut session = ExamSession::start("ann".into(), &qs, limited(30), t0()).unwrap();
        session
            .apply_progress(
                vec![Answer::Choice(0), Answer::UNANSWERED],
                1,
                t0() + Duration::minutes(10),
            )
            .unwrap();

        let report = session
            .complete_expired(&qs, t0() + Duration::minutes(35))
            .unwrap();

        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.end_time, Some(t0() + Duration::minutes(30)));
        assert!(session.duration_seconds.unwrap() <= 30 * 60);
        assert!(session.auto_submitted);
        assert_eq!(report.correct_count, 1);
    }

    #[test]
    fn test_complete_expired_requires_expiry() {
        let qs = questions(1);
        let mut session = ExamSession::start("ann".into(), &qs, limited(30), t0()).unwrap();
        assert!(session
            .complete_expired(&qs, t0() + Duration::minutes(29))
            .is_err());
        assert_eq!(session.status, SessionStatus::InProgress);
    }

    #[test]
    fn test_complete_rejects_foreign_questions() {
        let qs = questions(2);
        let mut session = ExamSession::start("ann".into(), &qs, ExamConfig::default(), t0()).unwrap();
        let mut other = questions(2);
        other.reverse();

        let err = session
            .complete(&other, vec![Answer::Choice(0), Answer::Choice(0)], t0())
            .unwrap_err();
        assert!(matches!(err, ExamError::InvalidInput(_)));
        assert_eq!(session.status, SessionStatus::InProgress);
    }
}
