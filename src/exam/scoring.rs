// src/exam/scoring.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    exam::error::ExamError,
    models::{
        question::{CorrectAnswer, Question},
        session::Answer,
    },
};

/// Per-category slice of a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub correct: usize,
    pub total: usize,
    pub percentage: f64,
}

/// Aggregated correctness of one exam attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub total_questions: usize,
    /// 0..=100, one decimal.
    pub percentage: f64,
    /// Keyed by category. Uncategorised questions are left out.
    pub category_breakdown: BTreeMap<String, CategoryScore>,
}

/// Decides whether a submitted answer matches the answer key.
///
/// Single choice compares the index. Multiple choice compares sets, so order
/// and repeats in the submission do not matter.
pub fn is_correct(question: &Question, answer: &Answer) -> bool {
    match (&question.correct_answer, answer) {
        (CorrectAnswer::Single(key), Answer::Choice(index)) => {
            usize::try_from(*index).is_ok_and(|index| index == *key)
        }
        (CorrectAnswer::Single(_), Answer::Choices(_)) => false,
        (CorrectAnswer::Multiple(key), submitted) => submitted.selected() == *key,
    }
}

/// `100 * correct / total`, rounded to one decimal. Zero when `total` is zero.
pub fn percentage(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = correct as f64 * 100.0 / total as f64;
    (raw * 10.0).round() / 10.0
}

/// Scores an answer vector against its questions (matched by position).
pub fn score(questions: &[Question], answers: &[Answer]) -> Result<ScoreReport, ExamError> {
    if questions.is_empty() {
        return Err(ExamError::InvalidInput(
            "cannot score an exam without questions".to_string(),
        ));
    }
    if questions.len() != answers.len() {
        return Err(ExamError::InvalidInput(format!(
            "expected {} answers, got {}",
            questions.len(),
            answers.len()
        )));
    }

    let mut correct_count = 0;
    let mut by_category: BTreeMap<String, (usize, usize)> = BTreeMap::new();

    for (question, answer) in questions.iter().zip(answers) {
        let correct = is_correct(question, answer);
        if correct {
            correct_count += 1;
        }

        if let Some(category) = &question.category {
            let entry = by_category.entry(category.clone()).or_insert((0, 0));
            entry.1 += 1;
            if correct {
                entry.0 += 1;
            }
        }
    }

    let total_questions = questions.len();
    let category_breakdown = by_category
        .into_iter()
        .map(|(category, (correct, total))| {
            (
                category,
                CategoryScore {
                    correct,
                    total,
                    percentage: percentage(correct, total),
                },
            )
        })
        .collect();

    Ok(ScoreReport {
        correct_count,
        incorrect_count: total_questions - correct_count,
        total_questions,
        percentage: percentage(correct_count, total_questions),
        category_breakdown,
    })
}
