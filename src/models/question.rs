// src/models/question.rs

use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    config::{BLANK_OPTION, MAX_OPTIONS, MIN_OPTIONS},
    models::session::Answer,
    utils::html::clean_html,
};

/// Question type: single choice or multiple choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Single,
    Multiple,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Single => "single",
            QuestionKind::Multiple => "multiple",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(QuestionKind::Single),
            "multiple" => Ok(QuestionKind::Multiple),
            other => Err(format!("unknown question type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// The answer key of a question.
///
/// On the wire a single-choice key is a bare index and a multiple-choice key
/// is an array of indices. Multiple keys are kept sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Single(usize),
    Multiple(BTreeSet<usize>),
}

impl CorrectAnswer {
    pub fn kind(&self) -> QuestionKind {
        match self {
            CorrectAnswer::Single(_) => QuestionKind::Single,
            CorrectAnswer::Multiple(_) => QuestionKind::Multiple,
        }
    }

    pub fn indices(&self) -> BTreeSet<usize> {
        match self {
            CorrectAnswer::Single(index) => BTreeSet::from([*index]),
            CorrectAnswer::Multiple(set) => set.clone(),
        }
    }
}

/// A question record as held by the question store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,

    /// The prompt shown to the student.
    pub text: String,

    #[serde(rename = "type")]
    pub kind: QuestionKind,

    /// Option texts in display order. Empty or "BLANK" entries are hidden
    /// from students but keep their index slot.
    pub options: Vec<String>,

    pub correct_answer: CorrectAnswer,

    /// Shown only after the exam has been submitted.
    pub explanation: Option<String>,

    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,

    pub created_at: Option<DateTime<Utc>>,
}

impl Question {
    /// Whether an option slot holds something a student can pick.
    pub fn is_presentable_option(text: &str) -> bool {
        let text = text.trim();
        !text.is_empty() && text != BLANK_OPTION
    }

    /// Checks the structural invariants of a question record.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.options.len() < MIN_OPTIONS || self.options.len() > MAX_OPTIONS {
            return Err(format!(
                "question must have between {} and {} options, got {}",
                MIN_OPTIONS,
                MAX_OPTIONS,
                self.options.len()
            ));
        }

        if self.correct_answer.kind() != self.kind {
            return Err(format!(
                "answer key shape does not match question type '{}'",
                self.kind
            ));
        }

        let indices = self.correct_answer.indices();
        if indices.is_empty() {
            return Err("answer key must name at least one option".to_string());
        }

        for index in indices {
            match self.options.get(index) {
                None => {
                    return Err(format!("answer index {} is out of range", index));
                }
                Some(text) if !Self::is_presentable_option(text) => {
                    return Err(format!("answer index {} points at a blank option", index));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Checks that a submitted answer has the right shape for this question
    /// and only references existing option slots.
    pub fn check_answer(&self, answer: &Answer) -> Result<(), String> {
        match (self.kind, answer) {
            (QuestionKind::Single, Answer::Choice(index)) => {
                if *index < -1 {
                    return Err(format!("invalid option index {}", index));
                }
                if *index >= 0 && !self.is_selectable(*index as usize) {
                    return Err(format!("option index {} is out of range", index));
                }
                Ok(())
            }
            (QuestionKind::Multiple, Answer::Choices(indices)) => {
                for index in indices {
                    if *index < 0 || !self.is_selectable(*index as usize) {
                        return Err(format!("option index {} is out of range", index));
                    }
                }
                Ok(())
            }
            (QuestionKind::Single, Answer::Choices(_)) => {
                Err("single-choice questions take a single index".to_string())
            }
            (QuestionKind::Multiple, Answer::Choice(-1)) => Ok(()),
            (QuestionKind::Multiple, Answer::Choice(_)) => {
                Err("multiple-choice questions take an array of indices".to_string())
            }
        }
    }

    fn is_selectable(&self, index: usize) -> bool {
        self.options
            .get(index)
            .is_some_and(|text| Self::is_presentable_option(text))
    }

    /// Strips the answer key and explanation for delivery to a student.
    pub fn to_public(&self) -> PublicQuestion {
        PublicQuestion {
            id: self.id.clone(),
            question_type: self.kind,
            text: self.text.clone(),
            options: self
                .options
                .iter()
                .enumerate()
                .filter(|(_, text)| Self::is_presentable_option(text))
                .map(|(index, text)| PublicOption {
                    index,
                    text: text.clone(),
                })
                .collect(),
            category: self.category.clone(),
            difficulty: self.difficulty,
        }
    }
}

/// DTO for sending a question to a student (excludes answer and explanation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionKind,
    pub text: String,
    pub options: Vec<PublicOption>,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
}

/// A presentable option together with the index answers refer to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicOption {
    pub index: usize,
    pub text: String,
}

/// Filters for sampling and admin listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuestionFilter {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    #[serde(rename = "type")]
    pub kind: Option<QuestionKind>,
}

impl QuestionFilter {
    pub fn matches(&self, question: &Question) -> bool {
        if let Some(category) = &self.category {
            if question.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(difficulty) = self.difficulty {
            if question.difficulty != Some(difficulty) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if question.kind != kind {
                return false;
            }
        }
        true
    }
}

/// DTO for creating or replacing a question.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 64))]
    pub id: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    pub correct_answer: CorrectAnswer,
    #[validate(length(max = 4000))]
    pub explanation: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
        return Err(validator::ValidationError::new("options_count_out_of_range"));
    }
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

impl CreateQuestionRequest {
    /// Builds a sanitised question record, generating an id when none was given.
    pub fn into_question(self, created_at: DateTime<Utc>) -> Result<Question, String> {
        let question = Question {
            id: self
                .id
                .map(|id| id.trim().to_string())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            text: clean_html(self.text.trim()),
            kind: self.kind,
            options: self
                .options
                .iter()
                .map(|opt| clean_html(opt.trim()))
                .collect(),
            correct_answer: self.correct_answer,
            explanation: self
                .explanation
                .map(|e| clean_html(e.trim()))
                .filter(|e| !e.is_empty()),
            category: self
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            difficulty: self.difficulty,
            created_at: Some(created_at),
        };

        if question.id.is_empty() {
            return Err("question id must not be blank".to_string());
        }
        if question.text.is_empty() {
            return Err("question text must not be blank".to_string());
        }
        question.check_invariants()?;
        Ok(question)
    }
}
