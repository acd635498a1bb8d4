// src/models/template.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    config::{MAX_QUESTION_COUNT, MAX_TIME_LIMIT_MINUTES},
    models::question::Difficulty,
    utils::html::clean_html,
};

/// A reusable exam definition: how many questions, from where, for how long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamTemplate {
    pub id: String,
    pub name: String,
    pub total_questions: usize,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub time_limit_minutes: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
}

/// DTO for creating or replacing a template.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 100, message = "Template name must be between 1 and 100 chars"))]
    pub name: String,
    pub total_questions: usize,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub time_limit_minutes: Option<u32>,
}

impl CreateTemplateRequest {
    pub fn into_template(
        self,
        id: String,
        created_at: DateTime<Utc>,
    ) -> Result<ExamTemplate, String> {
        if self.total_questions == 0 || self.total_questions > MAX_QUESTION_COUNT {
            return Err(format!(
                "total_questions must be between 1 and {}",
                MAX_QUESTION_COUNT
            ));
        }
        if let Some(limit) = self.time_limit_minutes {
            if limit == 0 || limit > MAX_TIME_LIMIT_MINUTES {
                return Err(format!(
                    "time_limit_minutes must be between 1 and {}",
                    MAX_TIME_LIMIT_MINUTES
                ));
            }
        }

        Ok(ExamTemplate {
            id,
            name: clean_html(self.name.trim()),
            total_questions: self.total_questions,
            category: self
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            difficulty: self.difficulty,
            time_limit_minutes: self.time_limit_minutes,
            created_at: Some(created_at),
        })
    }
}
