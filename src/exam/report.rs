// src/exam/report.rs

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{question::Difficulty, session::ExamSession};

/// The captured exam parameters sessions are grouped by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GroupKey {
    pub template_id: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    #[serde(flatten)]
    pub key: GroupKey,
    pub attempts: usize,
    pub auto_submitted: usize,
    pub average_percentage: f64,
    pub best_percentage: f64,
    pub worst_percentage: f64,
    pub average_duration_seconds: Option<f64>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Aggregates finished sessions by their captured config. Open sessions are ignored.
pub fn group_sessions(sessions: &[ExamSession]) -> Vec<GroupStats> {
    let mut groups: BTreeMap<GroupKey, Vec<&ExamSession>> = BTreeMap::new();

    for session in sessions {
        if !session.status.is_terminal() || session.score.is_none() {
            continue;
        }
        let key = GroupKey {
            template_id: session.config.template_id.clone(),
            category: session.config.category.clone(),
            difficulty: session.config.difficulty,
        };
        groups.entry(key).or_default().push(session);
    }

    groups
        .into_iter()
        .map(|(key, members)| {
            let scores: Vec<f64> = members.iter().filter_map(|s| s.score).collect();
            let durations: Vec<i64> = members.iter().filter_map(|s| s.duration_seconds).collect();

            let attempts = members.len();
            let average = scores.iter().sum::<f64>() / scores.len() as f64;
            let best = scores.iter().copied().fold(f64::MIN, f64::max);
            let worst = scores.iter().copied().fold(f64::MAX, f64::min);
            let average_duration = if durations.is_empty() {
                None
            } else {
                Some(round1(
                    durations.iter().sum::<i64>() as f64 / durations.len() as f64,
                ))
            };

            GroupStats {
                key,
                attempts,
                auto_submitted: members.iter().filter(|s| s.auto_submitted).count(),
                average_percentage: round1(average),
                best_percentage: best,
                worst_percentage: worst,
                average_duration_seconds: average_duration,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::session::{Answer, ExamConfig, SessionStatus};

    fn finished(category: Option<&str>, score: Option<f64>, status: SessionStatus) -> ExamSession {
        ExamSession {
            id: uuid::Uuid::new_v4().to_string(),
            user_name: "ann".to_string(),
            question_ids: vec!["q".to_string()],
            answers: vec![Answer::UNANSWERED],
            status,
            start_time: Utc::now(),
            end_time: None,
            duration_seconds: Some(600),
            config: ExamConfig {
                category: category.map(str::to_string),
                ..Default::default()
            },
            score,
            progress: None,
            auto_submitted: false,
        }
    }

    #[test]
    fn test_groups_by_config_and_skips_open_sessions() {
        let sessions = vec![
            finished(Some("Roofs"), Some(80.0), SessionStatus::Completed),
            finished(Some("Roofs"), Some(50.0), SessionStatus::Completed),
            finished(None, Some(100.0), SessionStatus::Completed),
            finished(Some("Roofs"), None, SessionStatus::InProgress),
        ];

        let stats = group_sessions(&sessions);
        assert_eq!(stats.len(), 2);

        let roofs = stats
            .iter()
            .find(|s| s.key.category.as_deref() == Some("Roofs"))
            .unwrap();
        assert_eq!(roofs.attempts, 2);
        assert_eq!(roofs.average_percentage, 65.0);
        assert_eq!(roofs.best_percentage, 80.0);
        assert_eq!(roofs.worst_percentage, 50.0);
        assert_eq!(roofs.average_duration_seconds, Some(600.0));
    }

    #[test]
    fn test_empty_input_has_no_groups() {
        assert!(group_sessions(&[]).is_empty());
    }
}
