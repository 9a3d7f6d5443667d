use std::collections::HashMap;
use std::str::FromStr;

use log::error;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::entity::tip::TipLevel;
use crate::error::AppError;

/// Option scores at or below this count as a healthy answer.
const HEALTHY_MAX_SCORE: u8 = 1;

static QUIZ: Lazy<Result<Quiz, String>> = Lazy::new(|| {
    serde_json::from_str::<QuizFile>(include_str!("../assets/quiz-questions.json"))
        .map(|file| file.quiz)
        .map_err(|e| e.to_string())
});

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuizOption {
    pub text: String,
    pub score: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i32,
    pub question: String,
    pub options: Vec<QuizOption>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Quiz {
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Deserialize)]
struct QuizFile {
    quiz: Quiz,
}

pub fn questionnaire() -> Result<&'static Quiz, AppError> {
    QUIZ.as_ref().map_err(|e| {
        error!("quiz questionnaire is unreadable: {}", e);
        AppError::system_exception()
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskTier {
    /// Buckets a healthy-answer count: 7+ low, 4 to 6 medium, below 4 high.
    pub fn from_score(score: u32) -> Self {
        if score >= 7 {
            Self::Low
        } else if score >= 4 {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Medium => "Medium Risk",
            Self::High => "High Risk",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Low => "You're doing great!",
            Self::Medium => "You're on the right track!",
            Self::High => "It's time to take action!",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => {
                "Your score indicates a healthy relationship with social media. You have good \
                 control over your usage and maintain a balanced digital lifestyle. Keep up the \
                 excellent work!"
            }
            Self::Medium => {
                "Your score indicates a moderate relationship with social media. You have some \
                 healthy habits in place, but there's room for improvement. With a few \
                 adjustments, you can achieve better digital balance and reclaim more time for \
                 activities that truly matter to you."
            }
            Self::High => {
                "Your score suggests that social media may be having a significant impact on \
                 your daily life. This is a great opportunity to make positive changes. With the \
                 right strategies and support, you can develop healthier digital habits and \
                 regain control of your time and attention."
            }
        }
    }

    pub fn tip_level(&self) -> TipLevel {
        match self {
            Self::Low => TipLevel::Low,
            Self::Medium => TipLevel::Medium,
            Self::High => TipLevel::High,
        }
    }
}

impl FromStr for RiskTier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low risk" => Ok(Self::Low),
            "medium risk" => Ok(Self::Medium),
            "high risk" => Ok(Self::High),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub score: u32,
    pub category: RiskTier,
    pub message: &'static str,
    pub description: &'static str,
    pub tip_level: &'static str,
}

impl QuizResult {
    pub fn from_score(score: u32) -> Self {
        let category = RiskTier::from_score(score);
        Self {
            score,
            category,
            message: category.message(),
            description: category.description(),
            tip_level: category.tip_level().as_str(),
        }
    }
}

/// `answers` maps a question id to the index of the chosen option.
pub fn all_answered(quiz: &Quiz, answers: &HashMap<i32, usize>) -> bool {
    !quiz.questions.is_empty() && quiz.questions.iter().all(|q| answers.contains_key(&q.id))
}

/// Counts answers whose option score is 0 or 1. Out-of-range picks count as unhealthy.
pub fn healthy_answer_count(quiz: &Quiz, answers: &HashMap<i32, usize>) -> u32 {
    quiz.questions
        .iter()
        .filter_map(|q| answers.get(&q.id).and_then(|idx| q.options.get(*idx)))
        .filter(|option| option.score <= HEALTHY_MAX_SCORE)
        .count() as u32
}

pub fn evaluate(quiz: &Quiz, answers: &HashMap<i32, usize>) -> QuizResult {
    QuizResult::from_score(healthy_answer_count(quiz, answers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers_with_healthy(quiz: &Quiz, healthy: usize) -> HashMap<i32, usize> {
        quiz.questions
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let pick = if i < healthy { 0 } else { q.options.len() - 1 };
                (q.id, pick)
            })
            .collect()
    }

    #[test]
    fn embedded_questionnaire_has_ten_scored_questions() {
        let quiz = questionnaire().unwrap();
        assert_eq!(quiz.questions.len(), 10);
        for q in &quiz.questions {
            assert!(!q.options.is_empty());
            assert!(q.options.iter().all(|o| o.score <= 3));
            assert!(q.options.iter().any(|o| o.score <= HEALTHY_MAX_SCORE));
        }
    }

    #[test]
    fn tiers_follow_fixed_thresholds() {
        assert_eq!(RiskTier::from_score(8), RiskTier::Low);
        assert_eq!(RiskTier::from_score(5), RiskTier::Medium);
        assert_eq!(RiskTier::from_score(2), RiskTier::High);

        assert_eq!(RiskTier::from_score(10), RiskTier::Low);
        assert_eq!(RiskTier::from_score(7), RiskTier::Low);
        assert_eq!(RiskTier::from_score(6), RiskTier::Medium);
        assert_eq!(RiskTier::from_score(4), RiskTier::Medium);
        assert_eq!(RiskTier::from_score(3), RiskTier::High);
        assert_eq!(RiskTier::from_score(0), RiskTier::High);
    }

    #[test]
    fn evaluation_counts_healthy_answers() {
        let quiz = questionnaire().unwrap();

        let result = evaluate(quiz, &answers_with_healthy(quiz, 8));
        assert_eq!(result.score, 8);
        assert_eq!(result.category, RiskTier::Low);
        assert_eq!(result.tip_level, "low");

        let result = evaluate(quiz, &answers_with_healthy(quiz, 5));
        assert_eq!(result.category, RiskTier::Medium);

        let result = evaluate(quiz, &answers_with_healthy(quiz, 2));
        assert_eq!(result.category, RiskTier::High);
        assert_eq!(result.message, "It's time to take action!");
    }

    #[test]
    fn out_of_range_answers_are_not_healthy() {
        let quiz = questionnaire().unwrap();
        let answers: HashMap<i32, usize> = quiz.questions.iter().map(|q| (q.id, 99)).collect();
        assert!(all_answered(quiz, &answers));
        assert_eq!(healthy_answer_count(quiz, &answers), 0);
    }

    #[test]
    fn missing_answers_are_detected() {
        let quiz = questionnaire().unwrap();
        let mut answers = answers_with_healthy(quiz, 10);
        answers.remove(&quiz.questions[3].id);
        assert!(!all_answered(quiz, &answers));
    }

    #[test]
    fn categories_parse_case_insensitively_and_map_to_tip_levels() {
        assert_eq!("low risk".parse::<RiskTier>(), Ok(RiskTier::Low));
        assert_eq!("Medium Risk".parse::<RiskTier>(), Ok(RiskTier::Medium));
        assert_eq!("HIGH RISK".parse::<RiskTier>(), Ok(RiskTier::High));
        assert!("severe".parse::<RiskTier>().is_err());

        assert_eq!(RiskTier::High.tip_level(), TipLevel::High);
        assert_eq!(
            serde_json::to_value(RiskTier::Medium).unwrap(),
            serde_json::json!("Medium Risk")
        );
    }
}
