//! Lifestyle survey data model — questions, raw answers, typed answers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SurveyError;

/// Answer keys of the lifestyle survey, matching the backend field names.
pub mod keys {
    pub const EXERCISE_FREQ: &str = "exerciseFreq";
    pub const MEALS_PER_DAY: &str = "mealsPerDay";
    pub const NIGHT_SNACK_FREQ: &str = "nightSnackFreq";
    pub const EATING_OUT_FREQ: &str = "eatingOutFreq";
    pub const HEALTH_NOTES: &str = "healthNotes";
}

/// A survey question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Question {
    /// Pick one of a fixed, ordered option list.
    Choice {
        key: String,
        prompt: String,
        options: Vec<String>,
    },
    /// Free-text answer.
    Text { key: String, prompt: String },
}

impl Question {
    pub fn choice(key: &str, prompt: &str, options: &[&str]) -> Self {
        Self::Choice {
            key: key.to_string(),
            prompt: prompt.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    pub fn text(key: &str, prompt: &str) -> Self {
        Self::Text {
            key: key.to_string(),
            prompt: prompt.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Choice { key, .. } | Self::Text { key, .. } => key,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Self::Choice { prompt, .. } | Self::Text { prompt, .. } => prompt,
        }
    }

    /// Map raw user input to an answer value.
    ///
    /// For choice questions a 1-based option number selects that option;
    /// anything else is passed through trimmed.
    pub fn resolve_input(&self, raw: &str) -> String {
        let raw = raw.trim();
        if let Self::Choice { options, .. } = self {
            if let Ok(n) = raw.parse::<usize>() {
                if let Some(option) = n.checked_sub(1).and_then(|i| options.get(i)) {
                    return option.clone();
                }
            }
        }
        raw.to_string()
    }
}

/// The lifestyle survey asked after basic info.
pub fn lifestyle_questions() -> Vec<Question> {
    vec![
        Question::choice(
            keys::EXERCISE_FREQ,
            "현재 생활패턴에 대해 질문해볼게요!\n사용자님은 주당 운동 횟수가 어떻게 되나요?",
            &["없음", "1~2회", "3~5회", "매일"],
        ),
        Question::choice(
            keys::MEALS_PER_DAY,
            "좋아요! 😊\n보통 하루에 몇 끼 드시나요?",
            &["1일 1식", "1일 2식", "1일 3식"],
        ),
        Question::choice(
            keys::NIGHT_SNACK_FREQ,
            "야식은 얼마나 드시나요?",
            &["거의 안 먹음", "가끔 먹음", "자주 먹음"],
        ),
        Question::choice(
            keys::EATING_OUT_FREQ,
            "외식이나 배달 음식은 얼마나 자주 드시나요?",
            &["거의 없음", "주 1~2회", "주 3~5회", "거의 매일"],
        ),
        Question::text(
            keys::HEALTH_NOTES,
            "마지막으로 건강 관련해서 참고해야 할 사항이 있나요?\n(위장장애, 알레르기, 수면장애, 의사가 권장한 음식/운동 등)",
        ),
    ]
}

/// Raw answers keyed by question key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SurveyAnswers(BTreeMap<String, String>);

impl SurveyAnswers {
    pub(crate) fn insert(&mut self, key: &str, value: String) {
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Typed lifestyle survey result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifestyleAnswers {
    pub exercise_freq: String,
    pub meals_per_day: String,
    pub night_snack_freq: String,
    pub eating_out_freq: String,
    #[serde(default)]
    pub health_notes: String,
}

impl LifestyleAnswers {
    /// Keys a survey must ask for its answers to type as `LifestyleAnswers`.
    pub const REQUIRED_KEYS: [&'static str; 4] = [
        keys::EXERCISE_FREQ,
        keys::MEALS_PER_DAY,
        keys::NIGHT_SNACK_FREQ,
        keys::EATING_OUT_FREQ,
    ];

    /// Check that `questions` asks every required key.
    pub fn check_questions(questions: &[Question]) -> Result<(), SurveyError> {
        match Self::REQUIRED_KEYS
            .into_iter()
            .find(|key| !questions.iter().any(|q| q.key() == *key))
        {
            Some(missing) => Err(SurveyError::MissingAnswer(missing.to_string())),
            None => Ok(()),
        }
    }
}

impl TryFrom<SurveyAnswers> for LifestyleAnswers {
    type Error = SurveyError;

    fn try_from(answers: SurveyAnswers) -> Result<Self, Self::Error> {
        let take = |key: &str| {
            answers
                .get(key)
                .map(str::to_string)
                .ok_or_else(|| SurveyError::MissingAnswer(key.to_string()))
        };
        Ok(Self {
            exercise_freq: take(keys::EXERCISE_FREQ)?,
            meals_per_day: take(keys::MEALS_PER_DAY)?,
            night_snack_freq: take(keys::NIGHT_SNACK_FREQ)?,
            eating_out_freq: take(keys::EATING_OUT_FREQ)?,
            health_notes: answers.get(keys::HEALTH_NOTES).unwrap_or_default().to_string(),
        })
    }
}
