//! Fixed coach messages: greeting, onboarding summary, follow-up questions,
//! and error notices.

use super::controller::ConversationStage;
use crate::onboarding::ChatSeed;

pub const CHAT_TITLE: &str = "AI 다이어트 코치 채팅";

/// Shown above the chat.
pub const DISCLAIMER: &str =
    "이 코치는 의료 상담이 아닌 일반적인 다이어트 조언을 제공합니다.\n건강 이상이 느껴지면 전문가와 상담하세요";

/// Shown while a backend call is in flight.
pub const SENDING: &str = "분석 중...";

pub const FREE_CHAT_HINT: &str = "예: 오늘 점심 식단 추천해줘";

pub const GREETING: &str = "안녕하세요! 저는 AI 다이어트 코치에요! 🥗";

pub const INTRO: &str = "지금까지 입력해주신 정보를 바탕으로, **사용자님께 딱 맞는 식단과 운동 계획**을 만들어드릴게요.\n궁금한 점을 편하게 물어봐주세요!";

pub const GUIDE: &str = "지금 알려주신 정보를 기반으로 맞춤형 4주 플랜을 만들어드리기 전에 몇 가지만 더 여쭤보고 싶어요";

/// Shown when a backend call fails for any reason.
pub const SERVER_ERROR: &str = "❌ 서버 오류가 발생했어요. 잠시 후 다시 시도해 주세요.";

/// Shown when a chat reply carries no blocks.
pub const EMPTY_REPLY: &str = "⚠️ 서버 응답을 불러오지 못했어요.";

/// The three follow-up questions, asked in order before free chat.
pub const FOLLOWUP_QUESTIONS: [&str; 3] = [
    "가장 중요하게 생각하는 **식습관 개선 목표**는 무엇인가요? (예: 야식 끊기, 폭식 줄이기, 채소 섭취 늘리기)",
    "선호하는 **운동 종류**나 피하고 싶은 운동이 있나요? (예: 유산소 선호, 근력 운동 싫음, 걷기 좋아함)",
    "식단이나 운동 계획에서 **절대 포기할 수 없는 부분**이 있다면 알려주세요. (예: 아침 식사는 꼭 밥으로 먹어야 함, 주말에는 자유식 선호)",
];

/// Markdown for follow-up question `step` (1-based).
pub fn followup_question(step: usize) -> String {
    let total = FOLLOWUP_QUESTIONS.len();
    let question = FOLLOWUP_QUESTIONS
        .get(step.saturating_sub(1))
        .copied()
        .unwrap_or_default();
    format!("**[추가 질문 {step}/{total}]**\n{question}")
}

/// Input hint for the current stage.
pub fn input_hint(stage: ConversationStage) -> String {
    match stage.question_number() {
        Some(n) => format!("Q{n}에 대한 답변을 입력해주세요."),
        None => FREE_CHAT_HINT.to_string(),
    }
}

/// Summary of everything collected during onboarding.
pub fn onboarding_summary(seed: &ChatSeed) -> String {
    let info = &seed.basic_info;
    let life = &seed.lifestyle;
    let notes = if life.health_notes.trim().is_empty() {
        "없음"
    } else {
        life.health_notes.as_str()
    };

    [
        "### 📌 입력 정보 요약".to_string(),
        format!(
            "- **기본 정보**: {}세 / {} / {}cm / {}kg",
            info.age, info.gender, info.height, info.weight
        ),
        format!("- **목표**: {}주 동안 {}kg 감량", info.period, info.target_loss),
        format!(
            "- **라이프스타일**: 주 {} 운동, 하루 {}",
            life.exercise_freq, life.meals_per_day
        ),
        format!(
            "- **식습관**: 야식 {}, 외식/배달 {}",
            life.night_snack_freq, life.eating_out_freq
        ),
        format!("- **특이사항**: {notes}"),
    ]
    .join("\n")
}
