//! OnboardingFlow — sequences the onboarding stages and threads the data
//! each stage produces into the next.

use tracing::info;

use super::model::BasicInfo;
use super::state::OnboardingStage;
use crate::error::FlowError;
use crate::survey::{
    LifestyleAnswers, Question, SurveyProgress, SurveySequencer, lifestyle_questions,
};

/// Everything the chat stage needs from the earlier stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSeed {
    pub basic_info: BasicInfo,
    pub lifestyle: LifestyleAnswers,
}

/// Result of answering a survey question through the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurveyStep {
    /// The survey continues with this question.
    Next(Question),
    /// The survey finished and the flow moved to chat.
    Finished(ChatSeed),
}

/// Top-level onboarding controller. Holds no business logic beyond
/// sequencing and data threading.
#[derive(Debug, Clone)]
pub struct OnboardingFlow {
    stage: OnboardingStage,
    questions: Vec<Question>,
    basic_info: Option<BasicInfo>,
    survey: Option<SurveySequencer>,
    seed: Option<ChatSeed>,
}

impl Default for OnboardingFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl OnboardingFlow {
    /// Flow using the standard lifestyle survey.
    pub fn new() -> Self {
        Self::with_questions(lifestyle_questions())
    }

    /// Flow with a custom survey question list.
    pub fn with_questions(questions: Vec<Question>) -> Self {
        Self {
            stage: OnboardingStage::Welcome,
            questions,
            basic_info: None,
            survey: None,
            seed: None,
        }
    }

    pub fn stage(&self) -> OnboardingStage {
        self.stage
    }

    /// Welcome → BasicInfo.
    pub fn start(&mut self) -> Result<(), FlowError> {
        self.advance("start", OnboardingStage::BasicInfo)
    }

    /// BasicInfo → Survey. Returns the first survey question.
    pub fn submit_basic_info(&mut self, info: BasicInfo) -> Result<Question, FlowError> {
        self.expect_stage(OnboardingStage::BasicInfo, "submit basic info")?;
        info.validate()?;
        LifestyleAnswers::check_questions(&self.questions)?;

        let survey = SurveySequencer::new(self.questions.clone())?;
        let first = survey
            .current()
            .cloned()
            .ok_or(crate::error::SurveyError::Empty)?;

        self.advance("submit basic info", OnboardingStage::Survey)?;
        self.basic_info = Some(info);
        self.survey = Some(survey);
        Ok(first)
    }

    /// The survey question awaiting an answer, if in the survey stage.
    pub fn current_question(&self) -> Option<&Question> {
        self.survey.as_ref().and_then(SurveySequencer::current)
    }

    /// Answer the current survey question. The final answer moves the flow
    /// into chat.
    pub fn answer_survey(&mut self, value: impl Into<String>) -> Result<SurveyStep, FlowError> {
        self.expect_stage(OnboardingStage::Survey, "answer the survey")?;
        let survey = self.survey.as_mut().ok_or_else(|| FlowError::InvalidStage {
            stage: self.stage.to_string(),
            action: "answer the survey".into(),
        })?;

        match survey.answer_current(value)? {
            SurveyProgress::Next(_) => {
                let next = survey
                    .current()
                    .cloned()
                    .ok_or(crate::error::SurveyError::AlreadyComplete)?;
                Ok(SurveyStep::Next(next))
            }
            SurveyProgress::Completed(answers) => {
                let lifestyle = match LifestyleAnswers::try_from(answers) {
                    Ok(lifestyle) => lifestyle,
                    Err(e) => {
                        // The sequencer is exhausted; restart the survey.
                        self.survey = Some(SurveySequencer::new(self.questions.clone())?);
                        return Err(e.into());
                    }
                };
                let basic_info = self.basic_info.clone().unwrap_or_default();
                let seed = ChatSeed {
                    basic_info,
                    lifestyle,
                };
                self.advance("finish the survey", OnboardingStage::Chat)?;
                self.survey = None;
                self.seed = Some(seed.clone());
                Ok(SurveyStep::Finished(seed))
            }
        }
    }

    /// Data collected for the chat stage, once reached.
    pub fn chat_seed(&self) -> Option<&ChatSeed> {
        self.seed.as_ref()
    }

    fn expect_stage(&self, expected: OnboardingStage, action: &str) -> Result<(), FlowError> {
        if self.stage != expected {
            return Err(FlowError::InvalidStage {
                stage: self.stage.to_string(),
                action: action.to_string(),
            });
        }
        Ok(())
    }

    fn advance(&mut self, action: &str, target: OnboardingStage) -> Result<(), FlowError> {
        if !self.stage.can_transition_to(target) {
            return Err(FlowError::InvalidStage {
                stage: self.stage.to_string(),
                action: action.to_string(),
            });
        }
        info!(from = %self.stage, to = %target, "Onboarding stage changed");
        self.stage = target;
        Ok(())
    }
}
