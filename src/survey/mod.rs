//! Lifestyle survey — a fixed list of choice/text questions asked one at a
//! time after basic info.

pub mod model;
pub mod sequencer;

pub use model::{LifestyleAnswers, Question, SurveyAnswers, keys, lifestyle_questions};
pub use sequencer::{SurveyProgress, SurveySequencer};
