//! Basic body-metric data collected on the second onboarding screen.

use serde::{Deserialize, Serialize};

use crate::error::FlowError;

/// Gender choices offered by the basic-info form.
pub const GENDER_OPTIONS: [&str; 3] = ["여성", "남성", "기타"];

/// Body metrics and goal. Kept as the strings the user typed; they are sent
/// to the backend verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfo {
    pub age: String,
    pub gender: String,
    /// Height in cm.
    pub height: String,
    /// Current weight in kg.
    pub weight: String,
    /// Diet period in weeks.
    pub period: String,
    /// Target weight loss in kg.
    pub target_loss: String,
}

/// A basic-info form field, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicInfoField {
    Age,
    Gender,
    Height,
    Weight,
    Period,
    TargetLoss,
}

impl BasicInfoField {
    pub const ALL: [BasicInfoField; 6] = [
        Self::Age,
        Self::Gender,
        Self::Height,
        Self::Weight,
        Self::Period,
        Self::TargetLoss,
    ];

    /// Form label shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Age => "나이",
            Self::Gender => "성별",
            Self::Height => "키 (cm)",
            Self::Weight => "현재 체중 (kg)",
            Self::Period => "다이어트 기간 (주)",
            Self::TargetLoss => "목표 감량 체중 (kg)",
        }
    }

    /// Example value shown as a hint.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Age => "25",
            Self::Gender => "여성 / 남성 / 기타",
            Self::Height => "162",
            Self::Weight => "65",
            Self::Period => "4",
            Self::TargetLoss => "5",
        }
    }

    fn wire_name(&self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Gender => "gender",
            Self::Height => "height",
            Self::Weight => "weight",
            Self::Period => "period",
            Self::TargetLoss => "targetLoss",
        }
    }
}

impl BasicInfo {
    pub fn get(&self, field: BasicInfoField) -> &str {
        match field {
            BasicInfoField::Age => &self.age,
            BasicInfoField::Gender => &self.gender,
            BasicInfoField::Height => &self.height,
            BasicInfoField::Weight => &self.weight,
            BasicInfoField::Period => &self.period,
            BasicInfoField::TargetLoss => &self.target_loss,
        }
    }

    pub fn set(&mut self, field: BasicInfoField, value: impl Into<String>) {
        let value = value.into();
        match field {
            BasicInfoField::Age => self.age = value,
            BasicInfoField::Gender => self.gender = value,
            BasicInfoField::Height => self.height = value,
            BasicInfoField::Weight => self.weight = value,
            BasicInfoField::Period => self.period = value,
            BasicInfoField::TargetLoss => self.target_loss = value,
        }
    }

    /// Check that numeric fields hold positive numbers and gender is set.
    pub fn validate(&self) -> Result<(), FlowError> {
        BasicInfoField::ALL
            .into_iter()
            .try_for_each(|field| self.validate_field(field))
    }

    /// Check a single field.
    pub fn validate_field(&self, field: BasicInfoField) -> Result<(), FlowError> {
        let raw = self.get(field).trim();
        if field == BasicInfoField::Gender {
            if raw.is_empty() {
                return Err(invalid(field, "required"));
            }
            return Ok(());
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => Ok(()),
            Ok(_) => Err(invalid(field, "must be greater than zero")),
            Err(_) => Err(invalid(field, &format!("'{raw}' is not a number"))),
        }
    }
}

fn invalid(field: BasicInfoField, reason: &str) -> FlowError {
    FlowError::InvalidBasicInfo {
        field: field.wire_name().to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BasicInfo {
        BasicInfo {
            age: "25".into(),
            gender: "여성".into(),
            height: "162".into(),
            weight: "65".into(),
            period: "4".into(),
            target_loss: "5".into(),
        }
    }

    #[test]
    fn serializes_with_wire_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["targetLoss"], "5");
        assert_eq!(json["height"], "162");
        assert_eq!(json.as_object().unwrap().len(), 6);
    }

    #[test]
    fn valid_sample_passes() {
        assert!(sample().validate().is_ok());
        let decimal = BasicInfo {
            weight: "65.5".into(),
            ..sample()
        };
        assert!(decimal.validate().is_ok());
    }

    #[test]
    fn non_numeric_and_non_positive_values_are_rejected() {
        let bad_age = BasicInfo {
            age: "스물다섯".into(),
            ..sample()
        };
        assert!(matches!(
            bad_age.validate(),
            Err(FlowError::InvalidBasicInfo { ref field, .. }) if field == "age"
        ));

        let zero_period = BasicInfo {
            period: "0".into(),
            ..sample()
        };
        assert!(matches!(
            zero_period.validate(),
            Err(FlowError::InvalidBasicInfo { ref field, .. }) if field == "period"
        ));

        let no_gender = BasicInfo {
            gender: "  ".into(),
            ..sample()
        };
        assert!(no_gender.validate().is_err());
    }

    #[test]
    fn set_and_get_cover_every_field() {
        let mut info = BasicInfo::default();
        for (i, field) in BasicInfoField::ALL.into_iter().enumerate() {
            info.set(field, i.to_string());
        }
        for (i, field) in BasicInfoField::ALL.into_iter().enumerate() {
            assert_eq!(info.get(field), i.to_string());
        }
    }
}
