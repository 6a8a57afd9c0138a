//! Structured pain assessment returned by the model.
//!
//! The model is asked for a seven-field JSON object but nothing forces it to comply.
//! A reply is parsed once into [`Reply`]: either the object ([`Reply::Structured`])
//! or the untouched text ([`Reply::Raw`]). Key presence is all that is checked.

use serde::Serialize;
use serde_json::{Map, Value};

/// One of the seven fields of an assessment, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentField {
    PainLevel,
    Management,
    Reason,
    Mechanism,
    IncidentPain,
    Psychological,
    Social,
}

impl AssessmentField {
    pub const ALL: [AssessmentField; 7] = [
        AssessmentField::PainLevel,
        AssessmentField::Management,
        AssessmentField::Reason,
        AssessmentField::Mechanism,
        AssessmentField::IncidentPain,
        AssessmentField::Psychological,
        AssessmentField::Social,
    ];

    /// JSON key used in the model's reply
    pub fn key(self) -> &'static str {
        match self {
            AssessmentField::PainLevel => "pain_level",
            AssessmentField::Management => "management",
            AssessmentField::Reason => "reason",
            AssessmentField::Mechanism => "mechanism",
            AssessmentField::IncidentPain => "incident_pain",
            AssessmentField::Psychological => "psychological",
            AssessmentField::Social => "social",
        }
    }

    /// Label shown next to the value on the page
    pub fn label(self) -> &'static str {
        match self {
            AssessmentField::PainLevel => "ระดับความปวด",
            AssessmentField::Management => "แนวทางการจัดการ",
            AssessmentField::Reason => "เหตุผล",
            AssessmentField::Mechanism => "กลไกการปวด (Mechanism)",
            AssessmentField::IncidentPain => "Incident Pain",
            AssessmentField::Psychological => "ปัจจัยจิตใจ (Psychological)",
            AssessmentField::Social => "ปัจจัยสังคม (Social)",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssessmentPayload {
    pub pain_level: Option<String>,
    pub management: Option<String>,
    pub reason: Option<String>,
    pub mechanism: Option<String>,
    pub incident_pain: Option<String>,
    pub psychological: Option<String>,
    pub social: Option<String>,
}

impl AssessmentPayload {
    fn from_object(obj: &Map<String, Value>) -> Self {
        let take = |field: AssessmentField| obj.get(field.key()).and_then(value_text);
        Self {
            pain_level: take(AssessmentField::PainLevel),
            management: take(AssessmentField::Management),
            reason: take(AssessmentField::Reason),
            mechanism: take(AssessmentField::Mechanism),
            incident_pain: take(AssessmentField::IncidentPain),
            psychological: take(AssessmentField::Psychological),
            social: take(AssessmentField::Social),
        }
    }

    pub fn get(&self, field: AssessmentField) -> Option<&str> {
        let value = match field {
            AssessmentField::PainLevel => &self.pain_level,
            AssessmentField::Management => &self.management,
            AssessmentField::Reason => &self.reason,
            AssessmentField::Mechanism => &self.mechanism,
            AssessmentField::IncidentPain => &self.incident_pain,
            AssessmentField::Psychological => &self.psychological,
            AssessmentField::Social => &self.social,
        };
        value.as_deref()
    }
}

// null is treated like a missing key; other scalars keep their JSON spelling
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Result of the single parse attempt on an assistant reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Structured(AssessmentPayload),
    Raw(String),
}

impl Reply {
    pub fn parse(content: &str) -> Self {
        match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(obj)) => Reply::Structured(AssessmentPayload::from_object(&obj)),
            _ => Reply::Raw(content.to_string()),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Reply::Structured(_))
    }
}
