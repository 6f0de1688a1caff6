use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One untyped scalar from a survey submission. Form fields arrive as text,
/// `Age` may arrive pre-parsed, and anything can be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    /// JSON `null` or an empty CSV cell.
    Missing,
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

/// One raw survey response, keyed by field name.
pub type RawRecord = HashMap<String, FieldValue>;

/// Canonical column order of the survey dataset. Records are keyed maps, so
/// this fixed order is what makes the pipeline's natural output deterministic
/// regardless of map iteration order.
pub const SURVEY_FIELDS: &[&str] = &[
    "Timestamp",
    "Age",
    "Gender",
    "Country",
    "state",
    "self_employed",
    "family_history",
    "treatment",
    "work_interfere",
    "no_employees",
    "remote_work",
    "tech_company",
    "benefits",
    "care_options",
    "wellness_program",
    "seek_help",
    "anonymity",
    "leave",
    "mental_health_consequence",
    "phys_health_consequence",
    "coworkers",
    "supervisor",
    "mental_health_interview",
    "phys_health_interview",
    "mental_vs_physical",
    "obs_consequence",
    "comments",
];
