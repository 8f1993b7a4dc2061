//! Decision record and the parse-with-defaults boundary
//!
//! Every default applied to model output lives in this file:
//!
//! | field | default when absent or wrong shape |
//! |---|---|
//! | `status` | `need_more_info` unless the string is `ready` (any case) |
//! | `missing_fields` | empty, non-string items dropped |
//! | `extracted_requirements` | empty object |
//! | `product_category`, `use_case` | empty string |
//! | `budget` | `None` unless an object with a positive numeric `max` |
//! | `budget.min`, `budget.flexibility_percent` | dropped when invalid |
//! | spec maps | empty; values rendered to strings |
//! | brand/deal-breaker sets, `priorities` | empty, non-string items dropped |
//! | `completeness_score` | `0.0`, clamped into `[0, 1]` |
//! | `reasoning` | empty string |
//! | `suggested_questions` | empty, blank items dropped |

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use tracing::debug;

use super::json::extract_json;
use crate::requirements::{BudgetConstraint, Requirement};

/// Question offered when the model output could not be understood at all
pub const GENERIC_QUESTION: &str = "Could you provide more details about what you're looking for?";

/// Planner verdict on whether research can start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionStatus {
    Ready,
    NeedMoreInfo,
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::NeedMoreInfo => write!(f, "need_more_info"),
        }
    }
}

/// One extraction result
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub status: DecisionStatus,
    pub missing_fields: Vec<String>,
    /// Absent only when nothing could be parsed
    pub requirements: Option<Requirement>,
    pub confidence: f64,
    /// Diagnostic text from the model
    pub reasoning: String,
    pub suggested_questions: Vec<String>,
}

impl Decision {
    /// The decision returned when no JSON object could be recovered
    pub fn parse_failure() -> Self {
        Self {
            status: DecisionStatus::NeedMoreInfo,
            missing_fields: vec!["unknown".to_string()],
            requirements: None,
            confidence: 0.0,
            reasoning: "Failed to parse requirements".to_string(),
            suggested_questions: vec![GENERIC_QUESTION.to_string()],
        }
    }

    /// Parse raw model text into a decision, never failing
    pub fn parse(text: &str, user_input: &str) -> Self {
        match extract_json(text) {
            Some(value) => Self::from_llm_value(&value, user_input),
            None => {
                debug!(text_len = text.len(), "Decision::parse: no JSON object recovered");
                Self::parse_failure()
            }
        }
    }

    /// Map an untyped JSON object onto a decision, applying the defaults table
    pub fn from_llm_value(value: &Value, user_input: &str) -> Self {
        debug!("Decision::from_llm_value: called");
        let empty = Map::new();
        let root = value.as_object().unwrap_or(&empty);

        let status = match root.get("status").and_then(Value::as_str) {
            Some(s) if s.trim().eq_ignore_ascii_case("ready") => DecisionStatus::Ready,
            _ => DecisionStatus::NeedMoreInfo,
        };

        let score = score_field(root.get("completeness_score"));
        let extracted = root
            .get("extracted_requirements")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let requirement = Requirement {
            product_category: string_field(extracted, "product_category"),
            budget: budget_field(extracted.get("budget")),
            use_case: string_field(extracted, "use_case"),
            must_have_specs: spec_map(extracted.get("must_have_specs")),
            nice_to_have_specs: spec_map(extracted.get("nice_to_have_specs")),
            deal_breakers: string_list(extracted.get("deal_breakers")).into_iter().collect(),
            preferred_brands: string_list(extracted.get("preferred_brands")).into_iter().collect(),
            excluded_brands: string_list(extracted.get("excluded_brands")).into_iter().collect(),
            priorities: string_list(extracted.get("priorities")),
            completeness_score: score,
            raw_input: user_input.to_string(),
        };

        let decision = Self {
            status,
            missing_fields: string_list(root.get("missing_fields")),
            requirements: Some(requirement),
            confidence: score,
            reasoning: string_field(root, "reasoning"),
            suggested_questions: string_list(root.get("suggested_questions")),
        };
        debug!(status = %decision.status, confidence = %decision.confidence, "Decision::from_llm_value: parsed");
        decision
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Non-blank string items, anything else dropped
fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn score_field(value: Option<&Value>) -> f64 {
    match value.and_then(Value::as_f64) {
        Some(score) if score.is_finite() => score.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

fn budget_field(value: Option<&Value>) -> Option<BudgetConstraint> {
    let obj = value?.as_object()?;
    let max = obj.get("max").and_then(Value::as_f64)?;
    let mut budget = match BudgetConstraint::new(max) {
        Ok(b) => b,
        Err(e) => {
            debug!(error = %e, "budget_field: dropping budget");
            return None;
        }
    };

    if let Some(min) = obj.get("min").and_then(Value::as_f64) {
        budget = match budget.clone().with_min(min) {
            Ok(b) => b,
            Err(e) => {
                debug!(error = %e, "budget_field: dropping min");
                budget
            }
        };
    }

    if obj.get("flexible").and_then(Value::as_bool).unwrap_or(false) {
        let percent = obj
            .get("flexibility_percent")
            .and_then(Value::as_f64)
            .filter(|p| p.is_finite() && *p >= 0.0);
        budget = budget.with_flexibility(percent);
    }

    Some(budget)
}

/// Render a spec value as a string
fn spec_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(items.iter().filter_map(spec_value).collect::<Vec<_>>().join(", ")),
        Value::Object(_) => Some(value.to_string()),
    }
}

fn spec_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| spec_value(v).map(|v| (k.clone(), v)))
                .filter(|(_, v)| !v.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
