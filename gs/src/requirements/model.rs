//! Requirement and budget types plus the completeness predicate

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Minimum completeness score for a requirement to be considered ready
pub const READY_THRESHOLD: f64 = 0.7;

/// Label used when both the specs and the use case are missing
pub const SPECS_OR_USE_CASE: &str = "specifications_or_use_case";

/// Errors raised when constructing an invalid budget
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BudgetError {
    #[error("Maximum budget must be positive, got {0}")]
    NonPositiveMax(f64),

    #[error("Minimum budget cannot be negative, got {0}")]
    NegativeMin(f64),
}

/// The user's budget for the purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConstraint {
    pub min: Option<f64>,
    pub max: f64,
    #[serde(default)]
    pub flexible: bool,
    #[serde(default)]
    pub flexibility_percent: Option<f64>,
}

impl BudgetConstraint {
    /// Create a budget with the given maximum
    pub fn new(max: f64) -> Result<Self, BudgetError> {
        debug!(%max, "BudgetConstraint::new: called");
        if max.is_nan() || max <= 0.0 {
            return Err(BudgetError::NonPositiveMax(max));
        }
        Ok(Self {
            min: None,
            max,
            flexible: false,
            flexibility_percent: None,
        })
    }

    /// Set the lower bound
    pub fn with_min(mut self, min: f64) -> Result<Self, BudgetError> {
        if min < 0.0 || !min.is_finite() {
            return Err(BudgetError::NegativeMin(min));
        }
        self.min = Some(min);
        Ok(self)
    }

    /// Mark the budget as flexible by the given percentage
    pub fn with_flexibility(mut self, percent: Option<f64>) -> Self {
        self.flexible = true;
        self.flexibility_percent = percent;
        self
    }

    /// Maximum spend including any flexibility allowance
    pub fn effective_max(&self) -> f64 {
        match (self.flexible, self.flexibility_percent) {
            (true, Some(pct)) => self.max * (1.0 + pct / 100.0),
            _ => self.max,
        }
    }
}

/// Everything known about what the user wants to buy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirement {
    pub product_category: String,
    pub budget: Option<BudgetConstraint>,
    pub use_case: String,
    pub must_have_specs: BTreeMap<String, String>,
    pub nice_to_have_specs: BTreeMap<String, String>,
    pub deal_breakers: BTreeSet<String>,
    pub preferred_brands: BTreeSet<String>,
    pub excluded_brands: BTreeSet<String>,
    /// Most important first
    pub priorities: Vec<String>,
    pub completeness_score: f64,
    /// Transcript of everything the user said, oldest first
    pub raw_input: String,
}

impl Requirement {
    /// An empty requirement seeded with the user's words
    pub fn from_raw_input(raw_input: impl Into<String>) -> Self {
        Self {
            raw_input: raw_input.into(),
            ..Self::default()
        }
    }

    fn has_category(&self) -> bool {
        !self.product_category.is_empty() && self.product_category.chars().count() > 2
    }

    fn has_budget(&self) -> bool {
        self.budget.as_ref().is_some_and(|b| b.max > 0.0)
    }

    fn has_specs_or_use_case(&self) -> bool {
        !self.must_have_specs.is_empty() || !self.use_case.is_empty()
    }

    /// Whether the requirement is complete enough to start searching
    ///
    /// Needs a category longer than two characters, a positive budget, either
    /// must-have specs or a use case, and a score of at least [`READY_THRESHOLD`].
    pub fn is_complete(&self) -> bool {
        let complete = self.has_category()
            && self.has_budget()
            && self.has_specs_or_use_case()
            && self.completeness_score >= READY_THRESHOLD;
        debug!(%complete, score = %self.completeness_score, "Requirement::is_complete: evaluated");
        complete
    }

    /// Field checks that currently fail, in fixed order
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if !self.has_category() {
            missing.push("product_category".to_string());
        }
        if !self.has_budget() {
            missing.push("budget".to_string());
        }
        if !self.has_specs_or_use_case() {
            missing.push(SPECS_OR_USE_CASE.to_string());
        }
        missing
    }

    /// Search phrase: the category followed by must-have spec values
    pub fn search_query(&self) -> String {
        std::iter::once(self.product_category.as_str())
            .chain(self.must_have_specs.values().map(String::as_str))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Human-readable rendering for prompts and the terminal
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Product: {}", self.product_category)];

        match &self.budget {
            Some(budget) => lines.push(format!(
                "Budget: ${:.0} - ${:.0}",
                budget.min.unwrap_or(0.0),
                budget.max
            )),
            None => lines.push("Budget: Not specified".to_string()),
        }

        if !self.use_case.is_empty() {
            lines.push(format!("Use Case: {}", self.use_case));
        }

        if !self.must_have_specs.is_empty() {
            lines.push("Must-Have Specs:".to_string());
            for (key, value) in &self.must_have_specs {
                lines.push(format!("  - {}: {}", key, value));
            }
        }

        if !self.nice_to_have_specs.is_empty() {
            lines.push("Nice-to-Have:".to_string());
            for (key, value) in &self.nice_to_have_specs {
                lines.push(format!("  - {}: {}", key, value));
            }
        }

        if !self.deal_breakers.is_empty() {
            lines.push("Deal Breakers:".to_string());
            for item in &self.deal_breakers {
                lines.push(format!("  - {}", item));
            }
        }

        if !self.priorities.is_empty() {
            lines.push(format!("Priorities: {}", self.priorities.join(" > ")));
        }

        lines.join("\n")
    }
}
