//! Choosing the next clarification question

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use super::similarity::{KeywordSimilarity, SimilarityStrategy};
use crate::llm::{GenerateOptions, LlmClient, generate};
use crate::prompts::PromptLoader;
use crate::requirements::Requirement;

pub const BUDGET_QUESTION: &str = "What's your budget for this purchase?";
pub const USE_CASE_QUESTION: &str = "How do you plan to use this product?";
pub const SPECS_QUESTION: &str = "Are there any specific features or specs you need?";
pub const CATCH_ALL_QUESTION: &str = "Could you tell me more about what you're looking for?";

/// How many suggestions and past questions go into the prompt
const PROMPT_WINDOW: usize = 3;

/// Question used when the model cannot provide one
pub fn fallback_question(requirement: &Requirement) -> &'static str {
    if requirement.budget.is_none() {
        BUDGET_QUESTION
    } else if requirement.use_case.is_empty() {
        USE_CASE_QUESTION
    } else if requirement.must_have_specs.is_empty() {
        SPECS_QUESTION
    } else {
        CATCH_ALL_QUESTION
    }
}

/// `specifications_or_use_case` -> `Specifications Or Use Case`
fn field_label(field: &str) -> String {
    field
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn known_facts(requirement: &Requirement) -> Vec<String> {
    let mut known = Vec::new();
    if !requirement.product_category.is_empty() {
        known.push(format!("Product: {}", requirement.product_category));
    }
    if let Some(budget) = &requirement.budget {
        known.push(format!("Budget: ${:.0}", budget.max));
    }
    if !requirement.use_case.is_empty() {
        known.push(format!("Use case: {}", requirement.use_case));
    }
    if !requirement.must_have_specs.is_empty() {
        let specs: Vec<String> = requirement
            .must_have_specs
            .iter()
            .take(PROMPT_WINDOW)
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        known.push(format!("Specs: {}", specs.join(", ")));
    }
    known
}

/// Picks one question per round without repeating earlier ones
///
/// Owns the asked-question history for one negotiation session.
pub struct ClarificationSelector {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    similarity: Box<dyn SimilarityStrategy>,
    asked: Vec<String>,
}

impl ClarificationSelector {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>) -> Self {
        Self {
            llm,
            prompts,
            similarity: Box::new(KeywordSimilarity),
            asked: Vec::new(),
        }
    }

    /// Replace the similarity strategy
    pub fn with_similarity(mut self, similarity: Box<dyn SimilarityStrategy>) -> Self {
        self.similarity = similarity;
        self
    }

    /// Questions asked so far, oldest first
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    /// Forget the question history before a new session
    pub fn reset(&mut self) {
        debug!(asked = self.asked.len(), "reset: called");
        self.asked.clear();
    }

    fn already_asked(&self, question: &str) -> bool {
        self.asked.iter().any(|asked| self.similarity.is_similar(question, asked))
    }

    /// Produce the next question and record it in the history
    pub async fn next_question(&mut self, requirement: &Requirement, missing: &[String], suggested: &[String]) -> String {
        debug!(?missing, suggested = suggested.len(), asked = self.asked.len(), "next_question: called");

        let question = match suggested.iter().find(|q| !self.already_asked(q)) {
            Some(q) => {
                debug!(%q, "next_question: using suggested question");
                q.clone()
            }
            None => self.generate_question(requirement, missing, suggested).await,
        };

        info!(%question, "next_question: selected");
        self.asked.push(question.clone());
        question
    }

    async fn generate_question(&self, requirement: &Requirement, missing: &[String], suggested: &[String]) -> String {
        debug!("generate_question: called");
        let recent_start = self.asked.len().saturating_sub(PROMPT_WINDOW);
        let context = json!({
            "known": known_facts(requirement),
            "missing": missing.iter().map(|f| field_label(f)).collect::<Vec<_>>(),
            "suggested": suggested.iter().take(PROMPT_WINDOW).collect::<Vec<_>>(),
            "asked": &self.asked[recent_start..],
        });

        let rendered = self
            .prompts
            .render("clarify", &context)
            .and_then(|prompt| Ok((prompt, self.prompts.load_template("collector-system")?)));
        let (prompt, system) = match rendered {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "generate_question: prompt unavailable, using fallback");
                return fallback_question(requirement).to_string();
            }
        };

        let options = GenerateOptions {
            temperature: Some(0.7),
            max_tokens: 200,
            ..GenerateOptions::default()
        };

        match generate(self.llm.as_ref(), &prompt, &system, &options).await {
            Ok(text) => {
                let question = text.trim().trim_matches('"').trim();
                if question.is_empty() {
                    debug!("generate_question: blank answer, using fallback");
                    fallback_question(requirement).to_string()
                } else {
                    question.to_string()
                }
            }
            Err(e) => {
                warn!(error = %e, "generate_question: LLM failed, using fallback");
                fallback_question(requirement).to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::requirements::BudgetConstraint;

    fn selector(mock: Arc<MockLlmClient>) -> ClarificationSelector {
        ClarificationSelector::new(mock, Arc::new(PromptLoader::embedded_only()))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_skips_similar_suggestion() {
        let mock = Arc::new(MockLlmClient::new(vec![]));
        let mut selector = selector(mock.clone());
        selector.asked.push("What's your budget?".to_string());

        let question = selector
            .next_question(
                &Requirement::default(),
                &[],
                &strings(&["What is your budget range?", "How will you use it?"]),
            )
            .await;

        assert_eq!(question, "How will you use it?");
        assert_eq!(selector.asked(), &strings(&["What's your budget?", "How will you use it?"])[..]);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generates_when_suggestions_exhausted() {
        let mock = Arc::new(MockLlmClient::with_texts(["  \"Which screen size works for your room?\"\n"]));
        let mut selector = selector(mock.clone());
        selector.asked.push("What's your budget?".to_string());

        let requirement = Requirement {
            product_category: "TV".to_string(),
            budget: Some(BudgetConstraint::new(800.0).unwrap()),
            ..Default::default()
        };
        let question = selector
            .next_question(&requirement, &strings(&["specifications_or_use_case"]), &strings(&["What price range?"]))
            .await;

        assert_eq!(question, "Which screen size works for your room?");

        let request = &mock.requests()[0];
        assert_eq!(request.max_tokens, 200);
        assert_eq!(request.temperature, Some(0.7));
        let prompt = &request.messages[0].content;
        assert!(prompt.contains("Specifications Or Use Case"));
        assert!(prompt.contains("Budget: $800"));
        assert!(prompt.contains("- What's your budget?"));
    }

    #[tokio::test]
    async fn test_fallback_tree_on_llm_failure() {
        let cases = [
            (Requirement::default(), BUDGET_QUESTION),
            (
                Requirement {
                    budget: Some(BudgetConstraint::new(500.0).unwrap()),
                    ..Default::default()
                },
                USE_CASE_QUESTION,
            ),
            (
                Requirement {
                    budget: Some(BudgetConstraint::new(500.0).unwrap()),
                    use_case: "travel".to_string(),
                    ..Default::default()
                },
                SPECS_QUESTION,
            ),
        ];

        for (requirement, expected) in cases {
            let mut selector = selector(Arc::new(MockLlmClient::new(vec![])));
            let question = selector.next_question(&requirement, &[], &[]).await;
            assert_eq!(question, expected);
            assert_eq!(selector.asked(), &[expected.to_string()][..]);
        }
    }

    #[tokio::test]
    async fn test_blank_answer_falls_back() {
        let mut requirement = Requirement {
            budget: Some(BudgetConstraint::new(500.0).unwrap()),
            use_case: "travel".to_string(),
            ..Default::default()
        };
        requirement.must_have_specs.insert("weight".to_string(), "under 1kg".to_string());

        let mut selector = selector(Arc::new(MockLlmClient::with_texts(["   "])));
        assert_eq!(selector.next_question(&requirement, &[], &[]).await, CATCH_ALL_QUESTION);
    }

    #[tokio::test]
    async fn test_reset_clears_history() {
        let mut selector = selector(Arc::new(MockLlmClient::new(vec![])));
        selector.next_question(&Requirement::default(), &[], &[]).await;
        assert_eq!(selector.asked().len(), 1);

        selector.reset();
        assert!(selector.asked().is_empty());
        // The budget fallback is available again
        assert_eq!(selector.next_question(&Requirement::default(), &[], &[]).await, BUDGET_QUESTION);
    }

    #[test]
    fn test_field_label() {
        assert_eq!(field_label("product_category"), "Product Category");
        assert_eq!(field_label("budget"), "Budget");
    }

    struct NeverSimilar;

    impl SimilarityStrategy for NeverSimilar {
        fn is_similar(&self, _q1: &str, _q2: &str) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_custom_similarity_strategy() {
        let mut selector = selector(Arc::new(MockLlmClient::new(vec![]))).with_similarity(Box::new(NeverSimilar));
        selector.asked.push("What's your budget?".to_string());

        let question = selector
            .next_question(&Requirement::default(), &[], &strings(&["What is your budget range?"]))
            .await;
        assert_eq!(question, "What is your budget range?");
    }
}
