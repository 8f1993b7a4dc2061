//! Search through a web-search-enabled language model
//!
//! The model is prompted with the structured requirement and asked for a JSON
//! product list, which is filtered against the budget.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::{Listing, SearchBackend, SearchError, dedup_listings};
use crate::llm::{GenerateOptions, LlmClient, generate};
use crate::planner::extract_json;
use crate::prompts::PromptLoader;
use crate::requirements::Requirement;

/// Search backend backed by an LLM with live web access
pub struct LlmSearch {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    max_results: usize,
}

impl LlmSearch {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, max_results: usize) -> Self {
        Self {
            llm,
            prompts,
            max_results: max_results.max(1),
        }
    }

    fn prompt_context(&self, requirement: &Requirement) -> Value {
        let features: Vec<&str> = requirement
            .must_have_specs
            .values()
            .take(3)
            .map(String::as_str)
            .collect();

        json!({
            "requirements": requirement.summary(),
            "category": requirement.product_category,
            "budget": requirement
                .budget
                .as_ref()
                .map(|b| format!("${:.0}", b.effective_max()))
                .unwrap_or_else(|| "any".to_string()),
            "use_case": if requirement.use_case.is_empty() { "not specified" } else { requirement.use_case.as_str() },
            "features": if features.is_empty() { "none specified".to_string() } else { features.join(", ") },
            "max_results": self.max_results,
        })
    }
}

/// Accept `299.99`, `"299.99"` and `"$1,299"`
fn parse_price(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
        _ => None,
    }
}

fn first_str<'a>(item: &'a Map<String, Value>, keys: &[&str]) -> &'a str {
    keys.iter()
        .find_map(|k| item.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .unwrap_or_default()
}

fn listing_specs(item: &Map<String, Value>) -> BTreeMap<String, String> {
    let mut specs: BTreeMap<String, String> = item
        .get("specs")
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| (k.clone(), v.as_str().map(String::from).unwrap_or_else(|| v.to_string())))
                .collect()
        })
        .unwrap_or_default();

    if let Some(features) = item.get("features").and_then(Value::as_array) {
        let features: Vec<&str> = features.iter().filter_map(Value::as_str).collect();
        if !features.is_empty() {
            specs.insert("features".to_string(), features.join(", "));
        }
    }
    specs
}

/// Convert one model-reported product, dropping unusable or over-budget items
fn to_listing(item: &Value, requirement: &Requirement) -> Option<Listing> {
    let item = item.as_object()?;
    let title = first_str(item, &["title", "name"]);
    if title.is_empty() {
        return None;
    }

    let price = parse_price(item.get("price")).filter(|p| p.is_finite() && *p > 0.0)?;
    if let Some(budget) = &requirement.budget
        && price > budget.effective_max()
    {
        debug!(%title, %price, "to_listing: over budget");
        return None;
    }

    Some(Listing {
        title: title.to_string(),
        brand: first_str(item, &["brand", "manufacturer"]).to_string(),
        source: first_str(item, &["source", "retailer"]).to_string(),
        price: Some(price),
        rating: item
            .get("rating")
            .and_then(Value::as_f64)
            .filter(|r| r.is_finite())
            .map(|r| r.clamp(0.0, 5.0)),
        review_count: item
            .get("review_count")
            .and_then(|v| v.as_u64().or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))),
        url: first_str(item, &["url", "link"]).to_string(),
        specs: listing_specs(item),
    })
}

/// Pull listings out of the model's answer; no JSON means no listings
pub(crate) fn parse_listings(text: &str, requirement: &Requirement, max_results: usize) -> Vec<Listing> {
    let Some(value) = extract_json(text) else {
        debug!(text_len = text.len(), "parse_listings: no JSON in response");
        return Vec::new();
    };

    let listings: Vec<Listing> = value
        .get("products")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|item| to_listing(item, requirement)).collect())
        .unwrap_or_default();

    let mut listings = dedup_listings(listings);
    listings.truncate(max_results);
    listings
}

#[async_trait]
impl SearchBackend for LlmSearch {
    fn name(&self) -> &str {
        "llm-search"
    }

    async fn search(&self, requirement: &Requirement) -> Result<Vec<Listing>, SearchError> {
        debug!(query = %requirement.search_query(), "search: called");
        let prompt = self
            .prompts
            .render("search", &self.prompt_context(requirement))
            .map_err(|e| SearchError::Prompt(e.to_string()))?;
        let system = self
            .prompts
            .load_template("search-system")
            .map_err(|e| SearchError::Prompt(e.to_string()))?;

        let options = GenerateOptions {
            temperature: Some(0.3),
            max_tokens: 4000,
            ..GenerateOptions::default()
        };
        let text = generate(self.llm.as_ref(), &prompt, &system, &options).await?;

        let listings = parse_listings(&text, requirement, self.max_results);
        info!(count = listings.len(), "search: listings found");
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::requirements::BudgetConstraint;

    fn monitor_requirement() -> Requirement {
        let mut requirement = Requirement {
            product_category: "gaming monitor".to_string(),
            budget: Some(BudgetConstraint::new(400.0).unwrap().with_flexibility(Some(10.0))),
            use_case: "competitive FPS".to_string(),
            ..Default::default()
        };
        requirement
            .must_have_specs
            .insert("refresh_rate".to_string(), "240Hz".to_string());
        requirement
    }

    const RESPONSE: &str = r#"I found these options:
{"products": [
  {"name": "Fast Monitor 27", "brand": "Acme", "price": 349.99, "retailer": "Best Buy",
   "url": "https://shop.example/fast", "rating": 4.6, "review_count": 1200,
   "features": ["240Hz", "1ms"]},
  {"title": "Budget Stretch 27", "price": "$439", "url": "https://shop.example/stretch", "rating": 7},
  {"title": "Too Expensive 32", "price": 899, "url": "https://shop.example/pricey"},
  {"title": "No Price Panel", "url": "https://shop.example/none"},
  {"title": "", "price": 100},
  {"title": "Fast Monitor 27 duplicate", "price": 349.99, "url": "https://shop.example/fast"}
]}
Let me know if you need more."#;

    #[test]
    fn test_parse_listings_filters_and_dedups() {
        let listings = parse_listings(RESPONSE, &monitor_requirement(), 20);
        let titles: Vec<&str> = listings.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Fast Monitor 27", "Budget Stretch 27"]);

        let fast = &listings[0];
        assert_eq!(fast.source, "Best Buy");
        assert_eq!(fast.review_count, Some(1200));
        assert_eq!(fast.specs["features"], "240Hz, 1ms");

        // Within the 10% flexibility allowance, rating clamped
        assert_eq!(listings[1].price, Some(439.0));
        assert_eq!(listings[1].rating, Some(5.0));
    }

    #[test]
    fn test_parse_listings_truncates() {
        assert_eq!(parse_listings(RESPONSE, &monitor_requirement(), 1).len(), 1);
    }

    #[test]
    fn test_parse_listings_without_json() {
        assert!(parse_listings("No products found today.", &monitor_requirement(), 20).is_empty());
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price(Some(&json!(10.5))), Some(10.5));
        assert_eq!(parse_price(Some(&json!("$1,299"))), Some(1299.0));
        assert_eq!(parse_price(Some(&json!("call"))), None);
        assert_eq!(parse_price(None), None);
    }

    #[tokio::test]
    async fn test_search_prompt_and_options() {
        let mock = Arc::new(MockLlmClient::with_texts([RESPONSE]));
        let search = LlmSearch::new(mock.clone(), Arc::new(PromptLoader::embedded_only()), 20);

        let listings = search.search(&monitor_requirement()).await.unwrap();
        assert_eq!(listings.len(), 2);

        let request = &mock.requests()[0];
        let prompt = &request.messages[0].content;
        assert!(prompt.contains("category: gaming monitor"));
        assert!(prompt.contains("cost at most: $440"));
        assert!(prompt.contains("have these features: 240Hz"));
        assert_eq!(request.temperature, Some(0.3));
        assert!(!request.thinking);
    }

    #[tokio::test]
    async fn test_search_backend_error() {
        let search = LlmSearch::new(
            Arc::new(MockLlmClient::new(vec![])),
            Arc::new(PromptLoader::embedded_only()),
            20,
        );
        assert!(matches!(
            search.search(&monitor_requirement()).await,
            Err(SearchError::Backend(_))
        ));
    }
}
