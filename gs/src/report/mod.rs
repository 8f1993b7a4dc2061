//! Recommendation reports
//!
//! The [`Analyzer`] asks the model for a markdown comparison of the listings.
//! When the model is unavailable it ranks the listings itself, and when there
//! is nothing to compare it explains how to widen the search.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use eyre::{Context, Result};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::llm::{GenerateOptions, LlmClient, LlmError, generate};
use crate::prompts::PromptLoader;
use crate::requirements::Requirement;
use crate::search::Listing;

/// Listings shown in the fallback report
const FALLBACK_TOP_N: usize = 5;

/// Longest category fragment used in a report filename
const FILENAME_CATEGORY_MAX: usize = 30;

/// Writes the final comparison report
pub struct Analyzer {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    thinking: bool,
}

impl Analyzer {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, thinking: bool) -> Self {
        Self { llm, prompts, thinking }
    }

    /// Produce a markdown report; never fails
    pub async fn report(&self, listings: &[Listing], requirement: &Requirement) -> String {
        debug!(count = listings.len(), category = %requirement.product_category, "report: called");
        if listings.is_empty() {
            return no_results_report(requirement);
        }

        match self.analyze(listings, requirement).await {
            Ok(text) if !text.trim().is_empty() => {
                info!(len = text.len(), "report: analysis complete");
                text
            }
            Ok(_) => {
                warn!("report: empty analysis, using fallback");
                fallback_report(listings, requirement)
            }
            Err(e) => {
                warn!(error = %e, "report: analysis failed, using fallback");
                fallback_report(listings, requirement)
            }
        }
    }

    async fn analyze(&self, listings: &[Listing], requirement: &Requirement) -> Result<String, LlmError> {
        let context = json!({
            "requirements": requirement.summary(),
            "listings": listings_for_prompt(listings),
        });
        let prompt = self
            .prompts
            .render("report", &context)
            .map_err(|e| LlmError::Prompt(e.to_string()))?;
        let system = self
            .prompts
            .load_template("analyzer-system")
            .map_err(|e| LlmError::Prompt(e.to_string()))?;

        let options = GenerateOptions {
            temperature: Some(0.5),
            max_tokens: 8192,
            thinking: self.thinking,
            ..GenerateOptions::default()
        };
        generate(self.llm.as_ref(), &prompt, &system, &options).await
    }
}

fn format_price(price: Option<f64>) -> String {
    price.map(|p| format!("${:.2}", p)).unwrap_or_else(|| "N/A".to_string())
}

fn format_rating(listing: &Listing) -> String {
    match (listing.rating, listing.review_count) {
        (Some(rating), Some(count)) => format!("{:.1}/5 ({} reviews)", rating, count),
        (Some(rating), None) => format!("{:.1}/5", rating),
        _ => "N/A".to_string(),
    }
}

fn listings_for_prompt(listings: &[Listing]) -> String {
    let mut out = String::new();
    for (i, listing) in listings.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, listing.title));
        if !listing.brand.is_empty() {
            out.push_str(&format!("   Brand: {}\n", listing.brand));
        }
        out.push_str(&format!("   Price: {}\n", format_price(listing.price)));
        out.push_str(&format!("   Rating: {}\n", format_rating(listing)));
        if !listing.source.is_empty() {
            out.push_str(&format!("   Source: {}\n", listing.source));
        }
        for (key, value) in &listing.specs {
            out.push_str(&format!("   {}: {}\n", key, value));
        }
        if !listing.url.is_empty() {
            out.push_str(&format!("   URL: {}\n", listing.url));
        }
    }
    out
}

/// Highest rated first, cheaper first among equals; unknowns last
fn rank(a: &Listing, b: &Listing) -> Ordering {
    let by_rating = match (a.rating, b.rating) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_rating.then_with(|| match (a.price, b.price) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}

/// Deterministic report used when the model cannot analyze the listings
pub fn fallback_report(listings: &[Listing], requirement: &Requirement) -> String {
    let mut ranked: Vec<&Listing> = listings.iter().collect();
    ranked.sort_by(|a, b| rank(a, b));

    let mut out = format!(
        "# Product Research Report: {}\n\n\
         _Automated analysis was unavailable. Listings are ranked by rating, then price._\n\n\
         ## Your Requirements\n\n{}\n\n## Top Picks\n",
        requirement.product_category,
        requirement.summary()
    );

    for (i, listing) in ranked.iter().take(FALLBACK_TOP_N).enumerate() {
        out.push_str(&format!("\n### {}. {}\n\n", i + 1, listing.title));
        out.push_str(&format!("- **Price:** {}\n", format_price(listing.price)));
        out.push_str(&format!("- **Rating:** {}\n", format_rating(listing)));
        if !listing.source.is_empty() {
            out.push_str(&format!("- **Source:** {}\n", listing.source));
        }
        if !listing.url.is_empty() {
            out.push_str(&format!("- [View product]({})\n", listing.url));
        }
    }

    out.push_str(&format!(
        "\n_{} listings found in total. Compare current prices before buying._\n",
        listings.len()
    ));
    out
}

/// Report for a search that found nothing
pub fn no_results_report(requirement: &Requirement) -> String {
    format!(
        "# Product Research Report: {}\n\n\
         No products matched your requirements.\n\n\
         ## Your Requirements\n\n{}\n\n\
         ## Suggestions\n\n\
         - Increase the budget or allow some flexibility\n\
         - Drop some must-have specs or move them to nice-to-have\n\
         - Remove brand restrictions\n\
         - Try a broader product category\n",
        requirement.product_category,
        requirement.summary()
    )
}

/// Filename for a report: `report_{category}_{timestamp}.md`
fn report_filename(requirement: &Requirement) -> String {
    let mut category: String = requirement
        .product_category
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(FILENAME_CATEGORY_MAX)
        .collect();
    if category.is_empty() {
        category = "product".to_string();
    }
    format!("report_{}_{}.md", category, Local::now().format("%Y%m%d_%H%M%S"))
}

/// Write the report into `dir`, creating it if needed
pub fn save_report(dir: &Path, report: &str, requirement: &Requirement) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create reports directory {}", dir.display()))?;

    let path = dir.join(report_filename(requirement));
    std::fs::write(&path, report).with_context(|| format!("Failed to write report {}", path.display()))?;

    info!(path = %path.display(), "save_report: saved");
    Ok(path)
}
