//! Research workflow
//!
//! Runs one research session end to end: negotiate the requirement, search,
//! write the report and save it.

use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Context, Result};
use tracing::{debug, info, warn};

use crate::clarify::ClarificationSelector;
use crate::config::{Config, ReportsConfig};
use crate::llm::create_client;
use crate::negotiation::{NegotiationLoop, NegotiationOutcome, NotConvergedReason};
use crate::planner::DecisionExtractor;
use crate::prompts::PromptLoader;
use crate::report::{Analyzer, save_report};
use crate::requirements::Requirement;
use crate::search::{CachedSearch, FileCache, LlmSearch, SearchBackend};
use crate::terminal::UserIo;

/// How a research session ended
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    /// A report was produced
    Completed {
        requirement: Requirement,
        listings: usize,
        report: String,
        saved_to: Option<PathBuf>,
    },
    /// The user quit during negotiation
    Cancelled,
    /// Negotiation ended without a usable requirement
    NotConverged {
        reason: NotConvergedReason,
        missing_fields: Vec<String>,
    },
}

/// What to tell the user when negotiation ended without a requirement
pub fn explain_not_converged(missing_fields: &[String]) -> String {
    let mut lines = vec!["I couldn't gather enough details to search.".to_string()];
    if missing_fields.is_empty() {
        lines.push("Your answers weren't specific enough yet for a confident search.".to_string());
    } else {
        lines.push(format!("Still missing: {}", missing_fields.join(", ")));
    }
    lines.push("Try again with a more specific description.".to_string());
    lines.join("\n")
}

/// Open the configured cache, falling back to no caching
pub fn open_cache(config: &Config) -> FileCache {
    if !config.cache.enabled {
        return FileCache::disabled();
    }
    match FileCache::new(&config.cache.dir, config.cache.ttl_hours, true) {
        Ok(cache) => cache,
        Err(e) => {
            warn!(dir = %config.cache.dir.display(), error = %e, "open_cache: cache unavailable, continuing without it");
            FileCache::disabled()
        }
    }
}

/// Negotiate, search, report
pub struct Workflow {
    negotiation: NegotiationLoop,
    search: Box<dyn SearchBackend>,
    analyzer: Analyzer,
    reports: ReportsConfig,
}

impl Workflow {
    pub fn new(
        negotiation: NegotiationLoop,
        search: Box<dyn SearchBackend>,
        analyzer: Analyzer,
        reports: ReportsConfig,
    ) -> Self {
        Self {
            negotiation,
            search,
            analyzer,
            reports,
        }
    }

    /// Build every collaborator from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        debug!(provider = %config.llm.provider, search = %config.search.backend.provider, "from_config: called");
        config.validate()?;

        let llm = create_client(&config.llm)?;
        let search_llm = create_client(&config.search.backend)?;
        let prompts = Arc::new(PromptLoader::new(config.prompts_dir.as_deref()));

        let negotiation = NegotiationLoop::new(
            DecisionExtractor::new(llm.clone(), prompts.clone(), config.llm.thinking),
            ClarificationSelector::new(llm.clone(), prompts.clone()),
        )
        .with_max_rounds(config.negotiation.max_rounds);

        let search = CachedSearch::new(
            LlmSearch::new(search_llm, prompts.clone(), config.search.max_results),
            open_cache(config),
        );
        let analyzer = Analyzer::new(llm, prompts, config.llm.thinking);

        Ok(Self::new(negotiation, Box::new(search), analyzer, config.reports.clone()))
    }

    /// Run one session starting from the user's first message
    pub async fn run(&mut self, initial_input: &str, io: &mut dyn UserIo) -> Result<WorkflowOutcome> {
        info!("run: phase 1, requirements");
        let requirement = match self.negotiation.run(initial_input, io).await? {
            NegotiationOutcome::Ready(requirement) => requirement,
            NegotiationOutcome::Cancelled => {
                info!("run: cancelled by user");
                return Ok(WorkflowOutcome::Cancelled);
            }
            NegotiationOutcome::NotConverged {
                reason, missing_fields, ..
            } => {
                info!(?reason, ?missing_fields, "run: requirements not converged");
                return Ok(WorkflowOutcome::NotConverged { reason, missing_fields });
            }
        };

        info!(category = %requirement.product_category, "run: phase 2, search");
        io.status(&format!("Searching for {}...", requirement.product_category));
        let listings = match self.search.search(&requirement).await {
            Ok(listings) => listings,
            Err(e) => {
                warn!(backend = %self.search.name(), error = %e, "run: search failed, continuing with no listings");
                Vec::new()
            }
        };
        io.status(&format!("Found {} listings", listings.len()));

        info!(count = listings.len(), "run: phase 3, report");
        if !listings.is_empty() {
            io.status("Analyzing products...");
        }
        let report = self.analyzer.report(&listings, &requirement).await;

        let saved_to = if self.reports.save {
            let path = save_report(&self.reports.dir, &report, &requirement).context("Failed to save report")?;
            io.status(&format!("Report saved to {}", path.display()));
            Some(path)
        } else {
            None
        };

        Ok(WorkflowOutcome::Completed {
            requirement,
            listings: listings.len(),
            report,
            saved_to,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::llm::client::mock::MockLlmClient;
    use crate::negotiation::NegotiationError;
    use crate::search::{Listing, SearchError};
    use crate::terminal::scripted::ScriptedIo;
    use async_trait::async_trait;

    const READY: &str = r#"{"status": "ready", "missing_fields": [],
 "extracted_requirements": {"product_category": "gaming laptop", "use_case": "gaming",
   "budget": {"max": 1500}}, "completeness_score": 0.9}"#;

    struct FixedSearch {
        listings: Vec<Listing>,
        fail: bool,
    }

    #[async_trait]
    impl SearchBackend for FixedSearch {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn search(&self, _requirement: &Requirement) -> Result<Vec<Listing>, SearchError> {
            if self.fail {
                return Err(SearchError::Backend(LlmError::InvalidResponse("down".to_string())));
            }
            Ok(self.listings.clone())
        }
    }

    fn workflow(llm: Arc<MockLlmClient>, search: FixedSearch, reports: ReportsConfig) -> Workflow {
        let prompts = Arc::new(PromptLoader::embedded_only());
        let negotiation = NegotiationLoop::new(
            DecisionExtractor::new(llm.clone(), prompts.clone(), false),
            ClarificationSelector::new(llm.clone(), prompts.clone()),
        );
        Workflow::new(negotiation, Box::new(search), Analyzer::new(llm, prompts, false), reports)
    }

    fn laptop() -> Listing {
        Listing {
            title: "Raptor 15".to_string(),
            price: Some(1399.0),
            rating: Some(4.5),
            url: "https://shop.example/raptor".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_completes_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlmClient::with_texts([READY, "# Verdict\n\nGet the Raptor 15."]));
        let reports = ReportsConfig {
            save: true,
            dir: dir.path().to_path_buf(),
        };
        let mut wf = workflow(
            llm,
            FixedSearch {
                listings: vec![laptop()],
                fail: false,
            },
            reports,
        );
        let mut io = ScriptedIo::default();

        let outcome = wf.run("gaming laptop under $1500", &mut io).await.unwrap();

        let WorkflowOutcome::Completed {
            requirement,
            listings,
            report,
            saved_to,
        } = outcome
        else {
            panic!("expected a completed session");
        };
        assert_eq!(requirement.product_category, "gaming laptop");
        assert_eq!(listings, 1);
        assert_eq!(report, "# Verdict\n\nGet the Raptor 15.");
        let saved_to = saved_to.unwrap();
        assert_eq!(std::fs::read_to_string(saved_to).unwrap(), report);
        assert!(io.statuses.iter().any(|s| s == "Found 1 listings"));
        assert!(io.questions.is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_degrades_to_no_results() {
        let llm = Arc::new(MockLlmClient::with_texts([READY]));
        let reports = ReportsConfig {
            save: false,
            dir: PathBuf::from("unused"),
        };
        let mut wf = workflow(
            llm.clone(),
            FixedSearch {
                listings: vec![],
                fail: true,
            },
            reports,
        );

        let outcome = wf.run("gaming laptop", &mut ScriptedIo::default()).await.unwrap();

        match outcome {
            WorkflowOutcome::Completed {
                listings,
                report,
                saved_to,
                ..
            } => {
                assert_eq!(listings, 0);
                assert!(report.contains("No products matched"));
                assert!(saved_to.is_none());
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        // Only the extraction call reached the model
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_skips_search() {
        let llm = Arc::new(MockLlmClient::with_texts([
            r#"{"status": "need_more_info", "missing_fields": ["budget"],
 "extracted_requirements": {"product_category": "tablet"}, "completeness_score": 0.2,
 "suggested_questions": ["What's your budget?"]}"#,
        ]));
        let mut wf = workflow(
            llm,
            FixedSearch {
                listings: vec![laptop()],
                fail: false,
            },
            ReportsConfig::default(),
        );
        let mut io = ScriptedIo::new(["quit"]);

        assert_eq!(wf.run("tablet", &mut io).await.unwrap(), WorkflowOutcome::Cancelled);
        assert!(!io.statuses.iter().any(|s| s.starts_with("Searching")));
    }

    #[tokio::test]
    async fn test_backend_error_is_downcastable() {
        let llm = Arc::new(MockLlmClient::new(vec![]));
        let mut wf = workflow(
            llm,
            FixedSearch {
                listings: vec![],
                fail: false,
            },
            ReportsConfig::default(),
        );

        let err = wf.run("tablet", &mut ScriptedIo::default()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NegotiationError>(),
            Some(NegotiationError::Backend(_))
        ));
    }

    #[test]
    fn test_explain_not_converged() {
        let message = explain_not_converged(&["budget".to_string(), "specifications_or_use_case".to_string()]);
        assert!(message.contains("Still missing: budget, specifications_or_use_case"));

        // Only the score fell short
        let message = explain_not_converged(&[]);
        assert!(message.contains("weren't specific enough"));
        assert!(!message.contains("Still missing"));
    }

    #[test]
    fn test_open_cache_disabled() {
        let mut config = Config::default();
        config.cache.enabled = false;
        assert!(!open_cache(&config).is_enabled());
    }
}
