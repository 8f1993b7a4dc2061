//! The requirement negotiation loop
//!
//! Alternates extraction and clarification until the requirement is ready,
//! the user cancels, or the round limit is hit. Every step is awaited in order.

use tracing::{debug, info, warn};

use super::state::{NegotiationError, NegotiationOutcome, NegotiationState, NotConvergedReason};
use crate::clarify::ClarificationSelector;
use crate::planner::{Decision, DecisionExtractor, DecisionStatus};
use crate::requirements::{READY_THRESHOLD, Requirement, merge};
use crate::terminal::UserIo;

/// Default clarification round limit
pub const DEFAULT_MAX_ROUNDS: usize = 5;

/// Answers that end the session
const CANCEL_KEYWORDS: &[&str] = &["quit", "exit", "cancel"];

/// Whether a raw answer asks to stop
pub fn is_cancel(answer: &str) -> bool {
    let answer = answer.trim();
    answer.is_empty() || CANCEL_KEYWORDS.iter().any(|k| answer.eq_ignore_ascii_case(k))
}

/// Drives negotiation sessions; each `run` starts from a clean slate
pub struct NegotiationLoop {
    extractor: DecisionExtractor,
    selector: ClarificationSelector,
    max_rounds: usize,
    state: NegotiationState,
    rounds: usize,
}

impl NegotiationLoop {
    pub fn new(extractor: DecisionExtractor, selector: ClarificationSelector) -> Self {
        Self {
            extractor,
            selector,
            max_rounds: DEFAULT_MAX_ROUNDS,
            state: NegotiationState::Init,
            rounds: 0,
        }
    }

    /// Override the clarification round limit (at least one round)
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Clarification rounds completed so far
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Questions asked in this session
    pub fn asked_questions(&self) -> &[String] {
        self.selector.asked()
    }

    fn transition(&mut self, next: NegotiationState) {
        debug!(from = %self.state, to = %next, round = self.rounds, "transition");
        self.state = next;
    }

    /// Run the session starting from the user's first message
    pub async fn run(
        &mut self,
        initial_input: &str,
        io: &mut dyn UserIo,
    ) -> Result<NegotiationOutcome, NegotiationError> {
        info!(input_len = initial_input.len(), max_rounds = self.max_rounds, "run: called");

        // Rounds and question history belong to a single session
        self.rounds = 0;
        self.state = NegotiationState::Init;
        self.selector.reset();

        self.transition(NegotiationState::AwaitingExtraction);
        io.status("Analyzing your requirements...");
        let mut decision = self.extractor.extract(initial_input, None).await?;
        let mut requirement = decision
            .requirements
            .clone()
            .unwrap_or_else(|| Requirement::from_raw_input(initial_input));

        let mut forced = false;
        while decision.status == DecisionStatus::NeedMoreInfo && self.rounds < self.max_rounds {
            self.transition(NegotiationState::NeedMoreInfo);
            self.rounds += 1;

            io.status(&format!("I need more details ({}/{})...", self.rounds, self.max_rounds));
            if !decision.missing_fields.is_empty() {
                io.status(&format!("Missing: {}", decision.missing_fields.join(", ")));
            }

            let question = self
                .selector
                .next_question(&requirement, &decision.missing_fields, &decision.suggested_questions)
                .await;
            let answer = io.ask(&question)?;

            if is_cancel(&answer) {
                info!(round = self.rounds, "run: cancelled by user");
                self.transition(NegotiationState::Cancelled);
                return Ok(NegotiationOutcome::Cancelled);
            }

            self.transition(NegotiationState::AwaitingExtraction);
            decision = self.extractor.extract(&answer, Some(&requirement)).await?;
            requirement = Self::fold(&requirement, &decision);
            debug!(score = %requirement.completeness_score, status = %decision.status, "run: merged");

            // Heuristic: trust the score once the user has answered twice
            if self.rounds >= 2
                && decision.status == DecisionStatus::NeedMoreInfo
                && requirement.completeness_score >= READY_THRESHOLD
            {
                info!(score = %requirement.completeness_score, "run: score high enough, forcing final check");
                forced = true;
                break;
            }
        }

        let exhausted = !forced && decision.status == DecisionStatus::NeedMoreInfo;
        self.final_gate(requirement, exhausted)
    }

    fn fold(requirement: &Requirement, decision: &Decision) -> Requirement {
        match &decision.requirements {
            Some(new) => merge(requirement, new),
            None => {
                debug!("fold: nothing extracted this round");
                requirement.clone()
            }
        }
    }

    fn final_gate(&mut self, requirement: Requirement, exhausted: bool) -> Result<NegotiationOutcome, NegotiationError> {
        if exhausted {
            warn!(rounds = self.rounds, "final_gate: round limit reached");
            self.transition(NegotiationState::Exhausted);
            return Ok(NegotiationOutcome::NotConverged {
                reason: NotConvergedReason::Exhausted,
                missing_fields: requirement.missing_fields(),
                requirement,
            });
        }

        if requirement.is_complete() {
            info!(rounds = self.rounds, "final_gate: requirements complete");
            self.transition(NegotiationState::Ready);
            return Ok(NegotiationOutcome::Ready(requirement));
        }

        warn!(rounds = self.rounds, missing = ?requirement.missing_fields(), "final_gate: incomplete");
        self.transition(NegotiationState::Exhausted);
        Ok(NegotiationOutcome::NotConverged {
            reason: NotConvergedReason::IncompleteAtGate,
            missing_fields: requirement.missing_fields(),
            requirement,
        })
    }
}
