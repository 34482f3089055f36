//! Search orchestration: filter composition, request lifecycle and the
//! latest-request-wins race guard.

use std::sync::Arc;

use tokio::sync::watch;

use newsdesk_core::config::SearchConfig;
use newsdesk_core::error::{NewsdeskError, Result};
use newsdesk_core::types::{is_submittable, FilterState, SearchResults};

use crate::policy::{Disposition, ErrorPolicy, Operation};
use crate::transport::Backend;

/// Fold structured filters into the query text.
///
/// Location comes first, then at most one date clause. `semantic_search`
/// does not contribute.
pub fn compose_query(query: &str, filters: &FilterState) -> String {
    let mut composed = query.to_string();

    if !filters.location.is_empty() {
        composed.push_str(" in ");
        composed.push_str(&filters.location);
    }

    match (filters.date_from.is_empty(), filters.date_to.is_empty()) {
        (false, false) => {
            composed.push_str(" from ");
            composed.push_str(&filters.date_from);
            composed.push_str(" to ");
            composed.push_str(&filters.date_to);
        }
        (false, true) => {
            composed.push_str(" after ");
            composed.push_str(&filters.date_from);
        }
        (true, false) => {
            composed.push_str(" before ");
            composed.push_str(&filters.date_to);
        }
        (true, true) => {}
    }

    composed
}

/// Display percentage for a raw backend score: `min(100, round(score * 10))`.
pub fn score_percent(score: f64) -> i64 {
    ((score * 10.0).round() as i64).min(100)
}

pub fn format_score(score: f64) -> String {
    score_percent(score).to_string()
}

/// Lifecycle of the visible search result.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SearchPhase {
    #[default]
    Idle,
    Loading,
    Success(SearchResults),
    Failed(String),
}

impl SearchPhase {
    pub fn is_loading(&self) -> bool {
        matches!(self, SearchPhase::Loading)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchState {
    pub phase: SearchPhase,
    /// Raw text of the latest submission, before filter composition.
    pub submitted_query: Option<String>,
    /// Text actually sent to the backend for the latest submission.
    pub composed_query: Option<String>,
    pub latest_generation: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SearchEvent {
    Issued {
        query: String,
        composed: String,
    },
    Arrived {
        generation: u64,
        results: SearchResults,
    },
    Failed {
        generation: u64,
        message: String,
        disposition: Disposition,
    },
}

impl SearchState {
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.latest_generation
    }

    pub fn apply(&self, event: &SearchEvent) -> SearchState {
        match event {
            SearchEvent::Issued { query, composed } => SearchState {
                phase: SearchPhase::Loading,
                submitted_query: Some(query.clone()),
                composed_query: Some(composed.clone()),
                latest_generation: self.latest_generation + 1,
            },
            SearchEvent::Arrived {
                generation,
                results,
            } => {
                if !self.is_current(*generation) {
                    return self.clone();
                }
                SearchState {
                    phase: SearchPhase::Success(results.clone()),
                    ..self.clone()
                }
            }
            SearchEvent::Failed {
                generation,
                message,
                disposition,
            } => {
                if !self.is_current(*generation) {
                    return self.clone();
                }
                let phase = match disposition {
                    Disposition::Surface => SearchPhase::Failed(message.clone()),
                    Disposition::Absorb => SearchPhase::Idle,
                };
                SearchState {
                    phase,
                    ..self.clone()
                }
            }
        }
    }
}

/// Whether a completed submission reached the visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Applied,
    /// A newer submission was issued before this one resolved.
    Superseded,
}

pub struct SearchOrchestrator {
    backend: Arc<dyn Backend>,
    policy: ErrorPolicy,
    top_k: usize,
    state: watch::Sender<SearchState>,
}

impl SearchOrchestrator {
    pub fn new(backend: Arc<dyn Backend>, config: &SearchConfig) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            backend,
            policy: ErrorPolicy::default(),
            top_k: config.top_k,
            state,
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Submit one search.
    ///
    /// Transport failures land in the state as `SearchPhase::Failed`; the
    /// returned error is reserved for submissions rejected up front.
    pub async fn submit(&self, query: &str, filters: FilterState) -> Result<SearchOutcome> {
        if !is_submittable(query) {
            return Err(NewsdeskError::EmptyQuery);
        }

        let composed = compose_query(query, &filters);
        let mut generation = 0;
        self.state.send_modify(|state| {
            *state = state.apply(&SearchEvent::Issued {
                query: query.to_string(),
                composed: composed.clone(),
            });
            generation = state.latest_generation;
        });
        tracing::debug!(generation, query = %composed, top_k = self.top_k, "Search issued");

        let event = match self.backend.search(&composed, self.top_k).await {
            Ok(results) => SearchEvent::Arrived {
                generation,
                results,
            },
            Err(err) => {
                let disposition = self.policy.for_error(Operation::Search, &err);
                tracing::warn!(generation, query = %composed, error = %err, "Search failed");
                SearchEvent::Failed {
                    generation,
                    message: err.message,
                    disposition,
                }
            }
        };

        let mut outcome = SearchOutcome::Superseded;
        self.state.send_modify(|state| {
            if state.is_current(generation) {
                *state = state.apply(&event);
                outcome = SearchOutcome::Applied;
            } else {
                tracing::debug!(
                    generation,
                    latest = state.latest_generation,
                    "Discarding stale search response"
                );
            }
        });
        Ok(outcome)
    }

    /// Query to seed a conversation continuing the latest search.
    pub fn chat_handoff(&self) -> Option<String> {
        self.state.borrow().submitted_query.clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
