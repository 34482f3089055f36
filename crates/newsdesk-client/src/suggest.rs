//! Typeahead suggestions keyed to debounced input.
//!
//! Every request is tagged with a generation number at issue time. A
//! response (or failure) only touches the visible state when its generation
//! is still the latest one issued; anything older is dropped silently.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use newsdesk_core::config::SuggestConfig;
use newsdesk_core::error::TransportError;

use crate::debounce::SettledReceiver;
use crate::policy::{Disposition, ErrorPolicy, Operation};
use crate::transport::Backend;

/// What the rendering layer sees of the suggestion box.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SuggestionState {
    /// Latest applied suggestion list, replaced wholesale on each success.
    pub suggestions: Vec<String>,
    /// True exactly while the latest-generation request is outstanding.
    pub loading: bool,
    /// Whether the suggestion box should be shown.
    pub visible: bool,
    /// Only populated when the policy surfaces suggestion failures.
    pub error: Option<String>,
    /// Highest generation issued so far.
    pub latest_generation: u64,
}

/// Inputs to the suggestion state machine.
#[derive(Clone, Debug, PartialEq)]
pub enum SuggestionEvent {
    /// A request was issued; it takes the next generation number.
    Issued,
    /// Input fell below the threshold or the box was dismissed.
    Cleared,
    Arrived {
        generation: u64,
        results: Vec<String>,
    },
    Failed {
        generation: u64,
        message: String,
        disposition: Disposition,
    },
}

impl SuggestionState {
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.latest_generation
    }

    /// Pure transition function.
    ///
    /// `Cleared` also advances the generation so a request still in flight
    /// cannot repopulate a box the user has already emptied.
    pub fn apply(&self, event: &SuggestionEvent) -> SuggestionState {
        match event {
            SuggestionEvent::Issued => SuggestionState {
                suggestions: self.suggestions.clone(),
                loading: true,
                visible: true,
                error: None,
                latest_generation: self.latest_generation + 1,
            },
            SuggestionEvent::Cleared => SuggestionState {
                latest_generation: self.latest_generation + 1,
                ..SuggestionState::default()
            },
            SuggestionEvent::Arrived {
                generation,
                results,
            } => {
                if !self.is_current(*generation) {
                    return self.clone();
                }
                SuggestionState {
                    suggestions: results.clone(),
                    loading: false,
                    visible: self.visible,
                    error: None,
                    latest_generation: self.latest_generation,
                }
            }
            SuggestionEvent::Failed {
                generation,
                message,
                disposition,
            } => {
                if !self.is_current(*generation) {
                    return self.clone();
                }
                SuggestionState {
                    suggestions: Vec::new(),
                    loading: false,
                    visible: self.visible,
                    error: match disposition {
                        Disposition::Surface => Some(message.clone()),
                        Disposition::Absorb => None,
                    },
                    latest_generation: self.latest_generation,
                }
            }
        }
    }
}

/// Issues autocomplete requests for settled input and publishes the result.
pub struct SuggestionFetcher {
    backend: Arc<dyn Backend>,
    policy: ErrorPolicy,
    min_chars: usize,
    top_k: usize,
    state: watch::Sender<SuggestionState>,
}

impl SuggestionFetcher {
    pub fn new(backend: Arc<dyn Backend>, config: &SuggestConfig) -> Self {
        let (state, _) = watch::channel(SuggestionState::default());
        Self {
            backend,
            policy: ErrorPolicy::default(),
            min_chars: config.min_chars,
            top_k: config.top_k,
            state,
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SuggestionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SuggestionState {
        self.state.borrow().clone()
    }

    /// React to one settled input value.
    ///
    /// Below the threshold the list is cleared and no request is made.
    pub async fn on_settled(&self, text: &str) {
        if text.chars().count() < self.min_chars {
            self.dismiss();
            return;
        }

        let generation = self.issue();
        tracing::debug!(generation, query = text, "Autocomplete request issued");

        let event = match self.backend.autocomplete(text, self.top_k).await {
            Ok(response) => SuggestionEvent::Arrived {
                generation,
                results: response.results,
            },
            Err(err) => self.failure(generation, text, err),
        };
        self.settle(generation, event);
    }

    /// Hide and empty the suggestion box (suggestion chosen, input cleared).
    pub fn dismiss(&self) {
        self.state
            .send_modify(|state| *state = state.apply(&SuggestionEvent::Cleared));
    }

    /// Feed every settled value from a debouncer into this fetcher.
    ///
    /// Each value is handled on its own task so a slow lookup never delays
    /// the next one; ordering is restored by generation numbers.
    pub fn spawn_driver(self: Arc<Self>, mut settled: SettledReceiver<String>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(text) = settled.recv().await {
                let fetcher = Arc::clone(&self);
                tokio::spawn(async move { fetcher.on_settled(&text).await });
            }
        })
    }

    fn issue(&self) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|state| {
            *state = state.apply(&SuggestionEvent::Issued);
            generation = state.latest_generation;
        });
        generation
    }

    fn failure(&self, generation: u64, text: &str, err: TransportError) -> SuggestionEvent {
        let disposition = self.policy.for_error(Operation::Suggest, &err);
        if disposition == Disposition::Absorb {
            tracing::warn!(generation, query = text, error = %err, "Autocomplete failed; clearing suggestions");
        }
        SuggestionEvent::Failed {
            generation,
            message: err.message,
            disposition,
        }
    }

    fn settle(&self, generation: u64, event: SuggestionEvent) {
        self.state.send_modify(|state| {
            if state.is_current(generation) {
                *state = state.apply(&event);
            } else {
                tracing::debug!(
                    generation,
                    latest = state.latest_generation,
                    "Discarding stale autocomplete response"
                );
            }
        });
    }
}

// =============================================================================
// Tests
// =============================================================================
