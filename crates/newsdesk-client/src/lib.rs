//! Orchestration layer for the newsdesk client.
//!
//! Sits between a rendering front-end and the retrieval backend:
//!
//! - [`transport`]: HTTP calls and error normalization behind the [`Backend`] trait
//! - [`debounce`]: quiescence timer over keystrokes
//! - [`suggest`]: generation-guarded typeahead
//! - [`search`]: filter composition and latest-request-wins search
//! - [`session`]: session identity, liveness probe and chat turns
//! - [`policy`]: which failures surface and which are absorbed
//!
//! Each component publishes its state through a `tokio::sync::watch`
//! channel; front-ends subscribe and render snapshots.

pub mod debounce;
pub mod policy;
pub mod search;
pub mod session;
pub mod suggest;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use debounce::{Debouncer, SettledReceiver};
pub use policy::{Disposition, ErrorClass, ErrorPolicy, Operation};
pub use search::{
    compose_query, format_score, score_percent, SearchOrchestrator, SearchOutcome, SearchPhase,
    SearchState,
};
pub use session::{generate_session_id, SessionManager};
pub use suggest::{SuggestionFetcher, SuggestionState};
pub use transport::{Backend, HttpBackend};
