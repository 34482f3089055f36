use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Query and filters
// =============================================================================

/// Returns whether `query` may be submitted (non-empty after trimming).
pub fn is_submittable(query: &str) -> bool {
    !query.trim().is_empty()
}

/// Structured search filters owned by the rendering layer.
///
/// Absent values are empty strings, never `None`, so composition only has
/// to test for emptiness. Dates are ISO `YYYY-MM-DD`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    #[serde(default)]
    pub date_from: String,
    #[serde(default)]
    pub date_to: String,
    #[serde(default)]
    pub location: String,
    /// Reserved for a future ranking-mode parameter. Carried but unused.
    #[serde(default = "default_semantic_search")]
    pub semantic_search: bool,
}

fn default_semantic_search() -> bool {
    true
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            date_from: String::new(),
            date_to: String::new(),
            location: String::new(),
            semantic_search: true,
        }
    }
}

impl FilterState {
    /// The state produced by "clear all filters".
    pub fn cleared() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_date_from(mut self, date: impl Into<String>) -> Self {
        self.date_from = date.into();
        self
    }

    pub fn with_date_to(mut self, date: impl Into<String>) -> Self {
        self.date_to = date.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.date_from.is_empty() && self.date_to.is_empty() && self.location.is_empty()
    }
}

// =============================================================================
// Wire types: requests
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutocompleteRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub session_id: SessionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_memory: Option<bool>,
}

// =============================================================================
// Wire types: responses
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutocompleteResponse {
    pub query: String,
    pub results: Vec<String>,
}

/// Latitude/longitude pair attached to a document.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// A retrieved news document, as returned by the backend.
///
/// Entity sequences keep the backend's order and are never deduplicated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Raw backend relevance score.
    pub score: f64,
    /// Backend-normalized relevance in `[0, 1]`.
    #[serde(rename = "relevanceScore", default)]
    pub relevance_score: f64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub dateline: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub places: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub orgs: Vec<String>,
    #[serde(default)]
    pub companies: Vec<String>,
    #[serde(default)]
    pub exchanges: Vec<String>,
    #[serde(rename = "temporalExpressions", default)]
    pub temporal_expressions: Vec<String>,
    #[serde(default)]
    pub georeferences: Vec<String>,
    #[serde(default)]
    pub geopoints: Vec<String>,
    #[serde(default)]
    pub geo_location: Option<GeoPoint>,
}

impl Document {
    pub fn relevance_tier(&self) -> RelevanceTier {
        RelevanceTier::from_relevance(self.relevance_score)
    }
}

/// Display bucket for a normalized relevance score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelevanceTier {
    High,
    Medium,
    Low,
}

impl RelevanceTier {
    pub fn from_relevance(relevance: f64) -> Self {
        if relevance >= 0.8 {
            RelevanceTier::High
        } else if relevance >= 0.5 {
            RelevanceTier::Medium
        } else {
            RelevanceTier::Low
        }
    }
}

impl fmt::Display for RelevanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelevanceTier::High => write!(f, "high"),
            RelevanceTier::Medium => write!(f, "medium"),
            RelevanceTier::Low => write!(f, "low"),
        }
    }
}

/// One full search response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub total: u64,
    pub documents: Vec<Document>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub session_id: SessionId,
    #[serde(default)]
    pub query_rewritten: Option<String>,
    #[serde(default)]
    pub documents_used: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearSessionResponse {
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    Connected,
    Disconnected,
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexStatus::Connected => write!(f, "connected"),
            IndexStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub elasticsearch: IndexStatus,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Error payload carried by non-2xx responses.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub detail: Option<String>,
}

// =============================================================================
// Conversation
// =============================================================================

/// Opaque conversational session identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One answered conversational turn.
///
/// Produced per request; the transcript is kept by whoever renders it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatTurn {
    pub answer: String,
    pub rewritten_query: Option<String>,
    pub documents_used: BTreeSet<String>,
}

impl From<ChatResponse> for ChatTurn {
    fn from(resp: ChatResponse) -> Self {
        Self {
            answer: resp.answer,
            rewritten_query: resp.query_rewritten.filter(|q| !q.is_empty()),
            documents_used: resp.documents_used.into_iter().collect(),
        }
    }
}

/// Liveness of the backend as seen by the conversational session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendStatus {
    /// Probe in flight. The only non-terminal state.
    Checking,
    Connected,
    Disconnected,
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendStatus::Checking => write!(f, "Checking"),
            BackendStatus::Connected => write!(f, "Connected"),
            BackendStatus::Disconnected => write!(f, "Disconnected"),
        }
    }
}

impl BackendStatus {
    /// Returns whether a transition from `self` to `target` is valid.
    ///
    /// A probe resolves `Checking` exactly once; only a fresh session puts
    /// the status back to `Checking`, which is a reset rather than a
    /// transition.
    pub fn can_transition_to(&self, target: &BackendStatus) -> bool {
        matches!(
            (self, target),
            (BackendStatus::Checking, BackendStatus::Connected)
                | (BackendStatus::Checking, BackendStatus::Disconnected)
        )
    }
}

/// Snapshot of the conversational session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub memory_enabled: bool,
    pub backend_status: BackendStatus,
}

// =============================================================================
// Tests
// =============================================================================
