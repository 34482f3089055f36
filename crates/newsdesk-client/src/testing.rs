//! Scripted in-process backend for unit tests.
//!
//! Each endpoint answers from a per-query script with an optional delay, so
//! tests running on a paused clock can decide exactly which response lands
//! first.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use newsdesk_core::error::TransportError;
use newsdesk_core::types::{
    AutocompleteResponse, ChatRequest, ChatResponse, ClearSessionResponse, Document, HealthReport,
    HealthStatus, IndexStatus, SearchResults, SessionId,
};

use crate::transport::Backend;

type Scripted<T> = (Duration, Result<T, TransportError>);

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Autocomplete { query: String, top_k: usize },
    Search { query: String, top_k: usize },
    Chat(ChatRequest),
    ClearSession(SessionId),
    Health,
}

#[derive(Default)]
pub(crate) struct ScriptedBackend {
    autocomplete: Mutex<HashMap<String, Scripted<Vec<String>>>>,
    search: Mutex<HashMap<String, Scripted<SearchResults>>>,
    chat: Mutex<Option<Result<ChatResponse, TransportError>>>,
    clear: Mutex<Option<Result<ClearSessionResponse, TransportError>>>,
    health: Mutex<Option<Scripted<HealthReport>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn autocomplete(
        self,
        query: &str,
        delay: Duration,
        result: Result<Vec<String>, TransportError>,
    ) -> Self {
        self.autocomplete
            .lock()
            .unwrap()
            .insert(query.to_string(), (delay, result));
        self
    }

    pub(crate) fn search(
        self,
        query: &str,
        delay: Duration,
        result: Result<SearchResults, TransportError>,
    ) -> Self {
        self.search
            .lock()
            .unwrap()
            .insert(query.to_string(), (delay, result));
        self
    }

    pub(crate) fn chat(self, result: Result<ChatResponse, TransportError>) -> Self {
        *self.chat.lock().unwrap() = Some(result);
        self
    }

    pub(crate) fn clear(self, result: Result<ClearSessionResponse, TransportError>) -> Self {
        *self.clear.lock().unwrap() = Some(result);
        self
    }

    pub(crate) fn health(self, delay: Duration, result: Result<HealthReport, TransportError>) -> Self {
        *self.health.lock().unwrap() = Some((delay, result));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub(crate) fn healthy() -> HealthReport {
    HealthReport {
        status: HealthStatus::Healthy,
        elasticsearch: IndexStatus::Connected,
    }
}

pub(crate) fn results(query: &str, ids: &[&str]) -> SearchResults {
    SearchResults {
        query: query.to_string(),
        total: ids.len() as u64,
        documents: ids.iter().map(|id| document(id, 5.0)).collect(),
    }
}

pub(crate) fn document(id: &str, score: f64) -> Document {
    Document {
        id: id.to_string(),
        score,
        relevance_score: score / 10.0,
        title: format!("Title {id}"),
        content: format!("Body of {id}"),
        date: "1987-03-02".to_string(),
        dateline: "TOKYO, March 2".to_string(),
        authors: vec![],
        places: vec!["japan".to_string()],
        topics: vec!["crude".to_string()],
        people: vec![],
        orgs: vec![],
        companies: vec![],
        exchanges: vec![],
        temporal_expressions: vec![],
        georeferences: vec![],
        geopoints: vec![],
        geo_location: None,
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn autocomplete(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<AutocompleteResponse, TransportError> {
        self.record(Call::Autocomplete {
            query: query.to_string(),
            top_k,
        });
        let scripted = self.autocomplete.lock().unwrap().get(query).cloned();
        let (delay, result) =
            scripted.unwrap_or_else(|| (Duration::ZERO, Ok(vec![format!("{query} suggestion")])));
        tokio::time::sleep(delay).await;
        result.map(|results| AutocompleteResponse {
            query: query.to_string(),
            results,
        })
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<SearchResults, TransportError> {
        self.record(Call::Search {
            query: query.to_string(),
            top_k,
        });
        let scripted = self.search.lock().unwrap().get(query).cloned();
        let (delay, result) = scripted.unwrap_or_else(|| (Duration::ZERO, Ok(results(query, &[]))));
        tokio::time::sleep(delay).await;
        result
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        self.record(Call::Chat(request.clone()));
        let scripted = self.chat.lock().unwrap().clone();
        scripted.unwrap_or_else(|| {
            Ok(ChatResponse {
                answer: format!("answer to {}", request.query),
                session_id: request.session_id.clone(),
                query_rewritten: None,
                documents_used: vec![],
            })
        })
    }

    async fn clear_session(&self, id: &SessionId) -> Result<ClearSessionResponse, TransportError> {
        self.record(Call::ClearSession(id.clone()));
        let scripted = self.clear.lock().unwrap().clone();
        scripted.unwrap_or_else(|| {
            Ok(ClearSessionResponse {
                message: format!("Session {id} cleared"),
            })
        })
    }

    async fn health(&self) -> Result<HealthReport, TransportError> {
        self.record(Call::Health);
        let scripted = self.health.lock().unwrap().clone();
        let (delay, result) = scripted.unwrap_or((Duration::ZERO, Ok(healthy())));
        tokio::time::sleep(delay).await;
        result
    }
}
