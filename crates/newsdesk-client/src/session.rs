//! Conversational session lifecycle and backend liveness.
//!
//! A [`SessionManager`] is the only writer of the session identifier and the
//! backend status. Everything else reads snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::distr::Alphanumeric;
use rand::Rng;
use tokio::sync::watch;

use newsdesk_core::config::{BackendConfig, ChatConfig};
use newsdesk_core::error::{NewsdeskError, Result, TransportError};
use newsdesk_core::types::{
    is_submittable, BackendStatus, ChatRequest, ChatTurn, ClearSessionResponse, Session, SessionId,
};

use crate::policy::{Disposition, ErrorClass, ErrorPolicy, Operation};
use crate::transport::Backend;

const SESSION_SUFFIX_LEN: usize = 12;

/// Generate a session identifier: `prefix` followed by random alphanumerics.
pub fn generate_session_id(prefix: &str) -> SessionId {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_SUFFIX_LEN)
        .map(char::from)
        .collect();
    SessionId::new(format!("{prefix}{suffix}"))
}

pub struct SessionManager {
    backend: Arc<dyn Backend>,
    policy: ErrorPolicy,
    prefix: String,
    health_timeout: Duration,
    /// Bumped by every `create_session`; a probe only resolves its own epoch.
    probe_epoch: AtomicU64,
    state: watch::Sender<Session>,
}

impl SessionManager {
    /// Build a manager holding a fresh, not yet probed session.
    pub fn new(backend: Arc<dyn Backend>, chat: &ChatConfig, backend_config: &BackendConfig) -> Self {
        let session = Session {
            id: generate_session_id(&chat.session_prefix),
            memory_enabled: chat.use_memory,
            backend_status: BackendStatus::Checking,
        };
        let (state, _) = watch::channel(session);
        Self {
            backend,
            policy: ErrorPolicy::default(),
            prefix: chat.session_prefix.clone(),
            health_timeout: backend_config.health_timeout(),
            probe_epoch: AtomicU64::new(0),
            state,
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn session_id(&self) -> SessionId {
        self.state.borrow().id.clone()
    }

    /// Start a new session: fresh id, status reset to `Checking`, then one
    /// liveness probe. Returns the status after the probe.
    ///
    /// A failed probe always leaves the status `Disconnected`; the failure is
    /// additionally returned as an error when the policy surfaces it.
    pub async fn create_session(&self) -> Result<BackendStatus> {
        let id = generate_session_id(&self.prefix);
        let epoch = self.probe_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|session| {
            session.id = id.clone();
            session.backend_status = BackendStatus::Checking;
        });
        tracing::info!(session_id = %id, "Session created");

        let outcome = self.probe().await;
        let status = match outcome {
            Ok(()) => BackendStatus::Connected,
            Err(_) => BackendStatus::Disconnected,
        };
        let applied = self.resolve_probe(epoch, status);
        let current = self.state.borrow().backend_status;

        match outcome {
            Err((class, err)) if applied => {
                match self.policy.disposition(Operation::HealthProbe, class) {
                    Disposition::Surface => Err(err),
                    Disposition::Absorb => {
                        tracing::warn!(session_id = %id, error = %err, "Backend unavailable");
                        Ok(current)
                    }
                }
            }
            _ => Ok(current),
        }
    }

    /// Rotate the identifier only. Status and any transcript are untouched.
    pub fn new_session(&self) -> SessionId {
        let id = generate_session_id(&self.prefix);
        self.state.send_modify(|session| session.id = id.clone());
        tracing::info!(session_id = %id, "Session identifier rotated");
        id
    }

    /// Drop the backend's conversational memory for `id`.
    ///
    /// `Ok(None)` means the call failed and the policy absorbed it.
    pub async fn clear_session(&self, id: &SessionId) -> Result<Option<ClearSessionResponse>> {
        match self.backend.clear_session(id).await {
            Ok(response) => {
                tracing::info!(session_id = %id, "Session memory cleared");
                Ok(Some(response))
            }
            Err(err) => self.absorb_or_surface(Operation::ClearSession, id, err),
        }
    }

    /// Send one conversational turn.
    ///
    /// `Ok(None)` means the call failed and the policy absorbed it.
    pub async fn send_turn(
        &self,
        query: &str,
        id: &SessionId,
        memory_enabled: bool,
    ) -> Result<Option<ChatTurn>> {
        if !is_submittable(query) {
            return Err(NewsdeskError::EmptyQuery);
        }

        let request = ChatRequest {
            query: query.to_string(),
            session_id: id.clone(),
            use_memory: Some(memory_enabled),
        };
        tracing::debug!(session_id = %id, memory = memory_enabled, "Chat turn issued");

        match self.backend.chat(&request).await {
            Ok(response) => Ok(Some(ChatTurn::from(response))),
            Err(err) => self.absorb_or_surface(Operation::Chat, id, err),
        }
    }

    /// Send a turn on the current session with its current memory flag.
    pub async fn ask(&self, query: &str) -> Result<Option<ChatTurn>> {
        let session = self.snapshot();
        self.send_turn(query, &session.id, session.memory_enabled)
            .await
    }

    pub fn set_memory_enabled(&self, enabled: bool) {
        self.state
            .send_modify(|session| session.memory_enabled = enabled);
        tracing::debug!(memory = enabled, "Conversation memory toggled");
    }

    fn absorb_or_surface<T>(
        &self,
        operation: Operation,
        id: &SessionId,
        err: TransportError,
    ) -> Result<Option<T>> {
        match self.policy.for_error(operation, &err) {
            Disposition::Surface => {
                tracing::warn!(session_id = %id, ?operation, error = %err, "Session call failed");
                Err(err.into())
            }
            Disposition::Absorb => {
                tracing::warn!(session_id = %id, ?operation, error = %err, "Session call failed; ignoring");
                Ok(None)
            }
        }
    }

    async fn probe(&self) -> std::result::Result<(), (ErrorClass, NewsdeskError)> {
        match tokio::time::timeout(self.health_timeout, self.backend.health()).await {
            Ok(Ok(report)) if report.is_healthy() => {
                tracing::info!(index = %report.elasticsearch, "Backend healthy");
                Ok(())
            }
            Ok(Ok(report)) => Err((
                ErrorClass::Degraded,
                NewsdeskError::Degraded {
                    index: report.elasticsearch.to_string(),
                },
            )),
            Ok(Err(err)) => Err((ErrorClass::from(&err), err.into())),
            Err(_) => {
                let err = TransportError::network(format!(
                    "health check timed out after {}s",
                    self.health_timeout.as_secs()
                ));
                Err((ErrorClass::Network, err.into()))
            }
        }
    }

    /// Apply a probe result if no newer session replaced the one it belongs to.
    fn resolve_probe(&self, epoch: u64, status: BackendStatus) -> bool {
        if self.probe_epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!(epoch, "Discarding probe result from a replaced session");
            return false;
        }
        let mut applied = false;
        self.state.send_modify(|session| {
            if session.backend_status.can_transition_to(&status) {
                tracing::debug!(from = %session.backend_status, to = %status, "Backend status transition");
                session.backend_status = status;
                applied = true;
            }
        });
        applied
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use newsdesk_core::types::{ChatResponse, HealthReport, HealthStatus, IndexStatus};

    use crate::testing::{healthy, Call, ScriptedBackend};

    fn manager(backend: &Arc<ScriptedBackend>) -> SessionManager {
        SessionManager::new(
            backend.clone(),
            &ChatConfig::default(),
            &BackendConfig::default(),
        )
    }

    // ---- Identifiers ----

    #[test]
    fn test_session_id_shape() {
        let id = generate_session_id("sess_");
        let s = id.as_str();
        assert!(s.starts_with("sess_"));
        assert_eq!(s.len(), "sess_".len() + SESSION_SUFFIX_LEN);
        assert!(s["sess_".len()..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_ten_thousand_ids_are_distinct() {
        let ids: HashSet<SessionId> = (0..10_000).map(|_| generate_session_id("sess_")).collect();
        assert_eq!(ids.len(), 10_000);
    }

    // ---- Probe ----

    #[tokio::test]
    async fn test_starts_checking_without_probe() {
        let backend = Arc::new(ScriptedBackend::new());
        let sessions = manager(&backend);

        assert_eq!(sessions.snapshot().backend_status, BackendStatus::Checking);
        assert!(sessions.snapshot().memory_enabled);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_healthy_probe_connects() {
        let backend = Arc::new(ScriptedBackend::new().health(Duration::ZERO, Ok(healthy())));
        let sessions = manager(&backend);
        let before = sessions.session_id();

        let status = sessions.create_session().await.unwrap();

        assert_eq!(status, BackendStatus::Connected);
        assert_ne!(sessions.session_id(), before);
        assert_eq!(backend.count(|c| matches!(c, Call::Health)), 1);
    }

    #[tokio::test]
    async fn test_probe_error_disconnects() {
        let backend = Arc::new(ScriptedBackend::new().health(
            Duration::ZERO,
            Err(TransportError::network("connection refused")),
        ));
        let sessions = manager(&backend);

        assert_eq!(
            sessions.create_session().await.unwrap(),
            BackendStatus::Disconnected
        );
    }

    #[tokio::test]
    async fn test_unhealthy_report_disconnects() {
        let report = HealthReport {
            status: HealthStatus::Unhealthy,
            elasticsearch: IndexStatus::Disconnected,
        };
        let backend = Arc::new(ScriptedBackend::new().health(Duration::ZERO, Ok(report)));
        let sessions = manager(&backend);

        assert_eq!(
            sessions.create_session().await.unwrap(),
            BackendStatus::Disconnected
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_disconnects() {
        let backend = Arc::new(
            ScriptedBackend::new().health(Duration::from_secs(60), Ok(healthy())),
        );
        let sessions = manager(&backend);

        let status = sessions.create_session().await.unwrap();

        assert_eq!(status, BackendStatus::Disconnected);
        assert_eq!(sessions.snapshot().backend_status, BackendStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_checking_while_probe_in_flight() {
        let backend = Arc::new(
            ScriptedBackend::new().health(Duration::from_millis(500), Ok(healthy())),
        );
        let sessions = manager(&backend);

        let observer = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            assert_eq!(sessions.snapshot().backend_status, BackendStatus::Checking);
        };
        let (status, _) = tokio::join!(sessions.create_session(), observer);

        assert_eq!(status.unwrap(), BackendStatus::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_during_probe_still_resolves() {
        let backend = Arc::new(
            ScriptedBackend::new().health(Duration::from_millis(500), Ok(healthy())),
        );
        let sessions = manager(&backend);

        let rotate = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            sessions.new_session()
        };
        let (status, rotated) = tokio::join!(sessions.create_session(), rotate);

        assert_eq!(status.unwrap(), BackendStatus::Connected);
        assert_eq!(sessions.session_id(), rotated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_probe_is_ignored() {
        let backend = Arc::new(
            ScriptedBackend::new().health(Duration::from_millis(500), Ok(healthy())),
        );
        let sessions = manager(&backend);

        let (first, second) = tokio::join!(sessions.create_session(), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            sessions.create_session().await
        });

        // The first probe resolves while the second is still Checking.
        assert_eq!(first.unwrap(), BackendStatus::Checking);
        assert_eq!(second.unwrap(), BackendStatus::Connected);
        assert_eq!(backend.count(|c| matches!(c, Call::Health)), 2);
    }

    // ---- Lifecycle ----

    #[tokio::test]
    async fn test_new_session_does_not_reprobe() {
        let backend = Arc::new(ScriptedBackend::new());
        let sessions = manager(&backend);
        sessions.create_session().await.unwrap();
        let before = sessions.snapshot();

        let id = sessions.new_session();

        let after = sessions.snapshot();
        assert_ne!(id, before.id);
        assert_eq!(after.id, id);
        assert_eq!(after.backend_status, BackendStatus::Connected);
        assert_eq!(backend.count(|c| matches!(c, Call::Health)), 1);
    }

    #[tokio::test]
    async fn test_clear_session_keeps_id_and_status() {
        let backend = Arc::new(ScriptedBackend::new());
        let sessions = manager(&backend);
        sessions.create_session().await.unwrap();
        let before = sessions.snapshot();

        let response = sessions.clear_session(&before.id).await.unwrap().unwrap();

        assert!(response.message.contains(before.id.as_str()));
        assert_eq!(sessions.snapshot(), before);
        assert!(backend.calls().contains(&Call::ClearSession(before.id.clone())));
    }

    #[tokio::test]
    async fn test_clear_session_error_propagates() {
        let backend = Arc::new(
            ScriptedBackend::new().clear(Err(TransportError::backend(404, Some("no such session".into())))),
        );
        let sessions = manager(&backend);
        let id = sessions.session_id();

        let err = sessions.clear_session(&id).await.unwrap_err();
        assert_eq!(err.to_string(), "no such session");
    }

    // ---- Turns ----

    #[tokio::test]
    async fn test_send_turn_carries_flags() {
        let backend = Arc::new(ScriptedBackend::new());
        let sessions = manager(&backend);
        let id = SessionId::new("sess_fixed");

        let turn = sessions
            .send_turn("what happened to oil?", &id, false)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(turn.answer, "answer to what happened to oil?");
        assert_eq!(
            backend.calls(),
            vec![Call::Chat(ChatRequest {
                query: "what happened to oil?".into(),
                session_id: id,
                use_memory: Some(false),
            })]
        );
    }

    #[tokio::test]
    async fn test_turn_collects_rewrite_and_documents() {
        let backend = Arc::new(ScriptedBackend::new().chat(Ok(ChatResponse {
            answer: "Prices rose.".into(),
            session_id: SessionId::new("sess_x"),
            query_rewritten: Some("oil prices in March 1987".into()),
            documents_used: vec!["d2".into(), "d1".into(), "d2".into()],
        })));
        let sessions = manager(&backend);

        let turn = sessions.ask("and in March?").await.unwrap().unwrap();

        assert_eq!(turn.rewritten_query.as_deref(), Some("oil prices in March 1987"));
        assert_eq!(turn.documents_used.len(), 2);
    }

    #[tokio::test]
    async fn test_ask_uses_current_memory_flag() {
        let backend = Arc::new(ScriptedBackend::new());
        let sessions = manager(&backend);
        sessions.set_memory_enabled(false);

        sessions.ask("hello").await.unwrap();

        match &backend.calls()[0] {
            Call::Chat(request) => {
                assert_eq!(request.use_memory, Some(false));
                assert_eq!(request.session_id, sessions.session_id());
            }
            other => panic!("expected chat call, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_memory_toggle_leaves_id_and_status() {
        let backend = Arc::new(ScriptedBackend::new());
        let sessions = manager(&backend);
        let before = sessions.snapshot();

        sessions.set_memory_enabled(false);

        let after = sessions.snapshot();
        assert!(!after.memory_enabled);
        assert_eq!(after.id, before.id);
        assert_eq!(after.backend_status, before.backend_status);
    }

    #[tokio::test]
    async fn test_empty_turn_rejected() {
        let backend = Arc::new(ScriptedBackend::new());
        let sessions = manager(&backend);

        let err = sessions.ask("  ").await.unwrap_err();
        assert!(matches!(err, NewsdeskError::EmptyQuery));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_chat_error_surfaces() {
        let backend = Arc::new(
            ScriptedBackend::new().chat(Err(TransportError::backend(500, None))),
        );
        let sessions = manager(&backend);

        let err = sessions.ask("hello").await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 500");
    }

    // ---- Error policy ----

    fn absorbing(operation: Operation, class: ErrorClass) -> ErrorPolicy {
        ErrorPolicy::default().with(operation, class, Disposition::Absorb)
    }

    fn surfacing(operation: Operation, class: ErrorClass) -> ErrorPolicy {
        ErrorPolicy::default().with(operation, class, Disposition::Surface)
    }

    #[tokio::test]
    async fn test_absorbed_chat_error_yields_no_turn() {
        let backend = Arc::new(
            ScriptedBackend::new().chat(Err(TransportError::network("connection reset"))),
        );
        let sessions =
            manager(&backend).with_policy(absorbing(Operation::Chat, ErrorClass::Network));

        let turn = sessions.ask("hi").await.unwrap();
        assert!(turn.is_none());
    }

    #[tokio::test]
    async fn test_chat_override_is_per_error_class() {
        let backend = Arc::new(
            ScriptedBackend::new().chat(Err(TransportError::backend(500, None))),
        );
        let sessions =
            manager(&backend).with_policy(absorbing(Operation::Chat, ErrorClass::Network));

        let err = sessions.ask("hi").await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 500");
    }

    #[tokio::test]
    async fn test_absorbed_clear_error_keeps_state() {
        let backend = Arc::new(
            ScriptedBackend::new().clear(Err(TransportError::backend(404, None))),
        );
        let sessions =
            manager(&backend).with_policy(absorbing(Operation::ClearSession, ErrorClass::Backend));
        let before = sessions.snapshot();

        let response = sessions.clear_session(&before.id).await.unwrap();

        assert!(response.is_none());
        assert_eq!(sessions.snapshot(), before);
    }

    #[tokio::test]
    async fn test_surfaced_health_error_still_disconnects() {
        let backend = Arc::new(ScriptedBackend::new().health(
            Duration::ZERO,
            Err(TransportError::network("connection refused")),
        ));
        let sessions =
            manager(&backend).with_policy(surfacing(Operation::HealthProbe, ErrorClass::Network));

        let err = sessions.create_session().await.unwrap_err();

        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(sessions.snapshot().backend_status, BackendStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_unhealthy_report_is_degraded_class() {
        let report = HealthReport {
            status: HealthStatus::Unhealthy,
            elasticsearch: IndexStatus::Disconnected,
        };
        let backend = Arc::new(ScriptedBackend::new().health(Duration::ZERO, Ok(report)));
        let sessions =
            manager(&backend).with_policy(surfacing(Operation::HealthProbe, ErrorClass::Degraded));

        let err = sessions.create_session().await.unwrap_err();

        assert!(matches!(err, NewsdeskError::Degraded { ref index } if index == "disconnected"));
        assert_eq!(sessions.snapshot().backend_status, BackendStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_degraded_override_leaves_network_absorbed() {
        let backend = Arc::new(ScriptedBackend::new().health(
            Duration::ZERO,
            Err(TransportError::network("connection refused")),
        ));
        let sessions =
            manager(&backend).with_policy(surfacing(Operation::HealthProbe, ErrorClass::Degraded));

        assert_eq!(
            sessions.create_session().await.unwrap(),
            BackendStatus::Disconnected
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_surfaced_health_timeout_is_network() {
        let backend = Arc::new(
            ScriptedBackend::new().health(Duration::from_secs(60), Ok(healthy())),
        );
        let sessions =
            manager(&backend).with_policy(surfacing(Operation::HealthProbe, ErrorClass::Network));

        let err = sessions.create_session().await.unwrap_err();

        assert!(err.to_string().contains("timed out"));
        assert_eq!(sessions.snapshot().backend_status, BackendStatus::Disconnected);
    }
}
