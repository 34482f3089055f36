//! Plain-text rendering of client state for the terminal.

use std::fmt::Write as _;

use newsdesk_client::{format_score, SearchPhase};
use newsdesk_core::types::{BackendStatus, ChatTurn, Document, SearchResults, Session};

/// Content longer than this is cut with a "show more" marker.
pub const EXCERPT_CHARS: usize = 300;

/// Cut `content` to [`EXCERPT_CHARS`] characters. Returns whether it was cut.
pub fn excerpt(content: &str) -> (String, bool) {
    match content.char_indices().nth(EXCERPT_CHARS) {
        Some((idx, _)) => (format!("{}...", &content[..idx]), true),
        None => (content.to_string(), false),
    }
}

fn tag_line(label: &str, values: &[String], limit: usize) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    let shown: Vec<&str> = values.iter().take(limit).map(String::as_str).collect();
    Some(format!("{label}: {}", shown.join(", ")))
}

pub fn document(index: usize, doc: &Document) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}. {}  [{}% | {} relevance]",
        index + 1,
        doc.title,
        format_score(doc.score),
        doc.relevance_tier()
    );

    let mut meta = Vec::new();
    if !doc.date.is_empty() {
        meta.push(doc.date.as_str());
    }
    if !doc.dateline.is_empty() {
        meta.push(doc.dateline.as_str());
    }
    if !meta.is_empty() {
        let _ = writeln!(out, "   {}", meta.join(" | "));
    }

    let (text, truncated) = excerpt(&doc.content);
    let _ = writeln!(out, "   {text}");
    if truncated {
        let _ = writeln!(out, "   (show more: {} characters)", doc.content.chars().count());
    }

    let tags = [
        tag_line("Places", &doc.places, 3),
        tag_line("When", &doc.temporal_expressions, 2),
        tag_line("Topics", &doc.topics, 2),
        tag_line("Orgs", &doc.orgs, 2),
        tag_line("People", &doc.people, 2),
    ];
    for tag in tags.into_iter().flatten() {
        let _ = writeln!(out, "   {tag}");
    }
    out
}

pub fn search_results(query: &str, results: &SearchResults) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Found {} documents for \"{}\"", results.total, query);
    if results.documents.is_empty() {
        let _ = writeln!(out, "No results found. Try a different query or adjust the filters.");
        return out;
    }
    for (i, doc) in results.documents.iter().enumerate() {
        let _ = writeln!(out);
        out.push_str(&document(i, doc));
    }
    out
}

pub fn search_error(message: &str) -> String {
    format!("Search Error\n  {message}\n")
}

/// Hint for continuing a search as a conversation.
pub fn chat_handoff(query: &str) -> String {
    format!("Continue in chat: newsdesk chat --query \"{}\"", query.replace('"', "\\\""))
}

/// Stdout and stderr text for a finished search.
///
/// The chat handoff follows results only; a failed search has nothing to hand off.
pub fn search_outcome(query: &str, phase: &SearchPhase, handoff: Option<&str>) -> (String, String) {
    match phase {
        SearchPhase::Success(results) => {
            let mut out = search_results(query, results);
            if let Some(handoff) = handoff {
                let _ = write!(out, "\n{}\n", chat_handoff(handoff));
            }
            (out, String::new())
        }
        SearchPhase::Failed(message) => (String::new(), search_error(message)),
        SearchPhase::Idle | SearchPhase::Loading => (String::new(), String::new()),
    }
}

pub fn backend_status(status: BackendStatus) -> String {
    match status {
        BackendStatus::Checking => "Backend: checking...".to_string(),
        BackendStatus::Connected => "Backend: connected".to_string(),
        BackendStatus::Disconnected => {
            "Backend: disconnected (is the retrieval service running?)".to_string()
        }
    }
}

pub fn session(session: &Session) -> String {
    format!(
        "Session {}  memory {}  {}",
        session.id,
        if session.memory_enabled { "on" } else { "off" },
        backend_status(session.backend_status)
    )
}

pub fn turn(turn: &ChatTurn) -> String {
    let mut out = String::new();
    if let Some(rewritten) = &turn.rewritten_query {
        let _ = writeln!(out, "(searched for: {rewritten})");
    }
    let _ = writeln!(out, "{}", turn.answer);
    if !turn.documents_used.is_empty() {
        let docs: Vec<&str> = turn.documents_used.iter().map(String::as_str).collect();
        let _ = writeln!(out, "Sources: {}", docs.join(", "));
    }
    out
}

pub fn suggestions(text: &str, suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        return format!("No suggestions for \"{text}\"\n");
    }
    let mut out = String::new();
    for s in suggestions {
        let _ = writeln!(out, "  {s}");
    }
    out
}
