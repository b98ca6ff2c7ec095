//! Pulls the answer text, citations and generated images out of upstream
//! response bodies. Nothing here fails: each field is read on its own, so a
//! missing or oddly typed field only loses that field, and an answer with no
//! usable text falls back to a fixed message.

use crate::client::Source;
use crate::upstream::error_message;
use serde_json::Value;
use std::collections::HashSet;

pub const MALFORMED_RESPONSE_MESSAGE: &str = "Sorry, I received an empty or malformed response.";

/// Where a candidate may carry citations, in order of preference.
const ATTRIBUTION_POINTERS: [&str; 3] = [
    "/groundingMetadata/groundingAttributions",
    "/groundingAttributions",
    "/groundingMetadata/groundingChunks",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    /// Text from the first candidate.
    Generated,
    /// No candidate text, but the body carried `error.message`.
    UpstreamError,
    /// Neither; the text is [`MALFORMED_RESPONSE_MESSAGE`].
    Malformed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAnswer {
    pub text: String,
    pub sources: Vec<Source>,
    pub kind: AnswerKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    /// Base64 as delivered by upstream.
    pub data: String,
}

pub fn normalize_answer(body: &Value) -> NormalizedAnswer {
    let candidate = body.pointer("/candidates/0");
    let sources = candidate.map(extract_sources).unwrap_or_default();

    if let Some(text) = candidate.and_then(first_text) {
        return NormalizedAnswer {
            text: text.to_string(),
            sources,
            kind: AnswerKind::Generated,
        };
    }

    match error_message(body) {
        Some(message) => NormalizedAnswer {
            text: message.to_string(),
            sources,
            kind: AnswerKind::UpstreamError,
        },
        None => NormalizedAnswer {
            text: MALFORMED_RESPONSE_MESSAGE.to_string(),
            sources,
            kind: AnswerKind::Malformed,
        },
    }
}

fn candidate_parts(candidate: &Value) -> impl Iterator<Item = &Value> {
    candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// First part of the candidate content whose `text` is a string.
fn first_text(candidate: &Value) -> Option<&str> {
    candidate_parts(candidate).find_map(|part| part.get("text").and_then(Value::as_str))
}

/// Citations of a candidate: every attribution with a non-empty `web.uri`
/// across all known placements, deduplicated by uri, first occurrence wins.
pub fn extract_sources(candidate: &Value) -> Vec<Source> {
    let attributions = ATTRIBUTION_POINTERS
        .iter()
        .filter_map(|pointer| candidate.pointer(pointer).and_then(Value::as_array))
        .flatten();

    dedup_sources(attributions.filter_map(attribution_source))
}

fn attribution_source(attribution: &Value) -> Option<Source> {
    let web = attribution.get("web")?;
    let uri = web
        .get("uri")
        .and_then(Value::as_str)
        .filter(|uri| !uri.is_empty())?;
    Some(Source {
        uri: uri.to_string(),
        title: web.get("title").and_then(Value::as_str).map(str::to_string),
    })
}

pub fn dedup_sources(sources: impl IntoIterator<Item = Source>) -> Vec<Source> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|source| !source.uri.is_empty())
        .filter(|source| seen.insert(source.uri.clone()))
        .collect()
}

/// First inline media part of the first candidate that carries data.
pub fn extract_image(body: &Value) -> Option<GeneratedImage> {
    let candidate = body.pointer("/candidates/0")?;
    candidate_parts(candidate)
        .filter_map(|part| part.get("inlineData"))
        .find_map(|inline| {
            let data = inline
                .get("data")
                .and_then(Value::as_str)
                .filter(|data| !data.is_empty())?;
            let mime_type = inline
                .get("mimeType")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some(GeneratedImage {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            })
        })
}
