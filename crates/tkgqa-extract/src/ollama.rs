//! Local Ollama plumbing shared by the model-backed tagger and oracle.
//!
//! Host handling and JSON salvage are always compiled; the HTTP client and
//! [`OllamaTagger`] need the `llm-ollama` feature.

use anyhow::{anyhow, Result};
use serde::Deserialize;

pub const DEFAULT_OLLAMA_HOST: &str = "http://127.0.0.1:11434";
pub const TKGQA_OLLAMA_HOST_ENV: &str = "TKGQA_OLLAMA_HOST";
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";

/// `host:port` or a full URL, without trailing slashes. Blank input gives
/// [`DEFAULT_OLLAMA_HOST`].
pub fn normalize_ollama_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return DEFAULT_OLLAMA_HOST.to_string();
    }
    match host.split_once("://") {
        Some(("http" | "https", _)) => host.to_string(),
        _ => format!("http://{host}"),
    }
}

/// `TKGQA_OLLAMA_HOST`, then `OLLAMA_HOST`, then the loopback default.
pub fn default_ollama_host() -> String {
    let host = std::env::var(TKGQA_OLLAMA_HOST_ENV)
        .or_else(|_| std::env::var(OLLAMA_HOST_ENV))
        .unwrap_or_else(|_| DEFAULT_OLLAMA_HOST.to_string());
    normalize_ollama_host(&host)
}

/// Deserialize a model reply that should be a JSON object.
///
/// Chat models often add prose or code fences around the object, so when
/// the reply as a whole does not parse, the first complete `{...}` in it is
/// used.
pub fn parse_model_json<T: for<'de> Deserialize<'de>>(reply: &str) -> Result<T> {
    let reply = reply.trim();
    if let Ok(value) = serde_json::from_str(reply) {
        return Ok(value);
    }
    let object = first_json_object(reply)
        .ok_or_else(|| anyhow!("no complete JSON object in model reply"))?;
    serde_json::from_str(object).map_err(|e| anyhow!("malformed JSON object in model reply: {e}"))
}

/// Slice of the first brace-balanced object; braces inside string literals
/// do not count.
fn first_json_object(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let mut depth = 0usize;
    let mut quoted = false;
    let mut escaped = false;

    for (offset, c) in text[open..].char_indices() {
        if quoted {
            match (escaped, c) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => quoted = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => quoted = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open..=open + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(feature = "llm-ollama")]
pub use client::{ollama_chat_with_timeout, OllamaTagger};

#[cfg(feature = "llm-ollama")]
mod client {
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use serde::Deserialize;
    use serde_json::json;
    use tracing::{debug, warn};

    use super::{normalize_ollama_host, parse_model_json};
    use crate::tagger::{EntityTagger, SpanLabel, TaggedSpan};

    /// One non-streaming `/api/chat` round trip at temperature 0.
    pub fn ollama_chat_with_timeout(
        host: &str,
        model: &str,
        user: &str,
        system: Option<&str>,
        format: Option<serde_json::Value>,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let host = normalize_ollama_host(host);
        let url = format!("{host}/api/chat");

        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": user }));

        let mut body = json!({
            "model": model,
            "stream": false,
            "messages": messages,
            "options": { "temperature": 0 }
        });
        if let Some(format) = format {
            body["format"] = format;
        }

        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| anyhow!("failed to build http client: {e}"))?;

        let resp = client.post(&url).json(&body).send().map_err(|e| {
            anyhow!("ollama unreachable at {url}: {e} (start it with `ollama serve` or point TKGQA_OLLAMA_HOST elsewhere)")
        })?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            return Err(anyhow!("ollama http error {status}: {text}"));
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            message: ChatMessage,
        }

        #[derive(Deserialize)]
        struct ChatMessage {
            content: String,
        }

        let out: ChatResponse = resp
            .json()
            .map_err(|e| anyhow!("ollama returned invalid JSON: {e}"))?;
        Ok(out.message.content)
    }

    const TAGGER_SYSTEM_PROMPT: &str = "You are a named entity recognizer. \
Return only JSON of the form {\"entities\": [{\"text\": \"...\", \"label\": \"PERSON|GPE|ORG\"}]}. \
Copy entity text exactly as it appears in the input. Use GPE for countries, cities and regions.";

    #[derive(Debug, Deserialize)]
    struct TaggerResponse {
        #[serde(default)]
        entities: Vec<TaggerEntity>,
    }

    #[derive(Debug, Deserialize)]
    struct TaggerEntity {
        text: String,
        label: String,
    }

    /// Entity tagger backed by a local Ollama chat model.
    #[derive(Debug, Clone)]
    pub struct OllamaTagger {
        host: String,
        model: String,
        timeout: Option<Duration>,
    }

    impl OllamaTagger {
        pub fn new(host: &str, model: impl Into<String>) -> Self {
            Self {
                host: normalize_ollama_host(host),
                model: model.into(),
                timeout: None,
            }
        }

        pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
            self.timeout = timeout;
            self
        }

        fn try_tag(&self, text: &str) -> Result<Vec<TaggedSpan>> {
            let raw = ollama_chat_with_timeout(
                &self.host,
                &self.model,
                text,
                Some(TAGGER_SYSTEM_PROMPT),
                Some(json!("json")),
                self.timeout,
            )?;
            let parsed: TaggerResponse = parse_model_json(&raw)?;
            Ok(spans_in_text(parsed, text))
        }
    }

    /// Keep only spans that literally occur in the input.
    fn spans_in_text(parsed: TaggerResponse, text: &str) -> Vec<TaggedSpan> {
        parsed
            .entities
            .into_iter()
            .filter(|e| !e.text.trim().is_empty() && text.contains(e.text.trim()))
            .map(|e| TaggedSpan::new(e.text.trim(), SpanLabel::from_label(&e.label)))
            .collect()
    }

    impl EntityTagger for OllamaTagger {
        fn tag(&self, text: &str) -> Vec<TaggedSpan> {
            if text.trim().is_empty() {
                return Vec::new();
            }
            match self.try_tag(text) {
                Ok(spans) => {
                    debug!(spans = spans.len(), model = %self.model, "ollama tagger");
                    spans
                }
                Err(err) => {
                    warn!(error = %err, model = %self.model, "ollama tagger failed; no tagged spans");
                    Vec::new()
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn hallucinated_spans_are_dropped() {
            let parsed: TaggerResponse = serde_json::from_str(
                r#"{"entities": [
                    {"text": "Angela Merkel", "label": "PERSON"},
                    {"text": "Atlantis", "label": "GPE"},
                    {"text": " ", "label": "ORG"}
                ]}"#,
            )
            .unwrap();
            let spans = spans_in_text(parsed, "Did Angela Merkel visit Paris?");
            assert_eq!(spans, vec![TaggedSpan::new("Angela Merkel", SpanLabel::Person)]);
        }

        #[test]
        fn unreachable_host_degrades_to_empty() {
            let tagger = OllamaTagger::new("http://127.0.0.1:9", "none")
                .with_timeout(Some(Duration::from_millis(200)));
            assert!(tagger.tag("Who met Angela Merkel?").is_empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        entities: Vec<String>,
    }

    #[test]
    fn host_normalization() {
        assert_eq!(normalize_ollama_host(""), DEFAULT_OLLAMA_HOST);
        assert_eq!(normalize_ollama_host("localhost:11434/"), "http://localhost:11434");
        assert_eq!(normalize_ollama_host(" https://gpu.box/ "), "https://gpu.box");
    }

    #[test]
    fn parses_plain_json() {
        let p: Payload = parse_model_json(r#" {"entities": ["a"]} "#).unwrap();
        assert_eq!(p.entities, vec!["a"]);
    }

    #[test]
    fn salvages_object_wrapped_in_prose() {
        let p: Payload = parse_model_json(
            "Sure! ```json\n{\"entities\": [\"a } b\", \"c\"]}\n``` trailing {junk",
        )
        .unwrap();
        assert_eq!(p.entities, vec!["a } b", "c"]);
    }

    #[test]
    fn first_object_ignores_escaped_quotes() {
        assert_eq!(
            first_json_object(r#"x {"a": "q\"}"} {"b": 1}"#),
            Some(r#"{"a": "q\"}"}"#)
        );
        assert_eq!(first_json_object("{ {}"), None);
    }

    #[test]
    fn rejects_text_without_object() {
        assert!(parse_model_json::<Payload>("no json here").is_err());
        assert!(parse_model_json::<Payload>("{\"entities\": [").is_err());
    }
}
