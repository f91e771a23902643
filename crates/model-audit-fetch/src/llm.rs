//! LLM classification collaborator
//!
//! Evaluators describe what they want as a [`Taxonomy`] of scored buckets;
//! the classifier picks one. The default implementation talks to any endpoint
//! that speaks the OpenAI chat completions protocol.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::client::{HttpClient, HttpConfig};
use crate::error::{ClassifyError, FetchResult};
use crate::rate_limit::{RateLimiter, LLM_KEY};
use crate::retry::RetryPolicy;

/// One labelled outcome of a classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub score: f64,
    pub description: String,
}

impl Bucket {
    pub fn new(label: impl Into<String>, score: f64, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            score,
            description: description.into(),
        }
    }
}

/// A closed set of buckets plus instructions for choosing between them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub name: String,
    pub instructions: String,
    pub buckets: Vec<Bucket>,
}

impl Taxonomy {
    /// Find a bucket by label, ignoring case and surrounding whitespace
    pub fn by_label(&self, label: &str) -> Option<&Bucket> {
        let label = label.trim();
        self.buckets
            .iter()
            .find(|b| b.label.eq_ignore_ascii_case(label))
    }

    /// The bucket whose score is closest to `score`
    pub fn nearest(&self, score: f64) -> Option<&Bucket> {
        self.buckets.iter().min_by(|a, b| {
            (a.score - score)
                .abs()
                .total_cmp(&(b.score - score).abs())
        })
    }

    /// System prompt describing the buckets and the reply format
    pub fn prompt(&self) -> String {
        let mut prompt = format!("{}\n\nChoose exactly one category:\n", self.instructions);
        for bucket in &self.buckets {
            prompt.push_str(&format!("- {}: {}\n", bucket.label, bucket.description));
        }
        prompt.push_str(
            "\nReply with a single JSON object and nothing else: \
             {\"bucket\": \"<category>\", \"confidence\": <number between 0 and 1>}",
        );
        prompt
    }
}

/// The classifier's verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub bucket: String,
    pub score: f64,
    pub confidence: f64,
}

/// Text classification collaborator
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Place `text` into one of the taxonomy's buckets
    async fn classify(
        &self,
        text: &str,
        taxonomy: &Taxonomy,
    ) -> Result<Classification, ClassifyError>;
}

/// Classifier used when no endpoint is configured; always fails so callers
/// take their heuristic path
#[derive(Debug, Clone, Default)]
pub struct UnavailableClassifier;

#[async_trait]
impl Classifier for UnavailableClassifier {
    async fn classify(
        &self,
        _text: &str,
        _taxonomy: &Taxonomy,
    ) -> Result<Classification, ClassifyError> {
        Err(ClassifyError::NotConfigured)
    }
}

/// LLM endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API, e.g. `https://api.openai.com/v1`.
    /// Classification is disabled when unset.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Input is truncated to this many characters
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_input_chars() -> usize {
    12_000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: default_model(),
            api_key: None,
            max_input_chars: default_max_input_chars(),
        }
    }
}

/// Build the configured classifier, or [`UnavailableClassifier`] when no
/// endpoint is set
pub fn build_classifier(
    config: &LlmConfig,
    http: &HttpConfig,
    limiter: RateLimiter,
    retry: RetryPolicy,
) -> FetchResult<Arc<dyn Classifier>> {
    match &config.base_url {
        Some(base_url) if !base_url.trim().is_empty() => Ok(Arc::new(HttpClassifier::new(
            base_url, config, http, limiter, retry,
        )?)),
        _ => Ok(Arc::new(UnavailableClassifier)),
    }
}

/// OpenAI-compatible chat completions classifier
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    http: HttpClient,
    model: String,
    max_input_chars: usize,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl HttpClassifier {
    /// Create a classifier against `base_url`
    pub fn new(
        base_url: &str,
        config: &LlmConfig,
        http: &HttpConfig,
        limiter: RateLimiter,
        retry: RetryPolicy,
    ) -> FetchResult<Self> {
        let client = HttpClient::new(base_url, http, limiter, LLM_KEY, retry, HeaderMap::new())?
            .with_token(config.api_key.clone());
        Ok(Self {
            http: client,
            model: config.model.clone(),
            max_input_chars: config.max_input_chars.max(1),
        })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    #[instrument(skip(self, text, taxonomy), fields(taxonomy = %taxonomy.name))]
    async fn classify(
        &self,
        text: &str,
        taxonomy: &Taxonomy,
    ) -> Result<Classification, ClassifyError> {
        if text.trim().is_empty() {
            return Err(ClassifyError::EmptyInput);
        }

        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": taxonomy.prompt()},
                {"role": "user", "content": truncate_chars(text, self.max_input_chars)},
            ],
        });

        let response: ChatResponse = self.http.post_json("/chat/completions", &body).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClassifyError::Unparsable("empty completion".to_string()))?;

        debug!(reply = %content, "Classifier reply");
        parse_reply(&content, taxonomy)
    }
}

/// Map a model reply onto the taxonomy
pub fn parse_reply(content: &str, taxonomy: &Taxonomy) -> Result<Classification, ClassifyError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let value: Value = match (start, end) {
        (Some(s), Some(e)) if s < e => serde_json::from_str(&content[s..=e])
            .map_err(|e| ClassifyError::Unparsable(e.to_string()))?,
        _ => return Err(ClassifyError::Unparsable(content.to_string())),
    };

    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    let bucket = value
        .get("bucket")
        .and_then(Value::as_str)
        .and_then(|label| taxonomy.by_label(label))
        .or_else(|| {
            value
                .get("score")
                .and_then(Value::as_f64)
                .filter(|s| s.is_finite())
                .and_then(|s| taxonomy.nearest(s))
        })
        .ok_or_else(|| ClassifyError::Unparsable(content.to_string()))?;

    Ok(Classification {
        bucket: bucket.label.clone(),
        score: bucket.score,
        confidence,
    })
}

/// Truncate to at most `max` characters on a char boundary
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn taxonomy() -> Taxonomy {
        Taxonomy {
            name: "test".into(),
            instructions: "Classify.".into(),
            buckets: vec![
                Bucket::new("none", 0.0, "nothing"),
                Bucket::new("vague", 0.5, "vague"),
                Bucket::new("named", 0.75, "named"),
                Bucket::new("concrete", 1.0, "concrete"),
            ],
        }
    }

    #[test]
    fn test_parse_reply_by_label() {
        let c = parse_reply(r#"{"bucket": "Named", "confidence": 0.9}"#, &taxonomy()).unwrap();
        assert_eq!(c.bucket, "named");
        assert_eq!(c.score, 0.75);
        assert_eq!(c.confidence, 0.9);
    }

    #[test]
    fn test_parse_reply_snaps_bare_score() {
        let c = parse_reply("Sure! {\"score\": 0.8}", &taxonomy()).unwrap();
        assert_eq!(c.bucket, "named");
        assert_eq!(c.confidence, 0.5);
    }

    #[test]
    fn test_parse_reply_rejects_garbage() {
        assert!(matches!(
            parse_reply("I cannot decide", &taxonomy()),
            Err(ClassifyError::Unparsable(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"bucket": "unknown"}"#, &taxonomy()),
            Err(ClassifyError::Unparsable(_))
        ));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[tokio::test]
    async fn test_unavailable_classifier_errors() {
        let result = UnavailableClassifier.classify("text", &taxonomy()).await;
        assert!(matches!(result, Err(ClassifyError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_http_classifier_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer key"))
            .and(body_partial_json(serde_json::json!({"model": "test-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"bucket\": \"concrete\", \"confidence\": 0.7}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = LlmConfig {
            base_url: Some(server.uri()),
            model: "test-model".into(),
            api_key: Some(SecretString::new("key".into())),
            ..Default::default()
        };
        let classifier = build_classifier(
            &config,
            &HttpConfig::default(),
            RateLimiter::unlimited(),
            RetryPolicy::no_retry(),
        )
        .unwrap();

        let c = classifier.classify("Accuracy 91.2% on GLUE", &taxonomy()).await.unwrap();
        assert_eq!(c.score, 1.0);
        assert_eq!(c.confidence, 0.7);
    }
}
