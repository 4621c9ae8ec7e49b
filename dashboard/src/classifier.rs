//! Best-effort categorisation of architecture diagram nodes.
//!
//! Classification only decorates the plan view. Every failure path (no
//! credential, transport error, bad status, unparseable reply) resolves to
//! [`NodeCategory::Default`] for every label.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use iikit_parser::NodeCategory;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::config::ClassifierConfig;

/// Anthropic API version header.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Maps node labels to categories.
#[async_trait]
pub trait NodeClassifier: Send + Sync {
    async fn classify(&self, labels: &[String]) -> HashMap<String, NodeCategory>;
}

/// Every label gets `default`.
pub fn default_categories(labels: &[String]) -> HashMap<String, NodeCategory> {
    labels
        .iter()
        .map(|label| (label.clone(), NodeCategory::Default))
        .collect()
}

/// Classifier used when no model is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

#[async_trait]
impl NodeClassifier for DefaultClassifier {
    async fn classify(&self, labels: &[String]) -> HashMap<String, NodeCategory> {
        default_categories(labels)
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Classifier backed by the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicClassifier {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
}

impl AnthropicClassifier {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            max_tokens,
        }
    }

    /// `None` when disabled or when the credential variable is unset.
    pub fn from_config(config: &ClassifierConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let api_key = std::env::var(&config.api_key_env).ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        Some(Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            api_key,
            config.max_tokens,
        ))
    }

    fn prompt(labels: &[String]) -> String {
        let labels = serde_json::to_string(labels).unwrap_or_default();
        format!(
            "Classify each of these software architecture diagram component labels into exactly \
             one category: \"client\", \"server\", \"storage\", or \"external\".\n\n\
             Labels: {labels}\n\n\
             Respond with ONLY a JSON object mapping each label to its category. \
             Example: {{\"Browser\": \"client\", \"API Server\": \"server\"}}\n\
             No explanation, just the JSON."
        )
    }

    fn headers(&self) -> Option<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key).ok()?);
        Some(headers)
    }

    async fn request(&self, labels: &[String]) -> Result<String, String> {
        let headers = self.headers().ok_or("API key is not a valid header value")?;
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{"role": "user", "content": Self::prompt(labels)}],
        });
        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|err| err.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("classifier returned {status}"));
        }
        let parsed: MessagesResponse = response.json().await.map_err(|err| err.to_string())?;
        Ok(parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .unwrap_or_default())
    }
}

/// Pull the first `{ ... }` object out of a model reply and keep known categories.
pub fn parse_categories(reply: &str) -> HashMap<String, NodeCategory> {
    let (Some(start), Some(end)) = (reply.find('{'), reply.rfind('}')) else {
        return HashMap::new();
    };
    if end < start {
        return HashMap::new();
    }
    let Ok(raw) = serde_json::from_str::<HashMap<String, String>>(&reply[start..=end]) else {
        return HashMap::new();
    };
    raw.into_iter()
        .filter_map(|(label, name)| NodeCategory::parse(&name).map(|category| (label, category)))
        .collect()
}

#[async_trait]
impl NodeClassifier for AnthropicClassifier {
    async fn classify(&self, labels: &[String]) -> HashMap<String, NodeCategory> {
        let mut categories = default_categories(labels);
        if labels.is_empty() {
            return categories;
        }
        match self.request(labels).await {
            Ok(reply) => categories.extend(parse_categories(&reply)),
            Err(err) => tracing::warn!("diagram classification failed: {err}"),
        }
        categories
    }
}

/// Classifier selected by configuration.
pub fn from_config(config: &ClassifierConfig) -> Arc<dyn NodeClassifier> {
    match AnthropicClassifier::from_config(config) {
        Some(classifier) => Arc::new(classifier),
        None => {
            tracing::debug!("diagram classification disabled, using default categories");
            Arc::new(DefaultClassifier)
        }
    }
}

/// Memoized classifications keyed by feature and plan digest.
#[derive(Debug, Default)]
pub struct ClassificationCache {
    entries: Mutex<HashMap<(String, String), HashMap<String, NodeCategory>>>,
}

impl ClassificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hex SHA-256 of the plan text.
    pub fn digest(plan: &str) -> String {
        hex::encode(Sha256::digest(plan.as_bytes()))
    }

    pub fn get(&self, feature: &str, digest: &str) -> Option<HashMap<String, NodeCategory>> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(&(feature.to_string(), digest.to_string()))
            .cloned()
    }

    pub fn insert(&self, feature: &str, digest: &str, categories: HashMap<String, NodeCategory>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert((feature.to_string(), digest.to_string()), categories);
        }
    }

    /// Drop every entry recorded for `feature`.
    pub fn invalidate(&self, feature: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|(owner, _), _| owner != feature);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
