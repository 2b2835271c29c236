//! Vector index access.

use async_trait::async_trait;
use deskflow_core::{DeskError, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDoc {
    pub text: String,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedDoc>>;
}

/// Pinecone records search over an index host with integrated embedding:
/// `POST {host}/records/namespaces/{namespace}/search`.
pub struct PineconeIndex {
    http: reqwest::Client,
    api_key: String,
    host: String,
    namespace: String,
    /// Hit field holding the text to hand to generation.
    answer_field: String,
}

impl PineconeIndex {
    pub fn new(
        api_key: impl Into<String>,
        host: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        let host = host.into();
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            host: host.trim_end_matches('/').to_string(),
            namespace: namespace.into(),
            answer_field: "text_answer".to_string(),
        }
    }

    pub fn with_answer_field(mut self, field: impl Into<String>) -> Self {
        self.answer_field = field.into();
        self
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    result: SearchResult,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(default)]
    fields: Value,
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedDoc>> {
        let url = format!("{}/records/namespaces/{}/search", self.host, self.namespace);
        let body = json!({
            "query": {
                "inputs": { "text": query },
                "top_k": top_k,
            },
            "fields": [self.answer_field],
        });

        let response = self
            .http
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", "2025-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| DeskError::Retrieval(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DeskError::Retrieval(format!("Pinecone returned {status}: {detail}")));
        }

        let parsed: SearchResponse =
            response.json().await.map_err(|e| DeskError::Retrieval(e.to_string()))?;

        let docs: Vec<RetrievedDoc> = parsed
            .result
            .hits
            .into_iter()
            .filter_map(|hit| {
                hit.fields
                    .get(&self.answer_field)
                    .and_then(Value::as_str)
                    .map(|text| RetrievedDoc { text: text.to_string() })
            })
            .collect();

        debug!(query, hits = docs.len(), "vector search complete");
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_parsing() {
        let parsed: SearchResponse = serde_json::from_value(json!({
            "result": {
                "hits": [
                    {"_id": "a", "_score": 0.9, "fields": {"text_answer": "Reset the router."}},
                    {"_id": "b", "_score": 0.4, "fields": {"other": "ignored"}}
                ]
            }
        }))
        .unwrap();

        let docs: Vec<_> = parsed
            .result
            .hits
            .into_iter()
            .filter_map(|h| {
                h.fields.get("text_answer").and_then(Value::as_str).map(str::to_string)
            })
            .collect();
        assert_eq!(docs, vec!["Reset the router.".to_string()]);
    }

    #[test]
    fn test_host_trailing_slash_trimmed() {
        let index = PineconeIndex::new("k", "https://idx.pinecone.io/", "kb");
        assert_eq!(index.host, "https://idx.pinecone.io");
    }
}
