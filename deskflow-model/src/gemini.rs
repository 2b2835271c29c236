//! Gemini provider over the `generativelanguage` REST API.

use async_trait::async_trait;
use deskflow_core::{
    Content, DeskError, FinishReason, Llm, LlmRequest, LlmResponse, LlmResponseStream, Part,
    ROLE_MODEL, Result,
};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Transport retries on top of a failed request.
const MAX_RETRIES: usize = 2;

pub struct GeminiModel {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }

    async fn post(&self, url: &str, body: &WireRequest) -> Result<reqwest::Response> {
        let mut attempt = 0;
        loop {
            let sent = self
                .http
                .post(url)
                .header("x-goog-api-key", &self.api_key)
                .json(body)
                .send()
                .await;

            match sent {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    let detail = response.text().await.unwrap_or_default();
                    return Err(DeskError::Model(format!("Gemini returned {status}: {detail}")));
                }
                Err(e) if attempt < MAX_RETRIES => {
                    attempt += 1;
                    warn!(attempt, error = %e, "Gemini request failed, retrying");
                    tokio::time::sleep(std::time::Duration::from_millis(200 * attempt as u64))
                        .await;
                }
                Err(e) => return Err(DeskError::Model(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl Llm for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, req: LlmRequest, stream: bool) -> Result<LlmResponseStream> {
        let body = WireRequest::from_request(&req);

        if stream {
            let url = format!("{}?alt=sse", self.url("streamGenerateContent"));
            let response = self.post(&url, &body).await?;
            let mut events = response.bytes_stream().eventsource();

            let mapped = async_stream::stream! {
                while let Some(event) = events.next().await {
                    match event {
                        Ok(event) => {
                            match serde_json::from_str::<WireResponse>(&event.data) {
                                Ok(wire) => yield Ok(wire.into_chunk()),
                                Err(e) => {
                                    yield Err(DeskError::Model(format!(
                                        "bad stream payload: {e}"
                                    )));
                                    return;
                                }
                            }
                        }
                        Err(e) => {
                            yield Err(DeskError::Model(e.to_string()));
                            return;
                        }
                    }
                }
            };
            Ok(Box::pin(mapped))
        } else {
            let response = self.post(&self.url("generateContent"), &body).await?;
            let wire: WireResponse =
                response.json().await.map_err(|e| DeskError::Model(e.to_string()))?;
            debug!(model = %self.model, "Gemini unary response received");

            let mut single = wire.into_chunk();
            single.partial = false;
            single.turn_complete = true;
            Ok(Box::pin(futures::stream::iter([Ok(single)])))
        }
    }
}

// ---- wire schema -----------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireToolGroup>,
}

#[derive(Serialize, Deserialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum WirePart {
    #[serde(rename = "text")]
    Text(String),
    FunctionCall {
        name: String,
        #[serde(default)]
        args: Value,
    },
    FunctionResponse {
        name: String,
        response: Value,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireToolGroup {
    function_declarations: Vec<Value>,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: Option<WireContent>,
    finish_reason: Option<String>,
}

impl WireRequest {
    fn from_request(req: &LlmRequest) -> Self {
        let contents = req.contents.iter().map(WireContent::from_content).collect();

        let system_instruction = req.system_instruction.as_ref().map(|text| WireContent {
            role: None,
            parts: vec![WirePart::Text(text.clone())],
        });

        let generation_config = req.config.as_ref().map(|c| WireGenerationConfig {
            temperature: c.temperature,
            top_p: c.top_p,
            top_k: c.top_k,
            max_output_tokens: c.max_output_tokens,
            response_mime_type: c.response_schema.as_ref().map(|_| "application/json".to_string()),
            response_schema: c.response_schema.clone(),
        });

        let tools = if req.tools.is_empty() {
            Vec::new()
        } else {
            vec![WireToolGroup { function_declarations: req.tools.clone() }]
        };

        Self { contents, system_instruction, generation_config, tools }
    }
}

impl WireContent {
    fn from_content(content: &Content) -> Self {
        // Function responses ride in a user turn on the wire.
        let role = match content.role.as_str() {
            "model" => "model",
            _ => "user",
        };
        let parts = content
            .parts
            .iter()
            .map(|p| match p {
                Part::Text { text } => WirePart::Text(text.clone()),
                Part::FunctionCall { name, args } => {
                    WirePart::FunctionCall { name: name.clone(), args: args.clone() }
                }
                Part::FunctionResponse { name, response } => {
                    WirePart::FunctionResponse { name: name.clone(), response: response.clone() }
                }
            })
            .collect();
        Self { role: Some(role.to_string()), parts }
    }

    fn into_content(self) -> Content {
        let mut content = Content::new(ROLE_MODEL);
        for part in self.parts {
            match part {
                WirePart::Text(text) => content.parts.push(Part::Text { text }),
                WirePart::FunctionCall { name, args } => {
                    content.parts.push(Part::FunctionCall { name, args });
                }
                WirePart::FunctionResponse { name, response } => {
                    content.parts.push(Part::FunctionResponse { name, response });
                }
            }
        }
        content
    }
}

impl WireResponse {
    fn into_chunk(self) -> LlmResponse {
        let mut candidates = self.candidates;
        if candidates.is_empty() {
            return LlmResponse { partial: true, ..Default::default() };
        }
        let candidate = candidates.remove(0);

        let finish_reason = candidate.finish_reason.as_deref().map(|r| match r {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            _ => FinishReason::Other,
        });

        LlmResponse {
            content: candidate.content.map(WireContent::into_content),
            turn_complete: finish_reason.is_some(),
            partial: true,
            finish_reason,
        }
    }
}
