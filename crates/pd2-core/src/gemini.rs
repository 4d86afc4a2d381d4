use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::error::ChatError;
use crate::provider::{Generator, ProviderError, Reply};
use crate::transcript::{Role, Turn};

/// Request body for `models.generateContent` (v1beta).
#[derive(Debug, Serialize, PartialEq, Eq)]
struct GenerateContentRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: RequestContent,
    contents: Vec<RequestContent>,
    tools: Vec<WireTool>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct RequestContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<RequestPart>,
}

impl RequestContent {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(String::from),
            parts: vec![RequestPart { text: text.into() }],
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct RequestPart {
    text: String,
}

/// Server-side tool descriptor. Each enabled tool serializes to an object
/// with a single empty-object field, e.g. `{"google_search": {}}`.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct WireTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    google_search: Option<EmptyObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url_context: Option<EmptyObject>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct EmptyObject {}

/// The fixed tool configuration: web search plus URL-context retrieval.
fn tool_config() -> Vec<WireTool> {
    vec![
        WireTool {
            google_search: Some(EmptyObject {}),
            url_context: None,
        },
        WireTool {
            google_search: None,
            url_context: Some(EmptyObject {}),
        },
    ]
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    url_context_metadata: Option<UrlContextMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UrlContextMetadata {
    #[serde(default)]
    url_metadata: Vec<UrlMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UrlMetadata {
    retrieved_url: Option<String>,
}

/// Gemini implementation of [`Generator`].
///
/// The system instruction and tool configuration are fixed at construction;
/// each call sends the full transcript and blocks until the service replies.
/// No retries: a failure surfaces immediately for the current turn.
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
    system_instruction: String,
}

impl GeminiClient {
    pub fn new(
        provider: &ProviderConfig,
        api_key: String,
        system_instruction: String,
    ) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(provider.timeout_secs))
            .user_agent("pd2-chat/0.1")
            .build()?;
        Ok(Self {
            http,
            api_base: provider.api_base.trim_end_matches('/').to_string(),
            model: provider.model.clone(),
            api_key,
            system_instruction,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }

    fn build_request(&self, turns: &[Turn]) -> GenerateContentRequest {
        let contents = turns
            .iter()
            .map(|turn| {
                // The wire format calls the assistant role "model".
                let role = match turn.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                RequestContent::text(Some(role), &turn.content)
            })
            .collect();

        GenerateContentRequest {
            system_instruction: RequestContent::text(None, &self.system_instruction),
            contents,
            tools: tool_config(),
        }
    }
}

/// Classify a transport-level error for user-facing reporting.
fn classify_transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() || err.is_connect() {
        ProviderError::Transient(err.to_string())
    } else {
        ProviderError::Permanent(err.to_string())
    }
}

/// Classify a non-success HTTP status: rate limits and server errors are
/// transient, the rest (auth, bad request) permanent.
fn classify_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let detail = body.chars().take(300).collect::<String>();
    let msg = format!("HTTP {status}: {detail}");
    if status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        ProviderError::Transient(msg)
    } else {
        ProviderError::Permanent(msg)
    }
}

/// Extract the reply text (and retrieved URLs) from a parsed response.
/// Mirrors the candidate/content/parts checks the API documents: any missing
/// layer is an error rather than an empty reply.
fn extract_reply(response: GenerateContentResponse) -> Result<Reply, ProviderError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Permanent("no candidates in response".into()))?;

    let content = candidate
        .content
        .ok_or_else(|| ProviderError::Permanent("no content in response candidate".into()))?;

    if content.parts.is_empty() {
        return Err(ProviderError::Permanent("no parts in content".into()));
    }

    let text: String = content
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();

    let source_urls = candidate
        .url_context_metadata
        .map(|meta| {
            meta.url_metadata
                .into_iter()
                .filter_map(|m| m.retrieved_url)
                .collect()
        })
        .unwrap_or_default();

    Ok(Reply { text, source_urls })
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, turns: &[Turn]) -> Result<Reply, ProviderError> {
        let request = self.build_request(turns);
        debug!(turns = turns.len(), model = %self.model, "sending generateContent request");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Permanent(format!("malformed response: {e}")))?;

        let reply = extract_reply(parsed)?;
        if !reply.source_urls.is_empty() {
            info!(urls = ?reply.source_urls, "URL context retrieved");
        }
        debug!(chars = reply.text.len(), "response received");
        Ok(reply)
    }
}
