//! HTTP client for the agent backend

use autoagent_core::config::ClientConfig;
use autoagent_core::settings::Settings;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Error type for backend calls
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Backend(String),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ApiError> for autoagent_core::Error {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Http(e) => autoagent_core::Error::Transport(e.to_string()),
            ApiError::Io(e) => autoagent_core::Error::Io(e),
            other => autoagent_core::Error::Backend(other.to_string()),
        }
    }
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Successful chat reply
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub reasoning_steps: Vec<Value>,
    #[serde(default)]
    pub tools_used: Vec<Value>,
}

/// Database parameters in the shape `/api/initialize` expects
#[derive(Debug, Clone, Serialize)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// Body of `POST /api/initialize`
#[derive(Debug, Clone, Serialize)]
pub struct InitializeRequest {
    pub api_key: String,
    pub use_database: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_config: Option<DbConfig>,
}

impl From<&Settings> for InitializeRequest {
    fn from(settings: &Settings) -> Self {
        let db_config = settings.use_database.then(|| DbConfig {
            host: settings.database.host.clone(),
            port: settings.database.port,
            user: settings.database.user.clone(),
            password: settings.database.password.clone(),
            database: settings.database.name.clone(),
        });
        Self {
            api_key: settings.api_key.clone(),
            use_database: settings.use_database,
            db_config,
        }
    }
}

/// Identifiers issued by `/api/initialize`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendSession {
    pub user_id: String,
    pub session_id: String,
    pub conversation_id: String,
}

/// A conversation as listed by `/api/history`
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConversation {
    pub conversation_id: String,
    #[serde(default)]
    pub last_activity: Option<String>,
}

/// A message as returned by `/api/history`
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteMessage {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `/api/history` answers with either the conversation list or one
/// conversation's messages, depending on the query
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum History {
    Messages { messages: Vec<RemoteMessage> },
    Conversations { conversations: Vec<RemoteConversation> },
}

/// Backend liveness as reported by the health endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub healthy: bool,
    /// `None` when the backend build does not report agent state
    pub agent_initialized: Option<bool>,
}

impl HealthStatus {
    fn from_value(value: &Value) -> Self {
        let agent_initialized = value
            .get("agent_initialized")
            .or_else(|| value.get("initialized"))
            .and_then(Value::as_bool);
        let healthy = match value.get("status").and_then(Value::as_str) {
            Some(status) => status.eq_ignore_ascii_case("healthy") || status == "ok",
            None => true,
        };
        Self {
            healthy,
            agent_initialized,
        }
    }
}

#[derive(Deserialize)]
struct UploadReply {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Deserialize)]
struct NewConversationReply {
    conversation_id: String,
}

#[derive(Deserialize)]
struct SettingsReply {
    #[serde(default)]
    settings: Settings,
}

/// Client for the backend's `/api` endpoints
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    upload_endpoint: String,
    health_endpoint: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            upload_endpoint: config.upload_endpoint.clone(),
            health_endpoint: config.health_endpoint.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Relay one user message
    pub async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatReply> {
        let url = self.url("/api/chat");
        debug!("POST {} ({} chars)", url, request.message.len());
        let response = self.client.post(&url).json(request).send().await?;
        read_json(response).await
    }

    /// Mirror the settings record to `/api/settings`
    pub async fn save_settings(&self, settings: &Settings) -> ApiResult<()> {
        let url = self.url("/api/settings");
        debug!("POST {}", url);
        let response = self.client.post(&url).json(settings).send().await?;
        read_json::<Value>(response).await?;
        Ok(())
    }

    /// Settings the backend currently holds
    pub async fn fetch_settings(&self) -> ApiResult<Settings> {
        let url = self.url("/api/settings");
        let response = self.client.get(&url).send().await?;
        let reply: SettingsReply = read_json(response).await?;
        Ok(reply.settings.normalized())
    }

    /// Create the backend agent for these settings
    pub async fn initialize(&self, request: &InitializeRequest) -> ApiResult<BackendSession> {
        let url = self.url("/api/initialize");
        debug!("POST {} (use_database={})", url, request.use_database);
        let response = self.client.post(&url).json(request).send().await?;
        read_json(response).await
    }

    /// Upload a file to the import endpoint, returning the backend's message
    pub async fn upload(&self, path: &Path, session_id: Option<&str>) -> ApiResult<String> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let bytes = tokio::fs::read(path).await?;
        let size = bytes.len();

        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str("application/octet-stream")?;
        let mut form = Form::new().part("file", part);
        if let Some(session_id) = session_id {
            form = form.text("session_id", session_id.to_string());
        }

        let url = self.url(&self.upload_endpoint);
        debug!("POST {} ({} bytes from {})", url, size, file_name);
        let response = self.client.post(&url).multipart(form).send().await?;
        let reply: UploadReply = read_json(response).await?;
        Ok(reply
            .message
            .or(reply.filename.map(|f| format!("{} uploaded", f)))
            .unwrap_or_else(|| format!("{} uploaded", file_name)))
    }

    /// Server-side history for a backend session
    pub async fn history(
        &self,
        session_id: &str,
        conversation_id: Option<&str>,
    ) -> ApiResult<History> {
        let url = self.url("/api/history");
        let mut query = vec![("session_id", session_id)];
        if let Some(conversation_id) = conversation_id {
            query.push(("conversation_id", conversation_id));
        }
        let response = self.client.get(&url).query(&query).send().await?;
        read_json(response).await
    }

    /// Ask the backend for a fresh conversation id
    pub async fn new_conversation(&self, session_id: &str) -> ApiResult<String> {
        let url = self.url("/api/new_conversation");
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "session_id": session_id }))
            .send()
            .await?;
        let reply: NewConversationReply = read_json(response).await?;
        Ok(reply.conversation_id)
    }

    pub async fn health(&self) -> ApiResult<HealthStatus> {
        let url = self.url(&self.health_endpoint);
        let response = self.client.get(&url).send().await?;
        let value: Value = read_json(response).await?;
        Ok(HealthStatus::from_value(&value))
    }
}

/// Decode a backend reply, turning error payloads into [`ApiError`]
///
/// The backend signals failure three ways: a non-2xx status, `success:false`
/// in a 200 body, or `status:"error"`. Any `error` or `message` field is
/// surfaced as the error text.
async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    let body = response.text().await?;

    let value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) if status.is_success() => return Err(ApiError::Json(e)),
        Err(_) => {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: autoagent_core::utils::truncate_chars(body.trim(), 200),
            })
        }
    };

    let flagged_failure = value.get("success") == Some(&Value::Bool(false))
        || value.get("status").and_then(Value::as_str) == Some("error");
    if !status.is_success() || flagged_failure {
        let message = value
            .get("error")
            .or_else(|| value.get("message"))
            .and_then(Value::as_str)
            .map(ToString::to_string);
        return Err(match message {
            Some(message) => ApiError::Backend(message),
            None => ApiError::Status {
                status: status.as_u16(),
                body: autoagent_core::utils::truncate_chars(body.trim(), 200),
            },
        });
    }

    Ok(serde_json::from_value(value)?)
}
