//! Chat session: the client's single state object
//!
//! A front end builds one [`ChatSession`] at startup and drives every user
//! action through it. Methods take `&self`; internal state sits behind
//! mutexes that are never held across an `.await` or a view call.

use crate::api::{ApiClient, BackendSession, ChatReply, ChatRequest, HealthStatus, History, InitializeRequest};
use crate::view::{ChatView, Notice};
use autoagent_core::config::{ClientConfig, SyncMode};
use autoagent_core::conversation::{
    Annotations, Conversation, ConversationStore, Message, Role, PLACEHOLDER_TITLE,
};
use autoagent_core::settings::{load_settings, store_settings, Settings, SettingsForm};
use autoagent_core::storage::Storage;
use autoagent_core::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reply text used when the backend succeeds without a `response` field
const EMPTY_REPLY: &str = "No response received";

/// How a send ended
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Blank input; nothing happened
    Ignored,
    /// The backend answered; the assistant message was appended
    Replied(Message),
    /// The request failed; an error-bearing assistant message was appended
    Failed(Message),
}

/// How a settings save ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Written locally and accepted by the backend
    Synced,
    /// Written locally, rejected by the backend. The local record is kept.
    LocalOnly(String),
}

/// Marks a conversation as sending until dropped
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    conversation_id: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<String>>, conversation_id: &str) -> Option<Self> {
        if !in_flight.lock().insert(conversation_id.to_string()) {
            return None;
        }
        Some(Self {
            in_flight,
            conversation_id: conversation_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.conversation_id);
    }
}

/// Conversation and settings state plus the backend it talks to
pub struct ChatSession {
    config: ClientConfig,
    api: ApiClient,
    storage: Arc<dyn Storage>,
    view: Arc<dyn ChatView>,
    store: Mutex<ConversationStore>,
    settings: Mutex<Settings>,
    backend: Mutex<Option<BackendSession>>,
    in_flight: Mutex<HashSet<String>>,
}

impl ChatSession {
    /// Load persisted state and show the current conversation
    pub fn open(
        config: ClientConfig,
        storage: Arc<dyn Storage>,
        view: Arc<dyn ChatView>,
    ) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        let store = ConversationStore::load(storage.clone())?;
        let settings = load_settings(storage.as_ref())?;
        info!(
            "Session opened against {} ({} conversation(s))",
            api.base_url(),
            store.len()
        );

        let session = Self {
            config,
            api,
            storage,
            view,
            store: Mutex::new(store),
            settings: Mutex::new(settings),
            backend: Mutex::new(None),
            in_flight: Mutex::new(HashSet::new()),
        };
        let current = session.current();
        session.replay(&current);
        Ok(session)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Snapshot of all conversations, most recent first
    pub fn conversations(&self) -> Vec<Conversation> {
        self.store.lock().list().to_vec()
    }

    /// Snapshot of the current conversation
    pub fn current(&self) -> Conversation {
        self.store.lock().current().clone()
    }

    pub fn settings(&self) -> Settings {
        self.settings.lock().clone()
    }

    /// Identifiers issued by `/api/initialize`, if it has run this session
    pub fn backend_session(&self) -> Option<BackendSession> {
        self.backend.lock().clone()
    }

    /// Whether a chat request is pending for the conversation
    pub fn is_sending(&self, conversation_id: &str) -> bool {
        self.in_flight.lock().contains(conversation_id)
    }

    /// Start a new conversation and select it
    ///
    /// With an established backend session the backend is asked for a
    /// conversation id as well; if that fails the local conversation stays.
    pub async fn create_conversation(&self) -> Result<String> {
        let id = {
            let mut store = self.store.lock();
            store.create_conversation()?.id.clone()
        };
        self.view.clear_messages();
        self.view.set_title(PLACEHOLDER_TITLE);

        if let Some(backend) = self.backend_session() {
            match self.api.new_conversation(&backend.session_id).await {
                Ok(remote_id) => {
                    let mut store = self.store.lock();
                    store.attach_remote_id(&id, remote_id)?;
                }
                Err(e) => {
                    warn!("Backend did not register conversation {}: {}", id, e);
                    self.view.notify(Notice::warning(format!(
                        "The server did not register the new conversation: {}",
                        e
                    )));
                }
            }
        }
        Ok(id)
    }

    /// Select a conversation and replay its messages
    ///
    /// Returns false, changing nothing, when the id is unknown.
    pub fn switch_to(&self, id: &str) -> Result<bool> {
        let conversation = {
            let mut store = self.store.lock();
            store.switch_to(id)?.cloned()
        };
        match conversation {
            Some(conversation) => {
                self.replay(&conversation);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete a conversation; the last one left cannot be deleted
    pub fn delete_conversation(&self, id: &str) -> Result<()> {
        let reselected = {
            let mut store = self.store.lock();
            store.delete_conversation(id).map(|c| c.cloned())
        };
        match reselected {
            Ok(Some(conversation)) => {
                self.replay(&conversation);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Reset to one empty conversation after the user confirms
    ///
    /// Returns false when the user declined.
    pub fn clear_all(&self) -> Result<bool> {
        if !self
            .view
            .confirm("Clear all conversations? This cannot be undone.")
        {
            debug!("Clear all declined");
            return Ok(false);
        }
        let conversation = {
            let mut store = self.store.lock();
            store.clear_all()?.clone()
        };
        self.replay(&conversation);
        Ok(true)
    }

    pub fn rename(&self, id: &str, title: &str) -> Result<()> {
        let renamed = {
            let mut store = self.store.lock();
            store.rename(id, title).map(|()| store.current_id() == id)
        };
        if renamed.map_err(|e| self.reject(e))? {
            self.view.set_title(title.trim());
        }
        Ok(())
    }

    /// Send user input to the backend and append the reply
    ///
    /// Blank input is ignored. A second send for a conversation that is
    /// still waiting on a reply fails with [`Error::Busy`] before touching
    /// any state. Backend or network failures do not fail the call: they
    /// are appended to the conversation as an assistant message.
    pub async fn send_message(&self, input: &str) -> Result<SendOutcome> {
        let text = input.trim();
        if text.is_empty() {
            return Ok(SendOutcome::Ignored);
        }
        if !self.settings.lock().has_api_key() {
            return Err(self.reject(Error::Validation(
                "configure an API key before chatting".to_string(),
            )));
        }

        let conversation_id = self.store.lock().current_id().to_string();
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, &conversation_id) else {
            return Err(self.reject(Error::Busy(conversation_id)));
        };

        let user_message = Message::new(Role::User, text);
        let (appended, resets) = {
            let mut store = self.store.lock();
            let appended = store.append_to(&conversation_id, user_message.clone())?;
            (appended, store.resets())
        };
        self.view.render_message(&user_message);
        if let Some(title) = &appended.new_title {
            self.view.set_title(title);
        }

        self.view.show_loading(&conversation_id);
        let result = self.exchange(&conversation_id, text).await;
        self.view.hide_loading(&conversation_id);

        let (reply, replied) = match result {
            Ok(reply) => {
                let content = reply.response.unwrap_or_else(|| EMPTY_REPLY.to_string());
                let mut message = Message::new(Role::Assistant, content);
                if self.config.show_reasoning {
                    message = message.with_annotations(Annotations {
                        reasoning_steps: reply.reasoning_steps,
                        tools_used: reply.tools_used,
                    });
                }
                (message, true)
            }
            Err(e) => {
                warn!("Chat request for {} failed: {}", conversation_id, e);
                (Message::new(Role::Assistant, format!("Error: {}", e)), false)
            }
        };

        self.deliver(&conversation_id, resets, reply.clone())?;
        Ok(if replied {
            SendOutcome::Replied(reply)
        } else {
            SendOutcome::Failed(reply)
        })
    }

    async fn exchange(&self, conversation_id: &str, text: &str) -> Result<ChatReply> {
        let backend = match self.config.sync_mode {
            SyncMode::Initialize => Some(self.ensure_backend_session().await?),
            SyncMode::Settings => self.backend_session(),
        };
        let remote_id = {
            let store = self.store.lock();
            store.get(conversation_id).and_then(|c| c.remote_id.clone())
        };

        let request = match backend {
            Some(backend) => ChatRequest {
                message: text.to_string(),
                session_id: Some(backend.session_id),
                user_id: Some(backend.user_id),
                conversation_id: Some(remote_id.unwrap_or_else(|| conversation_id.to_string())),
            },
            None => ChatRequest {
                message: text.to_string(),
                session_id: Some(conversation_id.to_string()),
                ..Default::default()
            },
        };
        Ok(self.api.chat(&request).await?)
    }

    /// Append a reply to the conversation that asked for it
    ///
    /// `resets` is the store's reset count when the request was sent; a
    /// different count means the id now names a newer conversation.
    fn deliver(&self, conversation_id: &str, resets: u64, message: Message) -> Result<()> {
        let is_current = {
            let mut store = self.store.lock();
            if store.resets() != resets {
                warn!("Dropping reply for cleared conversation {}", conversation_id);
                return Ok(());
            }
            match store.append_to(conversation_id, message.clone()) {
                Ok(_) => store.current_id() == conversation_id,
                Err(Error::NotFound(_)) => {
                    warn!("Dropping reply for deleted conversation {}", conversation_id);
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        };
        if is_current {
            self.view.render_message(&message);
        }
        Ok(())
    }

    /// Validate and store settings, then mirror them to the backend
    ///
    /// The local write is not rolled back when the backend rejects the
    /// record, so client and server may disagree afterwards.
    pub async fn save_settings(&self, form: SettingsForm) -> Result<SyncOutcome> {
        let settings = form.into_settings().map_err(|e| self.reject(e))?;
        store_settings(self.storage.as_ref(), &settings)?;
        *self.settings.lock() = settings.clone();

        let pushed = match self.config.sync_mode {
            SyncMode::Settings => self.api.save_settings(&settings).await.map_err(Error::from),
            SyncMode::Initialize => {
                self.backend.lock().take();
                self.initialize_backend(&settings).await.map(|_| ())
            }
        };

        match pushed {
            Ok(()) => {
                info!("Settings saved and synchronized");
                self.view.notify(Notice::success("Settings saved"));
                Ok(SyncOutcome::Synced)
            }
            Err(e) => {
                warn!("Settings saved locally but not on the server: {}", e);
                self.view.notify(Notice::warning(format!(
                    "Settings saved locally, but the server rejected them: {}",
                    e
                )));
                Ok(SyncOutcome::LocalOnly(e.to_string()))
            }
        }
    }

    /// Settings the backend currently holds
    pub async fn fetch_remote_settings(&self) -> Result<Settings> {
        Ok(self.api.fetch_settings().await?)
    }

    /// The backend session, initializing one from the stored settings if needed
    pub async fn ensure_backend_session(&self) -> Result<BackendSession> {
        if let Some(backend) = self.backend_session() {
            return Ok(backend);
        }
        let settings = self.settings();
        if !settings.has_api_key() {
            return Err(Error::Validation(
                "configure an API key before connecting".to_string(),
            ));
        }
        self.initialize_backend(&settings).await
    }

    async fn initialize_backend(&self, settings: &Settings) -> Result<BackendSession> {
        let backend = self.api.initialize(&InitializeRequest::from(settings)).await?;
        info!(
            "Backend session {} established for {}",
            backend.session_id, backend.user_id
        );
        *self.backend.lock() = Some(backend.clone());

        {
            let mut store = self.store.lock();
            if store.current().remote_id.is_none() {
                let current = store.current_id().to_string();
                store.attach_remote_id(&current, backend.conversation_id.clone())?;
            }
        }
        Ok(backend)
    }

    /// Upload a file to the backend's import endpoint
    pub async fn upload_file(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(self.reject(Error::Validation(format!(
                "{} is not a readable file",
                path.display()
            ))));
        }
        if !self.settings.lock().has_api_key() {
            return Err(self.reject(Error::Validation(
                "configure an API key before importing files".to_string(),
            )));
        }
        let session_id = match self.config.sync_mode {
            SyncMode::Initialize => Some(
                self.ensure_backend_session()
                    .await
                    .map_err(|e| self.reject(e))?
                    .session_id,
            ),
            SyncMode::Settings => None,
        };

        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        self.view.show_progress(&format!("Uploading {}", label));
        let result = self.api.upload(path, session_id.as_deref()).await;
        self.view.hide_progress();

        match result {
            Ok(message) => {
                info!("Uploaded {}", label);
                self.view.notify(Notice::success(format!("Upload succeeded: {}", message)));
                Ok(message)
            }
            Err(e) => {
                let err = Error::from(e);
                self.view
                    .notify(Notice::error(format!("Upload failed: {}", err)));
                Err(err)
            }
        }
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        Ok(self.api.health().await?)
    }

    /// Server-side history
    ///
    /// Keyed by the backend session when one exists, otherwise by the
    /// current conversation id, which is what chat requests use as their
    /// session id in that case.
    pub async fn remote_history(&self, conversation_id: Option<&str>) -> Result<History> {
        let session_id = match self.backend_session() {
            Some(backend) => backend.session_id,
            None => self.store.lock().current_id().to_string(),
        };
        Ok(self.api.history(&session_id, conversation_id).await?)
    }

    fn replay(&self, conversation: &Conversation) {
        self.view.clear_messages();
        self.view.set_title(&conversation.title);
        for message in &conversation.messages {
            self.view.render_message(message);
        }
    }

    /// Report a user-facing error and hand it back
    fn reject(&self, err: Error) -> Error {
        self.view.notify(Notice::error(err.to_string()));
        err
    }
}
