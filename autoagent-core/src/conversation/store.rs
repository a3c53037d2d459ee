//! Ordered, persisted collection of conversations

use super::model::{Conversation, Message, Role, DEFAULT_CONVERSATION_ID};
use crate::storage::{load_json, save_json, Storage, CHATS_KEY, CURRENT_CHAT_KEY};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of appending a message
#[derive(Debug, Clone, PartialEq)]
pub struct Appended {
    /// Conversation that received the message
    pub conversation_id: String,
    /// Title derived from this message, if it named the conversation
    pub new_title: Option<String>,
}

/// Manages the conversation collection and the current selection
///
/// The collection is never empty and `current` always names one of its
/// entries. Every mutating call persists before returning.
pub struct ConversationStore {
    storage: Arc<dyn Storage>,
    conversations: Vec<Conversation>,
    current: String,
    /// Bumped by `clear_all`, which reuses the default id
    resets: u64,
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("conversations", &self.conversations.len())
            .field("current", &self.current)
            .field("resets", &self.resets)
            .finish()
    }
}

impl ConversationStore {
    /// Load the collection from storage, falling back to one default
    /// conversation when nothing usable is stored
    pub fn load(storage: Arc<dyn Storage>) -> crate::Result<Self> {
        let mut conversations: Vec<Conversation> =
            load_json(storage.as_ref(), CHATS_KEY)?.unwrap_or_default();
        let seeded = conversations.is_empty();
        if seeded {
            conversations.push(Conversation::new(DEFAULT_CONVERSATION_ID));
        }

        let stored_current: Option<String> = load_json(storage.as_ref(), CURRENT_CHAT_KEY)?;
        let current = stored_current
            .filter(|id| conversations.iter().any(|c| &c.id == id))
            .unwrap_or_else(|| conversations[0].id.clone());

        let store = Self {
            storage,
            conversations,
            current,
            resets: 0,
        };
        if seeded {
            store.persist()?;
        }
        debug!(
            "Loaded {} conversation(s), current {}",
            store.conversations.len(),
            store.current
        );
        Ok(store)
    }

    /// All conversations, most recent first
    pub fn list(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Look up a conversation by id
    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Number of `clear_all` calls since load
    ///
    /// A conversation id only names the same conversation while this value
    /// is unchanged.
    pub fn resets(&self) -> u64 {
        self.resets
    }

    /// Id of the selected conversation
    pub fn current_id(&self) -> &str {
        &self.current
    }

    /// The selected conversation
    pub fn current(&self) -> &Conversation {
        self.get(&self.current)
            .unwrap_or(&self.conversations[0])
    }

    /// Insert a fresh conversation at the head and select it
    pub fn create_conversation(&mut self) -> crate::Result<&Conversation> {
        let id = self.next_id();
        info!("Creating conversation {}", id);
        self.conversations.insert(0, Conversation::new(id.clone()));
        self.current = id;
        self.persist()?;
        Ok(&self.conversations[0])
    }

    /// Select `id`. Unknown ids leave the selection untouched and yield `None`.
    pub fn switch_to(&mut self, id: &str) -> crate::Result<Option<&Conversation>> {
        let Some(index) = self.position(id) else {
            debug!("Ignoring switch to unknown conversation {}", id);
            return Ok(None);
        };
        if self.current != id {
            self.current = id.to_string();
            self.persist()?;
        }
        Ok(Some(&self.conversations[index]))
    }

    /// Remove a conversation
    ///
    /// Refused when it is the only one left. When the removed entry was
    /// selected the new first entry becomes current and is returned.
    pub fn delete_conversation(&mut self, id: &str) -> crate::Result<Option<&Conversation>> {
        if self.conversations.len() <= 1 {
            return Err(crate::Error::Rejected(
                "at least one conversation must be kept".to_string(),
            ));
        }
        let index = self
            .position(id)
            .ok_or_else(|| crate::Error::NotFound(format!("conversation {}", id)))?;

        self.conversations.remove(index);
        info!("Deleted conversation {}", id);

        let reselected = self.current == id;
        if reselected {
            self.current = self.conversations[0].id.clone();
        }
        self.persist()?;
        Ok(reselected.then(|| &self.conversations[0]))
    }

    /// Replace the collection with a single empty default conversation
    pub fn clear_all(&mut self) -> crate::Result<&Conversation> {
        info!("Clearing {} conversation(s)", self.conversations.len());
        self.conversations = vec![Conversation::new(DEFAULT_CONVERSATION_ID)];
        self.current = DEFAULT_CONVERSATION_ID.to_string();
        self.resets += 1;
        self.persist()?;
        Ok(&self.conversations[0])
    }

    /// Append to the selected conversation
    pub fn append_message(
        &mut self,
        role: Role,
        content: impl Into<String>,
    ) -> crate::Result<Appended> {
        let id = self.current.clone();
        self.append_to(&id, Message::new(role, content))
    }

    /// Append to a specific conversation
    ///
    /// Replies are routed by the conversation that issued the request, which
    /// need not be the selected one by the time they arrive. If the write
    /// fails the conversation is left as it was.
    pub fn append_to(&mut self, id: &str, message: Message) -> crate::Result<Appended> {
        let index = self
            .position(id)
            .ok_or_else(|| crate::Error::NotFound(format!("conversation {}", id)))?;
        let previous_title = self.conversations[index].title.clone();
        let new_title = self.conversations[index].push(message);

        if let Err(e) = self.persist() {
            let conversation = &mut self.conversations[index];
            conversation.messages.pop();
            conversation.title = previous_title;
            return Err(e);
        }
        if let Some(title) = &new_title {
            debug!("Conversation {} titled {:?}", id, title);
        }
        Ok(Appended {
            conversation_id: id.to_string(),
            new_title,
        })
    }

    /// Give a conversation an explicit title
    pub fn rename(&mut self, id: &str, title: &str) -> crate::Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(crate::Error::Validation("title must not be blank".to_string()));
        }
        let index = self
            .position(id)
            .ok_or_else(|| crate::Error::NotFound(format!("conversation {}", id)))?;
        self.conversations[index].title = title.to_string();
        self.persist()
    }

    /// Remember the backend's id for a conversation
    pub fn attach_remote_id(&mut self, id: &str, remote_id: impl Into<String>) -> crate::Result<()> {
        let index = self
            .position(id)
            .ok_or_else(|| crate::Error::NotFound(format!("conversation {}", id)))?;
        self.conversations[index].remote_id = Some(remote_id.into());
        self.persist()
    }

    /// Write the collection and the selection back to storage
    pub fn persist(&self) -> crate::Result<()> {
        save_json(self.storage.as_ref(), CHATS_KEY, &self.conversations)?;
        save_json(self.storage.as_ref(), CURRENT_CHAT_KEY, &self.current)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.conversations.iter().position(|c| c.id == id)
    }

    fn next_id(&self) -> String {
        let base = format!("chat_{}", chrono::Utc::now().timestamp_millis());
        let mut candidate = base.clone();
        let mut suffix = 1;
        while self.position(&candidate).is_some() {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        candidate
    }
}
