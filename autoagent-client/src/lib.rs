//! Backend client and chat session for the LLM Auto Agent
//!
//! [`ApiClient`] speaks the backend's HTTP contract. [`ChatSession`] is the
//! session-state object a front end constructs once: it owns the
//! conversation store and settings, relays messages, mirrors settings to the
//! backend and uploads files, reporting everything through a [`ChatView`].

pub mod api;
pub mod session;
pub mod view;

pub use api::{ApiClient, ApiError, ApiResult, BackendSession, HealthStatus, History};
pub use session::{ChatSession, SendOutcome, SyncOutcome};
pub use view::{ChatView, Notice, NoticeLevel};
