//! Core types for the LLM Auto Agent client
//!
//! This crate owns the client-side state: the conversation collection,
//! the settings record, the key/value storage they persist to, plus the
//! configuration and logging shared by the other autoagent crates.

pub mod config;
pub mod conversation;
pub mod error;
pub mod logging;
pub mod settings;
pub mod storage;
pub mod utils;

pub use error::{Error, Result};
