//! Core types and error definitions for Colloquy.
//!
//! This crate provides the foundational types shared across all Colloquy crates.
//!
//! # Main types
//!
//! - [`ColloquyError`]: Unified error enum for all Colloquy subsystems.
//! - [`ColloquyResult`]: Convenience alias for `Result<T, ColloquyError>`.
//! - [`Role`]: Message role (user, assistant).
//! - [`Message`]: A single immutable message within a conversation history.

pub mod error;
pub mod message;

pub use error::{ColloquyError, ColloquyResult};
pub use message::{Message, Role};
