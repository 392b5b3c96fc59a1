//! Core entity definitions for the Sortie backend.
//!
//! This crate defines the domain records shared by the store, the wire
//! protocol and the API server: users and their reviews, events, and the
//! event-scoped conversations with their message logs.

mod conversation;
mod event;
mod user;

pub use conversation::*;
pub use event::*;
pub use user::*;
