//! HTTP/JSON protocol definitions for the Sortie API
//!
//! This crate defines the request bodies accepted by the API server, the
//! resolved views and responses it returns, and its error body.

mod error;
mod requests;
mod responses;
mod types;

pub use error::*;
pub use requests::*;
pub use responses::*;
pub use types::*;
