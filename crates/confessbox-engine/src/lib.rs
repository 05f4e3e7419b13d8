//! Confession and comment lifecycle: who may post what and when, where it is
//! stored, and how the channel post is kept in step with its comments.

pub mod avatar;
pub mod config;
pub mod error;
pub mod locks;
pub mod moderation;
pub mod publisher;
pub mod rate_limit;
pub mod router;
pub mod state;
pub mod transport;

pub use config::EngineConfig;
pub use error::EngineError;
pub use router::{Mode, SessionRouter};
pub use transport::{Transport, TransportError};
