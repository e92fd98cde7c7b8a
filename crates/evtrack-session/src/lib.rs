//! Visitor session storage for evtrack.
//!
//! This crate owns the per-visitor key-value state the two analytics
//! identifiers live in:
//!
//! 1. **Storage** — where session records are kept between requests
//!    ([`SessionStore`] trait, [`MemoryStore`])
//! 2. **The session handle** — one visitor's attributes during a request
//!    ([`Session`])
//! 3. **Identifier accessors** — typed get/update of the client and
//!    session identifiers ([`ClientIdSession`], [`SessionIdSession`])
//!
//! # How it fits in the stack
//!
//! ```text
//! HTTP layer (above)   ← loads a Session per request, saves it afterwards
//!     ↕
//! Session layer (this crate)  ← stores attributes, exposes identifiers
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod identifiers;
mod session;
mod store;

pub use error::SessionError;
pub use identifiers::{
    ClientIdRepository, ClientIdSession, SessionIdRepository, SessionIdSession,
};
pub use session::{Session, SessionConfig, SessionData, SessionToken};
pub use store::{MemoryStore, SessionStore};
