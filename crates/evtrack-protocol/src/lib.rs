//! Measurement protocol for evtrack.
//!
//! This crate defines what a single analytics "hit" looks like on the wire:
//!
//! - **Types** ([`Hit`], [`HitType`], [`Endpoint`]) — the parameters of one
//!   measurement-protocol request and where it is sent.
//! - **Codec** ([`Codec`] trait, [`FormCodec`]) — how a hit is turned into a
//!   request body and parsed back.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while validating,
//!   encoding or decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between the analytics client (which fills in a
//! hit) and the transport (which ships raw bytes). It knows nothing about
//! sessions or HTTP servers.
//!
//! ```text
//! Analytics (setters) → Protocol (Hit → bytes) → Transport (POST)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, FormCodec};
pub use error::ProtocolError;
pub use types::{Endpoint, Hit, HitType, MAX_CUSTOM_DIMENSION};
