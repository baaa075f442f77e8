//! PumpLink — request/response correlation for half-duplex pump links.
//!
//! The pump controller accepts a single command at a time.  This crate
//! queues commands from any number of issuer threads, hands them to one
//! transport thread in priority order, and routes each response or
//! failure back to the thread that is blocked waiting for it.
//!
//! Transport, message encoding and the pump command catalog live outside
//! this crate; [`adapters`] carries a host-side simulation for demos and
//! tests.

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod error;
pub mod link;

pub use error::{CommandError, Error, ProtocolMisuse, Result, TransportError};
