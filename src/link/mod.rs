//! Half-duplex command dispatch.
//!
//! The pump accepts one command at a time and answers each with exactly
//! one response or error.  This module correlates those responses with
//! the threads that issued the commands.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      Dispatch Core                         │
//! │                                                            │
//! │  ┌──────────┐  enqueue  ┌──────────────┐  activate_next    │
//! │  │  Issuer  │──────────▶│ DispatchQueue│──────────────┐    │
//! │  │ threads  │           │ pending+slot │              ▼    │
//! │  └──────────┘           └──────────────┘     ┌───────────┐ │
//! │       ▲ wait                   ▲             │ Transport │ │
//! │       │                        │ complete    │  thread   │ │
//! │  ┌──────────┐                  └─────────────└───────────┘ │
//! │  │ Envelope │◀── outcome                                   │
//! │  └──────────┘                                              │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod envelope;
pub mod message;
pub mod ports;
pub mod queue;
pub mod session;
