//! Unified error types for the pump link.
//!
//! Every outcome that can reach a command issuer is a [`CommandError`];
//! programming mistakes against the dispatch protocol are a
//! [`ProtocolMisuse`].  Both fold into the crate-wide [`Error`].
//! All variants are `Copy` so a single stored failure can be handed to
//! every waiter on an envelope without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A command did not produce a response.
    Command(CommandError),
    /// The dispatch protocol was driven out of order.
    Misuse(ProtocolMisuse),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Misuse(e) => write!(f, "protocol misuse: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Command outcomes
// ---------------------------------------------------------------------------

/// Why a command did not yield a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The device answered the command with an application-layer error code.
    Device(u16),
    /// The transport failed while this command was in flight.
    Transport(TransportError),
    /// The link went away before the command was ever transmitted.
    LinkLost,
    /// The waiter gave up.  The command may still execute on the device.
    Timeout,
    /// The pending queue is at its configured capacity.
    QueueFull,
}

impl CommandError {
    /// Whether the command's real-world effect is unknown.
    ///
    /// A timed-out command may already have been transmitted and executed;
    /// callers must not treat it as a negative outcome (e.g. by re-issuing
    /// a bolus) without first querying the device.
    pub const fn is_in_doubt(self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(code) => write!(f, "device error 0x{code:04x}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::LinkLost => write!(f, "link lost before transmission"),
            Self::Timeout => write!(f, "timed out, outcome unknown"),
            Self::QueueFull => write!(f, "dispatch queue full"),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Link-level failures reported by the transport collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    WriteFailed,
    ReadFailed,
    Disconnected,
    /// A response arrived that does not match the active command.
    UnexpectedResponse,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteFailed => write!(f, "write failed"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::UnexpectedResponse => write!(f, "unexpected response"),
        }
    }
}

impl From<TransportError> for CommandError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Command(CommandError::Transport(e))
    }
}

// ---------------------------------------------------------------------------
// Protocol misuse
// ---------------------------------------------------------------------------

/// Programming errors against the dispatch protocol.
///
/// These are logged at the point of detection and returned so tests can
/// assert on them; they never leave the queue in an inconsistent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolMisuse {
    /// An envelope was completed a second time.
    AlreadyCompleted,
    /// A command was activated while another one is still in flight.
    SlotOccupied,
}

impl fmt::Display for ProtocolMisuse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyCompleted => write!(f, "envelope already completed"),
            Self::SlotOccupied => write!(f, "a command is already in flight"),
        }
    }
}

impl From<ProtocolMisuse> for Error {
    fn from(e: ProtocolMisuse) -> Self {
        Self::Misuse(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
