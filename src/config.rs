//! Link configuration parameters
//!
//! All tunable parameters for a pump link session.
//! Values can be persisted with [`LinkConfig::to_bytes`] or loaded from JSON
//! by the host binary.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Upper bound on the default command timeout (10 minutes).
const MAX_COMMAND_TIMEOUT_MS: u32 = 600_000;

/// Core link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Budget for [`LinkSession::request`](crate::link::session::LinkSession::request)
    /// in milliseconds
    pub command_timeout_ms: u32,
    /// Maximum number of not-yet-sent commands; `None` means unbounded
    pub max_pending: Option<u16>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 10_000,
            max_pending: None,
        }
    }
}

impl LinkConfig {
    /// Reject values that would make the link unusable.
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout_ms == 0 {
            return Err(Error::Config("command_timeout_ms must be non-zero"));
        }
        if self.command_timeout_ms > MAX_COMMAND_TIMEOUT_MS {
            return Err(Error::Config("command_timeout_ms exceeds 10 minutes"));
        }
        if self.max_pending == Some(0) {
            return Err(Error::Config("max_pending must be at least 1"));
        }
        Ok(())
    }

    /// Default timeout applied by `LinkSession::request`.
    pub fn command_timeout(&self) -> core::time::Duration {
        core::time::Duration::from_millis(u64::from(self.command_timeout_ms))
    }

    /// Serialize for persistent storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|_| Error::Config("encode failed"))
    }

    /// Deserialize and validate a persisted config.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let config: Self =
            postcard::from_bytes(bytes).map_err(|_| Error::Config("decode failed"))?;
        config.validate()?;
        Ok(config)
    }
}
