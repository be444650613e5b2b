//! Execution context handed to every state-mutating call

use crate::common::errors::DexError;
use ethereum_types::Address;
use serde::{Deserialize, Serialize};

/// Who is calling and at what block time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub sender: Address,
    /// Block timestamp in seconds
    pub timestamp: u64,
}

impl CallContext {
    pub fn new(sender: Address, timestamp: u64) -> Self {
        Self { sender, timestamp }
    }

    /// Same block, different caller (used when the router acts on a user's behalf)
    pub fn with_sender(&self, sender: Address) -> Self {
        Self {
            sender,
            timestamp: self.timestamp,
        }
    }

    /// Deadlines are inclusive and checked once, at entry
    pub fn ensure_deadline(&self, deadline: u64) -> Result<(), DexError> {
        if self.timestamp > deadline {
            return Err(DexError::DeadlineExpired {
                deadline,
                now: self.timestamp,
            });
        }
        Ok(())
    }
}
