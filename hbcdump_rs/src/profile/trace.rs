//! Basic-block profile trace as written by the block profiler.
//!
//! ```json
//! { "blocks": [ { "function": 0, "offset": 0, "count": 12 } ],
//!   "trace":  [ { "function": 0, "offset": 0 } ] }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bytecode::BytecodeModule;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid profile JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("profile refers to unknown function {function}")]
    UnknownFunction { function: u32 },

    #[error("profile block at offset {offset} is outside function {function}")]
    BlockOutOfRange { function: u32, offset: u32 },
}

/// Hit count of the basic block starting at `offset` in `function`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub function: u32,
    /// Function-relative byte offset of the block's first instruction.
    pub offset: u32,
    pub count: u64,
}

/// One entry of the execution-order trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub function: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileTrace {
    #[serde(default)]
    pub blocks: Vec<BlockRecord>,
    #[serde(default)]
    pub trace: Vec<BlockRef>,
}

impl ProfileTrace {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProfileError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Check every block and trace entry against the module layout.
    pub fn validate(&self, module: &BytecodeModule) -> Result<(), ProfileError> {
        let positions = self
            .blocks
            .iter()
            .map(|b| (b.function, b.offset))
            .chain(self.trace.iter().map(|r| (r.function, r.offset)));
        for (function, offset) in positions {
            let func = module
                .function(function)
                .ok_or(ProfileError::UnknownFunction { function })?;
            if offset >= func.size && !(offset == 0 && func.size == 0) {
                return Err(ProfileError::BlockOutOfRange { function, offset });
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.trace.is_empty()
    }
}
