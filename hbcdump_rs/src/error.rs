//! Errors raised by the inspection collaborators.

use std::io;

use thiserror::Error;

/// Failure of a single disassembler/analyzer operation.
///
/// Everything except [`InspectError::Io`] is recoverable: the shell reports
/// the message and keeps reading commands.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Error: no function with id: {0} exists.")]
    NoSuchFunction(u32),

    #[error("Error: no string with id: {0} exists.")]
    NoSuchString(u32),

    #[error("Error: no filename with id: {0} exists.")]
    NoSuchFilename(u32),

    #[error("No profile data loaded.")]
    NoProfile,
}

pub type InspectResult = Result<(), InspectError>;
