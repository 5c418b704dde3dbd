//! Typed errors shared across the fault-injection harness crates.
//!
//! Library crates return [`Error`] from fallible operations; the binary crate converts the
//! outermost `Error` into an [`ExitCode`] at the process boundary, mirroring the split between
//! a rich internal error type and a small OS-facing exit status.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A list specifying categories of fault-injector error.
///
/// Grouped by which taxonomy bucket of the harness's error handling design they fall into:
/// fatal (abort the whole campaign), trial-fatal (abort one trial, campaign continues), or
/// invocation errors raised before any trial starts.
#[derive(Error, Debug)]
pub enum Error {
    /// The child simulator process could not be spawned.
    #[error("failed to spawn simulator at {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cross-process memory read or write failed at the OS layer.
    #[error("failed to {op} {len} byte(s) at {addr:#x} in pid {pid}")]
    ChildMemory {
        op: MemoryOp,
        pid: i32,
        addr: usize,
        len: usize,
    },

    /// The catalog discovery file was missing, truncated, or malformed.
    #[error("catalog file {path:?} is invalid: {reason}")]
    MalformedCatalog { path: PathBuf, reason: String },

    /// A catalog record named a type tag outside the closed set in the type registry.
    #[error("unknown data structure type tag {tag} (id {id}, name {name:?})")]
    UnknownTypeTag { id: u32, name: String, tag: u32 },

    /// Two catalog records claimed the same dense id.
    #[error("duplicate data structure id {id} in catalog {path:?}")]
    DuplicateCatalogId { path: PathBuf, id: u32 },

    /// The handshake semaphore could not be created, opened, posted, or waited on.
    #[error("handshake semaphore {name:?} failed: {reason}")]
    Handshake { name: String, reason: String },

    /// The child's output transcript could not be read back.
    #[error("failed to read simulator output {path:?}: {source}")]
    ReadOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The command line or sibling-mode argument vector was invalid.
    #[error("invalid invocation: {0}")]
    InvalidArgs(String),

    /// A campaign configuration value was out of range.
    #[error("invalid campaign configuration: {0}")]
    InvalidConfig(String),

    /// Any other I/O failure (log file, temp directory, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether a [`Error::ChildMemory`] failure happened on the read or the write side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOp {
    Read,
    Write,
}

impl fmt::Display for MemoryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryOp::Read => write!(f, "read"),
            MemoryOp::Write => write!(f, "write"),
        }
    }
}

/// Process exit status, the boundary between the rich [`Error`] type above and the OS.
///
/// Mirrors the teacher's `ckb_app_config::ExitCode`: subcommands return `Result<T, ExitCode>`
/// and `main` converts the final `Result` to a process exit status with `std::process::exit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Invalid CLI invocation or sibling-mode argument vector.
    Cli = 1,
    /// I/O failure: catalog file, output file, log file, temp directory.
    Io = 2,
    /// The child simulator could not be spawned, or a cross-process memory operation failed.
    Child = 3,
    /// The campaign could not run any trial (e.g. the golden run itself failed).
    Campaign = 4,
}

impl From<Error> for ExitCode {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidArgs(_) | Error::InvalidConfig(_) => ExitCode::Cli,
            Error::Io(_) | Error::ReadOutput { .. } | Error::MalformedCatalog { .. } => {
                ExitCode::Io
            }
            Error::Spawn { .. } | Error::ChildMemory { .. } | Error::Handshake { .. } => {
                ExitCode::Child
            }
            Error::UnknownTypeTag { .. } | Error::DuplicateCatalogId { .. } => ExitCode::Io,
        }
    }
}

impl std::process::Termination for ExitCode {
    fn report(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self as u8)
    }
}

/// Convenience alias used throughout the harness crates.
pub type Result<T> = std::result::Result<T, Error>;
