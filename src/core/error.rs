use std::fmt;
use thiserror::Error as ThisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    Migration,
    Storage,
    Clock,
    InvalidInput,
    InvalidState,
}

/// Crate-wide error: a kind for programmatic handling plus a readable context.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

/// Local decode failures. Never retried at this layer.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ParseError {
    #[error("malformed varint: no terminating byte within {max_groups} groups (last byte 0x{last_byte:02x})")]
    MalformedVarInt { max_groups: usize, last_byte: u8 },
    #[error("unknown wire type code {0}")]
    UnknownWireType(u64),
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },
    #[error("invalid utf-8 in segment at offset {0}")]
    InvalidUtf8(usize),
    #[error("length {0} does not fit in memory")]
    LengthOverflow(u64),
    #[error("end group for tag {0} without matching start group")]
    UnmatchedEndGroup(u32),
    #[error("end group tag {found} does not close start group tag {expected}")]
    MismatchedEndGroup { expected: u32, found: u32 },
    #[error("field tag {0} does not fit in 32 bits")]
    TagOverflow(u64),
    #[error("groups nested deeper than {max_depth} levels")]
    GroupTooDeep { max_depth: usize },
    #[error("decoded value {value} does not fit in {bits} bits")]
    ValueOverflow { value: u64, bits: u32 },
}

/// Startup-time modeling errors. Fatal to the startup path.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum MigrationError {
    #[error("Dependency cycle detected: {}", path.join(" -> "))]
    DependencyCycle { path: Vec<String> },
    #[error("model {model} references unknown model id {missing}")]
    UnknownDependency { model: String, missing: u32 },
    #[error("model {name} has id {id} but is registered under id {key}")]
    ModelIdMismatch { name: String, key: u32, id: u32 },
}

/// Persisted metadata disagrees with the in-process configuration.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum StorageError {
    #[error("model id {id} is stored for {stored} but now names {current}")]
    ModelIdConflict { id: u32, stored: String, current: String },
    #[error("model {name} was stored with id {stored} but is now defined with id {current}")]
    ModelIdChanged { name: String, stored: u32, current: u32 },
    #[error("model {model} needs migration: {}", reasons.join("; "))]
    MigrationRequired { model: String, reasons: Vec<String> },
    #[error("stored definition could not be (de)serialized: {0}")]
    Serialization(String),
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: err.to_string(),
        }
    }
}

impl From<MigrationError> for Error {
    fn from(err: MigrationError) -> Self {
        Error {
            kind: ErrorKind::Migration,
            context: err.to_string(),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error {
            kind: ErrorKind::Storage,
            context: err.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::from(StorageError::Serialization(err.to_string()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::InvalidInput,
            context: format!("config: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
