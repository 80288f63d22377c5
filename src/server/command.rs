//! Command Parsing and Execution
//!
//! One request per line, fields separated by single spaces:
//!
//! ```text
//! get <key>
//! delete <key>
//! put <key> <value> [ttl-seconds]
//! stats
//! ```
//!
//! Fields are raw bytes, so keys and values may hold anything except space
//! and newline.

use bytes::Bytes;
use thiserror::Error;

use crate::storage::StorageService;

pub const NOT_FOUND: &str = "not found";
pub const DELETED: &str = "delete";
pub const NOT_DELETED: &str = "didn't delete";
pub const STORED: &str = "put";
pub const NOT_STORED: &str = "didn't put";
pub const UNKNOWN: &str = "unknown command";

// == Command ==
/// A parsed client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get { key: Bytes },
    Delete { key: Bytes },
    Put { key: Bytes, value: Bytes, ttl: u64 },
    Stats,
}

/// Why a line could not be turned into a command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty request")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("invalid ttl: {0}")]
    InvalidTtl(String),
}

impl CommandError {
    /// The response line sent back for this error.
    pub fn response(&self) -> &'static str {
        match self {
            CommandError::InvalidTtl(_) => NOT_STORED,
            CommandError::Empty | CommandError::Unknown(_) => UNKNOWN,
        }
    }
}

impl Command {
    // == Parse ==
    /// Parses one request line; a trailing `\n` or `\r\n` is ignored.
    pub fn parse(line: &[u8]) -> Result<Self, CommandError> {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            return Err(CommandError::Empty);
        }

        let fields: Vec<&[u8]> = line.split(|byte| *byte == b' ').collect();
        match (fields[0], &fields[1..]) {
            (b"get", [key]) => Ok(Command::Get {
                key: Bytes::copy_from_slice(key),
            }),
            (b"delete", [key]) => Ok(Command::Delete {
                key: Bytes::copy_from_slice(key),
            }),
            (b"put", [key, value]) => Ok(Command::Put {
                key: Bytes::copy_from_slice(key),
                value: Bytes::copy_from_slice(value),
                ttl: 0,
            }),
            (b"put", [key, value, ttl]) => Ok(Command::Put {
                key: Bytes::copy_from_slice(key),
                value: Bytes::copy_from_slice(value),
                ttl: parse_ttl(ttl)?,
            }),
            (b"stats", []) => Ok(Command::Stats),
            _ => Err(CommandError::Unknown(
                String::from_utf8_lossy(fields[0]).into_owned(),
            )),
        }
    }

    // == Execute ==
    /// Runs the command against `storage` and returns the response bytes,
    /// without the trailing newline.
    pub fn execute(self, storage: &StorageService) -> Bytes {
        match self {
            Command::Get { key } => storage
                .get(&key)
                .unwrap_or_else(|| Bytes::from_static(NOT_FOUND.as_bytes())),
            Command::Delete { key } => match storage.delete(&key) {
                Ok(()) => Bytes::from_static(DELETED.as_bytes()),
                Err(_) => Bytes::from_static(NOT_DELETED.as_bytes()),
            },
            Command::Put { key, value, ttl } => {
                storage.set(key, value, ttl);
                Bytes::from_static(STORED.as_bytes())
            }
            Command::Stats => match serde_json::to_vec(&storage.stats()) {
                Ok(json) => Bytes::from(json),
                Err(_) => Bytes::from_static(UNKNOWN.as_bytes()),
            },
        }
    }
}

fn parse_ttl(raw: &[u8]) -> Result<u64, CommandError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| CommandError::InvalidTtl(String::from_utf8_lossy(raw).into_owned()))
}
