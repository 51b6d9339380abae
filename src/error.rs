use crate::reader::ProtocolError;
use crate::resp::RespValue;

/// Command and server level errors.
///
/// Every variant except `Protocol` and `Io` renders as a single-line RESP
/// error reply and leaves the connection open. Protocol errors terminate the
/// offending connection (and only that connection); I/O errors end its read
/// loop silently.
#[derive(Debug, thiserror::Error)]
pub enum RudisError {
    #[error("ERR {0}")]
    Generic(String),

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR value is not an integer or out of range")]
    NotInteger,

    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpire(String),

    #[error(
        "WRONGTYPE Operation against a key holding the wrong kind of value: \
         key is a {actual} not a {expected}"
    )]
    WrongType {
        actual: &'static str,
        expected: &'static str,
    },

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArgCount(String),

    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    #[error("ERR Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RudisError {
    /// Render this error as a RESP error reply.
    pub fn to_resp(&self) -> RespValue {
        RespValue::error(self.to_string())
    }
}

pub type RudisResult<T> = Result<T, RudisError>;
