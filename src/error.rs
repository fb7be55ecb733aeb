//! The classified error taxonomy every command resolves to.
//!
//! Classification happens at the [`crate::command::RedisCommand`] boundary,
//! never inside the raw connection reader — the reader only ever produces
//! `RedisError::IOError` or propagates a protocol decode failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RedisError {
    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("WRONGTYPE {0}")]
    WrongType(String),

    #[error("codec error: {0}")]
    CodecError(String),

    #[error("MOVED to {address:?}: {detail}")]
    Moved { address: (String, u16), detail: String },

    #[error("ASK {address:?}: {detail}")]
    Ask { address: (String, u16), detail: String },

    #[error("BUSYGROUP {0}")]
    BusyGroup(String),

    #[error("NOGROUP {0}")]
    NoGroup(String),

    #[error("NOSCRIPT {0}")]
    NoScript(String),

    #[error("BUSY {0}")]
    Busy(String),

    #[error("NOTBUSY {0}")]
    NotBusy(String),

    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("cluster key error: {0}")]
    ClusterKeyError(String),

    #[error("cluster connection error: {0}")]
    ClusterConnectionError(String),

    #[error("cluster executor error: {0}")]
    ClusterKeyExecutorError(String),

    #[error("operation timed out")]
    Timeout,
}

impl RedisError {
    /// True for the variants the cluster executor's retry loop is allowed
    /// to retry: transport failures and the cluster redirect replies.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RedisError::IOError(_)
                | RedisError::Moved { .. }
                | RedisError::Ask { .. }
                | RedisError::ClusterConnectionError(_)
        )
    }

    /// Classifies a raw `-ERR ...` wire error by its leading token.
    ///
    /// `MOVED`/`ASK` carry a `<slot> <host>:<port>` payload that callers
    /// need parsed out; everything else is carried as free text. An
    /// unrecognized token (including bare `ERR`, and server replies like
    /// "no such client" from `CLIENT KILL`) falls through to
    /// `ProtocolError` rather than inventing a new variant.
    pub fn classify(text: &[u8]) -> RedisError {
        let text = String::from_utf8_lossy(text).into_owned();
        let mut parts = text.splitn(2, ' ');
        let token = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default().to_string();

        match token {
            "MOVED" => match parse_redirect(&rest) {
                Some((address, detail)) => RedisError::Moved { address, detail },
                None => RedisError::ProtocolError(text),
            },
            "ASK" => match parse_redirect(&rest) {
                Some((address, detail)) => RedisError::Ask { address, detail },
                None => RedisError::ProtocolError(text),
            },
            "WRONGTYPE" => RedisError::WrongType(rest),
            "BUSYGROUP" => RedisError::BusyGroup(rest),
            "NOGROUP" => RedisError::NoGroup(rest),
            "NOSCRIPT" => RedisError::NoScript(rest),
            "BUSY" => RedisError::Busy(rest),
            "NOTBUSY" => RedisError::NotBusy(rest),
            _ => RedisError::ProtocolError(text),
        }
    }
}

/// `MOVED`/`ASK` payloads are `<slot> <host>:<port>`. Returns the parsed
/// address plus the original rest-of-line as the error detail.
fn parse_redirect(rest: &str) -> Option<((String, u16), String)> {
    let mut fields = rest.splitn(2, ' ');
    let _slot = fields.next()?;
    let addr = fields.next()?;
    let (host, port) = addr.rsplit_once(':')?;
    let port: u16 = port.parse().ok()?;
    Some(((host.to_string(), port), rest.to_string()))
}
