//! Pluggable value (de)serialization, injected by the caller.
//!
//! The client never picks a serialization format for arbitrary payloads —
//! that's a capability the caller supplies, consumed by [`crate::resp::output::Arbitrary`]
//! and its `Input` counterpart. Keeping it a plain trait (rather than a
//! blanket `serde` bound) matches how this crate treats every other seam:
//! explicit capabilities passed by value, not ambient trait resolution.

use bytes::Bytes;

#[derive(Debug, Clone, thiserror::Error)]
#[error("codec failure: {0}")]
pub struct CodecError(pub String);

pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Bytes;
    fn decode(&self, bytes: Bytes) -> Result<T, CodecError>;
}

/// Identity codec for raw byte payloads, used by default where a caller
/// hasn't supplied one of their own.
#[derive(Debug, Default, Clone, Copy)]
pub struct BytesCodec;

impl Codec<Bytes> for BytesCodec {
    fn encode(&self, value: &Bytes) -> Bytes {
        value.clone()
    }

    fn decode(&self, bytes: Bytes) -> Result<Bytes, CodecError> {
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_codec_roundtrips() {
        let codec = BytesCodec;
        let original = Bytes::from_static(b"payload");
        let encoded = codec.encode(&original);
        let decoded = codec.decode(encoded).unwrap();
        assert_eq!(decoded, original);
    }
}
