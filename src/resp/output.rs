//! Typed reply decoders: each `Output<T>` turns a [`RespValue`] into a
//! typed result or a classified [`RedisError`].
//!
//! Shape mismatches are always `RedisError::ProtocolError` — a decoder
//! never panics on an unexpected reply, it reports what it saw.

use std::collections::HashMap;

use bytes::Bytes;

use crate::codec::Codec;
use crate::error::RedisError;

use super::RespValue;

pub trait Output<T> {
    fn decode(&self, value: RespValue) -> Result<T, RedisError>;
}

fn protocol_error(decoder: &str, value: &RespValue) -> RedisError {
    let mut rendered = format!("{:?}", value);
    rendered.truncate(120);
    RedisError::ProtocolError(format!("{decoder}: unexpected reply {rendered}"))
}

/// `+OK` -> `()`
#[derive(Debug, Default, Clone, Copy)]
pub struct Unit;

impl Output<()> for Unit {
    fn decode(&self, value: RespValue) -> Result<(), RedisError> {
        match value {
            RespValue::SimpleString(ref s) if s.as_ref() == b"OK" => Ok(()),
            other => Err(protocol_error("Unit", &other)),
        }
    }
}

/// `+RESET` -> `()`
#[derive(Debug, Default, Clone, Copy)]
pub struct Reset;

impl Output<()> for Reset {
    fn decode(&self, value: RespValue) -> Result<(), RedisError> {
        match value {
            RespValue::SimpleString(ref s) if s.as_ref() == b"RESET" => Ok(()),
            other => Err(protocol_error("Reset", &other)),
        }
    }
}

/// `:0`/`:1` -> `false`/`true`
#[derive(Debug, Default, Clone, Copy)]
pub struct Bool;

impl Output<bool> for Bool {
    fn decode(&self, value: RespValue) -> Result<bool, RedisError> {
        match value {
            RespValue::Integer(0) => Ok(false),
            RespValue::Integer(1) => Ok(true),
            other => Err(protocol_error("Bool", &other)),
        }
    }
}

/// `:n` -> `n`
#[derive(Debug, Default, Clone, Copy)]
pub struct Long;

impl Output<i64> for Long {
    fn decode(&self, value: RespValue) -> Result<i64, RedisError> {
        match value {
            RespValue::Integer(n) => Ok(n),
            other => Err(protocol_error("Long", &other)),
        }
    }
}

fn bulk_text(value: &RespValue) -> Option<&[u8]> {
    match value {
        RespValue::BulkString(b) => Some(b),
        RespValue::SimpleString(b) => Some(b),
        _ => None,
    }
}

/// bulk string -> `f64`
#[derive(Debug, Default, Clone, Copy)]
pub struct Double;

impl Output<f64> for Double {
    fn decode(&self, value: RespValue) -> Result<f64, RedisError> {
        let bytes = bulk_text(&value).ok_or_else(|| protocol_error("Double", &value))?;
        std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| protocol_error("Double", &value))
    }
}

/// bulk string -> `f64`, also accepting the literal tokens `inf`/`-inf`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DoubleOrInfinity;

impl Output<f64> for DoubleOrInfinity {
    fn decode(&self, value: RespValue) -> Result<f64, RedisError> {
        let bytes = bulk_text(&value).ok_or_else(|| protocol_error("DoubleOrInfinity", &value))?;
        let text = std::str::from_utf8(bytes).map_err(|_| protocol_error("DoubleOrInfinity", &value))?;
        match text {
            "inf" | "+inf" => Ok(f64::INFINITY),
            "-inf" => Ok(f64::NEG_INFINITY),
            other => other
                .parse::<f64>()
                .map_err(|_| protocol_error("DoubleOrInfinity", &value)),
        }
    }
}

/// bulk string -> raw bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct BulkStringOutput;

impl Output<Bytes> for BulkStringOutput {
    fn decode(&self, value: RespValue) -> Result<Bytes, RedisError> {
        match value {
            RespValue::BulkString(b) => Ok(b),
            other => Err(protocol_error("BulkString", &other)),
        }
    }
}

/// bulk string -> UTF-8 text
#[derive(Debug, Default, Clone, Copy)]
pub struct MultiString;

impl Output<String> for MultiString {
    fn decode(&self, value: RespValue) -> Result<String, RedisError> {
        match value {
            RespValue::BulkString(b) => String::from_utf8(b.to_vec())
                .map_err(|_| RedisError::ProtocolError("MultiString: invalid utf-8".into())),
            other => Err(protocol_error("MultiString", &other)),
        }
    }
}

/// bulk string -> `T` via an injected [`Codec`].
#[derive(Debug, Clone, Copy)]
pub struct ArbitraryOutput<C>(pub C);

impl<T, C: Codec<T>> Output<T> for ArbitraryOutput<C> {
    fn decode(&self, value: RespValue) -> Result<T, RedisError> {
        match value {
            RespValue::BulkString(b) => self
                .0
                .decode(b)
                .map_err(|e| RedisError::CodecError(e.0)),
            other => Err(protocol_error("Arbitrary", &other)),
        }
    }
}

/// Null bulk/null array -> `None`; else decode with the inner decoder.
#[derive(Debug, Clone, Copy)]
pub struct OptionalOutput<O>(pub O);

impl<T, O: Output<T>> Output<Option<T>> for OptionalOutput<O> {
    fn decode(&self, value: RespValue) -> Result<Option<T>, RedisError> {
        match value {
            RespValue::NullBulkString | RespValue::NullArray => Ok(None),
            other => self.0.decode(other).map(Some),
        }
    }
}

/// Null array -> empty; array -> map every element with the inner decoder.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<O>(pub O);

impl<T, O: Output<T>> Output<Vec<T>> for Chunk<O> {
    fn decode(&self, value: RespValue) -> Result<Vec<T>, RedisError> {
        match value {
            RespValue::NullArray => Ok(Vec::new()),
            RespValue::Array(items) => items.into_iter().map(|v| self.0.decode(v)).collect(),
            other => Err(protocol_error("Chunk", &other)),
        }
    }
}

/// Array of even length -> pairs, decoded with two inner decoders.
#[derive(Debug, Clone, Copy)]
pub struct ChunkTuple2<OA, OB>(pub OA, pub OB);

impl<A, B, OA: Output<A>, OB: Output<B>> Output<Vec<(A, B)>> for ChunkTuple2<OA, OB> {
    fn decode(&self, value: RespValue) -> Result<Vec<(A, B)>, RedisError> {
        let items = match value {
            RespValue::Array(items) => items,
            other => return Err(protocol_error("ChunkTuple2", &other)),
        };
        if items.len() % 2 != 0 {
            return Err(RedisError::ProtocolError(
                "ChunkTuple2: array has odd length".into(),
            ));
        }
        let mut out = Vec::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(a), Some(b)) = (iter.next(), iter.next()) {
            out.push((self.0.decode(a)?, self.1.decode(b)?));
        }
        Ok(out)
    }
}

/// Array of even length -> `HashMap<K, V>`.
#[derive(Debug, Clone, Copy)]
pub struct KeyValue<OK, OV>(pub OK, pub OV);

impl<K, V, OK, OV> Output<HashMap<K, V>> for KeyValue<OK, OV>
where
    K: std::hash::Hash + Eq,
    OK: Output<K>,
    OV: Output<V>,
{
    fn decode(&self, value: RespValue) -> Result<HashMap<K, V>, RedisError> {
        let items = match value {
            RespValue::Array(items) => items,
            other => return Err(protocol_error("KeyValue", &other)),
        };
        if items.len() % 2 != 0 {
            return Err(RedisError::ProtocolError(
                "KeyValue: array has odd length".into(),
            ));
        }
        let mut out = HashMap::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
            out.insert(self.0.decode(k)?, self.1.decode(v)?);
        }
        Ok(out)
    }
}

/// Expiry/TTL reply unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expiry {
    At(u64),
    NoExpire,
}

fn decode_duration(value: RespValue, unit_name: &str) -> Result<Expiry, RedisError> {
    match value {
        RespValue::Integer(-1) => Ok(Expiry::NoExpire),
        RespValue::Integer(-2) => Err(RedisError::ProtocolError(format!(
            "{unit_name}: key does not exist"
        ))),
        RespValue::Integer(n) if n >= 0 => Ok(Expiry::At(n as u64)),
        other => Err(protocol_error(unit_name, &other)),
    }
}

/// `:n` -> n milliseconds; `:-1` -> no expire; `:-2` -> not found (protocol error).
#[derive(Debug, Default, Clone, Copy)]
pub struct DurationMillisOutput;

impl Output<Expiry> for DurationMillisOutput {
    fn decode(&self, value: RespValue) -> Result<Expiry, RedisError> {
        decode_duration(value, "DurationMillis")
    }
}

/// `:n` -> n seconds; `:-1` -> no expire; `:-2` -> not found (protocol error).
#[derive(Debug, Default, Clone, Copy)]
pub struct DurationSecondsOutput;

impl Output<Expiry> for DurationSecondsOutput {
    fn decode(&self, value: RespValue) -> Result<Expiry, RedisError> {
        decode_duration(value, "DurationSeconds")
    }
}

/// `SCAN`-family reply: `[cursor, items]`.
#[derive(Debug, Clone, Copy)]
pub struct Scan<O>(pub O);

impl<T, O: Output<T> + Clone> Output<(u64, Vec<T>)> for Scan<O> {
    fn decode(&self, value: RespValue) -> Result<(u64, Vec<T>), RedisError> {
        let items = match value {
            RespValue::Array(items) if items.len() == 2 => items,
            other => return Err(protocol_error("Scan", &other)),
        };
        let mut iter = items.into_iter();
        let cursor_value = iter.next().unwrap();
        let items_value = iter.next().unwrap();

        let cursor_bytes = bulk_text(&cursor_value)
            .ok_or_else(|| protocol_error("Scan", &cursor_value))?
            .to_vec();
        let cursor = std::str::from_utf8(&cursor_bytes)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| RedisError::ProtocolError("Scan: non-numeric cursor".into()))?;

        let decoded_items = Chunk(self.0.clone()).decode(items_value)?;
        Ok((cursor, decoded_items))
    }
}

/// `SET ... [GET]` style reply: null bulk -> `false`; simple string -> `true`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SetReply;

impl Output<bool> for SetReply {
    fn decode(&self, value: RespValue) -> Result<bool, RedisError> {
        match value {
            RespValue::NullBulkString => Ok(false),
            RespValue::SimpleString(_) => Ok(true),
            other => Err(protocol_error("SetReply", &other)),
        }
    }
}

/// `TYPE` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedisType {
    String,
    List,
    Set,
    ZSet,
    Hash,
    Stream,
    None,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TypeOutput;

impl Output<RedisType> for TypeOutput {
    fn decode(&self, value: RespValue) -> Result<RedisType, RedisError> {
        let text = bulk_text(&value).ok_or_else(|| protocol_error("Type", &value))?;
        match text {
            b"string" => Ok(RedisType::String),
            b"list" => Ok(RedisType::List),
            b"set" => Ok(RedisType::Set),
            b"zset" => Ok(RedisType::ZSet),
            b"hash" => Ok(RedisType::Hash),
            b"stream" => Ok(RedisType::Stream),
            b"none" => Ok(RedisType::None),
            _ => Err(protocol_error("Type", &value)),
        }
    }
}

/// Geo coordinate pair from `GEOPOS`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPosition {
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GeoPositionOutput;

impl Output<GeoPosition> for GeoPositionOutput {
    fn decode(&self, value: RespValue) -> Result<GeoPosition, RedisError> {
        let items = match value {
            RespValue::Array(items) if items.len() == 2 => items,
            other => return Err(protocol_error("GeoPosition", &other)),
        };
        let longitude = Double.decode(items[0].clone())?;
        let latitude = Double.decode(items[1].clone())?;
        Ok(GeoPosition { longitude, latitude })
    }
}

/// One `GEORADIUS ... WITH*` result entry. Every optional field is present
/// only when the corresponding `WITH*` flag was requested — callers must
/// know which flags they sent, matching how Redis itself shapes the reply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeoRadiusMember {
    pub member: String,
    pub distance: Option<f64>,
    pub hash: Option<i64>,
    pub position: Option<GeoPosition>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GeoRadiusOutput {
    pub with_dist: bool,
    pub with_hash: bool,
    pub with_coord: bool,
}

impl Output<Vec<GeoRadiusMember>> for GeoRadiusOutput {
    fn decode(&self, value: RespValue) -> Result<Vec<GeoRadiusMember>, RedisError> {
        let items = match value {
            RespValue::Array(items) => items,
            other => return Err(protocol_error("GeoRadius", &other)),
        };
        items
            .into_iter()
            .map(|item| self.decode_one(item))
            .collect()
    }
}

impl GeoRadiusOutput {
    fn decode_one(&self, value: RespValue) -> Result<GeoRadiusMember, RedisError> {
        if !(self.with_dist || self.with_hash || self.with_coord) {
            let member = MultiString.decode(value)?;
            return Ok(GeoRadiusMember {
                member,
                ..Default::default()
            });
        }
        let mut fields = match value {
            RespValue::Array(items) => items.into_iter(),
            other => return Err(protocol_error("GeoRadius", &other)),
        };
        let member = MultiString.decode(fields.next().ok_or_else(|| {
            RedisError::ProtocolError("GeoRadius: missing member field".into())
        })?)?;
        let mut result = GeoRadiusMember {
            member,
            ..Default::default()
        };
        if self.with_dist {
            result.distance = Some(Double.decode(fields.next().ok_or_else(|| {
                RedisError::ProtocolError("GeoRadius: missing distance field".into())
            })?)?);
        }
        if self.with_hash {
            result.hash = Some(Long.decode(fields.next().ok_or_else(|| {
                RedisError::ProtocolError("GeoRadius: missing hash field".into())
            })?)?);
        }
        if self.with_coord {
            result.position = Some(GeoPositionOutput.decode(fields.next().ok_or_else(|| {
                RedisError::ProtocolError("GeoRadius: missing coord field".into())
            })?)?);
        }
        Ok(result)
    }
}

/// `LCS` reply shapes: plain string, `LEN`, or `IDX [MATCHES ...]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Lcs {
    Plain(String),
    Length(i64),
    Matches {
        matches: Vec<LcsMatch>,
        len: i64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LcsMatch {
    pub first: (i64, i64),
    pub second: (i64, i64),
    pub match_len: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
pub enum LcsOutput {
    Plain,
    Length,
    Matches,
}

impl Output<Lcs> for LcsOutput {
    fn decode(&self, value: RespValue) -> Result<Lcs, RedisError> {
        match self {
            LcsOutput::Plain => MultiString.decode(value).map(Lcs::Plain),
            LcsOutput::Length => Long.decode(value).map(Lcs::Length),
            LcsOutput::Matches => {
                let pairs = fields_by_key(value, "Lcs")?;
                let matches_value = pairs
                    .get("matches")
                    .cloned()
                    .ok_or_else(|| RedisError::ProtocolError("Lcs: missing matches".into()))?;
                let len = pairs
                    .get("len")
                    .cloned()
                    .map(|v| Long.decode(v))
                    .transpose()?
                    .unwrap_or(0);
                let items = match matches_value {
                    RespValue::Array(items) => items,
                    other => return Err(protocol_error("Lcs", &other)),
                };
                let matches = items
                    .into_iter()
                    .map(decode_lcs_match)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Lcs::Matches { matches, len })
            }
        }
    }
}

fn decode_range(value: RespValue) -> Result<(i64, i64), RedisError> {
    match value {
        RespValue::Array(items) if items.len() == 2 => {
            Ok((Long.decode(items[0].clone())?, Long.decode(items[1].clone())?))
        }
        other => Err(protocol_error("Lcs range", &other)),
    }
}

fn decode_lcs_match(value: RespValue) -> Result<LcsMatch, RedisError> {
    let mut items = match value {
        RespValue::Array(items) => items.into_iter(),
        other => return Err(protocol_error("LcsMatch", &other)),
    };
    let first = decode_range(items.next().ok_or_else(|| {
        RedisError::ProtocolError("LcsMatch: missing first range".into())
    })?)?;
    let second = decode_range(items.next().ok_or_else(|| {
        RedisError::ProtocolError("LcsMatch: missing second range".into())
    })?)?;
    let match_len = items.next().map(|v| Long.decode(v)).transpose()?;
    Ok(LcsMatch {
        first,
        second,
        match_len,
    })
}

/// `XPENDING` summary form (no start/end/count given).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XPendingSummary {
    pub count: i64,
    pub smallest_id: Option<String>,
    pub greatest_id: Option<String>,
    pub consumers: Vec<(String, i64)>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct XPendingOutput;

impl Output<XPendingSummary> for XPendingOutput {
    fn decode(&self, value: RespValue) -> Result<XPendingSummary, RedisError> {
        let mut items = match value {
            RespValue::Array(items) if items.len() == 4 => items.into_iter(),
            other => return Err(protocol_error("XPending", &other)),
        };
        let count = Long.decode(items.next().unwrap())?;
        let smallest_id = OptionalOutput(MultiString).decode(items.next().unwrap())?;
        let greatest_id = OptionalOutput(MultiString).decode(items.next().unwrap())?;
        let consumers = match items.next().unwrap() {
            RespValue::NullArray => Vec::new(),
            RespValue::Array(rows) => rows
                .into_iter()
                .map(|row| match row {
                    RespValue::Array(fields) if fields.len() == 2 => {
                        let name = MultiString.decode(fields[0].clone())?;
                        let pending_str = MultiString.decode(fields[1].clone())?;
                        let pending = pending_str.parse::<i64>().map_err(|_| {
                            RedisError::ProtocolError("XPending: non-numeric pending count".into())
                        })?;
                        Ok((name, pending))
                    }
                    other => Err(protocol_error("XPending consumer row", &other)),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => return Err(protocol_error("XPending", &other)),
        };
        Ok(XPendingSummary {
            count,
            smallest_id,
            greatest_id,
            consumers,
        })
    }
}

/// One `XPENDING ... start end count` / `XCLAIM` PEL entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMessage {
    pub id: String,
    pub consumer: String,
    pub idle_ms: i64,
    pub delivery_count: i64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PendingMessagesOutput;

impl Output<Vec<PendingMessage>> for PendingMessagesOutput {
    fn decode(&self, value: RespValue) -> Result<Vec<PendingMessage>, RedisError> {
        let items = match value {
            RespValue::Array(items) => items,
            other => return Err(protocol_error("PendingMessages", &other)),
        };
        items
            .into_iter()
            .map(|row| match row {
                RespValue::Array(fields) if fields.len() == 4 => {
                    Ok(PendingMessage {
                        id: MultiString.decode(fields[0].clone())?,
                        consumer: MultiString.decode(fields[1].clone())?,
                        idle_ms: Long.decode(fields[2].clone())?,
                        delivery_count: Long.decode(fields[3].clone())?,
                    })
                }
                other => Err(protocol_error("PendingMessage", &other)),
            })
            .collect()
    }
}

/// One entry of a stream: an ID plus its field/value pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamEntry {
    pub id: String,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StreamEntryOutput;

impl Output<StreamEntry> for StreamEntryOutput {
    fn decode(&self, value: RespValue) -> Result<StreamEntry, RedisError> {
        let mut items = match value {
            RespValue::Array(items) if items.len() == 2 => items.into_iter(),
            other => return Err(protocol_error("StreamEntry", &other)),
        };
        let id = MultiString.decode(items.next().unwrap())?;
        let fields = ChunkTuple2(MultiString, MultiString).decode(items.next().unwrap())?;
        Ok(StreamEntry { id, fields })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StreamEntriesOutput;

impl Output<Vec<StreamEntry>> for StreamEntriesOutput {
    fn decode(&self, value: RespValue) -> Result<Vec<StreamEntry>, RedisError> {
        Chunk(StreamEntryOutput).decode(value)
    }
}

/// `XCLAIM`/`XAUTOCLAIM` reply: claimed entries plus (for `XAUTOCLAIM`) the
/// next cursor and any ids that were deleted before they could be claimed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamClaimed {
    pub next_cursor: Option<String>,
    pub entries: Vec<StreamEntry>,
    pub deleted_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum StreamClaimedOutput {
    /// `XCLAIM` — reply is just the entry array.
    Claim,
    /// `XAUTOCLAIM` — reply is `[cursor, entries, deleted_ids]`.
    AutoClaim,
}

impl Output<StreamClaimed> for StreamClaimedOutput {
    fn decode(&self, value: RespValue) -> Result<StreamClaimed, RedisError> {
        match self {
            StreamClaimedOutput::Claim => Ok(StreamClaimed {
                next_cursor: None,
                entries: StreamEntriesOutput.decode(value)?,
                deleted_ids: Vec::new(),
            }),
            StreamClaimedOutput::AutoClaim => {
                let mut items = match value {
                    RespValue::Array(items) if items.len() == 3 => items.into_iter(),
                    other => return Err(protocol_error("StreamClaimed", &other)),
                };
                let next_cursor = Some(MultiString.decode(items.next().unwrap())?);
                let entries = StreamEntriesOutput.decode(items.next().unwrap())?;
                let deleted_ids = Chunk(MultiString).decode(items.next().unwrap())?;
                Ok(StreamClaimed {
                    next_cursor,
                    entries,
                    deleted_ids,
                })
            }
        }
    }
}

/// Converts a RESP array of alternating (key, value) bulk strings into a
/// lookup map, the way every `XINFO` decoder below consumes its reply —
/// by name, never by position, so a server that reorders fields still
/// decodes correctly.
fn fields_by_key(value: RespValue, decoder_name: &str) -> Result<HashMap<String, RespValue>, RedisError> {
    let items = match value {
        RespValue::Array(items) => items,
        other => return Err(protocol_error(decoder_name, &other)),
    };
    if items.len() % 2 != 0 {
        return Err(RedisError::ProtocolError(format!(
            "{decoder_name}: array has odd length"
        )));
    }
    let mut map = HashMap::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
        let key = MultiString.decode(k)?;
        map.insert(key, v);
    }
    Ok(map)
}

fn take_long(fields: &HashMap<String, RespValue>, key: &str) -> Result<i64, RedisError> {
    match fields.get(key) {
        Some(v) => Long.decode(v.clone()),
        None => Ok(0),
    }
}

fn take_string(fields: &HashMap<String, RespValue>, key: &str) -> Result<String, RedisError> {
    match fields.get(key) {
        Some(v) => MultiString.decode(v.clone()),
        None => Ok(String::new()),
    }
}

/// `XINFO STREAM` basic form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamInfo {
    pub length: i64,
    pub radix_tree_keys: i64,
    pub radix_tree_nodes: i64,
    pub groups: i64,
    pub last_generated_id: String,
    pub max_deleted_entry_id: String,
    pub entries_added: i64,
    pub first_entry: Option<StreamEntry>,
    pub last_entry: Option<StreamEntry>,
}

/// `XINFO STREAM FULL` form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamInfoFull {
    pub length: i64,
    pub radix_tree_keys: i64,
    pub radix_tree_nodes: i64,
    pub last_generated_id: String,
    pub max_deleted_entry_id: String,
    pub entries_added: i64,
    pub entries: Vec<StreamEntry>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StreamInfoOutput;

impl Output<StreamInfo> for StreamInfoOutput {
    fn decode(&self, value: RespValue) -> Result<StreamInfo, RedisError> {
        let fields = fields_by_key(value, "StreamInfo")?;
        let first_entry = match fields.get("first-entry") {
            Some(RespValue::NullArray) | Some(RespValue::NullBulkString) | None => None,
            Some(v) => Some(StreamEntryOutput.decode(v.clone())?),
        };
        let last_entry = match fields.get("last-entry") {
            Some(RespValue::NullArray) | Some(RespValue::NullBulkString) | None => None,
            Some(v) => Some(StreamEntryOutput.decode(v.clone())?),
        };
        Ok(StreamInfo {
            length: take_long(&fields, "length")?,
            radix_tree_keys: take_long(&fields, "radix-tree-keys")?,
            radix_tree_nodes: take_long(&fields, "radix-tree-nodes")?,
            groups: take_long(&fields, "groups")?,
            last_generated_id: take_string(&fields, "last-generated-id")?,
            max_deleted_entry_id: take_string(&fields, "max-deleted-entry-id")?,
            entries_added: take_long(&fields, "entries-added")?,
            first_entry,
            last_entry,
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StreamInfoFullOutput;

impl Output<StreamInfoFull> for StreamInfoFullOutput {
    fn decode(&self, value: RespValue) -> Result<StreamInfoFull, RedisError> {
        let fields = fields_by_key(value, "StreamInfoFull")?;
        let entries = match fields.get("entries") {
            Some(v) => StreamEntriesOutput.decode(v.clone())?,
            None => Vec::new(),
        };
        Ok(StreamInfoFull {
            length: take_long(&fields, "length")?,
            radix_tree_keys: take_long(&fields, "radix-tree-keys")?,
            radix_tree_nodes: take_long(&fields, "radix-tree-nodes")?,
            last_generated_id: take_string(&fields, "last-generated-id")?,
            max_deleted_entry_id: take_string(&fields, "max-deleted-entry-id")?,
            entries_added: take_long(&fields, "entries-added")?,
            entries,
        })
    }
}

/// One row of `XINFO GROUPS`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamGroupInfo {
    pub name: String,
    pub consumers: i64,
    pub pending: i64,
    pub last_delivered_id: String,
    pub entries_read: i64,
    pub lag: i64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StreamGroupsInfoOutput;

impl Output<Vec<StreamGroupInfo>> for StreamGroupsInfoOutput {
    fn decode(&self, value: RespValue) -> Result<Vec<StreamGroupInfo>, RedisError> {
        let rows = match value {
            RespValue::Array(rows) => rows,
            other => return Err(protocol_error("StreamGroupsInfo", &other)),
        };
        rows.into_iter()
            .map(|row| {
                let fields = fields_by_key(row, "StreamGroupsInfo")?;
                Ok(StreamGroupInfo {
                    name: take_string(&fields, "name")?,
                    consumers: take_long(&fields, "consumers")?,
                    pending: take_long(&fields, "pending")?,
                    last_delivered_id: take_string(&fields, "last-delivered-id")?,
                    entries_read: take_long(&fields, "entries-read")?,
                    lag: take_long(&fields, "lag")?,
                })
            })
            .collect()
    }
}

/// One row of `XINFO CONSUMERS`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamConsumerInfo {
    pub name: String,
    pub pending: i64,
    pub idle: i64,
    pub active_time: i64,
    pub seen_time: i64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StreamConsumersInfoOutput;

impl Output<Vec<StreamConsumerInfo>> for StreamConsumersInfoOutput {
    fn decode(&self, value: RespValue) -> Result<Vec<StreamConsumerInfo>, RedisError> {
        let rows = match value {
            RespValue::Array(rows) => rows,
            other => return Err(protocol_error("StreamConsumersInfo", &other)),
        };
        rows.into_iter()
            .map(|row| {
                let fields = fields_by_key(row, "StreamConsumersInfo")?;
                Ok(StreamConsumerInfo {
                    name: take_string(&fields, "name")?,
                    pending: take_long(&fields, "pending")?,
                    idle: take_long(&fields, "idle")?,
                    active_time: take_long(&fields, "active-time")?,
                    seen_time: take_long(&fields, "seen-time")?,
                })
            })
            .collect()
    }
}

/// `CLUSTER SLOTS` node descriptor: `[ip, port, node_id?]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterNode {
    pub host: String,
    pub port: u16,
    pub node_id: Option<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ClusterNodeOutput;

impl Output<ClusterNode> for ClusterNodeOutput {
    fn decode(&self, value: RespValue) -> Result<ClusterNode, RedisError> {
        let items = match value {
            RespValue::Array(items) if items.len() >= 2 => items,
            other => return Err(protocol_error("ClusterNode", &other)),
        };
        let host = MultiString.decode(items[0].clone())?;
        let port = Long.decode(items[1].clone())? as u16;
        let node_id = match items.get(2) {
            Some(v) => Some(MultiString.decode(v.clone())?),
            None => None,
        };
        Ok(ClusterNode { host, port, node_id })
    }
}

/// `CLUSTER SLOTS` partition: `[start, end, master, replica...]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterPartition {
    pub slot_start: u16,
    pub slot_end: u16,
    pub master: ClusterNode,
    pub replicas: Vec<ClusterNode>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ClusterPartitionOutput;

impl Output<ClusterPartition> for ClusterPartitionOutput {
    fn decode(&self, value: RespValue) -> Result<ClusterPartition, RedisError> {
        let mut items = match value {
            RespValue::Array(items) if items.len() >= 3 => items.into_iter(),
            other => return Err(protocol_error("ClusterPartition", &other)),
        };
        let slot_start = Long.decode(items.next().unwrap())? as u16;
        let slot_end = Long.decode(items.next().unwrap())? as u16;
        let master = ClusterNodeOutput.decode(items.next().ok_or_else(|| {
            RedisError::ProtocolError("ClusterPartition: missing master entry".into())
        })?)?;
        let replicas = items
            .map(|v| ClusterNodeOutput.decode(v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ClusterPartition {
            slot_start,
            slot_end,
            master,
            replicas,
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ClusterSlotsOutput;

impl Output<Vec<ClusterPartition>> for ClusterSlotsOutput {
    fn decode(&self, value: RespValue) -> Result<Vec<ClusterPartition>, RedisError> {
        Chunk(ClusterPartitionOutput).decode(value)
    }
}

/// `SUBSCRIBE`/`PSUBSCRIBE` bookkeeping: which kind of key a push message's
/// subscription count applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionKey {
    Channel(String),
    Pattern(String),
}

/// A decoded out-of-band push message, as delivered over a subscribed
/// connection. The stream-multiplexing surface that routes these to
/// per-channel listeners is out of this crate's scope; only the decoding
/// of one message lives here.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    Subscribe { key: SubscriptionKey, count: i64 },
    Unsubscribe { key: SubscriptionKey, count: i64 },
    Message { channel: String, payload: Bytes },
    PMessage {
        pattern: String,
        channel: String,
        payload: Bytes,
    },
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PushMessageOutput;

impl Output<PushMessage> for PushMessageOutput {
    fn decode(&self, value: RespValue) -> Result<PushMessage, RedisError> {
        let items = match value {
            RespValue::Array(items) => items,
            other => return Err(protocol_error("PushMessage", &other)),
        };
        let mut iter = items.into_iter();
        let kind = MultiString.decode(
            iter.next()
                .ok_or_else(|| RedisError::ProtocolError("PushMessage: empty array".into()))?,
        )?;
        match kind.as_str() {
            "subscribe" | "psubscribe" => {
                let key_text = MultiString.decode(iter.next().ok_or_else(|| {
                    RedisError::ProtocolError("PushMessage: missing key".into())
                })?)?;
                let count = Long.decode(iter.next().ok_or_else(|| {
                    RedisError::ProtocolError("PushMessage: missing count".into())
                })?)?;
                let key = if kind == "subscribe" {
                    SubscriptionKey::Channel(key_text)
                } else {
                    SubscriptionKey::Pattern(key_text)
                };
                Ok(PushMessage::Subscribe { key, count })
            }
            "unsubscribe" | "punsubscribe" => {
                let key_text = MultiString.decode(iter.next().ok_or_else(|| {
                    RedisError::ProtocolError("PushMessage: missing key".into())
                })?)?;
                let count = Long.decode(iter.next().ok_or_else(|| {
                    RedisError::ProtocolError("PushMessage: missing count".into())
                })?)?;
                let key = if kind == "unsubscribe" {
                    SubscriptionKey::Channel(key_text)
                } else {
                    SubscriptionKey::Pattern(key_text)
                };
                Ok(PushMessage::Unsubscribe { key, count })
            }
            "message" => {
                let channel = MultiString.decode(iter.next().ok_or_else(|| {
                    RedisError::ProtocolError("PushMessage: missing channel".into())
                })?)?;
                let payload = BulkStringOutput.decode(iter.next().ok_or_else(|| {
                    RedisError::ProtocolError("PushMessage: missing payload".into())
                })?)?;
                Ok(PushMessage::Message { channel, payload })
            }
            "pmessage" => {
                let pattern = MultiString.decode(iter.next().ok_or_else(|| {
                    RedisError::ProtocolError("PushMessage: missing pattern".into())
                })?)?;
                let channel = MultiString.decode(iter.next().ok_or_else(|| {
                    RedisError::ProtocolError("PushMessage: missing channel".into())
                })?)?;
                let payload = BulkStringOutput.decode(iter.next().ok_or_else(|| {
                    RedisError::ProtocolError("PushMessage: missing payload".into())
                })?)?;
                Ok(PushMessage::PMessage {
                    pattern,
                    channel,
                    payload,
                })
            }
            other => Err(RedisError::ProtocolError(format!(
                "PushMessage: unknown push kind {other}"
            ))),
        }
    }
}

/// `PUBSUB NUMSUB` reply: alternating channel/count pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumSubResponse {
    pub counts: Vec<(String, i64)>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NumSubOutput;

impl Output<NumSubResponse> for NumSubOutput {
    fn decode(&self, value: RespValue) -> Result<NumSubResponse, RedisError> {
        let counts = ChunkTuple2(MultiString, Long).decode(value)?;
        Ok(NumSubResponse { counts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> RespValue {
        RespValue::BulkString(Bytes::copy_from_slice(s.as_bytes()))
    }

    #[test]
    fn unit_accepts_ok_only() {
        assert!(Unit.decode(RespValue::SimpleString(Bytes::from_static(b"OK"))).is_ok());
        assert!(Unit.decode(RespValue::Integer(1)).is_err());
    }

    #[test]
    fn optional_maps_nulls_to_none() {
        assert_eq!(
            OptionalOutput(BulkStringOutput).decode(RespValue::NullBulkString).unwrap(),
            None
        );
        assert_eq!(
            OptionalOutput(BulkStringOutput)
                .decode(bulk("bar"))
                .unwrap(),
            Some(Bytes::from_static(b"bar"))
        );
    }

    #[test]
    fn chunk_tuple2_rejects_odd_length() {
        let value = RespValue::Array(vec![bulk("a")]);
        assert!(ChunkTuple2(MultiString, MultiString).decode(value).is_err());
    }

    #[test]
    fn duration_maps_sentinels() {
        assert_eq!(
            DurationMillisOutput.decode(RespValue::Integer(-1)).unwrap(),
            Expiry::NoExpire
        );
        assert!(DurationMillisOutput.decode(RespValue::Integer(-2)).is_err());
        assert_eq!(
            DurationMillisOutput.decode(RespValue::Integer(1000)).unwrap(),
            Expiry::At(1000)
        );
    }

    #[test]
    fn scan_decodes_cursor_and_items() {
        let value = RespValue::Array(vec![
            bulk("12"),
            RespValue::Array(vec![bulk("a"), bulk("b")]),
        ]);
        let (cursor, items) = Scan(MultiString).decode(value).unwrap();
        assert_eq!(cursor, 12);
        assert_eq!(items, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn double_or_infinity_parses_tokens() {
        assert_eq!(DoubleOrInfinity.decode(bulk("inf")).unwrap(), f64::INFINITY);
        assert_eq!(
            DoubleOrInfinity.decode(bulk("-inf")).unwrap(),
            f64::NEG_INFINITY
        );
        assert_eq!(DoubleOrInfinity.decode(bulk("1.5")).unwrap(), 1.5);
    }

    #[test]
    fn stream_info_ignores_field_order() {
        // groups/length/last-generated-id deliberately out of documented order
        let value = RespValue::Array(vec![
            bulk("groups"),
            RespValue::Integer(2),
            bulk("last-generated-id"),
            bulk("5-0"),
            bulk("length"),
            RespValue::Integer(9),
        ]);
        let info = StreamInfoOutput.decode(value).unwrap();
        assert_eq!(info.groups, 2);
        assert_eq!(info.length, 9);
        assert_eq!(info.last_generated_id, "5-0");
        assert_eq!(info.radix_tree_keys, 0);
    }

    #[test]
    fn stream_info_odd_length_is_protocol_error() {
        let value = RespValue::Array(vec![bulk("length")]);
        assert!(StreamInfoOutput.decode(value).is_err());
    }

    #[test]
    fn push_message_discriminates_on_first_field() {
        let value = RespValue::Array(vec![
            bulk("message"),
            bulk("news"),
            RespValue::BulkString(Bytes::from_static(b"hello")),
        ]);
        match PushMessageOutput.decode(value).unwrap() {
            PushMessage::Message { channel, payload } => {
                assert_eq!(channel, "news");
                assert_eq!(payload, Bytes::from_static(b"hello"));
            }
            other => panic!("unexpected variant {other:?}"),
        }
    }

    #[test]
    fn push_message_subscribe_carries_channel_key() {
        let value = RespValue::Array(vec![bulk("subscribe"), bulk("news"), RespValue::Integer(1)]);
        match PushMessageOutput.decode(value).unwrap() {
            PushMessage::Subscribe { key, count } => {
                assert_eq!(key, SubscriptionKey::Channel("news".into()));
                assert_eq!(count, 1);
            }
            other => panic!("unexpected variant {other:?}"),
        }
    }

    #[test]
    fn cluster_partition_decodes_master_and_replicas() {
        let value = RespValue::Array(vec![
            RespValue::Integer(0),
            RespValue::Integer(5460),
            RespValue::Array(vec![bulk("127.0.0.1"), RespValue::Integer(30001)]),
            RespValue::Array(vec![bulk("127.0.0.1"), RespValue::Integer(30004)]),
        ]);
        let partition = ClusterPartitionOutput.decode(value).unwrap();
        assert_eq!(partition.slot_start, 0);
        assert_eq!(partition.slot_end, 5460);
        assert_eq!(partition.master.port, 30001);
        assert_eq!(partition.replicas.len(), 1);
        assert_eq!(partition.replicas[0].port, 30004);
    }
}
