//! Typed argument encoders: each `Input<T>` turns one Rust value into zero
//! or more RESP bulk strings, in the order the wire protocol expects.
//!
//! These are the building blocks [`crate::command::RedisCommand`] composes;
//! the per-command wrapper methods that call them (`GET`, `SET`, `XADD`, …)
//! are outside this crate's scope — only the shared encoding machinery they
//! all route through lives here.

use std::time::Duration;

use bytes::Bytes;

use crate::codec::Codec;

/// Encodes a value of type `T` into zero or more bulk strings appended to
/// `out`, in wire order.
pub trait Input<T> {
    fn encode(&self, value: T, out: &mut Vec<Bytes>);
}

/// UTF-8 text, encoded as a single bulk string.
#[derive(Debug, Default, Clone, Copy)]
pub struct Str;

impl Input<String> for Str {
    fn encode(&self, value: String, out: &mut Vec<Bytes>) {
        out.push(Bytes::from(value));
    }
}

impl Input<&str> for Str {
    fn encode(&self, value: &str, out: &mut Vec<Bytes>) {
        out.push(Bytes::copy_from_slice(value.as_bytes()));
    }
}

/// No arguments beyond the verb itself — `PING`, `CLUSTER SLOTS`,
/// `ASKING`, and similar.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoArgs;

impl Input<()> for NoArgs {
    fn encode(&self, _value: (), _out: &mut Vec<Bytes>) {}
}

/// Arbitrary 8-bit payload, encoded as a single bulk string.
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteChunk;

impl Input<Bytes> for ByteChunk {
    fn encode(&self, value: Bytes, out: &mut Vec<Bytes>) {
        out.push(value);
    }
}

/// A signed integer, textually encoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct LongInt;

impl Input<i64> for LongInt {
    fn encode(&self, value: i64, out: &mut Vec<Bytes>) {
        out.push(Bytes::from(value.to_string()));
    }
}

/// A floating point score, textually encoded (no special `inf` handling on
/// the way out — Redis accepts `+inf`/`-inf` literally if the caller passes
/// them as such via [`Str`] instead).
#[derive(Debug, Default, Clone, Copy)]
pub struct Double;

impl Input<f64> for Double {
    fn encode(&self, value: f64, out: &mut Vec<Bytes>) {
        out.push(Bytes::from(value.to_string()));
    }
}

/// Absolute instant, encoded as whole seconds since the epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSeconds;

impl Input<std::time::SystemTime> for InstantSeconds {
    fn encode(&self, value: std::time::SystemTime, out: &mut Vec<Bytes>) {
        let secs = value
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        out.push(Bytes::from(secs.to_string()));
    }
}

/// Absolute instant, encoded as whole milliseconds since the epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantMillis;

impl Input<std::time::SystemTime> for InstantMillis {
    fn encode(&self, value: std::time::SystemTime, out: &mut Vec<Bytes>) {
        let millis = value
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        out.push(Bytes::from(millis.to_string()));
    }
}

/// A relative duration, encoded as whole seconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct DurationSeconds;

impl Input<Duration> for DurationSeconds {
    fn encode(&self, value: Duration, out: &mut Vec<Bytes>) {
        out.push(Bytes::from(value.as_secs().to_string()));
    }
}

/// A relative duration, encoded as whole milliseconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct DurationMillis;

impl Input<Duration> for DurationMillis {
    fn encode(&self, value: Duration, out: &mut Vec<Bytes>) {
        out.push(Bytes::from(value.as_millis().to_string()));
    }
}

/// A glob-style key pattern, as used by `SCAN ... MATCH` and `KEYS`. Passed
/// through verbatim — Redis interprets the glob syntax server-side, so
/// there is nothing to compile here.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pattern;

impl Input<String> for Pattern {
    fn encode(&self, value: String, out: &mut Vec<Bytes>) {
        out.push(Bytes::from(value));
    }
}

/// Wraps an encoder `E`, encoding `Some(value)` through it and emitting
/// nothing for `None`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OptionalInput<E>(pub E);

impl<T, E: Input<T>> Input<Option<T>> for OptionalInput<E> {
    fn encode(&self, value: Option<T>, out: &mut Vec<Bytes>) {
        if let Some(inner) = value {
            self.0.encode(inner, out);
        }
    }
}

/// Wraps an encoder `E`, applying it to every element. Callers are
/// responsible for the "at least one" invariant documented for commands
/// like `MSET`; encoding an empty list here simply emits nothing, since
/// the invariant is about command validity, not encoder behavior.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonEmptyListInput<E>(pub E);

impl<T, E: Input<T>> Input<Vec<T>> for NonEmptyListInput<E> {
    fn encode(&self, value: Vec<T>, out: &mut Vec<Bytes>) {
        for item in value {
            self.0.encode(item, out);
        }
    }
}

/// Wraps an encoder `E`, applying it to zero or more elements.
#[derive(Debug, Default, Clone, Copy)]
pub struct VarargsInput<E>(pub E);

impl<T, E: Input<T>> Input<Vec<T>> for VarargsInput<E> {
    fn encode(&self, value: Vec<T>, out: &mut Vec<Bytes>) {
        for item in value {
            self.0.encode(item, out);
        }
    }
}

/// Concatenates two encoders' output in order — used for score/member,
/// longitude/latitude, and stream entry pairs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tuple2Input<E1, E2>(pub E1, pub E2);

impl<A, B, E1: Input<A>, E2: Input<B>> Input<(A, B)> for Tuple2Input<E1, E2> {
    fn encode(&self, value: (A, B), out: &mut Vec<Bytes>) {
        self.0.encode(value.0, out);
        self.1.encode(value.1, out);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Tuple3Input<E1, E2, E3>(pub E1, pub E2, pub E3);

impl<A, B, C, E1: Input<A>, E2: Input<B>, E3: Input<C>> Input<(A, B, C)>
    for Tuple3Input<E1, E2, E3>
{
    fn encode(&self, value: (A, B, C), out: &mut Vec<Bytes>) {
        self.0.encode(value.0, out);
        self.1.encode(value.1, out);
        self.2.encode(value.2, out);
    }
}

/// Score/member pair for sorted-set commands: score first, member second.
pub type ScoreMember = Tuple2Input<Double, Str>;

/// Longitude/latitude pair for geo commands.
pub type LonLat = Tuple2Input<Double, Double>;

/// Sentinel aggregate function for `ZUNIONSTORE`/`ZINTERSTORE ... AGGREGATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Min,
    Max,
}

impl Aggregate {
    fn token(self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }
}

/// Literal-token flag encoders: each emits its fixed wire token(s) exactly
/// once when the caller passes the corresponding argument, nothing
/// otherwise. Parameterized variants (`Limit`, `Store`, `Weights`,
/// `AggregateFn`) carry their payload through the usual composite encoders.
pub mod flags {
    use super::*;

    macro_rules! literal_flag {
        ($name:ident, $token:literal) => {
            #[derive(Debug, Default, Clone, Copy)]
            pub struct $name;

            impl Input<()> for $name {
                fn encode(&self, _value: (), out: &mut Vec<Bytes>) {
                    out.push(Bytes::from_static($token.as_bytes()));
                }
            }
        };
    }

    literal_flag!(WithScores, "WITHSCORES");
    literal_flag!(Ch, "CH");
    literal_flag!(Xx, "XX");
    literal_flag!(Nx, "NX");
    literal_flag!(Incr, "INCR");
    literal_flag!(Copy, "COPY");
    literal_flag!(Replace, "REPLACE");
    literal_flag!(AbsTtl, "ABSTTL");
    literal_flag!(IdleTime, "IDLETIME");
    literal_flag!(Freq, "FREQ");
    literal_flag!(WithCoord, "WITHCOORD");
    literal_flag!(WithDist, "WITHDIST");
    literal_flag!(WithHash, "WITHHASH");
    literal_flag!(Match, "MATCH");
    literal_flag!(Weights, "WEIGHTS");
    literal_flag!(MkStream, "MKSTREAM");
    literal_flag!(Force, "FORCE");
    literal_flag!(JustId, "JUSTID");
    literal_flag!(NoAck, "NOACK");
    literal_flag!(By, "BY");
    literal_flag!(Get, "GET");
    literal_flag!(Asc, "ASC");
    literal_flag!(Desc, "DESC");
    literal_flag!(Alpha, "ALPHA");

    /// `COUNT n`
    #[derive(Debug, Default, Clone, Copy)]
    pub struct Count;

    impl Input<i64> for Count {
        fn encode(&self, value: i64, out: &mut Vec<Bytes>) {
            out.push(Bytes::from_static(b"COUNT"));
            LongInt.encode(value, out);
        }
    }

    /// `LIMIT offset count`
    #[derive(Debug, Default, Clone, Copy)]
    pub struct Limit;

    impl Input<(i64, i64)> for Limit {
        fn encode(&self, value: (i64, i64), out: &mut Vec<Bytes>) {
            out.push(Bytes::from_static(b"LIMIT"));
            LongInt.encode(value.0, out);
            LongInt.encode(value.1, out);
        }
    }

    /// `STORE key`
    #[derive(Debug, Default, Clone, Copy)]
    pub struct Store;

    impl Input<String> for Store {
        fn encode(&self, value: String, out: &mut Vec<Bytes>) {
            out.push(Bytes::from_static(b"STORE"));
            Str.encode(value, out);
        }
    }

    /// `STOREDIST key`
    #[derive(Debug, Default, Clone, Copy)]
    pub struct StoreDist;

    impl Input<String> for StoreDist {
        fn encode(&self, value: String, out: &mut Vec<Bytes>) {
            out.push(Bytes::from_static(b"STOREDIST"));
            Str.encode(value, out);
        }
    }

    /// `AGGREGATE {SUM|MIN|MAX}`
    #[derive(Debug, Default, Clone, Copy)]
    pub struct AggregateFn;

    impl Input<Aggregate> for AggregateFn {
        fn encode(&self, value: Aggregate, out: &mut Vec<Bytes>) {
            out.push(Bytes::from_static(b"AGGREGATE"));
            out.push(Bytes::from_static(value.token().as_bytes()));
        }
    }
}

/// A range bound for `ZRANGEBYSCORE`-style queries: `-inf`/`+inf`, an
/// inclusive score, or an exclusive one (`(score`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    NegInf,
    PosInf,
    Inclusive(f64),
    Exclusive(f64),
}

impl ScoreBound {
    fn token(self) -> String {
        match self {
            ScoreBound::NegInf => "-inf".to_string(),
            ScoreBound::PosInf => "+inf".to_string(),
            ScoreBound::Inclusive(s) => s.to_string(),
            ScoreBound::Exclusive(s) => format!("({}", s),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScoreRangeBound;

impl Input<ScoreBound> for ScoreRangeBound {
    fn encode(&self, value: ScoreBound, out: &mut Vec<Bytes>) {
        out.push(Bytes::from(value.token()));
    }
}

/// A lexicographic range bound for `ZRANGEBYLEX`: `-`/`+`, `[member`
/// (inclusive), or `(member` (exclusive).
#[derive(Debug, Clone, PartialEq)]
pub enum LexBound {
    NegInf,
    PosInf,
    Inclusive(String),
    Exclusive(String),
}

impl LexBound {
    fn token(self) -> String {
        match self {
            LexBound::NegInf => "-".to_string(),
            LexBound::PosInf => "+".to_string(),
            LexBound::Inclusive(m) => format!("[{}", m),
            LexBound::Exclusive(m) => format!("({}", m),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LexRangeBound;

impl Input<LexBound> for LexRangeBound {
    fn encode(&self, value: LexBound, out: &mut Vec<Bytes>) {
        out.push(Bytes::from(value.token()));
    }
}

/// Encodes a caller-supplied typed payload through an injected [`Codec`].
#[derive(Debug, Clone, Copy)]
pub struct Arbitrary<C>(pub C);

impl<T, C: Codec<T>> Input<T> for Arbitrary<C> {
    fn encode(&self, value: T, out: &mut Vec<Bytes>) {
        out.push(self.0.encode(&value));
    }
}

#[cfg(test)]
mod tests {
    use super::flags::*;
    use super::*;

    #[test]
    fn optional_emits_nothing_for_none() {
        let mut out = Vec::new();
        OptionalInput(LongInt).encode(None::<i64>, &mut out);
        assert!(out.is_empty());
        OptionalInput(LongInt).encode(Some(7), &mut out);
        assert_eq!(out, vec![Bytes::from("7")]);
    }

    #[test]
    fn score_member_pair_orders_score_first() {
        let mut out = Vec::new();
        let encoder: ScoreMember = Tuple2Input(Double, Str);
        encoder.encode((1.5, "member".to_string()), &mut out);
        assert_eq!(out, vec![Bytes::from("1.5"), Bytes::from("member")]);
    }

    #[test]
    fn limit_flag_emits_token_then_pair() {
        let mut out = Vec::new();
        Limit.encode((0, 10), &mut out);
        assert_eq!(
            out,
            vec![Bytes::from_static(b"LIMIT"), Bytes::from("0"), Bytes::from("10")]
        );
    }

    #[test]
    fn score_bound_formats_exclusive_and_infinities() {
        assert_eq!(ScoreBound::NegInf.token(), "-inf");
        assert_eq!(ScoreBound::PosInf.token(), "+inf");
        assert_eq!(ScoreBound::Exclusive(3.0).token(), "(3");
    }

    #[test]
    fn lex_bound_formats_brackets() {
        assert_eq!(LexBound::Inclusive("a".into()).token(), "[a");
        assert_eq!(LexBound::Exclusive("a".into()).token(), "(a");
    }

    #[test]
    fn aggregate_fn_emits_token_pair() {
        let mut out = Vec::new();
        AggregateFn.encode(Aggregate::Max, &mut out);
        assert_eq!(out, vec![Bytes::from_static(b"AGGREGATE"), Bytes::from_static(b"MAX")]);
    }

    #[test]
    fn with_scores_is_a_bare_token() {
        let mut out = Vec::new();
        WithScores.encode((), &mut out);
        assert_eq!(out, vec![Bytes::from_static(b"WITHSCORES")]);
    }
}
