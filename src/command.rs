//! Command descriptor: binds a verb, an [`Input`] encoder and an
//! [`Output`] decoder, and dispatches through a [`RedisExecutor`].
//!
//! The hundreds of per-command wrapper methods (`GET`, `SET`, `XADD`, …)
//! that build a particular `RedisCommand` and call `run` on it are outside
//! this crate's scope — this module is the shared machinery every one of
//! them routes through.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::RedisError;
use crate::resp::input::Input;
use crate::resp::output::Output;
use crate::resp::RespValue;

/// The uniform entry point every executor (single-node or cluster)
/// implements: encode once, get a raw reply or a transport-level error.
#[async_trait]
pub trait RedisExecutor: Send + Sync {
    /// `has_key` is `false` only for verbs with no key argument to route
    /// on (`PING`, `CLUSTER SLOTS`, …, per [`RedisCommand::keyless`]); a
    /// single-node executor ignores it, a cluster executor uses it to
    /// bypass slot computation.
    async fn execute(&self, args: Vec<Bytes>, has_key: bool) -> Result<RespValue, RedisError>;
}

/// A pure value binding a verb to its argument encoder and reply decoder.
/// Carries no connection state — the same descriptor can be `run` against
/// any executor.
pub struct RedisCommand<In, Out, I, O> {
    verb: &'static [&'static str],
    input: I,
    output: O,
    /// Most commands route by their first argument (the key); a handful
    /// (PING, CLUSTER SLOTS, …) have none. Set by the constructor used —
    /// see [`RedisCommand::keyless`] — and consulted only by the cluster
    /// executor's dispatch logic.
    pub(crate) has_key: bool,
    _marker: std::marker::PhantomData<(In, Out)>,
}

impl<In, Out, I, O> RedisCommand<In, Out, I, O>
where
    I: Input<In>,
    O: Output<Out>,
{
    pub fn new(verb: &'static [&'static str], input: I, output: O) -> Self {
        RedisCommand {
            verb,
            input,
            output,
            has_key: true,
            _marker: std::marker::PhantomData,
        }
    }

    /// For verbs with no key argument to route on (`PING`, `CLUSTER
    /// SLOTS`, …): bypasses cluster slot computation entirely.
    pub fn keyless(verb: &'static [&'static str], input: I, output: O) -> Self {
        RedisCommand {
            verb,
            input,
            output,
            has_key: false,
            _marker: std::marker::PhantomData,
        }
    }

    fn encode_args(&self, value: In) -> Vec<Bytes> {
        let mut args = Vec::with_capacity(self.verb.len() + 2);
        args.extend(self.verb.iter().map(|s| Bytes::from_static(s.as_bytes())));
        self.input.encode(value, &mut args);
        args
    }

    pub async fn run(
        &self,
        executor: &dyn RedisExecutor,
        value: In,
    ) -> Result<Out, RedisError> {
        let args = self.encode_args(value);
        let reply = executor.execute(args, self.has_key).await?;
        let reply = reply.into_result()?;
        self.output.decode(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resp::input::Str;
    use crate::resp::output::{BulkStringOutput, Unit};
    use std::sync::Mutex;

    struct RecordingExecutor {
        seen: Mutex<Vec<Vec<Bytes>>>,
        reply: RespValue,
    }

    #[async_trait]
    impl RedisExecutor for RecordingExecutor {
        async fn execute(&self, args: Vec<Bytes>, _has_key: bool) -> Result<RespValue, RedisError> {
            self.seen.lock().unwrap().push(args);
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn run_encodes_verb_then_args_and_decodes_reply() {
        let executor = RecordingExecutor {
            seen: Mutex::new(Vec::new()),
            reply: RespValue::SimpleString(Bytes::from_static(b"OK")),
        };
        let set = RedisCommand::new(&["SET"], Str, Unit);
        set.run(&executor, "foo".to_string()).await.unwrap();
        let seen = executor.seen.lock().unwrap();
        assert_eq!(seen[0], vec![Bytes::from_static(b"SET"), Bytes::from_static(b"foo")]);
    }

    #[tokio::test]
    async fn run_propagates_classified_error() {
        let executor = RecordingExecutor {
            seen: Mutex::new(Vec::new()),
            reply: RespValue::Error(Bytes::from_static(
                b"WRONGTYPE Operation against a key holding the wrong kind of value",
            )),
        };
        let get = RedisCommand::new(&["GET"], Str, BulkStringOutput);
        let err = get.run(&executor, "foo".to_string()).await.unwrap_err();
        assert!(matches!(err, RedisError::WrongType(_)));
    }
}
