use async_trait::async_trait;
use log::{debug, warn};

use crate::clients::errors::{Error, Result};
use crate::commands::reply::Reply;

/// Chat-side handle for answering one command invocation.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Acknowledge now, answer later with [`Responder::follow_up`].
    async fn defer(&self, ephemeral: bool) -> Result<()>;
    /// Answer a deferred invocation.
    async fn follow_up(&self, reply: &Reply) -> Result<()>;
    /// Answer an invocation that was not deferred.
    async fn respond(&self, reply: &Reply) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    FollowUp,
    Immediate,
}

impl Strategy {
    fn chain(deferred: bool) -> &'static [Strategy] {
        if deferred {
            &[Strategy::FollowUp, Strategy::Immediate]
        } else {
            &[Strategy::Immediate]
        }
    }

    async fn attempt(self, responder: &dyn Responder, reply: &Reply) -> Result<()> {
        match self {
            Strategy::FollowUp => responder.follow_up(reply).await,
            Strategy::Immediate => responder.respond(reply).await,
        }
    }
}

/// Send `reply` with the first strategy that works: a follow-up when the
/// invocation was deferred, otherwise (or if that fails) an immediate response.
pub async fn deliver(responder: &dyn Responder, reply: &Reply, deferred: bool) -> Result<()> {
    let mut failures = Vec::new();
    for strategy in Strategy::chain(deferred) {
        match strategy.attempt(responder, reply).await {
            Ok(()) => {
                debug!("Reply delivered via {strategy:?}");
                return Ok(());
            }
            Err(e) => {
                warn!("Delivering reply via {strategy:?} failed: {e}");
                failures.push(format!("{strategy:?}: {e}"));
            }
        }
    }
    Err(Error::Delivery(failures.join("; ")))
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingResponder;
    use super::*;

    #[tokio::test]
    async fn deferred_reply_goes_out_as_follow_up() {
        let responder = RecordingResponder::default();
        deliver(&responder, &Reply::text("hi"), true).await.unwrap();
        assert_eq!(responder.call_names(), ["follow_up"]);
    }

    #[tokio::test]
    async fn failed_follow_up_falls_back_to_immediate_response() {
        let responder = RecordingResponder {
            fail_follow_up: true,
            ..Default::default()
        };
        deliver(&responder, &Reply::text("hi"), true).await.unwrap();
        assert_eq!(responder.call_names(), ["follow_up", "respond"]);
    }

    #[tokio::test]
    async fn not_deferred_responds_immediately() {
        let responder = RecordingResponder::default();
        deliver(&responder, &Reply::text("hi"), false).await.unwrap();
        assert_eq!(responder.call_names(), ["respond"]);
    }

    #[tokio::test]
    async fn exhausted_chain_is_a_delivery_error() {
        let responder = RecordingResponder {
            fail_follow_up: true,
            fail_respond: true,
            ..Default::default()
        };
        let result = deliver(&responder, &Reply::text("hi"), true).await;
        assert!(matches!(result, Err(Error::Delivery(_))));
    }
}
