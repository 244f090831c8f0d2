//! Watch multiplexer: fans several backend subscriptions into one stream.
//!
//! One producer task per subscription forwards results into a shared,
//! bounded channel; the calling task drains that channel into a
//! [`WatchSink`]. Producers block when the channel is full, so a slow
//! client throttles backend consumption.
//!
//! Every subscription is owned by a [`Subscription`] guard that stops it
//! when dropped. Whether the call ends by cancellation, backend closure,
//! a sink failure, a setup failure or by the whole future being dropped,
//! each opened subscription is stopped exactly once.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::domain::{Namespace, RegistryBackend, WatchResult, Watcher};
use crate::error::GatewayError;

/// Client-facing end of a watch call.
#[async_trait]
pub trait WatchSink: Send {
    /// Delivers one result to the client.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Stream`] if the client can no longer be
    /// written to.
    async fn send(&mut self, result: WatchResult) -> Result<(), GatewayError>;
}

#[async_trait]
impl WatchSink for mpsc::Sender<WatchResult> {
    async fn send(&mut self, result: WatchResult) -> Result<(), GatewayError> {
        mpsc::Sender::send(self, result)
            .await
            .map_err(|_| GatewayError::Stream("watch receiver dropped".to_string()))
    }
}

/// Why a watch call ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEnd {
    /// The caller cancelled the call.
    Cancelled,
    /// A backend subscription ended on its own.
    BackendClosed,
}

enum Feed {
    Result(WatchResult),
    Closed(Namespace),
}

/// Backend subscription that is stopped when dropped.
#[derive(Debug)]
struct Subscription {
    domain: Namespace,
    watcher: Box<dyn Watcher>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.watcher.stop();
        tracing::debug!(domain = %self.domain, "watch subscription stopped");
    }
}

/// Opens per-domain subscriptions and merges them for one watch call.
#[derive(Debug, Clone)]
pub struct WatchMultiplexer {
    backend: Arc<dyn RegistryBackend>,
    capacity: usize,
}

impl WatchMultiplexer {
    /// Creates a multiplexer whose merge channel holds at most `capacity`
    /// pending results (minimum 1).
    #[must_use]
    pub fn new(backend: Arc<dyn RegistryBackend>, capacity: usize) -> Self {
        Self {
            backend,
            capacity: capacity.max(1),
        }
    }

    /// Watches `domains` (in order) for changes to `service`, forwarding
    /// every result to `sink` until the call ends.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if any subscription cannot be
    /// opened, or the sink's error if delivering a result fails.
    pub async fn run<S>(
        &self,
        cancel: &CancellationToken,
        service: Option<&str>,
        domains: &[Namespace],
        sink: &mut S,
    ) -> Result<WatchEnd, GatewayError>
    where
        S: WatchSink + ?Sized,
    {
        let call = cancel.child_token();

        let Some(subscriptions) = self.open(&call, service, domains).await? else {
            return Ok(WatchEnd::Cancelled);
        };
        tracing::debug!(subscriptions = subscriptions.len(), "watch streaming");

        let (tx, mut rx) = mpsc::channel(self.capacity);
        let mut producers = JoinSet::new();
        for subscription in subscriptions {
            producers.spawn(forward(subscription, tx.clone(), call.clone()));
        }
        drop(tx);

        let outcome = loop {
            tokio::select! {
                biased;
                () = call.cancelled() => break Ok(WatchEnd::Cancelled),
                feed = rx.recv() => match feed {
                    Some(Feed::Result(result)) => {
                        tokio::select! {
                            biased;
                            () = call.cancelled() => break Ok(WatchEnd::Cancelled),
                            sent = sink.send(result) => {
                                if let Err(err) = sent {
                                    tracing::warn!(error = %err, "watch stream write failed");
                                    break Err(err);
                                }
                            }
                        }
                    }
                    Some(Feed::Closed(domain)) => {
                        tracing::debug!(%domain, "backend closed watch subscription");
                        break Ok(WatchEnd::BackendClosed);
                    }
                    None => break Ok(WatchEnd::BackendClosed),
                },
            }
        };

        call.cancel();
        drop(rx);
        while let Some(joined) = producers.join_next().await {
            if let Err(err) = joined {
                tracing::error!(error = %err, "watch producer task failed");
            }
        }
        tracing::debug!(?outcome, "watch closed");
        outcome
    }

    /// Opens one subscription per domain. Returns `None` if the call was
    /// cancelled first. Subscriptions opened before a failure are stopped
    /// when the partial list is dropped.
    async fn open(
        &self,
        cancel: &CancellationToken,
        service: Option<&str>,
        domains: &[Namespace],
    ) -> Result<Option<Vec<Subscription>>, GatewayError> {
        let mut opened = Vec::with_capacity(domains.len());
        for domain in domains {
            let watcher = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(None),
                watcher = self.backend.watch(service, domain) => watcher,
            };
            match watcher {
                Ok(watcher) => opened.push(Subscription {
                    domain: domain.clone(),
                    watcher,
                }),
                Err(err) => {
                    tracing::error!(%domain, error = %err, "failed to open watch subscription");
                    return Err(GatewayError::Internal(err.to_string()));
                }
            }
        }
        Ok(Some(opened))
    }
}

/// Producer loop for one subscription.
async fn forward(mut subscription: Subscription, tx: mpsc::Sender<Feed>, cancel: CancellationToken) {
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = subscription.watcher.next() => next,
        };
        let (feed, last) = match next {
            Some(result) => (Feed::Result(result), false),
            None => (Feed::Closed(subscription.domain.clone()), true),
        };
        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            sent = tx.send(feed) => sent.is_ok(),
        };
        if !sent || last {
            break;
        }
    }
}
