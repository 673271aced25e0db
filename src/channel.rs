use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_core::stream::Stream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::{self, Receiver, Sender};
use tokio_util::sync::ReusableBoxFuture;

use crate::{LoadingState, Response};

/// Default number of in-flight values a slow subscriber may fall behind by.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Broadcast channel: every published value reaches every receiver that is
/// subscribed at publication time, in publish order per publisher.
///
/// Publishing is `&self` and publishers are cheap clones, so concurrently
/// running requests may share one channel; their emissions interleave but
/// each publisher's own sequence stays ordered.
pub struct Channel<V: Clone> {
    tx: Sender<V>,
}

/// Channel carrying result envelopes to observers.
pub type ResponseChannel<T> = Channel<Response<T>>;

/// Channel carrying transient loading signals to the UI layer.
pub type LoadingChannel = Channel<LoadingState>;

impl<V: Clone> Channel<V> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Channel { tx }
    }

    /// Publishes `value` to every current subscriber. A channel with no
    /// subscribers drops the value silently.
    pub fn publish(&self, value: V) {
        let _ = self.tx.send(value);
    }

    pub fn subscribe(&self) -> Receiver<V> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<V: Clone + Send + 'static> Channel<V> {
    /// Stream view of a new subscription.
    pub fn stream(&self) -> ChannelStream<V> {
        ChannelStream::new(self.subscribe())
    }
}

impl<V: Clone> Clone for Channel<V> {
    fn clone(&self) -> Self {
        Channel {
            tx: self.tx.clone(),
        }
    }
}

impl<V: Clone> Default for Channel<V> {
    fn default() -> Self {
        Channel::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

async fn recv_owned<V: Clone>(mut rx: Receiver<V>) -> (Result<V, RecvError>, Receiver<V>) {
    let result = rx.recv().await;
    (result, rx)
}

/// A subscription adapted to [`futures_core::Stream`].
///
/// The receive future owns the receiver between polls and hands it back on
/// completion, so the stream itself stays `Unpin`. A lagged subscription
/// skips the values it missed and keeps going; the stream ends when the
/// channel closes.
#[must_use = "Streams do nothing unless polled"]
pub struct ChannelStream<V: Clone + Send + 'static> {
    inner: ReusableBoxFuture<'static, (Result<V, RecvError>, Receiver<V>)>,
}

impl<V: Clone + Send + 'static> ChannelStream<V> {
    pub fn new(rx: Receiver<V>) -> Self {
        ChannelStream {
            inner: ReusableBoxFuture::new(recv_owned(rx)),
        }
    }
}

impl<V: Clone + Send + 'static> Stream for ChannelStream<V> {
    type Item = V;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            let (result, rx) = ready!(this.inner.poll(cx));
            this.inner.set(recv_owned(rx));
            match result {
                Ok(value) => return Poll::Ready(Some(value)),
                Err(RecvError::Closed) => return Poll::Ready(None),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "subscriber lagged behind channel capacity");
                }
            }
        }
    }
}
