use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::stream::Stream;
use pin_project::pin_project;

use crate::{ChannelStream, DataState, LoadingState, Payload, Response};

/// Extra combinators for the streams this crate produces.
pub trait ReqStreamExt: Stream {
    /// Yields items until `test` flags one as final. Unlike `take_while`,
    /// the flagged item is still yielded; the stream ends after it.
    ///
    /// This is how a subscriber watches one request: consume envelopes
    /// through the first terminal one, then stop.
    fn take_through<F>(self, test: F) -> TakeThrough<Self, F>
    where
        F: FnMut(&Self::Item) -> bool,
        Self: Sized,
    {
        TakeThrough {
            stream: self,
            done: false,
            test,
        }
    }
}

impl<S: ?Sized> ReqStreamExt for S where S: Stream {}

/// Stream returned by [`ReqStreamExt::take_through`].
#[pin_project(project = TakeThroughProj)]
#[derive(Debug)]
#[must_use = "Streams do nothing unless polled"]
pub struct TakeThrough<S, F> {
    #[pin]
    stream: S,
    done: bool,
    test: F,
}

impl<S, F> Stream for TakeThrough<S, F>
where
    S: Stream,
    F: FnMut(&S::Item) -> bool,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let TakeThroughProj { stream, done, test } = self.project();

        if *done {
            return Poll::Ready(None);
        }
        match stream.poll_next(cx) {
            Poll::Ready(Some(item)) => {
                if test(&item) {
                    *done = true;
                }
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                *done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

fn response_is_terminal<T>(response: &Response<T>) -> bool {
    response.state.map_or(false, |state| state.is_terminal())
}

fn loading_is_finished(signal: &LoadingState) -> bool {
    signal.state == DataState::Finish
}

impl<T: Payload> ChannelStream<Response<T>> {
    /// Envelopes through the first terminal one, then end of stream.
    pub fn until_terminal(self) -> TakeThrough<Self, fn(&Response<T>) -> bool> {
        self.take_through(response_is_terminal::<T> as fn(&Response<T>) -> bool)
    }
}

impl ChannelStream<LoadingState> {
    /// Loading signals through the first `Finish`, then end of stream.
    pub fn until_finished(self) -> TakeThrough<Self, fn(&LoadingState) -> bool> {
        self.take_through(loading_is_finished as fn(&LoadingState) -> bool)
    }
}
