use futures_signals::signal::{Mutable, Signal, SignalExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::{Channel, DataState, LoadingChannel, Payload, RequestError, Response};

/// Leaf handlers for a result-channel subscriber.
///
/// Only the three handlers are customizable; the routing from envelope state
/// to handler lives in [`dispatch`] and is fixed. `on_failure` and
/// `on_exception` default to surfacing the problem through `tracing`.
pub trait ResponseObserver<T: Payload>: Send {
    /// Server reported success. `data` is `None` (or an empty collection)
    /// for `Empty`-classified envelopes.
    fn on_success(&mut self, data: Option<T>);

    /// Server reported a failure: a non-success `code` plus its user-facing
    /// message.
    fn on_failure(&mut self, message: Option<String>, code: i32) {
        log_failure(message.as_deref(), code);
    }

    /// The operation raised an error instead of returning a result.
    fn on_exception(&mut self, failure: RequestError) {
        log_exception(&failure);
    }
}

fn log_failure(message: Option<&str>, code: i32) {
    tracing::warn!(code, reason = message.unwrap_or(""), "request failed");
}

fn log_exception(failure: &RequestError) {
    tracing::error!(%failure, "request raised an error");
}

/// Routes one envelope to the matching leaf handler.
///
/// `Success` and `Empty` both reach the success handler, `Failed` the
/// failure handler with `(message, code)`, `Error` the exception handler
/// with the cause. Every other state, `Finish` included, is a no-op. This
/// function is the whole dispatch table; observers cannot change it.
pub fn dispatch<T, O>(observer: &mut O, response: Response<T>)
where
    T: Payload,
    O: ResponseObserver<T> + ?Sized,
{
    match response.state {
        Some(DataState::Success) | Some(DataState::Empty) => observer.on_success(response.data),
        Some(DataState::Failed) => observer.on_failure(response.message, response.code),
        Some(DataState::Error) => {
            let failure = response
                .failure
                .unwrap_or_else(|| RequestError::operation("unclassified failure"));
            observer.on_exception(failure);
        }
        _ => {}
    }
}

impl<T: Payload> Channel<Response<T>> {
    /// Subscribes `observer` and spawns its dispatch loop. The loop runs
    /// until every publisher of the channel is dropped.
    pub fn observe<O>(&self, mut observer: O) -> JoinHandle<()>
    where
        O: ResponseObserver<T> + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(response) => dispatch(&mut observer, response),
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "observer lagged, envelopes dropped");
                    }
                }
            }
        })
    }
}

/// [`ResponseObserver`] built from closures, for subscribers that do not
/// warrant a named type. Unset handlers keep the logging defaults.
pub struct FnObserver<T> {
    success: Box<dyn FnMut(Option<T>) + Send>,
    failure: Option<Box<dyn FnMut(Option<String>, i32) + Send>>,
    exception: Option<Box<dyn FnMut(RequestError) + Send>>,
}

impl<T: Payload> FnObserver<T> {
    pub fn new(on_success: impl FnMut(Option<T>) + Send + 'static) -> Self {
        FnObserver {
            success: Box::new(on_success),
            failure: None,
            exception: None,
        }
    }

    pub fn with_failure_handler(
        mut self,
        on_failure: impl FnMut(Option<String>, i32) + Send + 'static,
    ) -> Self {
        self.failure = Some(Box::new(on_failure));
        self
    }

    pub fn with_exception_handler(
        mut self,
        on_exception: impl FnMut(RequestError) + Send + 'static,
    ) -> Self {
        self.exception = Some(Box::new(on_exception));
        self
    }
}

impl<T: Payload> ResponseObserver<T> for FnObserver<T> {
    fn on_success(&mut self, data: Option<T>) {
        (self.success)(data)
    }

    fn on_failure(&mut self, message: Option<String>, code: i32) {
        match self.failure.as_mut() {
            Some(handler) => handler(message, code),
            None => log_failure(message.as_deref(), code),
        }
    }

    fn on_exception(&mut self, failure: RequestError) {
        match self.exception.as_mut() {
            Some(handler) => handler(failure),
            None => log_exception(&failure),
        }
    }
}

/// Tracks `Loading`/`Finish` pairs on a loading channel for a UI progress
/// indicator.
///
/// Pairs from concurrently running requests interleave, so the tracker
/// counts in-flight requests instead of toggling a flag: the indicator stays
/// up until every bracketing pair has closed.
pub struct LoadingTracker {
    in_flight: Mutable<usize>,
    message: Mutable<Option<String>>,
    task: JoinHandle<()>,
}

impl LoadingTracker {
    pub fn attach(channel: &LoadingChannel) -> Self {
        let in_flight = Mutable::new(0usize);
        let message = Mutable::new(None);
        let mut rx = channel.subscribe();
        let task = tokio::spawn({
            let in_flight = in_flight.clone();
            let message = message.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(signal) => match signal.state {
                            DataState::Loading => {
                                *in_flight.lock_mut() += 1;
                                message.set(signal.message);
                            }
                            DataState::Finish => {
                                let mut count = in_flight.lock_mut();
                                *count = count.saturating_sub(1);
                                let idle = *count == 0;
                                drop(count);
                                if idle {
                                    message.set(None);
                                }
                            }
                            _ => {}
                        },
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(missed)) => {
                            tracing::warn!(missed, "loading tracker lagged");
                        }
                    }
                }
            }
        });
        LoadingTracker {
            in_flight,
            message,
            task,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.get() > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    /// Message of the most recent `Loading` signal; cleared when the last
    /// in-flight request finishes.
    pub fn message(&self) -> Option<String> {
        self.message.get_cloned()
    }

    /// Deduplicated show-indicator signal for UI binding.
    pub fn signal(&self) -> impl Signal<Item = bool> {
        self.in_flight.signal().map(|count| count > 0).dedupe()
    }
}

impl Drop for LoadingTracker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Event {
        Success(Option<Vec<u64>>),
        Failure(Option<String>, i32),
        Exception(RequestError),
    }

    #[derive(Default)]
    struct Probe {
        events: Vec<Event>,
    }

    impl ResponseObserver<Vec<u64>> for Probe {
        fn on_success(&mut self, data: Option<Vec<u64>>) {
            self.events.push(Event::Success(data));
        }

        fn on_failure(&mut self, message: Option<String>, code: i32) {
            self.events.push(Event::Failure(message, code));
        }

        fn on_exception(&mut self, failure: RequestError) {
            self.events.push(Event::Exception(failure));
        }
    }

    #[test]
    fn test_success_and_empty_route_to_success_handler() {
        let mut probe = Probe::default();
        dispatch(&mut probe, Response::ok(vec![1, 2]).classified());
        dispatch(&mut probe, Response::ok(Vec::new()).classified());

        assert_eq!(
            probe.events,
            vec![
                Event::Success(Some(vec![1, 2])),
                Event::Success(Some(Vec::new())),
            ]
        );
    }

    #[test]
    fn test_failed_routes_message_and_code() {
        let mut probe = Probe::default();
        dispatch(&mut probe, Response::error(403, "forbidden").classified());

        assert_eq!(
            probe.events,
            vec![Event::Failure(Some("forbidden".to_string()), 403)]
        );
    }

    #[test]
    fn test_error_routes_the_cause_only() {
        let mut probe = Probe::default();
        dispatch(&mut probe, Response::from_failure(RequestError::Timeout));

        assert_eq!(probe.events, vec![Event::Exception(RequestError::Timeout)]);
    }

    #[test]
    fn test_non_terminal_states_are_ignored() {
        let mut probe = Probe::default();
        for state in [None, Some(DataState::Initialize), Some(DataState::Loading), Some(DataState::Finish)] {
            dispatch(
                &mut probe,
                Response {
                    state,
                    ..Response::default()
                },
            );
        }
        assert!(probe.events.is_empty());
    }

    #[test]
    fn test_fn_observer_custom_handlers() {
        use std::sync::{Arc, Mutex};

        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let on_success = {
            let seen = seen.clone();
            move |data: Option<Vec<u64>>| {
                seen.lock().unwrap().push(format!("success {:?}", data));
            }
        };
        let on_failure = {
            let seen = seen.clone();
            move |message: Option<String>, code: i32| {
                seen.lock()
                    .unwrap()
                    .push(format!("failure {} {:?}", code, message));
            }
        };
        let mut observer = FnObserver::new(on_success).with_failure_handler(on_failure);

        dispatch(&mut observer, Response::ok(vec![7]).classified());
        dispatch(&mut observer, Response::error(500, "boom").classified());
        // No exception handler set: the logging default runs, nothing recorded.
        dispatch(&mut observer, Response::from_failure(RequestError::Cancelled));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "success Some([7])".to_string(),
                "failure 500 Some(\"boom\")".to_string(),
            ]
        );
    }
}
