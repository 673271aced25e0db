use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{
    Channel, IntoResponse, LoadingChannel, LoadingState, Payload, RequestError, Response,
    ResponseChannel, DEFAULT_CHANNEL_CAPACITY,
};

/// Construction-time executor configuration. There is no global state: a
/// caller that wants different behavior builds a different executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Capacity of the loading channel the executor owns.
    pub loading_capacity: usize,
    /// Deadline applied to every operation that does not carry its own
    /// `*_with_timeout` limit.
    pub operation_deadline: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            loading_capacity: DEFAULT_CHANNEL_CAPACITY,
            operation_deadline: None,
        }
    }
}

/// Runs one asynchronous operation per call and propagates its lifecycle.
///
/// Each call publishes an optional `Loading` signal, awaits the operation,
/// classifies the outcome into exactly one envelope on the caller's response
/// channel, and closes the bracket with a `Finish` signal. Failures never
/// escape a call: server-side errors classify as `Failed`, raised errors,
/// cancellation and deadlines as `Error`.
///
/// Calls are independent. Concurrent requests against the same channels
/// interleave their emissions but each call keeps its own internal order
/// (`Loading`, envelope, `Finish`).
pub struct RequestExecutor {
    loading: LoadingChannel,
    config: ExecutorConfig,
}

impl RequestExecutor {
    pub fn new() -> Self {
        RequestExecutor::with_config(ExecutorConfig::default())
    }

    pub fn with_config(config: ExecutorConfig) -> Self {
        RequestExecutor {
            loading: Channel::new(config.loading_capacity),
            config,
        }
    }

    /// The loading channel this executor publishes `Loading`/`Finish` pairs
    /// on. UI consumers subscribe here.
    pub fn loading_channel(&self) -> &LoadingChannel {
        &self.loading
    }

    fn run_async_core<T, R, F>(
        &self,
        channel: &ResponseChannel<T>,
        show_loading: bool,
        loading_message: Option<String>,
        operation: F,
        cancellation_token: Option<CancellationToken>,
        deadline: Option<Duration>,
    ) where
        T: Payload,
        R: IntoResponse<T> + Send + 'static,
        F: Future<Output = R> + Send + 'static,
    {
        let loading = self.loading.clone();
        let results = channel.clone();
        let deadline = deadline.or(self.config.operation_deadline);
        tokio::spawn(async move {
            if show_loading {
                loading.publish(LoadingState::loading(loading_message.clone()));
            }
            // Let the loading signal fan out before the operation starts.
            tokio::task::yield_now().await;

            let outcome = async {
                match cancellation_token {
                    Some(token) => {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => Response::from_failure(RequestError::Cancelled),
                            result = operation => result.into_response(),
                        }
                    }
                    None => operation.await.into_response(),
                }
            };
            let response = match deadline {
                Some(limit) => match tokio::time::timeout(limit, outcome).await {
                    Ok(response) => response,
                    Err(_) => Response::from_failure(RequestError::Timeout),
                },
                None => outcome.await,
            };

            tracing::debug!(state = ?response.state, code = response.code, "request completed");
            results.publish(response);
            if show_loading {
                loading.publish(LoadingState::finished(loading_message));
            }
        });
    }

    fn run_blocking_core<T, R, F>(
        &self,
        channel: &ResponseChannel<T>,
        show_loading: bool,
        loading_message: Option<String>,
        computation: F,
        cancellation_token: Option<CancellationToken>,
        deadline: Option<Duration>,
    ) where
        T: Payload,
        R: IntoResponse<T> + Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let loading = self.loading.clone();
        let results = channel.clone();
        let deadline = deadline.or(self.config.operation_deadline);
        tokio::spawn(async move {
            if show_loading {
                loading.publish(LoadingState::loading(loading_message.clone()));
            }
            tokio::task::yield_now().await;

            let outcome = async {
                let worker = tokio::task::spawn_blocking(computation);
                match cancellation_token {
                    Some(token) => {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => Response::from_failure(RequestError::Cancelled),
                            result = worker => worker_response(result),
                        }
                    }
                    None => worker_response(worker.await),
                }
            };
            let response = match deadline {
                Some(limit) => match tokio::time::timeout(limit, outcome).await {
                    Ok(response) => response,
                    Err(_) => Response::from_failure(RequestError::Timeout),
                },
                None => outcome.await,
            };

            tracing::debug!(state = ?response.state, code = response.code, "request completed");
            results.publish(response);
            if show_loading {
                loading.publish(LoadingState::finished(loading_message));
            }
        });
    }

    /// Runs an asynchronous operation and publishes exactly one classified
    /// envelope on `channel`. With `show_loading`, brackets the publication
    /// in a `Loading`/`Finish` pair on the loading channel.
    pub fn execute<T, R, F>(
        &self,
        channel: &ResponseChannel<T>,
        show_loading: bool,
        loading_message: Option<String>,
        operation: F,
    ) where
        T: Payload,
        R: IntoResponse<T> + Send + 'static,
        F: Future<Output = R> + Send + 'static,
    {
        self.run_async_core(channel, show_loading, loading_message, operation, None, None);
    }

    /// Like [`execute`](Self::execute), racing the operation against
    /// `cancellation_token`. The token firing first publishes an `Error`
    /// envelope carrying [`RequestError::Cancelled`]; the operation itself
    /// receives the token for cooperative shutdown.
    pub fn execute_cancellable<T, R, F, Fut>(
        &self,
        cancellation_token: CancellationToken,
        channel: &ResponseChannel<T>,
        show_loading: bool,
        loading_message: Option<String>,
        operation: F,
    ) where
        T: Payload,
        R: IntoResponse<T> + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
        F: FnOnce(CancellationToken) -> Fut,
    {
        self.run_async_core(
            channel,
            show_loading,
            loading_message,
            operation(cancellation_token.clone()),
            Some(cancellation_token),
            None,
        );
    }

    /// Like [`execute`](Self::execute) with a per-call deadline; elapsing
    /// publishes an `Error` envelope carrying [`RequestError::Timeout`].
    pub fn execute_with_timeout<T, R, F>(
        &self,
        channel: &ResponseChannel<T>,
        show_loading: bool,
        loading_message: Option<String>,
        limit: Duration,
        operation: F,
    ) where
        T: Payload,
        R: IntoResponse<T> + Send + 'static,
        F: Future<Output = R> + Send + 'static,
    {
        self.run_async_core(
            channel,
            show_loading,
            loading_message,
            operation,
            None,
            Some(limit),
        );
    }

    /// Runs a synchronous operation on the blocking pool. A panicked worker
    /// publishes an `Error` envelope instead of propagating.
    pub fn execute_blocking<T, R, F>(
        &self,
        channel: &ResponseChannel<T>,
        show_loading: bool,
        loading_message: Option<String>,
        operation: F,
    ) where
        T: Payload,
        R: IntoResponse<T> + Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        self.run_blocking_core(channel, show_loading, loading_message, operation, None, None);
    }

    /// Blocking variant of [`execute_cancellable`](Self::execute_cancellable).
    /// The worker keeps the token to poll for cooperative shutdown; a token
    /// that fires first publishes the `Cancelled` envelope while the worker
    /// finishes detached.
    pub fn execute_blocking_cancellable<T, R, F>(
        &self,
        cancellation_token: CancellationToken,
        channel: &ResponseChannel<T>,
        show_loading: bool,
        loading_message: Option<String>,
        operation: F,
    ) where
        T: Payload,
        R: IntoResponse<T> + Send + 'static,
        F: FnOnce(CancellationToken) -> R + Send + 'static,
    {
        let worker_token = cancellation_token.clone();
        self.run_blocking_core(
            channel,
            show_loading,
            loading_message,
            move || operation(worker_token),
            Some(cancellation_token),
            None,
        );
    }

    /// Blocking variant of [`execute_with_timeout`](Self::execute_with_timeout).
    pub fn execute_blocking_with_timeout<T, R, F>(
        &self,
        channel: &ResponseChannel<T>,
        show_loading: bool,
        loading_message: Option<String>,
        limit: Duration,
        operation: F,
    ) where
        T: Payload,
        R: IntoResponse<T> + Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        self.run_blocking_core(
            channel,
            show_loading,
            loading_message,
            operation,
            None,
            Some(limit),
        );
    }
}

impl Default for RequestExecutor {
    fn default() -> Self {
        RequestExecutor::new()
    }
}

fn worker_response<T, R>(result: Result<R, tokio::task::JoinError>) -> Response<T>
where
    T: Payload,
    R: IntoResponse<T>,
{
    match result {
        Ok(outcome) => outcome.into_response(),
        Err(join_error) => Response::from_failure(RequestError::Operation(join_error.to_string())),
    }
}
