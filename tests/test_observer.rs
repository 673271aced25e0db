mod common;

use common::{init_tracing, Article, Event, Recorder};
use reqstate::{Channel, FnObserver, RequestError, RequestExecutor, Response, ResponseChannel};

#[tokio::test]
async fn test_success_reaches_success_handler() {
    init_tracing();
    let executor = RequestExecutor::new();
    let channel: ResponseChannel<Article> = Channel::default();
    let (recorder, mut events) = Recorder::new();
    channel.observe(recorder);

    executor.execute(&channel, false, None, async {
        Response::ok(Article::new(7, "observed"))
    });

    assert_eq!(
        events.recv().await,
        Some(Event::Success(Some(Article::new(7, "observed"))))
    );
}

#[tokio::test]
async fn test_empty_reaches_success_handler_without_data() {
    let executor = RequestExecutor::new();
    let channel: ResponseChannel<Article> = Channel::default();
    let (recorder, mut events) = Recorder::new();
    channel.observe(recorder);

    executor.execute(&channel, false, None, async {
        Response::<Article>::ok_empty()
    });

    assert_eq!(events.recv().await, Some(Event::Success(None)));
}

#[tokio::test]
async fn test_failed_reaches_failure_handler() {
    let executor = RequestExecutor::new();
    let channel: ResponseChannel<Article> = Channel::default();
    let (recorder, mut events) = Recorder::new();
    channel.observe(recorder);

    executor.execute(&channel, false, None, async {
        Response::error(403, "forbidden")
    });

    assert_eq!(
        events.recv().await,
        Some(Event::Failure(Some("forbidden".to_string()), 403))
    );
}

#[tokio::test]
async fn test_error_reaches_exception_handler_only() {
    let executor = RequestExecutor::new();
    let channel: ResponseChannel<Article> = Channel::default();
    let (recorder, mut events) = Recorder::new();
    channel.observe(recorder);

    executor.execute(&channel, false, None, async {
        Err::<Response<Article>, &str>("socket closed")
    });

    assert_eq!(
        events.recv().await,
        Some(Event::Exception(RequestError::operation("socket closed")))
    );
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_sequential_requests_dispatch_in_order() {
    let executor = RequestExecutor::new();
    let channel: ResponseChannel<Article> = Channel::default();
    let (recorder, mut events) = Recorder::new();
    channel.observe(recorder);

    executor.execute(&channel, false, None, async {
        Response::ok(Article::new(1, "first"))
    });
    assert_eq!(
        events.recv().await,
        Some(Event::Success(Some(Article::new(1, "first"))))
    );

    executor.execute(&channel, false, None, async {
        Response::error(500, "second failed")
    });
    assert_eq!(
        events.recv().await,
        Some(Event::Failure(Some("second failed".to_string()), 500))
    );
}

#[tokio::test]
async fn test_every_observer_sees_every_envelope() {
    let executor = RequestExecutor::new();
    let channel: ResponseChannel<Article> = Channel::default();
    let (first, mut first_events) = Recorder::new();
    let (second, mut second_events) = Recorder::new();
    channel.observe(first);
    channel.observe(second);

    executor.execute(&channel, false, None, async {
        Response::ok(Article::new(2, "fanout"))
    });

    let expected = Event::Success(Some(Article::new(2, "fanout")));
    assert_eq!(first_events.recv().await, Some(expected));
    assert_eq!(
        second_events.recv().await,
        Some(Event::Success(Some(Article::new(2, "fanout"))))
    );
}

#[tokio::test]
async fn test_fn_observer_subscription() {
    let executor = RequestExecutor::new();
    let channel: ResponseChannel<Article> = Channel::default();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let observer = FnObserver::new(move |data: Option<Article>| {
        let _ = tx.send(data);
    });
    channel.observe(observer);

    executor.execute(&channel, false, None, async {
        Response::ok(Article::new(3, "closure"))
    });

    assert_eq!(rx.recv().await, Some(Some(Article::new(3, "closure"))));
}

#[tokio::test]
async fn test_observe_loop_ends_when_channel_closes() {
    let channel: ResponseChannel<Article> = Channel::default();
    let (recorder, _events) = Recorder::new();
    let handle = channel.observe(recorder);

    drop(channel);
    handle.await.unwrap();
}
