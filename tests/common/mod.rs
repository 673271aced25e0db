#![allow(dead_code)]

use reqstate::{Payload, RequestError, ResponseObserver};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Clone, Debug, PartialEq)]
pub struct Article {
    pub id: u64,
    pub title: String,
}

impl Payload for Article {}

impl Article {
    pub fn new(id: u64, title: &str) -> Self {
        Article {
            id,
            title: title.to_string(),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Event<T> {
    Success(Option<T>),
    Failure(Option<String>, i32),
    Exception(RequestError),
}

/// Observer that reports every dispatched event through an mpsc channel so
/// tests can await them instead of sleeping.
pub struct Recorder<T> {
    tx: UnboundedSender<Event<T>>,
}

impl<T> Recorder<T> {
    pub fn new() -> (Self, UnboundedReceiver<Event<T>>) {
        let (tx, rx) = unbounded_channel();
        (Recorder { tx }, rx)
    }
}

impl<T: Payload> ResponseObserver<T> for Recorder<T> {
    fn on_success(&mut self, data: Option<T>) {
        let _ = self.tx.send(Event::Success(data));
    }

    fn on_failure(&mut self, message: Option<String>, code: i32) {
        let _ = self.tx.send(Event::Failure(message, code));
    }

    fn on_exception(&mut self, failure: RequestError) {
        let _ = self.tx.send(Event::Exception(failure));
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
