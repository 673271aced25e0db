mod channel;
mod data_state;
mod error;
mod executor;
mod observer;
mod response;
mod stream_ext;

pub use channel::*;
pub use data_state::*;
pub use error::*;
pub use executor::*;
pub use observer::*;
pub use response::*;
pub use stream_ext::*;

/// Marker trait for envelope payloads.
///
/// `is_empty_payload` feeds the `Success`/`Empty` classification: a request
/// that succeeded but produced an absent or empty payload is reported as
/// [`DataState::Empty`](crate::DataState::Empty). The default is "never
/// empty"; collection-like payloads override it.
pub trait Payload: Clone + Send + Sync + 'static {
    fn is_empty_payload(&self) -> bool {
        false
    }
}

impl<T: Clone + Send + Sync + 'static> Payload for Vec<T> {
    fn is_empty_payload(&self) -> bool {
        self.is_empty()
    }
}

impl Payload for String {
    fn is_empty_payload(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! scalar_payload {
    ($($ty:ty),+ $(,)?) => {
        $(impl Payload for $ty {})+
    };
}

scalar_payload!(bool, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);
