use crate::{DataState, Payload, RequestError};

/// Result code servers use to report success.
pub const CODE_SUCCESS: i32 = 0;

/// Per-request result envelope.
///
/// Created empty when a request starts, classified exactly once from its
/// `code` and payload emptiness (or from a raised failure), published once,
/// then discarded. `state` and `failure` are computed fields and never come
/// off the wire.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Response<T> {
    pub code: i32,
    pub message: Option<String>,
    pub data: Option<T>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub state: Option<DataState>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub failure: Option<RequestError>,
}

impl<T> Default for Response<T> {
    fn default() -> Self {
        Response {
            code: CODE_SUCCESS,
            message: None,
            data: None,
            state: None,
            failure: None,
        }
    }
}

impl<T> Response<T> {
    pub fn new(code: i32, message: Option<String>, data: Option<T>) -> Self {
        Response {
            code,
            message,
            data,
            state: None,
            failure: None,
        }
    }

    /// Success-coded envelope carrying `data`.
    pub fn ok(data: T) -> Self {
        Response::new(CODE_SUCCESS, None, Some(data))
    }

    /// Success-coded envelope with no payload.
    pub fn ok_empty() -> Self {
        Response::new(CODE_SUCCESS, None, None)
    }

    /// Server-reported failure with a user-facing message.
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Response::new(code, Some(message.into()), None)
    }

    pub fn is_success_code(&self) -> bool {
        self.code == CODE_SUCCESS
    }

    /// Envelope for an operation that raised `failure` instead of returning.
    /// Supersedes any code-based classification.
    pub fn from_failure(failure: RequestError) -> Self {
        Response {
            state: Some(DataState::Error),
            failure: Some(failure),
            ..Response::default()
        }
    }
}

impl<T: Payload> Response<T> {
    /// Classifies the envelope from its code and payload emptiness.
    ///
    /// Pure in `(code, emptiness)`: success code with an absent or empty
    /// payload is `Empty`, success code with data is `Success`, any other
    /// code is `Failed`. An already `Error`-classified envelope is left
    /// untouched.
    pub fn classified(mut self) -> Self {
        if self.state == Some(DataState::Error) {
            return self;
        }
        self.state = Some(if self.is_success_code() {
            let empty = self
                .data
                .as_ref()
                .map_or(true, |data| data.is_empty_payload());
            if empty {
                DataState::Empty
            } else {
                DataState::Success
            }
        } else {
            DataState::Failed
        });
        self
    }
}

/// Conversion of an operation outcome into a classified envelope.
///
/// Implemented for plain envelopes and for `Result<Response<T>, E>`, where
/// the `Err` arm becomes an `Error`-classified envelope carrying the rendered
/// cause. This is the single place outcome shapes are normalized before
/// publication.
pub trait IntoResponse<T: Payload> {
    fn into_response(self) -> Response<T>;
}

impl<T: Payload> IntoResponse<T> for Response<T> {
    fn into_response(self) -> Response<T> {
        self.classified()
    }
}

impl<T: Payload, E: ToString> IntoResponse<T> for Result<Response<T>, E> {
    fn into_response(self) -> Response<T> {
        match self {
            Ok(response) => response.classified(),
            Err(error) => Response::from_failure(RequestError::Operation(error.to_string())),
        }
    }
}
