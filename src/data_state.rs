/// Lifecycle phase of a request.
///
/// `Loading` is transient. `Success`, `Empty`, `Failed` and `Error` are
/// terminal: once an envelope carries one of them its classification never
/// changes. `Finish` is a side signal that only travels the loading channel
/// ("hide the indicator"); it is never a result classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataState {
    Initialize,
    Loading,
    Success,
    Empty,
    Failed,
    Error,
    Finish,
}

impl DataState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DataState::Success | DataState::Empty | DataState::Failed | DataState::Error
        )
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, DataState::Loading)
    }

    /// True for the two states the success handler receives.
    pub fn is_success(&self) -> bool {
        matches!(self, DataState::Success | DataState::Empty)
    }
}

impl Default for DataState {
    fn default() -> Self {
        DataState::Initialize
    }
}

/// A transient UI-feedback signal: an optional message plus the phase that
/// produced it. Published in `Loading`/`Finish` pairs bracketing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadingState {
    pub message: Option<String>,
    pub state: DataState,
}

impl LoadingState {
    pub fn new(message: Option<String>, state: DataState) -> Self {
        LoadingState { message, state }
    }

    pub fn loading(message: Option<String>) -> Self {
        LoadingState::new(message, DataState::Loading)
    }

    pub fn finished(message: Option<String>) -> Self {
        LoadingState::new(message, DataState::Finish)
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }
}
