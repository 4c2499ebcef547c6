//! Sheet-switch state machine.
//!
//! `NoData -> Loading -> Ready(i) | Error`. A retry out of `Error` passes
//! back through `NoData`; tab selection moves `Ready(i) -> Ready(j)`.

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    NoData,
    Loading,
    /// Position of the shown sheet
    Ready(usize),
    Error(String),
}

impl LoadState {
    pub fn begin_loading(&mut self) {
        if matches!(self, Self::Error(_)) {
            debug!("leaving error state for retry");
            *self = Self::NoData;
        }
        *self = Self::Loading;
    }

    pub fn finish(&mut self, position: usize) {
        *self = Self::Ready(position);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        *self = Self::Error(message.into());
    }

    /// Tab selection; only valid once a form is ready.
    pub fn select(&mut self, position: usize) -> bool {
        match self {
            Self::Ready(current) => {
                *current = position;
                true
            }
            _ => false,
        }
    }

    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Ready(position) => Some(*position),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}
