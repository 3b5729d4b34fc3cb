use crate::weather::Snapshot;
use log::warn;
use std::sync::{Arc, PoisonError, RwLock};

/// Shown until the first fetch resolves
pub const LOADING_TEXT: &str = "Loading...";
pub const NOT_AVAILABLE_TEXT: &str = "Weather data not available";
pub const ERROR_TEXT: &str = "Error fetching weather data";

/// Where the widget is in its fetch cycle
#[derive(Clone, Debug, Default, PartialEq)]
pub enum WeatherState {
    /// Mounted, nothing requested yet
    #[default]
    Idle,
    /// First fetch is in flight
    Loading,
    Loaded(Snapshot),
    Failed(FailureReason),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FailureReason {
    /// The response had no current conditions in it
    NotAvailable,
    /// Transport, HTTP status, or parse failure
    Error,
}

impl WeatherState {
    /// The string the widget displays for this state
    pub fn text(&self) -> String {
        match self {
            Self::Idle | Self::Loading => LOADING_TEXT.to_owned(),
            Self::Loaded(snapshot) => snapshot.to_string(),
            Self::Failed(FailureReason::NotAvailable) => {
                NOT_AVAILABLE_TEXT.to_owned()
            }
            Self::Failed(FailureReason::Error) => ERROR_TEXT.to_owned(),
        }
    }
}

/// The single piece of shared state: written by fetch completions, read by
/// the render path. Cloning gives another handle to the same slot.
#[derive(Clone, Debug, Default)]
pub struct StateSlot(Arc<RwLock<WeatherState>>);

impl StateSlot {
    /// Get a copy of the current state
    pub fn get(&self) -> WeatherState {
        // A panicking writer can't leave a half-written enum behind, so a
        // poisoned lock is still safe to read
        self.0
            .read()
            .unwrap_or_else(|error| {
                warn!("Weather state lock was poisoned");
                PoisonError::into_inner(error)
            })
            .clone()
    }

    /// Replace the current state wholesale
    pub fn set(&self, state: WeatherState) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Move out of [WeatherState::Idle] when a fetch starts. Any other state
    /// keeps showing until the new result lands.
    pub fn start_loading(&self) {
        let mut state = self.0.write().unwrap_or_else(PoisonError::into_inner);
        if *state == WeatherState::Idle {
            *state = WeatherState::Loading;
        }
    }
}
