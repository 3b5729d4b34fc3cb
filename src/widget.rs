//! The weather widget: takes props, fetches current conditions whenever the
//! location changes, and renders the result as a single line of styled text.

use crate::{
    config::{Coordinates, Defaults, Props, Settings},
    display::Display,
    state::{FailureReason, StateSlot, WeatherState},
    style::{ComputedStyle, RenderStyle},
    weather::{forecast_url, Fetch, Snapshot, UreqFetcher},
};
use embedded_graphics::{draw_target::DrawTarget, pixelcolor::Rgb888};
use log::{debug, error, info};
use std::{
    fmt::Debug,
    sync::Arc,
    thread::{self, JoinHandle},
};

pub struct WeatherWidget<F: Fetch = UreqFetcher> {
    defaults: Defaults,
    settings: Settings,
    fetcher: Arc<F>,
    state: StateSlot,
    /// Location of the most recent fetch. Empty until mounted.
    fetched_for: Option<Coordinates>,
    /// Fetches that may still be running. Nothing is ever cancelled, so
    /// whichever finishes last decides what's displayed.
    in_flight: Vec<JoinHandle<()>>,
}

impl<F: Fetch> WeatherWidget<F> {
    /// Mount the widget. This kicks off the first fetch in the background.
    pub fn mount(defaults: Defaults, props: Props, fetcher: F) -> Self {
        info!("Mounting weather widget");
        let settings = props.resolve(&defaults);
        let mut widget = Self {
            defaults,
            settings,
            fetcher: Arc::new(fetcher),
            state: StateSlot::default(),
            fetched_for: None,
            in_flight: Vec::new(),
        };
        widget.fetch_if_moved();
        widget
    }

    /// Replace all props. Only a change in location starts a new fetch.
    pub fn set_props(&mut self, props: Props) {
        self.settings = props.resolve(&self.defaults);
        self.fetch_if_moved();
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> WeatherState {
        self.state.get()
    }

    /// The string currently displayed
    pub fn text(&self) -> String {
        self.state.get().text()
    }

    pub fn style(&self) -> ComputedStyle {
        ComputedStyle::compute(&self.settings)
    }

    pub fn render_style(&self) -> RenderStyle {
        RenderStyle::resolve(&self.style(), &self.settings)
    }

    /// Draw the widget onto a target. Return whether anything changed.
    pub fn draw<D>(
        &self,
        display: &mut Display,
        target: &mut D,
    ) -> anyhow::Result<bool>
    where
        D: DrawTarget<Color = Rgb888>,
        D::Error: Debug,
    {
        display.draw(target, &self.text(), self.render_style())
    }

    /// Block until every fetch started so far has finished
    pub fn wait(&mut self) {
        for handle in self.in_flight.drain(..) {
            if handle.join().is_err() {
                error!("Weather fetch thread panicked");
            }
        }
    }

    fn fetch_if_moved(&mut self) {
        let coordinates = self.settings.coordinates;
        if self
            .fetched_for
            .is_some_and(|previous| previous.same_as(&coordinates))
        {
            return;
        }
        self.fetched_for = Some(coordinates);
        self.fetch(coordinates);
    }

    /// Spawn a thread to fetch conditions for a location. The result lands
    /// in the state slot whenever it's ready.
    fn fetch(&mut self, coordinates: Coordinates) {
        self.in_flight.retain(|handle| !handle.is_finished());

        info!(
            "Fetching weather for ({}, {})",
            coordinates.latitude, coordinates.longitude
        );
        let url = forecast_url(&coordinates);
        let fetcher = Arc::clone(&self.fetcher);
        let state = self.state.clone();
        self.state.start_loading();

        let spawned = thread::Builder::new()
            .name("weather-fetch".into())
            .spawn(move || state.set(load(&*fetcher, &url)));
        match spawned {
            Ok(handle) => self.in_flight.push(handle),
            Err(err) => {
                error!("Error spawning weather fetch: {err}");
                self.state.set(WeatherState::Failed(FailureReason::Error));
            }
        }
    }
}

impl<F: Fetch> Drop for WeatherWidget<F> {
    fn drop(&mut self) {
        info!("Unmounting weather widget");
    }
}

/// Run one fetch to completion. Every failure ends up as a state, nothing
/// escapes.
fn load(fetcher: &impl Fetch, url: &str) -> WeatherState {
    let result = fetcher.get(url).and_then(|body| Snapshot::from_body(&body));
    match result {
        Ok(Some(snapshot)) => {
            info!(
                "Weather at {}: {snapshot}",
                snapshot
                    .observed_at
                    .map_or_else(|| "unknown time".to_owned(), |time| {
                        time.to_string()
                    })
            );
            WeatherState::Loaded(snapshot)
        }
        Ok(None) => {
            debug!("No current weather in response from {url}");
            WeatherState::Failed(FailureReason::NotAvailable)
        }
        Err(err) => {
            error!("Error fetching the weather data: {err:?}");
            WeatherState::Failed(FailureReason::Error)
        }
    }
}
