//! Boundaries to the external data providers.
//!
//! Implemented by the HTTP clients and by fakes in tests. Sources are
//! polled on the single runtime thread, so futures need not be `Send`.

use crate::{Error, PriceHistory, WeatherReading};

#[allow(async_fn_in_trait)]
pub trait WeatherSource {
    /// Current conditions at the monitored location, imperial units.
    async fn current_conditions(&self) -> Result<WeatherReading, Error>;
}

#[allow(async_fn_in_trait)]
pub trait PriceHistorySource {
    /// Trailing daily closes, oldest first, non-trading days removed.
    async fn daily_closes(&self) -> Result<PriceHistory, Error>;
}
