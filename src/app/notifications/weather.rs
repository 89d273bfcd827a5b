use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::domain::ports::WeatherSource;
use crate::domain::weather::WeatherSnapshot;

/// Upper bound on provider requests in flight during one run.
pub const MAX_CONCURRENT_FETCHES: usize = 8;

/// Fetches each city exactly once, at most [`MAX_CONCURRENT_FETCHES`] at a
/// time. A city whose fetch fails maps to `None`; the other cities are
/// unaffected.
pub async fn fetch_snapshots(
    source: &dyn WeatherSource,
    cities: &BTreeSet<String>,
) -> HashMap<String, Option<WeatherSnapshot>> {
    let fetches: Vec<_> = cities.iter().map(|city| async move {
        let snapshot = match source.current_weather(city).await {
            Ok(snapshot) => {
                debug!(city = %city, "weather fetched");
                Some(snapshot)
            }
            Err(err) => {
                warn!(error = %err, city = %city, "failed to fetch weather");
                None
            }
        };
        (city.clone(), snapshot)
    }).collect();

    stream::iter(fetches)
        .buffer_unordered(MAX_CONCURRENT_FETCHES)
        .collect()
        .await
}
