use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::domain::ports::WeatherSource;
use crate::domain::weather::{WeatherError, WeatherSnapshot};

pub const DEFAULT_WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenWeatherMap "current weather" client. Built once per dispatch run;
/// construction fails when no API key is configured.
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    pub fn new(api_key: Option<&str>, base_url: impl Into<String>) -> Result<Self, WeatherError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(WeatherError::MissingApiKey)?
            .to_string();

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }

    pub async fn get_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", city), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status {
                city: city.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let raw = serde_json::from_slice(&body)?;
        let snapshot = WeatherSnapshot::from_provider(city, raw)?;
        debug!(city = %city, temperature = snapshot.temperature, "weather received");
        Ok(snapshot)
    }
}

#[async_trait]
impl WeatherSource for WeatherClient {
    async fn current_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        self.get_weather(city).await
    }
}
