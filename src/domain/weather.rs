use serde::Deserialize;
use serde_json::Value;

/// Current conditions for one city, valid for the duration of a single
/// dispatch run.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub city: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub description: Option<String>,
    pub humidity: u8,
    pub wind_speed: Option<f64>,
    /// Provider payload as received.
    pub raw: Value,
}

#[derive(Deserialize)]
struct ProviderPayload {
    main: ProviderMain,
    #[serde(default)]
    weather: Vec<ProviderCondition>,
    wind: Option<ProviderWind>,
}

#[derive(Deserialize)]
struct ProviderMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Deserialize)]
struct ProviderCondition {
    description: Option<String>,
}

#[derive(Deserialize)]
struct ProviderWind {
    speed: Option<f64>,
}

impl WeatherSnapshot {
    /// Reads an OpenWeatherMap "current weather" document.
    pub fn from_provider(city: &str, raw: Value) -> Result<Self, serde_json::Error> {
        let payload = ProviderPayload::deserialize(&raw)?;

        Ok(Self {
            city: city.to_string(),
            temperature: payload.main.temp,
            feels_like: payload.main.feels_like,
            description: payload
                .weather
                .into_iter()
                .next()
                .and_then(|condition| condition.description),
            humidity: payload.main.humidity,
            wind_speed: payload.wind.and_then(|wind| wind.speed),
            raw,
        })
    }

    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().unwrap_or("N/A")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("weather provider API key is not configured")]
    MissingApiKey,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("weather provider returned status {status} for {city}")]
    Status { city: String, status: u16 },
    #[error("malformed weather payload: {0}")]
    Parse(#[from] serde_json::Error),
}
