//! Current weather from OpenWeatherMap.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{select, Receiver};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{clock::AlarmClock, config::WeatherConfig, error::Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Weather {
    pub temperature: f64,
    pub description: String,
    pub icon: String,
}

impl Weather {
    /// `☁️ 19°C Overcast clouds`, or a placeholder when there is no data.
    #[must_use]
    pub fn display_line(weather: Option<&Self>) -> String {
        match weather {
            Some(weather) => format!(
                "{} {:.0}°C {}",
                weather.icon,
                weather.temperature,
                capitalize(&weather.description)
            ),
            None => "🌡️ —°C".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    weather: Vec<OwmCondition>,
    main: OwmMain,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
}

impl From<OwmResponse> for Weather {
    fn from(response: OwmResponse) -> Self {
        let (main, description) = response
            .weather
            .into_iter()
            .next()
            .map(|c| (c.main, c.description))
            .unwrap_or_default();
        Self {
            temperature: response.main.temp,
            icon: icon_for(&main, &description).to_string(),
            description,
        }
    }
}

/// Text icon for an OpenWeatherMap condition group and description.
#[must_use]
pub fn icon_for(main: &str, description: &str) -> &'static str {
    let main = main.to_lowercase();
    let description = description.to_lowercase();
    let has = |word: &str| main.contains(word) || description.contains(word);
    if has("thunder") {
        "⛈️"
    } else if has("drizzle") {
        "🌦️"
    } else if has("rain") {
        "🌧️"
    } else if has("snow") {
        "❄️"
    } else if has("cloud") {
        "☁️"
    } else if has("clear") {
        "☀️"
    } else if has("mist") || has("fog") || has("haze") {
        "🌫️"
    } else {
        "🌡️"
    }
}

#[derive(Debug)]
pub struct WeatherClient {
    client: reqwest::blocking::Client,
    config: WeatherConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }

    /// `None` when weather is not configured.
    pub fn fetch(&self) -> Result<Option<Weather>> {
        if !self.config.is_enabled() {
            return Ok(None);
        }
        let location = if self.config.country.is_empty() {
            self.config.city.clone()
        } else {
            format!("{},{}", self.config.city, self.config.country)
        };
        debug!("fetching weather for {location}");
        let response: OwmResponse = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("q", location.as_str()),
                ("units", self.config.units.as_str()),
                ("lang", self.config.lang.as_str()),
                ("appid", self.config.api_key.as_str()),
            ])
            .send()?
            .error_for_status()?
            .json()?;
        Ok(Some(response.into()))
    }
}

/// Refreshes the clock's cached weather now and then every `interval`.
/// A failed fetch keeps the previous value.
pub fn spawn_refresher(
    clock: Arc<AlarmClock>,
    client: WeatherClient,
    interval: Duration,
    shutdown: Receiver<()>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("weather".to_string())
        .spawn(move || {
            let refresh = || match client.fetch() {
                Ok(Some(weather)) => {
                    info!("weather: {}", Weather::display_line(Some(&weather)));
                    clock.set_weather(Some(weather));
                }
                Ok(None) => {}
                Err(e) => warn!("weather update failed: {e}"),
            };
            refresh();
            let ticker = crossbeam_channel::tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => refresh(),
                    recv(shutdown) -> _ => break,
                }
            }
        })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_for() {
        assert_eq!(icon_for("Thunderstorm", "thunderstorm with rain"), "⛈️");
        assert_eq!(icon_for("Drizzle", "light intensity drizzle"), "🌦️");
        assert_eq!(icon_for("Rain", "moderate rain"), "🌧️");
        assert_eq!(icon_for("Snow", "light snow"), "❄️");
        assert_eq!(icon_for("Clouds", "overcast clouds"), "☁️");
        assert_eq!(icon_for("Clear", "clear sky"), "☀️");
        assert_eq!(icon_for("Mist", "mist"), "🌫️");
        assert_eq!(icon_for("Fog", ""), "🌫️");
        assert_eq!(icon_for("Tornado", "tornado"), "🌡️");
        assert_eq!(icon_for("", ""), "🌡️");
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "weather": [{"id": 804, "main": "Clouds", "description": "overcast clouds", "icon": "04d"}],
            "main": {"temp": 19.4, "feels_like": 19.0, "humidity": 80},
            "name": "São Paulo"
        }"#;
        let response: OwmResponse = serde_json::from_str(body).unwrap();
        let weather = Weather::from(response);
        assert_eq!(weather.icon, "☁️");
        assert_eq!(weather.description, "overcast clouds");
        assert!((weather.temperature - 19.4).abs() < f64::EPSILON);
        assert_eq!(
            Weather::display_line(Some(&weather)),
            "☁️ 19°C Overcast clouds"
        );
    }

    #[test]
    fn test_placeholder_line() {
        assert_eq!(Weather::display_line(None), "🌡️ —°C");
    }

    #[test]
    fn test_unconfigured_client_skips_request() {
        let client = WeatherClient::new(WeatherConfig::default()).unwrap();
        assert_eq!(client.fetch().unwrap(), None);
    }
}
