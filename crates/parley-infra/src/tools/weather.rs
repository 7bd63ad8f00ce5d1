//! `get_weather` -- current conditions from the OpenWeather One Call 3.0 API.
//!
//! Accepts coordinates, or a place name which is geocoded first through
//! `/geo/1.0/direct`. The API key is held as a [`SecretString`] and only
//! exposed when building the query string.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use schemars::JsonSchema;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use parley_core::tool::{Tool, ToolError};
use parley_types::config::WeatherConfig;

const ICON_URL: &str = "https://openweathermap.org/img/wn";

/// Unit system requested by the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl Units {
    /// OpenWeather `units` query value.
    fn api_value(self) -> &'static str {
        match self {
            Units::Celsius => "metric",
            Units::Fahrenheit => "imperial",
            Units::Kelvin => "standard",
        }
    }
}

/// Arguments of `get_weather`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WeatherArgs {
    /// Latitude of the location (e.g. 25.0330).
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude of the location (e.g. 121.5654).
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Place name to geocode when coordinates are unknown (e.g. "Taichung").
    #[serde(default)]
    pub location: Option<String>,
    /// Temperature units.
    #[serde(default)]
    pub units: Units,
}

// ---------------------------------------------------------------------------
// OpenWeather wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GeocodingEntry {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: String,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OneCallResponse {
    lat: f64,
    lon: f64,
    #[serde(default)]
    timezone: String,
    #[serde(default)]
    timezone_offset: i32,
    current: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    dt: i64,
    #[serde(default)]
    sunrise: Option<i64>,
    #[serde(default)]
    sunset: Option<i64>,
    temp: f64,
    feels_like: f64,
    #[serde(default)]
    pressure: u32,
    humidity: u32,
    #[serde(default)]
    uvi: f64,
    #[serde(default)]
    clouds: u32,
    #[serde(default)]
    visibility: u32,
    wind_speed: f64,
    #[serde(default)]
    wind_deg: u32,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
    icon: String,
}

/// Resolved place for a weather query.
#[derive(Debug, Clone, PartialEq)]
struct Place {
    name: String,
    country: String,
    state: Option<String>,
    latitude: f64,
    longitude: f64,
}

/// What the tool hands back to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherData {
    pub location: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub units: Units,
    pub temperature: f64,
    pub feels_like: f64,
    pub condition: String,
    pub humidity: u32,
    pub pressure: u32,
    pub wind_speed: f64,
    pub wind_deg: u32,
    pub clouds: u32,
    pub uvi: f64,
    pub visibility: u32,
    pub icon_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunrise: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunset: Option<String>,
    pub last_updated: String,
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Format a unix timestamp in the location's local time.
fn local_time(ts: i64, offset_secs: i32, fmt: &str) -> Option<String> {
    let offset = FixedOffset::east_opt(offset_secs)?;
    let utc: DateTime<Utc> = DateTime::from_timestamp(ts, 0)?;
    Some(utc.with_timezone(&offset).format(fmt).to_string())
}

fn to_weather_data(resp: OneCallResponse, place: Option<Place>, units: Units) -> WeatherData {
    let current = resp.current;
    let offset = resp.timezone_offset;
    let (condition, icon_url) = match current.weather.first() {
        Some(c) => (c.description.clone(), format!("{ICON_URL}/{}@2x.png", c.icon)),
        None => (String::new(), String::new()),
    };
    let place = place.unwrap_or(Place {
        name: String::new(),
        country: String::new(),
        state: None,
        latitude: resp.lat,
        longitude: resp.lon,
    });

    WeatherData {
        location: place.name,
        country: place.country,
        state: place.state,
        latitude: place.latitude,
        longitude: place.longitude,
        timezone: resp.timezone,
        units,
        temperature: current.temp,
        feels_like: current.feels_like,
        condition,
        humidity: current.humidity,
        pressure: current.pressure,
        wind_speed: current.wind_speed,
        wind_deg: current.wind_deg,
        clouds: current.clouds,
        uvi: current.uvi,
        visibility: current.visibility,
        icon_url,
        sunrise: current.sunrise.and_then(|t| local_time(t, offset, "%H:%M")),
        sunset: current.sunset.and_then(|t| local_time(t, offset, "%H:%M")),
        last_updated: local_time(current.dt, offset, "%Y-%m-%d %H:%M:%S").unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Tool
// ---------------------------------------------------------------------------

pub struct WeatherTool {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl WeatherTool {
    pub fn new(config: &WeatherConfig, api_key: SecretString) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ToolError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .query(&[("appid", self.api_key.expose_secret())])
            .send()
            .await
            .map_err(|e| ToolError::Request(format!("{path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Request(format!("{path} returned HTTP {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| ToolError::Execution(format!("invalid {path} response: {e}")))
    }

    async fn geocode(&self, location: &str) -> Result<Place, ToolError> {
        let entries: Vec<GeocodingEntry> = self
            .get_json(
                "/geo/1.0/direct",
                &[("q", location.to_string()), ("limit", "1".to_string())],
            )
            .await?;

        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| ToolError::Execution(format!("location not found: {location}")))?;

        Ok(Place {
            name: entry.name,
            country: entry.country,
            state: entry.state,
            latitude: entry.lat,
            longitude: entry.lon,
        })
    }

    async fn one_call(&self, lat: f64, lon: f64, units: Units) -> Result<OneCallResponse, ToolError> {
        self.get_json(
            "/data/3.0/onecall",
            &[
                ("lat", format!("{lat:.6}")),
                ("lon", format!("{lon:.6}")),
                ("units", units.api_value().to_string()),
                ("exclude", "minutely,hourly,daily,alerts".to_string()),
            ],
        )
        .await
    }
}

fn parse_args(args: Map<String, Value>) -> Result<WeatherArgs, ToolError> {
    let args: WeatherArgs =
        serde_json::from_value(Value::Object(args)).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

    let has_coords = args.latitude.is_some() && args.longitude.is_some();
    let has_location = args.location.as_deref().is_some_and(|l| !l.trim().is_empty());
    if !has_coords && !has_location {
        return Err(ToolError::InvalidArguments(
            "either latitude and longitude or a location is required".to_string(),
        ));
    }
    Ok(args)
}

impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get current weather by latitude and longitude, or by place name. Returns temperature, \
         feels-like temperature, conditions, humidity, pressure, wind, cloud cover, UV index, \
         visibility, sunrise and sunset times, and the observation time."
    }

    fn parameters(&self) -> Value {
        let schema = schemars::schema_for!(WeatherArgs);
        let mut value = serde_json::to_value(schema).unwrap_or_else(|_| json!({ "type": "object" }));
        if let Some(obj) = value.as_object_mut() {
            obj.remove("$schema");
        }
        value
    }

    async fn call(&self, args: Map<String, Value>) -> Result<String, ToolError> {
        let args = parse_args(args)?;

        let (lat, lon, place) = match (args.latitude, args.longitude) {
            (Some(lat), Some(lon)) => (lat, lon, None),
            _ => {
                let location = args.location.as_deref().unwrap_or_default();
                let place = self.geocode(location).await?;
                (place.latitude, place.longitude, Some(place))
            }
        };

        tracing::debug!(lat, lon, units = ?args.units, "fetching weather");
        let resp = self.one_call(lat, lon, args.units).await?;
        let data = to_weather_data(resp, place, args.units);

        serde_json::to_string(&data).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_CALL_FIXTURE: &str = r#"{
        "lat": 24.1477,
        "lon": 120.6736,
        "timezone": "Asia/Taipei",
        "timezone_offset": 28800,
        "current": {
            "dt": 1760778000,
            "sunrise": 1760737920,
            "sunset": 1760779680,
            "temp": 27.4,
            "feels_like": 29.1,
            "pressure": 1012,
            "humidity": 74,
            "dew_point": 22.3,
            "uvi": 3.1,
            "clouds": 40,
            "visibility": 10000,
            "wind_speed": 3.6,
            "wind_deg": 20,
            "weather": [
                { "id": 802, "main": "Clouds", "description": "scattered clouds", "icon": "03d" }
            ]
        }
    }"#;

    const GEO_FIXTURE: &str = r#"[
        { "name": "Taichung", "local_names": { "zh": "臺中市" }, "lat": 24.1477, "lon": 120.6736, "country": "TW" }
    ]"#;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn maps_one_call_with_geocoded_place() {
        let resp: OneCallResponse = serde_json::from_str(ONE_CALL_FIXTURE).unwrap();
        let geo: Vec<GeocodingEntry> = serde_json::from_str(GEO_FIXTURE).unwrap();
        let entry = &geo[0];
        let place = Place {
            name: entry.name.clone(),
            country: entry.country.clone(),
            state: entry.state.clone(),
            latitude: entry.lat,
            longitude: entry.lon,
        };

        let data = to_weather_data(resp, Some(place), Units::Celsius);
        assert_eq!(data.location, "Taichung");
        assert_eq!(data.country, "TW");
        assert_eq!(data.condition, "scattered clouds");
        assert_eq!(data.icon_url, "https://openweathermap.org/img/wn/03d@2x.png");
        assert_eq!(data.humidity, 74);
        // 1760778000 is 2025-10-18 09:00:00 UTC.
        assert_eq!(data.last_updated, "2025-10-18 17:00:00");
        assert_eq!(data.sunrise.as_deref(), Some("05:52"));

        let json: Value = serde_json::to_value(&data).unwrap();
        assert_eq!(json["units"], "celsius");
        assert_eq!(json["wind_speed"], 3.6);
        assert!(json.get("state").is_none());
    }

    #[test]
    fn coordinates_only_uses_response_position() {
        let resp: OneCallResponse = serde_json::from_str(ONE_CALL_FIXTURE).unwrap();
        let data = to_weather_data(resp, None, Units::Kelvin);
        assert_eq!(data.location, "");
        assert_eq!(data.latitude, 24.1477);
        assert_eq!(data.units, Units::Kelvin);
    }

    #[test]
    fn units_map_to_api_values() {
        assert_eq!(Units::Celsius.api_value(), "metric");
        assert_eq!(Units::Fahrenheit.api_value(), "imperial");
        assert_eq!(Units::Kelvin.api_value(), "standard");
    }

    #[test]
    fn argument_validation() {
        let parsed = parse_args(args(json!({ "latitude": 25.03, "longitude": 121.56 }))).unwrap();
        assert_eq!(parsed.units, Units::Celsius);

        let parsed = parse_args(args(json!({ "location": "Taichung", "units": "fahrenheit" }))).unwrap();
        assert_eq!(parsed.units, Units::Fahrenheit);

        assert!(matches!(
            parse_args(args(json!({ "latitude": 25.03 }))),
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            parse_args(args(json!({ "location": "  " }))),
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            parse_args(args(json!({ "latitude": "north", "longitude": 1.0 }))),
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            parse_args(args(json!({ "location": "x", "units": "rankine" }))),
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[test]
    fn parameters_describe_arguments() {
        let tool = WeatherTool::new(&WeatherConfig::default(), SecretString::from("test-key")).unwrap();
        let params = tool.parameters();
        assert_eq!(params["type"], "object");
        let props = params["properties"].as_object().unwrap();
        for key in ["latitude", "longitude", "location", "units"] {
            assert!(props.contains_key(key), "missing {key}");
        }
        assert!(params.get("$schema").is_none());
    }
}
