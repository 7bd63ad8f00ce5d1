use serde::Deserialize;
use serde_json::{Value, json};

use parley_core::reply::template::TemplateError;

use super::{FlexTemplate, decode_values, labeled_row};

/// Display strings for the weather card, already formatted with units.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeatherValues {
    pub location: String,
    pub condition: String,
    pub icon_url: String,
    pub temperature: String,
    pub feels_like: String,
    pub humidity: String,
    pub wind_speed: String,
    pub last_updated: String,
    pub extra_info: String,
}

const FIELDS: [&str; 9] = [
    "location",
    "condition",
    "icon_url",
    "temperature",
    "feels_like",
    "humidity",
    "wind_speed",
    "last_updated",
    "extra_info",
];

pub struct WeatherTemplate;

impl FlexTemplate for WeatherTemplate {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn description(&self) -> &'static str {
        "Current weather report for one location"
    }

    fn values_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = FIELDS
            .iter()
            .map(|f| (f.to_string(), json!({ "type": "string" })))
            .collect();

        json!({
            "type": "object",
            "description": "Values for the weather template",
            "properties": properties,
            "required": FIELDS,
            "additionalProperties": false
        })
    }

    fn build(&self, values: &Value) -> Result<Value, TemplateError> {
        let v: WeatherValues = decode_values(self.name(), values)?;

        Ok(json!({
            "type": "bubble",
            "hero": {
                "type": "image",
                "url": v.icon_url,
                "size": "sm",
                "aspectRatio": "1:1",
                "aspectMode": "fit"
            },
            "body": {
                "type": "box",
                "layout": "vertical",
                "spacing": "md",
                "contents": [
                    { "type": "text", "text": v.location, "weight": "bold", "size": "lg", "align": "center" },
                    { "type": "text", "text": v.condition, "size": "md", "color": "#1DB446", "align": "center" },
                    labeled_row("Temperature", &v.temperature),
                    labeled_row("Feels like", &v.feels_like),
                    labeled_row("Humidity", &v.humidity),
                    labeled_row("Wind", &v.wind_speed),
                    {
                        "type": "box",
                        "layout": "vertical",
                        "margin": "md",
                        "contents": [
                            { "type": "text", "text": v.extra_info, "size": "sm", "color": "#0055FF", "align": "start", "wrap": true }
                        ]
                    }
                ]
            },
            "footer": {
                "type": "box",
                "layout": "vertical",
                "contents": [
                    {
                        "type": "text",
                        "text": format!("Last updated {}", v.last_updated),
                        "size": "xs",
                        "color": "#aaaaaa",
                        "align": "center"
                    }
                ]
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> Value {
        json!({
            "location": "Taipei",
            "condition": "light rain",
            "icon_url": "https://openweathermap.org/img/wn/10d@2x.png",
            "temperature": "24.1°C",
            "feels_like": "25.0°C",
            "humidity": "88%",
            "wind_speed": "3.2 m/s",
            "last_updated": "2026-10-18 09:00",
            "extra_info": "Bring an umbrella."
        })
    }

    #[test]
    fn renders_rows() {
        let card = WeatherTemplate.build(&values()).unwrap();
        assert_eq!(card["hero"]["url"], "https://openweathermap.org/img/wn/10d@2x.png");

        let contents = card["body"]["contents"].as_array().unwrap();
        assert_eq!(contents[0]["text"], "Taipei");
        assert_eq!(contents[2]["contents"][0]["text"], "Temperature");
        assert_eq!(contents[2]["contents"][1]["text"], "24.1°C");
        assert_eq!(contents[5]["contents"][1]["text"], "3.2 m/s");
        assert_eq!(card["footer"]["contents"][0]["text"], "Last updated 2026-10-18 09:00");
    }

    #[test]
    fn schema_lists_every_field() {
        let schema = WeatherTemplate.values_schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), FIELDS.len());
        assert_eq!(schema["properties"]["wind_speed"]["type"], "string");
    }

    #[test]
    fn missing_field_is_reported() {
        let mut partial = values();
        partial.as_object_mut().unwrap().remove("humidity");
        let err = WeatherTemplate.build(&partial).unwrap_err();
        assert!(err.to_string().contains("humidity"), "{err}");
    }
}
