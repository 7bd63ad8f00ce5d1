use serde::Deserialize;
use serde_json::{Value, json};

use parley_core::reply::template::TemplateError;

use super::{FlexTemplate, decode_values};

const GOLD_STAR: &str = "https://developers-resource.landpress.line.me/fx/img/review_gold_star_28.png";
const GRAY_STAR: &str = "https://developers-resource.landpress.line.me/fx/img/review_gray_star_28.png";
const MAX_STARS: usize = 5;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaceValues {
    pub name: String,
    /// Google Maps place id.
    pub place_id: String,
    pub rating: f64,
    pub address: String,
}

/// Carousel of places, one bubble each.
pub struct PlaceTemplate;

/// Star icons for a rating, rounded to the nearest whole star.
fn star_icons(rating: f64) -> Vec<&'static str> {
    let gold = rating.round().clamp(0.0, MAX_STARS as f64) as usize;
    (0..MAX_STARS)
        .map(|i| if i < gold { GOLD_STAR } else { GRAY_STAR })
        .collect()
}

fn place_bubble(place: &PlaceValues) -> Value {
    let mut rating_row: Vec<Value> = star_icons(place.rating)
        .into_iter()
        .map(|url| json!({ "type": "icon", "size": "sm", "url": url }))
        .collect();
    rating_row.push(json!({
        "type": "text",
        "text": format!("{:.1}", place.rating),
        "size": "sm",
        "color": "#999999",
        "margin": "md",
        "flex": 0
    }));

    json!({
        "type": "bubble",
        "body": {
            "type": "box",
            "layout": "vertical",
            "contents": [
                { "type": "text", "text": place.name, "weight": "bold", "size": "xl" },
                { "type": "box", "layout": "baseline", "margin": "md", "contents": rating_row },
                {
                    "type": "box",
                    "layout": "baseline",
                    "margin": "lg",
                    "spacing": "sm",
                    "contents": [
                        { "type": "text", "text": "Place", "color": "#aaaaaa", "size": "sm", "flex": 1 },
                        { "type": "text", "text": place.address, "wrap": true, "color": "#666666", "size": "sm", "flex": 5 }
                    ]
                }
            ]
        },
        "footer": {
            "type": "box",
            "layout": "vertical",
            "spacing": "sm",
            "contents": [
                {
                    "type": "button",
                    "style": "link",
                    "height": "sm",
                    "action": {
                        "type": "uri",
                        "label": "View on map",
                        "uri": format!("https://www.google.com/maps/place/?q=place_id:{}", place.place_id)
                    }
                }
            ]
        }
    })
}

impl FlexTemplate for PlaceTemplate {
    fn name(&self) -> &'static str {
        "place"
    }

    fn description(&self) -> &'static str {
        "Several places (restaurants, shops, sights) with rating and address"
    }

    fn values_schema(&self) -> Value {
        json!({
            "type": "array",
            "description": "Places to show, one card each",
            "items": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "place_id": { "type": "string", "description": "Google Maps place id" },
                    "rating": { "type": "number" },
                    "address": { "type": "string" }
                },
                "required": ["name", "place_id", "rating", "address"],
                "additionalProperties": false
            }
        })
    }

    fn build(&self, values: &Value) -> Result<Value, TemplateError> {
        let places: Vec<PlaceValues> = decode_values(self.name(), values)?;
        if places.is_empty() {
            return Err(TemplateError::MissingValues {
                template: self.name().to_string(),
                message: "no places".to_string(),
            });
        }

        Ok(json!({
            "type": "carousel",
            "contents": places.iter().map(place_bubble).collect::<Vec<_>>()
        }))
    }
}
