//! Feature classification strategies.
//!
//! Each strategy inspects one map feature and answers with a category or
//! `Unknown`. The classifier runs them in order and stops at the first
//! known answer.

use serde_json::Value;

use crate::map::MapFeature;
use crate::models::TerrainCategory;

pub trait FeatureStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn classify(&self, feature: &MapFeature) -> TerrainCategory;
}

/// Default chain: explicit property, source layer, palette, bluish heuristic.
pub fn default_strategies() -> Vec<Box<dyn FeatureStrategy>> {
    vec![
        Box::new(PropertyStrategy::default()),
        Box::new(SourceLayerStrategy),
        Box::new(ColorTableStrategy),
        Box::new(BluishColorStrategy),
    ]
}

const LAND_WORDS: &[&str] = &[
    "land", "ground", "terrain", "mountain", "mountains", "hill", "hills", "peak", "peaks",
    "forest", "forests", "wood", "woods", "jungle", "desert", "deserts", "sand", "dune", "swamp",
    "swamps", "marsh", "wetland", "bog", "ice", "snow", "glacier", "tundra", "district",
    "districts",
];

/// Map a terrain word such as `"ocean"` or `"forests"` to a category.
pub fn normalize_terrain_word(word: &str) -> TerrainCategory {
    let normalized = word.trim().to_lowercase();
    match normalized.as_str() {
        "river" | "rivers" | "stream" => TerrainCategory::River,
        "water" | "waters" | "lake" | "shallows" | "shallow-water" | "shallow-waters" => {
            TerrainCategory::ShallowWater
        }
        "sea" | "low-sea" => TerrainCategory::LowSea,
        "ocean" | "deep-sea" | "deep-water" => TerrainCategory::DeepSea,
        other if LAND_WORDS.contains(&other) => TerrainCategory::Land,
        _ => TerrainCategory::Unknown,
    }
}

/// Explicit terrain/type property on the feature.
#[derive(Debug, Clone)]
pub struct PropertyStrategy {
    fields: Vec<String>,
}

impl Default for PropertyStrategy {
    fn default() -> Self {
        Self {
            fields: vec!["terrain".into(), "type".into(), "class".into()],
        }
    }
}

impl FeatureStrategy for PropertyStrategy {
    fn name(&self) -> &'static str {
        "property"
    }

    fn classify(&self, feature: &MapFeature) -> TerrainCategory {
        self.fields
            .iter()
            .filter_map(|field| feature.property_str(field))
            .map(normalize_terrain_word)
            .find(|category| category.is_known())
            .unwrap_or(TerrainCategory::Unknown)
    }
}

const LAND_LAYER_WORDS: &[&str] = &[
    "land", "terrain", "mountain", "forest", "desert", "swamp", "marsh", "ice", "snow", "hill",
];

/// Identity of the data-source layer the feature came from.
#[derive(Debug, Clone, Copy)]
pub struct SourceLayerStrategy;

impl FeatureStrategy for SourceLayerStrategy {
    fn name(&self) -> &'static str {
        "source-layer"
    }

    fn classify(&self, feature: &MapFeature) -> TerrainCategory {
        let Some(layer) = feature
            .source_layer
            .as_deref()
            .or(feature.layer_id.as_deref())
        else {
            return TerrainCategory::Unknown;
        };
        let layer = layer.to_lowercase();

        // Most specific first: "deep-sea-waters" is deep, not generic water.
        if layer.contains("river") {
            TerrainCategory::River
        } else if layer.contains("shallow") {
            TerrainCategory::ShallowWater
        } else if layer.contains("deep") || layer.contains("ocean") {
            TerrainCategory::DeepSea
        } else if layer.contains("sea") {
            TerrainCategory::LowSea
        } else if layer.contains("water") {
            TerrainCategory::ShallowWater
        } else if LAND_LAYER_WORDS.iter().any(|word| layer.contains(word)) {
            TerrainCategory::Land
        } else {
            TerrainCategory::Unknown
        }
    }
}

/// Known palette colors of the tile compiler.
#[derive(Debug, Clone, Copy)]
pub struct ColorTableStrategy;

const COLOR_TABLE: &[((u8, u8, u8), TerrainCategory)] = &[
    ((138, 180, 248), TerrainCategory::ShallowWater), // waters, shallow-waters
    ((248, 241, 225), TerrainCategory::Land),         // land
    ((187, 226, 198), TerrainCategory::Land),         // forests
    ((222, 212, 184), TerrainCategory::Land),         // mountains
    ((222, 216, 184), TerrainCategory::Land),         // mountains, legacy style
    ((235, 227, 205), TerrainCategory::Land),         // hills
    ((255, 247, 190), TerrainCategory::Land),         // deserts
    ((183, 197, 188), TerrainCategory::Land),         // swamps
    ((212, 204, 185), TerrainCategory::Land),         // districts
    ((255, 255, 255), TerrainCategory::Land),         // ice
];

impl FeatureStrategy for ColorTableStrategy {
    fn name(&self) -> &'static str {
        "color-table"
    }

    fn classify(&self, feature: &MapFeature) -> TerrainCategory {
        let Some(rgb) = feature.properties.get("color").and_then(parse_color) else {
            return TerrainCategory::Unknown;
        };
        COLOR_TABLE
            .iter()
            .find(|(color, _)| *color == rgb)
            .map(|(_, category)| *category)
            .unwrap_or(TerrainCategory::Unknown)
    }
}

/// Last resort: any clearly blue color is water.
#[derive(Debug, Clone, Copy)]
pub struct BluishColorStrategy;

impl FeatureStrategy for BluishColorStrategy {
    fn name(&self) -> &'static str {
        "bluish-color"
    }

    fn classify(&self, feature: &MapFeature) -> TerrainCategory {
        let Some((r, g, b)) = feature.properties.get("color").and_then(parse_color) else {
            return TerrainCategory::Unknown;
        };
        let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
        if b > r + 20 && b > g + 10 {
            if (r + g + b) / 3 < 100 {
                TerrainCategory::DeepSea
            } else {
                TerrainCategory::ShallowWater
            }
        } else {
            TerrainCategory::Unknown
        }
    }
}

/// Parse a color given as `#rrggbb`, `#rgb`, `rgb()`/`rgba()`, an integer, or
/// an `{r, g, b}` object.
pub fn parse_color(value: &Value) -> Option<(u8, u8, u8)> {
    match value {
        Value::String(text) => parse_color_str(text),
        Value::Number(number) => {
            let packed = number.as_u64()?;
            if packed > 0xFF_FF_FF {
                return None;
            }
            Some((
                ((packed >> 16) & 0xFF) as u8,
                ((packed >> 8) & 0xFF) as u8,
                (packed & 0xFF) as u8,
            ))
        }
        Value::Object(map) => {
            let channel = |key: &str| map.get(key).and_then(Value::as_f64).map(clamp_channel);
            Some((channel("r")?, channel("g")?, channel("b")?))
        }
        _ => None,
    }
}

fn parse_color_str(text: &str) -> Option<(u8, u8, u8)> {
    let text = text.trim().to_lowercase();
    if let Some(hex) = text.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        return match hex.len() {
            6 | 8 => Some((
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            )),
            3 => {
                let digit = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|d| d * 17);
                Some((digit(0)?, digit(1)?, digit(2)?))
            }
            _ => None,
        };
    }

    let inner = text
        .strip_prefix("rgba(")
        .or_else(|| text.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let mut channels = inner.split(',').map(|part| part.trim().parse::<f64>().ok());
    let r = channels.next()??;
    let g = channels.next()??;
    let b = channels.next()??;
    Some((clamp_channel(r), clamp_channel(g), clamp_channel(b)))
}

fn clamp_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(properties: Value) -> MapFeature {
        MapFeature {
            properties: properties.as_object().cloned().unwrap_or_default(),
            ..MapFeature::default()
        }
    }

    #[test]
    fn property_strategy_reads_fields_in_order() {
        let strategy = PropertyStrategy::default();
        assert_eq!(
            strategy.classify(&feature(json!({"type": "mystery", "class": "ocean"}))),
            TerrainCategory::DeepSea
        );
        assert_eq!(
            strategy.classify(&feature(json!({"terrain": " Forests "}))),
            TerrainCategory::Land
        );
        assert_eq!(
            strategy.classify(&feature(json!({"name": "Absalom"}))),
            TerrainCategory::Unknown
        );
    }

    #[test]
    fn source_layer_prefers_specific_matches() {
        let mut f = MapFeature {
            source_layer: Some("deep-sea-waters".into()),
            ..MapFeature::default()
        };
        assert_eq!(SourceLayerStrategy.classify(&f), TerrainCategory::DeepSea);
        f.source_layer = Some("rivers".into());
        assert_eq!(SourceLayerStrategy.classify(&f), TerrainCategory::River);
        f.source_layer = Some("geometry".into());
        assert_eq!(SourceLayerStrategy.classify(&f), TerrainCategory::Unknown);
    }

    #[test]
    fn color_formats_are_normalized() {
        assert_eq!(parse_color(&json!("#8ab4f8")), Some((138, 180, 248)));
        assert_eq!(parse_color(&json!("rgb(138, 180, 248)")), Some((138, 180, 248)));
        assert_eq!(parse_color(&json!("rgba(138,180,248,0.5)")), Some((138, 180, 248)));
        assert_eq!(parse_color(&json!(0x8AB4F8)), Some((138, 180, 248)));
        assert_eq!(parse_color(&json!({"r": 138, "g": 180, "b": 248})), Some((138, 180, 248)));
        assert_eq!(parse_color(&json!("#fff")), Some((255, 255, 255)));
        assert_eq!(parse_color(&json!("teal")), None);
    }

    #[test]
    fn color_table_and_bluish_fallback() {
        let water = feature(json!({"color": "#8AB4F8"}));
        assert_eq!(ColorTableStrategy.classify(&water), TerrainCategory::ShallowWater);

        let navy = feature(json!({"color": "#102060"}));
        assert_eq!(ColorTableStrategy.classify(&navy), TerrainCategory::Unknown);
        assert_eq!(BluishColorStrategy.classify(&navy), TerrainCategory::DeepSea);

        let sand = feature(json!({"color": "#FFF7BE"}));
        assert_eq!(ColorTableStrategy.classify(&sand), TerrainCategory::Land);
        assert_eq!(BluishColorStrategy.classify(&sand), TerrainCategory::Unknown);
    }
}
