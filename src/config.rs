//! Canvas configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scene::LayerId;
use crate::Error;

/// Tunables for a [`CanvasHandler`](crate::canvas::CanvasHandler)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasConfig {
    /// Scale factor per zoom level, level 0 first
    pub level_to_scale: Vec<f64>,
    /// Minimum spacing between item dispatches of the same pointer kind
    pub dispatch_throttle_ms: u64,
    /// Default tolerance for line hit testing, in screen pixels
    pub line_hit_margin: f64,
    /// Forwarded to the surface on resize
    pub device_pixel_ratio: f64,
    /// Layers hidden at startup
    pub hidden_layers: Vec<LayerId>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            level_to_scale: vec![1.0, 0.85, 0.6],
            dispatch_throttle_ms: 33,
            line_hit_margin: 6.0,
            device_pixel_ratio: 1.0,
            hidden_layers: Vec::new(),
        }
    }
}

impl CanvasConfig {
    /// Parse a config from JSON and validate it
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let config: CanvasConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the zoom table and numeric fields
    pub fn validate(&self) -> Result<(), Error> {
        validate_zoom_table(&self.level_to_scale)?;
        if !(self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "device pixel ratio must be positive, got {}",
                self.device_pixel_ratio
            )));
        }
        Ok(())
    }

    pub fn dispatch_throttle(&self) -> Duration {
        Duration::from_millis(self.dispatch_throttle_ms)
    }
}

/// A zoom table must be non-empty with finite, positive scales
pub fn validate_zoom_table(table: &[f64]) -> Result<(), Error> {
    if table.is_empty() {
        return Err(Error::InvalidZoomTable("table is empty".to_string()));
    }
    if let Some(bad) = table.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
        return Err(Error::InvalidZoomTable(format!(
            "scale {bad} is not a positive number"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = CanvasConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CanvasConfig::default());
    }

    #[test]
    fn test_camel_case_fields() {
        let config = CanvasConfig::from_json_str(
            r#"{"levelToScale":[1.0,0.5],"dispatchThrottleMs":0,"hiddenLayers":["mapTiles"]}"#,
        )
        .unwrap();
        assert_eq!(config.level_to_scale, vec![1.0, 0.5]);
        assert_eq!(config.dispatch_throttle(), Duration::ZERO);
        assert_eq!(config.hidden_layers, vec![LayerId::MapTiles]);
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(CanvasConfig::from_json_str(r#"{"levelToScale":[]}"#).is_err());
        assert!(CanvasConfig::from_json_str(r#"{"levelToScale":[1.0,0.0]}"#).is_err());
        assert!(matches!(
            CanvasConfig::from_json_str("not json"),
            Err(Error::Deserialize(_))
        ));
    }

    #[test]
    fn test_rejects_bad_pixel_ratio() {
        let config = CanvasConfig {
            device_pixel_ratio: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        assert!(matches!(
            CanvasConfig::from_json_str(r#"{"devicePixelRatio":-1.0}"#),
            Err(Error::InvalidConfig(_))
        ));
    }
}
