use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog entry {index} ({asset}) has invalid base scale {scale}")]
    InvalidScale {
        index: usize,
        asset: String,
        scale: f32,
    },
    #[error("{field} must be positive and finite, got {value}")]
    InvalidValue { field: &'static str, value: f32 },
}

/// How placed objects are edited after placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManipulationStrategy {
    /// Drag, pinch and double-activate rotate act directly on the selection.
    #[default]
    RawGestures,
    /// A gizmo is bound to the selection; raw drag/pinch is suppressed while
    /// it is attached.
    GizmoAssisted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOnSessionEnd {
    #[default]
    Keep,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub strategy: ManipulationStrategy,
    /// Metres of x/z travel per screen pixel of drag.
    pub drag_sensitivity: f32,
    pub double_tap_window_ms: u64,
    /// Radians applied by a double-activate rotate.
    pub rotate_step: f32,
    /// Radians of yaw per pixel of horizontal gizmo drag.
    pub gizmo_rotate_sensitivity: f32,
    /// Exponential scale rate per pixel of vertical gizmo drag.
    pub gizmo_scale_sensitivity: f32,
    pub selection_on_session_end: SelectionOnSessionEnd,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: ManipulationStrategy::RawGestures,
            drag_sensitivity: 0.001,
            double_tap_window_ms: 300,
            rotate_step: FRAC_PI_2,
            gizmo_rotate_sensitivity: 0.01,
            gizmo_scale_sensitivity: 0.005,
            selection_on_session_end: SelectionOnSessionEnd::Keep,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_strategy(mut self, strategy: ManipulationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("drag_sensitivity", self.drag_sensitivity),
            ("rotate_step", self.rotate_step),
            ("gizmo_rotate_sensitivity", self.gizmo_rotate_sensitivity),
            ("gizmo_scale_sensitivity", self.gizmo_scale_sensitivity),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub asset: String,
    pub base_scale: f32,
}

impl CatalogEntry {
    pub fn new(asset: impl Into<String>, base_scale: f32) -> Self {
        Self {
            asset: asset.into(),
            base_scale,
        }
    }
}

/// Static ordered table of placeable assets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub entries: Vec<CatalogEntry>,
}

impl CatalogConfig {
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self, ConfigError> {
        let config = Self { entries };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: CatalogConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in furniture set shipped with the demo host.
    pub fn furniture() -> Self {
        let entries = [
            ("dylan_armchair_yolk_yellow.glb", 0.01),
            ("ivan_armchair_mineral_blue.glb", 0.01),
            ("marble_coffee_table.glb", 0.005),
            ("flippa_functional_coffee_table_w._storagewalnut.glb", 0.01),
            ("frame_armchairpetrol_velvet_with_gold_frame.glb", 0.01),
            ("elnaz_nesting_side_tables_brass__green_marble.glb", 0.1),
            ("Standing_lamp.glb", 0.1),
            ("Dining_Set.glb", 0.1),
            ("Little_Bookcase.glb", 0.1),
            ("Plant_Decor.glb", 0.1),
        ]
        .into_iter()
        .map(|(asset, scale)| CatalogEntry::new(asset, scale))
        .collect();
        Self { entries }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, entry) in self.entries.iter().enumerate() {
            if !(entry.base_scale.is_finite() && entry.base_scale > 0.0) {
                return Err(ConfigError::InvalidScale {
                    index,
                    asset: entry.asset.clone(),
                    scale: entry.base_scale,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_fills_missing_fields_with_defaults() {
        let config = EngineConfig::from_json_str(r#"{"strategy":"gizmo_assisted"}"#)
            .expect("valid config");
        assert_eq!(config.strategy, ManipulationStrategy::GizmoAssisted);
        assert_eq!(config.double_tap_window_ms, 300);
        assert_eq!(config.selection_on_session_end, SelectionOnSessionEnd::Keep);
    }

    #[test]
    fn engine_config_rejects_non_positive_sensitivity() {
        let err = EngineConfig::from_json_str(r#"{"drag_sensitivity":0.0}"#)
            .expect_err("zero sensitivity");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "drag_sensitivity",
                ..
            }
        ));
    }

    #[test]
    fn catalog_config_parses_and_validates() {
        let config = CatalogConfig::from_json_str(
            r#"{"entries":[{"asset":"chair.glb","base_scale":0.5}]}"#,
        )
        .expect("catalog");
        assert_eq!(config.entries, vec![CatalogEntry::new("chair.glb", 0.5)]);

        let err = CatalogConfig::from_json_str(
            r#"{"entries":[{"asset":"chair.glb","base_scale":-1.0}]}"#,
        )
        .expect_err("negative scale");
        assert!(err.to_string().contains("chair.glb"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            CatalogConfig::from_json_str("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn furniture_table_is_valid() {
        let config = CatalogConfig::furniture();
        assert_eq!(config.entries.len(), 10);
        assert!(config.validate().is_ok());
        assert_eq!(config.entries[2].base_scale, 0.005);
    }
}
