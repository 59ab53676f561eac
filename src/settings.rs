use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::color::{ColorScheme, CommunityDetection};

/// Common slider metadata so bounds live in one place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl SliderRange {
    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    pub fn clamp(self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

// Physics ranges
pub const LINK_DISTANCE_RANGE: SliderRange = SliderRange::new(5.0, 400.0, 1.0);
pub const LINK_STRENGTH_RANGE: SliderRange = SliderRange::new(0.0, 2.0, 0.01);
pub const CHARGE_STRENGTH_RANGE: SliderRange = SliderRange::new(-1000.0, 0.0, 5.0);
pub const CHARGE_DISTANCE_RANGE: SliderRange = SliderRange::new(50.0, 2000.0, 10.0);
pub const GRAVITY_RANGE: SliderRange = SliderRange::new(0.0, 1.0, 0.005);
pub const VELOCITY_DECAY_RANGE: SliderRange = SliderRange::new(0.05, 0.95, 0.01);

// Visual ranges
pub const EDGE_THICKNESS_RANGE: SliderRange = SliderRange::new(0.2, 8.0, 0.1);
pub const NODE_RADIUS_RANGE: SliderRange = SliderRange::new(2.0, 32.0, 0.5);

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SettingsError {
    #[error("setting `{field}` is not a finite number ({value})")]
    NonFinite { field: &'static str, value: f32 },
    #[error("relevance range is inverted: {min} > {max}")]
    InvertedRange { min: f32, max: f32 },
}

/// Force coefficients handed to the live simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsParams {
    pub link_distance: f32,
    pub link_strength: f32,
    /// Negative values repel.
    pub charge_strength: f32,
    /// Charge interactions beyond this distance are ignored.
    pub charge_distance_max: f32,
    pub gravity: f32,
    /// 0 keeps all momentum, 1 freezes every node.
    pub velocity_decay: f32,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            link_distance: 60.0,
            link_strength: 0.4,
            charge_strength: -120.0,
            charge_distance_max: 600.0,
            gravity: 0.05,
            velocity_decay: 0.4,
        }
    }
}

impl PhysicsParams {
    /// Rejects non-finite values and clamps the rest into slider bounds.
    pub fn sanitized(self) -> Result<Self, SettingsError> {
        let fields = [
            ("link_distance", self.link_distance, LINK_DISTANCE_RANGE),
            ("link_strength", self.link_strength, LINK_STRENGTH_RANGE),
            ("charge_strength", self.charge_strength, CHARGE_STRENGTH_RANGE),
            ("charge_distance_max", self.charge_distance_max, CHARGE_DISTANCE_RANGE),
            ("gravity", self.gravity, GRAVITY_RANGE),
            ("velocity_decay", self.velocity_decay, VELOCITY_DECAY_RANGE),
        ];
        for (field, value, _) in fields {
            if !value.is_finite() {
                return Err(SettingsError::NonFinite { field, value });
            }
        }

        Ok(Self {
            link_distance: LINK_DISTANCE_RANGE.clamp(self.link_distance),
            link_strength: LINK_STRENGTH_RANGE.clamp(self.link_strength),
            charge_strength: CHARGE_STRENGTH_RANGE.clamp(self.charge_strength),
            charge_distance_max: CHARGE_DISTANCE_RANGE.clamp(self.charge_distance_max),
            gravity: GRAVITY_RANGE.clamp(self.gravity),
            velocity_decay: VELOCITY_DECAY_RANGE.clamp(self.velocity_decay),
        })
    }
}

/// Inclusive relevance window; edges outside it are drawn dimmed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelevanceRange {
    pub min: f32,
    pub max: f32,
}

impl Default for RelevanceRange {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl RelevanceRange {
    pub fn contains(self, score: f32) -> bool {
        score >= self.min && score <= self.max
    }

    pub fn sanitized(self) -> Result<Self, SettingsError> {
        for (field, value) in [("relevance_range.min", self.min), ("relevance_range.max", self.max)] {
            if !value.is_finite() {
                return Err(SettingsError::NonFinite { field, value });
            }
        }
        let min = self.min.clamp(0.0, 1.0);
        let max = self.max.clamp(0.0, 1.0);
        if min > max {
            return Err(SettingsError::InvertedRange { min, max });
        }
        Ok(Self { min, max })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub link_distance: f32,
    pub link_strength: f32,
    pub charge_strength: f32,
    pub charge_distance_max: f32,
    pub gravity: f32,
    pub velocity_decay: f32,
    pub edge_thickness: f32,
    pub node_radius: f32,
    pub color_scheme: ColorScheme,
    pub edge_color_scheme: ColorScheme,
    pub community_detection: CommunityDetection,
    pub relevance_range: RelevanceRange,
}

impl Default for Settings {
    fn default() -> Self {
        let physics = PhysicsParams::default();
        Self {
            link_distance: physics.link_distance,
            link_strength: physics.link_strength,
            charge_strength: physics.charge_strength,
            charge_distance_max: physics.charge_distance_max,
            gravity: physics.gravity,
            velocity_decay: physics.velocity_decay,
            edge_thickness: 1.2,
            node_radius: 7.0,
            color_scheme: ColorScheme::Default,
            edge_color_scheme: ColorScheme::Default,
            community_detection: CommunityDetection::None,
            relevance_range: RelevanceRange::default(),
        }
    }
}

impl Settings {
    pub fn physics(&self) -> Result<PhysicsParams, SettingsError> {
        PhysicsParams {
            link_distance: self.link_distance,
            link_strength: self.link_strength,
            charge_strength: self.charge_strength,
            charge_distance_max: self.charge_distance_max,
            gravity: self.gravity,
            velocity_decay: self.velocity_decay,
        }
        .sanitized()
    }

    /// Returns a copy with every numeric field validated and clamped.
    pub fn sanitized(&self) -> Result<Self, SettingsError> {
        let physics = self.physics()?;
        for (field, value) in [
            ("edge_thickness", self.edge_thickness),
            ("node_radius", self.node_radius),
        ] {
            if !value.is_finite() {
                return Err(SettingsError::NonFinite { field, value });
            }
        }

        Ok(Self {
            link_distance: physics.link_distance,
            link_strength: physics.link_strength,
            charge_strength: physics.charge_strength,
            charge_distance_max: physics.charge_distance_max,
            gravity: physics.gravity,
            velocity_decay: physics.velocity_decay,
            edge_thickness: EDGE_THICKNESS_RANGE.clamp(self.edge_thickness),
            node_radius: NODE_RADIUS_RANGE.clamp(self.node_radius),
            relevance_range: self.relevance_range.sanitized()?,
            ..self.clone()
        })
    }

    /// True when switching from `self` to `next` changes node or edge colors.
    pub fn colors_differ(&self, next: &Settings) -> bool {
        self.color_scheme != next.color_scheme
            || self.edge_color_scheme != next.edge_color_scheme
            || self.community_detection != next.community_detection
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&raw)
            .with_context(|| format!("invalid settings JSON in {}", path.display()))?;
        settings
            .sanitized()
            .with_context(|| format!("rejected settings from {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_settings_are_rejected() {
        let settings = Settings {
            gravity: f32::NAN,
            ..Settings::default()
        };
        assert!(matches!(
            settings.physics(),
            Err(SettingsError::NonFinite { field: "gravity", .. })
        ));
    }

    #[test]
    fn out_of_range_settings_are_clamped() {
        let settings = Settings {
            velocity_decay: 3.0,
            charge_strength: 50.0,
            node_radius: 400.0,
            ..Settings::default()
        };
        let clean = settings.sanitized().unwrap();
        assert_eq!(clean.velocity_decay, VELOCITY_DECAY_RANGE.max);
        assert_eq!(clean.charge_strength, 0.0);
        assert_eq!(clean.node_radius, NODE_RADIUS_RANGE.max);
    }

    #[test]
    fn inverted_relevance_range_is_an_error() {
        let range = RelevanceRange { min: 0.8, max: 0.2 };
        assert!(matches!(range.sanitized(), Err(SettingsError::InvertedRange { .. })));
        assert!(RelevanceRange::default().contains(0.0));
        assert!(RelevanceRange::default().contains(1.0));
    }

    #[test]
    fn partial_settings_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"link_distance": 90, "color_scheme": "viridis", "community_detection": "girvan-newman"}"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.link_distance, 90.0);
        assert_eq!(settings.color_scheme, ColorScheme::Viridis);
        assert_eq!(settings.community_detection, CommunityDetection::GirvanNewman);
        assert_eq!(settings.gravity, Settings::default().gravity);
    }

    #[test]
    fn color_change_detection_ignores_physics() {
        let base = Settings::default();
        let physics_only = Settings {
            link_distance: 10.0,
            ..base.clone()
        };
        let recolored = Settings {
            edge_color_scheme: ColorScheme::Turbo,
            ..base.clone()
        };
        assert!(!base.colors_differ(&physics_only));
        assert!(base.colors_differ(&recolored));
    }
}
