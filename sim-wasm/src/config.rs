use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::math::{clamp_finite, is_finite3, Vec3};

pub const MAX_SCALE: f32 = 10.0;
pub const MAX_DISTANCE: f32 = 1.0e4;
pub const MIN_SPEED_UP: f32 = 1.0;
pub const MAX_SPEED_UP: f32 = 2.0;
pub const MIN_SLOW_DOWN: f32 = 0.1;
pub const MAX_SLOW_DOWN: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl WorldBounds {
    pub fn new(min: Vec3, max: Vec3) -> Result<Self, SimError> {
        if !is_finite3(min) || !is_finite3(max) {
            return Err(SimError::InvalidBounds("bounds must be finite"));
        }
        if (0..3).any(|axis| min[axis] >= max[axis]) {
            return Err(SimError::InvalidBounds("min must be below max on every axis"));
        }
        let bounds = Self { min, max };
        if !is_finite3(bounds.extent()) {
            return Err(SimError::InvalidBounds("extent overflows f32"));
        }
        Ok(bounds)
    }

    pub fn cube(half_extent: f32) -> Result<Self, SimError> {
        Self::new(
            [-half_extent, -half_extent, -half_extent],
            [half_extent, half_extent, half_extent],
        )
    }

    pub fn extent(&self) -> Vec3 {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn center(&self) -> Vec3 {
        let extent = self.extent();
        [
            self.min[0] + extent[0] * 0.5,
            self.min[1] + extent[1] * 0.5,
            self.min[2] + extent[2] * 0.5,
        ]
    }

    // Mean of the three extents.
    pub fn size(&self) -> f32 {
        let extent = self.extent();
        (extent[0] + extent[1] + extent[2]) / 3.0
    }

    pub fn contains(&self, position: Vec3) -> bool {
        (0..3).all(|axis| position[axis] >= self.min[axis] && position[axis] < self.max[axis])
    }

    // Falls back to `self` when the margin would leave an empty box.
    pub fn shrunk(&self, margin: f32) -> Self {
        let inner = Self {
            min: [self.min[0] + margin, self.min[1] + margin, self.min[2] + margin],
            max: [self.max[0] - margin, self.max[1] - margin, self.max[2] - margin],
        };
        if (0..3).any(|axis| inner.min[axis] >= inner.max[axis]) {
            return *self;
        }
        inner
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            min: [-50.0, -50.0, -50.0],
            max: [50.0, 50.0, 50.0],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ForceMode {
    #[default]
    Impulse,
    // Folded into velocity on the next integration.
    Acceleration,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisibleRange {
    #[default]
    Inclusive,
    /// Skips the highest-index layer of the visible box on each axis.
    Exclusive,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlockConfig {
    pub sight_distance: f32,
    pub min_separation: f32,
    pub separation_scale: f32,
    pub cohesion_scale: f32,
    pub alignment_scale: f32,
    pub reflect_threshold: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub speed_up: f32,
    pub slow_down: f32,
    pub spawn_speed_min: f32,
    pub spawn_speed_max: f32,
    pub force_mode: ForceMode,
    pub visible_range: VisibleRange,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            sight_distance: 8.0,
            min_separation: 2.0,
            separation_scale: 0.05,
            cohesion_scale: 0.002,
            alignment_scale: 0.05,
            reflect_threshold: 5.0,
            min_speed: 0.3,
            max_speed: 1.0,
            speed_up: 1.1,
            slow_down: 0.9,
            spawn_speed_min: 0.3,
            spawn_speed_max: 0.8,
            force_mode: ForceMode::Impulse,
            visible_range: VisibleRange::Inclusive,
        }
    }
}

impl FlockConfig {
    /// Returns `true` when anything changed.
    pub fn sanitize(&mut self) -> bool {
        let before = *self;
        let d = Self::default();

        self.sight_distance = clamp_finite(self.sight_distance, 0.0, MAX_DISTANCE, d.sight_distance);
        self.min_separation =
            clamp_finite(self.min_separation, 0.0, MAX_DISTANCE, d.min_separation);
        self.separation_scale =
            clamp_finite(self.separation_scale, 0.0, MAX_SCALE, d.separation_scale);
        self.cohesion_scale = clamp_finite(self.cohesion_scale, 0.0, MAX_SCALE, d.cohesion_scale);
        self.alignment_scale =
            clamp_finite(self.alignment_scale, 0.0, MAX_SCALE, d.alignment_scale);
        self.reflect_threshold =
            clamp_finite(self.reflect_threshold, 0.0, MAX_DISTANCE, d.reflect_threshold);
        self.min_speed = clamp_finite(self.min_speed, 0.0, MAX_DISTANCE, d.min_speed);
        self.max_speed = clamp_finite(self.max_speed, 0.0, MAX_DISTANCE, d.max_speed);
        self.speed_up = clamp_finite(self.speed_up, MIN_SPEED_UP, MAX_SPEED_UP, d.speed_up);
        self.slow_down = clamp_finite(self.slow_down, MIN_SLOW_DOWN, MAX_SLOW_DOWN, d.slow_down);
        self.spawn_speed_min =
            clamp_finite(self.spawn_speed_min, 0.0, MAX_DISTANCE, d.spawn_speed_min);
        self.spawn_speed_max = clamp_finite(
            self.spawn_speed_max,
            self.spawn_speed_min,
            MAX_DISTANCE,
            d.spawn_speed_max.max(self.spawn_speed_min),
        );

        *self != before
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.min_speed > self.max_speed {
            return Err(SimError::InvalidConfig("min_speed exceeds max_speed"));
        }
        if self.min_separation > self.sight_distance {
            return Err(SimError::InvalidConfig(
                "min_separation exceeds sight_distance",
            ));
        }
        if self.reflect_threshold < self.max_speed {
            return Err(SimError::InvalidConfig(
                "reflect_threshold must be at least max_speed",
            ));
        }
        if self.spawn_speed_max > self.max_speed {
            return Err(SimError::InvalidConfig("spawn_speed_max exceeds max_speed"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FlockConfig, ForceMode, VisibleRange, WorldBounds};
    use crate::error::SimError;

    #[test]
    fn default_config_is_valid() {
        let mut config = FlockConfig::default();
        assert!(!config.sanitize());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sanitize_replaces_non_finite_values() {
        let mut config = FlockConfig {
            sight_distance: f32::NAN,
            separation_scale: -3.0,
            speed_up: 0.5,
            ..FlockConfig::default()
        };

        assert!(config.sanitize());
        assert_eq!(config.sight_distance, FlockConfig::default().sight_distance);
        assert_eq!(config.separation_scale, 0.0);
        assert_eq!(config.speed_up, 1.0);
    }

    #[test]
    fn validate_rejects_thin_reflect_threshold() {
        let config = FlockConfig {
            reflect_threshold: 0.5,
            max_speed: 2.0,
            spawn_speed_max: 1.0,
            ..FlockConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimError::InvalidConfig(
                "reflect_threshold must be at least max_speed"
            ))
        );
    }

    #[test]
    fn partial_config_deserializes_over_defaults() {
        let config: FlockConfig = from_fields(&[("sightDistance", 3.0)]);
        assert_eq!(config.sight_distance, 3.0);
        assert_eq!(config.min_separation, FlockConfig::default().min_separation);
        assert_eq!(config.force_mode, ForceMode::Impulse);
        assert_eq!(config.visible_range, VisibleRange::Inclusive);
    }

    fn from_fields(fields: &[(&str, f32)]) -> FlockConfig {
        use serde::de::value::{Error, MapDeserializer};
        use serde::Deserialize;

        let map = MapDeserializer::<_, Error>::new(fields.iter().copied());
        FlockConfig::deserialize(map).expect("config should deserialize")
    }

    #[test]
    fn bounds_reject_inverted_axes() {
        assert!(WorldBounds::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]).is_ok());
        assert!(matches!(
            WorldBounds::new([0.0, 2.0, 0.0], [1.0, 1.0, 1.0]),
            Err(SimError::InvalidBounds(_))
        ));
        assert!(WorldBounds::new([f32::NAN, 0.0, 0.0], [1.0, 1.0, 1.0]).is_err());
    }

    #[test]
    fn bounds_reject_overflowing_extent() {
        assert!(matches!(
            WorldBounds::new([-3.0e38; 3], [3.0e38; 3]),
            Err(SimError::InvalidBounds(_))
        ));
        assert!(matches!(
            WorldBounds::new([0.0, 0.0, -f32::MAX], [1.0, 1.0, f32::MAX]),
            Err(SimError::InvalidBounds(_))
        ));
        assert!(WorldBounds::cube(1.0e38).is_ok());
    }

    #[test]
    fn bounds_derived_quantities() {
        let bounds = WorldBounds::new([-50.0, 0.0, 10.0], [50.0, 20.0, 40.0]).unwrap();
        assert_eq!(bounds.extent(), [100.0, 20.0, 30.0]);
        assert_eq!(bounds.center(), [0.0, 10.0, 25.0]);
        assert_eq!(bounds.size(), 50.0);
        assert!(bounds.contains([-50.0, 0.0, 10.0]));
        assert!(!bounds.contains([50.0, 0.0, 10.0]));

        let inner = bounds.shrunk(5.0);
        assert_eq!(inner.min, [-45.0, 5.0, 15.0]);
        assert_eq!(bounds.shrunk(15.0), bounds);
    }
}
