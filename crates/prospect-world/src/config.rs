//! World-level configuration.

use prospect_types::JointType;
use serde::{Deserialize, Serialize};

/// Tunables shared by every entity of a [`World`][crate::World].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Acceptable joint-state error for rotational joints, in radians.
    pub revolute_joint_position_tolerance: f64,
    /// Acceptable joint-state error for every other joint type, in metres.
    pub prismatic_joint_position_tolerance: f64,
    /// Re-read joint positions from the backend on every access instead of
    /// returning the last written value.
    pub update_positions_from_sim_on_get: bool,
    /// Frame poses are expressed in.
    pub default_frame: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            revolute_joint_position_tolerance: 0.0087,
            prismatic_joint_position_tolerance: 0.001,
            update_positions_from_sim_on_get: true,
            default_frame: prospect_geometry::transform::MAP_FRAME.to_string(),
        }
    }
}

impl WorldConfig {
    /// Acceptable position error assigned to a joint of type `joint_type`.
    pub fn joint_tolerance(&self, joint_type: JointType) -> f64 {
        if joint_type.is_rotational() {
            self.revolute_joint_position_tolerance
        } else {
            self.prismatic_joint_position_tolerance
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_follows_joint_type() {
        let cfg = WorldConfig::default();
        assert!((cfg.joint_tolerance(JointType::Revolute) - 0.0087).abs() < 1e-12);
        assert!((cfg.joint_tolerance(JointType::Continuous) - 0.0087).abs() < 1e-12);
        assert!((cfg.joint_tolerance(JointType::Prismatic) - 0.001).abs() < 1e-12);
    }

    #[test]
    fn refresh_on_read_is_default() {
        assert!(WorldConfig::default().update_positions_from_sim_on_get);
        assert_eq!(WorldConfig::default().default_frame, "map");
    }
}
