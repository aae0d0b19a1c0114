//! Robot metadata the reasoning queries need beyond the kinematic tree:
//! manipulator chains, end effectors, cameras, and grasp orientations.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use prospect_description::ObjectDescription;
use prospect_types::{Grasp, ProspectError};
use serde::{Deserialize, Serialize};

fn default_front_facing_axis() -> Vector3<f64> {
    Vector3::z()
}

/// The links that make up a gripper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndEffectorDescription {
    pub name: String,
    /// First link of the gripper subtree.
    pub start_link: String,
    /// Link whose pose is compared against reach targets.
    pub tool_frame: String,
    #[serde(default)]
    pub links: BTreeSet<String>,
}

impl EndEffectorDescription {
    pub fn new(
        name: impl Into<String>,
        start_link: impl Into<String>,
        tool_frame: impl Into<String>,
        links: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            start_link: start_link.into(),
            tool_frame: tool_frame.into(),
            links: links.into_iter().map(Into::into).collect(),
        }
    }

    /// Collect the links as the subtree of `start_link` in `description`.
    ///
    /// # Errors
    ///
    /// [`ProspectError::UnknownLink`] when `start_link` is not in the tree.
    pub fn from_description(
        name: impl Into<String>,
        start_link: impl Into<String>,
        tool_frame: impl Into<String>,
        description: &ObjectDescription,
    ) -> Result<Self, ProspectError> {
        let start_link = start_link.into();
        description.get_link_by_name(&start_link)?;
        let mut links = BTreeSet::new();
        let mut stack = vec![start_link.clone()];
        while let Some(link) = stack.pop() {
            for (_, child) in description.children_of(&link) {
                stack.push(child.clone());
            }
            links.insert(link);
        }
        Ok(Self {
            name: name.into(),
            start_link,
            tool_frame: tool_frame.into(),
            links,
        })
    }

    pub fn contains(&self, link: &str) -> bool {
        self.links.contains(link)
    }
}

/// A chain of links from `start_link` to `end_link`, optionally ending in a
/// gripper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicChainDescription {
    pub name: String,
    pub start_link: String,
    pub end_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_effector: Option<EndEffectorDescription>,
    /// Named joint configurations, e.g. `park`.
    #[serde(default)]
    pub static_joint_states: BTreeMap<String, BTreeMap<String, f64>>,
}

impl KinematicChainDescription {
    pub fn new(name: impl Into<String>, start_link: impl Into<String>, end_link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_link: start_link.into(),
            end_link: end_link.into(),
            end_effector: None,
            static_joint_states: BTreeMap::new(),
        }
    }

    pub fn with_end_effector(mut self, end_effector: EndEffectorDescription) -> Self {
        self.end_effector = Some(end_effector);
        self
    }

    pub fn with_static_joint_state(
        mut self,
        name: impl Into<String>,
        positions: impl IntoIterator<Item = (impl Into<String>, f64)>,
    ) -> Self {
        self.static_joint_states.insert(
            name.into(),
            positions.into_iter().map(|(j, p)| (j.into(), p)).collect(),
        );
        self
    }

    pub fn is_manipulator(&self) -> bool {
        self.end_effector.is_some()
    }

    pub fn static_joint_state(&self, name: &str) -> Option<&BTreeMap<String, f64>> {
        self.static_joint_states.get(name)
    }
}

/// A camera mounted on the robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDescription {
    pub name: String,
    pub link_name: String,
    #[serde(default)]
    pub minimal_height: f64,
    #[serde(default)]
    pub maximal_height: f64,
    /// Horizontal field of view, radians.
    #[serde(default)]
    pub horizontal_angle: f64,
    /// Vertical field of view, radians.
    #[serde(default)]
    pub vertical_angle: f64,
    /// Viewing direction in the camera link frame.
    #[serde(default = "default_front_facing_axis")]
    pub front_facing_axis: Vector3<f64>,
}

impl CameraDescription {
    pub fn new(name: impl Into<String>, link_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link_name: link_name.into(),
            minimal_height: 0.0,
            maximal_height: 0.0,
            horizontal_angle: 0.0,
            vertical_angle: 0.0,
            front_facing_axis: default_front_facing_axis(),
        }
    }

    pub fn with_front_facing_axis(mut self, axis: Vector3<f64>) -> Self {
        self.front_facing_axis = axis;
        self
    }
}

/// Everything the reasoning engine knows about a robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotDescription {
    pub name: String,
    pub base_link: String,
    #[serde(default)]
    pub chains: BTreeMap<String, KinematicChainDescription>,
    #[serde(default)]
    pub cameras: BTreeMap<String, CameraDescription>,
    /// Camera used when a query names none; the first registered one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_camera: Option<String>,
    /// Gripper orientation per grasp, as `[x, y, z, w]`.
    #[serde(default = "default_grasps")]
    pub grasps: BTreeMap<Grasp, [f64; 4]>,
}

/// Grasp orientations for a gripper whose approach axis is +X.
fn default_grasps() -> BTreeMap<Grasp, [f64; 4]> {
    BTreeMap::from([
        (Grasp::Front, [0.0, 0.0, 0.0, 1.0]),
        (Grasp::Left, [0.0, 0.0, -1.0, 1.0]),
        (Grasp::Right, [0.0, 0.0, 1.0, 1.0]),
        (Grasp::Top, [0.0, 1.0, 0.0, 1.0]),
        (Grasp::Back, [0.0, 0.0, 1.0, 0.0]),
        (Grasp::Bottom, [0.0, -1.0, 0.0, 1.0]),
    ])
}

impl RobotDescription {
    pub fn new(name: impl Into<String>, base_link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_link: base_link.into(),
            chains: BTreeMap::new(),
            cameras: BTreeMap::new(),
            default_camera: None,
            grasps: default_grasps(),
        }
    }

    pub fn with_chain(mut self, chain: KinematicChainDescription) -> Self {
        self.chains.insert(chain.name.clone(), chain);
        self
    }

    pub fn with_camera(mut self, camera: CameraDescription) -> Self {
        if self.default_camera.is_none() {
            self.default_camera = Some(camera.name.clone());
        }
        self.cameras.insert(camera.name.clone(), camera);
        self
    }

    pub fn chain(&self, name: &str) -> Option<&KinematicChainDescription> {
        self.chains.get(name)
    }

    /// Chains that end in a gripper.
    pub fn manipulator_chains(&self) -> impl Iterator<Item = &KinematicChainDescription> {
        self.chains.values().filter(|c| c.is_manipulator())
    }

    /// The gripper whose tool frame or name is `name`.
    pub fn end_effector(&self, name: &str) -> Option<&EndEffectorDescription> {
        self.manipulator_chains()
            .filter_map(|c| c.end_effector.as_ref())
            .find(|e| e.tool_frame == name || e.name == name)
    }

    pub fn default_camera(&self) -> Option<&CameraDescription> {
        self.default_camera
            .as_deref()
            .and_then(|name| self.cameras.get(name))
            .or_else(|| self.cameras.values().next())
    }

    pub fn grasp_orientation(&self, grasp: Grasp) -> Option<UnitQuaternion<f64>> {
        self.grasps.get(&grasp).map(|&[x, y, z, w]| {
            UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z))
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ProspectError> {
        toml::from_str(text).map_err(|e| ProspectError::DescriptionFormat(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ProspectError> {
        toml::to_string_pretty(self).map_err(|e| ProspectError::DescriptionFormat(e.to_string()))
    }
}
