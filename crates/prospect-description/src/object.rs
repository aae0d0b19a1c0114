//! A whole body's kinematic tree.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use prospect_types::{JointType, ProspectError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::joint::JointDescription;
use crate::link::LinkDescription;

/// Serialised shape of an [`ObjectDescription`]; the lookup maps are derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DescriptionData {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tip: Option<String>,
    #[serde(default, rename = "link")]
    links: Vec<LinkDescription>,
    #[serde(default, rename = "joint")]
    joints: Vec<JointDescription>,
}

/// Links and joints of one body, indexed as a rooted tree.
///
/// The child and parent maps always form a single connected tree rooted at
/// [`root`](Self::root); every constructor and mutator re-validates this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DescriptionData", into = "DescriptionData")]
pub struct ObjectDescription {
    name: String,
    links: Vec<LinkDescription>,
    joints: Vec<JointDescription>,
    link_map: HashMap<String, usize>,
    joint_map: HashMap<String, usize>,
    /// link → `(joint, child link)` for every joint leaving the link.
    child_map: HashMap<String, Vec<(String, String)>>,
    /// link → `(joint, parent link)`; absent for the root.
    parent_map: HashMap<String, (String, String)>,
    virtual_joint_names: BTreeSet<String>,
    root: String,
    tip: Option<String>,
}

impl TryFrom<DescriptionData> for ObjectDescription {
    type Error = ProspectError;

    fn try_from(data: DescriptionData) -> Result<Self, Self::Error> {
        let mut description = Self::new(data.name, data.links, data.joints, data.root)?;
        if let Some(tip) = data.tip {
            description.set_tip(tip)?;
        }
        Ok(description)
    }
}

impl From<ObjectDescription> for DescriptionData {
    fn from(d: ObjectDescription) -> Self {
        Self {
            name: d.name,
            root: Some(d.root),
            tip: d.tip,
            links: d.links,
            joints: d.joints,
        }
    }
}

impl ObjectDescription {
    /// Build and validate a description.
    ///
    /// When `root` is `None` the unique link without a parent joint becomes
    /// the root.
    ///
    /// # Errors
    ///
    /// [`ProspectError::MalformedKinematicTree`] for duplicate names, joints
    /// naming unknown links, links with two parents, cycles, disconnected
    /// links, or an ambiguous root.
    pub fn new(
        name: impl Into<String>,
        links: Vec<LinkDescription>,
        joints: Vec<JointDescription>,
        root: Option<String>,
    ) -> Result<Self, ProspectError> {
        let mut description = Self {
            name: name.into(),
            links,
            joints,
            link_map: HashMap::new(),
            joint_map: HashMap::new(),
            child_map: HashMap::new(),
            parent_map: HashMap::new(),
            virtual_joint_names: BTreeSet::new(),
            root: root.unwrap_or_default(),
            tip: None,
        };
        description.rebuild()?;
        Ok(description)
    }

    /// A single-link body with no joints.
    pub fn single_link(name: impl Into<String>, link: LinkDescription) -> Self {
        let link_name = link.name.clone();
        let mut link_map = HashMap::new();
        link_map.insert(link_name.clone(), 0);
        Self {
            name: name.into(),
            links: vec![link],
            joints: Vec::new(),
            link_map,
            joint_map: HashMap::new(),
            child_map: HashMap::new(),
            parent_map: HashMap::new(),
            virtual_joint_names: BTreeSet::new(),
            root: link_name,
            tip: None,
        }
    }

    fn malformed(&self, msg: impl std::fmt::Display) -> ProspectError {
        ProspectError::MalformedKinematicTree(format!("{}: {msg}", self.name))
    }

    /// Recompute every derived map and check the tree invariant.
    fn rebuild(&mut self) -> Result<(), ProspectError> {
        let mut link_map = HashMap::with_capacity(self.links.len());
        for (i, link) in self.links.iter().enumerate() {
            if link_map.insert(link.name.clone(), i).is_some() {
                return Err(self.malformed(format!("duplicate link '{}'", link.name)));
            }
        }
        let mut joint_map = HashMap::with_capacity(self.joints.len());
        let mut child_map: HashMap<String, Vec<(String, String)>> = HashMap::new();
        let mut parent_map = HashMap::new();
        for (i, joint) in self.joints.iter().enumerate() {
            if joint_map.insert(joint.name.clone(), i).is_some() {
                return Err(self.malformed(format!("duplicate joint '{}'", joint.name)));
            }
            for end in [&joint.parent, &joint.child] {
                if !link_map.contains_key(end) {
                    return Err(
                        self.malformed(format!("joint '{}' names unknown link '{end}'", joint.name))
                    );
                }
            }
            if parent_map
                .insert(joint.child.clone(), (joint.name.clone(), joint.parent.clone()))
                .is_some()
            {
                return Err(self.malformed(format!("link '{}' has two parents", joint.child)));
            }
            child_map
                .entry(joint.parent.clone())
                .or_default()
                .push((joint.name.clone(), joint.child.clone()));
        }

        let root = if self.root.is_empty() {
            let roots: Vec<_> = self
                .links
                .iter()
                .filter(|l| !parent_map.contains_key(&l.name))
                .map(|l| l.name.clone())
                .collect();
            match roots.as_slice() {
                [root] => root.clone(),
                [] => return Err(self.malformed("no root link")),
                many => return Err(self.malformed(format!("several root candidates {many:?}"))),
            }
        } else {
            self.root.clone()
        };
        if !link_map.contains_key(&root) {
            return Err(self.malformed(format!("root link '{root}' does not exist")));
        }
        if parent_map.contains_key(&root) {
            return Err(self.malformed(format!("root link '{root}' has a parent joint")));
        }

        // Every link must be reachable from the root exactly once.
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([root.clone()]);
        while let Some(link) = queue.pop_front() {
            if !seen.insert(link.clone()) {
                return Err(self.malformed(format!("cycle through link '{link}'")));
            }
            for (_, child) in child_map.get(&link).into_iter().flatten() {
                queue.push_back(child.clone());
            }
        }
        if seen.len() != self.links.len() {
            let orphan = self
                .links
                .iter()
                .find(|l| !seen.contains(&l.name))
                .map(|l| l.name.clone())
                .unwrap_or_default();
            return Err(self.malformed(format!("link '{orphan}' is not connected to the root")));
        }

        self.virtual_joint_names = self
            .joints
            .iter()
            .filter(|j| j.is_virtual)
            .map(|j| j.name.clone())
            .collect();
        self.link_map = link_map;
        self.joint_map = joint_map;
        self.child_map = child_map;
        self.parent_map = parent_map;
        self.root = root;
        Ok(())
    }

    /// Re-check the single-rooted-tree invariant.
    pub fn validate(&self) -> Result<(), ProspectError> {
        self.clone().rebuild()
    }

    // ── accessors ───────────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn links(&self) -> &[LinkDescription] {
        &self.links
    }

    pub fn joints(&self) -> &[JointDescription] {
        &self.joints
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn tip(&self) -> Option<&str> {
        self.tip.as_deref()
    }

    /// Declare the tip link of the main chain.
    pub fn set_tip(&mut self, tip: impl Into<String>) -> Result<(), ProspectError> {
        let tip = tip.into();
        if !self.link_map.contains_key(&tip) {
            return Err(self.unknown_link(&tip));
        }
        self.tip = Some(tip);
        Ok(())
    }

    pub fn link_index(&self, name: &str) -> Option<usize> {
        self.link_map.get(name).copied()
    }

    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joint_map.get(name).copied()
    }

    pub fn get_link_by_name(&self, name: &str) -> Result<&LinkDescription, ProspectError> {
        self.link_index(name)
            .map(|i| &self.links[i])
            .ok_or_else(|| self.unknown_link(name))
    }

    pub fn get_joint_by_name(&self, name: &str) -> Result<&JointDescription, ProspectError> {
        self.joint_index(name)
            .map(|i| &self.joints[i])
            .ok_or_else(|| ProspectError::UnknownJoint {
                object: self.name.clone(),
                joint: name.to_string(),
            })
    }

    /// `(joint, child link)` pairs leaving `link`.
    pub fn children_of(&self, link: &str) -> &[(String, String)] {
        self.child_map.get(link).map_or(&[], Vec::as_slice)
    }

    /// `(joint, parent link)` of `link`; `None` for the root.
    pub fn parent_of(&self, link: &str) -> Option<&(String, String)> {
        self.parent_map.get(link)
    }

    pub fn virtual_joint_names(&self) -> &BTreeSet<String> {
        &self.virtual_joint_names
    }

    pub fn is_joint_virtual(&self, name: &str) -> bool {
        self.virtual_joint_names.contains(name)
    }

    fn unknown_link(&self, name: &str) -> ProspectError {
        ProspectError::UnknownLink {
            object: self.name.clone(),
            link: name.to_string(),
        }
    }

    // ── mutation ────────────────────────────────────────────────────────────

    /// Add a joint before the body is instantiated.
    ///
    /// A parent link that does not exist yet is created without geometry; if
    /// the new joint's child is the current root, that parent becomes the new
    /// root (this is how a virtual odometry frame is put under a mobile base).
    ///
    /// # Errors
    ///
    /// [`ProspectError::MalformedKinematicTree`] when the result would not be
    /// a single tree; the description is left unchanged.
    pub fn add_joint(&mut self, joint: JointDescription) -> Result<(), ProspectError> {
        let previous = self.clone();
        if !self.link_map.contains_key(&joint.parent) {
            debug!(object = %self.name, link = %joint.parent, "adding frame link for new joint");
            self.links.push(LinkDescription::new(joint.parent.clone()));
            if joint.child == self.root {
                self.root = joint.parent.clone();
            }
        }
        self.joints.push(joint);
        if let Err(e) = self.rebuild() {
            *self = previous;
            return Err(e);
        }
        Ok(())
    }

    // ── chains ──────────────────────────────────────────────────────────────

    /// Names along the tree path from `start` down to `end`, in root-to-tip
    /// order.
    ///
    /// Links and joints alternate, starting and ending with links; `joints`
    /// and `links` select which kinds are emitted and `fixed = false` drops
    /// fixed joints.
    ///
    /// # Errors
    ///
    /// [`ProspectError::UnknownLink`] for unknown names, and
    /// [`ProspectError::MalformedKinematicTree`] when `end` is not below
    /// `start`.
    pub fn get_chain(
        &self,
        start: &str,
        end: &str,
        joints: bool,
        links: bool,
        fixed: bool,
    ) -> Result<Vec<String>, ProspectError> {
        self.get_link_by_name(start)?;
        self.get_link_by_name(end)?;

        let mut reversed = Vec::new();
        let mut current = end.to_string();
        while current != start {
            let Some((joint, parent)) = self.parent_map.get(&current) else {
                return Err(self.malformed(format!("no chain from '{start}' to '{end}'")));
            };
            if links {
                reversed.push(current.clone());
            }
            let is_fixed = self.joints[self.joint_map[joint]].joint_type == JointType::Fixed;
            if joints && (fixed || !is_fixed) {
                reversed.push(joint.clone());
            }
            current = parent.clone();
        }
        if links {
            reversed.push(start.to_string());
        }
        reversed.reverse();
        Ok(reversed)
    }

    // ── (de)serialisation ───────────────────────────────────────────────────

    /// Parse the native TOML description format.
    pub fn from_toml_str(text: &str) -> Result<Self, ProspectError> {
        toml::from_str(text).map_err(|e| ProspectError::DescriptionFormat(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ProspectError> {
        toml::to_string_pretty(self).map_err(|e| ProspectError::DescriptionFormat(e.to_string()))
    }

    /// Every mesh file name, made absolute against `base` when relative.
    pub fn make_mesh_paths_absolute(&mut self, base: &Path) {
        for link in &mut self.links {
            let dir = link.mesh_dir.take();
            for shape in &mut link.geometry {
                if let prospect_geometry::Shape::Mesh { file_name, .. } = shape {
                    let path = PathBuf::from(&*file_name);
                    if path.is_relative() {
                        let anchor = dir.as_deref().unwrap_or(base);
                        let anchored = if anchor.is_relative() {
                            base.join(anchor)
                        } else {
                            anchor.to_path_buf()
                        };
                        *file_name = anchored.join(path).display().to_string();
                    }
                }
            }
        }
    }
}

/// File name a generated description for `name` is saved under.
///
/// Mesh sources and foreign formats become `<name><native_extension>`; a
/// file already in the native format keeps its own file name.
pub fn file_name_for(path: &Path, extension: &str, name: &str, native_extension: &str) -> String {
    if extension == native_extension {
        if let Some(file) = path.file_name().and_then(|f| f.to_str()) {
            return file.to_string();
        }
    }
    format!("{name}{native_extension}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospect_geometry::{Pose, Shape};

    fn arm() -> ObjectDescription {
        let links = ["base", "shoulder", "upper_arm", "gripper", "camera"]
            .into_iter()
            .map(|n| LinkDescription::new(n).with_shape(Shape::Box { size: [0.1; 3] }))
            .collect();
        let joints = vec![
            JointDescription::new("shoulder_pan", JointType::Revolute, "base", "shoulder")
                .with_limits(2.0, -2.0),
            JointDescription::new("shoulder_lift", JointType::Revolute, "shoulder", "upper_arm")
                .with_origin(Pose::from_xyz(0.0, 0.0, 0.3)),
            JointDescription::new("gripper_mount", JointType::Fixed, "upper_arm", "gripper"),
            JointDescription::new("camera_mount", JointType::Fixed, "base", "camera"),
        ];
        ObjectDescription::new("arm", links, joints, None).unwrap()
    }

    #[test]
    fn root_is_inferred() {
        let d = arm();
        assert_eq!(d.root(), "base");
        assert!(d.parent_of("base").is_none());
        assert_eq!(
            d.parent_of("upper_arm"),
            Some(&("shoulder_lift".to_string(), "shoulder".to_string()))
        );
        assert_eq!(d.children_of("base").len(), 2);
        assert!(d.children_of("gripper").is_empty());
    }

    #[test]
    fn cycle_is_rejected() {
        let links = vec![LinkDescription::new("a"), LinkDescription::new("b")];
        let joints = vec![
            JointDescription::new("ab", JointType::Fixed, "a", "b"),
            JointDescription::new("ba", JointType::Fixed, "b", "a"),
        ];
        let err = ObjectDescription::new("loop", links, joints, Some("a".into())).unwrap_err();
        assert!(matches!(err, ProspectError::MalformedKinematicTree(_)));
    }

    #[test]
    fn disconnected_link_is_rejected() {
        let links = vec![
            LinkDescription::new("a"),
            LinkDescription::new("b"),
            LinkDescription::new("island"),
        ];
        let joints = vec![JointDescription::new("ab", JointType::Fixed, "a", "b")];
        let err = ObjectDescription::new("x", links, joints, Some("a".into())).unwrap_err();
        assert!(err.to_string().contains("island"));
    }

    #[test]
    fn unknown_joint_endpoint_is_rejected() {
        let links = vec![LinkDescription::new("a")];
        let joints = vec![JointDescription::new("ab", JointType::Fixed, "a", "ghost")];
        assert!(ObjectDescription::new("x", links, joints, None).is_err());
    }

    #[test]
    fn chain_respects_filters() {
        let d = arm();
        assert_eq!(
            d.get_chain("base", "gripper", true, true, true).unwrap(),
            vec![
                "base",
                "shoulder_pan",
                "shoulder",
                "shoulder_lift",
                "upper_arm",
                "gripper_mount",
                "gripper"
            ]
        );
        assert_eq!(
            d.get_chain("base", "gripper", true, false, false).unwrap(),
            vec!["shoulder_pan", "shoulder_lift"]
        );
        assert_eq!(
            d.get_chain("shoulder", "upper_arm", false, true, true).unwrap(),
            vec!["shoulder", "upper_arm"]
        );
        assert!(d.get_chain("gripper", "camera", true, true, true).is_err());
    }

    #[test]
    fn add_joint_with_new_parent_reroots_tree() {
        let mut d = arm();
        d.add_joint(
            JointDescription::new("odom_joint", JointType::Planar, "odom", "base").virtual_joint(),
        )
        .unwrap();
        assert_eq!(d.root(), "odom");
        assert!(d.is_joint_virtual("odom_joint"));
        assert!(!d.is_joint_virtual("shoulder_pan"));
        assert!(d.validate().is_ok());
    }

    #[test]
    fn failed_add_joint_leaves_description_unchanged() {
        let mut d = arm();
        let before = d.clone();
        let err = d.add_joint(JointDescription::new("bad", JointType::Fixed, "gripper", "base"));
        assert!(err.is_err());
        assert_eq!(d, before);
    }

    #[test]
    fn toml_roundtrip_preserves_tree() {
        let mut d = arm();
        d.set_tip("gripper").unwrap();
        let text = d.to_toml_string().unwrap();
        let back = ObjectDescription::from_toml_str(&text).unwrap();
        assert_eq!(back, d);
        assert_eq!(back.tip(), Some("gripper"));
        assert_eq!(
            back.get_joint_by_name("shoulder_pan").unwrap().limits(),
            Some((-2.0, 2.0))
        );
    }

    #[test]
    fn toml_with_minimal_fields_parses() {
        let text = r#"
name = "milk"

[[link]]
name = "milk_main"
geometry = [{ type = "cylinder", radius = 0.04, length = 0.2 }]
"#;
        let d = ObjectDescription::from_toml_str(text).unwrap();
        assert_eq!(d.root(), "milk_main");
        assert!(d.joints().is_empty());
    }

    #[test]
    fn mesh_paths_become_absolute() {
        let mut d = ObjectDescription::single_link(
            "cup",
            LinkDescription::new("cup_main").with_shape(Shape::Mesh {
                file_name: "meshes/cup.obj".into(),
                scale: [1.0; 3],
            }),
        );
        d.make_mesh_paths_absolute(Path::new("/data/objects"));
        assert_eq!(
            d.links()[0].geometry[0].mesh_file(),
            Some("/data/objects/meshes/cup.obj")
        );
    }

    #[test]
    fn description_file_names() {
        assert_eq!(
            file_name_for(Path::new("/m/milk.stl"), ".stl", "milk", ".toml"),
            "milk.toml"
        );
        assert_eq!(
            file_name_for(Path::new("/d/kitchen.toml"), ".toml", "kitchen_1", ".toml"),
            "kitchen.toml"
        );
    }
}
