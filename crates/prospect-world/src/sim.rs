//! [`SimBackend`] – in-process kinematic simulation for tests and CI.
//!
//! Implements [`PhysicsBackend`] without an external physics engine, so the
//! whole reasoning stack can run in a unit test.
//!
//! # Behaviour
//!
//! | Capability | Behaviour |
//! |---|---|
//! | Kinematics | Exact forward kinematics through the description's joints. |
//! | Collision  | Link boxes (world-aligned) that overlap or touch within a small margin. |
//! | Rendering  | Pinhole ray casting against link boxes; depth is the hit distance. |
//! | Stepping   | Dynamic, unconstrained bodies fall along gravity until they rest on another body. |
//! | Snapshots  | Body poses and joint positions. |
//!
//! Bodies whose description name was registered with
//! [`SimBackend::with_static`] never move under gravity.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use prospect_description::{LinkDescription, ObjectDescription};
//! use prospect_geometry::{Pose, Shape};
//! use prospect_world::{PhysicsBackend, SimBackend};
//!
//! let mut sim = SimBackend::new().with_static("floor");
//! let floor = Arc::new(ObjectDescription::single_link(
//!     "floor",
//!     LinkDescription::new("floor_main").with_shape(Shape::Plane { size: [10.0, 10.0] }),
//! ));
//! let cup = Arc::new(ObjectDescription::single_link(
//!     "cup",
//!     LinkDescription::new("cup_main").with_shape(Shape::Box { size: [0.1, 0.1, 0.1] }),
//! ));
//! sim.load_object(floor, &Pose::identity()).unwrap();
//! let cup = sim.load_object(cup, &Pose::from_xyz(0.0, 0.0, 1.0)).unwrap();
//! sim.set_gravity([0.0, 0.0, -9.8].into()).unwrap();
//! sim.simulate(2.0).unwrap();
//! assert!((sim.get_object_pose(cup).unwrap().position.z - 0.05).abs() < 1e-9);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use nalgebra::{Isometry3, Point3, Vector3};
use prospect_description::ObjectDescription;
use prospect_geometry::{AxisAlignedBoundingBox, MeshLoader, ObjMeshLoader, Pose};
use prospect_types::{BodyId, ConstraintId, JointId, LinkId, ProspectError, Support};
use tracing::{debug, warn};

use crate::backend::{ContactPoint, FixedConstraint, PhysicsBackend};
use crate::camera::{BACKGROUND_ID, CameraImages, SegmentationMask};

/// Slack used when deciding whether two boxes touch.
const CONTACT_MARGIN: f64 = 1e-4;

/// Intrinsics of the simulated camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSettings {
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees.
    pub fov_deg: f64,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            fov_deg: 60.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bodies
// ─────────────────────────────────────────────────────────────────────────────

struct SimBody {
    description: Arc<ObjectDescription>,
    pose: Pose,
    joint_positions: Vec<f64>,
    /// Per link, the box in the link frame; `None` for links without geometry.
    local_boxes: Vec<Option<AxisAlignedBoundingBox>>,
    is_static: bool,
}

impl SimBody {
    /// World isometry of every link, indexed like the description's links.
    fn link_isometries(&self) -> Vec<Isometry3<f64>> {
        let description = &self.description;
        let base = self.pose.isometry();
        let mut cache: Vec<Option<Isometry3<f64>>> = vec![None; description.links().len()];
        for i in 0..cache.len() {
            // Walk up to the first link with a known pose, then back down.
            let mut chain = Vec::new();
            let mut current = i;
            let mut iso = loop {
                if let Some(known) = cache[current] {
                    break known;
                }
                let name = &description.links()[current].name;
                match description.parent_of(name) {
                    Some((joint, parent)) => {
                        chain.push((current, joint.clone()));
                        match description.link_index(parent) {
                            Some(p) => current = p,
                            None => break base,
                        }
                    }
                    None => {
                        cache[current] = Some(base);
                        break base;
                    }
                }
            };
            for (link, joint) in chain.into_iter().rev() {
                if let Some(j) = description.joint_index(&joint) {
                    iso *= description.joints()[j].child_transform(self.joint_positions[j]);
                }
                cache[link] = Some(iso);
            }
        }
        cache.into_iter().map(|c| c.unwrap_or(base)).collect()
    }

    /// World-aligned box of every link with geometry.
    fn world_boxes(&self) -> Vec<(LinkId, AxisAlignedBoundingBox)> {
        self.link_isometries()
            .iter()
            .zip(&self.local_boxes)
            .enumerate()
            .filter_map(|(i, (iso, local))| {
                local.map(|bb| (LinkId(i as i32), bb.transformed_by(iso)))
            })
            .collect()
    }

    fn enclosing_box(&self) -> Option<AxisAlignedBoundingBox> {
        let boxes: Vec<_> = self.world_boxes().into_iter().map(|(_, bb)| bb).collect();
        AxisAlignedBoundingBox::from_multiple(&boxes)
    }
}

#[derive(Clone)]
struct Snapshot {
    bodies: BTreeMap<BodyId, (Pose, Vec<f64>)>,
}

// ─────────────────────────────────────────────────────────────────────────────
// SimBackend
// ─────────────────────────────────────────────────────────────────────────────

/// Kinematic stand-in for a physics engine.
pub struct SimBackend {
    bodies: BTreeMap<BodyId, SimBody>,
    next_body: i32,
    constraints: BTreeMap<ConstraintId, FixedConstraint>,
    next_constraint: u32,
    snapshots: BTreeMap<u64, Snapshot>,
    next_snapshot: u64,
    gravity: Vector3<f64>,
    contacts: Vec<ContactPoint>,
    static_names: BTreeSet<String>,
    image: ImageSettings,
    native_bounding_boxes: bool,
    mesh_loader: Arc<dyn MeshLoader>,
}

impl Default for SimBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBackend {
    pub fn new() -> Self {
        Self {
            bodies: BTreeMap::new(),
            next_body: 0,
            constraints: BTreeMap::new(),
            next_constraint: 0,
            snapshots: BTreeMap::new(),
            next_snapshot: 0,
            gravity: Vector3::zeros(),
            contacts: Vec::new(),
            static_names: BTreeSet::new(),
            image: ImageSettings::default(),
            native_bounding_boxes: false,
            mesh_loader: Arc::new(ObjMeshLoader),
        }
    }

    /// Bodies loaded from a description with this name never fall.
    pub fn with_static(mut self, description_name: impl Into<String>) -> Self {
        self.static_names.insert(description_name.into());
        self
    }

    pub fn with_image_settings(mut self, image: ImageSettings) -> Self {
        self.image = image;
        self
    }

    /// Answer bounding-box queries natively instead of reporting them as
    /// unsupported.
    pub fn with_native_bounding_boxes(mut self) -> Self {
        self.native_bounding_boxes = true;
        self
    }

    pub fn with_mesh_loader(mut self, loader: Arc<dyn MeshLoader>) -> Self {
        self.mesh_loader = loader;
        self
    }

    fn body(&self, id: BodyId) -> Result<&SimBody, ProspectError> {
        self.bodies
            .get(&id)
            .ok_or_else(|| ProspectError::UnknownObject(id.to_string()))
    }

    fn body_mut(&mut self, id: BodyId) -> Result<&mut SimBody, ProspectError> {
        self.bodies
            .get_mut(&id)
            .ok_or_else(|| ProspectError::UnknownObject(id.to_string()))
    }

    fn is_constrained(&self, id: BodyId) -> bool {
        self.constraints
            .values()
            .any(|c| c.parent.0 == id || c.child.0 == id)
    }

    fn cast(&self, origin: &Point3<f64>, direction: &Vector3<f64>) -> Option<(BodyId, f64)> {
        let mut best: Option<(BodyId, f64)> = None;
        for (id, body) in &self.bodies {
            for (_, bb) in body.world_boxes() {
                if let Some(t) = bb.ray_intersection(origin, direction) {
                    if best.is_none_or(|(_, b)| t < b) {
                        best = Some((*id, t));
                    }
                }
            }
        }
        best
    }
}

/// Stable RGB for a body id.
fn colour_of(id: i32) -> [u8; 3] {
    if id == BACKGROUND_ID {
        return [0, 0, 0];
    }
    let h = (id as u32).wrapping_mul(2_654_435_761);
    [(h >> 16) as u8, (h >> 8) as u8, h as u8]
}

fn unknown_joint(body: &SimBody, joint: JointId) -> ProspectError {
    ProspectError::UnknownJoint {
        object: body.description.name().to_string(),
        joint: format!("#{}", joint.0),
    }
}

impl PhysicsBackend for SimBackend {
    fn name(&self) -> &str {
        "sim"
    }

    fn load_object(
        &mut self,
        description: Arc<ObjectDescription>,
        pose: &Pose,
    ) -> Result<BodyId, ProspectError> {
        let local_boxes = description
            .links()
            .iter()
            .map(|link| {
                if !link.has_geometry() {
                    return None;
                }
                match link.local_bounding_box(self.mesh_loader.as_ref()) {
                    Ok(bb) => Some(bb),
                    Err(e) => {
                        warn!(link = %link.name, error = %e, "link geometry ignored by sim");
                        None
                    }
                }
            })
            .collect();
        let id = BodyId(self.next_body);
        self.next_body += 1;
        let is_static = self.static_names.contains(description.name());
        self.bodies.insert(
            id,
            SimBody {
                joint_positions: vec![0.0; description.joints().len()],
                description,
                pose: pose.clone(),
                local_boxes,
                is_static,
            },
        );
        Ok(id)
    }

    fn remove_object(&mut self, body: BodyId) -> Result<(), ProspectError> {
        self.bodies
            .remove(&body)
            .ok_or_else(|| ProspectError::UnknownObject(body.to_string()))?;
        self.constraints
            .retain(|_, c| c.parent.0 != body && c.child.0 != body);
        self.contacts.retain(|c| c.body_a != body && c.body_b != body);
        Ok(())
    }

    fn get_object_pose(&self, body: BodyId) -> Result<Pose, ProspectError> {
        Ok(self.body(body)?.pose.clone())
    }

    fn set_object_pose(&mut self, body: BodyId, pose: &Pose) -> Result<(), ProspectError> {
        self.body_mut(body)?.pose = pose.clone();
        Ok(())
    }

    fn get_link_pose(&self, body: BodyId, link: LinkId) -> Result<Pose, ProspectError> {
        let b = self.body(body)?;
        let iso = b
            .link_isometries()
            .get(link.0 as usize)
            .copied()
            .ok_or_else(|| ProspectError::UnknownLink {
                object: b.description.name().to_string(),
                link: format!("#{}", link.0),
            })?;
        Ok(Pose::from_isometry(b.pose.frame.clone(), iso))
    }

    fn get_joint_position(&self, body: BodyId, joint: JointId) -> Result<f64, ProspectError> {
        let b = self.body(body)?;
        b.joint_positions
            .get(joint.0 as usize)
            .copied()
            .ok_or_else(|| unknown_joint(b, joint))
    }

    fn set_joint_position(
        &mut self,
        body: BodyId,
        joint: JointId,
        position: f64,
    ) -> Result<(), ProspectError> {
        let b = self.body_mut(body)?;
        match b.joint_positions.get_mut(joint.0 as usize) {
            Some(slot) => {
                *slot = position;
                Ok(())
            }
            None => Err(unknown_joint(b, joint)),
        }
    }

    fn add_fixed_constraint(
        &mut self,
        constraint: &FixedConstraint,
    ) -> Result<ConstraintId, ProspectError> {
        self.body(constraint.parent.0)?;
        self.body(constraint.child.0)?;
        let id = ConstraintId(self.next_constraint);
        self.next_constraint += 1;
        self.constraints.insert(id, constraint.clone());
        Ok(id)
    }

    fn remove_constraint(&mut self, id: ConstraintId) -> Result<(), ProspectError> {
        self.constraints
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ProspectError::UnknownConstraint(id.to_string()))
    }

    fn perform_collision_detection(&mut self) -> Result<(), ProspectError> {
        let boxes: Vec<(BodyId, Vec<(LinkId, AxisAlignedBoundingBox)>)> = self
            .bodies
            .iter()
            .map(|(id, b)| (*id, b.world_boxes()))
            .collect();
        let mut contacts = Vec::new();
        for (i, (body_a, links_a)) in boxes.iter().enumerate() {
            for (body_b, links_b) in &boxes[i + 1..] {
                for (link_a, a) in links_a {
                    for (link_b, b) in links_b {
                        if !a.overlaps(b, CONTACT_MARGIN) {
                            continue;
                        }
                        let lo = a.min.coords.sup(&b.min.coords);
                        let hi = a.max.coords.inf(&b.max.coords);
                        let overlap = hi - lo;
                        let axis = overlap.imin();
                        let mut normal = Vector3::zeros();
                        normal[axis] = if a.centre()[axis] >= b.centre()[axis] {
                            1.0
                        } else {
                            -1.0
                        };
                        contacts.push(ContactPoint {
                            body_a: *body_a,
                            link_a: *link_a,
                            body_b: *body_b,
                            link_b: *link_b,
                            position_on_a: Point3::from((lo + hi) / 2.0),
                            normal_on_b: normal,
                            distance: -overlap[axis],
                        });
                    }
                }
            }
        }
        debug!(contacts = contacts.len(), "sim collision detection");
        self.contacts = contacts;
        Ok(())
    }

    fn get_contact_points_between(
        &self,
        a: BodyId,
        b: BodyId,
    ) -> Result<Vec<ContactPoint>, ProspectError> {
        self.body(a)?;
        self.body(b)?;
        Ok(self
            .contacts
            .iter()
            .filter_map(|c| {
                if c.body_a == a && c.body_b == b {
                    Some(c.clone())
                } else if c.body_a == b && c.body_b == a {
                    Some(ContactPoint {
                        body_a: a,
                        link_a: c.link_b,
                        body_b: b,
                        link_b: c.link_a,
                        position_on_a: c.position_on_a,
                        normal_on_b: -c.normal_on_b,
                        distance: c.distance,
                    })
                } else {
                    None
                }
            })
            .collect())
    }

    fn get_images_for_target(
        &mut self,
        target: &Pose,
        camera: &Pose,
    ) -> Result<CameraImages, ProspectError> {
        let ImageSettings {
            width,
            height,
            fov_deg,
        } = self.image;
        let origin = Point3::from(camera.position);
        let forward = (target.position - camera.position)
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::x);
        let world_up = if forward.cross(&Vector3::z()).norm() < 1e-6 {
            Vector3::x()
        } else {
            Vector3::z()
        };
        let right = forward.cross(&world_up).normalize();
        let up = right.cross(&forward);
        let half = (fov_deg.to_radians() / 2.0).tan();
        let aspect = f64::from(width) / f64::from(height.max(1));

        let pixels = (width as usize) * (height as usize);
        let mut segmentation = SegmentationMask::filled(width, height, BACKGROUND_ID);
        let mut depth = vec![f32::INFINITY; pixels];
        let mut color = vec![0u8; pixels * 3];
        for row in 0..height {
            for col in 0..width {
                let x = (2.0 * (f64::from(col) + 0.5) / f64::from(width) - 1.0) * half * aspect;
                let y = (1.0 - 2.0 * (f64::from(row) + 0.5) / f64::from(height)) * half;
                let direction = (forward + right * x + up * y).normalize();
                let i = (row as usize) * (width as usize) + col as usize;
                if let Some((body, t)) = self.cast(&origin, &direction) {
                    segmentation.data[i] = body.0;
                    depth[i] = t as f32;
                    color[i * 3..i * 3 + 3].copy_from_slice(&colour_of(body.0));
                }
            }
        }
        Ok(CameraImages {
            color,
            depth,
            segmentation,
        })
    }

    fn save_state(&mut self) -> Result<u64, ProspectError> {
        let id = self.next_snapshot;
        self.next_snapshot += 1;
        let bodies = self
            .bodies
            .iter()
            .map(|(id, b)| (*id, (b.pose.clone(), b.joint_positions.clone())))
            .collect();
        self.snapshots.insert(id, Snapshot { bodies });
        Ok(id)
    }

    fn restore_state(&mut self, id: u64) -> Result<(), ProspectError> {
        let snapshot = self
            .snapshots
            .get(&id)
            .cloned()
            .ok_or(ProspectError::UnknownStateToken(id))?;
        for (body, (pose, joints)) in snapshot.bodies {
            if let Some(b) = self.bodies.get_mut(&body) {
                b.pose = pose;
                b.joint_positions = joints;
            }
        }
        self.contacts.clear();
        Ok(())
    }

    fn remove_state(&mut self, id: u64) -> Result<(), ProspectError> {
        self.snapshots
            .remove(&id)
            .map(|_| ())
            .ok_or(ProspectError::UnknownStateToken(id))
    }

    fn set_gravity(&mut self, gravity: Vector3<f64>) -> Result<(), ProspectError> {
        self.gravity = gravity;
        Ok(())
    }

    /// Drop every free body along gravity.
    ///
    /// Only the gravity component along Z is simulated.  Bodies settle in
    /// order of their lowest point, so stacks come to rest bottom-up.
    fn simulate(&mut self, seconds: f64) -> Result<(), ProspectError> {
        let g = -self.gravity.z;
        if g <= 0.0 || seconds <= 0.0 {
            return Ok(());
        }
        let free_fall = 0.5 * g * seconds * seconds;

        let mut order: Vec<(BodyId, f64)> = self
            .bodies
            .iter()
            .filter(|(id, b)| !b.is_static && !self.is_constrained(**id))
            .filter_map(|(id, b)| b.enclosing_box().map(|bb| (*id, bb.min.z)))
            .collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1));

        for (id, _) in order {
            let Some(own) = self.bodies.get(&id).and_then(SimBody::enclosing_box) else {
                continue;
            };
            let support = self
                .bodies
                .iter()
                .filter(|(other, _)| **other != id)
                .filter_map(|(_, b)| b.enclosing_box())
                .filter(|bb| {
                    bb.min.x < own.max.x
                        && bb.max.x > own.min.x
                        && bb.min.y < own.max.y
                        && bb.max.y > own.min.y
                        && bb.max.z <= own.min.z + CONTACT_MARGIN
                })
                .map(|bb| bb.max.z)
                .fold(f64::NEG_INFINITY, f64::max);
            let bottom = (own.min.z - free_fall).max(support);
            let drop = own.min.z - bottom;
            if drop > 0.0 {
                if let Some(b) = self.bodies.get_mut(&id) {
                    b.pose.position.z -= drop;
                }
                debug!(body = %id, drop, "sim body settled");
            }
        }
        self.contacts.clear();
        Ok(())
    }

    fn get_link_axis_aligned_bounding_box(
        &self,
        body: BodyId,
        link: LinkId,
    ) -> Support<AxisAlignedBoundingBox> {
        if !self.native_bounding_boxes {
            return Support::Unsupported;
        }
        self.bodies
            .get(&body)
            .and_then(|b| {
                b.world_boxes()
                    .into_iter()
                    .find(|(l, _)| *l == link)
                    .map(|(_, bb)| bb)
            })
            .map_or(Support::Unsupported, Support::Supported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use prospect_description::{JointDescription, LinkDescription};
    use prospect_geometry::Shape;
    use prospect_types::JointType;

    fn cube(name: &str, edge: f64) -> Arc<ObjectDescription> {
        Arc::new(ObjectDescription::single_link(
            name,
            LinkDescription::new(format!("{name}_main")).with_shape(Shape::Box { size: [edge; 3] }),
        ))
    }

    fn floor() -> Arc<ObjectDescription> {
        Arc::new(ObjectDescription::single_link(
            "floor",
            LinkDescription::new("floor_main").with_shape(Shape::Plane { size: [20.0, 20.0] }),
        ))
    }

    #[test]
    fn body_falls_onto_floor() {
        let mut sim = SimBackend::new().with_static("floor");
        sim.load_object(floor(), &Pose::identity()).unwrap();
        let cube = sim.load_object(cube("cube", 0.2), &Pose::from_xyz(0.0, 0.0, 1.0)).unwrap();
        sim.set_gravity(Vector3::new(0.0, 0.0, -9.8)).unwrap();
        sim.simulate(2.0).unwrap();
        assert_relative_eq!(sim.get_object_pose(cube).unwrap().position.z, 0.1, epsilon = 1e-9);
    }

    #[test]
    fn unsupported_body_falls_freely() {
        let mut sim = SimBackend::new();
        let cube = sim.load_object(cube("cube", 0.2), &Pose::from_xyz(0.0, 0.0, 1.0)).unwrap();
        sim.set_gravity(Vector3::new(0.0, 0.0, -9.8)).unwrap();
        sim.simulate(1.0).unwrap();
        assert_relative_eq!(sim.get_object_pose(cube).unwrap().position.z, 1.0 - 4.9, epsilon = 1e-9);
    }

    #[test]
    fn stack_settles_bottom_up() {
        let mut sim = SimBackend::new().with_static("floor");
        sim.load_object(floor(), &Pose::identity()).unwrap();
        let top = sim.load_object(cube("top", 0.2), &Pose::from_xyz(0.0, 0.0, 0.6)).unwrap();
        let bottom = sim.load_object(cube("bottom", 0.2), &Pose::from_xyz(0.0, 0.0, 0.3)).unwrap();
        sim.set_gravity(Vector3::new(0.0, 0.0, -9.8)).unwrap();
        sim.simulate(2.0).unwrap();
        assert_relative_eq!(sim.get_object_pose(bottom).unwrap().position.z, 0.1, epsilon = 1e-9);
        assert_relative_eq!(sim.get_object_pose(top).unwrap().position.z, 0.3, epsilon = 1e-9);
    }

    #[test]
    fn no_gravity_means_no_motion() {
        let mut sim = SimBackend::new();
        let cube = sim.load_object(cube("cube", 0.2), &Pose::from_xyz(0.0, 0.0, 1.0)).unwrap();
        sim.simulate(2.0).unwrap();
        assert_relative_eq!(sim.get_object_pose(cube).unwrap().position.z, 1.0);
    }

    #[test]
    fn touching_boxes_are_in_contact() {
        let mut sim = SimBackend::new();
        let a = sim.load_object(cube("a", 0.2), &Pose::from_xyz(0.0, 0.0, 0.1)).unwrap();
        let b = sim.load_object(cube("b", 0.2), &Pose::from_xyz(0.0, 0.0, 0.3)).unwrap();
        let c = sim.load_object(cube("c", 0.2), &Pose::from_xyz(5.0, 0.0, 0.1)).unwrap();
        sim.perform_collision_detection().unwrap();

        let ab = sim.get_contact_points_between(a, b).unwrap();
        assert_eq!(ab.len(), 1);
        assert_eq!(ab[0].body_a, a);
        let ba = sim.get_contact_points_between(b, a).unwrap();
        assert_eq!(ba[0].body_a, b);
        assert_relative_eq!(ba[0].normal_on_b.z, -ab[0].normal_on_b.z);
        assert!(sim.get_contact_points_between(a, c).unwrap().is_empty());
    }

    #[test]
    fn forward_kinematics_chains_joints() {
        let description = Arc::new(
            ObjectDescription::new(
                "slider",
                vec![
                    LinkDescription::new("base"),
                    LinkDescription::new("carriage"),
                    LinkDescription::new("tool"),
                ],
                vec![
                    JointDescription::new("rail", JointType::Prismatic, "base", "carriage")
                        .with_axis(Vector3::x()),
                    JointDescription::new("mount", JointType::Fixed, "carriage", "tool")
                        .with_origin(Pose::from_xyz(0.0, 0.0, 0.5)),
                ],
                None,
            )
            .unwrap(),
        );
        let mut sim = SimBackend::new();
        let id = sim.load_object(description, &Pose::from_xyz(1.0, 0.0, 0.0)).unwrap();
        sim.set_joint_position(id, JointId(0), 0.25).unwrap();
        let tool = sim.get_link_pose(id, LinkId(2)).unwrap();
        assert_relative_eq!(tool.position.x, 1.25, epsilon = 1e-12);
        assert_relative_eq!(tool.position.z, 0.5, epsilon = 1e-12);
        assert!(sim.set_joint_position(id, JointId(7), 0.0).is_err());
    }

    #[test]
    fn camera_sees_box_in_front() {
        let mut sim = SimBackend::new();
        let target = sim.load_object(cube("box", 0.5), &Pose::from_xyz(2.0, 0.0, 0.0)).unwrap();
        let images = sim
            .get_images_for_target(&Pose::from_xyz(2.0, 0.0, 0.0), &Pose::identity())
            .unwrap();
        let mask = &images.segmentation;
        assert_eq!(mask.get(16, 16), Some(target.0));
        assert_eq!(mask.get(0, 0), Some(BACKGROUND_ID));
        assert!(images.depth[16 * 32 + 16] < 2.0);
        assert_eq!(images.color.len(), 32 * 32 * 3);
    }

    #[test]
    fn nearer_body_hides_farther_one() {
        let mut sim = SimBackend::new();
        let far = sim.load_object(cube("far", 0.5), &Pose::from_xyz(3.0, 0.0, 0.0)).unwrap();
        let near = sim.load_object(cube("near", 0.5), &Pose::from_xyz(1.5, 0.0, 0.0)).unwrap();
        let images = sim
            .get_images_for_target(&Pose::from_xyz(3.0, 0.0, 0.0), &Pose::identity())
            .unwrap();
        assert_eq!(images.segmentation.get(16, 16), Some(near.0));
        assert!(images.segmentation.count(far.0) < images.segmentation.count(near.0));
    }

    #[test]
    fn snapshots_restore_poses_and_joints() {
        let mut sim = SimBackend::new();
        let id = sim.load_object(cube("cube", 0.1), &Pose::identity()).unwrap();
        let snap = sim.save_state().unwrap();
        sim.set_object_pose(id, &Pose::from_xyz(4.0, 0.0, 0.0)).unwrap();
        sim.restore_state(snap).unwrap();
        assert_eq!(sim.get_object_pose(id).unwrap(), Pose::identity());
        sim.remove_state(snap).unwrap();
        assert_eq!(sim.restore_state(snap), Err(ProspectError::UnknownStateToken(snap)));
    }

    #[test]
    fn constraint_ids_are_not_reused() {
        let mut sim = SimBackend::new();
        let a = sim.load_object(cube("a", 0.1), &Pose::identity()).unwrap();
        let b = sim.load_object(cube("b", 0.1), &Pose::identity()).unwrap();
        let c = FixedConstraint {
            parent: (a, LinkId(0)),
            child: (b, LinkId(0)),
            child_to_parent: Isometry3::identity(),
        };
        let first = sim.add_fixed_constraint(&c).unwrap();
        sim.remove_constraint(first).unwrap();
        let second = sim.add_fixed_constraint(&c).unwrap();
        assert_ne!(first, second);
        assert!(sim.remove_constraint(first).is_err());
    }

    #[test]
    fn native_boxes_are_opt_in() {
        let sim = SimBackend::new();
        assert!(!sim.get_link_axis_aligned_bounding_box(BodyId(0), LinkId(0)).is_supported());
        let mut sim = SimBackend::new().with_native_bounding_boxes();
        let id = sim.load_object(cube("cube", 0.2), &Pose::from_xyz(1.0, 0.0, 0.0)).unwrap();
        let bb = sim
            .get_link_axis_aligned_bounding_box(id, LinkId(0))
            .supported()
            .unwrap();
        assert_relative_eq!(bb.min.x, 0.9, epsilon = 1e-12);
    }
}
