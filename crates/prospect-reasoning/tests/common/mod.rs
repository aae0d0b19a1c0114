//! Shared scene fixtures for the reasoning integration tests.
//!
//! The scene: a static floor, a static table at x = 2 with a cup on it, and
//! a robot at the origin.  The robot has a lift (prismatic, +Z) carrying an
//! arm (prismatic, +X) that ends in a gripper box, plus a head link the
//! camera is mounted on.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, OnceLock};

use prospect_description::{JointDescription, LinkDescription, ObjectDescription};
use prospect_geometry::{AxisAlignedBoundingBox, Pose, Shape, Vector3};
use prospect_reasoning::telemetry::{TracerProviderGuard, init_tracing};
use prospect_reasoning::{
    CameraDescription, EndEffectorDescription, IkSolution, InverseKinematics, KinematicChainDescription,
    ReasoningContext, RobotDescription, TelemetryConfig,
};
use prospect_shadow::ProspectionWorld;
use prospect_types::{BodyId, ConstraintId, JointId, JointType, LinkId, ProspectError, Support};
use prospect_world::{CameraImages, ContactPoint, FixedConstraint, PhysicsBackend, SimBackend, World, WorldConfig};

/// Gripper offset from the lift along X at zero reach.
pub const GRIPPER_OFFSET: f64 = 0.3;
/// Height of the robot base frame above the floor.
pub const BASE_HEIGHT: f64 = 0.2;
pub const MAX_LIFT: f64 = 1.0;
pub const MAX_REACH: f64 = 2.0;

pub fn cube(name: &str, size: [f64; 3]) -> Arc<ObjectDescription> {
    Arc::new(ObjectDescription::single_link(
        name,
        LinkDescription::new(format!("{name}_main")).with_shape(Shape::Box { size }),
    ))
}

pub fn floor() -> Arc<ObjectDescription> {
    Arc::new(ObjectDescription::single_link(
        "floor",
        LinkDescription::new("floor_main").with_shape(Shape::Plane { size: [20.0, 20.0] }),
    ))
}

pub fn robot_model() -> Arc<ObjectDescription> {
    Arc::new(
        ObjectDescription::new(
            "bot",
            vec![
                LinkDescription::new("base").with_shape(Shape::Box { size: [0.4, 0.4, 0.4] }),
                LinkDescription::new("lift"),
                LinkDescription::new("gripper").with_shape(Shape::Box { size: [0.1, 0.1, 0.1] }),
                LinkDescription::new("head"),
            ],
            vec![
                JointDescription::new("lift_joint", JointType::Prismatic, "base", "lift")
                    .with_axis(Vector3::z())
                    .with_limits(0.0, MAX_LIFT),
                JointDescription::new("reach_joint", JointType::Prismatic, "lift", "gripper")
                    .with_axis(Vector3::x())
                    .with_origin(Pose::from_xyz(GRIPPER_OFFSET, 0.0, 0.0))
                    .with_limits(0.0, MAX_REACH),
                JointDescription::new("head_joint", JointType::Fixed, "base", "head")
                    .with_origin(Pose::from_xyz(0.0, 0.0, 0.5)),
            ],
            None,
        )
        .expect("robot model is a valid tree"),
    )
}

pub fn robot_description() -> RobotDescription {
    RobotDescription::new("bot", "base")
        .with_chain(
            KinematicChainDescription::new("arm", "base", "gripper")
                .with_end_effector(EndEffectorDescription::new("gripper_hand", "gripper", "gripper", ["gripper"]))
                .with_static_joint_state("park", [("lift_joint", 0.0), ("reach_joint", 0.0)]),
        )
        .with_camera(CameraDescription::new("head_camera", "head").with_front_facing_axis(Vector3::x()))
}

/// Closed-form IK for the lift/arm robot.  Orientation is ignored.
pub struct LiftArmIk;

impl InverseKinematics for LiftArmIk {
    fn name(&self) -> &str {
        "lift-arm"
    }

    fn try_to_reach(
        &self,
        world: &World,
        target: &Pose,
        robot: BodyId,
        _end_effector: &str,
    ) -> Result<Option<IkSolution>, ProspectError> {
        let base = world.object_pose(robot)?;
        let lift = target.position.z - base.position.z;
        let reach = target.position.x - base.position.x - GRIPPER_OFFSET;
        let aligned = (target.position.y - base.position.y).abs() < 1e-9;
        if !aligned || !(0.0..=MAX_LIFT).contains(&lift) || !(0.0..=MAX_REACH).contains(&reach) {
            return Ok(None);
        }
        Ok(Some(
            IkSolution::new(target.clone())
                .with_joint("lift_joint", lift)
                .with_joint("reach_joint", reach),
        ))
    }
}

/// Handles to the bodies of the standard scene, as live ids.
pub struct Scene {
    pub floor: BodyId,
    pub table: BodyId,
    pub cup: BodyId,
    pub robot: BodyId,
}

/// A live world holding the standard scene.
pub fn live_world() -> (World, Scene) {
    let mut live = World::new(Box::new(SimBackend::new()), WorldConfig::default());
    let floor = live.spawn("floor", floor(), &Pose::identity()).unwrap();
    let table = live
        .spawn("table", cube("table", [1.0, 1.0, 0.8]), &Pose::from_xyz(2.0, 0.0, 0.4))
        .unwrap();
    let cup = live
        .spawn("cup", cube("cup", [0.1, 0.1, 0.1]), &Pose::from_xyz(2.0, 0.0, 0.85))
        .unwrap();
    let robot = live
        .spawn_robot("bot", robot_model(), &Pose::from_xyz(0.0, 0.0, BASE_HEIGHT))
        .unwrap();
    (
        live,
        Scene {
            floor,
            table,
            cup,
            robot,
        },
    )
}

fn scene_backend() -> SimBackend {
    SimBackend::new().with_static("floor").with_static("table")
}

pub fn shadow() -> ProspectionWorld {
    ProspectionWorld::new(Box::new(scene_backend()), WorldConfig::default())
}

/// What a [`RecordingBackend`] saw.
#[derive(Debug, Default)]
pub struct BackendLog {
    pub renders: usize,
    pub gravity: Vector3<f64>,
    /// Make the next `simulate` call fail.
    pub fail_simulate: bool,
}

/// The scene backend, recording renders and gravity changes.
pub struct RecordingBackend {
    inner: SimBackend,
    log: Arc<Mutex<BackendLog>>,
}

impl PhysicsBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording-sim"
    }

    fn load_object(&mut self, description: Arc<ObjectDescription>, pose: &Pose) -> Result<BodyId, ProspectError> {
        self.inner.load_object(description, pose)
    }

    fn remove_object(&mut self, body: BodyId) -> Result<(), ProspectError> {
        self.inner.remove_object(body)
    }

    fn get_object_pose(&self, body: BodyId) -> Result<Pose, ProspectError> {
        self.inner.get_object_pose(body)
    }

    fn set_object_pose(&mut self, body: BodyId, pose: &Pose) -> Result<(), ProspectError> {
        self.inner.set_object_pose(body, pose)
    }

    fn get_link_pose(&self, body: BodyId, link: LinkId) -> Result<Pose, ProspectError> {
        self.inner.get_link_pose(body, link)
    }

    fn get_joint_position(&self, body: BodyId, joint: JointId) -> Result<f64, ProspectError> {
        self.inner.get_joint_position(body, joint)
    }

    fn set_joint_position(&mut self, body: BodyId, joint: JointId, position: f64) -> Result<(), ProspectError> {
        self.inner.set_joint_position(body, joint, position)
    }

    fn add_fixed_constraint(&mut self, constraint: &FixedConstraint) -> Result<ConstraintId, ProspectError> {
        self.inner.add_fixed_constraint(constraint)
    }

    fn remove_constraint(&mut self, id: ConstraintId) -> Result<(), ProspectError> {
        self.inner.remove_constraint(id)
    }

    fn perform_collision_detection(&mut self) -> Result<(), ProspectError> {
        self.inner.perform_collision_detection()
    }

    fn get_contact_points_between(&self, a: BodyId, b: BodyId) -> Result<Vec<ContactPoint>, ProspectError> {
        self.inner.get_contact_points_between(a, b)
    }

    fn get_images_for_target(&mut self, target: &Pose, camera: &Pose) -> Result<CameraImages, ProspectError> {
        self.log.lock().unwrap().renders += 1;
        self.inner.get_images_for_target(target, camera)
    }

    fn save_state(&mut self) -> Result<u64, ProspectError> {
        self.inner.save_state()
    }

    fn restore_state(&mut self, id: u64) -> Result<(), ProspectError> {
        self.inner.restore_state(id)
    }

    fn remove_state(&mut self, id: u64) -> Result<(), ProspectError> {
        self.inner.remove_state(id)
    }

    fn set_gravity(&mut self, gravity: Vector3<f64>) -> Result<(), ProspectError> {
        self.log.lock().unwrap().gravity = gravity;
        self.inner.set_gravity(gravity)
    }

    fn simulate(&mut self, seconds: f64) -> Result<(), ProspectError> {
        if std::mem::take(&mut self.log.lock().unwrap().fail_simulate) {
            return Err(ProspectError::Backend("simulation diverged".into()));
        }
        self.inner.simulate(seconds)
    }

    fn get_link_axis_aligned_bounding_box(&self, body: BodyId, link: LinkId) -> Support<AxisAlignedBoundingBox> {
        self.inner.get_link_axis_aligned_bounding_box(body, link)
    }
}

/// Context over `live` whose shadow world records backend calls.
pub fn recording_context(live: World) -> (ReasoningContext, Arc<Mutex<BackendLog>>) {
    trace_queries();
    let log = Arc::new(Mutex::new(BackendLog::default()));
    let backend = RecordingBackend {
        inner: scene_backend(),
        log: Arc::clone(&log),
    };
    let ctx = ReasoningContext::new(live, ProspectionWorld::new(Box::new(backend), WorldConfig::default()))
        .with_robot_description(robot_description())
        .with_inverse_kinematics(LiftArmIk);
    (ctx, log)
}

static TRACING: OnceLock<TracerProviderGuard> = OnceLock::new();

/// Install the subscriber once per test binary, with query spans at debug.
pub fn trace_queries() {
    TRACING.get_or_init(|| {
        init_tracing(&TelemetryConfig {
            log_filter: "prospect_reasoning=debug,prospect_shadow=debug".to_string(),
            ..TelemetryConfig::default()
        })
    });
}

/// Context over `live` with the robot description and the IK solver.
pub fn context_for(live: World) -> ReasoningContext {
    trace_queries();
    ReasoningContext::new(live, shadow())
        .with_robot_description(robot_description())
        .with_inverse_kinematics(LiftArmIk)
}

pub fn scene() -> (ReasoningContext, Scene) {
    let (live, scene) = live_world();
    (context_for(live), scene)
}

/// A camera level with the cup, one metre in front of it.
pub fn camera() -> Pose {
    Pose::from_xyz(1.0, 0.0, 0.85)
}
