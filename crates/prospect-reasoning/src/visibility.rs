//! Camera queries: what is visible, and what occludes an object.
//!
//! Both queries render twice.  The first render shows the object alone,
//! with every other body parked out of frame; the second shows the full
//! scene.  Comparing the two segmentation masks answers the question.

use nalgebra::{Isometry3, Translation3, UnitQuaternion};
use prospect_geometry::{Pose, Vector3};
use prospect_shadow::ProspectionScope;
use prospect_types::{BodyId, ProspectError};
use prospect_world::{BACKGROUND_ID, SegmentationMask};
use tracing::{debug, instrument};

use crate::context::{QueryEnv, ReasoningContext};

/// Optional knobs for the camera queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibilityOptions {
    /// Viewing direction in the camera frame.  Defaults to the robot's
    /// default camera.
    pub front_facing_axis: Option<Vector3<f64>>,
    /// Share of the object's unoccluded pixels that must be seen.  Defaults
    /// to the configured visibility threshold.
    pub threshold: Option<f64>,
    /// Log the rendered masks as ASCII at debug level.
    pub plot: bool,
}

impl VisibilityOptions {
    pub fn with_front_facing_axis(mut self, axis: Vector3<f64>) -> Self {
        self.front_facing_axis = Some(axis);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_plot(mut self) -> Self {
        self.plot = true;
        self
    }
}

impl ReasoningContext {
    /// Render the shadow world from `camera_pose`.
    ///
    /// Returns the segmentation mask and the point the camera looked at, a
    /// fixed distance along the front-facing axis.
    #[instrument(skip(self), level = "debug")]
    pub fn get_visible_objects(
        &mut self,
        camera_pose: &Pose,
        options: &VisibilityOptions,
    ) -> Result<(SegmentationMask, Pose), ProspectError> {
        self.with_scope(|scope, env| {
            let axis = front_facing_axis(env, options)?;
            render(scope, env, camera_pose, &axis, options.plot)
        })
    }

    /// True when more than the threshold share of `object`'s unoccluded
    /// pixels can be seen from `camera_pose`.
    ///
    /// An object that does not appear even when rendered alone is not
    /// visible, and a non-positive threshold is never met.
    #[instrument(skip(self), level = "debug")]
    pub fn visible(
        &mut self,
        object: BodyId,
        camera_pose: &Pose,
        options: &VisibilityOptions,
    ) -> Result<bool, ProspectError> {
        self.with_scope(|scope, env| {
            let axis = front_facing_axis(env, options)?;
            let threshold = options.threshold.unwrap_or(env.config.visibility_threshold);
            let target = scope.shadow_body(object)?;

            let token = scope.save_state()?;
            let others: Vec<BodyId> = scope
                .shadow()
                .object_ids()
                .into_iter()
                .filter(|b| *b != target)
                .collect();
            park(scope, env, &others, false)?;
            let (alone, target_pose) = render(scope, env, camera_pose, &axis, options.plot)?;
            let max_pixel = alone.count(target.0);
            scope.restore_state(token)?;
            scope.shadow_mut().discard_state(token)?;

            if max_pixel == 0 {
                debug!(%object, "object not in view even when alone");
                return Ok(false);
            }

            let full = scope.shadow_mut().get_images_for_target(&target_pose, camera_pose)?;
            let real_pixel = full.segmentation.count(target.0);
            debug!(%object, max_pixel, real_pixel, threshold, "visibility");
            Ok(threshold > 0.0 && real_pixel as f64 / max_pixel as f64 > threshold)
        })
    }

    /// Live bodies that hide part of `object` from `camera_pose`.
    ///
    /// The robot is left in place.  Another body sharing exactly the pose
    /// of `object` is treated as the object itself.
    #[instrument(skip(self), level = "debug")]
    pub fn occluding(
        &mut self,
        object: BodyId,
        camera_pose: &Pose,
        options: &VisibilityOptions,
    ) -> Result<Vec<BodyId>, ProspectError> {
        self.with_scope(|scope, env| {
            let axis = front_facing_axis(env, options)?;
            let mut target = scope.shadow_body(object)?;
            let target_pose = scope.shadow().object_pose(target)?;
            let robot = scope.shadow().robot();

            let token = scope.save_state()?;
            let mut others = Vec::new();
            for body in scope.shadow().object_ids() {
                if Some(body) == robot {
                    continue;
                }
                if scope.shadow().object_pose(body)? == target_pose {
                    target = body;
                } else {
                    others.push(body);
                }
            }
            park(scope, env, &others, true)?;
            let (alone, view_target) = render(scope, env, camera_pose, &axis, options.plot)?;
            let pixels = alone.pixels_of(target.0);
            scope.restore_state(token)?;
            scope.shadow_mut().discard_state(token)?;

            let full = scope.shadow_mut().get_images_for_target(&view_target, camera_pose)?;
            let mut ids: Vec<i32> = Vec::new();
            for (row, col) in pixels {
                if let Some(id) = full.segmentation.get(row, col)
                    && id != target.0
                    && id != BACKGROUND_ID
                    && !ids.contains(&id)
                {
                    ids.push(id);
                }
            }

            let occluders: Vec<BodyId> = ids
                .into_iter()
                .filter_map(|id| scope.shadow().get_object_by_id(id))
                .filter_map(|o| scope.live_body(o.id()))
                .collect();
            debug!(%object, occluders = occluders.len(), "occlusion");
            Ok(occluders)
        })
    }
}

fn front_facing_axis(env: &QueryEnv<'_>, options: &VisibilityOptions) -> Result<Vector3<f64>, ProspectError> {
    if let Some(axis) = options.front_facing_axis {
        return Ok(axis);
    }
    env.robot_description()?
        .default_camera()
        .map(|camera| camera.front_facing_axis)
        .ok_or(ProspectError::MissingRobotDescription)
}

/// Move `bodies` to the out-of-frame position.
fn park(
    scope: &mut ProspectionScope<'_>,
    env: &QueryEnv<'_>,
    bodies: &[BodyId],
    move_attachments: bool,
) -> Result<(), ProspectError> {
    let away = Pose::new(
        Vector3::from(env.config.out_of_frame_position),
        UnitQuaternion::identity(),
    );
    for body in bodies {
        scope.shadow_mut().set_object_pose(*body, &away, move_attachments)?;
    }
    Ok(())
}

/// Point `camera_target_distance` along `axis` in front of the camera.
fn look_at(camera_pose: &Pose, axis: &Vector3<f64>, distance: f64) -> Pose {
    let offset = Isometry3::from_parts(Translation3::from(axis * distance), UnitQuaternion::identity());
    Pose::from_isometry(camera_pose.frame.clone(), camera_pose.isometry() * offset)
}

fn render(
    scope: &mut ProspectionScope<'_>,
    env: &QueryEnv<'_>,
    camera_pose: &Pose,
    axis: &Vector3<f64>,
    plot: bool,
) -> Result<(SegmentationMask, Pose), ProspectError> {
    let target = look_at(camera_pose, axis, env.config.camera_target_distance);
    let images = scope.shadow_mut().get_images_for_target(&target, camera_pose)?;
    if plot {
        debug!(mask = %images.segmentation.render_ascii(), "segmentation mask");
    }
    Ok((images.segmentation, target))
}
