//! [`ReasoningContext`] – the explicit session object every query runs on.

use prospect_shadow::{ProspectionScope, ProspectionWorld};
use prospect_types::ProspectError;
use prospect_world::World;

use crate::config::ReasoningConfig;
use crate::ik::InverseKinematics;
use crate::robot::RobotDescription;

/// Holds the live world, its shadow, and the collaborators queries need.
///
/// Queries take `&mut self`: the shadow world has exactly one user at a
/// time.  The live world is only mutated through [`live_mut`](Self::live_mut),
/// never by a query.
///
/// # Example
///
/// ```rust
/// use prospect_reasoning::ReasoningContext;
/// use prospect_shadow::ProspectionWorld;
/// use prospect_world::{SimBackend, World, WorldConfig};
///
/// let live = World::new(Box::new(SimBackend::new()), WorldConfig::default());
/// let shadow = ProspectionWorld::new(Box::new(SimBackend::new()), WorldConfig::default());
/// let ctx = ReasoningContext::new(live, shadow);
/// assert!(ctx.robot_description().is_none());
/// ```
pub struct ReasoningContext {
    live: World,
    prospection: ProspectionWorld,
    robot_description: Option<RobotDescription>,
    ik: Option<Box<dyn InverseKinematics>>,
    config: ReasoningConfig,
}

/// Read-only collaborators handed to a query body while the scope is open.
pub(crate) struct QueryEnv<'a> {
    pub config: &'a ReasoningConfig,
    pub robot_description: Option<&'a RobotDescription>,
    pub ik: Option<&'a dyn InverseKinematics>,
}

impl QueryEnv<'_> {
    pub fn robot_description(&self) -> Result<&RobotDescription, ProspectError> {
        self.robot_description
            .ok_or(ProspectError::MissingRobotDescription)
    }

    pub fn ik(&self) -> Result<&dyn InverseKinematics, ProspectError> {
        self.ik.ok_or(ProspectError::NoInverseKinematics)
    }

    /// Tool-frame link of the end effector named `name`; unknown names are
    /// taken to be link names already.
    pub fn tool_frame<'n>(&'n self, name: &'n str) -> &'n str {
        self.robot_description
            .and_then(|d| d.end_effector(name))
            .map_or(name, |e| e.tool_frame.as_str())
    }
}

impl ReasoningContext {
    pub fn new(live: World, prospection: ProspectionWorld) -> Self {
        Self {
            live,
            prospection,
            robot_description: None,
            ik: None,
            config: ReasoningConfig::default(),
        }
    }

    pub fn with_robot_description(mut self, description: RobotDescription) -> Self {
        self.robot_description = Some(description);
        self
    }

    pub fn with_inverse_kinematics(mut self, ik: impl InverseKinematics + 'static) -> Self {
        self.ik = Some(Box::new(ik));
        self
    }

    pub fn with_config(mut self, config: ReasoningConfig) -> Self {
        self.config = config;
        self
    }

    pub fn live(&self) -> &World {
        &self.live
    }

    pub fn live_mut(&mut self) -> &mut World {
        &mut self.live
    }

    pub fn prospection(&self) -> &ProspectionWorld {
        &self.prospection
    }

    pub fn robot_description(&self) -> Option<&RobotDescription> {
        self.robot_description.as_ref()
    }

    pub fn config(&self) -> &ReasoningConfig {
        &self.config
    }

    /// Tear the session down, handing back both worlds.
    pub fn into_parts(self) -> (World, ProspectionWorld) {
        (self.live, self.prospection)
    }

    /// Run `query` inside a prospection scope.
    ///
    /// The scope is closed on every path.  A restore failure takes precedence
    /// over the query's own result.
    pub(crate) fn with_scope<T>(
        &mut self,
        query: impl FnOnce(&mut ProspectionScope<'_>, &QueryEnv<'_>) -> Result<T, ProspectError>,
    ) -> Result<T, ProspectError> {
        let env = QueryEnv {
            config: &self.config,
            robot_description: self.robot_description.as_ref(),
            ik: self.ik.as_deref(),
        };
        let mut scope = self.prospection.enter(&self.live)?;
        let result = query(&mut scope, &env);
        scope.exit()?;
        result
    }
}

impl std::fmt::Debug for ReasoningContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningContext")
            .field("live", &self.live.id())
            .field("shadow", &self.prospection.shadow().id())
            .field("robot", &self.robot_description.as_ref().map(|d| d.name.as_str()))
            .field("ik", &self.ik.as_ref().map(|ik| ik.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::{EndEffectorDescription, KinematicChainDescription};
    use prospect_world::{SimBackend, WorldConfig};

    fn context() -> ReasoningContext {
        ReasoningContext::new(
            World::new(Box::new(SimBackend::new()), WorldConfig::default()),
            ProspectionWorld::new(Box::new(SimBackend::new()), WorldConfig::default()),
        )
    }

    #[test]
    fn scope_is_closed_after_query() {
        let mut ctx = context();
        let active = ctx.with_scope(|scope, _| Ok(scope.shadow().is_prospection())).unwrap();
        assert!(active);
        assert!(!ctx.prospection().is_active());
    }

    #[test]
    fn scope_is_closed_after_failed_query() {
        let mut ctx = context();
        let err = ctx
            .with_scope(|_, env| env.ik().map(|_| ()))
            .unwrap_err();
        assert_eq!(err, ProspectError::NoInverseKinematics);
        assert!(!ctx.prospection().is_active());
    }

    #[test]
    fn tool_frame_resolves_through_description() {
        let mut ctx = context().with_robot_description(
            RobotDescription::new("bot", "base").with_chain(
                KinematicChainDescription::new("arm", "base", "palm")
                    .with_end_effector(EndEffectorDescription::new("gripper", "palm", "tool", ["palm"])),
            ),
        );
        let frames = ctx
            .with_scope(|_, env| Ok((env.tool_frame("gripper").to_string(), env.tool_frame("wrist").to_string())))
            .unwrap();
        assert_eq!(frames, ("tool".to_string(), "wrist".to_string()));
        assert!(format!("{ctx:?}").contains("bot"));
    }
}
