use thiserror::Error;

use crate::settings::SettingsIoError;

/// Errors produced while assembling a rig.
///
/// Steady-state ticks never fail; these only surface from construction and
/// settings I/O.
#[derive(Debug, Error)]
pub enum RigError {
    #[error("{component} requires {dependency}, which is not available")]
    MissingDependency {
        component: &'static str,
        dependency: &'static str,
    },

    #[error("bone name '{0}' is declared twice")]
    DuplicateBone(String),

    #[error("bone '{bone}' names unknown parent '{parent}'")]
    UnknownParent { bone: String, parent: String },

    #[error("rig has no bone mapped to {0}")]
    MissingBone(common::HumanBone),

    #[error("gait solver needs at least one leg")]
    NoLegs,

    #[error(transparent)]
    Settings(#[from] SettingsIoError),
}

impl RigError {
    pub fn missing(component: &'static str, dependency: &'static str) -> Self {
        RigError::MissingDependency {
            component,
            dependency,
        }
    }
}
