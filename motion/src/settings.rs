//! Per-rig tuning values and their YAML persistence.
//!
//! Every section is `#[serde(default)]`, so a settings file only needs to list
//! the values it changes. Out-of-range values are clamped by
//! [`RigSettings::sanitized`] instead of being rejected.

use std::fs;
use std::path::Path;

use bevy::log::warn;
use common::{HumanBone, LayerMask};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SETTINGS_FILE_PATH: &str = "./rig.yaml";

/// `value` unless it is NaN or infinite, in which case `default`.
pub fn finite_or(value: f32, default: f32) -> f32 {
    if value.is_finite() { value } else { default }
}

/// Envelope within which a limb aimer activates, and how fast it blends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReachProfile {
    pub min_reach: f32,
    pub max_reach: f32,
    /// Weight change per tick while ramping.
    pub ramp_rate: f32,
    pub target_weight: f32,
}

impl Default for ReachProfile {
    fn default() -> Self {
        Self {
            min_reach: 0.0,
            max_reach: 1.0,
            ramp_rate: 0.1,
            target_weight: 1.0,
        }
    }
}

impl ReachProfile {
    pub fn contains(&self, distance: f32) -> bool {
        distance >= self.min_reach && distance <= self.max_reach
    }

    /// Clamps into a usable envelope. Non-finite fields take their value
    /// from `fallback`.
    pub fn sanitized_or(self, fallback: ReachProfile) -> Self {
        let min_reach = finite_or(self.min_reach, fallback.min_reach).max(0.0);
        Self {
            min_reach,
            max_reach: finite_or(self.max_reach, fallback.max_reach).max(min_reach),
            ramp_rate: finite_or(self.ramp_rate, fallback.ramp_rate).clamp(0.001, 1.0),
            target_weight: finite_or(self.target_weight, fallback.target_weight).clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitConfig {
    /// Planar distance a foot may lag its anchor before it steps.
    pub step_length: f32,
    /// Apex of the swing arc.
    pub step_height: f32,
    /// Velocity smoothing constant; also the number of ticks per step.
    pub smoothing: f32,
    pub velocity_multiplier: f32,
    /// Ground probes start this far above the target and reach twice as far.
    pub probe_range: f32,
    pub adjust_orientation: bool,
    pub ground_mask: LayerMask,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            step_length: 0.15,
            step_height: 0.15,
            smoothing: 8.0,
            velocity_multiplier: 15.0,
            probe_range: 1.0,
            adjust_orientation: true,
            ground_mask: LayerMask::ALL.without(LayerMask::RAGDOLL),
        }
    }
}

impl GaitConfig {
    /// Scales the distances that are authored for a unit-sized rig.
    pub fn scaled(mut self, scale: f32) -> Self {
        let scale = scale.abs().max(f32::EPSILON);
        self.step_length *= scale;
        self.step_height *= scale;
        self
    }

    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            step_length: finite_or(self.step_length, defaults.step_length).clamp(0.01, 0.5),
            step_height: finite_or(self.step_height, defaults.step_height).clamp(0.01, 0.5),
            smoothing: finite_or(self.smoothing, defaults.smoothing).clamp(0.01, 10.0),
            velocity_multiplier: finite_or(self.velocity_multiplier, defaults.velocity_multiplier)
                .max(0.0),
            probe_range: finite_or(self.probe_range, defaults.probe_range).max(0.01),
            ..self
        }
    }

    /// Number of ticks a step's swing is spread across.
    pub fn step_ticks(&self) -> u32 {
        (self.smoothing.floor() as u32).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FootAimConfig {
    pub reach: ReachProfile,
    /// Height the foot is kept above the contact point.
    pub ground_offset: f32,
    /// Probes start this far above the animated foot.
    pub probe_height: f32,
    pub ground_mask: LayerMask,
    pub left_weight_parameter: String,
    pub right_weight_parameter: String,
}

impl Default for FootAimConfig {
    fn default() -> Self {
        Self {
            reach: ReachProfile {
                min_reach: 0.0,
                max_reach: 1.2,
                ramp_rate: 0.1,
                target_weight: 1.0,
            },
            ground_offset: 0.1,
            probe_height: 1.0,
            ground_mask: LayerMask::GROUND,
            left_weight_parameter: "LeftFootWeightIK".to_string(),
            right_weight_parameter: "RightFootWeightIK".to_string(),
        }
    }
}

impl FootAimConfig {
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            reach: self.reach.sanitized_or(defaults.reach),
            ground_offset: finite_or(self.ground_offset, defaults.ground_offset).clamp(0.0, 1.0),
            probe_height: finite_or(self.probe_height, defaults.probe_height).max(0.0),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandAimConfig {
    pub reach: ReachProfile,
    pub origin_bone: HumanBone,
    /// Offset of the probe origin in character space.
    pub origin_offset: [f32; 3],
    /// Distance the palm is held off the surface.
    pub hand_offset: f32,
    pub wall_mask: LayerMask,
    pub crouch_layer: String,
    /// Fraction of the ramp rate used while letting go.
    pub release_factor: f32,
}

impl Default for HandAimConfig {
    fn default() -> Self {
        Self {
            reach: ReachProfile {
                min_reach: 0.35,
                max_reach: 0.85,
                ramp_rate: 0.3 / 50.0 * 10.0,
                target_weight: 1.0,
            },
            origin_bone: HumanBone::UpperChest,
            origin_offset: [0.0, 0.0, 0.0],
            hand_offset: 0.05,
            wall_mask: LayerMask::WALL,
            crouch_layer: "Crouch Layer".to_string(),
            release_factor: 0.9,
        }
    }
}

impl HandAimConfig {
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            reach: self.reach.sanitized_or(defaults.reach),
            origin_offset: std::array::from_fn(|axis| {
                finite_or(self.origin_offset[axis], defaults.origin_offset[axis])
            }),
            hand_offset: finite_or(self.hand_offset, defaults.hand_offset).clamp(0.0, 0.2),
            release_factor: finite_or(self.release_factor, defaults.release_factor)
                .clamp(0.01, 1.0),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadAimConfig {
    pub reach: ReachProfile,
    pub origin_bone: HumanBone,
    pub sight_mask: LayerMask,
}

impl Default for HeadAimConfig {
    fn default() -> Self {
        Self {
            reach: ReachProfile {
                min_reach: 0.0,
                max_reach: 50.0,
                ramp_rate: 0.3 / 50.0 * 10.0,
                target_weight: 1.0,
            },
            origin_bone: HumanBone::Neck,
            sight_mask: LayerMask::ALL.without(LayerMask::RAGDOLL),
        }
    }
}

impl HeadAimConfig {
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            reach: self.reach.sanitized_or(defaults.reach),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagdollConfig {
    /// Wait for an explicit stand-up request instead of the rest detector.
    pub press_to_stand: bool,
    /// Seconds the body must lie still before standing up on its own.
    pub min_time_to_stand: f32,
    /// Vertical speed of the reference limb below which the body counts as settled.
    pub rest_velocity_threshold: f32,
    pub ragdoll_camera_offset: Option<f32>,
    pub impulse_multiplier: f32,
    /// Vertical body speeds below this are dropped from the knock-down impulse.
    pub vertical_deadzone: f32,
    /// Seconds during which the root is dragged onto the ragdoll's hips.
    pub get_up_window: f32,
    pub blend_duration: f32,
    pub get_up_from_back: String,
    pub get_up_from_front: String,
    pub recovery_layer: usize,
    pub ground_probe_height: f32,
    pub environment_mask: LayerMask,
    pub wait_for_recovery_clip: bool,
}

impl Default for RagdollConfig {
    fn default() -> Self {
        Self {
            press_to_stand: false,
            min_time_to_stand: 2.0,
            rest_velocity_threshold: 0.1,
            ragdoll_camera_offset: None,
            impulse_multiplier: 1.2,
            vertical_deadzone: 0.3,
            get_up_window: 0.05,
            blend_duration: 0.5,
            get_up_from_back: "GetUpFromBack".to_string(),
            get_up_from_front: "GetUpFromFront".to_string(),
            recovery_layer: 0,
            ground_probe_height: 1.0,
            environment_mask: LayerMask::ALL.without(LayerMask::RAGDOLL),
            wait_for_recovery_clip: false,
        }
    }
}

impl RagdollConfig {
    /// Non-finite values take the default; a non-finite camera offset is
    /// dropped.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            min_time_to_stand: finite_or(self.min_time_to_stand, defaults.min_time_to_stand)
                .clamp(0.0, 5.0),
            rest_velocity_threshold: finite_or(
                self.rest_velocity_threshold,
                defaults.rest_velocity_threshold,
            )
            .max(0.0),
            ragdoll_camera_offset: self
                .ragdoll_camera_offset
                .filter(|offset| offset.is_finite())
                .map(|offset| offset.clamp(0.0, 2.0)),
            impulse_multiplier: finite_or(self.impulse_multiplier, defaults.impulse_multiplier)
                .max(0.0),
            vertical_deadzone: finite_or(self.vertical_deadzone, defaults.vertical_deadzone)
                .max(0.0),
            get_up_window: finite_or(self.get_up_window, defaults.get_up_window).max(0.0),
            blend_duration: finite_or(self.blend_duration, defaults.blend_duration).max(0.001),
            ground_probe_height: finite_or(self.ground_probe_height, defaults.ground_probe_height)
                .max(0.0),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RigSettings {
    pub gait: GaitConfig,
    pub foot: FootAimConfig,
    pub hand: HandAimConfig,
    pub head: HeadAimConfig,
    pub ragdoll: RagdollConfig,
}

impl RigSettings {
    pub fn sanitized(self) -> Self {
        Self {
            gait: self.gait.sanitized(),
            foot: self.foot.sanitized(),
            hand: self.hand.sanitized(),
            head: self.head.sanitized(),
            ragdoll: self.ragdoll.sanitized(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsIoError {
    #[error("failed to read settings file: {0}")]
    Read(std::io::Error),
    #[error("failed to write settings file: {0}")]
    Write(std::io::Error),
    #[error("failed to decode YAML settings: {0}")]
    Deserialize(serde_yaml::Error),
    #[error("failed to encode YAML settings: {0}")]
    Serialize(serde_yaml::Error),
}

/// Loads settings from `path`, falling back to defaults when the file is
/// missing or malformed.
pub fn load_settings_or_default<S>(path: &Path) -> S
where
    S: Default + for<'de> Deserialize<'de>,
{
    if !path.exists() {
        return S::default();
    }

    match load_settings_from_path(path) {
        Ok(settings) => settings,
        Err(error) => {
            warn!(
                "Failed to load settings from '{}': {}. Falling back to defaults.",
                path.display(),
                error
            );
            S::default()
        }
    }
}

pub fn ensure_settings_file_exists<S: Serialize>(
    settings: &S,
    path: &Path,
) -> Result<(), SettingsIoError> {
    if path.exists() {
        return Ok(());
    }

    write_settings_to_path(settings, path)
}

pub fn load_settings_from_path<S>(path: &Path) -> Result<S, SettingsIoError>
where
    S: for<'de> Deserialize<'de>,
{
    let raw = fs::read_to_string(path).map_err(SettingsIoError::Read)?;
    serde_yaml::from_str::<S>(&raw).map_err(SettingsIoError::Deserialize)
}

pub fn write_settings_to_path<S: Serialize>(
    settings: &S,
    path: &Path,
) -> Result<(), SettingsIoError> {
    let encoded = serde_yaml::to_string(settings).map_err(SettingsIoError::Serialize)?;
    fs::write(path, encoded).map_err(SettingsIoError::Write)
}
