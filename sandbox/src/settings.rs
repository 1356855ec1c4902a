use std::path::Path;

use bevy::prelude::Resource;
use motion::RigSettings;
use motion::settings::{self as rig_settings, SettingsIoError, finite_or};
use serde::{Deserialize, Serialize};

pub const SETTINGS_FILE_PATH: &str = rig_settings::SETTINGS_FILE_PATH;

/// Scripted timeline of the sandbox run, in rendered frames. A frame number
/// of zero disables its event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// The app exits after this many frames. Zero runs forever.
    pub frames: u32,
    pub fixed_hz: f64,
    /// Walking speed of both bodies in metres per second.
    pub walk_speed: f32,
    /// Yaw rate of the crawler in radians per second.
    pub crawler_turn_rate: f32,
    pub look_from_frame: u32,
    pub look_until_frame: u32,
    pub knock_down_frame: u32,
    /// Extra velocity added to the biped the frame it is knocked over.
    pub push: [f32; 3],
    pub stand_up_frame: u32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            frames: 900,
            fixed_hz: 50.0,
            walk_speed: 0.8,
            crawler_turn_rate: 0.15,
            look_from_frame: 30,
            look_until_frame: 240,
            knock_down_frame: 300,
            push: [0.0, 0.0, -3.0],
            stand_up_frame: 600,
        }
    }
}

impl RunSettings {
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let fixed_hz = if self.fixed_hz.is_finite() {
            self.fixed_hz
        } else {
            defaults.fixed_hz
        };
        Self {
            fixed_hz: fixed_hz.clamp(1.0, 1000.0),
            walk_speed: finite_or(self.walk_speed, defaults.walk_speed).max(0.0),
            crawler_turn_rate: finite_or(self.crawler_turn_rate, defaults.crawler_turn_rate),
            push: std::array::from_fn(|axis| finite_or(self.push[axis], defaults.push[axis])),
            look_until_frame: match self.look_until_frame {
                0 => 0,
                until => until.max(self.look_from_frame),
            },
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct SandboxSettings {
    pub rig: RigSettings,
    pub run: RunSettings,
}

impl SandboxSettings {
    pub fn sanitized(self) -> Self {
        Self {
            rig: self.rig.sanitized(),
            run: self.run.sanitized(),
        }
    }
}

pub fn load_settings_or_default() -> SandboxSettings {
    rig_settings::load_settings_or_default::<SandboxSettings>(Path::new(SETTINGS_FILE_PATH))
        .sanitized()
}

pub fn ensure_settings_file_exists(settings: &SandboxSettings) -> Result<(), SettingsIoError> {
    rig_settings::ensure_settings_file_exists(settings, Path::new(SETTINGS_FILE_PATH))
}
