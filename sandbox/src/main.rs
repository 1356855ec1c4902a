use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use sandbox::{SandboxPlugin, settings};

const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

fn main() {
    let startup_settings = settings::load_settings_or_default();
    if let Err(error) = settings::ensure_settings_file_exists(&startup_settings) {
        eprintln!(
            "Failed to ensure startup settings file '{}': {}",
            settings::SETTINGS_FILE_PATH,
            error
        );
    }

    App::new()
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(FRAME_INTERVAL)))
        .add_plugins(LogPlugin::default())
        .add_plugins(SandboxPlugin::new(startup_settings))
        .run();
}
