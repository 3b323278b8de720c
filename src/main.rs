use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use bevy::window::{Window, WindowPlugin};

mod abilities;
mod accept;
mod character;
mod combat_ability;
mod combat_log;
mod combat_plugin;
mod config;
mod constants;
mod controls;
mod core;
mod exit;
mod gate;
mod hud;
mod interest;
mod items;
mod phase;
mod save;
mod selection;
mod target;
mod world;

use accept::AcceptPlugin;
use combat_ability::DiceBox;
use combat_log::CombatLogPlugin;
use combat_plugin::CombatPlugin;
use config::load_config;
use constants::CONFIG_PATH;
use crate::core::{enter_first_scene, load_narrator, switch_scene, GameState, Narrator, NextScene, SceneEntered};
use exit::ExitPlugin;
use hud::HudPlugin;
use interest::ExplorePlugin;
use phase::{PhasePlugin, TurnSet};
use save::SaveState;
use selection::SelectionPlugin;
use target::TargetPlugin;
use world::WorldPlugin;

fn main() {
    let config = load_config(CONFIG_PATH);

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(LogPlugin {
                    level: Level::INFO,
                    filter: "wgpu=error,bevy_render=warn".to_string(),
                    ..default()
                })
                .set(ImagePlugin::default_nearest())
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: config.window_title.clone(),
                        resolution: (config.window_width as u32, config.window_height as u32).into(),
                        ..default()
                    }),
                    ..default()
                }),
        )
        .add_plugins(PhasePlugin)
        .add_plugins(CombatLogPlugin)
        .add_plugins(AcceptPlugin)
        .add_plugins(SelectionPlugin)
        .add_plugins(TargetPlugin)
        .add_plugins(CombatPlugin)
        .add_plugins(ExplorePlugin)
        .add_plugins(WorldPlugin)
        .add_plugins(HudPlugin)
        .add_plugins(ExitPlugin)
        .insert_resource(ClearColor(Color::srgb(0.1, 0.1, 0.1)))
        .insert_resource(config)
        .insert_resource(GameState::default())
        .init_resource::<NextScene>()
        .init_resource::<SaveState>()
        .init_resource::<DiceBox>()
        .init_resource::<Narrator>()
        .add_message::<SceneEntered>()
        .add_systems(Startup, (load_narrator, enter_first_scene).chain())
        .add_systems(Update, switch_scene.after(TurnSet::Present))
        .run();
}
