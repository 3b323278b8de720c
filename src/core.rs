use bevy::prelude::*;

use crate::combat_log::CombatLog;
use crate::gate::InputGates;
use crate::phase::PhaseController;
use crate::save::SaveState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scene_Kind {
    Lobby,
    GhostFight,
}

/// The scene currently on screen.
#[derive(Resource)]
pub struct GameState(pub Scene_Kind);

impl Default for GameState {
    fn default() -> Self {
        GameState(Scene_Kind::Lobby)
    }
}

/// Requested scene change, applied by `switch_scene` at the end of the frame.
#[derive(Resource, Default)]
pub struct NextScene(pub Option<Scene_Kind>);

/// Everything spawned for a scene carries this so the scene can be torn down.
#[derive(Component, Clone, Copy)]
pub struct SceneScoped(pub Scene_Kind);

#[derive(Component)]
pub struct Player;

#[derive(Component)]
pub struct MainCamera;

/// Font and click sound a speaker's combat-log lines are typed with.
#[derive(Component, Clone, Debug, Default)]
pub struct Voice {
    pub font: Handle<Font>,
    pub click: Handle<AudioSource>,
}

/// Voice used for room descriptions and system lines.
#[derive(Resource, Clone, Default)]
pub struct Narrator(pub Voice);

pub fn load_narrator(mut commands: Commands, asset_server: Res<AssetServer>) {
    commands.insert_resource(Narrator(Voice {
        font: asset_server.load("fonts/log.ttf"),
        click: asset_server.load("sounds/log.wav"),
    }));
}

/// Sent on the frame a scene becomes current, so its setup systems can run.
#[derive(Message, Debug, Clone, Copy)]
pub struct SceneEntered(pub Scene_Kind);

/// Applies a requested scene change: tears down the old scene, resets the
/// phase controller and log, and announces the new scene.
pub fn switch_scene(
    mut commands: Commands,
    mut game_state: ResMut<GameState>,
    mut next: ResMut<NextScene>,
    mut controller: ResMut<PhaseController>,
    mut gates: ResMut<InputGates>,
    log: Res<CombatLog>,
    mut save: ResMut<SaveState>,
    player: Query<&Transform, With<Player>>,
    scoped: Query<(Entity, &SceneScoped)>,
    mut entered: MessageWriter<SceneEntered>,
) {
    let Some(scene) = next.0.take() else {
        return;
    };
    if scene == game_state.0 {
        return;
    }
    if game_state.0 == Scene_Kind::Lobby {
        save.player_location = player.single().ok().map(|transform| transform.translation.truncate());
    }
    for (entity, scope) in scoped.iter() {
        if scope.0 == game_state.0 {
            commands.entity(entity).despawn();
        }
    }
    info!("Switching scene {:?} -> {:?}", game_state.0, scene);
    game_state.0 = scene;
    controller.reset();
    gates.pause_all();
    log.clear();
    entered.write(SceneEntered(scene));
}

/// Kicks off the first scene.
pub fn enter_first_scene(game_state: Res<GameState>, mut entered: MessageWriter<SceneEntered>) {
    entered.write(SceneEntered(game_state.0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::Phase;

    fn scene_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<GameState>()
            .init_resource::<NextScene>()
            .init_resource::<PhaseController>()
            .init_resource::<InputGates>()
            .init_resource::<CombatLog>()
            .init_resource::<SaveState>()
            .add_message::<SceneEntered>()
            .add_systems(Update, switch_scene);
        app
    }

    #[test]
    fn switching_tears_down_the_old_scene() {
        let mut app = scene_app();
        let plant = app
            .world_mut()
            .spawn(SceneScoped(Scene_Kind::Lobby))
            .id();
        app.world_mut()
            .spawn((Player, SceneScoped(Scene_Kind::Lobby), Transform::from_xyz(40.0, -8.0, 1.0)));
        app.world().resource::<CombatLog>().push("Bye", &Voice::default());
        app.world().resource::<PhaseController>().set_phase(Phase::Walk);
        app.world_mut().resource_mut::<NextScene>().0 = Some(Scene_Kind::GhostFight);
        app.update();

        assert!(app.world().get_entity(plant).is_err());
        assert_eq!(app.world().resource::<GameState>().0, Scene_Kind::GhostFight);
        assert_eq!(app.world().resource::<CombatLog>().len(), 0);
        assert_eq!(app.world().resource::<PhaseController>().pending(), Phase::Beginning);
        assert_eq!(
            app.world().resource::<SaveState>().player_location,
            Some(Vec2::new(40.0, -8.0))
        );
        let entered: Vec<Scene_Kind> = app
            .world_mut()
            .resource_mut::<Messages<SceneEntered>>()
            .drain()
            .map(|entered| entered.0)
            .collect();
        assert_eq!(entered, vec![Scene_Kind::GhostFight]);
    }

    #[test]
    fn same_scene_request_is_ignored() {
        let mut app = scene_app();
        let plant = app
            .world_mut()
            .spawn(SceneScoped(Scene_Kind::Lobby))
            .id();
        app.world_mut().resource_mut::<NextScene>().0 = Some(Scene_Kind::Lobby);
        app.update();
        assert!(app.world().get_entity(plant).is_ok());
        assert_eq!(app.world().resource::<NextScene>().0, None);
    }
}
