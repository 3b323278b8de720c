use bevy::app::AppExit;
use bevy::prelude::*;

use crate::config::GameConfig;
use crate::controls::{Button, Controls};
use crate::phase::TurnSet;

/// How long Exit has been held.
#[derive(Resource, Debug, Default)]
pub struct ExitHold {
    pub held: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStep {
    Idle,
    Counting(&'static str),
    Leave,
}

impl ExitHold {
    pub fn advance(&mut self, pressed: bool, dt: f32, hold_for: f32) -> ExitStep {
        if !pressed {
            self.held = 0.0;
            return ExitStep::Idle;
        }
        self.held += dt;
        let progress = if hold_for > 0.0 { self.held / hold_for } else { 1.0 };
        if progress < 0.3 {
            ExitStep::Counting("exiting .")
        } else if progress < 0.7 {
            ExitStep::Counting("exiting . .")
        } else if progress < 1.0 {
            ExitStep::Counting("exiting . . .")
        } else {
            ExitStep::Leave
        }
    }
}

#[derive(Component)]
struct ExitLabel;

fn spawn_exit_label(mut commands: Commands) {
    commands.spawn((
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(8.0),
            bottom: Val::Px(8.0),
            ..default()
        },
        Text::new("exiting"),
        TextFont {
            font_size: 14.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Visibility::Hidden,
        ExitLabel,
    ));
}

pub fn hold_to_exit(
    time: Res<Time>,
    config: Res<GameConfig>,
    controls: Res<Controls>,
    mut hold: ResMut<ExitHold>,
    mut label: Query<(&mut Text, &mut Visibility), With<ExitLabel>>,
    mut exit: MessageWriter<AppExit>,
) {
    let step = hold.advance(
        controls.pressed(Button::Exit),
        time.delta_secs(),
        config.exit_hold_seconds,
    );
    if step == ExitStep::Leave {
        info!("Exit held for {}s, quitting", config.exit_hold_seconds);
        exit.write(AppExit::Success);
        return;
    }
    let Ok((mut text, mut visibility)) = label.single_mut() else {
        return;
    };
    match step {
        ExitStep::Counting(message) => {
            if text.0 != message {
                text.0 = message.to_string();
            }
            visibility.set_if_neq(Visibility::Inherited);
        }
        _ => {
            visibility.set_if_neq(Visibility::Hidden);
        }
    }
}

pub struct ExitPlugin;

impl Plugin for ExitPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ExitHold>()
            .add_systems(Startup, spawn_exit_label)
            .add_systems(Update, hold_to_exit.in_set(TurnSet::Present));
    }
}
