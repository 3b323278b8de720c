use bevy::prelude::*;

use crate::combat_ability::{Dice, DiceBox};
use crate::combat_log::CombatLog;
use crate::config::GameConfig;
use crate::constants::PLAYER_HITBOX;
use crate::controls::{Button, Controls};
use crate::core::{Narrator, NextScene, Player, Scene_Kind, Voice};
use crate::gate::{Collaborator, GateTick, InputGates};
use crate::phase::{Phase, PhaseCommand, TurnSet};
use crate::save::SaveState;

/// Presentation side effects requested by gameplay code.
#[derive(Message, Debug, Clone, PartialEq)]
pub enum Cue {
    /// Play a one-shot sound from the asset folder.
    Sound(&'static str),
    /// Show `frame` on the prop sprite called `name`.
    Prop { name: &'static str, frame: usize },
}

/// Axis-aligned box centered on the entity's translation.
#[derive(Component, Clone, Copy, Debug)]
pub struct Hitbox {
    pub half: Vec2,
}

impl Hitbox {
    pub fn new(size: Vec2) -> Self {
        Self { half: size / 2.0 }
    }

    pub fn rect(&self, at: Vec3) -> Rect {
        Rect::from_center_half_size(at.truncate(), self.half)
    }
}

pub fn aabb_collision(rect1: Rect, rect2: Rect) -> bool {
    rect1.min.x < rect2.max.x
        && rect1.max.x > rect2.min.x
        && rect1.min.y < rect2.max.y
        && rect1.max.y > rect2.min.y
}

#[derive(Component)]
pub struct Wall;

#[derive(Component, Default, Debug, Clone, Copy)]
pub struct Velocity(pub Vec2);

/// Named sprite whose atlas frame interactions may change.
#[derive(Component, Debug, Clone, Copy)]
pub struct Prop(pub &'static str);

pub type InterestHandler = fn(&mut InteractionContext);

/// Something in the room the player can inspect with the confirm button.
#[derive(Component, Clone, Copy)]
pub struct Interest {
    pub name: &'static str,
    pub handler: InterestHandler,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct Door {
    pub destination: Vec2,
    /// Held to walk through once the door is open.
    pub button: Button,
    pub open: bool,
    pub open_for: f32,
}

impl Door {
    pub fn new(destination: Vec2, button: Button) -> Self {
        Self {
            destination,
            button,
            open: false,
            open_for: 0.0,
        }
    }
}

/// What an interaction asked for, applied by whoever ran it.
#[derive(Default)]
pub struct InteractionOutcome {
    pub script: Vec<PhaseCommand>,
    pub cues: Vec<Cue>,
    pub scene: Option<Scene_Kind>,
}

/// Capabilities handed to interest handlers and accept callbacks.
///
/// Phase commands are collected and submitted in order once the handler returns.
pub struct InteractionContext<'a> {
    pub save: &'a mut SaveState,
    pub dice: &'a mut dyn Dice,
    log: &'a CombatLog,
    voice: Voice,
    outcome: InteractionOutcome,
}

impl<'a> InteractionContext<'a> {
    pub fn new(
        save: &'a mut SaveState,
        log: &'a CombatLog,
        voice: Voice,
        dice: &'a mut dyn Dice,
    ) -> Self {
        Self {
            save,
            dice,
            log,
            voice,
            outcome: InteractionOutcome::default(),
        }
    }

    pub fn say_all<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.log.push_all(lines, &self.voice);
    }

    pub fn roll(&mut self, sides: u32) -> u32 {
        self.dice.roll(sides)
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.outcome.script.push(PhaseCommand::Set(phase));
    }

    pub fn dequeue(&mut self) {
        self.outcome.script.push(PhaseCommand::Dequeue);
    }

    /// Queues `phases` and starts the first one.
    pub fn run_script(&mut self, phases: &[Phase]) {
        for phase in phases {
            self.set_phase(*phase);
        }
        self.dequeue();
    }

    /// From inside an accept callback: drops what the outer script still had
    /// queued, then runs `phases`.
    pub fn continue_with(&mut self, phases: &[Phase]) {
        self.dequeue();
        self.run_script(phases);
    }

    pub fn on_accept(&mut self, action: impl FnOnce(&mut InteractionContext) + Send + Sync + 'static) {
        self.outcome
            .script
            .push(PhaseCommand::OnAccept(Box::new(action)));
    }

    pub fn cue(&mut self, cue: Cue) {
        self.outcome.cues.push(cue);
    }

    pub fn change_scene(&mut self, scene: Scene_Kind) {
        self.outcome.scene = Some(scene);
    }

    pub fn finish(self) -> InteractionOutcome {
        self.outcome
    }
}

pub fn move_player(
    time: Res<Time>,
    config: Res<GameConfig>,
    controls: Res<Controls>,
    mut gates: ResMut<InputGates>,
    mut player: Query<(&mut Transform, &mut Velocity, &Hitbox), With<Player>>,
    walls: Query<(&Transform, &Hitbox), (With<Wall>, Without<Player>)>,
) {
    let Ok((mut transform, mut velocity, hitbox)) = player.single_mut() else {
        return;
    };
    if gates.poll(Collaborator::Movement) != GateTick::Active {
        velocity.0 = Vec2::ZERO;
        return;
    }
    velocity.0 = controls.direction().normalize_or_zero() * config.player_speed;
    if velocity.0 == Vec2::ZERO {
        return;
    }
    let step = velocity.0 * time.delta_secs();
    // Slide along walls by trying each axis on its own.
    for delta in [Vec2::new(step.x, 0.0), Vec2::new(0.0, step.y)] {
        let next = transform.translation + delta.extend(0.0);
        let blocked = walls.iter().any(|(wall, wall_box)| {
            aabb_collision(hitbox.rect(next), wall_box.rect(wall.translation))
        });
        if !blocked {
            transform.translation = next;
        }
    }
}

pub fn operate_doors(
    time: Res<Time>,
    config: Res<GameConfig>,
    controls: Res<Controls>,
    mut gates: ResMut<InputGates>,
    mut player: Query<(&mut Transform, &Hitbox), With<Player>>,
    mut doors: Query<(&mut Door, &Transform, &Hitbox), Without<Player>>,
) {
    let ready = gates.ready(Collaborator::Doors);
    let Ok((mut player_transform, player_box)) = player.single_mut() else {
        return;
    };
    let player_rect = player_box.rect(player_transform.translation);
    let mut destination = None;
    for (mut door, transform, hitbox) in doors.iter_mut() {
        if !aabb_collision(player_rect, hitbox.rect(transform.translation)) {
            door.open = false;
            door.open_for = 0.0;
            continue;
        }
        door.open = true;
        door.open_for += time.delta_secs();
        if ready && door.open_for >= config.door_open_delay && controls.pressed(door.button) {
            destination = Some(door.destination);
        }
    }
    if let Some(destination) = destination {
        debug!("Walking through door to {destination}");
        player_transform.translation = destination.extend(player_transform.translation.z);
    }
}

pub fn activate_interests(
    controls: Res<Controls>,
    mut gates: ResMut<InputGates>,
    player: Query<(&Transform, &Hitbox), With<Player>>,
    interests: Query<(&Interest, &Transform, &Hitbox), Without<Player>>,
    mut save: ResMut<SaveState>,
    log: Res<CombatLog>,
    narrator: Res<Narrator>,
    mut dice: ResMut<DiceBox>,
    mut phase_commands: MessageWriter<PhaseCommand>,
    mut cues: MessageWriter<Cue>,
    mut next_scene: ResMut<NextScene>,
) {
    if !gates.ready(Collaborator::Interests) || !controls.just_pressed(Button::A) {
        return;
    }
    let Ok((player_transform, player_box)) = player.single() else {
        return;
    };
    let player_rect = player_box.rect(player_transform.translation);
    let Some(interest) = interests
        .iter()
        .find(|(_, transform, hitbox)| aabb_collision(player_rect, hitbox.rect(transform.translation)))
        .map(|(interest, _, _)| *interest)
    else {
        return;
    };

    info!("Inspecting {}", interest.name);
    let mut ctx = InteractionContext::new(&mut save, &log, narrator.0.clone(), dice.roller());
    (interest.handler)(&mut ctx);
    let outcome = ctx.finish();
    phase_commands.write_batch(outcome.script);
    cues.write_batch(outcome.cues);
    if outcome.scene.is_some() {
        next_scene.0 = outcome.scene;
    }
}

pub fn player_hitbox() -> Hitbox {
    Hitbox::new(Vec2::splat(PLAYER_HITBOX))
}

fn register_explore_gates(mut gates: ResMut<InputGates>) {
    for who in [
        Collaborator::Movement,
        Collaborator::Doors,
        Collaborator::Interests,
    ] {
        gates.register(who);
    }
}

pub struct ExplorePlugin;

impl Plugin for ExplorePlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<Cue>()
            .add_systems(Startup, register_explore_gates)
            .add_systems(
                Update,
                (move_player, operate_doors, activate_interests)
                    .chain()
                    .in_set(TurnSet::Select),
            );
    }
}
