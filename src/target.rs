use bevy::prelude::*;

use crate::character::{CastBar, Character, PartyMember, Selection, Side};
use crate::combat_ability::TargetType;
use crate::combat_log::CombatLog;
use crate::controls::{Button, Controls};
use crate::core::{Narrator, Voice};
use crate::gate::{Collaborator, GateTick, InputGates};
use crate::phase::{Phase, PhaseCommand, TurnSet};
use crate::selection::{wrap_step, CardMenu};

/// Cursor over the characters the queued action may be aimed at.
#[derive(Resource, Debug, Default)]
pub struct TargetCursor {
    pub current: usize,
    /// Character under the cursor, for the pointer sprite.
    pub highlighted: Option<Entity>,
}

/// Characters `target` may reach, friends first.
pub fn candidates(target: TargetType, friends: &[Entity], enemies: &[Entity]) -> Vec<Entity> {
    match target {
        TargetType::None => Vec::new(),
        TargetType::SingleEnemy | TargetType::AllEnemies => enemies.to_vec(),
        TargetType::SingleFriend | TargetType::AllFriends => friends.to_vec(),
        TargetType::SingleAny | TargetType::All => [friends, enemies].concat(),
    }
}

/// Pays the action's MP cost and starts its cast bar.
///
/// Returns false, with a line in the log, when the caster cannot afford it.
pub fn begin_cast(
    character: &mut Character,
    selection: &Selection,
    bar: &mut CastBar,
    log: &CombatLog,
    voice: &Voice,
) -> bool {
    let Some(action) = selection.action else {
        return false;
    };
    let cost = action.mp_cost();
    if character.stats.mp < cost {
        log.push(format!("{} doesn't have enough MP!", character.name), voice);
        return false;
    }
    character.stats.mp -= cost;
    character.defending = false;
    bar.start(action.cast_time(&character.stats));
    debug!("{} starts casting {}", character.name, action.title());
    true
}

type Roster<'w, 's> = Query<'w, 's, (Entity, &'static Side, &'static Character, Option<&'static PartyMember>)>;
type Casters<'w, 's> = Query<
    'w,
    's,
    (
        &'static PartyMember,
        &'static mut Character,
        &'static mut Selection,
        &'static mut CastBar,
    ),
>;

/// Friends ordered by card slot and enemies still standing, in spawn order.
fn sides(roster: &Roster) -> (Vec<Entity>, Vec<Entity>) {
    let mut friends: Vec<(usize, Entity)> = Vec::new();
    let mut enemies = Vec::new();
    for (entity, side, character, member) in roster.iter() {
        match side {
            Side::Party => friends.push((member.map_or(usize::MAX, |m| m.slot), entity)),
            Side::Enemy if !character.stats.is_down() => enemies.push(entity),
            Side::Enemy => {}
        }
    }
    friends.sort();
    enemies.sort();
    (friends.into_iter().map(|(_, entity)| entity).collect(), enemies)
}

pub fn select_target(
    controls: Res<Controls>,
    mut gates: ResMut<InputGates>,
    mut cursor: ResMut<TargetCursor>,
    card: Res<CardMenu>,
    mut characters: ParamSet<(Roster, Casters)>,
    log: Res<CombatLog>,
    narrator: Res<Narrator>,
    mut phase_commands: MessageWriter<PhaseCommand>,
) {
    let tick = gates.poll(Collaborator::Target);
    if tick == GateTick::Paused {
        cursor.highlighted = None;
        return;
    }
    let (friends, enemies) = sides(&characters.p0());

    let mut casters = characters.p1();
    let Some((_, mut character, mut selection, mut bar)) = casters
        .iter_mut()
        .find(|(member, ..)| member.slot == card.current)
    else {
        warn!("No party member in slot {}", card.current);
        phase_commands.write_batch([PhaseCommand::Set(Phase::CardSelect), PhaseCommand::Dequeue]);
        return;
    };
    let Some(action) = selection.action else {
        warn!("{} entered targeting without an action", character.name);
        phase_commands.write_batch([PhaseCommand::Set(Phase::CardSelect), PhaseCommand::Dequeue]);
        return;
    };

    let target = action.target();
    let reachable = candidates(target, &friends, &enemies);
    if tick == GateTick::Opening {
        cursor.current = 0;
    } else if controls.just_pressed(Button::Left) {
        cursor.current = wrap_step(cursor.current, -1, reachable.len());
    } else if controls.just_pressed(Button::Right) {
        cursor.current = wrap_step(cursor.current, 1, reachable.len());
    }
    cursor.highlighted = target
        .is_single()
        .then(|| reachable.get(cursor.current).copied())
        .flatten();

    let confirmed = target == TargetType::None || (tick == GateTick::Active && controls.just_pressed(Button::A));
    if confirmed {
        let chosen = match (target.is_single(), cursor.highlighted) {
            (true, Some(entity)) => vec![entity],
            (true, None) => {
                log.push("There's nobody to aim at!", &narrator.0);
                Vec::new()
            }
            (false, _) => reachable,
        };
        if target.is_single() && chosen.is_empty() {
            selection.clear();
        } else {
            selection.friends = chosen.iter().copied().filter(|e| friends.contains(e)).collect();
            selection.enemies = chosen.iter().copied().filter(|e| enemies.contains(e)).collect();
            if !begin_cast(&mut character, &selection, &mut bar, &log, &narrator.0) {
                selection.clear();
            }
        }
        phase_commands.write_batch([PhaseCommand::Set(Phase::CardSelect), PhaseCommand::Dequeue]);
    } else if tick == GateTick::Active && controls.just_pressed(Button::B) {
        let origin = selection.origin;
        selection.clear();
        phase_commands.write_batch([PhaseCommand::Set(origin), PhaseCommand::Dequeue]);
    }
}

fn register_target_gate(mut gates: ResMut<InputGates>) {
    gates.register(Collaborator::Target);
}

pub struct TargetPlugin;

impl Plugin for TargetPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TargetCursor>()
            .add_systems(Startup, register_target_gate)
            .add_systems(Update, select_target.in_set(TurnSet::Select));
    }
}
