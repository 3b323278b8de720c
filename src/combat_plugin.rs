use bevy::prelude::*;

use crate::abilities::{ENERGY_BLAST, LOOK_AROUND};
use crate::character::{BarMirror, CastBar, Character, PartyMember, Selection, Side, Stats};
use crate::combat_ability::{Ability, Action, Dice, DiceBox, EffectContext, TargetView, VitalChange};
use crate::combat_log::CombatLog;
use crate::constants::SaveFlags;
use crate::core::{GameState, Narrator, NextScene, SceneEntered, SceneScoped, Scene_Kind, Voice};
use crate::gate::InputGates;
use crate::interest::Cue;
use crate::phase::{Phase, PhaseCommand, PhaseController, TurnSet};
use crate::save::SaveState;
use crate::selection::CardMenu;

/// -----------------------------
/// Components & Types
/// -----------------------------

/// A change to another character's vitals, produced by an effect.
#[derive(Debug, Clone, Copy, Message)]
pub struct VitalEvent(pub VitalChange);

/// Waits a random interval, then queues `attack` on a random party member.
#[derive(Component, Debug)]
pub struct EnemyAi {
    pub min_wait: f32,
    pub max_wait: f32,
    pub wait: f32,
    pub attack: &'static Ability,
}

impl EnemyAi {
    pub fn new(min_wait: f32, max_wait: f32, attack: &'static Ability) -> Self {
        Self {
            min_wait,
            max_wait,
            wait: max_wait,
            attack,
        }
    }

    /// Uniform draw in `[min_wait, max_wait]`, millisecond resolution.
    pub fn next_wait(&self, dice: &mut dyn Dice) -> f32 {
        let span = ((self.max_wait - self.min_wait).max(0.0) * 1000.0) as u32;
        self.min_wait + dice.roll(span + 1) as f32 / 1000.0
    }
}

#[derive(Resource, Debug, Default)]
pub struct FightState {
    pub over: bool,
    pub won: bool,
    /// The closing lines have been put in front of the player.
    pub farewell_shown: bool,
}

pub const GHOST_NAME: &str = "Blood Mouthed Ghost";

pub fn you() -> Character {
    let mut you = Character::new(
        "You",
        Stats {
            hp: 100.0,
            max_hp: 100.0,
            mp: 100.0,
            max_mp: 100.0,
            strength: 25.0,
            defense: 25.0,
            dexterity: 35.0,
            intelligence: 40.0,
        },
    );
    you.add_ability(&LOOK_AROUND);
    you
}

/// The president, once recruited.
pub fn me() -> Character {
    let mut me = Character::new(
        "Me",
        Stats {
            hp: 80.0,
            max_hp: 80.0,
            mp: 120.0,
            max_mp: 120.0,
            strength: 15.0,
            defense: 20.0,
            dexterity: 25.0,
            intelligence: 60.0,
        },
    );
    me.add_ability(&LOOK_AROUND);
    me
}

pub fn blood_mouthed_ghost() -> Character {
    let mut ghost = Character::new(
        GHOST_NAME,
        Stats {
            hp: 300.0,
            max_hp: 300.0,
            mp: 100.0,
            max_mp: 100.0,
            strength: 20.0,
            defense: 20.0,
            dexterity: 30.0,
            intelligence: 25.0,
        },
    );
    ghost.add_ability(&ENERGY_BLAST);
    ghost
}

/// Party for the current playthrough, in card order.
pub fn party(save: &SaveState) -> Vec<Character> {
    let mut party = vec![you()];
    if save.has(SaveFlags::RECRUITED_ME) {
        party.push(me());
    }
    party
}

/// -----------------------------
/// Fight setup
/// -----------------------------

pub fn spawn_fight(
    mut commands: Commands,
    mut entered: MessageReader<SceneEntered>,
    save: Res<SaveState>,
    log: Res<CombatLog>,
    narrator: Res<Narrator>,
    mut fight: ResMut<FightState>,
    mut card: ResMut<CardMenu>,
    mut phase_commands: MessageWriter<PhaseCommand>,
) {
    if !entered.read().any(|entered| entered.0 == Scene_Kind::GhostFight) {
        return;
    }
    *fight = FightState::default();
    card.current = 0;

    for (slot, member) in party(&save).into_iter().enumerate() {
        commands.spawn((
            member,
            Side::Party,
            PartyMember { slot },
            Selection::default(),
            CastBar::default(),
            BarMirror::default(),
            SceneScoped(Scene_Kind::GhostFight),
        ));
    }
    commands.spawn((
        blood_mouthed_ghost(),
        Side::Enemy,
        EnemyAi::new(4.0, 8.0, &ENERGY_BLAST),
        Selection::default(),
        CastBar::default(),
        BarMirror::default(),
        SceneScoped(Scene_Kind::GhostFight),
    ));

    info!("Ghost fight started");
    log.push("A Blood Mouthed Ghost   Appearerated!", &narrator.0);
    phase_commands.write_batch([
        PhaseCommand::Set(Phase::Listen),
        PhaseCommand::Set(Phase::CardSelect),
    ]);
}

/// -----------------------------
/// Turn resolution
/// -----------------------------

type Combatants<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static mut Character,
        &'static mut Selection,
        &'static mut CastBar,
        Option<&'static Voice>,
    ),
>;

fn views(combatants: &Combatants, entities: &[Entity]) -> Vec<TargetView> {
    entities
        .iter()
        .filter_map(|entity| combatants.get(*entity).ok())
        .map(|(entity, character, ..)| TargetView {
            entity,
            name: character.name.clone(),
            stats: character.stats,
        })
        .collect()
}

/// Advances every cast bar and fires the queued action of each bar that fills.
pub fn resolve_casts(
    time: Res<Time>,
    mut combatants: Combatants,
    mut save: ResMut<SaveState>,
    mut dice: ResMut<DiceBox>,
    log: Res<CombatLog>,
    narrator: Res<Narrator>,
    mut vitals: MessageWriter<VitalEvent>,
    mut cues: MessageWriter<Cue>,
) {
    let dt = time.delta_secs();
    let fired: Vec<Entity> = combatants
        .iter_mut()
        .filter_map(|(entity, character, _, mut bar, _)| {
            (!character.stats.is_down() && bar.tick(dt)).then_some(entity)
        })
        .collect();

    for caster in fired {
        let Ok((_, _, selection, _, _)) = combatants.get(caster) else {
            continue;
        };
        let Some(action) = selection.action else {
            warn!("Cast finished with nothing selected for {caster:?}");
            continue;
        };
        let friends = views(&combatants, &selection.friends);
        let enemies = views(&combatants, &selection.enemies);

        let Ok((_, mut character, mut selection, _, voice)) = combatants.get_mut(caster) else {
            continue;
        };
        debug!("{} uses {}", character.name, action.title());
        let voice = voice.cloned().unwrap_or_else(|| narrator.0.clone());
        let mut ctx = EffectContext::new(
            &mut character,
            caster,
            &friends,
            &enemies,
            &mut save,
            dice.roller(),
            &log,
            voice,
        );
        (action.effect())(&mut ctx);
        let outcome = ctx.finish();
        selection.clear();

        vitals.write_batch(outcome.changes.into_iter().map(VitalEvent));
        cues.write_batch(outcome.cues);
    }
}

pub fn apply_vital_events(mut events: MessageReader<VitalEvent>, mut characters: Query<&mut Character>) {
    for VitalEvent(change) in events.read() {
        let (target, amount) = match *change {
            VitalChange::Damage { target, amount }
            | VitalChange::Heal { target, amount }
            | VitalChange::RestoreMp { target, amount } => (target, amount),
        };
        let Ok(mut character) = characters.get_mut(target) else {
            warn!("Vital change for missing character {target:?}");
            continue;
        };
        match change {
            VitalChange::Damage { .. } => {
                character.take_damage(amount);
            }
            VitalChange::Heal { .. } => character.heal(amount),
            VitalChange::RestoreMp { .. } => character.restore_mp(amount),
        }
    }
}

/// A character at 0 HP drops whatever it was casting.
pub fn stop_downed_casts(
    mut characters: Query<(&Character, &mut Selection, &mut CastBar)>,
    log: Res<CombatLog>,
    narrator: Res<Narrator>,
) {
    for (character, mut selection, mut bar) in &mut characters {
        if character.stats.is_down() && bar.casting {
            bar.stop();
            selection.clear();
            log.push(format!("{} can't keep going!", character.name), &narrator.0);
        }
    }
}

pub fn run_enemy_ai(
    time: Res<Time>,
    fight: Res<FightState>,
    mut dice: ResMut<DiceBox>,
    roster: Query<(Entity, &Side, &Character)>,
    mut enemies: Query<(&mut EnemyAi, &Character, &mut Selection, &mut CastBar)>,
) {
    if fight.over {
        return;
    }
    let mut party: Vec<Entity> = roster
        .iter()
        .filter(|(_, side, character)| **side == Side::Party && !character.stats.is_down())
        .map(|(entity, ..)| entity)
        .collect();
    if party.is_empty() {
        return;
    }
    party.sort();

    for (mut ai, character, mut selection, mut bar) in &mut enemies {
        if character.stats.is_down() || bar.casting {
            continue;
        }
        ai.wait -= time.delta_secs();
        if ai.wait > 0.0 {
            continue;
        }
        let target = party[dice.roller().roll(party.len() as u32) as usize];
        let action = Action::Ability(ai.attack);
        selection.choose(action, Phase::default());
        selection.enemies.push(target);
        bar.start(action.cast_time(&character.stats));
        ai.wait = ai.next_wait(dice.roller());
        debug!("{} winds up {} at {target:?}", character.name, action.title());
    }
}

/// -----------------------------
/// Fight outcome
/// -----------------------------

pub fn check_fight_outcome(
    game_state: Res<GameState>,
    mut fight: ResMut<FightState>,
    roster: Query<(&Side, &Character)>,
    mut bars: Query<(&mut Selection, &mut CastBar)>,
    mut controller: ResMut<PhaseController>,
    mut gates: ResMut<InputGates>,
    log: Res<CombatLog>,
    narrator: Res<Narrator>,
    mut phase_commands: MessageWriter<PhaseCommand>,
) {
    if game_state.0 != Scene_Kind::GhostFight || fight.over || roster.is_empty() {
        return;
    }
    let standing = |wanted: Side| {
        roster
            .iter()
            .any(|(side, character)| *side == wanted && !character.stats.is_down())
    };
    let won = !standing(Side::Enemy);
    let lost = !standing(Side::Party);
    if !won && !lost {
        return;
    }

    fight.over = true;
    fight.won = won;
    for (mut selection, mut bar) in &mut bars {
        bar.stop();
        selection.clear();
    }
    if won {
        info!("Ghost fight won");
        log.push_all(
            [
                "The Blood Mouthed Ghost lets out one last wail...",
                "And fades into the carpet!",
                "The lobby is safe again.",
            ],
            &narrator.0,
        );
    } else {
        info!("Ghost fight lost");
        log.push_all(
            [
                "Everything goes dark...",
                "You wake up back in the lobby.",
                "The ghost is still out there somewhere.",
            ],
            &narrator.0,
        );
    }
    // Drop any open menu.
    controller.reset();
    gates.pause_all();
    phase_commands.write(PhaseCommand::Set(Phase::Listen));
}

/// Once the closing lines have been read, head back to the lobby.
pub fn leave_finished_fight(
    game_state: Res<GameState>,
    mut fight: ResMut<FightState>,
    controller: Res<PhaseController>,
    mut next_scene: ResMut<NextScene>,
) {
    if game_state.0 != Scene_Kind::GhostFight || !fight.over {
        return;
    }
    if controller.current() == Phase::Listen {
        fight.farewell_shown = true;
    } else if fight.farewell_shown && controller.is_idle() {
        next_scene.0 = Some(Scene_Kind::Lobby);
    }
}

/// -----------------------------
/// App Setup
/// -----------------------------
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FightState>()
            .add_message::<VitalEvent>()
            .add_message::<SceneEntered>()
            .add_systems(Update, spawn_fight.in_set(TurnSet::Select))
            .add_systems(
                Update,
                (
                    run_enemy_ai,
                    resolve_casts,
                    apply_vital_events,
                    stop_downed_casts,
                    check_fight_outcome,
                    leave_finished_fight,
                )
                    .chain()
                    .in_set(TurnSet::Resolve),
            );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::time::TimeUpdateStrategy;

    use super::*;
    use crate::abilities::FIGHT;
    use crate::accept::AcceptPrompt;
    use crate::combat_ability::ScriptedDice;
    use crate::phase::PhasePlugin;
    use approx::assert_relative_eq;

    fn combat_app(rolls: impl IntoIterator<Item = u32>) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_plugins((PhasePlugin, CombatPlugin))
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)))
            .init_resource::<ButtonInput<KeyCode>>()
            .init_resource::<ButtonInput<MouseButton>>()
            .init_resource::<CombatLog>()
            .init_resource::<AcceptPrompt>()
            .init_resource::<SaveState>()
            .init_resource::<Narrator>()
            .init_resource::<NextScene>()
            .init_resource::<CardMenu>()
            .insert_resource(GameState(Scene_Kind::GhostFight))
            .insert_resource(DiceBox::new(ScriptedDice::new(rolls)))
            .add_message::<Cue>();
        app
    }

    fn spawn(app: &mut App, character: Character, side: Side) -> Entity {
        app.world_mut()
            .spawn((character, side, Selection::default(), CastBar::default()))
            .id()
    }

    fn hp(app: &App, entity: Entity) -> f32 {
        app.world()
            .get::<Character>(entity)
            .map_or(f32::NAN, |character| character.stats.hp)
    }

    #[test]
    fn cast_fires_once_and_clears_the_selection() {
        let mut app = combat_app([4]);
        let you = spawn(&mut app, you(), Side::Party);
        let ghost = spawn(&mut app, blood_mouthed_ghost(), Side::Enemy);
        {
            let mut entity = app.world_mut().entity_mut(you);
            if let Some(mut selection) = entity.get_mut::<Selection>() {
                selection.choose(Action::Ability(&FIGHT), Phase::CardSelect);
                selection.enemies.push(ghost);
            }
            if let Some(mut bar) = entity.get_mut::<CastBar>() {
                bar.start(0.25);
            }
        }
        for _ in 0..10 {
            app.update();
        }
        // 4 + 1 + 12.5 - 5, rounded
        assert_relative_eq!(hp(&app, ghost), 287.0);
        let selection = app.world().get::<Selection>(you);
        assert!(selection.is_some_and(|s| s.action.is_none() && s.enemies.is_empty()));
        assert!(app.world().get::<CastBar>(you).is_some_and(|bar| !bar.casting));
    }

    #[test]
    fn downed_character_stops_casting() {
        let mut app = combat_app([]);
        let mut fallen = you();
        fallen.stats.hp = 0.0;
        let you = spawn(&mut app, fallen, Side::Party);
        spawn(&mut app, blood_mouthed_ghost(), Side::Enemy);
        {
            let mut entity = app.world_mut().entity_mut(you);
            if let Some(mut selection) = entity.get_mut::<Selection>() {
                selection.choose(Action::Ability(&LOOK_AROUND), Phase::AbilitySelect);
            }
            if let Some(mut bar) = entity.get_mut::<CastBar>() {
                bar.start(0.15);
            }
        }
        app.update();
        app.update();
        assert!(app.world().get::<CastBar>(you).is_some_and(|bar| !bar.casting));
        assert_eq!(
            app.world().resource::<CombatLog>().lines().first().map(String::as_str),
            Some("You can't keep going!")
        );
    }

    #[test]
    fn enemy_attacks_after_its_wait() {
        let mut app = combat_app([]);
        let you = spawn(&mut app, you(), Side::Party);
        let ghost = spawn(&mut app, blood_mouthed_ghost(), Side::Enemy);
        app.world_mut()
            .entity_mut(ghost)
            .insert(EnemyAi::new(0.25, 0.25, &ENERGY_BLAST));

        app.update();
        app.update();
        assert!(app.world().get::<CastBar>(ghost).is_some_and(|bar| !bar.casting));
        for _ in 0..3 {
            app.update();
        }
        let selection = app.world().get::<Selection>(ghost);
        assert_eq!(selection.map(|s| s.enemies.clone()), Some(vec![you]));
        assert!(app.world().get::<CastBar>(ghost).is_some_and(|bar| bar.casting));

        for _ in 0..12 {
            app.update();
        }
        // 0 + 5 + 20 / 4
        assert_relative_eq!(hp(&app, you), 90.0);
    }

    #[test]
    fn enemy_wait_stays_in_range() {
        let ai = EnemyAi::new(4.0, 8.0, &ENERGY_BLAST);
        let mut dice = ScriptedDice::new([0, 2000, 99_999]);
        assert_relative_eq!(ai.next_wait(&mut dice), 4.0);
        assert_relative_eq!(ai.next_wait(&mut dice), 6.0);
        assert_relative_eq!(ai.next_wait(&mut dice), 8.0);
    }

    #[test]
    fn beating_the_ghost_ends_the_fight_after_the_last_lines() {
        let mut app = combat_app([]);
        spawn(&mut app, you(), Side::Party);
        let mut ghost = blood_mouthed_ghost();
        ghost.stats.hp = 0.0;
        spawn(&mut app, ghost, Side::Enemy);

        app.update();
        assert!(app.world().resource::<FightState>().won);
        app.update();
        assert_eq!(
            app.world().resource::<PhaseController>().current(),
            Phase::Listen
        );
        assert_eq!(app.world().resource::<NextScene>().0, None);

        app.world().resource::<CombatLog>().clear();
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::KeyJ);
        app.update();
        app.update();
        assert_eq!(
            app.world().resource::<NextScene>().0,
            Some(Scene_Kind::Lobby)
        );
    }

    #[test]
    fn entering_the_fight_spawns_the_recruited_party() {
        let mut app = combat_app([]);
        app.world_mut()
            .resource_mut::<SaveState>()
            .set(SaveFlags::RECRUITED_ME);
        app.world_mut()
            .resource_mut::<Messages<SceneEntered>>()
            .write(SceneEntered(Scene_Kind::GhostFight));
        app.update();

        let mut members: Vec<(usize, String)> = app
            .world_mut()
            .query::<(&PartyMember, &Character)>()
            .iter(app.world())
            .map(|(member, character)| (member.slot, character.name.clone()))
            .collect();
        members.sort();
        assert_eq!(members, vec![(0, "You".to_string()), (1, "Me".to_string())]);
        assert_eq!(
            app.world().resource::<CombatLog>().lines(),
            vec!["A Blood Mouthed Ghost   Appearerated!"]
        );
        assert_eq!(
            app.world().resource::<PhaseController>().current(),
            Phase::Listen
        );
    }
}
