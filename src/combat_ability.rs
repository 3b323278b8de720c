use bevy::prelude::*;
use rand::Rng;

use crate::character::{Character, Stats};
use crate::combat_log::CombatLog;
use crate::constants::{MIN_CAST_TIME, NEUTRAL_CAST_TIME};
use crate::core::Voice;
use crate::interest::Cue;
use crate::save::SaveState;

/// Who an ability or item may be aimed at, relative to its caster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetType {
    None,
    SingleEnemy,
    AllEnemies,
    SingleFriend,
    AllFriends,
    SingleAny,
    All,
}

impl TargetType {
    /// Whether the player picks one character rather than a whole group.
    pub fn is_single(self) -> bool {
        matches!(
            self,
            TargetType::SingleEnemy | TargetType::SingleFriend | TargetType::SingleAny
        )
    }
}

/// Stable identity of an ability template. Titles are display text only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AbilityId {
    Fight,
    Defend,
    LookAround,
    SearchSafe,
    AskPin,
    GuessPin,
    InputPin,
    DistractAndDodge,
    GrabFromSafe,
    LookAtWall,
    SearchMedKit,
    ScratchSaltLamp,
    EnergyBlast,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemId {
    Bandage,
    SportsDrink,
}

pub type CastTimeFn = fn(&Stats) -> f32;
pub type EffectFn = fn(&mut EffectContext);

pub struct Ability {
    pub id: AbilityId,
    pub title: &'static str,
    pub shorthand: &'static str,
    pub description: &'static str,
    pub mp_cost: f32,
    pub target: TargetType,
    pub cast_time: CastTimeFn,
    pub effect: EffectFn,
}

pub struct Item {
    pub id: ItemId,
    pub title: &'static str,
    pub description: &'static str,
    pub target: TargetType,
    pub cast_time: CastTimeFn,
    pub effect: EffectFn,
}

impl std::fmt::Debug for Ability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Ability").field(&self.id).finish()
    }
}

impl std::fmt::Debug for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Item").field(&self.id).finish()
    }
}

pub fn neutral_cast_time(_: &Stats) -> f32 {
    NEUTRAL_CAST_TIME
}

/// Faster hands swing sooner.
pub fn dexterity_cast_time(stats: &Stats) -> f32 {
    (1.5 - stats.dexterity / 100.0).max(MIN_CAST_TIME)
}

/// What a character has queued to do when its cast bar fills.
#[derive(Clone, Copy, Debug)]
pub enum Action {
    Ability(&'static Ability),
    Item(&'static Item),
}

impl Action {
    pub fn title(&self) -> &'static str {
        match self {
            Action::Ability(ability) => ability.title,
            Action::Item(item) => item.title,
        }
    }

    pub fn target(&self) -> TargetType {
        match self {
            Action::Ability(ability) => ability.target,
            Action::Item(item) => item.target,
        }
    }

    pub fn mp_cost(&self) -> f32 {
        match self {
            Action::Ability(ability) => ability.mp_cost,
            Action::Item(_) => 0.0,
        }
    }

    pub fn cast_time(&self, stats: &Stats) -> f32 {
        match self {
            Action::Ability(ability) => (ability.cast_time)(stats),
            Action::Item(item) => (item.cast_time)(stats),
        }
    }

    pub fn effect(&self) -> EffectFn {
        match self {
            Action::Ability(ability) => ability.effect,
            Action::Item(item) => item.effect,
        }
    }
}

/// Uniform integer draws used by effect functions and interactions.
pub trait Dice: Send + Sync {
    /// A value in `0..sides`.
    fn roll(&mut self, sides: u32) -> u32;
}

pub struct ThreadDice;

impl Dice for ThreadDice {
    fn roll(&mut self, sides: u32) -> u32 {
        rand::rng().random_range(0..sides.max(1))
    }
}

#[derive(Resource)]
pub struct DiceBox(Box<dyn Dice>);

impl Default for DiceBox {
    fn default() -> Self {
        Self(Box::new(ThreadDice))
    }
}

impl DiceBox {
    pub fn new(dice: impl Dice + 'static) -> Self {
        Self(Box::new(dice))
    }

    pub fn roller(&mut self) -> &mut dyn Dice {
        self.0.as_mut()
    }
}

/// Replays fixed rolls in order, then rolls zeros.
#[cfg(test)]
pub struct ScriptedDice {
    rolls: std::collections::VecDeque<u32>,
}

#[cfg(test)]
impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
        }
    }
}

#[cfg(test)]
impl Dice for ScriptedDice {
    fn roll(&mut self, sides: u32) -> u32 {
        self.rolls
            .pop_front()
            .unwrap_or(0)
            .min(sides.saturating_sub(1))
    }
}

/// Read-only view of a resolved target at the moment the effect fires.
#[derive(Clone, Debug)]
pub struct TargetView {
    pub entity: Entity,
    pub name: String,
    pub stats: Stats,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VitalChange {
    Damage { target: Entity, amount: f32 },
    Heal { target: Entity, amount: f32 },
    RestoreMp { target: Entity, amount: f32 },
}

#[derive(Debug, Default)]
pub struct EffectOutcome {
    pub changes: Vec<VitalChange>,
    pub cues: Vec<Cue>,
}

/// Everything an effect function may touch.
///
/// The caster is mutated in place; other characters are changed through
/// `VitalChange`s applied once the effect returns.
pub struct EffectContext<'a> {
    pub caster: &'a mut Character,
    pub caster_entity: Entity,
    pub friends: &'a [TargetView],
    pub enemies: &'a [TargetView],
    pub save: &'a mut SaveState,
    pub dice: &'a mut dyn Dice,
    log: &'a CombatLog,
    voice: Voice,
    outcome: EffectOutcome,
}

impl<'a> EffectContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        caster: &'a mut Character,
        caster_entity: Entity,
        friends: &'a [TargetView],
        enemies: &'a [TargetView],
        save: &'a mut SaveState,
        dice: &'a mut dyn Dice,
        log: &'a CombatLog,
        voice: Voice,
    ) -> Self {
        Self {
            caster,
            caster_entity,
            friends,
            enemies,
            save,
            dice,
            log,
            voice,
            outcome: EffectOutcome::default(),
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

    pub fn damage(&mut self, target: Entity, amount: f32) {
        self.outcome
            .changes
            .push(VitalChange::Damage { target, amount });
    }

    pub fn heal(&mut self, target: Entity, amount: f32) {
        self.outcome.changes.push(VitalChange::Heal { target, amount });
    }

    pub fn restore_mp(&mut self, target: Entity, amount: f32) {
        self.outcome
            .changes
            .push(VitalChange::RestoreMp { target, amount });
    }

    pub fn cue(&mut self, cue: Cue) {
        self.outcome.cues.push(cue);
    }

    pub fn finish(self) -> EffectOutcome {
        self.outcome
    }
}
