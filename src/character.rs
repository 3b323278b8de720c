use bevy::prelude::*;

use crate::combat_ability::{Ability, AbilityId, Action, Item, ItemId};
use crate::constants::NEUTRAL_CAST_TIME;
use crate::phase::Phase;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Stats {
    pub hp: f32,
    pub max_hp: f32,
    pub mp: f32,
    pub max_mp: f32,
    pub strength: f32,
    pub defense: f32,
    pub dexterity: f32,
    pub intelligence: f32,
}

impl Stats {
    pub fn is_down(&self) -> bool {
        self.hp <= 0.0
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ItemStack {
    pub item: &'static Item,
    pub quantity: u32,
}

/// A combatant: stats plus the abilities and items it can currently choose from.
#[derive(Component, Clone, Debug)]
pub struct Character {
    pub name: String,
    pub stats: Stats,
    pub abilities: Vec<&'static Ability>,
    pub inventory: Vec<ItemStack>,
    pub defending: bool,
}

impl Character {
    pub fn new(name: impl Into<String>, stats: Stats) -> Self {
        Self {
            name: name.into(),
            stats,
            abilities: Vec::new(),
            inventory: Vec::new(),
            defending: false,
        }
    }

    pub fn has_ability(&self, id: AbilityId) -> bool {
        self.abilities.iter().any(|ability| ability.id == id)
    }

    /// Appends `ability` unless one with the same id is already known.
    pub fn add_ability(&mut self, ability: &'static Ability) {
        if !self.has_ability(ability.id) {
            self.abilities.push(ability);
        }
    }

    /// Removes the ability with `id`, keeping the order of the rest.
    pub fn remove_ability(&mut self, id: AbilityId) {
        if let Some(index) = self.abilities.iter().position(|ability| ability.id == id) {
            self.abilities.remove(index);
        }
    }

    pub fn item_count(&self, id: ItemId) -> u32 {
        self.inventory
            .iter()
            .find(|stack| stack.item.id == id)
            .map_or(0, |stack| stack.quantity)
    }

    pub fn add_item(&mut self, item: &'static Item, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.inventory.iter_mut().find(|stack| stack.item.id == item.id) {
            Some(stack) => stack.quantity += quantity,
            None => self.inventory.push(ItemStack { item, quantity }),
        }
    }

    /// Uses up one of `id`. Returns false when none is held.
    pub fn consume_item(&mut self, id: ItemId) -> bool {
        let Some(index) = self.inventory.iter().position(|stack| stack.item.id == id) else {
            return false;
        };
        let stack = &mut self.inventory[index];
        stack.quantity -= 1;
        if stack.quantity == 0 {
            self.inventory.remove(index);
        }
        true
    }

    /// Applies incoming damage, halved while defending. Returns the damage taken.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        let amount = if self.defending { amount / 2.0 } else { amount };
        self.stats.hp = (self.stats.hp - amount).max(0.0);
        amount
    }

    pub fn heal(&mut self, amount: f32) {
        self.stats.hp = (self.stats.hp + amount).min(self.stats.max_hp);
    }

    pub fn restore_mp(&mut self, amount: f32) {
        self.stats.mp = (self.stats.mp + amount).min(self.stats.max_mp);
    }
}

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Party,
    Enemy,
}

/// Position of a party member's card, left to right.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartyMember {
    pub slot: usize,
}

/// The queued action and its resolved targets, from the caster's point of view.
#[derive(Component, Clone, Debug, Default)]
pub struct Selection {
    pub action: Option<Action>,
    /// Menu phase the action was picked from; cancelling targeting returns there.
    pub origin: Phase,
    pub friends: Vec<Entity>,
    pub enemies: Vec<Entity>,
}

impl Selection {
    pub fn choose(&mut self, action: Action, origin: Phase) {
        self.action = Some(action);
        self.origin = origin;
        self.friends.clear();
        self.enemies.clear();
    }

    pub fn clear(&mut self) {
        self.action = None;
        self.friends.clear();
        self.enemies.clear();
    }
}

/// Cast progress toward the queued action.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct CastBar {
    pub current: f32,
    pub total: f32,
    pub casting: bool,
}

impl Default for CastBar {
    fn default() -> Self {
        Self {
            current: 0.0,
            total: NEUTRAL_CAST_TIME,
            casting: false,
        }
    }
}

impl CastBar {
    pub fn start(&mut self, total: f32) {
        self.current = 0.0;
        self.total = total;
        self.casting = true;
    }

    pub fn stop(&mut self) {
        *self = CastBar::default();
    }

    /// Accumulates `dt` while casting. Returns true on the frame the cast completes.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.casting {
            return false;
        }
        self.current += dt;
        if self.current < self.total {
            return false;
        }
        self.stop();
        true
    }

    pub fn fraction(&self) -> f32 {
        if self.total <= 0.0 {
            return 0.0;
        }
        (self.current / self.total).clamp(0.0, 1.0)
    }
}

/// Width of a bar showing `current` out of `max`.
pub fn bar_width(full: f32, current: f32, max: f32) -> f32 {
    if max <= 0.0 {
        return 0.0;
    }
    full * (current / max).clamp(0.0, 1.0)
}

/// Last hp / mp values drawn on a character's bars.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct BarMirror {
    pub hp: Option<f32>,
    pub mp: Option<f32>,
}

impl BarMirror {
    /// New hp and mp bar widths, only for values that changed since the last draw.
    pub fn sync(&mut self, stats: &Stats, full: f32) -> (Option<f32>, Option<f32>) {
        let mut hp_width = None;
        let mut mp_width = None;
        if self.hp != Some(stats.hp) {
            self.hp = Some(stats.hp);
            hp_width = Some(bar_width(full, stats.hp, stats.max_hp));
        }
        if self.mp != Some(stats.mp) {
            self.mp = Some(stats.mp);
            mp_width = Some(bar_width(full, stats.mp, stats.max_mp));
        }
        (hp_width, mp_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::{
        ASK_PIN, DISTRACT_AND_DODGE, FIGHT, GUESS_PIN, INPUT_PIN, LOOK_AROUND, SEARCH_SAFE,
    };
    use crate::items::{BANDAGE, SPORTS_DRINK};
    use approx::assert_relative_eq;

    fn ids(character: &Character) -> Vec<AbilityId> {
        character.abilities.iter().map(|ability| ability.id).collect()
    }

    #[test]
    fn add_ability_is_idempotent() {
        let mut you = Character::new("You", Stats::default());
        you.add_ability(&FIGHT);
        you.add_ability(&LOOK_AROUND);
        you.add_ability(&FIGHT);
        assert_eq!(ids(&you), vec![AbilityId::Fight, AbilityId::LookAround]);
    }

    #[test]
    fn remove_missing_ability_changes_nothing() {
        let mut you = Character::new("You", Stats::default());
        you.add_ability(&FIGHT);
        you.add_ability(&LOOK_AROUND);
        you.remove_ability(AbilityId::InputPin);
        assert_eq!(ids(&you), vec![AbilityId::Fight, AbilityId::LookAround]);
    }

    #[test]
    fn remove_keeps_relative_order() {
        let mut you = Character::new("You", Stats::default());
        for ability in [&SEARCH_SAFE, &GUESS_PIN, &ASK_PIN, &INPUT_PIN, &DISTRACT_AND_DODGE] {
            you.add_ability(ability);
        }
        you.remove_ability(AbilityId::AskPin);
        assert_eq!(
            ids(&you),
            vec![
                AbilityId::SearchSafe,
                AbilityId::GuessPin,
                AbilityId::InputPin,
                AbilityId::DistractAndDodge
            ]
        );
    }

    #[test]
    fn items_stack_by_id() {
        let mut you = Character::new("You", Stats::default());
        you.add_item(&BANDAGE, 2);
        you.add_item(&SPORTS_DRINK, 1);
        you.add_item(&BANDAGE, 1);
        you.add_item(&SPORTS_DRINK, 0);
        assert_eq!(you.inventory.len(), 2);
        assert_eq!(you.item_count(ItemId::Bandage), 3);

        assert!(you.consume_item(ItemId::SportsDrink));
        assert_eq!(you.inventory.len(), 1);
        assert!(!you.consume_item(ItemId::SportsDrink));
    }

    #[test]
    fn cast_bar_fires_exactly_once() {
        let mut bar = CastBar::default();
        bar.start(1.15);
        let fired: usize = [0.5, 0.5, 0.5, 0.5].iter().filter(|dt| bar.tick(**dt)).count();
        assert_eq!(fired, 1);
        assert!(!bar.casting);
        assert_relative_eq!(bar.current, 0.0);
        assert_relative_eq!(bar.total, NEUTRAL_CAST_TIME);
    }

    #[test]
    fn idle_cast_bar_does_not_accumulate() {
        let mut bar = CastBar::default();
        assert!(!bar.tick(5.0));
        assert_relative_eq!(bar.current, 0.0);
    }

    #[test]
    fn bar_mirror_only_reports_changes() {
        let mut mirror = BarMirror::default();
        let mut stats = Stats {
            hp: 50.0,
            max_hp: 100.0,
            mp: 100.0,
            max_mp: 100.0,
            ..Stats::default()
        };
        let (hp, mp) = mirror.sync(&stats, 83.0);
        assert_relative_eq!(hp.unwrap(), 41.5);
        assert_relative_eq!(mp.unwrap(), 83.0);
        assert_eq!(mirror.sync(&stats, 83.0), (None, None));

        stats.mp = 0.0;
        assert_eq!(mirror.sync(&stats, 83.0), (None, Some(0.0)));
    }

    #[test]
    fn defending_halves_damage() {
        let mut you = Character::new(
            "You",
            Stats {
                hp: 100.0,
                max_hp: 100.0,
                ..Stats::default()
            },
        );
        you.defending = true;
        assert_relative_eq!(you.take_damage(30.0), 15.0);
        assert_relative_eq!(you.stats.hp, 85.0);
        you.heal(50.0);
        assert_relative_eq!(you.stats.hp, 100.0);
    }
}
