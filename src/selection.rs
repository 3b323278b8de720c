use bevy::prelude::*;

use crate::abilities::{DEFEND, FIGHT};
use crate::character::{CastBar, Character, PartyMember, Selection};
use crate::combat_ability::Action;
use crate::combat_log::CombatLog;
use crate::constants::{EMPTY_ROW, MENU_ROWS};
use crate::controls::{Button, Controls};
use crate::core::Narrator;
use crate::gate::{Collaborator, GateTick, InputGates};
use crate::phase::{Phase, PhaseCommand, TurnSet};
use crate::target::begin_cast;

/// Cursor over a list shown `MENU_ROWS` entries at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuWindow {
    pub current: usize,
    pub top: usize,
    /// Window top the row labels were last drawn for.
    pub last_rendered: Option<usize>,
}

impl MenuWindow {
    pub fn reset(&mut self) {
        *self = MenuWindow::default();
    }

    /// Moves the cursor by `delta`, clamped to the list, scrolling the window
    /// only when the cursor leaves it.
    pub fn step(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.current = 0;
            self.top = 0;
            return;
        }
        self.current = self.current.saturating_add_signed(delta).min(len - 1);
        if self.current < self.top {
            self.top = self.current;
        } else if self.current > self.top + (MENU_ROWS - 1) {
            self.top = self.current - (MENU_ROWS - 1);
        }
    }

    /// Row of the cursor glyph within the visible window.
    pub fn cursor_row(&self) -> usize {
        self.current - self.top
    }

    pub fn needs_redraw(&self) -> bool {
        self.last_rendered != Some(self.top)
    }

    pub fn mark_rendered(&mut self) {
        self.last_rendered = Some(self.top);
    }

    /// Labels for the visible rows; rows past the end of the list show a placeholder.
    pub fn visible_rows<S: AsRef<str>>(&self, labels: &[S]) -> [String; MENU_ROWS] {
        std::array::from_fn(|row| {
            labels
                .get(self.top + row)
                .map_or_else(|| EMPTY_ROW.to_string(), |label| label.as_ref().to_string())
        })
    }
}

/// Card selection wraps around the party.
pub fn wrap_step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as isize + delta).rem_euclid(len as isize) as usize
}

/// Index of the highlighted party card.
#[derive(Resource, Debug, Default)]
pub struct CardMenu {
    pub current: usize,
}

#[derive(Resource, Debug, Default, Deref, DerefMut)]
pub struct AbilityMenu(pub MenuWindow);

#[derive(Resource, Debug, Default, Deref, DerefMut)]
pub struct ItemMenu(pub MenuWindow);

type PartyQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static PartyMember,
        &'static mut Character,
        &'static mut Selection,
        &'static mut CastBar,
    ),
>;

fn vertical(controls: &Controls) -> isize {
    if controls.just_pressed(Button::Up) {
        -1
    } else if controls.just_pressed(Button::Down) {
        1
    } else {
        0
    }
}

fn go_to(phase_commands: &mut MessageWriter<PhaseCommand>, phase: Phase) {
    phase_commands.write_batch([PhaseCommand::Set(phase), PhaseCommand::Dequeue]);
}

pub fn select_card(
    controls: Res<Controls>,
    mut gates: ResMut<InputGates>,
    mut card: ResMut<CardMenu>,
    mut party: PartyQuery,
    log: Res<CombatLog>,
    narrator: Res<Narrator>,
    mut phase_commands: MessageWriter<PhaseCommand>,
) {
    let size = party.iter().count();
    match gates.poll(Collaborator::CardSelect) {
        GateTick::Paused => return,
        GateTick::Opening => {
            card.current = card.current.min(size.saturating_sub(1));
            return;
        }
        GateTick::Active => {}
    }

    if controls.just_pressed(Button::Left) {
        card.current = wrap_step(card.current, -1, size);
    } else if controls.just_pressed(Button::Right) {
        card.current = wrap_step(card.current, 1, size);
    }

    let Some((_, mut character, mut selection, mut bar)) = party
        .iter_mut()
        .find(|(member, ..)| member.slot == card.current)
    else {
        return;
    };
    if bar.casting || character.stats.is_down() {
        return;
    }

    if controls.just_pressed(Button::A) {
        go_to(&mut phase_commands, Phase::AbilitySelect);
    } else if controls.just_pressed(Button::B) {
        go_to(&mut phase_commands, Phase::ItemSelect);
    } else if controls.just_pressed(Button::X) {
        selection.choose(Action::Ability(&FIGHT), Phase::CardSelect);
        go_to(&mut phase_commands, Phase::Target);
    } else if controls.just_pressed(Button::Y) {
        selection.choose(Action::Ability(&DEFEND), Phase::CardSelect);
        if !begin_cast(&mut character, &selection, &mut bar, &log, &narrator.0) {
            selection.clear();
        }
    }
}

pub fn select_ability(
    controls: Res<Controls>,
    mut gates: ResMut<InputGates>,
    mut menu: ResMut<AbilityMenu>,
    card: Res<CardMenu>,
    mut party: PartyQuery,
    mut phase_commands: MessageWriter<PhaseCommand>,
) {
    match gates.poll(Collaborator::AbilitySelect) {
        GateTick::Paused => return,
        GateTick::Opening => {
            menu.reset();
            return;
        }
        GateTick::Active => {}
    }
    let Some((_, character, mut selection, _)) = party
        .iter_mut()
        .find(|(member, ..)| member.slot == card.current)
    else {
        warn!("No party member in slot {}", card.current);
        go_to(&mut phase_commands, Phase::CardSelect);
        return;
    };

    let len = character.abilities.len();
    menu.step(vertical(&controls), len);

    if controls.just_pressed(Button::A) {
        match character.abilities.get(menu.current) {
            Some(&ability) => {
                selection.choose(Action::Ability(ability), Phase::AbilitySelect);
                go_to(&mut phase_commands, Phase::Target);
            }
            None => go_to(&mut phase_commands, Phase::CardSelect),
        }
    } else if controls.just_pressed(Button::B) {
        go_to(&mut phase_commands, Phase::CardSelect);
    }
}

pub fn select_item(
    controls: Res<Controls>,
    mut gates: ResMut<InputGates>,
    mut menu: ResMut<ItemMenu>,
    card: Res<CardMenu>,
    mut party: PartyQuery,
    mut phase_commands: MessageWriter<PhaseCommand>,
) {
    match gates.poll(Collaborator::ItemSelect) {
        GateTick::Paused => return,
        GateTick::Opening => {
            menu.reset();
            return;
        }
        GateTick::Active => {}
    }
    let Some((_, character, mut selection, _)) = party
        .iter_mut()
        .find(|(member, ..)| member.slot == card.current)
    else {
        warn!("No party member in slot {}", card.current);
        go_to(&mut phase_commands, Phase::CardSelect);
        return;
    };

    let len = character.inventory.len();
    menu.step(vertical(&controls), len);

    if controls.just_pressed(Button::A) {
        match character.inventory.get(menu.current) {
            Some(stack) => {
                selection.choose(Action::Item(stack.item), Phase::ItemSelect);
                go_to(&mut phase_commands, Phase::Target);
            }
            None => go_to(&mut phase_commands, Phase::CardSelect),
        }
    } else if controls.just_pressed(Button::B) {
        go_to(&mut phase_commands, Phase::CardSelect);
    }
}

fn register_menu_gates(mut gates: ResMut<InputGates>) {
    for who in [
        Collaborator::CardSelect,
        Collaborator::AbilitySelect,
        Collaborator::ItemSelect,
    ] {
        gates.register(who);
    }
}

pub struct SelectionPlugin;

impl Plugin for SelectionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CardMenu>()
            .init_resource::<AbilityMenu>()
            .init_resource::<ItemMenu>()
            .add_systems(Startup, register_menu_gates)
            .add_systems(
                Update,
                (select_card, select_ability, select_item).in_set(TurnSet::Select),
            );
    }
}
