use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use bevy::prelude::*;

use crate::accept::AcceptPrompt;
use crate::combat_ability::DiceBox;
use crate::combat_log::CombatLog;
use crate::controls::{read_controls, Button, Controls};
use crate::core::{Narrator, NextScene};
use crate::gate::{Collaborator, InputGates};
use crate::interest::{Cue, InteractionContext};
use crate::save::SaveState;

/// The single input-handling mode active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Beginning,
    Listen,
    Walk,
    LogClear,
    Accept,
    CardSelect,
    AbilitySelect,
    ItemSelect,
    Target,
}

impl Phase {
    /// Collaborators that read input while this phase is current.
    pub fn collaborators(self) -> &'static [Collaborator] {
        match self {
            Phase::Beginning | Phase::LogClear => &[],
            Phase::Listen | Phase::Accept => &[Collaborator::CombatLog],
            Phase::Walk => &[
                Collaborator::Movement,
                Collaborator::Doors,
                Collaborator::Interests,
            ],
            Phase::CardSelect => &[Collaborator::CombatLog, Collaborator::CardSelect],
            Phase::AbilitySelect => &[Collaborator::CombatLog, Collaborator::AbilitySelect],
            Phase::ItemSelect => &[Collaborator::CombatLog, Collaborator::ItemSelect],
            Phase::Target => &[Collaborator::CombatLog, Collaborator::Target],
        }
    }
}

/// Callback run when the player answers "yes" to an accept prompt.
pub type AcceptAction = Box<dyn FnOnce(&mut InteractionContext) + Send + Sync>;

/// Commands consumed by the phase controller, in the order they were written.
#[derive(Message)]
pub enum PhaseCommand {
    /// Make `Phase` pending if the controller is idle, otherwise queue it.
    Set(Phase),
    /// Pop the next queued phase into pending, or fall back to `Beginning`.
    Dequeue,
    /// Register the callback for the next accept prompt.
    OnAccept(AcceptAction),
}

impl fmt::Debug for PhaseCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseCommand::Set(phase) => f.debug_tuple("Set").field(phase).finish(),
            PhaseCommand::Dequeue => f.write_str("Dequeue"),
            PhaseCommand::OnAccept(_) => f.write_str("OnAccept(..)"),
        }
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TurnSet {
    Input,
    Select,
    Phase,
    Resolve,
    Present,
}

#[derive(Default)]
struct PhaseQueue {
    pending: Phase,
    queue: VecDeque<Phase>,
}

#[derive(Resource, Default)]
pub struct PhaseController {
    current: Phase,
    queue: Mutex<PhaseQueue>,
    accept: Option<AcceptAction>,
    accept_log_wait: bool,
    warned: HashSet<Collaborator>,
}

impl PhaseController {
    fn queue(&self) -> Option<MutexGuard<'_, PhaseQueue>> {
        match self.queue.lock() {
            Ok(guard) => Some(guard),
            Err(err) => {
                warn!("Phase queue lock poisoned: {err}");
                None
            }
        }
    }

    pub fn current(&self) -> Phase {
        self.current
    }

    pub fn pending(&self) -> Phase {
        self.queue().map_or(self.current, |q| q.pending)
    }

    pub fn queued(&self) -> Vec<Phase> {
        self.queue()
            .map(|q| q.queue.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Nothing current and nothing pending: the next `Set` applies immediately.
    pub fn is_idle(&self) -> bool {
        self.current == Phase::Beginning && self.pending() == Phase::Beginning
    }

    pub fn has_accept_action(&self) -> bool {
        self.accept.is_some()
    }

    pub fn set_phase(&self, phase: Phase) {
        let current = self.current;
        let Some(mut q) = self.queue() else {
            return;
        };
        if current == Phase::Beginning && q.pending == Phase::Beginning {
            q.pending = phase;
        } else {
            q.queue.push_back(phase);
        }
    }

    pub fn dequeue(&self) {
        let Some(mut q) = self.queue() else {
            return;
        };
        q.pending = q.queue.pop_front().unwrap_or_default();
    }

    pub fn apply(&mut self, command: PhaseCommand) {
        match command {
            PhaseCommand::Set(phase) => self.set_phase(phase),
            PhaseCommand::Dequeue => self.dequeue(),
            PhaseCommand::OnAccept(action) => self.accept = Some(action),
        }
    }

    /// Drops every queued phase and any registered accept callback.
    pub fn reset(&mut self) {
        self.current = Phase::Beginning;
        self.accept = None;
        self.accept_log_wait = false;
        if let Some(mut q) = self.queue() {
            *q = PhaseQueue::default();
        }
    }

    fn open_gate(&mut self, gates: &mut InputGates, who: Collaborator) {
        if let Err(err) = gates.unpause(who) {
            if self.warned.insert(who) {
                warn!("Cannot activate {who:?} for {:?}: {err:?}", self.current);
            }
        }
    }

    /// Moves to the pending phase if it differs from the current one.
    ///
    /// Every registered collaborator is paused before the new phase's own
    /// collaborators are activated. Returns whether a transition happened.
    pub fn transition(&mut self, gates: &mut InputGates, log: &CombatLog) -> bool {
        let pending = self.pending();
        if pending == self.current {
            return false;
        }
        debug!("Phase {:?} -> {:?}", self.current, pending);
        gates.pause_all();
        self.current = pending;
        for who in pending.collaborators() {
            self.open_gate(gates, *who);
        }
        match pending {
            Phase::LogClear => log.clear(),
            Phase::Accept => self.accept_log_wait = true,
            _ => {}
        }
        true
    }

    fn close_prompt(&mut self, gates: &mut InputGates) {
        if gates.is_registered(Collaborator::AcceptPrompt) {
            let _ = gates.pause(Collaborator::AcceptPrompt);
        }
        // A chained prompt keeps the phase at Accept; reopen once its text is typed.
        self.accept_log_wait = true;
    }
}

pub fn run_phase_controller(
    mut inbox: ResMut<Messages<PhaseCommand>>,
    mut controller: ResMut<PhaseController>,
    mut gates: ResMut<InputGates>,
    controls: Res<Controls>,
    log: Res<CombatLog>,
    mut prompt: ResMut<AcceptPrompt>,
    mut save: ResMut<SaveState>,
    mut dice: ResMut<DiceBox>,
    narrator: Res<Narrator>,
    mut cues: MessageWriter<Cue>,
    mut next_scene: ResMut<NextScene>,
) {
    for command in inbox.drain() {
        controller.apply(command);
    }

    // Input seen on the frame a phase starts belongs to the phase before it.
    let entered = controller.transition(&mut gates, &log);

    match controller.current() {
        Phase::Listen => {
            if !entered
                && log.is_done()
                && (controls.just_pressed(Button::A)
                    || controls.just_pressed(Button::B)
                    || controls.just_pressed(Button::X))
            {
                controller.dequeue();
            }
        }
        Phase::LogClear => controller.dequeue(),
        Phase::Accept => {
            if !log.is_done() {
                return;
            }
            if controller.accept_log_wait {
                controller.accept_log_wait = false;
                controller.open_gate(&mut gates, Collaborator::AcceptPrompt);
                prompt.open();
                return;
            }
            if entered {
                return;
            }
            if controls.just_pressed(Button::A) {
                let action = controller.accept.take();
                if let (true, Some(action)) = (prompt.yes_selected(), action) {
                    let mut ctx =
                        InteractionContext::new(&mut save, &log, narrator.0.clone(), dice.roller());
                    action(&mut ctx);
                    let outcome = ctx.finish();
                    for command in outcome.script {
                        controller.apply(command);
                    }
                    for cue in outcome.cues {
                        cues.write(cue);
                    }
                    if outcome.scene.is_some() {
                        next_scene.0 = outcome.scene;
                    }
                }
                controller.dequeue();
                controller.close_prompt(&mut gates);
            } else if controls.just_pressed(Button::B) {
                controller.accept = None;
                controller.dequeue();
                controller.close_prompt(&mut gates);
            }
        }
        _ => {}
    }
}

pub struct PhasePlugin;

impl Plugin for PhasePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PhaseController>()
            .init_resource::<InputGates>()
            .init_resource::<Controls>()
            .add_message::<PhaseCommand>()
            .configure_sets(
                Update,
                (
                    TurnSet::Input,
                    TurnSet::Select,
                    TurnSet::Phase,
                    TurnSet::Resolve,
                    TurnSet::Present,
                )
                    .chain(),
            )
            .add_systems(Update, read_controls.in_set(TurnSet::Input))
            .add_systems(Update, run_phase_controller.in_set(TurnSet::Phase));
    }
}
