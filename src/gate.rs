use std::collections::HashMap;

use bevy::prelude::*;

/// Every subsystem that consumes player input and can be paused by the phase controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    CombatLog,
    Movement,
    Doors,
    Interests,
    AcceptPrompt,
    CardSelect,
    AbilitySelect,
    ItemSelect,
    Target,
}

impl Collaborator {
    pub const ALL: [Collaborator; 9] = [
        Collaborator::CombatLog,
        Collaborator::Movement,
        Collaborator::Doors,
        Collaborator::Interests,
        Collaborator::AcceptPrompt,
        Collaborator::CardSelect,
        Collaborator::AbilitySelect,
        Collaborator::ItemSelect,
        Collaborator::Target,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub paused: bool,
    pub skip_next_frame: bool,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            paused: true,
            skip_next_frame: false,
        }
    }
}

/// What a collaborator should do this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTick {
    Paused,
    /// First frame after an unpause; input is stale and must be ignored.
    Opening,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    Unregistered(Collaborator),
}

/// Pause state of every registered input consumer.
///
/// A gate starts paused. Unpausing arms a one-frame skip so the button press that
/// caused the transition is not consumed a second time by the newly active subsystem.
#[derive(Resource, Default, Debug)]
pub struct InputGates {
    gates: HashMap<Collaborator, Gate>,
}

impl InputGates {
    pub fn register(&mut self, who: Collaborator) {
        self.gates.entry(who).or_default();
    }

    pub fn is_registered(&self, who: Collaborator) -> bool {
        self.gates.contains_key(&who)
    }

    pub fn registered(&self) -> impl Iterator<Item = Collaborator> + '_ {
        Collaborator::ALL
            .into_iter()
            .filter(|who| self.gates.contains_key(who))
    }

    pub fn pause(&mut self, who: Collaborator) -> Result<(), GateError> {
        let gate = self
            .gates
            .get_mut(&who)
            .ok_or(GateError::Unregistered(who))?;
        gate.paused = true;
        gate.skip_next_frame = false;
        Ok(())
    }

    pub fn unpause(&mut self, who: Collaborator) -> Result<(), GateError> {
        let gate = self
            .gates
            .get_mut(&who)
            .ok_or(GateError::Unregistered(who))?;
        gate.paused = false;
        gate.skip_next_frame = true;
        Ok(())
    }

    pub fn is_paused(&self, who: Collaborator) -> bool {
        self.gates.get(&who).map_or(true, |gate| gate.paused)
    }

    /// Advances `who` by one frame. Spends a pending skip frame.
    pub fn poll(&mut self, who: Collaborator) -> GateTick {
        let Some(gate) = self.gates.get_mut(&who) else {
            return GateTick::Paused;
        };
        if gate.paused {
            GateTick::Paused
        } else if gate.skip_next_frame {
            gate.skip_next_frame = false;
            GateTick::Opening
        } else {
            GateTick::Active
        }
    }

    /// Whether `who` may consume input this frame.
    pub fn ready(&mut self, who: Collaborator) -> bool {
        self.poll(who) == GateTick::Active
    }

    pub fn pause_all(&mut self) {
        for gate in self.gates.values_mut() {
            gate.paused = true;
            gate.skip_next_frame = false;
        }
    }

    pub fn active(&self) -> Vec<Collaborator> {
        self.registered()
            .filter(|who| !self.is_paused(*who))
            .collect()
    }
}
