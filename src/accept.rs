use bevy::prelude::*;

use crate::controls::{Button, Controls};
use crate::gate::{Collaborator, InputGates};
use crate::phase::TurnSet;

/// Yes/no choice shown while the Accept phase waits for an answer.
#[derive(Resource, Debug, Clone, Copy)]
pub struct AcceptPrompt {
    yes: bool,
}

impl Default for AcceptPrompt {
    fn default() -> Self {
        Self { yes: true }
    }
}

impl AcceptPrompt {
    /// Every prompt opens with "yes" highlighted.
    pub fn open(&mut self) {
        self.yes = true;
    }

    pub fn toggle(&mut self) {
        self.yes = !self.yes;
    }

    pub fn yes_selected(&self) -> bool {
        self.yes
    }
}

pub fn navigate_accept_prompt(
    controls: Res<Controls>,
    mut gates: ResMut<InputGates>,
    mut prompt: ResMut<AcceptPrompt>,
) {
    if !gates.ready(Collaborator::AcceptPrompt) {
        return;
    }
    if controls.just_pressed(Button::Left) || controls.just_pressed(Button::Right) {
        prompt.toggle();
    }
}

fn register_accept_gate(mut gates: ResMut<InputGates>) {
    gates.register(Collaborator::AcceptPrompt);
}

pub struct AcceptPlugin;

impl Plugin for AcceptPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AcceptPrompt>()
            .add_systems(Startup, register_accept_gate)
            .add_systems(Update, navigate_accept_prompt.in_set(TurnSet::Select));
    }
}
