use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use bevy::prelude::*;

use crate::config::GameConfig;
use crate::constants::LOG_ROWS;
use crate::controls::{Button, Controls};
use crate::core::Voice;
use crate::gate::{Collaborator, InputGates};
use crate::phase::TurnSet;

#[derive(Clone, Debug)]
pub struct LogLine {
    pub text: String,
    pub voice: Voice,
}

/// One of the visible log rows; row 0 is the line currently being typed.
#[derive(Clone, Debug, Default)]
pub struct LogRow {
    pub text: String,
    pub font: Handle<Font>,
}

#[derive(Default)]
struct LogState {
    /// Lines not yet fully shown. While `typing`, the front one is in row 0.
    lines: VecDeque<LogLine>,
    typing: bool,
    char_at: usize,
    elapsed: f32,
    rows: [LogRow; LOG_ROWS],
}

impl LogState {
    /// Row 0 now holds the whole line, so the buffer no longer needs it.
    fn finish_line(&mut self) {
        self.lines.pop_front();
        self.char_at = 0;
        self.elapsed = 0.0;
        self.typing = false;
    }
}

/// FIFO of dialogue lines, typed out letter by letter into three scrolling rows.
///
/// Any system may append through a shared reference; the buffer is behind a lock.
#[derive(Resource, Default)]
pub struct CombatLog {
    state: Mutex<LogState>,
}

/// Request to play a voice's click sound for a typed letter.
#[derive(Message, Debug, Clone)]
pub struct LogClick(pub Handle<AudioSource>);

#[derive(Component)]
pub struct LogClickSound;

impl CombatLog {
    fn state(&self) -> Option<MutexGuard<'_, LogState>> {
        match self.state.lock() {
            Ok(guard) => Some(guard),
            Err(err) => {
                warn!("Combat log lock poisoned: {err}");
                None
            }
        }
    }

    pub fn push(&self, text: impl Into<String>, voice: &Voice) {
        if let Some(mut state) = self.state() {
            state.lines.push_back(LogLine {
                text: text.into(),
                voice: voice.clone(),
            });
        }
    }

    pub fn push_all<I, S>(&self, lines: I, voice: &Voice)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(mut state) = self.state() {
            for text in lines {
                state.lines.push_back(LogLine {
                    text: text.into(),
                    voice: voice.clone(),
                });
            }
        }
    }

    /// True once every queued line has been fully displayed.
    pub fn is_done(&self) -> bool {
        self.state()
            .map_or(true, |state| !state.typing && state.lines.is_empty())
    }

    pub fn clear(&self) {
        if let Some(mut state) = self.state() {
            *state = LogState::default();
        }
    }

    /// Lines still waiting to be shown, including the one being typed.
    pub fn len(&self) -> usize {
        self.state().map_or(0, |state| state.lines.len())
    }

    pub fn lines(&self) -> Vec<String> {
        self.state().map_or_else(Vec::new, |state| {
            state.lines.iter().map(|line| line.text.clone()).collect()
        })
    }

    pub fn rows(&self) -> [LogRow; LOG_ROWS] {
        self.state()
            .map(|state| state.rows.clone())
            .unwrap_or_default()
    }

    /// Advances typing by `dt` seconds. Returns the click sound to play when a letter appears.
    pub fn tick(
        &self,
        dt: f32,
        skip: bool,
        line_delay: f32,
        letter_delay: f32,
    ) -> Option<Handle<AudioSource>> {
        let mut state = self.state()?;
        state.elapsed += dt;

        if !state.typing {
            if state.elapsed < line_delay {
                return None;
            }
            let font = state.lines.front()?.voice.font.clone();
            state.elapsed = 0.0;
            state.rows.rotate_right(1);
            state.rows[0] = LogRow {
                text: String::new(),
                font,
            };
            state.typing = true;
            state.char_at = 0;
            return None;
        }

        let Some(line) = state.lines.front().cloned() else {
            state.typing = false;
            return None;
        };
        let total = line.text.chars().count();
        let mut click = None;

        if state.elapsed > letter_delay {
            state.char_at += 1;
            state.rows[0].text = line.text.chars().take(state.char_at).collect();
            state.elapsed = 0.0;
            click = Some(line.voice.click.clone());
        }
        if skip {
            state.rows[0].text = line.text.clone();
            state.finish_line();
            return click;
        }
        if state.char_at >= total {
            state.finish_line();
        }
        click
    }
}

pub fn advance_combat_log(
    time: Res<Time>,
    config: Res<GameConfig>,
    controls: Res<Controls>,
    mut gates: ResMut<InputGates>,
    log: Res<CombatLog>,
    mut clicks: MessageWriter<LogClick>,
) {
    if !gates.ready(Collaborator::CombatLog) {
        return;
    }
    let skip = controls.just_pressed(Button::Y);
    if let Some(click) = log.tick(
        time.delta_secs(),
        skip,
        config.line_delay,
        config.letter_delay,
    ) {
        clicks.write(LogClick(click));
    }
}

/// Plays a click unless the previous one is still sounding.
fn play_log_clicks(
    mut commands: Commands,
    mut clicks: MessageReader<LogClick>,
    playing: Query<(), With<LogClickSound>>,
) {
    let Some(click) = clicks.read().last() else {
        return;
    };
    if !playing.is_empty() {
        return;
    }
    commands.spawn((
        AudioPlayer::new(click.0.clone()),
        PlaybackSettings::DESPAWN,
        LogClickSound,
    ));
}

pub struct CombatLogPlugin;

impl Plugin for CombatLogPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CombatLog>()
            .add_message::<LogClick>()
            .add_systems(Startup, register_log_gate)
            .add_systems(Update, advance_combat_log.in_set(TurnSet::Resolve))
            .add_systems(Update, play_log_clicks.in_set(TurnSet::Present));
    }
}

fn register_log_gate(mut gates: ResMut<InputGates>) {
    gates.register(Collaborator::CombatLog);
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: f32 = 0.3;
    const LETTER: f32 = 0.1;

    fn tick(log: &CombatLog, dt: f32) -> Option<Handle<AudioSource>> {
        log.tick(dt, false, LINE, LETTER)
    }

    #[test]
    fn empty_log_is_done() {
        let log = CombatLog::default();
        assert!(log.is_done());
        assert!(tick(&log, 1.0).is_none());
    }

    #[test]
    fn types_one_letter_per_delay() {
        let log = CombatLog::default();
        log.push("Boo", &Voice::default());
        assert!(!log.is_done());

        tick(&log, 0.31);
        assert_eq!(log.rows()[0].text, "");
        assert!(tick(&log, 0.11).is_some());
        assert_eq!(log.rows()[0].text, "B");
        tick(&log, 0.05);
        assert_eq!(log.rows()[0].text, "B");
        tick(&log, 0.06);
        assert_eq!(log.rows()[0].text, "Bo");
        assert!(!log.is_done());
        tick(&log, 0.11);
        assert_eq!(log.rows()[0].text, "Boo");
        assert!(log.is_done());
    }

    #[test]
    fn skip_completes_the_current_line() {
        let log = CombatLog::default();
        log.push("A long sentence", &Voice::default());
        tick(&log, 0.31);
        log.tick(0.0, true, LINE, LETTER);
        assert_eq!(log.rows()[0].text, "A long sentence");
        assert!(log.is_done());
    }

    #[test]
    fn rows_scroll_up_for_each_new_line() {
        let log = CombatLog::default();
        log.push_all(["one", "two", "three", "four"], &Voice::default());
        for _ in 0..4 {
            tick(&log, 0.31);
            log.tick(0.0, true, LINE, LETTER);
        }
        let rows = log.rows();
        assert_eq!(rows[0].text, "four");
        assert_eq!(rows[1].text, "three");
        assert_eq!(rows[2].text, "two");
        assert!(log.is_done());
    }

    #[test]
    fn waits_line_delay_before_next_line() {
        let log = CombatLog::default();
        log.push_all(["a", "b"], &Voice::default());
        tick(&log, 0.31);
        log.tick(0.0, true, LINE, LETTER);
        tick(&log, 0.1);
        assert_eq!(log.rows()[0].text, "a");
        assert!(!log.is_done());
        tick(&log, 0.25);
        assert_eq!(log.rows()[0].text, "");
        assert_eq!(log.rows()[1].text, "a");
    }

    #[test]
    fn clear_resets_everything() {
        let log = CombatLog::default();
        log.push("gone", &Voice::default());
        tick(&log, 0.31);
        log.clear();
        assert!(log.is_done());
        assert_eq!(log.len(), 0);
        assert_eq!(log.rows()[0].text, "");
    }

    #[test]
    fn shown_lines_leave_the_buffer() {
        let log = CombatLog::default();
        log.push_all(["one", "two", "three", "four", "five"], &Voice::default());
        tick(&log, 0.31);
        assert_eq!(log.len(), 5);
        log.tick(0.0, true, LINE, LETTER);
        assert_eq!(log.lines(), vec!["two", "three", "four", "five"]);
        for _ in 0..4 {
            tick(&log, 0.31);
            log.tick(0.0, true, LINE, LETTER);
        }
        assert_eq!(log.len(), 0);
        assert!(log.is_done());
        assert_eq!(log.rows()[0].text, "five");
        assert_eq!(log.rows()[2].text, "three");

        log.push("six", &Voice::default());
        assert!(!log.is_done());
        tick(&log, 0.31);
        log.tick(0.0, true, LINE, LETTER);
        assert_eq!(log.rows()[0].text, "six");
        assert_eq!(log.rows()[1].text, "five");
    }

    #[test]
    fn multibyte_text_is_typed_by_character() {
        let log = CombatLog::default();
        log.push("éé", &Voice::default());
        tick(&log, 0.31);
        tick(&log, 0.11);
        assert_eq!(log.rows()[0].text, "é");
    }
}
