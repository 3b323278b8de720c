use bevy::prelude::*;

use crate::constants::SaveFlags;
use crate::controls::Button;
use crate::core::{Player, SceneEntered, SceneScoped, Scene_Kind};
use crate::interest::{
    player_hitbox, Cue, Door, Hitbox, Interest, InteractionContext, Prop, Velocity, Wall,
};
use crate::phase::{Phase, PhaseCommand, TurnSet};
use crate::save::{Key, SaveState};

pub const PLAYER_START: Vec2 = Vec2::new(0.0, -120.0);
pub const LAB_ORIGIN: Vec2 = Vec2::new(0.0, 500.0);
pub const OFFICE_ORIGIN: Vec2 = Vec2::new(0.0, 1000.0);
pub const SPACE_ORIGIN: Vec2 = Vec2::new(0.0, 1500.0);
const ROOM_SIZE: Vec2 = Vec2::new(640.0, 480.0);

pub const SAFE_PROP: &str = "safe";
/// Last frame of the safe's opening animation.
pub const SAFE_OPEN_FRAME: usize = 8;

pub const DIPLOMAS_PROP: &str = "diplomas";
pub const DIPLOMAS_EMPTY_FRAME: usize = 1;
pub const DIPLOMAS_GLINT_FRAME: usize = 2;
const DIPLOMAS_FRAMES: u32 = 4;

const CRASH_SOUND: &str = "president/crash.wav";

/// A horizontal strip of equally sized frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sheet {
    pub tile: UVec2,
    pub frames: u32,
    /// Frame shown when the sprite is first drawn.
    pub start: usize,
}

/// Image drawn for a lobby entity. Loaded by the HUD.
#[derive(Component, Debug, Clone, Copy)]
pub struct Art {
    pub path: &'static str,
    pub size: Vec2,
    pub sheet: Option<Sheet>,
}

impl Art {
    pub const fn still(path: &'static str, size: Vec2) -> Self {
        Self {
            path,
            size,
            sheet: None,
        }
    }
}

const LOOK_SCRIPT: [Phase; 3] = [Phase::Listen, Phase::LogClear, Phase::Walk];
const ASK_SCRIPT: [Phase; 3] = [Phase::Accept, Phase::LogClear, Phase::Walk];

fn inspect_mars(ctx: &mut InteractionContext) {
    ctx.save.mars_checks += 1;
    let lines: &[&str] = match ctx.save.mars_checks {
        0..=1 => &[
            "It's Mars!",
            "The grand prize for the winner of Marsbound",
            "Should I mount it on a trophy?",
            "Would that look too tacky for space?",
        ],
        2 => &[
            "It's still Mars!",
            "I didn't want it hung up so it wouldn't",
            "accidentally fall and break.",
        ],
        3 => &[
            "One little poke couldn't hurt",
            "...",
            "A piece fell off.",
            "Oops.",
        ],
        _ => &[
            "Not gonna touch it again.",
            "Planets are actually very expensive.",
            "Can't have pieces falling off all willy-nilly.",
        ],
    };
    ctx.say_all(lines.iter().copied());
    ctx.run_script(&LOOK_SCRIPT);
}

/// One random rummage through the nanite box.
fn rummage(ctx: &mut InteractionContext) -> &'static [&'static str] {
    match ctx.roll(11) {
        0 => &[
            "An Absorbant Module featuring Crumplezones!",
            "Wow!",
            "It adds several layers of defense!",
        ],
        1 => &[
            "Len!",
            "He's the starter nanite!",
            "He gives you laser-based abilities!",
        ],
        2 => &[
            "Kelvin!",
            "He's the cool nanite.",
            "Gives you ice-based abilities!",
        ],
        3 => &[
            "Prometheus!",
            "Such a hot-head!",
            "Gives fire-based abilities!",
        ],
        4 => &[
            "Gauss",
            "He's got a magnetic personality!",
            "Movement and speed based abilities",
        ],
        5 => &["Faraday", "A shocking guy", "Lightning-based abilities!"],
        6 => &[
            "a slime!",
            "After accidentally feeding it after midnight",
            "This guy grew until it nearly destroyed the city!",
        ],
        7 => &[
            "Parts to an auto-turret.",
            "These cuddly guys were made by Dr. Shockley",
            "To comfort his friends!",
            "(and shoot his enemies)",
        ],
        8 => &[
            "a Repo-tron 40k!",
            "This sophiscated 3D printer can print anything",
            "a rogue scientist might need!",
        ],
        _ if ctx.save.has(SaveFlags::HAS_PPE) => &[
            "There's some ISO-certified PPE here!",
            "But you've already got some!",
        ],
        _ => {
            ctx.save.set(SaveFlags::HAS_PPE);
            &[
                "It's a pair of nitrile gloves and goggles!",
                "Added PPE to your inventory!",
            ]
        }
    }
}

fn inspect_nanite_box(ctx: &mut InteractionContext) {
    ctx.save.nanite_box_checks += 1;
    let mut lines: Vec<&str> = Vec::new();
    match ctx.save.nanite_box_checks {
        0..=1 => lines.extend([
            "It's a box of nanites and mods!",
            "These little guys buff up and help out",
            "Rogue Scientists!",
        ]),
        2..=9 => {
            lines.push("It's");
            lines.extend(rummage(ctx));
        }
        10..=19 => lines.extend([
            "I've already looked through this box enough",
            "There couldn't possibly be anything left!",
        ]),
        20 => lines.extend([
            "Okay. Fine. I'll look through again.",
            "See? Nothing left.",
            "Except...wait a minute...",
            "It's a toad out on patrol!",
            "You exchange glances.",
            "It blushes before running into its toad-hole.",
        ]),
        _ => lines.extend([
            "The hole just sits there.",
            "Your friend is not coming back.",
            "Unless you take drastic measures",
            "Like leaving the lobby!",
        ]),
    }

    if ctx.save.has(SaveFlags::HAS_NANITE_KEY) {
        ctx.say_all(lines);
        ctx.run_script(&LOOK_SCRIPT);
        return;
    }
    lines.extend([
        "Hey, it looks like there's a key",
        "at the bottom of the box!",
        "Would you like to take it?",
    ]);
    ctx.say_all(lines);
    ctx.on_accept(|ctx| {
        ctx.save.set(SaveFlags::HAS_NANITE_KEY);
        ctx.say_all(["Obtained the Nanite Key!"]);
        ctx.continue_with(&LOOK_SCRIPT);
    });
    ctx.run_script(&ASK_SCRIPT);
}

fn key_slot(key: Key) -> &'static [&'static str] {
    match key {
        Key::Nanite => &[
            "This key slot glows with the power of nanites!",
            "Would you like to put the nanite key in the slot?",
        ],
        Key::Desk => &[
            "This key slot is oaken.",
            "Pretty strange for an electronic safe.",
            "Would you like to put the desk key in the slot?",
        ],
        Key::Hood => &[
            "This key slot looks lab grown.",
            "Would you like to put the lab key in the slot?",
        ],
        Key::Space => &[
            "This key slot is floating!!",
            "Would you like to put the space key in the slot?",
        ],
    }
}

fn key_inserted(key: Key) -> &'static [&'static str] {
    match key {
        Key::Nanite => &[
            "You put the nanite key in the safe.",
            "The safe hums with nanite energy.",
        ],
        Key::Desk => &[
            "You put the desk key in the oaken slot.",
            "The safe begins to photosynthesize.",
        ],
        Key::Hood => &[
            "You put the lab key in the safe.",
            "The safe begins to fizz and pop.",
            "Hope the chemicals on that key didn't ",
            "hurt anything.",
        ],
        Key::Space => &[
            "You put the space key in the safe.",
            "The safe appears much lighter.",
        ],
    }
}

fn insert_key(ctx: &mut InteractionContext, key: Key) {
    ctx.save.insert_key(key);
    let frame = ctx.save.key_count.min(Key::ALL.len() as u32) as usize;
    ctx.cue(Cue::Prop {
        name: SAFE_PROP,
        frame,
    });
    ctx.say_all(key_inserted(key).iter().copied());
    ctx.continue_with(&LOOK_SCRIPT);
}

fn open_safe(ctx: &mut InteractionContext) {
    ctx.save.set(SaveFlags::HAS_SPOOKY_BOARD | SaveFlags::IS_SAFE_OPEN);
    ctx.cue(Cue::Prop {
        name: SAFE_PROP,
        frame: SAFE_OPEN_FRAME,
    });
    ctx.say_all([
        "Inside the safe is...",
        "A board game?",
        "Looks like one of those boards for",
        "talking to spirits.",
        "Obtained the spooky board!",
    ]);
    ctx.continue_with(&LOOK_SCRIPT);
}

fn inspect_safe(ctx: &mut InteractionContext) {
    ctx.say_all(["It's a top-secret safe!"]);
    if ctx.save.has(SaveFlags::IS_SAFE_OPEN) {
        ctx.say_all(["...that's already open!"]);
        ctx.run_script(&LOOK_SCRIPT);
    } else if let Some(key) = ctx.save.next_key_to_insert() {
        ctx.say_all(key_slot(key).iter().copied());
        ctx.on_accept(move |ctx| insert_key(ctx, key));
        ctx.run_script(&ASK_SCRIPT);
    } else if ctx.save.all_keys_inserted() {
        ctx.say_all([
            "Oh, wow! Looks like you have collected",
            "All 4 keys!",
            "Great job!",
            "Open the safe?",
        ]);
        ctx.on_accept(open_safe);
        ctx.run_script(&ASK_SCRIPT);
    } else {
        ctx.say_all(["You don't have any more keys.", "Look around for more!"]);
        ctx.run_script(&LOOK_SCRIPT);
    }
}

fn pull_drawer(ctx: &mut InteractionContext) {
    // Needs an 8 or better.
    if ctx.roll(20) >= 7 {
        ctx.save.set(SaveFlags::IS_DRAWER_BROKEN);
        ctx.cue(Cue::Sound(CRASH_SOUND));
        ctx.cue(Cue::Prop {
            name: DIPLOMAS_PROP,
            frame: DIPLOMAS_GLINT_FRAME,
        });
        ctx.say_all(["You gently tug at the drawer handle", "...", "oops."]);
    } else {
        ctx.say_all([
            "You yank on the drawer",
            "with everything you can muster!",
            "... !!!",
            "... !!! ??? !!!",
            "... it won't budge!",
        ]);
    }
    ctx.continue_with(&LOOK_SCRIPT);
}

/// Something different turns up on the desk each time.
fn inspect_desk(ctx: &mut InteractionContext) {
    ctx.say_all(["It's an old oak desk."]);
    let broken = ctx.save.has(SaveFlags::IS_DRAWER_BROKEN);
    match ctx.roll(11) {
        1..=3 if broken => {
            ctx.say_all([
                "The drawer here is completely obliterated.",
                "Guess I don't know my own strength!",
            ]);
            ctx.run_script(&LOOK_SCRIPT);
        }
        1..=3 => {
            ctx.say_all([
                "There's a key still in one of the drawers.",
                "Want to try to open it?",
            ]);
            ctx.on_accept(pull_drawer);
            ctx.run_script(&ASK_SCRIPT);
        }
        5 | 6 | 10 if broken => {
            ctx.save.set(SaveFlags::HAS_DESK_KEY);
            ctx.say_all([
                "Looks like when the drawer broke",
                "It knocked a bunch of the papers away.",
                "Underneath them was a key!",
                "Obtained the Desk Key!",
            ]);
            ctx.run_script(&LOOK_SCRIPT);
        }
        5 | 6 | 10 => {
            ctx.say_all([
                "There's a bunch of papers, floppy discs,",
                "half-eaten food containers, and other",
                "debris strewn around the desk.",
            ]);
            ctx.run_script(&LOOK_SCRIPT);
        }
        7..=9 => {
            ctx.say_all([
                "There's a floppy disc on the desk labeled",
                "...haunted?",
                "Put it in the computer and try it?",
            ]);
            ctx.on_accept(|ctx| ctx.change_scene(Scene_Kind::GhostFight));
            ctx.run_script(&ASK_SCRIPT);
        }
        _ => {
            ctx.say_all([
                "There's no work being done on the laptop.",
                "Only a ton of unanswered emails, a ",
                "realllly long to-do list, ",
                "and a lot of weird puppet-based websites open.",
            ]);
            ctx.run_script(&LOOK_SCRIPT);
        }
    }
}

fn take_pointer(ctx: &mut InteractionContext) {
    ctx.save.set(SaveFlags::HAS_SPOOKY_BOARD_POINTER);
    ctx.cue(Cue::Prop {
        name: DIPLOMAS_PROP,
        frame: DIPLOMAS_EMPTY_FRAME,
    });
    ctx.say_all([
        "The light was glinting off of",
        "The pointer of a spooky board.",
        "You know.",
        "For talking to the dead.",
        "OoooooOOOOOoooo",
        "Found the spooky board pointer!",
    ]);
    ctx.continue_with(&LOOK_SCRIPT);
}

fn inspect_diplomas(ctx: &mut InteractionContext) {
    if !ctx.save.has(SaveFlags::IS_DRAWER_BROKEN) {
        ctx.say_all([
            "There's a bunch of diplomas on the wall",
            "just gathering dust.",
            "A PhD in WHAT?",
            "No WAY is that a thing.",
        ]);
        ctx.run_script(&LOOK_SCRIPT);
    } else if ctx.save.has(SaveFlags::HAS_SPOOKY_BOARD_POINTER) {
        ctx.say_all([
            "There's nothing else inside.",
            "The empty hole in the wall serves as a",
            "reminder of your brute strength.",
        ]);
        ctx.run_script(&LOOK_SCRIPT);
    } else {
        ctx.say_all([
            "The diplomas were disturbed when you",
            "flung the drawer handle through the wall.",
            "Geeze. This is a disaster.",
            "Wait a second...",
            "In the hole there.",
            "Look inside?",
        ]);
        ctx.on_accept(take_pointer);
        ctx.run_script(&ASK_SCRIPT);
    }
}

fn take_hood_key(ctx: &mut InteractionContext) {
    ctx.save.set(SaveFlags::HAS_HOOD_KEY);
    ctx.say_all([
        "Inside the hood is a key shaped mold.",
        "You dust the mold off. Now it's just a key!",
        "You obtained THE LAB KEY",
    ]);
    ctx.continue_with(&LOOK_SCRIPT);
}

fn inspect_hood(ctx: &mut InteractionContext) {
    ctx.say_all(["The hood is packed with dangerous chemicals!"]);
    if ctx.save.has(SaveFlags::HAS_PPE) {
        ctx.say_all([
            "But you have PPE!",
            "Would you like to put it on and look inside?",
        ]);
        ctx.on_accept(take_hood_key);
        ctx.run_script(&ASK_SCRIPT);
    } else {
        ctx.say_all(["It would be dangerous to open it without PPE."]);
        ctx.run_script(&LOOK_SCRIPT);
    }
}

fn greet_len(ctx: &mut InteractionContext) {
    ctx.say_all([
        "Hello!",
        "I am Len!",
        "A nanite that grants Rogue Scientists",
        "science-based powers!",
        "Can't wait to help you in-game!",
    ]);
    ctx.run_script(&LOOK_SCRIPT);
}

fn type_on_keyboard(ctx: &mut InteractionContext) {
    match ctx.roll(20) {
        0..=6 => {
            ctx.save.set(SaveFlags::HAS_SPACE_KEY);
            ctx.say_all([
                "You bash on the keyboard",
                "with all your might!",
                "That was fun!",
                "You never were good at typing.",
                "Oops.",
                "Looks like something broke.",
                "You just slip it in your pocket",
                "If they can't find the key,",
                "they won't know it's broken!",
                "You obtained the",
                "SPACE KEY",
            ]);
        }
        7..=9 => ctx.say_all([
            "You tap away at the keyboard.",
            "Nothing really special about it.",
            "Kinda boring.",
        ]),
        _ => {
            ctx.save.set(SaveFlags::HAS_SPACE_KEY);
            ctx.say_all([
                "You begin tapping away at the keyboard",
                "On the screen behind you, an intense",
                "game starts up. You get really into it.",
                "You lose track of time.",
                "After playing for what feels like days",
                "The keyboard gives out.",
                "The space key finally pops right out!",
                "You keep it as a momento of that epic game.",
                "You obtained the",
                "SPACE KEY",
            ]);
        }
    }
    ctx.continue_with(&LOOK_SCRIPT);
}

fn inspect_window(ctx: &mut InteractionContext) {
    ctx.say_all([
        "Outside you see glittering stars.",
        "Space is calling you!",
        "Apply for an internship at Blue Origin today!",
    ]);
    // Spotting the keyboard takes a 9 or better.
    if !ctx.save.has(SaveFlags::HAS_SPACE_KEY) && ctx.roll(20) >= 8 {
        ctx.say_all([
            "Wait a second.",
            "In the window there!",
            "It's a keyboard!",
            "Show off your",
            "SICK TYPING SKILLS?",
        ]);
        ctx.on_accept(type_on_keyboard);
        ctx.run_script(&ASK_SCRIPT);
    } else {
        ctx.run_script(&LOOK_SCRIPT);
    }
}

fn spawn_wall(commands: &mut Commands, center: Vec2, size: Vec2) {
    commands.spawn((
        Wall,
        Transform::from_translation(center.extend(0.0)),
        Hitbox::new(size),
        SceneScoped(Scene_Kind::Lobby),
    ));
}

/// Four walls enclosing a `size` room centered on `origin`.
fn spawn_room(commands: &mut Commands, origin: Vec2, size: Vec2, art: &'static str) {
    commands.spawn((
        Art::still(art, size),
        Transform::from_translation(origin.extend(-1.0)),
        SceneScoped(Scene_Kind::Lobby),
    ));
    let half = size / 2.0;
    let thickness = 32.0;
    for (offset, extent) in [
        (Vec2::new(0.0, half.y), Vec2::new(size.x, thickness)),
        (Vec2::new(0.0, -half.y), Vec2::new(size.x, thickness)),
        (Vec2::new(-half.x, 0.0), Vec2::new(thickness, size.y)),
        (Vec2::new(half.x, 0.0), Vec2::new(thickness, size.y)),
    ] {
        spawn_wall(commands, origin + offset, extent);
    }
}

fn spawn_door(commands: &mut Commands, at: Vec2, destination: Vec2, button: Button) {
    commands.spawn((
        Door::new(destination, button),
        Transform::from_translation(at.extend(0.5)),
        Hitbox::new(Vec2::new(64.0, 48.0)),
        SceneScoped(Scene_Kind::Lobby),
    ));
}

fn spawn_interest(
    commands: &mut Commands,
    interest: Interest,
    at: Vec2,
    art: Art,
    trigger: Vec2,
) -> Entity {
    commands
        .spawn((
            interest,
            art,
            Transform::from_translation(at.extend(0.5)),
            Hitbox::new(trigger),
            SceneScoped(Scene_Kind::Lobby),
        ))
        .id()
}

/// Frame the safe shows for the keys already in it.
pub fn safe_frame(save: &SaveState) -> usize {
    if save.has(SaveFlags::IS_SAFE_OPEN) {
        SAFE_OPEN_FRAME
    } else {
        save.key_count.min(Key::ALL.len() as u32) as usize
    }
}

pub fn diplomas_frame(save: &SaveState) -> usize {
    if save.has(SaveFlags::HAS_SPOOKY_BOARD_POINTER) {
        DIPLOMAS_EMPTY_FRAME
    } else if save.has(SaveFlags::IS_DRAWER_BROKEN) {
        DIPLOMAS_GLINT_FRAME
    } else {
        0
    }
}

/// A pair of doors: one in `from` leading to `to`, and one back.
fn link_rooms(commands: &mut Commands, from: (Vec2, Button), to: (Vec2, Button)) {
    // Arrivals land a little inside the door so they don't bounce straight back.
    let arrive = |door: Vec2, button: Button| match button {
        Button::Up => door - Vec2::new(0.0, 50.0),
        Button::Down => door + Vec2::new(0.0, 50.0),
        Button::Left => door + Vec2::new(50.0, 0.0),
        _ => door - Vec2::new(50.0, 0.0),
    };
    spawn_door(commands, from.0, arrive(to.0, to.1), from.1);
    spawn_door(commands, to.0, arrive(from.0, from.1), to.1);
}

/// Builds the lobby with the lab, the president's office and the space room
/// around it, then hands control to the player.
pub fn spawn_lobby(
    mut commands: Commands,
    mut entered: MessageReader<SceneEntered>,
    save: Res<SaveState>,
    mut phase_commands: MessageWriter<PhaseCommand>,
) {
    if !entered
        .read()
        .any(|scene| scene.0 == Scene_Kind::Lobby)
    {
        return;
    }

    let half = ROOM_SIZE / 2.0;
    spawn_room(&mut commands, Vec2::ZERO, ROOM_SIZE, "lobby/bg.png");
    spawn_room(&mut commands, LAB_ORIGIN, ROOM_SIZE, "lab/bg.png");
    spawn_room(&mut commands, OFFICE_ORIGIN, ROOM_SIZE, "president/bg.png");
    spawn_room(&mut commands, SPACE_ORIGIN, ROOM_SIZE, "space/bg.png");

    link_rooms(
        &mut commands,
        (Vec2::new(-half.x + 40.0, 0.0), Button::Left),
        (LAB_ORIGIN + Vec2::new(half.x - 40.0, 0.0), Button::Right),
    );
    link_rooms(
        &mut commands,
        (Vec2::new(0.0, half.y - 40.0), Button::Up),
        (OFFICE_ORIGIN + Vec2::new(0.0, -half.y + 40.0), Button::Down),
    );
    link_rooms(
        &mut commands,
        (Vec2::new(200.0, half.y - 40.0), Button::Up),
        (SPACE_ORIGIN + Vec2::new(0.0, -half.y + 40.0), Button::Down),
    );

    spawn_interest(
        &mut commands,
        Interest {
            name: "Mars",
            handler: inspect_mars,
        },
        Vec2::new(200.0, 0.0),
        Art::still("lobby/mars.png", Vec2::splat(64.0)),
        Vec2::new(80.0, 80.0),
    );
    spawn_interest(
        &mut commands,
        Interest {
            name: "nanite box",
            handler: inspect_nanite_box,
        },
        Vec2::new(-220.0, 100.0),
        Art::still("lobby/nanites.png", Vec2::new(76.0, 58.0)),
        Vec2::new(90.0, 70.0),
    );

    spawn_interest(
        &mut commands,
        Interest {
            name: "fume hood",
            handler: inspect_hood,
        },
        LAB_ORIGIN + Vec2::new(-180.0, 120.0),
        Art::still("lab/hood.png", Vec2::new(96.0, 96.0)),
        Vec2::new(110.0, 110.0),
    );
    spawn_interest(
        &mut commands,
        Interest {
            name: "Len",
            handler: greet_len,
        },
        LAB_ORIGIN + Vec2::new(120.0, 100.0),
        Art {
            path: "lab/lenSS.png",
            size: Vec2::new(64.0, 128.0),
            sheet: Some(Sheet {
                tile: UVec2::new(32, 64),
                frames: 3,
                start: 0,
            }),
        },
        Vec2::new(80.0, 140.0),
    );

    let safe = spawn_interest(
        &mut commands,
        Interest {
            name: "safe",
            handler: inspect_safe,
        },
        OFFICE_ORIGIN + Vec2::new(-200.0, 120.0),
        Art {
            path: "president/safeSS.png",
            size: Vec2::splat(60.0),
            sheet: Some(Sheet {
                tile: UVec2::splat(20),
                frames: SAFE_OPEN_FRAME as u32 + 1,
                start: safe_frame(&save),
            }),
        },
        Vec2::new(80.0, 80.0),
    );
    commands.entity(safe).insert(Prop(SAFE_PROP));
    let diplomas = spawn_interest(
        &mut commands,
        Interest {
            name: "diplomas",
            handler: inspect_diplomas,
        },
        OFFICE_ORIGIN + Vec2::new(40.0, 160.0),
        Art {
            path: "president/diplomasSS.png",
            size: Vec2::splat(96.0),
            sheet: Some(Sheet {
                tile: UVec2::splat(64),
                frames: DIPLOMAS_FRAMES,
                start: diplomas_frame(&save),
            }),
        },
        Vec2::new(100.0, 80.0),
    );
    commands.entity(diplomas).insert(Prop(DIPLOMAS_PROP));
    spawn_interest(
        &mut commands,
        Interest {
            name: "desk",
            handler: inspect_desk,
        },
        OFFICE_ORIGIN + Vec2::new(170.0, 60.0),
        Art::still("president/desk.png", Vec2::new(180.0, 60.0)),
        Vec2::new(200.0, 90.0),
    );

    spawn_interest(
        &mut commands,
        Interest {
            name: "window",
            handler: inspect_window,
        },
        SPACE_ORIGIN + Vec2::new(0.0, 150.0),
        Art::still("space/window.png", Vec2::new(300.0, 120.0)),
        Vec2::new(300.0, 90.0),
    );

    let start = save.player_location.unwrap_or(PLAYER_START);
    commands.spawn((
        Player,
        Art::still("player.png", Vec2::splat(32.0)),
        Transform::from_translation(start.extend(1.0)),
        Velocity::default(),
        player_hitbox(),
        SceneScoped(Scene_Kind::Lobby),
    ));

    info!("Lobby ready, player at {start}");
    phase_commands.write(PhaseCommand::Set(Phase::Walk));
}

pub struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<SceneEntered>()
            .add_systems(Update, spawn_lobby.in_set(TurnSet::Select));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat_ability::ScriptedDice;
    use crate::combat_log::CombatLog;
    use crate::core::Voice;
    use crate::interest::{InteractionOutcome, InterestHandler};
    use crate::phase::{AcceptAction, PhaseController, PhasePlugin};

    struct Visit {
        lines: Vec<String>,
        outcome: InteractionOutcome,
    }

    impl Visit {
        fn script(&self) -> Vec<String> {
            self.outcome
                .script
                .iter()
                .map(|command| format!("{command:?}"))
                .collect()
        }

        fn take_accept(&mut self) -> Option<AcceptAction> {
            let index = self
                .outcome
                .script
                .iter()
                .position(|command| matches!(command, PhaseCommand::OnAccept(_)))?;
            match self.outcome.script.remove(index) {
                PhaseCommand::OnAccept(action) => Some(action),
                _ => None,
            }
        }
    }

    fn visit(handler: InterestHandler, save: &mut SaveState, rolls: &[u32]) -> Visit {
        let log = CombatLog::default();
        let mut dice = ScriptedDice::new(rolls.iter().copied());
        let mut ctx = InteractionContext::new(save, &log, Voice::default(), &mut dice);
        handler(&mut ctx);
        let outcome = ctx.finish();
        Visit {
            lines: log.lines(),
            outcome,
        }
    }

    fn answer_yes(action: AcceptAction, save: &mut SaveState) -> Visit {
        answer_yes_rolling(action, save, &[])
    }

    fn answer_yes_rolling(action: AcceptAction, save: &mut SaveState, rolls: &[u32]) -> Visit {
        let log = CombatLog::default();
        let mut dice = ScriptedDice::new(rolls.iter().copied());
        let mut ctx = InteractionContext::new(save, &log, Voice::default(), &mut dice);
        action(&mut ctx);
        let outcome = ctx.finish();
        Visit {
            lines: log.lines(),
            outcome,
        }
    }

    #[test]
    fn mars_text_changes_with_each_look() {
        let mut save = SaveState::default();
        let first = visit(inspect_mars, &mut save, &[]);
        assert_eq!(first.lines[0], "It's Mars!");
        assert_eq!(
            first.script(),
            vec!["Set(Listen)", "Set(LogClear)", "Set(Walk)", "Dequeue"]
        );
        assert_eq!(visit(inspect_mars, &mut save, &[]).lines[0], "It's still Mars!");
        assert_eq!(visit(inspect_mars, &mut save, &[]).lines[2], "A piece fell off.");
        for _ in 0..3 {
            let again = visit(inspect_mars, &mut save, &[]);
            assert_eq!(again.lines[0], "Not gonna touch it again.");
        }
        assert_eq!(save.mars_checks, 6);
    }

    #[test]
    fn nanite_box_offers_the_key_until_taken() {
        let mut save = SaveState::default();
        let mut first = visit(inspect_nanite_box, &mut save, &[]);
        assert_eq!(first.lines.last().map(String::as_str), Some("Would you like to take it?"));
        let accept = first.take_accept();
        assert_eq!(
            first.script(),
            vec!["Set(Accept)", "Set(LogClear)", "Set(Walk)", "Dequeue"]
        );

        let taken = answer_yes(accept.unwrap(), &mut save);
        assert!(save.has(SaveFlags::HAS_NANITE_KEY));
        assert_eq!(taken.lines, vec!["Obtained the Nanite Key!"]);

        let mut second = visit(inspect_nanite_box, &mut save, &[1]);
        assert_eq!(
            second.lines,
            vec![
                "It's",
                "Len!",
                "He's the starter nanite!",
                "He gives you laser-based abilities!"
            ]
        );
        assert!(second.take_accept().is_none());
    }

    #[test]
    fn nanite_box_hands_out_ppe_once() {
        let mut save = SaveState {
            nanite_box_checks: 3,
            ..default()
        };
        save.set(SaveFlags::HAS_NANITE_KEY);
        let found = visit(inspect_nanite_box, &mut save, &[9]);
        assert_eq!(found.lines[2], "Added PPE to your inventory!");
        assert!(save.has(SaveFlags::HAS_PPE));
        let again = visit(inspect_nanite_box, &mut save, &[10]);
        assert_eq!(again.lines[2], "But you've already got some!");
    }

    #[test]
    fn nanite_box_runs_dry_then_finds_a_toad() {
        let mut save = SaveState {
            nanite_box_checks: 15,
            ..default()
        };
        save.set(SaveFlags::HAS_NANITE_KEY);
        let dry = visit(inspect_nanite_box, &mut save, &[]);
        assert_eq!(dry.lines[0], "I've already looked through this box enough");
        save.nanite_box_checks = 19;
        let toad = visit(inspect_nanite_box, &mut save, &[]);
        assert_eq!(toad.lines[3], "It's a toad out on patrol!");
    }

    #[test]
    fn safe_without_keys_sends_you_looking() {
        let mut save = SaveState::default();
        let mut visit = visit(inspect_safe, &mut save, &[]);
        assert_eq!(
            visit.lines,
            vec![
                "It's a top-secret safe!",
                "You don't have any more keys.",
                "Look around for more!"
            ]
        );
        assert!(visit.take_accept().is_none());
    }

    #[test]
    fn safe_takes_keys_one_at_a_time() {
        let mut save = SaveState::default();
        save.set(SaveFlags::HAS_NANITE_KEY | SaveFlags::HAS_HOOD_KEY);

        let mut first = visit(inspect_safe, &mut save, &[]);
        assert_eq!(first.lines[1], "This key slot glows with the power of nanites!");
        let inserted = answer_yes(first.take_accept().unwrap(), &mut save);
        assert_eq!(save.key_count, 1);
        assert!(save.has(SaveFlags::NANITE_KEY_IN_SAFE));
        assert_eq!(
            inserted.outcome.cues,
            vec![Cue::Prop {
                name: SAFE_PROP,
                frame: 1
            }]
        );
        assert_eq!(
            inserted.script(),
            vec!["Dequeue", "Set(Listen)", "Set(LogClear)", "Set(Walk)", "Dequeue"]
        );

        let mut second = visit(inspect_safe, &mut save, &[]);
        assert_eq!(second.lines[1], "This key slot looks lab grown.");
        answer_yes(second.take_accept().unwrap(), &mut save);
        assert_eq!(save.key_count, 2);
        assert_eq!(save.next_key_to_insert(), None);
    }

    #[test]
    fn all_four_keys_open_the_safe() {
        let mut save = SaveState::default();
        for key in Key::ALL {
            save.set(key.held_flag());
            save.insert_key(key);
        }
        let mut ask = visit(inspect_safe, &mut save, &[]);
        assert_eq!(ask.lines[2], "All 4 keys!");
        let opened = answer_yes(ask.take_accept().unwrap(), &mut save);
        assert!(save.has(SaveFlags::IS_SAFE_OPEN | SaveFlags::HAS_SPOOKY_BOARD));
        assert_eq!(opened.lines.last().map(String::as_str), Some("Obtained the spooky board!"));

        let after = visit(inspect_safe, &mut save, &[]);
        assert_eq!(after.lines[1], "...that's already open!");
    }

    #[test]
    fn floppy_starts_the_ghost_fight() {
        let mut save = SaveState::default();
        let mut ask = visit(inspect_desk, &mut save, &[7]);
        assert_eq!(ask.lines[2], "...haunted?");
        assert_eq!(ask.outcome.scene, None);
        let yes = answer_yes(ask.take_accept().unwrap(), &mut save);
        assert_eq!(yes.outcome.scene, Some(Scene_Kind::GhostFight));
    }

    #[test]
    fn desk_drawer_breaks_and_leaves_the_desk_key() {
        let mut save = SaveState::default();
        let debris = visit(inspect_desk, &mut save, &[5]);
        assert_eq!(debris.lines[1], "There's a bunch of papers, floppy discs,");
        assert!(!save.has(SaveFlags::HAS_DESK_KEY));

        let mut stuck = visit(inspect_desk, &mut save, &[2]);
        assert_eq!(stuck.lines.last().map(String::as_str), Some("Want to try to open it?"));
        let held = answer_yes_rolling(stuck.take_accept().unwrap(), &mut save, &[6]);
        assert_eq!(held.lines.last().map(String::as_str), Some("... it won't budge!"));
        assert!(!save.has(SaveFlags::IS_DRAWER_BROKEN));

        let mut again = visit(inspect_desk, &mut save, &[1]);
        let broke = answer_yes_rolling(again.take_accept().unwrap(), &mut save, &[7]);
        assert!(save.has(SaveFlags::IS_DRAWER_BROKEN));
        assert_eq!(
            broke.outcome.cues,
            vec![
                Cue::Sound(CRASH_SOUND),
                Cue::Prop {
                    name: DIPLOMAS_PROP,
                    frame: DIPLOMAS_GLINT_FRAME
                }
            ]
        );

        let wrecked = visit(inspect_desk, &mut save, &[3]);
        assert_eq!(wrecked.lines[1], "The drawer here is completely obliterated.");
        assert!(wrecked.outcome.script.iter().all(|c| !matches!(c, PhaseCommand::OnAccept(_))));

        let found = visit(inspect_desk, &mut save, &[10]);
        assert_eq!(found.lines.last().map(String::as_str), Some("Obtained the Desk Key!"));
        assert!(save.has(SaveFlags::HAS_DESK_KEY));
    }

    #[test]
    fn diplomas_hide_the_board_pointer_until_the_drawer_breaks() {
        let mut save = SaveState::default();
        let mut dusty = visit(inspect_diplomas, &mut save, &[]);
        assert_eq!(dusty.lines[2], "A PhD in WHAT?");
        assert!(dusty.take_accept().is_none());

        save.set(SaveFlags::IS_DRAWER_BROKEN);
        let mut hole = visit(inspect_diplomas, &mut save, &[]);
        assert_eq!(hole.lines.last().map(String::as_str), Some("Look inside?"));
        let found = answer_yes(hole.take_accept().unwrap(), &mut save);
        assert!(save.has(SaveFlags::HAS_SPOOKY_BOARD_POINTER));
        assert_eq!(
            found.outcome.cues,
            vec![Cue::Prop {
                name: DIPLOMAS_PROP,
                frame: DIPLOMAS_EMPTY_FRAME
            }]
        );

        let empty = visit(inspect_diplomas, &mut save, &[]);
        assert_eq!(empty.lines[0], "There's nothing else inside.");
    }

    #[test]
    fn fume_hood_needs_ppe_for_the_lab_key() {
        let mut save = SaveState::default();
        let mut unsafe_look = visit(inspect_hood, &mut save, &[]);
        assert_eq!(unsafe_look.lines[1], "It would be dangerous to open it without PPE.");
        assert!(unsafe_look.take_accept().is_none());

        save.set(SaveFlags::HAS_PPE);
        let mut suited = visit(inspect_hood, &mut save, &[]);
        let taken = answer_yes(suited.take_accept().unwrap(), &mut save);
        assert!(save.has(SaveFlags::HAS_HOOD_KEY));
        assert_eq!(taken.lines.last().map(String::as_str), Some("You obtained THE LAB KEY"));
    }

    #[test]
    fn window_keyboard_gives_up_the_space_key() {
        let mut save = SaveState::default();
        let mut missed = visit(inspect_window, &mut save, &[7]);
        assert_eq!(missed.lines.len(), 3);
        assert!(missed.take_accept().is_none());

        let mut boring = visit(inspect_window, &mut save, &[8]);
        let tapped = answer_yes_rolling(boring.take_accept().unwrap(), &mut save, &[8]);
        assert_eq!(tapped.lines[2], "Kinda boring.");
        assert!(!save.has(SaveFlags::HAS_SPACE_KEY));

        let mut epic = visit(inspect_window, &mut save, &[19]);
        let played = answer_yes_rolling(epic.take_accept().unwrap(), &mut save, &[15]);
        assert_eq!(played.lines.last().map(String::as_str), Some("SPACE KEY"));
        assert!(save.has(SaveFlags::HAS_SPACE_KEY));

        let mut done = visit(inspect_window, &mut save, &[19]);
        assert!(done.take_accept().is_none());
    }

    #[test]
    fn every_key_can_be_found_and_opens_the_safe() {
        let mut save = SaveState::default();

        let mut nanites = visit(inspect_nanite_box, &mut save, &[]);
        answer_yes(nanites.take_accept().unwrap(), &mut save);
        visit(inspect_nanite_box, &mut save, &[9]);
        assert!(save.has(SaveFlags::HAS_PPE));

        let mut hood = visit(inspect_hood, &mut save, &[]);
        answer_yes(hood.take_accept().unwrap(), &mut save);

        let mut drawer = visit(inspect_desk, &mut save, &[1]);
        answer_yes_rolling(drawer.take_accept().unwrap(), &mut save, &[19]);
        visit(inspect_desk, &mut save, &[6]);

        let mut window = visit(inspect_window, &mut save, &[10]);
        answer_yes_rolling(window.take_accept().unwrap(), &mut save, &[0]);

        for key in Key::ALL {
            assert!(save.has(key.held_flag()), "missing {key:?}");
        }
        for _ in Key::ALL {
            let mut slot = visit(inspect_safe, &mut save, &[]);
            answer_yes(slot.take_accept().unwrap(), &mut save);
        }
        assert!(save.all_keys_inserted());

        let mut ask = visit(inspect_safe, &mut save, &[]);
        assert_eq!(ask.lines[2], "All 4 keys!");
        answer_yes(ask.take_accept().unwrap(), &mut save);
        assert!(save.has(SaveFlags::IS_SAFE_OPEN | SaveFlags::HAS_SPOOKY_BOARD));
    }

    #[test]
    fn props_start_on_the_frame_for_saved_progress() {
        let mut save = SaveState::default();
        assert_eq!(safe_frame(&save), 0);
        assert_eq!(diplomas_frame(&save), 0);
        save.set(Key::Nanite.held_flag() | Key::Desk.held_flag());
        save.insert_key(Key::Nanite);
        save.insert_key(Key::Desk);
        save.set(SaveFlags::IS_DRAWER_BROKEN);
        assert_eq!(safe_frame(&save), 2);
        assert_eq!(diplomas_frame(&save), DIPLOMAS_GLINT_FRAME);
        save.set(SaveFlags::IS_SAFE_OPEN | SaveFlags::HAS_SPOOKY_BOARD_POINTER);
        assert_eq!(safe_frame(&save), SAFE_OPEN_FRAME);
        assert_eq!(diplomas_frame(&save), DIPLOMAS_EMPTY_FRAME);
    }

    fn lobby_app(save: SaveState) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_plugins((PhasePlugin, WorldPlugin))
            .init_resource::<ButtonInput<KeyCode>>()
            .init_resource::<ButtonInput<MouseButton>>()
            .init_resource::<CombatLog>()
            .init_resource::<crate::accept::AcceptPrompt>()
            .init_resource::<crate::core::Narrator>()
            .init_resource::<crate::core::NextScene>()
            .insert_resource(crate::combat_ability::DiceBox::new(ScriptedDice::new([])))
            .insert_resource(save)
            .add_message::<Cue>();
        app.world_mut()
            .resource_mut::<Messages<SceneEntered>>()
            .write(SceneEntered(Scene_Kind::Lobby));
        app
    }

    #[test]
    fn entering_the_lobby_spawns_it_and_starts_walking() {
        let mut app = lobby_app(SaveState::default());
        app.update();
        app.update();

        let mut players = app.world_mut().query_filtered::<&Transform, With<Player>>();
        let positions: Vec<Vec2> = players
            .iter(app.world())
            .map(|transform| transform.translation.truncate())
            .collect();
        assert_eq!(positions, vec![PLAYER_START]);

        let mut interests = app.world_mut().query::<&Interest>();
        let mut names: Vec<&str> = interests.iter(app.world()).map(|i| i.name).collect();
        names.sort();
        assert_eq!(
            names,
            vec!["Len", "Mars", "desk", "diplomas", "fume hood", "nanite box", "safe", "window"]
        );
        let mut props = app.world_mut().query::<&Prop>();
        assert_eq!(props.iter(app.world()).count(), 2);
        let mut doors = app.world_mut().query::<&Door>();
        assert_eq!(doors.iter(app.world()).count(), 6);
        assert_eq!(app.world().resource::<PhaseController>().current(), Phase::Walk);
    }

    #[test]
    fn returning_puts_the_player_back() {
        let save = SaveState {
            player_location: Some(Vec2::new(150.0, 1050.0)),
            ..default()
        };
        let mut app = lobby_app(save);
        app.update();
        let mut players = app.world_mut().query_filtered::<&Transform, With<Player>>();
        let position = players
            .single(app.world())
            .map(|transform| transform.translation.truncate());
        assert_eq!(position.ok(), Some(Vec2::new(150.0, 1050.0)));
    }
}
