use crate::combat_ability::{
    dexterity_cast_time, neutral_cast_time, Ability, AbilityId, EffectContext, TargetType,
};
use crate::constants::SaveFlags;
use crate::interest::Cue;
use crate::items::{BANDAGE, SPORTS_DRINK};

pub static FIGHT: Ability = Ability {
    id: AbilityId::Fight,
    title: "Regular boring old attack.",
    shorthand: "Fight",
    description: "Normal Series: Normal punch.",
    mp_cost: 0.0,
    target: TargetType::SingleEnemy,
    cast_time: dexterity_cast_time,
    effect: regular_attack,
};

pub static DEFEND: Ability = Ability {
    id: AbilityId::Defend,
    title: "Defend yourself!",
    shorthand: "Defend",
    description: "Protect yourself this turn to take less damage!",
    mp_cost: 0.0,
    target: TargetType::None,
    cast_time: neutral_cast_time,
    effect: defend,
};

pub static LOOK_AROUND: Ability = Ability {
    id: AbilityId::LookAround,
    title: "Look Around!",
    shorthand: "Look",
    description: "Look around the fight area for clues! Maybe something useful will turn up!",
    mp_cost: 0.0,
    target: TargetType::None,
    cast_time: neutral_cast_time,
    effect: look_around,
};

pub static SEARCH_SAFE: Ability = Ability {
    id: AbilityId::SearchSafe,
    title: "Search the Safe!",
    shorthand: "SSafe",
    description: "Search that safe! Maybe it has something useful inside!",
    mp_cost: 0.0,
    target: TargetType::None,
    cast_time: neutral_cast_time,
    effect: search_safe,
};

pub static ASK_PIN: Ability = Ability {
    id: AbilityId::AskPin,
    title: "Ask about the Pin!",
    shorthand: "Ask",
    description: "Ask the President what his super secret safe pin is",
    mp_cost: 0.0,
    target: TargetType::SingleFriend,
    cast_time: neutral_cast_time,
    effect: ask_pin,
};

pub static GUESS_PIN: Ability = Ability {
    id: AbilityId::GuessPin,
    title: "Guess the Pin!",
    shorthand: "Guess",
    description: "Try a random pin on the safe!",
    mp_cost: 0.0,
    target: TargetType::None,
    cast_time: neutral_cast_time,
    effect: guess_pin,
};

pub static INPUT_PIN: Ability = Ability {
    id: AbilityId::InputPin,
    title: "Input the Pin!",
    shorthand: "Input",
    description: "Input the pin and open the safe!",
    mp_cost: 0.0,
    target: TargetType::None,
    cast_time: neutral_cast_time,
    effect: input_pin,
};

pub static DISTRACT_AND_DODGE: Ability = Ability {
    id: AbilityId::DistractAndDodge,
    title: "Distract and Dodge",
    shorthand: "DnD",
    description: "Distract the ghost to get its attention, then dodge its energy blast! \
                  The safe will take the brunt of the blast!",
    mp_cost: 0.0,
    target: TargetType::SingleEnemy,
    cast_time: neutral_cast_time,
    effect: distract_and_dodge,
};

pub static GRAB_FROM_SAFE: Ability = Ability {
    id: AbilityId::GrabFromSafe,
    title: "Grab whatever's in that safe!",
    shorthand: "SGrab",
    description: "Grab what's inside the now open safe and add it to your inventory",
    mp_cost: 0.0,
    target: TargetType::None,
    cast_time: neutral_cast_time,
    effect: grab_from_safe,
};

pub static LOOK_AT_WALL: Ability = Ability {
    id: AbilityId::LookAtWall,
    title: "Look closer at the wall!",
    shorthand: "SWall",
    description: "Take a closer look at the gleam in the wall.",
    mp_cost: 0.0,
    target: TargetType::None,
    cast_time: neutral_cast_time,
    effect: look_at_wall,
};

pub static SEARCH_MED_KIT: Ability = Ability {
    id: AbilityId::SearchMedKit,
    title: "Search the med kit!",
    shorthand: "SKit",
    description: "Scavenge the med kit for band-aids and medicine!",
    mp_cost: 5.0,
    target: TargetType::None,
    cast_time: neutral_cast_time,
    effect: search_med_kit,
};

pub static SCRATCH_SALT_LAMP: Ability = Ability {
    id: AbilityId::ScratchSaltLamp,
    title: "Scratch the Salt Lamp!",
    shorthand: "Salt",
    description: "Scrape some salt off the lamp. Ghosts hate salt!",
    mp_cost: 0.0,
    target: TargetType::None,
    cast_time: neutral_cast_time,
    effect: scratch_salt_lamp,
};

pub static ENERGY_BLAST: Ability = Ability {
    id: AbilityId::EnergyBlast,
    title: "Energy Blast",
    shorthand: "Blast",
    description: "A crackling ball of ghostly energy.",
    mp_cost: 0.0,
    target: TargetType::SingleEnemy,
    cast_time: neutral_cast_time,
    effect: energy_blast,
};

/// Abilities that lock the safe puzzle; solving it removes all of them.
const PIN_PUZZLE: [AbilityId; 4] = [
    AbilityId::GuessPin,
    AbilityId::AskPin,
    AbilityId::InputPin,
    AbilityId::DistractAndDodge,
];

fn solve_pin_puzzle(ctx: &mut EffectContext) {
    for id in PIN_PUZZLE {
        ctx.caster.remove_ability(id);
    }
    ctx.caster.add_ability(&GRAB_FROM_SAFE);
}

fn regular_attack(ctx: &mut EffectContext) {
    let Some(target) = ctx.enemies.first() else {
        ctx.say_all([format!("{} swings at thin air.", ctx.caster.name)]);
        return;
    };
    let (entity, name, defense) = (target.entity, target.name.clone(), target.stats.defense);
    let roll = ctx.roll(10) as f32 + 1.0;
    let damage = (roll + ctx.caster.stats.strength / 2.0 - defense / 4.0)
        .max(1.0)
        .round();
    ctx.say_all([format!(
        "{} punches {} for {} damage!",
        ctx.caster.name, name, damage
    )]);
    ctx.damage(entity, damage);
}

fn defend(ctx: &mut EffectContext) {
    ctx.caster.defending = true;
    ctx.say_all([format!("{} braces for the next hit!", ctx.caster.name)]);
}

fn see_safe(ctx: &mut EffectContext, lines: &mut Vec<&'static str>) {
    lines.push("That safe over there looks SUSPICIOUS!");
    ctx.caster.add_ability(&SEARCH_SAFE);
}

fn see_glint(ctx: &mut EffectContext, lines: &mut Vec<&'static str>) {
    lines.extend(["Is that wall...glinting?", "Maybe you should check it out!"]);
    ctx.caster.add_ability(&LOOK_AT_WALL);
}

fn see_med_kit(ctx: &mut EffectContext, lines: &mut Vec<&'static str>) {
    lines.extend([
        "There's a safety kit on the back wall here",
        "Maybe there's a medkit in there",
        "That could help anyone who gets injured!",
    ]);
    ctx.caster.add_ability(&SEARCH_MED_KIT);
}

fn see_salt(ctx: &mut EffectContext, lines: &mut Vec<&'static str>) {
    lines.extend([
        "There's a Himylian Salt Lamp on the desk here",
        "Salt circles can help fight ghosts!",
        "Or so I've heard...",
    ]);
    ctx.caster.add_ability(&SCRATCH_SALT_LAMP);
}

const SEEN_EVERYTHING: &str = "You've already seen everything in the room.";

/// Perception roll: a low roll finds nothing, a middling roll finds the next
/// undiscovered thing, a natural 20 finds everything at once.
fn look_around(ctx: &mut EffectContext) {
    let mut lines = vec!["You look around the room..."];
    let roll = ctx.roll(20) + 1;
    let save = ctx.save.clone();

    if roll <= 5 {
        lines.push("But don't see anything of note.");
    } else if roll <= 19 {
        if !save.has(SaveFlags::HAS_SPOOKY_BOARD) {
            see_safe(ctx, &mut lines);
        } else if !save.has(SaveFlags::HAS_SPOOKY_BOARD_POINTER) {
            see_glint(ctx, &mut lines);
        } else if !save.has(SaveFlags::HAS_MED_KIT) {
            see_med_kit(ctx, &mut lines);
        } else if !save.has(SaveFlags::HAS_SALT) {
            see_salt(ctx, &mut lines);
        } else {
            lines.push(SEEN_EVERYTHING);
        }
    } else {
        if !save.has(SaveFlags::HAS_SPOOKY_BOARD) {
            see_safe(ctx, &mut lines);
        }
        if !save.has(SaveFlags::HAS_SPOOKY_BOARD_POINTER) {
            see_glint(ctx, &mut lines);
        }
        if !save.has(SaveFlags::HAS_MED_KIT) {
            see_med_kit(ctx, &mut lines);
        }
        if !save.has(SaveFlags::HAS_SALT) {
            see_salt(ctx, &mut lines);
        }
        if save.seen_everything() {
            lines.push(SEEN_EVERYTHING);
        }
    }
    ctx.say_all(lines);
}

fn search_safe(ctx: &mut EffectContext) {
    let mut lines = vec![
        "Looks like the safe has 4 key holes",
        "If you have the keys in your INVENTORY",
        "You should be able to easily open it.",
        "If not though,",
        "Maybe one of the ghost's ENERGY BLASTS can break through.",
    ];
    ctx.caster.add_ability(&DISTRACT_AND_DODGE);
    lines.extend([
        "There's also a pin-pad that *might* open it if you guess it right.",
        "I can never remember it, but you might be able to ask ME what the pin is",
        "If you've recruited me...",
    ]);
    ctx.caster.add_ability(&GUESS_PIN);
    if ctx.save.has(SaveFlags::RECRUITED_ME) {
        ctx.caster.add_ability(&ASK_PIN);
    }
    ctx.say_all(lines);
}

fn learn_pin(ctx: &mut EffectContext) {
    ctx.caster.remove_ability(AbilityId::GuessPin);
    ctx.caster.remove_ability(AbilityId::AskPin);
    ctx.caster.add_ability(&INPUT_PIN);
}

fn ask_pin(ctx: &mut EffectContext) {
    let Some(friend) = ctx.friends.first() else {
        ctx.say_all(["There's nobody around to ask."]);
        return;
    };
    let mut lines = vec![format!(
        "You turn to {} and ask about the secret safe",
        friend.name
    )];
    if friend.name == "Me" {
        lines.extend(
            [
                "My pin? I can never remember it",
                "So I never set it.",
                "It's the factory-default: 1234!",
            ]
            .map(String::from),
        );
        learn_pin(ctx);
    } else if ctx.caster.name == "Me" {
        lines.extend(["Oh yeah!", "I AM THE PRESIDENT!"].map(String::from));
        learn_pin(ctx);
    } else {
        lines.extend(["They look confused.", "Maybe that wasn't the president?"].map(String::from));
    }
    ctx.say_all(lines);
}

pub const FACTORY_PIN: u32 = 1234;

fn guess_pin(ctx: &mut EffectContext) {
    let mut lines = vec![
        "It's FOUR DIGITS!",
        "That's literally a one in ten thousand chance!",
        "But, despite the odds, you try to guess anyway...",
        "You punch in 4 random numbers and hit enter.",
    ];
    if ctx.roll(10_000) == FACTORY_PIN {
        ctx.cue(Cue::Sound("sounds/cash.wav"));
        lines.extend([
            "Wow. You actually guessed it!",
            "Great job!",
            "You opened the safe!",
        ]);
        solve_pin_puzzle(ctx);
    } else {
        lines.extend(["Guess that wasn't it.", "You can always try again!"]);
    }
    ctx.say_all(lines);
}

fn input_pin(ctx: &mut EffectContext) {
    ctx.say_all(["You carefully input the pin."]);
    solve_pin_puzzle(ctx);
}

fn distract_and_dodge(ctx: &mut EffectContext) {
    let mut lines = vec![
        "The Blood Mouthed Ghost begins charging up his laser!".to_string(),
        "HEY! NOT-SPOOKY-AT-ALL! You couldn't hit me with that blast".to_string(),
        "Just like you couldn't scare my little sister's imaginary friend!".to_string(),
        "You shout.".to_string(),
        "The Spookster turns to you.".to_string(),
        "The blast grows bigger than it ever has!".to_string(),
    ];
    let Some(ghost) = ctx.enemies.first().map(|ghost| ghost.stats) else {
        ctx.say_all(["There's nobody here to distract."]);
        return;
    };
    let dodge = (ctx.roll(100) + 1 + 20) as f32 + ctx.caster.stats.dexterity;
    let aim = ghost.dexterity + (ctx.roll(100) + 1) as f32;
    if dodge > aim {
        lines.extend(
            [
                "You narrowly dodge the blast",
                "It hits the safe dead-on!",
                "Looks like it broke the door!",
                "Go check it out!",
            ]
            .map(String::from),
        );
        solve_pin_puzzle(ctx);
    } else {
        let damage = (ctx.roll(30) + 15) as f32 + ghost.strength + ghost.intelligence;
        lines.push("The ghost fires the blast right into your FACE!".to_string());
        lines.push("Ooof. That's gotta hurt".to_string());
        lines.push(format!("The ghost deals {damage} damage to you!"));
        ctx.caster.take_damage(damage);
    }
    ctx.say_all(lines);
}

fn grab_from_safe(ctx: &mut EffectContext) {
    if ctx.save.has(SaveFlags::HAS_SPOOKY_BOARD) {
        ctx.say_all([
            "You try to grab the item from the safe",
            "But there's nothing there!",
            "Someone must've gotten here before you!",
        ]);
    } else {
        ctx.say_all([
            "Inside the safe is a SPOOKYBOARD!",
            "The SPOOKYBOARD was added to your inventory",
        ]);
        ctx.save
            .set(SaveFlags::HAS_SPOOKY_BOARD | SaveFlags::IS_SAFE_OPEN);
    }
    ctx.caster.remove_ability(AbilityId::GrabFromSafe);
}

fn look_at_wall(ctx: &mut EffectContext) {
    ctx.say_all([
        "Looks like something shiny",
        "Is just behind the wall here!",
        "The hole it gleams through is too small to get it out of.",
        "Maybe if we were to damage it?",
    ]);
    ctx.caster.remove_ability(AbilityId::LookAtWall);
}

fn search_med_kit(ctx: &mut EffectContext) {
    let mut lines = vec!["You approach the medkit".to_string()];
    if (ctx.roll(100) + 1) as f32 + ctx.caster.stats.intelligence > 35.0 {
        ctx.save.set(SaveFlags::HAS_MED_KIT);
        lines.push("And open it!".to_string());
        lines.push("Inside you find".to_string());
        let bandages = ctx.roll(6) as i32 - 2;
        let drinks = ctx.roll(6) as i32 - 3;
        if bandages > 0 {
            lines.push(format!("{bandages} bandages"));
            ctx.caster.add_item(&BANDAGE, bandages as u32);
            if drinks > 0 {
                lines.push("and".to_string());
            }
        }
        if drinks > 0 {
            lines.push(format!("{drinks} sports drinks"));
            ctx.caster.add_item(&SPORTS_DRINK, drinks as u32);
        } else if bandages <= 0 {
            lines.push("nothing.".to_string());
        }
        lines.push("You didn't have enough time to search the whole bag".to_string());
        lines.push("There's plenty more stuff inside!".to_string());
    } else {
        let damage = ctx.roll(20) + 5;
        lines.push("You reach into the bag".to_string());
        lines.push("But that wasn't a zipper! They're teeth!".to_string());
        lines.push("That's not a med-kit! It's a Mimic!".to_string());
        lines.push("And it takes a chomp at your arm!".to_string());
        lines.push(format!(
            "Ouchie! That looks like {damage} points of damage!"
        ));
        ctx.caster.take_damage(damage as f32);
    }
    ctx.say_all(lines);
}

fn scratch_salt_lamp(ctx: &mut EffectContext) {
    ctx.say_all([
        "You scratch at the Himylian Salt Lamp.",
        "A little pile of salt collects in your hand.",
        "Obtained SALT!",
    ]);
    ctx.save.set(SaveFlags::HAS_SALT);
    ctx.caster.remove_ability(AbilityId::ScratchSaltLamp);
}

fn energy_blast(ctx: &mut EffectContext) {
    let Some(target) = ctx.enemies.first() else {
        return;
    };
    let (entity, name) = (target.entity, target.name.clone());
    let damage = (ctx.roll(10) + 5) as f32 + (ctx.caster.stats.strength / 4.0).round();
    ctx.say_all([
        format!("The {} fires an ENERGY BLAST!", ctx.caster.name),
        format!("It hits {name} for {damage} damage!"),
    ]);
    ctx.damage(entity, damage);
}
