use bevy::log::warn;

use crate::combat_ability::{neutral_cast_time, EffectContext, Item, ItemId, TargetType};

pub static BANDAGE: Item = Item {
    id: ItemId::Bandage,
    title: "Bandage",
    description: "A sticky little bandage. Heals 25 HP.",
    target: TargetType::SingleFriend,
    cast_time: neutral_cast_time,
    effect: apply_bandage,
};

pub static SPORTS_DRINK: Item = Item {
    id: ItemId::SportsDrink,
    title: "Sports Drink",
    description: "Electrolytes! Restores 20 MP.",
    target: TargetType::SingleFriend,
    cast_time: neutral_cast_time,
    effect: drink_sports_drink,
};

const BANDAGE_HEAL: f32 = 25.0;
const SPORTS_DRINK_MP: f32 = 20.0;

/// Uses up one `id` from the caster's inventory, or logs that there is none left.
fn spend(ctx: &mut EffectContext, id: ItemId, title: &str) -> bool {
    if ctx.caster.consume_item(id) {
        return true;
    }
    warn!("{} tried to use a {title} they don't have", ctx.caster.name);
    ctx.say_all([format!("{} is all out of {title}s!", ctx.caster.name)]);
    false
}

fn apply_bandage(ctx: &mut EffectContext) {
    let Some(target) = ctx.friends.first().map(|friend| (friend.entity, friend.name.clone()))
    else {
        return;
    };
    if !spend(ctx, ItemId::Bandage, BANDAGE.title) {
        return;
    }
    ctx.say_all([format!(
        "{} patches up {} for {BANDAGE_HEAL} HP!",
        ctx.caster.name, target.1
    )]);
    ctx.heal(target.0, BANDAGE_HEAL);
}

fn drink_sports_drink(ctx: &mut EffectContext) {
    let Some(target) = ctx.friends.first().map(|friend| (friend.entity, friend.name.clone()))
    else {
        return;
    };
    if !spend(ctx, ItemId::SportsDrink, SPORTS_DRINK.title) {
        return;
    }
    ctx.say_all([format!(
        "{} chugs a Sports Drink and recovers {SPORTS_DRINK_MP} MP!",
        target.1
    )]);
    ctx.restore_mp(target.0, SPORTS_DRINK_MP);
}
