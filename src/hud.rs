use bevy::prelude::*;

use crate::accept::AcceptPrompt;
use crate::character::{BarMirror, CastBar, Character, PartyMember};
use crate::combat_log::CombatLog;
use crate::combat_plugin::EnemyAi;
use crate::config::GameConfig;
use crate::constants::{LOG_ROWS, MENU_ROWS};
use crate::core::{MainCamera, Player, SceneScoped, Scene_Kind, Voice};
use crate::gate::{Collaborator, InputGates};
use crate::interest::{Cue, Prop};
use crate::phase::TurnSet;
use crate::selection::{AbilityMenu, CardMenu, ItemMenu};
use crate::target::TargetCursor;
use crate::world::Art;

const PANEL: Color = Color::srgba(0.04, 0.05, 0.08, 0.92);
const CARD: Color = Color::srgba(0.08, 0.1, 0.16, 0.85);
const CARD_SELECTED: Color = Color::srgba(0.16, 0.22, 0.32, 1.0);
const TEXT: Color = Color::srgb(0.92, 0.94, 0.98);
const TEXT_DIM: Color = Color::srgb(0.55, 0.6, 0.68);
const HP: Color = Color::srgb(0.8, 0.1, 0.1);
const MP: Color = Color::srgb(0.2, 0.4, 0.9);
const CAST: Color = Color::srgb(0.9, 0.8, 0.2);

#[derive(Component)]
struct LogPanel;

#[derive(Component)]
struct LogRowText(usize);

#[derive(Component)]
struct PromptPanel;

#[derive(Component)]
struct PromptChoice {
    yes: bool,
}

#[derive(Component)]
struct MenuPanel;

#[derive(Component)]
struct MenuRowText(usize);

/// Name and description of the highlighted menu entry.
#[derive(Component)]
struct MenuInfoText;

#[derive(Clone, Copy)]
enum MenuKind {
    Abilities,
    Items,
}

#[derive(Component)]
struct TargetPointer;

/// UI card mirroring one party member.
#[derive(Component)]
struct PartyCard {
    slot: usize,
}

#[derive(Component, Clone, Copy, PartialEq, Eq)]
enum BarKind {
    Hp,
    Mp,
    Cast,
}

#[derive(Component)]
struct BarFill {
    owner: Entity,
    kind: BarKind,
}

fn visible_when(shown: bool) -> Visibility {
    if shown {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}

pub fn ability_labels(character: &Character) -> Vec<String> {
    character
        .abilities
        .iter()
        .map(|ability| ability.shorthand.to_string())
        .collect()
}

pub fn ability_info(character: &Character, index: usize) -> String {
    character
        .abilities
        .get(index)
        .map_or_else(String::new, |ability| {
            format!("{}\n{}", ability.title, ability.description)
        })
}

pub fn item_labels(character: &Character) -> Vec<String> {
    character
        .inventory
        .iter()
        .map(|stack| format!("{} x{}", stack.item.title, stack.quantity))
        .collect()
}

pub fn item_info(character: &Character, index: usize) -> String {
    character
        .inventory
        .get(index)
        .map_or_else(String::new, |stack| {
            format!("{}\n{}", stack.item.title, stack.item.description)
        })
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((Camera2d, MainCamera, Transform::default()));
}

/// Keeps the player centered; scenes without a player are framed at the origin.
fn follow_player(
    player: Query<&Transform, (With<Player>, Without<MainCamera>)>,
    mut camera: Query<&mut Transform, With<MainCamera>>,
) {
    let Ok(mut camera) = camera.single_mut() else {
        return;
    };
    let focus = player
        .single()
        .map_or(Vec2::ZERO, |transform| transform.translation.truncate());
    camera.translation = focus.extend(camera.translation.z);
}

fn draw_art(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut layouts: ResMut<Assets<TextureAtlasLayout>>,
    added: Query<(Entity, &Art), Added<Art>>,
) {
    for (entity, art) in added.iter() {
        let image = asset_server.load(art.path);
        let mut sprite = match art.sheet {
            Some(sheet) => {
                let layout = layouts.add(TextureAtlasLayout::from_grid(
                    sheet.tile,
                    sheet.frames,
                    1,
                    None,
                    None,
                ));
                Sprite::from_atlas_image(
                    image,
                    TextureAtlas {
                        layout,
                        index: sheet.start,
                    },
                )
            }
            None => Sprite::from_image(image),
        };
        sprite.custom_size = Some(art.size);
        commands.entity(entity).insert(sprite);
    }
}

fn play_cues(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut cues: MessageReader<Cue>,
    mut props: Query<(&Prop, &mut Sprite)>,
) {
    for cue in cues.read() {
        match cue {
            Cue::Sound(path) => {
                commands.spawn((
                    AudioPlayer::new(asset_server.load(*path)),
                    PlaybackSettings::DESPAWN,
                ));
            }
            Cue::Prop { name, frame } => {
                let Some((_, mut sprite)) = props.iter_mut().find(|(prop, _)| prop.0 == *name)
                else {
                    warn!("No prop called {name} to show frame {frame}");
                    continue;
                };
                if let Some(atlas) = sprite.texture_atlas.as_mut() {
                    atlas.index = *frame;
                }
            }
        }
    }
}

fn spawn_log_panel(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(20.0),
                right: Val::Px(20.0),
                top: Val::Px(20.0),
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(6.0),
                padding: UiRect::all(Val::Px(12.0)),
                ..default()
            },
            BackgroundColor(PANEL),
            BorderRadius::all(Val::Px(10.0)),
            Visibility::Hidden,
            LogPanel,
        ))
        .with_children(|panel| {
            // Row 0 is the line being typed; it sits at the bottom.
            for row in (0..LOG_ROWS).rev() {
                panel.spawn((
                    Text::new(""),
                    TextFont {
                        font_size: 22.0,
                        ..default()
                    },
                    TextColor(TEXT),
                    LogRowText(row),
                ));
            }
        });
}

fn draw_log(
    gates: Res<InputGates>,
    log: Res<CombatLog>,
    mut panel: Query<&mut Visibility, With<LogPanel>>,
    mut rows: Query<(&LogRowText, &mut Text, &mut TextFont)>,
) {
    if let Ok(mut visibility) = panel.single_mut() {
        visibility.set_if_neq(visible_when(!gates.is_paused(Collaborator::CombatLog)));
    }
    let current = log.rows();
    for (row, mut text, mut font) in rows.iter_mut() {
        let Some(line) = current.get(row.0) else {
            continue;
        };
        if text.0 != line.text {
            text.0 = line.text.clone();
        }
        if font.font != line.font {
            font.font = line.font.clone();
        }
    }
}

fn spawn_prompt_panel(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                right: Val::Px(40.0),
                top: Val::Px(160.0),
                column_gap: Val::Px(24.0),
                padding: UiRect::all(Val::Px(10.0)),
                ..default()
            },
            BackgroundColor(PANEL),
            BorderRadius::all(Val::Px(8.0)),
            Visibility::Hidden,
            PromptPanel,
        ))
        .with_children(|panel| {
            for (label, yes) in [("Yes", true), ("No", false)] {
                panel.spawn((
                    Text::new(label),
                    TextFont {
                        font_size: 22.0,
                        ..default()
                    },
                    TextColor(TEXT_DIM),
                    PromptChoice { yes },
                ));
            }
        });
}

fn draw_prompt(
    gates: Res<InputGates>,
    prompt: Res<AcceptPrompt>,
    mut panel: Query<&mut Visibility, With<PromptPanel>>,
    mut choices: Query<(&PromptChoice, &mut TextColor)>,
) {
    if let Ok(mut visibility) = panel.single_mut() {
        visibility.set_if_neq(visible_when(!gates.is_paused(Collaborator::AcceptPrompt)));
    }
    for (choice, mut color) in choices.iter_mut() {
        let want = if choice.yes == prompt.yes_selected() {
            TEXT
        } else {
            TEXT_DIM
        };
        color.set_if_neq(TextColor(want));
    }
}

fn spawn_menu_panel(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                right: Val::Px(20.0),
                bottom: Val::Px(170.0),
                width: Val::Px(320.0),
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(4.0),
                padding: UiRect::all(Val::Px(10.0)),
                ..default()
            },
            BackgroundColor(PANEL),
            BorderRadius::all(Val::Px(8.0)),
            Visibility::Hidden,
            MenuPanel,
        ))
        .with_children(|panel| {
            for row in 0..MENU_ROWS {
                panel.spawn((
                    Text::new(""),
                    TextFont {
                        font_size: 20.0,
                        ..default()
                    },
                    TextColor(TEXT_DIM),
                    MenuRowText(row),
                ));
            }
            panel.spawn((
                Node {
                    margin: UiRect::top(Val::Px(8.0)),
                    ..default()
                },
                Text::new(""),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(TEXT),
                MenuInfoText,
            ));
        });
}

fn draw_menu(
    gates: Res<InputGates>,
    card: Res<CardMenu>,
    mut abilities: ResMut<AbilityMenu>,
    mut items: ResMut<ItemMenu>,
    party: Query<(&PartyMember, &Character)>,
    mut panel: Query<&mut Visibility, With<MenuPanel>>,
    mut rows: Query<(&MenuRowText, &mut Text, &mut TextColor)>,
    mut info: Query<&mut Text, (With<MenuInfoText>, Without<MenuRowText>)>,
) {
    let selected = party
        .iter()
        .find(|(member, _)| member.slot == card.current)
        .map(|(_, character)| character);
    let open = match selected {
        Some(character) if !gates.is_paused(Collaborator::AbilitySelect) => {
            Some((character, MenuKind::Abilities))
        }
        Some(character) if !gates.is_paused(Collaborator::ItemSelect) => {
            Some((character, MenuKind::Items))
        }
        _ => None,
    };
    if let Ok(mut visibility) = panel.single_mut() {
        visibility.set_if_neq(visible_when(open.is_some()));
    }
    let Some((character, kind)) = open else {
        return;
    };
    let (window, labels, description) = match kind {
        MenuKind::Abilities => {
            let window = &mut abilities.0;
            let description = ability_info(character, window.current);
            (window, ability_labels(character), description)
        }
        MenuKind::Items => {
            let window = &mut items.0;
            let description = item_info(character, window.current);
            (window, item_labels(character), description)
        }
    };
    if let Ok(mut text) = info.single_mut() {
        if text.0 != description {
            text.0 = description;
        }
    }

    let redraw = window.needs_redraw();
    let visible = window.visible_rows(&labels);
    for (row, mut text, mut color) in rows.iter_mut() {
        if redraw {
            text.0 = visible[row.0].clone();
        }
        let want = if row.0 == window.cursor_row() {
            TEXT
        } else {
            TEXT_DIM
        };
        color.set_if_neq(TextColor(want));
    }
    if redraw {
        window.mark_rendered();
    }
}

fn spawn_target_pointer(mut commands: Commands) {
    commands.spawn((
        Node {
            position_type: PositionType::Absolute,
            right: Val::Px(40.0),
            bottom: Val::Px(170.0),
            ..default()
        },
        Text::new(""),
        TextFont {
            font_size: 24.0,
            ..default()
        },
        TextColor(TEXT),
        Visibility::Hidden,
        TargetPointer,
    ));
}

fn draw_target_pointer(
    gates: Res<InputGates>,
    cursor: Res<TargetCursor>,
    characters: Query<&Character>,
    mut pointer: Query<(&mut Text, &mut Visibility), With<TargetPointer>>,
) {
    let Ok((mut text, mut visibility)) = pointer.single_mut() else {
        return;
    };
    let name = cursor
        .highlighted
        .filter(|_| !gates.is_paused(Collaborator::Target))
        .and_then(|entity| characters.get(entity).ok())
        .map(|character| character.name.as_str());
    visibility.set_if_neq(visible_when(name.is_some()));
    if let Some(name) = name {
        let label = format!("> {name}");
        if text.0 != label {
            text.0 = label;
        }
    }
}

fn bar(parent: &mut ChildSpawnerCommands, owner: Entity, kind: BarKind, color: Color, full: f32) {
    parent
        .spawn((
            Node {
                width: Val::Px(full),
                height: Val::Px(8.0),
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
        ))
        .with_children(|track| {
            let width = if kind == BarKind::Cast { 0.0 } else { full };
            track.spawn((
                Node {
                    width: Val::Px(width),
                    height: Val::Percent(100.0),
                    ..default()
                },
                BackgroundColor(color),
                BarFill { owner, kind },
            ));
        });
}

fn spawn_party_cards(
    mut commands: Commands,
    config: Res<GameConfig>,
    added: Query<(Entity, &PartyMember, &Character), Added<PartyMember>>,
) {
    for (owner, member, character) in added.iter() {
        commands
            .spawn((
                Node {
                    position_type: PositionType::Absolute,
                    left: Val::Px(20.0 + member.slot as f32 * 200.0),
                    bottom: Val::Px(20.0),
                    width: Val::Px(180.0),
                    flex_direction: FlexDirection::Column,
                    row_gap: Val::Px(6.0),
                    padding: UiRect::all(Val::Px(10.0)),
                    ..default()
                },
                BackgroundColor(CARD),
                BorderRadius::all(Val::Px(10.0)),
                PartyCard { slot: member.slot },
                SceneScoped(Scene_Kind::GhostFight),
            ))
            .with_children(|card| {
                card.spawn((
                    Text::new(character.name.clone()),
                    TextFont {
                        font_size: 20.0,
                        ..default()
                    },
                    TextColor(TEXT),
                ));
                bar(card, owner, BarKind::Hp, HP, config.bar_width);
                bar(card, owner, BarKind::Mp, MP, config.bar_width);
                bar(card, owner, BarKind::Cast, CAST, config.bar_width);
            });
    }
}

fn draw_party_cards(
    card_menu: Res<CardMenu>,
    mut cards: Query<(&PartyCard, &mut BackgroundColor)>,
) {
    for (card, mut background) in cards.iter_mut() {
        let want = if card.slot == card_menu.current {
            CARD_SELECTED
        } else {
            CARD
        };
        background.set_if_neq(BackgroundColor(want));
    }
}

/// Pushes changed vitals and cast progress into the bar fills.
fn draw_bars(
    config: Res<GameConfig>,
    mut characters: Query<(&Character, &CastBar, &mut BarMirror)>,
    mut fills: Query<(&BarFill, &mut Node)>,
) {
    let mut widths = Vec::new();
    for (fill, _) in fills.iter() {
        let Ok((character, cast, mut mirror)) = characters.get_mut(fill.owner) else {
            continue;
        };
        if fill.kind == BarKind::Cast {
            widths.push((fill.owner, BarKind::Cast, cast.fraction() * config.bar_width));
            continue;
        }
        if fill.kind != BarKind::Hp {
            continue;
        }
        let (hp, mp) = mirror.sync(&character.stats, config.bar_width);
        if let Some(width) = hp {
            widths.push((fill.owner, BarKind::Hp, width));
        }
        if let Some(width) = mp {
            widths.push((fill.owner, BarKind::Mp, width));
        }
    }
    for (fill, mut node) in fills.iter_mut() {
        if let Some((_, _, width)) = widths
            .iter()
            .find(|(owner, kind, _)| *owner == fill.owner && *kind == fill.kind)
        {
            node.width = Val::Px(*width);
        }
    }
}

/// Gives the ghost its sprite and voice once it enters the fight.
fn dress_enemies(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    added: Query<Entity, Added<EnemyAi>>,
) {
    for entity in added.iter() {
        commands.entity(entity).insert((
            Sprite {
                image: asset_server.load("ghost/ghost.png"),
                custom_size: Some(Vec2::splat(160.0)),
                ..default()
            },
            Transform::from_xyz(0.0, 60.0, 0.0),
            Voice {
                font: asset_server.load("fonts/ghost.ttf"),
                click: asset_server.load("sounds/ghost.wav"),
            },
        ));
    }
}

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<Cue>()
            .add_systems(
                Startup,
                (
                    spawn_camera,
                    spawn_log_panel,
                    spawn_prompt_panel,
                    spawn_menu_panel,
                    spawn_target_pointer,
                ),
            )
            .add_systems(
                Update,
                (
                    draw_art,
                    dress_enemies,
                    spawn_party_cards,
                    play_cues,
                    follow_player,
                    draw_log,
                    draw_prompt,
                    draw_menu,
                    draw_target_pointer,
                    draw_party_cards,
                    draw_bars,
                )
                    .in_set(TurnSet::Present),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::{FIGHT, LOOK_AROUND};
    use crate::character::Stats;
    use crate::combat_log::LogRow;
    use crate::items::{BANDAGE, SPORTS_DRINK};

    #[test]
    fn labels_follow_the_lists() {
        let mut you = Character::new("You", Stats::default());
        you.add_ability(&FIGHT);
        you.add_ability(&LOOK_AROUND);
        you.add_item(&BANDAGE, 3);
        assert_eq!(ability_labels(&you), vec!["Fight", "Look"]);
        assert_eq!(item_labels(&you), vec!["Bandage x3"]);
        assert_eq!(
            ability_info(&you, 1),
            "Look Around!\nLook around the fight area for clues! Maybe something useful will turn up!"
        );
        assert_eq!(ability_info(&you, 2), "");
    }

    fn hud_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<InputGates>()
            .init_resource::<CombatLog>()
            .init_resource::<GameConfig>()
            .init_resource::<CardMenu>()
            .init_resource::<AbilityMenu>()
            .init_resource::<ItemMenu>()
            .add_systems(Startup, (spawn_log_panel, spawn_menu_panel))
            .add_systems(Update, (draw_log, draw_menu, draw_bars));
        app.world_mut()
            .resource_mut::<InputGates>()
            .register(Collaborator::CombatLog);
        app
    }

    fn row_texts<T: Component>(app: &mut App, index: impl Fn(&T) -> usize) -> Vec<(usize, String)> {
        let mut rows = app.world_mut().query::<(&T, &Text)>();
        let mut texts: Vec<(usize, String)> = rows
            .iter(app.world())
            .map(|(row, text)| (index(row), text.0.clone()))
            .collect();
        texts.sort();
        texts
    }

    #[test]
    fn log_rows_mirror_the_log_and_hide_while_paused() {
        let mut app = hud_app();
        {
            let log = app.world().resource::<CombatLog>();
            log.push_all(["Boo", "Eek"], &Voice::default());
            for _ in 0..2 {
                log.tick(0.31, false, 0.3, 0.1);
                log.tick(0.0, true, 0.3, 0.1);
            }
        }
        app.update();
        assert_eq!(
            row_texts::<LogRowText>(&mut app, |row| row.0),
            vec![
                (0, "Eek".to_string()),
                (1, "Boo".to_string()),
                (2, LogRow::default().text)
            ]
        );
        let mut panel = app
            .world_mut()
            .query_filtered::<&Visibility, With<LogPanel>>();
        assert_eq!(panel.single(app.world()).ok(), Some(&Visibility::Hidden));

        app.world_mut()
            .resource_mut::<InputGates>()
            .unpause(Collaborator::CombatLog)
            .unwrap();
        app.update();
        let mut panel = app
            .world_mut()
            .query_filtered::<&Visibility, With<LogPanel>>();
        assert_eq!(panel.single(app.world()).ok(), Some(&Visibility::Inherited));
    }

    #[test]
    fn ability_menu_draws_the_selected_members_list() {
        let mut app = hud_app();
        let mut you = Character::new("You", Stats::default());
        you.add_ability(&FIGHT);
        you.add_ability(&LOOK_AROUND);
        app.world_mut().spawn((you, PartyMember { slot: 0 }));
        {
            let mut gates = app.world_mut().resource_mut::<InputGates>();
            gates.register(Collaborator::AbilitySelect);
            gates.unpause(Collaborator::AbilitySelect).unwrap();
        }
        app.update();
        app.update();
        assert_eq!(
            row_texts::<MenuRowText>(&mut app, |row| row.0),
            vec![
                (0, "Fight".to_string()),
                (1, "Look".to_string()),
                (2, "---".to_string()),
                (3, "---".to_string())
            ]
        );
        assert!(!app.world().resource::<AbilityMenu>().needs_redraw());
        assert_eq!(
            info_text(&mut app),
            Some("Regular boring old attack.\nNormal Series: Normal punch.".to_string())
        );
    }

    fn info_text(app: &mut App) -> Option<String> {
        let mut info = app
            .world_mut()
            .query_filtered::<&Text, With<MenuInfoText>>();
        info.single(app.world()).ok().map(|text| text.0.clone())
    }

    #[test]
    fn item_pane_follows_the_cursor() {
        let mut app = hud_app();
        let mut you = Character::new("You", Stats::default());
        you.add_item(&BANDAGE, 3);
        you.add_item(&SPORTS_DRINK, 1);
        app.world_mut().spawn((you, PartyMember { slot: 0 }));
        {
            let mut gates = app.world_mut().resource_mut::<InputGates>();
            gates.register(Collaborator::ItemSelect);
            gates.unpause(Collaborator::ItemSelect).unwrap();
        }
        app.update();
        assert_eq!(
            info_text(&mut app),
            Some("Bandage\nA sticky little bandage. Heals 25 HP.".to_string())
        );

        app.world_mut().resource_mut::<ItemMenu>().0.step(1, 2);
        app.update();
        assert_eq!(
            info_text(&mut app),
            Some("Sports Drink\nElectrolytes! Restores 20 MP.".to_string())
        );
        assert_eq!(
            row_texts::<MenuRowText>(&mut app, |row| row.0)[1],
            (1, "Sports Drink x1".to_string())
        );
    }

    #[test]
    fn bars_shrink_with_vitals() {
        let mut app = hud_app();
        let stats = Stats {
            hp: 50.0,
            max_hp: 100.0,
            mp: 10.0,
            max_mp: 10.0,
            ..default()
        };
        let owner = app
            .world_mut()
            .spawn((
                Character::new("Me", stats),
                CastBar::default(),
                BarMirror::default(),
            ))
            .id();
        let hp = app
            .world_mut()
            .spawn((Node::default(), BarFill { owner, kind: BarKind::Hp }))
            .id();
        let mp = app
            .world_mut()
            .spawn((Node::default(), BarFill { owner, kind: BarKind::Mp }))
            .id();
        app.update();
        let width = |app: &App, entity: Entity| app.world().get::<Node>(entity).map(|node| node.width);
        assert_eq!(width(&app, hp), Some(Val::Px(41.5)));
        assert_eq!(width(&app, mp), Some(Val::Px(83.0)));
    }
}
