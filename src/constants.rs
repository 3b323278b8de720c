use bitflags::bitflags;

pub const WINDOW_WIDTH: f32 = 1280.0;
pub const WINDOW_HEIGHT: f32 = 740.0;
pub const WINDOW_TITLE: &str = "Spooky Lobby";

pub const PLAYER_SPEED: f32 = 180.0;
pub const PLAYER_HITBOX: f32 = 32.0;

pub const LINE_DELAY: f32 = 0.3;
pub const LETTER_DELAY: f32 = 0.1;
pub const LOG_ROWS: usize = 3;

/// Pixel width of a full hp / mp / cast bar on a party card.
pub const BAR_WIDTH: f32 = 83.0;

/// Rows visible at once in the ability and item menus.
pub const MENU_ROWS: usize = 4;
pub const EMPTY_ROW: &str = "---";

/// Cast-time total a bar resets to after firing, so an idle bar never draws full.
pub const NEUTRAL_CAST_TIME: f32 = 1.0;
pub const MIN_CAST_TIME: f32 = 0.2;

pub const DOOR_OPEN_DELAY: f32 = 0.3;
pub const EXIT_HOLD_SECONDS: f32 = 3.0;

pub const CONFIG_PATH: &str = "config/game.json";

bitflags! {
    /// Story and puzzle flags for one playthrough.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SaveFlags: u32 {
        const HAS_SPOOKY_BOARD = 1 << 0;
        const HAS_SPOOKY_BOARD_POINTER = 1 << 1;
        const HAS_MED_KIT = 1 << 2;
        const HAS_SALT = 1 << 3;
        const IS_SAFE_OPEN = 1 << 4;
        const RECRUITED_ME = 1 << 5;
        const HAS_PPE = 1 << 7;
        const IS_DRAWER_BROKEN = 1 << 8;
        const HAS_NANITE_KEY = 1 << 9;
        const HAS_DESK_KEY = 1 << 10;
        const HAS_HOOD_KEY = 1 << 11;
        const HAS_SPACE_KEY = 1 << 12;
        const NANITE_KEY_IN_SAFE = 1 << 13;
        const DESK_KEY_IN_SAFE = 1 << 14;
        const HOOD_KEY_IN_SAFE = 1 << 15;
        const SPACE_KEY_IN_SAFE = 1 << 16;
    }
}
