use bevy::prelude::*;

use crate::constants::SaveFlags;

/// The four keys that unlock the top-secret safe, in slot order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Nanite,
    Desk,
    Hood,
    Space,
}

impl Key {
    pub const ALL: [Key; 4] = [Key::Nanite, Key::Desk, Key::Hood, Key::Space];

    pub fn held_flag(self) -> SaveFlags {
        match self {
            Key::Nanite => SaveFlags::HAS_NANITE_KEY,
            Key::Desk => SaveFlags::HAS_DESK_KEY,
            Key::Hood => SaveFlags::HAS_HOOD_KEY,
            Key::Space => SaveFlags::HAS_SPACE_KEY,
        }
    }

    pub fn inserted_flag(self) -> SaveFlags {
        match self {
            Key::Nanite => SaveFlags::NANITE_KEY_IN_SAFE,
            Key::Desk => SaveFlags::DESK_KEY_IN_SAFE,
            Key::Hood => SaveFlags::HOOD_KEY_IN_SAFE,
            Key::Space => SaveFlags::SPACE_KEY_IN_SAFE,
        }
    }
}

/// Story and puzzle progress for the current playthrough.
///
/// Lives only in memory; nothing here is written to disk.
#[derive(Resource, Debug, Clone, Default)]
pub struct SaveState {
    pub flags: SaveFlags,
    pub mars_checks: u32,
    pub nanite_box_checks: u32,
    pub key_count: u32,
    /// Where the player stood when a fight started.
    pub player_location: Option<Vec2>,
}

impl SaveState {
    pub fn has(&self, flag: SaveFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn set(&mut self, flag: SaveFlags) {
        self.flags.insert(flag);
    }

    /// First key the player holds that is not yet in the safe.
    pub fn next_key_to_insert(&self) -> Option<Key> {
        Key::ALL
            .into_iter()
            .find(|key| self.has(key.held_flag()) && !self.has(key.inserted_flag()))
    }

    pub fn insert_key(&mut self, key: Key) {
        if self.has(key.inserted_flag()) {
            return;
        }
        self.key_count += 1;
        self.set(key.inserted_flag());
    }

    pub fn all_keys_inserted(&self) -> bool {
        Key::ALL.into_iter().all(|key| self.has(key.inserted_flag()))
    }

    /// Every room discovery "Look Around" can make has been made.
    pub fn seen_everything(&self) -> bool {
        self.has(
            SaveFlags::HAS_SPOOKY_BOARD
                | SaveFlags::HAS_SPOOKY_BOARD_POINTER
                | SaveFlags::HAS_MED_KIT
                | SaveFlags::HAS_SALT,
        )
    }
}
