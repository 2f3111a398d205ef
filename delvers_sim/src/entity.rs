// Creature and item records.
//
// These are the plain-data objects owned by `World`. A creature refers to the
// items it carries by `NetworkId` through fixed-size slot arrays; the items
// themselves always live in `World::items`. An item's `on_ground` flag says
// which side of the exclusivity invariant it is on: in a ground pile (and
// `World`'s item index) or in exactly one creature slot.
//
// Stats that depend on equipment (effective strength, max life, granted
// skills, ...) are computed by `World` because they need the item table.

use serde::{Deserialize, Serialize};

use crate::types::{EQUIPMENT_SLOTS, GridPoint, INVENTORY_SIZE, NetworkId, PixelPoint};

/// Base or bonus attributes. Item requirements and bonuses use the same shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatBlock {
    pub movement: i32,
    pub max_life: i32,
    pub strength: i32,
    pub dexterity: i32,
    pub intelligence: i32,
    pub max_stamina: i32,
    pub stamina_regen: i32,
}

impl StatBlock {
    pub fn plus(self, other: StatBlock) -> StatBlock {
        StatBlock {
            movement: self.movement + other.movement,
            max_life: self.max_life + other.max_life,
            strength: self.strength + other.strength,
            dexterity: self.dexterity + other.dexterity,
            intelligence: self.intelligence + other.intelligence,
            max_stamina: self.max_stamina + other.max_stamina,
            stamina_regen: self.stamina_regen + other.stamina_regen,
        }
    }

    /// True if every attribute is at least the requirement's.
    pub fn meets(&self, req: &StatBlock) -> bool {
        self.movement >= req.movement
            && self.max_life >= req.max_life
            && self.strength >= req.strength
            && self.dexterity >= req.dexterity
            && self.intelligence >= req.intelligence
            && self.max_stamina >= req.max_stamina
            && self.stamina_regen >= req.stamina_regen
    }
}

/// Which equipment slot an item occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Weapon,
    OffHand,
    Armor,
    Helm,
    Accessory,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; EQUIPMENT_SLOTS] = [
        EquipSlot::Weapon,
        EquipSlot::OffHand,
        EquipSlot::Armor,
        EquipSlot::Helm,
        EquipSlot::Accessory,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Creature {
    pub id: NetworkId,
    /// Definition name in `GameData::creatures`.
    pub name: String,
    pub position: GridPoint,
    /// Render position. Equal to `position.to_pixels()` except while a
    /// `Move` is in flight.
    pub pixel: PixelPoint,
    pub life: i32,
    pub stamina: i32,
    pub stats: StatBlock,
    pub equipment: [Option<NetworkId>; EQUIPMENT_SLOTS],
    pub inventory: [Option<NetworkId>; INVENTORY_SIZE],
    /// Always begins with "Basic Attack".
    pub innate_skills: Vec<String>,
    pub is_player_team: bool,
    pub is_activated: bool,
    pub dead: bool,
}

impl Creature {
    pub fn first_free_inventory_slot(&self) -> Option<usize> {
        self.inventory.iter().position(Option::is_none)
    }

    pub fn is_alive(&self) -> bool {
        !self.dead
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: NetworkId,
    /// Definition name in `GameData::items`.
    pub name: String,
    pub slot: EquipSlot,
    /// Last ground position. Only meaningful while `on_ground`.
    pub position: GridPoint,
    pub on_ground: bool,
    pub requirements: StatBlock,
    pub bonuses: StatBlock,
    /// Melee skills used by the wearer reach one extra tile.
    pub extended_reach: bool,
    pub skills: Vec<String>,
}
