// The spatial model: tiles, creatures, and items on a 2D grid.
//
// `World` is the single source of truth for "what occupies this square". It
// keeps three flat per-cell arrays indexed by `x + y * width`:
//
// - `tiles`: the floor (a cell with no tile is a wall / void),
// - `creature_index`: at most one creature id per cell,
// - `item_index`: an unordered pile of ground item ids per cell,
//
// plus the owning `BTreeMap`s of creatures and items and the player → creature
// registry. Lookups (`tile_at`, `creature_at`, `items_at`) are O(1) and return
// `None`/empty for out-of-bounds points. Mutations validate their inputs and
// return `SpatialError` instead of panicking; event handlers log and skip.
//
// Dead creatures stay in `creatures` with `dead = true` (so a skill aimed at
// them can tell "died this turn" from "never existed") but leave the cell
// index. Removal spills everything they carried onto their tile.
//
// Invariants (checked by `invariant_violations`, used heavily in tests):
// - every live creature's `position` cell in `creature_index` holds its id,
//   and nothing else points at it;
// - every item is either `on_ground` and in exactly one pile, or referenced
//   by exactly one creature slot, never both.
//
// See also: `entity.rs` for the records stored here, `pathfinding.rs` which
// reads tiles and occupancy, `sim.rs` whose event handlers are the only
// callers of the mutating methods.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::entity::{Creature, EquipSlot, Item, StatBlock};
use crate::error::SpatialError;
use crate::types::{EQUIPMENT_SLOTS, GridPoint, INVENTORY_SIZE, NetworkId, PlayerId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub name: String,
    pub point: GridPoint,
}

/// A reference to one of a creature's item slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotRef {
    Equipment(usize),
    Inventory(usize),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub width: i32,
    pub height: i32,
    pub tile_size: f32,
    pub start: GridPoint,
    tiles: Vec<Option<Tile>>,
    creature_index: Vec<Option<NetworkId>>,
    item_index: Vec<Vec<NetworkId>>,
    creatures: BTreeMap<NetworkId, Creature>,
    items: BTreeMap<NetworkId, Item>,
    players: BTreeMap<PlayerId, NetworkId>,
    /// Last id handed out. Ids start at 1.
    last_id: u64,
}

impl World {
    /// Create an empty (all-void) map.
    pub fn new(width: i32, height: i32, tile_size: f32) -> Self {
        let cells = (width.max(0) as usize) * (height.max(0) as usize);
        Self {
            width,
            height,
            tile_size,
            start: GridPoint::default(),
            tiles: vec![None; cells],
            creature_index: vec![None; cells],
            item_index: vec![Vec::new(); cells],
            creatures: BTreeMap::new(),
            items: BTreeMap::new(),
            players: BTreeMap::new(),
            last_id: 0,
        }
    }

    pub fn in_bounds(&self, p: GridPoint) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.width && p.y < self.height
    }

    fn index(&self, p: GridPoint) -> Option<usize> {
        if self.in_bounds(p) {
            Some(p.x as usize + p.y as usize * self.width as usize)
        } else {
            None
        }
    }

    fn checked_index(&self, p: GridPoint) -> Result<usize, SpatialError> {
        self.index(p).ok_or(SpatialError::OutOfBounds(p))
    }

    /// Hand out the next `NetworkId`.
    pub fn alloc_id(&mut self) -> NetworkId {
        self.last_id += 1;
        NetworkId(self.last_id)
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub fn tile_at(&self, p: GridPoint) -> Option<&Tile> {
        self.index(p).and_then(|i| self.tiles[i].as_ref())
    }

    pub fn creature_id_at(&self, p: GridPoint) -> Option<NetworkId> {
        self.index(p).and_then(|i| self.creature_index[i])
    }

    pub fn creature_at(&self, p: GridPoint) -> Option<&Creature> {
        self.creature_id_at(p).and_then(|id| self.creatures.get(&id))
    }

    /// Ids of the items lying on the ground at `p`.
    pub fn items_at(&self, p: GridPoint) -> &[NetworkId] {
        match self.index(p) {
            Some(i) => &self.item_index[i],
            None => &[],
        }
    }

    /// A cell a creature could step into: has a tile and no creature.
    pub fn is_free(&self, p: GridPoint) -> bool {
        self.tile_at(p).is_some() && self.creature_id_at(p).is_none()
    }

    /// Any creature record, dead or alive.
    pub fn creature(&self, id: NetworkId) -> Option<&Creature> {
        self.creatures.get(&id)
    }

    /// A creature that is still on the map.
    pub fn living(&self, id: NetworkId) -> Option<&Creature> {
        self.creatures.get(&id).filter(|c| c.is_alive())
    }

    pub fn creature_mut(&mut self, id: NetworkId) -> Option<&mut Creature> {
        self.creatures.get_mut(&id)
    }

    pub fn creatures(&self) -> impl Iterator<Item = &Creature> {
        self.creatures.values()
    }

    pub fn creatures_mut(&mut self) -> impl Iterator<Item = &mut Creature> {
        self.creatures.values_mut()
    }

    pub fn item(&self, id: NetworkId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn player_creature(&self, player: PlayerId) -> Option<NetworkId> {
        self.players.get(&player).copied()
    }

    /// Registered players and their creatures, in player-id order.
    pub fn players(&self) -> impl Iterator<Item = (PlayerId, NetworkId)> + '_ {
        self.players.iter().map(|(p, c)| (*p, *c))
    }

    pub fn register_player(&mut self, player: PlayerId, creature: NetworkId) {
        self.players.insert(player, creature);
    }

    // -----------------------------------------------------------------------
    // Derived creature stats
    // -----------------------------------------------------------------------

    fn equipped<'a>(&'a self, creature: &'a Creature) -> impl Iterator<Item = &'a Item> {
        creature
            .equipment
            .iter()
            .flatten()
            .filter_map(move |id| self.items.get(id))
    }

    /// Base stats plus the bonuses of every equipped item.
    pub fn effective_stats(&self, id: NetworkId) -> Option<StatBlock> {
        let creature = self.creatures.get(&id)?;
        Some(
            self.equipped(creature)
                .fold(creature.stats, |acc, item| acc.plus(item.bonuses)),
        )
    }

    pub fn has_extended_reach(&self, id: NetworkId) -> bool {
        self.creatures
            .get(&id)
            .is_some_and(|c| self.equipped(c).any(|item| item.extended_reach))
    }

    /// Innate skills followed by skills granted by equipped items.
    pub fn skills_of(&self, id: NetworkId) -> Vec<String> {
        let Some(creature) = self.creatures.get(&id) else {
            return Vec::new();
        };
        let mut skills = creature.innate_skills.clone();
        for item in self.equipped(creature) {
            skills.extend(item.skills.iter().cloned());
        }
        skills
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn set_tile(&mut self, p: GridPoint, name: &str) -> Result<(), SpatialError> {
        let i = self.checked_index(p)?;
        self.tiles[i] = Some(Tile {
            name: name.to_string(),
            point: p,
        });
        Ok(())
    }

    /// Insert a new creature at `creature.position`. The cell must have a
    /// tile and be empty.
    pub fn place_creature(&mut self, mut creature: Creature) -> Result<NetworkId, SpatialError> {
        let at = creature.position;
        let i = self.checked_index(at)?;
        if self.tiles[i].is_none() {
            return Err(SpatialError::NoTile(at));
        }
        if let Some(occupant) = self.creature_index[i] {
            return Err(SpatialError::Occupied { at, occupant });
        }
        let id = creature.id;
        creature.pixel = at.to_pixels(self.tile_size);
        self.creature_index[i] = Some(id);
        self.creatures.insert(id, creature);
        Ok(id)
    }

    /// Move a live creature's grid-index entry to `to`, clearing the vacated
    /// cell and snapping its pixel position.
    pub fn relocate_creature(&mut self, id: NetworkId, to: GridPoint) -> Result<(), SpatialError> {
        let from = self
            .living(id)
            .map(|c| c.position)
            .ok_or(SpatialError::UnknownCreature(id))?;
        let to_i = self.checked_index(to)?;
        if self.tiles[to_i].is_none() {
            return Err(SpatialError::NoTile(to));
        }
        match self.creature_index[to_i] {
            Some(occupant) if occupant != id => {
                return Err(SpatialError::Occupied { at: to, occupant });
            }
            _ => {}
        }
        let from_i = self.checked_index(from)?;
        self.creature_index[from_i] = None;
        self.creature_index[to_i] = Some(id);
        let tile_size = self.tile_size;
        if let Some(c) = self.creatures.get_mut(&id) {
            c.position = to;
            c.pixel = to.to_pixels(tile_size);
        }
        Ok(())
    }

    /// Kill a creature: spill its equipment then its inventory onto its tile,
    /// mark it dead, and clear its cell.
    pub fn remove_creature(&mut self, id: NetworkId) -> Result<(), SpatialError> {
        let at = self
            .living(id)
            .map(|c| c.position)
            .ok_or(SpatialError::UnknownCreature(id))?;
        for slot in 0..EQUIPMENT_SLOTS {
            self.drop_item(id, SlotRef::Equipment(slot), at)?;
        }
        for slot in 0..INVENTORY_SIZE {
            self.drop_item(id, SlotRef::Inventory(slot), at)?;
        }
        let i = self.checked_index(at)?;
        if self.creature_index[i] == Some(id) {
            self.creature_index[i] = None;
        }
        if let Some(c) = self.creatures.get_mut(&id) {
            c.dead = true;
        }
        Ok(())
    }

    /// Insert a new item lying on the ground at `item.position`.
    pub fn place_ground_item(&mut self, mut item: Item) -> Result<NetworkId, SpatialError> {
        let i = self.checked_index(item.position)?;
        let id = item.id;
        item.on_ground = true;
        self.item_index[i].push(id);
        self.items.insert(id, item);
        Ok(id)
    }

    /// Insert a new item directly into a creature's equipment slot. The slot
    /// must be empty.
    pub fn give_equipped_item(&mut self, owner: NetworkId, mut item: Item) -> Result<(), SpatialError> {
        let slot = item.slot.index();
        let id = item.id;
        let creature = self
            .creatures
            .get_mut(&owner)
            .ok_or(SpatialError::UnknownCreature(owner))?;
        if creature.equipment[slot].is_some() {
            // Fall back to the inventory rather than silently losing the item.
            let free = creature
                .first_free_inventory_slot()
                .ok_or(SpatialError::InventoryFull(owner))?;
            creature.inventory[free] = Some(id);
        } else {
            creature.equipment[slot] = Some(id);
        }
        item.on_ground = false;
        self.items.insert(id, item);
        Ok(())
    }

    /// Move the item in `slot` (if any) out of the creature and onto the
    /// ground at `at`. An empty slot is a no-op.
    pub fn drop_item(&mut self, owner: NetworkId, slot: SlotRef, at: GridPoint) -> Result<(), SpatialError> {
        let i = self.checked_index(at)?;
        let creature = self
            .creatures
            .get_mut(&owner)
            .ok_or(SpatialError::UnknownCreature(owner))?;
        let cell = match slot {
            SlotRef::Equipment(s) => creature.equipment.get_mut(s),
            SlotRef::Inventory(s) => creature.inventory.get_mut(s),
        };
        let Some(item_id) = cell.and_then(Option::take) else {
            return Ok(());
        };
        if let Some(item) = self.items.get_mut(&item_id) {
            item.on_ground = true;
            item.position = at;
        }
        self.item_index[i].push(item_id);
        Ok(())
    }

    /// Move a ground item into the creature's first free inventory slot.
    /// Returns the slot used.
    pub fn pick_item(&mut self, item_id: NetworkId, owner: NetworkId) -> Result<usize, SpatialError> {
        let item = self
            .items
            .get(&item_id)
            .ok_or(SpatialError::UnknownItem(item_id))?;
        if !item.on_ground {
            return Err(SpatialError::NotOnGround(item_id));
        }
        let at = item.position;
        let i = self.checked_index(at)?;
        let creature = self
            .creatures
            .get_mut(&owner)
            .filter(|c| c.is_alive())
            .ok_or(SpatialError::UnknownCreature(owner))?;
        let slot = creature
            .first_free_inventory_slot()
            .ok_or(SpatialError::InventoryFull(owner))?;
        creature.inventory[slot] = Some(item_id);
        self.item_index[i].retain(|id| *id != item_id);
        if let Some(item) = self.items.get_mut(&item_id) {
            item.on_ground = false;
        }
        Ok(slot)
    }

    /// Swap `inventory[inventory_slot]` into the equipment slot its item
    /// belongs in. Current life and stamina move with the max-life and
    /// max-stamina bonuses of the items going on and coming off. Changing
    /// gear never kills: life bottoms out at 1, stamina at 0.
    pub fn equip(&mut self, owner: NetworkId, inventory_slot: usize) -> Result<(), SpatialError> {
        let creature = self
            .creatures
            .get(&owner)
            .filter(|c| c.is_alive())
            .ok_or(SpatialError::UnknownCreature(owner))?;
        let Some(item_id) = creature.inventory.get(inventory_slot).copied().flatten() else {
            return Ok(());
        };
        let item = self
            .items
            .get(&item_id)
            .ok_or(SpatialError::UnknownItem(item_id))?;
        let slot = item.slot.index();
        let gained = item.bonuses;
        let previous = creature.equipment[slot];
        let lost = previous
            .and_then(|id| self.items.get(&id))
            .map(|i| i.bonuses)
            .unwrap_or_default();

        if let Some(c) = self.creatures.get_mut(&owner) {
            c.equipment[slot] = Some(item_id);
            c.inventory[inventory_slot] = previous;
            c.life = (c.life + gained.max_life - lost.max_life).max(1);
            c.stamina = (c.stamina + gained.max_stamina - lost.max_stamina).max(0);
        }
        Ok(())
    }

    /// Move an equipped item into the first free inventory slot, removing its
    /// max-life and max-stamina bonuses from current life and stamina (life
    /// stays at least 1).
    pub fn unequip(&mut self, owner: NetworkId, slot: EquipSlot) -> Result<(), SpatialError> {
        let creature = self
            .creatures
            .get(&owner)
            .filter(|c| c.is_alive())
            .ok_or(SpatialError::UnknownCreature(owner))?;
        let Some(item_id) = creature.equipment[slot.index()] else {
            return Ok(());
        };
        let free = creature
            .first_free_inventory_slot()
            .ok_or(SpatialError::InventoryFull(owner))?;
        let lost = self
            .items
            .get(&item_id)
            .map(|i| i.bonuses)
            .unwrap_or_default();
        if let Some(c) = self.creatures.get_mut(&owner) {
            c.equipment[slot.index()] = None;
            c.inventory[free] = Some(item_id);
            c.life = (c.life - lost.max_life).max(1);
            c.stamina = (c.stamina - lost.max_stamina).max(0);
        }
        Ok(())
    }

    /// Breadth-first search outward from `from` (N, E, S, W expansion order)
    /// for the nearest cell a creature could be placed on.
    pub fn nearest_free_tile(&self, from: GridPoint) -> Option<GridPoint> {
        let start = self.index(from)?;
        let mut seen = vec![false; self.tiles.len()];
        let mut queue = VecDeque::new();
        seen[start] = true;
        queue.push_back(from);
        while let Some(p) = queue.pop_front() {
            if self.is_free(p) {
                return Some(p);
            }
            for n in p.neighbors4() {
                if let Some(i) = self.index(n) {
                    if !seen[i] {
                        seen[i] = true;
                        queue.push_back(n);
                    }
                }
            }
        }
        None
    }

    // -----------------------------------------------------------------------
    // Consistency checking
    // -----------------------------------------------------------------------

    /// Describe every broken spatial invariant. Empty means consistent.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for c in self.creatures.values().filter(|c| c.is_alive()) {
            if self.creature_id_at(c.position) != Some(c.id) {
                problems.push(format!("{} at {} is not in the grid index", c.id, c.position));
            }
        }
        for (i, cell) in self.creature_index.iter().enumerate() {
            if let Some(id) = cell {
                let p = GridPoint::new(
                    (i % self.width as usize) as i32,
                    (i / self.width as usize) as i32,
                );
                match self.living(*id) {
                    Some(c) if c.position == p => {}
                    _ => problems.push(format!("grid index at {p} holds stale {id}")),
                }
            }
        }

        let mut holders: BTreeMap<NetworkId, usize> = BTreeMap::new();
        for pile in &self.item_index {
            for id in pile {
                *holders.entry(*id).or_default() += 1;
            }
        }
        for c in self.creatures.values() {
            for id in c.equipment.iter().chain(c.inventory.iter()).flatten() {
                *holders.entry(*id).or_default() += 1;
            }
        }
        for item in self.items.values() {
            let count = holders.get(&item.id).copied().unwrap_or(0);
            if count != 1 {
                problems.push(format!("item {} has {count} holders", item.id));
            }
            let in_pile = self.items_at(item.position).contains(&item.id);
            if item.on_ground != in_pile {
                problems.push(format!(
                    "item {} on_ground={} but in_pile={in_pile}",
                    item.id, item.on_ground
                ));
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelPoint;

    fn floor(width: i32, height: i32) -> World {
        let mut world = World::new(width, height, 64.0);
        for x in 0..width {
            for y in 0..height {
                world.set_tile(GridPoint::new(x, y), "Floor").unwrap();
            }
        }
        world
    }

    fn creature(world: &mut World, at: GridPoint, is_player_team: bool) -> NetworkId {
        let id = world.alloc_id();
        world
            .place_creature(Creature {
                id,
                name: "Dummy".into(),
                position: at,
                pixel: PixelPoint::default(),
                life: 10,
                stamina: 5,
                stats: StatBlock {
                    max_life: 10,
                    max_stamina: 5,
                    ..StatBlock::default()
                },
                equipment: [None; EQUIPMENT_SLOTS],
                inventory: [None; INVENTORY_SIZE],
                innate_skills: vec!["Basic Attack".into()],
                is_player_team,
                is_activated: false,
                dead: false,
            })
            .unwrap()
    }

    fn item(world: &mut World, at: GridPoint, slot: EquipSlot, life_bonus: i32) -> NetworkId {
        let id = world.alloc_id();
        world
            .place_ground_item(Item {
                id,
                name: "Thing".into(),
                slot,
                position: at,
                on_ground: true,
                requirements: StatBlock::default(),
                bonuses: StatBlock {
                    max_life: life_bonus,
                    ..StatBlock::default()
                },
                extended_reach: false,
                skills: vec![],
            })
            .unwrap()
    }

    #[test]
    fn lookups_out_of_bounds_are_none() {
        let world = floor(4, 4);
        for p in [GridPoint::new(-1, 0), GridPoint::new(0, 4), GridPoint::new(9, 9)] {
            assert!(world.tile_at(p).is_none());
            assert!(world.creature_at(p).is_none());
            assert!(world.items_at(p).is_empty());
        }
        assert!(world.tile_at(GridPoint::new(3, 3)).is_some());
    }

    #[test]
    fn ids_are_monotonic_from_one() {
        let mut world = World::new(1, 1, 64.0);
        assert_eq!(world.alloc_id(), NetworkId(1));
        assert_eq!(world.alloc_id(), NetworkId(2));
    }

    #[test]
    fn place_rejects_void_and_occupied_cells() {
        let mut world = World::new(3, 3, 64.0);
        world.set_tile(GridPoint::new(1, 1), "Floor").unwrap();
        creature(&mut world, GridPoint::new(1, 1), true);

        let id = world.alloc_id();
        let mut c = world.creature_at(GridPoint::new(1, 1)).unwrap().clone();
        c.id = id;
        assert!(matches!(
            world.place_creature(c.clone()),
            Err(SpatialError::Occupied { .. })
        ));
        c.position = GridPoint::new(0, 0);
        assert_eq!(
            world.place_creature(c.clone()),
            Err(SpatialError::NoTile(GridPoint::new(0, 0)))
        );
        c.position = GridPoint::new(5, 0);
        assert_eq!(
            world.place_creature(c),
            Err(SpatialError::OutOfBounds(GridPoint::new(5, 0)))
        );
    }

    #[test]
    fn relocate_moves_index_entry() {
        let mut world = floor(5, 5);
        let id = creature(&mut world, GridPoint::new(1, 1), true);
        world.relocate_creature(id, GridPoint::new(3, 2)).unwrap();
        assert!(world.creature_at(GridPoint::new(1, 1)).is_none());
        assert_eq!(world.creature_id_at(GridPoint::new(3, 2)), Some(id));
        assert_eq!(world.creature(id).unwrap().pixel, PixelPoint { x: 192.0, y: 128.0 });
        assert!(world.invariant_violations().is_empty());
    }

    #[test]
    fn death_spills_carried_items() {
        let mut world = floor(5, 5);
        let at = GridPoint::new(2, 2);
        let id = creature(&mut world, at, false);
        let sword = item(&mut world, GridPoint::new(2, 3), EquipSlot::Weapon, 0);
        let ring = item(&mut world, GridPoint::new(2, 3), EquipSlot::Accessory, 0);
        world.pick_item(sword, id).unwrap();
        world.pick_item(ring, id).unwrap();
        world.equip(id, 0).unwrap();

        world.remove_creature(id).unwrap();
        assert!(world.creature_at(at).is_none());
        assert!(world.creature(id).unwrap().dead);
        let mut pile = world.items_at(at).to_vec();
        pile.sort();
        assert_eq!(pile, vec![sword, ring]);
        assert!(world.item(sword).unwrap().on_ground);
        assert!(world.invariant_violations().is_empty());
        assert!(world.remove_creature(id).is_err());
    }

    #[test]
    fn pick_item_moves_from_pile_to_inventory() {
        let mut world = floor(4, 4);
        let id = creature(&mut world, GridPoint::new(1, 1), true);
        let thing = item(&mut world, GridPoint::new(1, 1), EquipSlot::Helm, 0);
        assert_eq!(world.pick_item(thing, id), Ok(0));
        assert!(world.items_at(GridPoint::new(1, 1)).is_empty());
        assert!(!world.item(thing).unwrap().on_ground);
        assert_eq!(
            world.pick_item(thing, id),
            Err(SpatialError::NotOnGround(thing))
        );
        assert!(world.invariant_violations().is_empty());
    }

    #[test]
    fn pick_item_with_full_inventory_leaves_item_on_ground() {
        let mut world = floor(4, 4);
        let id = creature(&mut world, GridPoint::new(1, 1), true);
        for _ in 0..INVENTORY_SIZE {
            let filler = item(&mut world, GridPoint::new(1, 1), EquipSlot::Helm, 0);
            world.pick_item(filler, id).unwrap();
        }
        let extra = item(&mut world, GridPoint::new(1, 1), EquipSlot::Helm, 0);
        assert_eq!(world.pick_item(extra, id), Err(SpatialError::InventoryFull(id)));
        assert_eq!(world.items_at(GridPoint::new(1, 1)), &[extra]);
        assert!(world.invariant_violations().is_empty());
    }

    #[test]
    fn equip_then_unequip_is_life_neutral() {
        let mut world = floor(4, 4);
        let id = creature(&mut world, GridPoint::new(1, 1), true);
        let armor = item(&mut world, GridPoint::new(1, 1), EquipSlot::Armor, 10);
        world.pick_item(armor, id).unwrap();
        let before = world.creature(id).unwrap().life;

        world.equip(id, 0).unwrap();
        assert_eq!(world.creature(id).unwrap().life, before + 10);
        assert_eq!(world.effective_stats(id).unwrap().max_life, 20);

        world.unequip(id, EquipSlot::Armor).unwrap();
        assert_eq!(world.creature(id).unwrap().life, before);
        assert_eq!(world.effective_stats(id).unwrap().max_life, 10);
        assert!(world.invariant_violations().is_empty());
    }

    #[test]
    fn unequip_never_drops_life_below_one() {
        let mut world = floor(4, 4);
        let id = creature(&mut world, GridPoint::new(1, 1), true);
        let armor = item(&mut world, GridPoint::new(1, 1), EquipSlot::Armor, 10);
        world.pick_item(armor, id).unwrap();
        world.equip(id, 0).unwrap();
        world.creature_mut(id).unwrap().life = 4;

        world.unequip(id, EquipSlot::Armor).unwrap();
        let c = world.creature(id).unwrap();
        assert_eq!(c.life, 1);
        assert!(c.is_alive());
        assert_eq!(world.creature_id_at(GridPoint::new(1, 1)), Some(id));
        assert!(world.invariant_violations().is_empty());
    }

    #[test]
    fn equip_swap_accounts_for_both_items() {
        let mut world = floor(4, 4);
        let id = creature(&mut world, GridPoint::new(1, 1), true);
        let light = item(&mut world, GridPoint::new(1, 1), EquipSlot::Armor, 5);
        let heavy = item(&mut world, GridPoint::new(1, 1), EquipSlot::Armor, 12);
        world.pick_item(light, id).unwrap();
        world.pick_item(heavy, id).unwrap();
        world.equip(id, 0).unwrap();
        world.equip(id, 1).unwrap();

        let c = world.creature(id).unwrap();
        assert_eq!(c.life, 10 + 12);
        assert_eq!(c.equipment[EquipSlot::Armor.index()], Some(heavy));
        assert_eq!(c.inventory[1], Some(light));
        assert!(world.invariant_violations().is_empty());
    }

    #[test]
    fn nearest_free_tile_skips_occupied_cells() {
        let mut world = floor(5, 5);
        let at = GridPoint::new(2, 2);
        creature(&mut world, at, false);
        assert_eq!(world.nearest_free_tile(at), Some(GridPoint::new(2, 1)));
        assert_eq!(
            world.nearest_free_tile(GridPoint::new(0, 0)),
            Some(GridPoint::new(0, 0))
        );
        assert_eq!(world.nearest_free_tile(GridPoint::new(-3, 0)), None);
    }
}
