// Static game data: creature, item, and skill definitions keyed by name.
//
// `GameData` is loaded once before a session starts (from JSON, or the
// built-in `Default` set) and then only read. Event application and the skill
// resolver look definitions up by name; events never carry stats, only names
// and ids, so every replica must load the same data.
//
// The JSON file holds three arrays:
//
//   { "creatures": [ {name, stats, skills, starting_items}, ... ],
//     "items":     [ {name, slot, skills, requirements, bonuses, extended_reach}, ... ],
//     "skills":    [ {name, min_range, max_range, damage, stamina_cost,
//                     damage_bonuses, effects, tags, targets_ground}, ... ] }
//
// Loading rejects duplicate names and references to undefined skills/items,
// so a lookup miss at runtime always means a stale or hostile event rather
// than a data bug.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entity::{EquipSlot, StatBlock};
use crate::error::DataError;

/// Every creature knows this skill in addition to its listed ones.
pub const BASIC_ATTACK: &str = "Basic Attack";

// ---------------------------------------------------------------------------
// Skill definitions
// ---------------------------------------------------------------------------

/// Extra cells a skill hits beyond its direct target. Effects compose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkillEffect {
    /// The two cells perpendicular to the actor→target axis.
    Cleave,
    /// The full square of the given radius around the target.
    Aoe { radius: i32 },
    /// Cells continuing past the target, away from the actor.
    Pierce { distance: i32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillTag {
    Melee,
    Spell,
}

/// Per-point damage scaling from the actor's effective stats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatScaling {
    pub str: f64,
    pub dex: f64,
    pub int: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkillDef {
    pub name: String,
    pub min_range: u32,
    pub max_range: u32,
    #[serde(default)]
    pub targets_ground: bool,
    pub damage: i32,
    #[serde(default)]
    pub stamina_cost: i32,
    #[serde(default)]
    pub damage_bonuses: StatScaling,
    #[serde(default)]
    pub effects: Vec<SkillEffect>,
    #[serde(default)]
    pub tags: Vec<SkillTag>,
}

impl SkillDef {
    pub fn has_tag(&self, tag: SkillTag) -> bool {
        self.tags.contains(&tag)
    }
}

// ---------------------------------------------------------------------------
// Creature / item definitions
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatureDef {
    pub name: String,
    pub stats: StatBlock,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Items created and equipped when the creature spawns.
    #[serde(default)]
    pub starting_items: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub name: String,
    pub slot: EquipSlot,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub requirements: StatBlock,
    #[serde(default)]
    pub bonuses: StatBlock,
    #[serde(default)]
    pub extended_reach: bool,
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawGameData {
    #[serde(default)]
    creatures: Vec<CreatureDef>,
    #[serde(default)]
    items: Vec<ItemDef>,
    #[serde(default)]
    skills: Vec<SkillDef>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GameData {
    creatures: BTreeMap<String, CreatureDef>,
    items: BTreeMap<String, ItemDef>,
    skills: BTreeMap<String, SkillDef>,
}

impl GameData {
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let raw: RawGameData = serde_json::from_str(json)?;
        Self::from_defs(raw.creatures, raw.items, raw.skills)
    }

    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Build the tables, rejecting duplicate names and dangling references.
    pub fn from_defs(
        creatures: Vec<CreatureDef>,
        items: Vec<ItemDef>,
        skills: Vec<SkillDef>,
    ) -> Result<Self, DataError> {
        let skills = index_by_name("skill", skills, |s| &s.name)?;
        let items = index_by_name("item", items, |i| &i.name)?;
        let creatures = index_by_name("creature", creatures, |c| &c.name)?;

        if !skills.contains_key(BASIC_ATTACK) {
            return Err(DataError::UnknownSkill {
                owner: "every creature".into(),
                skill: BASIC_ATTACK.into(),
            });
        }
        for item in items.values() {
            check_skills(&skills, &item.name, &item.skills)?;
        }
        for creature in creatures.values() {
            check_skills(&skills, &creature.name, &creature.skills)?;
            for item in &creature.starting_items {
                if !items.contains_key(item) {
                    return Err(DataError::UnknownItem {
                        owner: creature.name.clone(),
                        item: item.clone(),
                    });
                }
            }
        }

        Ok(Self {
            creatures,
            items,
            skills,
        })
    }

    pub fn creature(&self, name: &str) -> Option<&CreatureDef> {
        self.creatures.get(name)
    }

    pub fn item(&self, name: &str) -> Option<&ItemDef> {
        self.items.get(name)
    }

    pub fn skill(&self, name: &str) -> Option<&SkillDef> {
        self.skills.get(name)
    }
}

fn index_by_name<T>(
    kind: &'static str,
    defs: Vec<T>,
    name: impl Fn(&T) -> &String,
) -> Result<BTreeMap<String, T>, DataError> {
    let mut map = BTreeMap::new();
    for def in defs {
        let key = name(&def).clone();
        if map.contains_key(&key) {
            return Err(DataError::Duplicate { kind, name: key });
        }
        map.insert(key, def);
    }
    Ok(map)
}

fn check_skills(
    skills: &BTreeMap<String, SkillDef>,
    owner: &str,
    names: &[String],
) -> Result<(), DataError> {
    match names.iter().find(|s| !skills.contains_key(*s)) {
        Some(missing) => Err(DataError::UnknownSkill {
            owner: owner.to_string(),
            skill: missing.clone(),
        }),
        None => Ok(()),
    }
}

impl Default for GameData {
    fn default() -> Self {
        let skills = vec![
            SkillDef {
                name: BASIC_ATTACK.into(),
                min_range: 1,
                max_range: 1,
                targets_ground: false,
                damage: 3,
                stamina_cost: 0,
                damage_bonuses: StatScaling {
                    str: 0.5,
                    ..StatScaling::default()
                },
                effects: vec![],
                tags: vec![SkillTag::Melee],
            },
            SkillDef {
                name: "Cleave".into(),
                min_range: 1,
                max_range: 1,
                targets_ground: false,
                damage: 4,
                stamina_cost: 3,
                damage_bonuses: StatScaling {
                    str: 0.5,
                    ..StatScaling::default()
                },
                effects: vec![SkillEffect::Cleave],
                tags: vec![SkillTag::Melee],
            },
            SkillDef {
                name: "Fireball".into(),
                min_range: 2,
                max_range: 5,
                targets_ground: true,
                damage: 5,
                stamina_cost: 5,
                damage_bonuses: StatScaling {
                    int: 0.5,
                    ..StatScaling::default()
                },
                effects: vec![SkillEffect::Aoe { radius: 1 }],
                tags: vec![SkillTag::Spell],
            },
            SkillDef {
                name: "Lance".into(),
                min_range: 1,
                max_range: 1,
                targets_ground: false,
                damage: 4,
                stamina_cost: 2,
                damage_bonuses: StatScaling {
                    dex: 0.5,
                    ..StatScaling::default()
                },
                effects: vec![SkillEffect::Pierce { distance: 2 }],
                tags: vec![SkillTag::Melee],
            },
        ];

        let items = vec![
            ItemDef {
                name: "Sapphire Staff".into(),
                slot: EquipSlot::Weapon,
                skills: vec!["Fireball".into()],
                requirements: StatBlock {
                    intelligence: 3,
                    ..StatBlock::default()
                },
                bonuses: StatBlock {
                    intelligence: 3,
                    max_stamina: 5,
                    ..StatBlock::default()
                },
                extended_reach: false,
            },
            ItemDef {
                name: "Leather Armor".into(),
                slot: EquipSlot::Armor,
                skills: vec![],
                requirements: StatBlock::default(),
                bonuses: StatBlock {
                    max_life: 10,
                    ..StatBlock::default()
                },
                extended_reach: false,
            },
            ItemDef {
                name: "Rusty Spear".into(),
                slot: EquipSlot::Weapon,
                skills: vec!["Lance".into()],
                requirements: StatBlock::default(),
                bonuses: StatBlock {
                    strength: 1,
                    ..StatBlock::default()
                },
                extended_reach: true,
            },
        ];

        let creatures = vec![
            CreatureDef {
                name: "Player".into(),
                stats: StatBlock {
                    movement: 4,
                    max_life: 30,
                    strength: 5,
                    dexterity: 5,
                    intelligence: 5,
                    max_stamina: 10,
                    stamina_regen: 2,
                },
                skills: vec!["Cleave".into()],
                starting_items: vec![],
            },
            CreatureDef {
                name: "Goblin".into(),
                stats: StatBlock {
                    movement: 3,
                    max_life: 10,
                    strength: 3,
                    dexterity: 4,
                    intelligence: 1,
                    max_stamina: 4,
                    stamina_regen: 1,
                },
                skills: vec![],
                starting_items: vec![],
            },
            CreatureDef {
                name: "Skeleton".into(),
                stats: StatBlock {
                    movement: 2,
                    max_life: 14,
                    strength: 4,
                    dexterity: 2,
                    intelligence: 0,
                    max_stamina: 4,
                    stamina_regen: 1,
                },
                skills: vec![],
                starting_items: vec!["Rusty Spear".into()],
            },
        ];

        // The built-in tables are checked by `default_data_is_valid`.
        Self {
            creatures: creatures.into_iter().map(|c| (c.name.clone(), c)).collect(),
            items: items.into_iter().map(|i| (i.name.clone(), i)).collect(),
            skills: skills.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_data_is_valid() {
        let data = GameData::default();
        let rebuilt = GameData::from_defs(
            data.creatures.values().cloned().collect(),
            data.items.values().cloned().collect(),
            data.skills.values().cloned().collect(),
        )
        .unwrap();
        assert_eq!(rebuilt, data);
    }

    #[test]
    fn loads_from_json() {
        let json = r#"{
            "skills": [
                { "name": "Basic Attack", "min_range": 1, "max_range": 1, "damage": 2 },
                { "name": "Smite", "min_range": 1, "max_range": 3, "damage": 7,
                  "stamina_cost": 4, "damage_bonuses": { "int": 1.5 },
                  "effects": [ { "kind": "aoe", "radius": 2 }, { "kind": "cleave" } ] }
            ],
            "items": [
                { "name": "Mace", "slot": "weapon", "skills": ["Smite"],
                  "bonuses": { "strength": 2 } }
            ],
            "creatures": [
                { "name": "Cleric", "stats": { "movement": 3, "max_life": 20 },
                  "starting_items": ["Mace"] }
            ]
        }"#;
        let data = GameData::from_json(json).unwrap();
        let smite = data.skill("Smite").unwrap();
        assert_eq!(smite.damage_bonuses.int, 1.5);
        assert_eq!(
            smite.effects,
            vec![SkillEffect::Aoe { radius: 2 }, SkillEffect::Cleave]
        );
        assert_eq!(data.item("Mace").unwrap().bonuses.strength, 2);
        assert_eq!(data.creature("Cleric").unwrap().stats.max_life, 20);
        assert!(data.creature("Goblin").is_none());
    }

    #[test]
    fn rejects_duplicate_names() {
        let json = r#"{ "skills": [
            { "name": "Basic Attack", "min_range": 1, "max_range": 1, "damage": 2 },
            { "name": "Basic Attack", "min_range": 1, "max_range": 1, "damage": 3 }
        ] }"#;
        assert!(matches!(
            GameData::from_json(json),
            Err(DataError::Duplicate { kind: "skill", .. })
        ));
    }

    #[test]
    fn rejects_dangling_references() {
        let json = r#"{
            "skills": [ { "name": "Basic Attack", "min_range": 1, "max_range": 1, "damage": 2 } ],
            "creatures": [ { "name": "Rat", "stats": {}, "starting_items": ["Cheese"] } ]
        }"#;
        assert!(matches!(
            GameData::from_json(json),
            Err(DataError::UnknownItem { .. })
        ));

        let json = r#"{
            "skills": [ { "name": "Basic Attack", "min_range": 1, "max_range": 1, "damage": 2 } ],
            "items": [ { "name": "Wand", "slot": "weapon", "skills": ["Zap"] } ]
        }"#;
        assert!(matches!(
            GameData::from_json(json),
            Err(DataError::UnknownSkill { .. })
        ));
    }

    #[test]
    fn requires_basic_attack() {
        assert!(matches!(
            GameData::from_json("{}"),
            Err(DataError::UnknownSkill { .. })
        ));
    }
}
