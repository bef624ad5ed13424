//! Combat log decoding: one raw line in, one typed event out.

pub mod parser;
pub mod rectifier;
pub mod tokenizer;

pub use parser::{LogParser, MalformedKind, MalformedLine};
pub use rectifier::rectify;

use chrono::NaiveDateTime;

use crate::context::{IStr, empty_istr, resolve};
use crate::game_data::{SHIELD_EFFECT_IDS, defense_type_label, effect_id, effect_type_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityType {
    Player,
    Npc,
    Companion,
    #[default]
    Empty,
    SelfReference,
}

/// World position at the moment the line was written.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub facing: f32,
}

/// A participant as it appears on one log line.
///
/// Identity is the raw log id alone; names can differ across sightings of
/// the same id (localization artifacts), so they never participate in
/// equality.
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: IStr,
    pub class_id: i64,
    pub log_id: i64,
    pub entity_type: EntityType,
    pub health: (i32, i32),
    pub position: Position,
}

impl Default for Entity {
    fn default() -> Self {
        Self {
            name: empty_istr(),
            class_id: 0,
            log_id: 0,
            entity_type: EntityType::default(),
            health: (0, 0),
            position: Position::default(),
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.log_id == other.log_id
    }
}

impl Eq for Entity {}

impl std::hash::Hash for Entity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.log_id.hash(state);
    }
}

#[derive(Debug, Clone)]
pub struct Action {
    pub name: IStr,
    pub action_id: i64,
}

impl Default for Action {
    fn default() -> Self {
        Self {
            name: empty_istr(),
            action_id: 0,
        }
    }
}

/// The decoded effect field, flat as it sits on the wire.
#[derive(Debug, Clone)]
pub struct Effect {
    pub type_name: IStr,
    pub type_id: i64,
    pub effect_name: IStr,
    pub effect_id: i64,
    pub difficulty_name: IStr,
    pub difficulty_id: i64,
    pub discipline_name: IStr,
    pub discipline_id: i64,
}

impl Default for Effect {
    fn default() -> Self {
        Self {
            type_name: empty_istr(),
            type_id: 0,
            effect_name: empty_istr(),
            effect_id: 0,
            difficulty_name: empty_istr(),
            difficulty_id: 0,
            discipline_name: empty_istr(),
            discipline_id: 0,
        }
    }
}

/// Closed classification of effect kinds, so downstream routing is an
/// exhaustive match instead of scattered id comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Apply,
    Remove,
    Event,
    Spend,
    Restore,
    ModifyCharges,
    AreaEntered,
    DisciplineChanged,
    TargetChanged,
    ModifyThreat,
    AbsorbShield,
    Unknown,
}

impl Effect {
    pub fn kind(&self) -> EffectKind {
        match self.type_id {
            // Applying a known absorb bubble is its own kind; absorbed
            // damage later credits the bubble's caster
            effect_type_id::APPLYEFFECT if SHIELD_EFFECT_IDS.contains(&self.effect_id) => {
                EffectKind::AbsorbShield
            }
            effect_type_id::APPLYEFFECT => EffectKind::Apply,
            effect_type_id::REMOVEEFFECT => EffectKind::Remove,
            effect_type_id::EVENT => match self.effect_id {
                effect_id::TARGETSET | effect_id::TARGETCLEARED => EffectKind::TargetChanged,
                effect_id::MODIFYTHREAT => EffectKind::ModifyThreat,
                _ => EffectKind::Event,
            },
            effect_type_id::SPEND => EffectKind::Spend,
            effect_type_id::RESTORE => EffectKind::Restore,
            effect_type_id::MODIFYCHARGES => EffectKind::ModifyCharges,
            effect_type_id::AREAENTERED => EffectKind::AreaEntered,
            effect_type_id::DISCIPLINECHANGED => EffectKind::DisciplineChanged,
            _ => EffectKind::Unknown,
        }
    }
}

/// The decoded value segment of a line.
#[derive(Debug, Clone)]
pub struct Details {
    pub dmg_amount: i32,
    pub dmg_effective: i32,
    pub dmg_absorbed: i32,
    pub dmg_type: IStr,
    pub dmg_type_id: i64,
    pub defense_type_id: i64,
    pub is_crit: bool,
    pub is_reflect: bool,
    pub heal_amount: i32,
    pub heal_effective: i32,
    pub threat: f32,
    pub charges: i32,
    pub ability_id: i64,
    pub spend: f32,
}

impl Default for Details {
    fn default() -> Self {
        Self {
            dmg_amount: 0,
            dmg_effective: 0,
            dmg_absorbed: 0,
            dmg_type: empty_istr(),
            dmg_type_id: 0,
            defense_type_id: 0,
            is_crit: false,
            is_reflect: false,
            heal_amount: 0,
            heal_effective: 0,
            threat: 0.0,
            charges: 0,
            ability_id: 0,
            spend: 0.0,
        }
    }
}

impl Details {
    /// Human-readable rendering of the value segment, e.g.
    /// `3562* kinetic (1691 absorbed)`.
    pub fn display(&self) -> String {
        let mut out = String::new();
        if self.dmg_amount > 0 || self.defense_type_id != 0 {
            out.push_str(&self.dmg_amount.to_string());
            if self.is_crit {
                out.push('*');
            }
            let dmg_type = resolve(self.dmg_type);
            if !dmg_type.is_empty() {
                out.push(' ');
                out.push_str(dmg_type);
            }
            let defense = defense_type_label(self.defense_type_id);
            if !defense.is_empty() {
                out.push_str(" -");
                out.push_str(defense);
            }
            if self.dmg_absorbed > 0 {
                out.push_str(&format!(" ({} absorbed)", self.dmg_absorbed));
            }
        } else if self.heal_amount > 0 {
            out.push_str(&self.heal_amount.to_string());
            if self.is_crit {
                out.push('*');
            }
        } else if self.charges > 0 {
            out.push_str(&format!("{} charges", self.charges));
        } else if self.spend != 0.0 {
            out.push_str(&self.spend.to_string());
        }
        out
    }
}

/// One fully decoded log line.
///
/// Events are immutable once parsed, with one exception: the owning
/// encounter back-fills `combat_time_secs` when its start time is known.
#[derive(Debug, Clone)]
pub struct CombatEvent {
    pub line_number: u64,
    pub timestamp: NaiveDateTime,
    pub source_entity: Entity,
    pub target_entity: Entity,
    pub action: Action,
    pub effect: Effect,
    pub details: Details,
    /// Seconds since the owning encounter's combat start.
    pub combat_time_secs: Option<f32>,
}
