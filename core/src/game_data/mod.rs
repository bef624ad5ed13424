mod bosses;
mod discipline;
mod effects;
mod shield_effects;

pub use bosses::{
    BossInfo, ContentType, clear_boss_registry, is_boss, is_pvp_area, lookup_boss,
    register_boss_ids,
};
pub use discipline::{Class, Discipline, Role};
pub use effects::*;
pub use shield_effects::SHIELD_EFFECT_IDS;
