//! Boss and area lookups.
//!
//! A small built-in roster covers well-known encounters; hosts can extend it
//! at runtime from their own definition files (loading is their problem, not
//! ours).

use std::collections::HashSet;
use std::sync::{LazyLock, RwLock};

use phf::{phf_map, phf_set};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Operation,
    Flashpoint,
    LairBoss,
    TrainingDummy,
}

#[derive(Debug, Clone, Copy)]
pub struct BossInfo {
    pub boss: &'static str,
    pub content_type: ContentType,
}

static BUILTIN_BOSSES: phf::Map<i64, BossInfo> = phf_map! {
    // Dread Palace
    3273941900591104i64 => BossInfo { boss: "Dread Master Bestia", content_type: ContentType::Operation },
    3273946195558400i64 => BossInfo { boss: "Dread Master Tyrans", content_type: ContentType::Operation },
    3273950490525696i64 => BossInfo { boss: "Dread Master Calphayus", content_type: ContentType::Operation },
    3273954785492992i64 => BossInfo { boss: "Dread Master Raptus", content_type: ContentType::Operation },
    3273959080460288i64 => BossInfo { boss: "Dread Council", content_type: ContentType::Operation },
    // Fleet practice targets
    3315779098771456i64 => BossInfo { boss: "Operations Training Dummy", content_type: ContentType::TrainingDummy },
};

/// Warzone/arena area ids, used for PvP classification.
static PVP_AREA_IDS: phf::Set<i64> = phf_set! {
    137438990725i64, // Civil War
    137438991354i64, // Huttball
    137438992394i64, // Voidstar
    137438994441i64, // Odessen Proving Grounds
    137438995730i64, // Mandalorian Battle Ring
};

/// Runtime-registered boss class ids (from host-supplied definitions).
static RUNTIME_BOSS_IDS: LazyLock<RwLock<HashSet<i64>>> =
    LazyLock::new(|| RwLock::new(HashSet::new()));

/// Look up the built-in roster entry for an NPC class id.
pub fn lookup_boss(class_id: i64) -> Option<&'static BossInfo> {
    BUILTIN_BOSSES.get(&class_id)
}

/// Whether an NPC class id is a known boss (built-in or registered).
pub fn is_boss(class_id: i64) -> bool {
    if BUILTIN_BOSSES.contains_key(&class_id) {
        return true;
    }
    RUNTIME_BOSS_IDS
        .read()
        .map(|ids| ids.contains(&class_id))
        .unwrap_or(false)
}

/// Register additional boss class ids (e.g. from area definition files).
pub fn register_boss_ids(ids: &[i64]) {
    if let Ok(mut registry) = RUNTIME_BOSS_IDS.write() {
        registry.extend(ids.iter().copied());
    }
}

/// Clear runtime-registered boss ids (e.g. when leaving an instance).
pub fn clear_boss_registry() {
    if let Ok(mut registry) = RUNTIME_BOSS_IDS.write() {
        registry.clear();
    }
}

/// Whether an area id is a warzone/arena.
pub fn is_pvp_area(area_id: i64) -> bool {
    PVP_AREA_IDS.contains(&area_id)
}
