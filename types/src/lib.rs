//! Shared configuration types for OSSUS.
//!
//! These types are serde-friendly so host applications can persist them
//! however they like; the core only reads them.

use serde::{Deserialize, Serialize};

/// Tunables for the combat segmenter state machine.
///
/// The inactivity timeout and grace windows vary by game patch and player
/// taste, so they are configuration rather than constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Seconds of damage/heal silence before an open encounter is closed.
    #[serde(default = "default_combat_timeout_secs")]
    pub combat_timeout_secs: i64,
    /// Milliseconds after combat exit during which trailing damage is still
    /// attributed to the ending encounter (DoT ticks, delayed projectiles).
    #[serde(default = "default_post_combat_grace_ms")]
    pub post_combat_grace_ms: i64,
}

fn default_combat_timeout_secs() -> i64 {
    60
}

fn default_post_combat_grace_ms() -> i64 {
    5000
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            combat_timeout_secs: default_combat_timeout_secs(),
            post_combat_grace_ms: default_post_combat_grace_ms(),
        }
    }
}

/// A boss encounter definition: which NPC class ids belong to the fight and
/// which HP-threshold phases it has.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BossDefinition {
    /// Display name, e.g. "Dread Master Bestia"
    pub name: String,
    /// Area this boss lives in (0 = any)
    #[serde(default)]
    pub area_id: i64,
    /// NPC class/template ids that trigger detection of this encounter
    pub npc_ids: Vec<i64>,
    /// Phase definitions, evaluated in order
    #[serde(default)]
    pub phases: Vec<PhaseDefinition>,
}

impl BossDefinition {
    /// Whether an NPC class id belongs to this definition.
    pub fn matches(&self, npc_class_id: i64) -> bool {
        self.npc_ids.contains(&npc_class_id)
    }
}

/// A sub-segment of a boss fight keyed by a trigger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseDefinition {
    /// Stable id, e.g. "burn"
    pub id: String,
    /// Display name, e.g. "Burn Phase"
    #[serde(default)]
    pub name: String,
    /// Phase starts when the boss drops below this HP percentage
    #[serde(default)]
    pub starts_below_hp_pct: Option<f32>,
    /// Phase starts as soon as the boss encounter is detected
    #[serde(default)]
    pub on_combat_start: bool,
}
