//! Effect application bookkeeping.
//!
//! Tracks which effects are active on which entities so absorbed damage can
//! be credited to the shield's caster rather than the victim.

use chrono::NaiveDateTime;

#[derive(Debug, Clone)]
pub struct EffectInstance {
    pub effect_id: i64,
    pub source_id: i64,
    pub target_id: i64,
    pub applied_at: NaiveDateTime,
    pub is_shield: bool,
    pub removed_at: Option<NaiveDateTime>,
}

impl EffectInstance {
    pub fn is_active(&self) -> bool {
        self.removed_at.is_none()
    }
}
