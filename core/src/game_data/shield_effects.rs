//! Absorb-shield effect ids.
//!
//! These effects place a damage-absorbing bubble on their target; absorbed
//! damage while one is active is credited to the shield's caster.

use phf::phf_set;

pub static SHIELD_EFFECT_IDS: phf::Set<i64> = phf_set! {
    296333344505856i64,  // Static Barrier
    296337639473152i64,  // Force Armor
    814235355255040i64,  // Sonic Barrier
    814239650222336i64,  // Sonic Ward
    985226842996736i64,  // Power Screen
    3305254083756032i64, // Kolto Shell charge shield
};
