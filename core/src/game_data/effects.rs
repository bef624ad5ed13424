//! Combat log wire-format ids (7.0 client).
//!
//! These ids come straight out of the log text and must match it exactly;
//! every downstream detector (death recap, boss combat, revive handling)
//! keys off them.

/// Effect type ids - the first `{...}` pair of the effect field.
pub mod effect_type_id {
    pub const EVENT: i64 = 836045448945472;
    pub const SPEND: i64 = 836045448945473;
    pub const MODIFYCHARGES: i64 = 836045448945474;
    pub const RESTORE: i64 = 836045448945476;
    pub const APPLYEFFECT: i64 = 836045448945477;
    pub const REMOVEEFFECT: i64 = 836045448945478;
    pub const AREAENTERED: i64 = 836045448953664;
    pub const DISCIPLINECHANGED: i64 = 836045448953665;
}

/// Effect ids - the second `{...}` pair of the effect field.
pub mod effect_id {
    pub const ABILITYACTIVATE: i64 = 836045448945479;
    pub const ABILITYDEACTIVATE: i64 = 836045448945480;
    pub const ABILITYCANCEL: i64 = 836045448945481;
    pub const ABILITYINTERRUPT: i64 = 836045448945482;
    pub const MODIFYTHREAT: i64 = 836045448945483;
    pub const TAUNT: i64 = 836045448945488;
    pub const ENTERCOMBAT: i64 = 836045448945489;
    pub const EXITCOMBAT: i64 = 836045448945490;
    pub const DEATH: i64 = 836045448945493;
    pub const REVIVED: i64 = 836045448945494;
    pub const HEAL: i64 = 836045448945500;
    pub const DAMAGE: i64 = 836045448945501;
    pub const TARGETSET: i64 = 836045448953668;
    pub const TARGETCLEARED: i64 = 836045448953669;

    /// Buff applied while a character sits in a conversation.
    pub const IN_CONVERSATION: i64 = 806968520343876;
    /// Post-revive immortality buff on the local player.
    pub const RECENTLY_REVIVED: i64 = 806989887832064;
    /// Environmental falling damage "ability".
    pub const FALLING_DAMAGE: i64 = 973870949466112;
}

/// Defense/mitigation ids - the `{...}` after a `-word` marker in a damage
/// value segment.
pub mod defense_type {
    pub const MISS: i64 = 836045448945502;
    pub const PARRY: i64 = 836045448945503;
    pub const DODGE: i64 = 836045448945505;
    pub const IMMUNE: i64 = 836045448945506;
    pub const RESIST: i64 = 836045448945507;
    pub const DEFLECT: i64 = 836045448945508;
    pub const SHIELD: i64 = 836045448945509;
    pub const COVER: i64 = 836045448945510;
    pub const ABSORBED: i64 = 836045448945511;
    pub const REFLECTED: i64 = 836045448953649;
}

/// Readable label for a defense/mitigation id, as shown in value displays.
pub const fn defense_type_label(id: i64) -> &'static str {
    match id {
        defense_type::MISS => "miss",
        defense_type::PARRY => "parry",
        defense_type::DODGE => "dodge",
        defense_type::IMMUNE => "immune",
        defense_type::RESIST => "resist",
        defense_type::DEFLECT => "deflect",
        defense_type::SHIELD => "shield",
        defense_type::COVER => "cover",
        defense_type::ABSORBED => "absorbed",
        defense_type::REFLECTED => "reflected",
        _ => "",
    }
}
