//! Class/discipline roster and role mapping.
//!
//! Discipline guids arrive in DisciplineChanged events; the role mapping is
//! what the threat and tank-detection logic actually consumes.

use phf::phf_map;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Tank,
    Healer,
    Dps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    Guardian,
    Juggernaut,
    Sentinel,
    Marauder,
    Sage,
    Sorcerer,
    Shadow,
    Assassin,
    Scoundrel,
    Operative,
    Gunslinger,
    Sniper,
    Commando,
    Mercenary,
    Vanguard,
    Powertech,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Discipline {
    // Guardian / Juggernaut
    Defense,
    Vigilance,
    Focus,
    Immortal,
    Vengeance,
    Rage,
    // Sentinel / Marauder
    Watchman,
    Combat,
    Concentration,
    Annihilation,
    Carnage,
    Fury,
    // Sage / Sorcerer
    Seer,
    Telekinetics,
    Balance,
    Corruption,
    Lightning,
    Madness,
    // Shadow / Assassin
    KineticCombat,
    Infiltration,
    Serenity,
    Darkness,
    Deception,
    Hatred,
    // Scoundrel / Operative
    Sawbones,
    Scrapper,
    Ruffian,
    Medicine,
    Concealment,
    Lethality,
    // Gunslinger / Sniper
    Sharpshooter,
    Saboteur,
    DirtyFighting,
    Marksmanship,
    Engineering,
    Virulence,
    // Commando / Mercenary
    CombatMedic,
    Gunnery,
    AssaultSpecialist,
    Bodyguard,
    Arsenal,
    InnovativeOrdnance,
    // Vanguard / Powertech
    ShieldSpecialist,
    Plasmatech,
    Tactics,
    ShieldTech,
    Pyrotech,
    AdvancedPrototype,
}

static DISCIPLINE_GUIDS: phf::Map<i64, Discipline> = phf_map! {
    2031339142381572i64 => Discipline::Defense,
    2031339142381576i64 => Discipline::Vigilance,
    2031339142381580i64 => Discipline::Focus,
    2031339142381584i64 => Discipline::Immortal,
    2031339142381588i64 => Discipline::Vengeance,
    2031339142381592i64 => Discipline::Rage,
    2031339142381596i64 => Discipline::Watchman,
    2031339142381600i64 => Discipline::Combat,
    2031339142381604i64 => Discipline::Concentration,
    2031339142381608i64 => Discipline::Annihilation,
    2031339142381612i64 => Discipline::Carnage,
    2031339142381616i64 => Discipline::Fury,
    2031339142381620i64 => Discipline::Seer,
    2031339142381624i64 => Discipline::Telekinetics,
    2031339142381628i64 => Discipline::Balance,
    2031339142381632i64 => Discipline::Corruption,
    2031339142381636i64 => Discipline::Lightning,
    2031339142381640i64 => Discipline::Madness,
    2031339142381644i64 => Discipline::KineticCombat,
    2031339142381648i64 => Discipline::Infiltration,
    2031339142381652i64 => Discipline::Serenity,
    2031339142381656i64 => Discipline::Darkness,
    2031339142381660i64 => Discipline::Deception,
    2031339142381664i64 => Discipline::Hatred,
    2031339142381668i64 => Discipline::Sawbones,
    2031339142381672i64 => Discipline::Scrapper,
    2031339142381676i64 => Discipline::Ruffian,
    2031339142381680i64 => Discipline::Medicine,
    2031339142381684i64 => Discipline::Concealment,
    2031339142381688i64 => Discipline::Lethality,
    2031339142381692i64 => Discipline::Sharpshooter,
    2031339142381696i64 => Discipline::Saboteur,
    2031339142381700i64 => Discipline::DirtyFighting,
    2031339142381704i64 => Discipline::Marksmanship,
    2031339142381708i64 => Discipline::Engineering,
    2031339142381712i64 => Discipline::Virulence,
    2031339142381716i64 => Discipline::CombatMedic,
    2031339142381720i64 => Discipline::Gunnery,
    2031339142381724i64 => Discipline::AssaultSpecialist,
    2031339142381728i64 => Discipline::Bodyguard,
    2031339142381732i64 => Discipline::Arsenal,
    2031339142381736i64 => Discipline::InnovativeOrdnance,
    2031339142381740i64 => Discipline::ShieldSpecialist,
    2031339142381744i64 => Discipline::Plasmatech,
    2031339142381748i64 => Discipline::Tactics,
    2031339142381752i64 => Discipline::ShieldTech,
    2031339142381756i64 => Discipline::Pyrotech,
    2031339142381760i64 => Discipline::AdvancedPrototype,
};

impl Discipline {
    pub fn from_guid(guid: i64) -> Option<Discipline> {
        DISCIPLINE_GUIDS.get(&guid).copied()
    }

    pub fn role(&self) -> Role {
        use Discipline::*;
        match self {
            Defense | Immortal | KineticCombat | Darkness | ShieldSpecialist | ShieldTech => {
                Role::Tank
            }
            Seer | Corruption | Sawbones | Medicine | CombatMedic | Bodyguard => Role::Healer,
            _ => Role::Dps,
        }
    }

    pub fn class(&self) -> Class {
        use Discipline::*;
        match self {
            Defense | Vigilance | Focus => Class::Guardian,
            Immortal | Vengeance | Rage => Class::Juggernaut,
            Watchman | Combat | Concentration => Class::Sentinel,
            Annihilation | Carnage | Fury => Class::Marauder,
            Seer | Telekinetics | Balance => Class::Sage,
            Corruption | Lightning | Madness => Class::Sorcerer,
            KineticCombat | Infiltration | Serenity => Class::Shadow,
            Darkness | Deception | Hatred => Class::Assassin,
            Sawbones | Scrapper | Ruffian => Class::Scoundrel,
            Medicine | Concealment | Lethality => Class::Operative,
            Sharpshooter | Saboteur | DirtyFighting => Class::Gunslinger,
            Marksmanship | Engineering | Virulence => Class::Sniper,
            CombatMedic | Gunnery | AssaultSpecialist => Class::Commando,
            Bodyguard | Arsenal | InnovativeOrdnance => Class::Mercenary,
            ShieldSpecialist | Plasmatech | Tactics => Class::Vanguard,
            ShieldTech | Pyrotech | AdvancedPrototype => Class::Powertech,
        }
    }
}
