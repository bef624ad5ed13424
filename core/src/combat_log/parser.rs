//! Line decoder for the 7.0 combat log format.
//!
//! Decoding is infallible from the caller's point of view: a line either
//! becomes a [`CombatEvent`] or a [`MalformedLine`] marker carrying a byte
//! length, so batch parsing survives corrupt lines and file cursors can
//! still advance.

use chrono::NaiveDateTime;
use memchr::{memchr, memchr_iter};
use thiserror::Error;

use super::tokenizer;
use super::{Action, CombatEvent, Details, Effect, Entity, EntityType, Position};
use crate::context::intern;
use crate::game_data::{effect_id, effect_type_id};

macro_rules! parse_i64 {
    ($s:expr) => {
        $s.trim().parse::<i64>().unwrap_or_default()
    };
}
macro_rules! parse_i32 {
    ($s:expr) => {
        $s.trim().parse::<i32>().unwrap_or_default()
    };
}

/// Why a line could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MalformedKind {
    #[error("incomplete line")]
    IncompleteLine,
}

/// A line that failed to decode.
///
/// `byte_len` is a best-effort estimate (content plus newline) so callers
/// can keep a file-position cursor moving past the bad line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line_number}: {kind} ({byte_len} bytes)")]
pub struct MalformedLine {
    pub line_number: u64,
    pub byte_len: u64,
    pub kind: MalformedKind,
}

/// Stateless line decoder. Holds only the session date, which combines with
/// the time-of-day stamps on each line.
#[derive(Debug, Clone)]
pub struct LogParser {
    session_start: NaiveDateTime,
}

impl Default for LogParser {
    fn default() -> Self {
        Self {
            session_start: NaiveDateTime::UNIX_EPOCH,
        }
    }
}

impl LogParser {
    pub fn new(session_start: NaiveDateTime) -> Self {
        Self { session_start }
    }

    /// Decode one raw line. Failures are recovered locally and reported as
    /// an error value; this never panics on malformed input.
    pub fn parse_line(&self, line_number: u64, line: &str) -> Result<CombatEvent, MalformedLine> {
        match self.decode(line_number, line) {
            Some(event) => Ok(event),
            None => {
                tracing::debug!(line_number, "discarding malformed log line");
                Err(MalformedLine {
                    line_number,
                    byte_len: line.len() as u64 + 1,
                    kind: MalformedKind::IncompleteLine,
                })
            }
        }
    }

    fn decode(&self, line_number: u64, line: &str) -> Option<CombatEvent> {
        let (ts_field, rest) = tokenizer::next_field(line)?;
        let timestamp = self.parse_timestamp(ts_field)?;

        let (source_field, rest) = tokenizer::next_field(rest)?;
        let (target_field, rest) = tokenizer::next_field(rest)?;
        let (ability_field, rest) = tokenizer::next_field(rest)?;
        let (effect_field, tail) = tokenizer::next_field(rest)?;

        let source_entity = parse_entity(source_field)?;
        let mut target_entity = parse_entity(target_field)?;
        if target_entity.entity_type == EntityType::SelfReference {
            target_entity = source_entity.clone();
        }

        let action = parse_action(ability_field)?;
        let effect = parse_effect(effect_field)?;
        let details = parse_details(tail, &effect);

        Some(CombatEvent {
            line_number,
            timestamp,
            source_entity,
            target_entity,
            action,
            effect,
            details,
            combat_time_secs: None,
        })
    }

    // [18:28:08.183] - time of day, combined with the session date
    fn parse_timestamp(&self, field: &str) -> Option<NaiveDateTime> {
        let b = field.as_bytes();
        if b.len() != 12 || b[2] != b':' || b[5] != b':' || b[8] != b'.' {
            return None;
        }
        for &i in &[0usize, 1, 3, 4, 6, 7, 9, 10, 11] {
            if !b[i].is_ascii_digit() {
                return None;
            }
        }

        let hour = ((b[0] - b'0') * 10 + (b[1] - b'0')) as u32;
        let minute = ((b[3] - b'0') * 10 + (b[4] - b'0')) as u32;
        let second = ((b[6] - b'0') * 10 + (b[7] - b'0')) as u32;
        let millis = (b[9] - b'0') as u32 * 100 + (b[10] - b'0') as u32 * 10 + (b[11] - b'0') as u32;

        self.session_start
            .date()
            .and_hms_milli_opt(hour, minute, second, millis)
    }
}

// [@Galen Ayder#690129185314118|(-4700.43,-4750.48,710.03,-0.71)|(1/414851)]
// [Dread Master Bestia {3273941900591104}:5320000112163|(137.28,-120.98,-8.85,81.28)|(0/19129210)]
// [@Jerran Zeva#689501114780828/Raina Temple {493328533553152}:87481369009487|(4749.87,4694.53,710.05,0.00)|(288866/288866)]
fn parse_entity(field: &str) -> Option<Entity> {
    let field = field.trim();
    if field.is_empty() {
        return Some(Entity::default());
    }
    if field == "=" {
        return Some(Entity {
            entity_type: EntityType::SelfReference,
            ..Default::default()
        });
    }

    let bytes = field.as_bytes();
    let pipes: Vec<usize> = memchr_iter(b'|', bytes).collect();
    if pipes.len() < 2 {
        return None;
    }

    let name_segment = &field[..pipes[0]];
    let position = parse_position(&field[pipes[0] + 1..pipes[1]]).unwrap_or_default();
    let health = parse_entity_health(&field[pipes[1] + 1..])?;
    let (name, class_id, log_id, entity_type) = parse_entity_name_id(name_segment)?;

    Some(Entity {
        name: intern(name),
        class_id,
        log_id,
        entity_type,
        health,
        position,
    })
}

fn parse_entity_name_id(segment: &str) -> Option<(&str, i64, i64, EntityType)> {
    let bytes = segment.as_bytes();

    let hash_pos = memchr(b'#', bytes);
    let brace_start = memchr(b'{', bytes);
    let brace_end = memchr(b'}', bytes);

    if let Some(hash) = hash_pos {
        if let Some(slash) = memchr(b'/', bytes) {
            // Player-owned companion: the companion is the acting entity
            let name = segment[slash + 1..brace_start?].trim();
            let class_id = parse_i64!(&segment[brace_start? + 1..brace_end?]);
            let log_id = parse_i64!(segment.get(brace_end? + 2..).unwrap_or(""));
            return Some((name, class_id, log_id, EntityType::Companion));
        }

        let name = segment[..hash].trim_start_matches('@');
        let log_id = parse_i64!(&segment[hash + 1..]);
        return Some((name, 0, log_id, EntityType::Player));
    }

    // No '#' means NPC: Name {class_id}:instance_id
    let name = segment[..brace_start?].trim();
    let class_id = parse_i64!(&segment[brace_start? + 1..brace_end?]);
    let log_id = parse_i64!(segment.get(brace_end? + 2..).unwrap_or(""));
    Some((name, class_id, log_id, EntityType::Npc))
}

// (4749.87,4694.53,710.05,0.00)
fn parse_position(segment: &str) -> Option<Position> {
    let inner = segment.trim().strip_prefix('(')?.strip_suffix(')')?;
    let mut parts = inner.split(',');
    let mut next = || parts.next().map(|p| p.trim().parse::<f32>().unwrap_or_default());
    Some(Position {
        x: next()?,
        y: next()?,
        z: next()?,
        facing: next()?,
    })
}

// (288866/288866)
fn parse_entity_health(segment: &str) -> Option<(i32, i32)> {
    let bytes = segment.as_bytes();
    let start = memchr(b'(', bytes)?;
    let delim = memchr(b'/', bytes)?;
    let end = memchr(b')', bytes)?;

    let current = parse_i32!(&segment[start + 1..delim]);
    let max = parse_i32!(&segment[delim + 1..end]);
    Some((current, max))
}

// Force Breach {812827961327616}
fn parse_action(field: &str) -> Option<Action> {
    let field = field.trim();
    if field.is_empty() {
        return Some(Action::default());
    }

    let bytes = field.as_bytes();
    let brace_start = memchr(b'{', bytes)?;
    let brace_end = memchr(b'}', bytes)?;

    Some(Action {
        name: intern(field[..brace_start].trim()),
        action_id: parse_i64!(&field[brace_start + 1..brace_end]),
    })
}

// ApplyEffect {836045448945477}: Damage {836045448945501}
// AreaEntered {836045448953664}: The Dread Palace {137438993410} 8 Player Master {836045448953655}
// DisciplineChanged {836045448953665}: Jedi Shadow {3206823655504}/Kinetic Combat {2031339142381644}
fn parse_effect(field: &str) -> Option<Effect> {
    let braces = brace_pairs(field);
    if braces.is_empty() {
        return Some(Effect::default());
    }

    let (type_start, type_end) = braces[0];
    let type_name = intern(field[..type_start].trim());
    let type_id = parse_i64!(&field[type_start + 1..type_end]);

    let mut effect = Effect {
        type_name,
        type_id,
        ..Default::default()
    };

    if braces.len() < 2 {
        return Some(effect);
    }

    let (second_start, second_end) = braces[1];
    let second_name = field
        .get(type_end + 2..second_start)
        .unwrap_or("")
        .trim_end_matches(['/', ' '])
        .trim();
    let second_id = parse_i64!(&field[second_start + 1..second_end]);

    // Dispatch on the wire id, not the (localizable) type name
    match type_id {
        effect_type_id::DISCIPLINECHANGED => {
            effect.effect_name = intern(second_name);
            effect.effect_id = second_id;
            if let Some((disc_start, disc_end)) = braces.get(2).copied() {
                let disc_name = field
                    .get(second_end + 1..disc_start)
                    .unwrap_or("")
                    .trim_start_matches('/')
                    .trim();
                effect.discipline_name = intern(disc_name);
                effect.discipline_id = parse_i64!(&field[disc_start + 1..disc_end]);
            }
        }
        effect_type_id::AREAENTERED => {
            effect.effect_name = intern(second_name);
            effect.effect_id = second_id;
            if let Some((diff_start, diff_end)) = braces.get(2).copied() {
                let diff_name = field.get(second_end + 1..diff_start).unwrap_or("").trim();
                effect.difficulty_name = intern(diff_name);
                effect.difficulty_id = parse_i64!(&field[diff_start + 1..diff_end]);
            }
        }
        _ => {
            effect.effect_name = intern(second_name);
            effect.effect_id = second_id;
        }
    }

    Some(effect)
}

/// Decode the trailing value segment: `(...)` value and `<...>` threat.
fn parse_details(tail: &str, effect: &Effect) -> Details {
    let mut details = Details::default();
    let bytes = tail.as_bytes();

    if let (Some(start), Some(end)) = (memchr(b'<', bytes), memchr(b'>', bytes))
        && start < end
    {
        details.threat = tail[start + 1..end].trim().parse().unwrap_or_default();
    }

    if effect.effect_id == effect_id::DAMAGE {
        parse_damage_value(tail, &mut details);
    } else if effect.effect_id == effect_id::HEAL {
        parse_heal_value(tail, &mut details);
    } else if (effect.type_id == effect_type_id::MODIFYCHARGES
        || effect.type_id == effect_type_id::APPLYEFFECT)
        && tail.contains("charges")
    {
        parse_charges_value(tail, &mut details);
    } else if effect.type_id == effect_type_id::SPEND || effect.type_id == effect_type_id::RESTORE
    {
        parse_spend_value(tail, &mut details);
    }

    details
}

// (3562* kinetic {836045448940873}(1691 absorbed {836045448945511})) <3562>
// (1002 energy {836045448940874} -shield {836045448945509} (327 absorbed {836045448945511}))
// (0 -miss {836045448945502})
fn parse_damage_value(tail: &str, details: &mut Details) {
    let bytes = tail.as_bytes();
    let Some(paren_start) = memchr(b'(', bytes) else {
        return;
    };
    let Some(paren_end) = find_matching_paren(bytes, paren_start) else {
        return;
    };
    let inner = &tail[paren_start + 1..paren_end];
    let inner_bytes = inner.as_bytes();

    // Nullified damage from a reflect
    if inner.trim() == "0 -" {
        details.is_reflect = true;
        return;
    }

    details.is_crit = memchr(b'*', inner_bytes).is_some();
    details.is_reflect = inner.contains("reflected");

    let amount_end = inner
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(inner.len());
    details.dmg_amount = parse_i32!(&inner[..amount_end]);

    // Effective damage after ~, defaulting to the raw amount
    details.dmg_effective = match memchr(b'~', inner_bytes) {
        Some(pos) => {
            let start = pos + 1;
            let end = inner[start..]
                .find(|c: char| !c.is_ascii_digit())
                .map(|e| start + e)
                .unwrap_or(inner.len());
            parse_i32!(&inner[start..end])
        }
        None => details.dmg_amount,
    };

    // Each {id} pair is classified by the word in front of it: a damage
    // type, a -defense marker, or an absorbed amount.
    for (brace_start, brace_end) in brace_pairs(inner) {
        let id = parse_i64!(&inner[brace_start + 1..brace_end]);
        let before = inner[..brace_start].trim_end();
        let word_start = before
            .rfind(|c: char| c.is_whitespace() || c == '(')
            .map(|p| p + 1)
            .unwrap_or(0);
        let word = &before[word_start..];

        if word.starts_with('-') {
            details.defense_type_id = id;
        } else if word == "absorbed" {
            let pre = before[..word_start].trim_end();
            let num_start = pre
                .rfind(|c: char| !c.is_ascii_digit())
                .map(|p| p + 1)
                .unwrap_or(0);
            details.dmg_absorbed = parse_i32!(&pre[num_start..]);
        } else if details.dmg_type_id == 0 && !word.is_empty() && !word.contains('*') {
            details.dmg_type = intern(word);
            details.dmg_type_id = id;
        }
    }
}

// (2631*) <1315>
fn parse_heal_value(tail: &str, details: &mut Details) {
    let bytes = tail.as_bytes();
    let Some(paren_start) = memchr(b'(', bytes) else {
        return;
    };
    let Some(paren_end) = memchr(b')', bytes) else {
        return;
    };
    if paren_end <= paren_start {
        return;
    }
    let inner = &tail[paren_start + 1..paren_end];
    let inner_bytes = inner.as_bytes();

    details.is_crit = memchr(b'*', inner_bytes).is_some();

    let amount_end = inner
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(inner.len());
    details.heal_amount = parse_i32!(&inner[..amount_end]);

    details.heal_effective = match memchr(b'~', inner_bytes) {
        Some(pos) => {
            let start = pos + 1;
            let end = inner[start..]
                .find(|c: char| !c.is_ascii_digit())
                .map(|e| start + e)
                .unwrap_or(inner.len());
            parse_i32!(&inner[start..end])
        }
        None => details.heal_amount,
    };
}

// (2 charges {3395553469861888})
fn parse_charges_value(tail: &str, details: &mut Details) {
    let bytes = tail.as_bytes();
    let Some(paren_start) = memchr(b'(', bytes) else {
        return;
    };
    let Some(paren_end) = memchr(b')', bytes) else {
        return;
    };
    if paren_end <= paren_start {
        return;
    }
    let inner = &tail[paren_start + 1..paren_end];

    let count_end = inner
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(inner.len());
    details.charges = parse_i32!(&inner[..count_end]);

    if let Some((brace_start, brace_end)) = brace_pairs(inner).first().copied() {
        details.ability_id = parse_i64!(&inner[brace_start + 1..brace_end]);
    }
}

// (5) or (12 energy)
fn parse_spend_value(tail: &str, details: &mut Details) {
    let bytes = tail.as_bytes();
    let Some(paren_start) = memchr(b'(', bytes) else {
        return;
    };
    let Some(paren_end) = memchr(b')', bytes) else {
        return;
    };
    if paren_end <= paren_start {
        return;
    }
    let inner = tail[paren_start + 1..paren_end].trim();
    let num_end = inner
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(inner.len());
    details.spend = inner[..num_end].parse().unwrap_or_default();
}

/// Find the matching closing paren, handling nesting.
fn find_matching_paren(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0;
    for (i, &b) in bytes[start..].iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// All `{...}` pairs of a segment, in order.
fn brace_pairs(segment: &str) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let bytes = segment.as_bytes();
    let mut pos = 0;
    while let Some(offset) = memchr(b'{', &bytes[pos..]) {
        let start = pos + offset;
        let Some(end_offset) = memchr(b'}', &bytes[start..]) else {
            break;
        };
        let end = start + end_offset;
        pairs.push((start, end));
        pos = end + 1;
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::resolve;
    use chrono::NaiveDate;

    fn parser() -> LogParser {
        let start = NaiveDate::from_ymd_opt(2025, 12, 10)
            .unwrap()
            .and_hms_opt(18, 12, 15)
            .unwrap();
        LogParser::new(start)
    }

    const PLAYER: &str = "@Jerran Zeva#689501114780828|(4749.87,4694.53,710.05,0.00)|(288866/288866)";
    const BOSS: &str = "Dread Master Bestia {3273941900591104}:5320000112163|(137.28,-120.98,-8.85,81.28)|(18000000/19129210)";

    #[test]
    fn parses_damage_line() {
        let line = format!(
            "[18:28:10.500] [{PLAYER}] [{BOSS}] [Force Breach {{812827961327616}}] [ApplyEffect {{836045448945477}}: Damage {{836045448945501}}] (3562* kinetic {{836045448940873}}(1691 absorbed {{836045448945511}})) <3562>"
        );
        let event = parser().parse_line(1, &line).unwrap();

        assert_eq!(event.line_number, 1);
        assert_eq!(event.timestamp.format("%H:%M:%S%.3f").to_string(), "18:28:10.500");

        assert_eq!(resolve(event.source_entity.name), "Jerran Zeva");
        assert_eq!(event.source_entity.entity_type, EntityType::Player);
        assert_eq!(event.source_entity.log_id, 689501114780828);
        assert_eq!(event.source_entity.health, (288866, 288866));
        assert_eq!(event.source_entity.position.x, 4749.87);

        assert_eq!(resolve(event.target_entity.name), "Dread Master Bestia");
        assert_eq!(event.target_entity.entity_type, EntityType::Npc);
        assert_eq!(event.target_entity.class_id, 3273941900591104);
        assert_eq!(event.target_entity.log_id, 5320000112163);

        assert_eq!(resolve(event.action.name), "Force Breach");
        assert_eq!(event.action.action_id, 812827961327616);
        assert_eq!(event.effect.effect_id, effect_id::DAMAGE);

        assert_eq!(event.details.dmg_amount, 3562);
        assert!(event.details.is_crit);
        assert_eq!(resolve(event.details.dmg_type), "kinetic");
        assert_eq!(event.details.dmg_type_id, 836045448940873);
        assert_eq!(event.details.dmg_absorbed, 1691);
        assert_eq!(event.details.threat, 3562.0);
    }

    #[test]
    fn parses_self_targeted_heal() {
        let line = format!(
            "[18:28:11.000] [{PLAYER}] [=] [Benevolence {{812281500364800}}] [ApplyEffect {{836045448945477}}: Heal {{836045448945500}}] (2631*) <1315>"
        );
        let event = parser().parse_line(2, &line).unwrap();

        // [=] resolves to the source entity
        assert_eq!(event.target_entity, event.source_entity);
        assert_eq!(event.target_entity.entity_type, EntityType::Player);
        assert_eq!(event.details.heal_amount, 2631);
        assert_eq!(event.details.heal_effective, 2631);
        assert!(event.details.is_crit);
        assert_eq!(event.details.threat, 1315.0);
    }

    #[test]
    fn parses_missed_attack_defense_type() {
        let line = format!(
            "[18:28:12.000] [{BOSS}] [{PLAYER}] [Swipe {{3294098182111232}}] [ApplyEffect {{836045448945477}}: Damage {{836045448945501}}] (0 -miss {{836045448945502}})"
        );
        let event = parser().parse_line(3, &line).unwrap();
        assert_eq!(event.details.dmg_amount, 0);
        assert_eq!(
            event.details.defense_type_id,
            crate::game_data::defense_type::MISS
        );
        assert_eq!(resolve(event.details.dmg_type), "");
    }

    #[test]
    fn parses_area_entered() {
        let line = r#"[18:28:08.183] [@Jerran Zeva#689501114780828|(-8.56,3.11,-0.98,358.89)|(426912/442951)] [] [] [AreaEntered {836045448953664}: The Dread Palace {137438993410} 8 Player Master {836045448953655}] (he3000) <v7.0.0b>"#;
        let event = parser().parse_line(4, line).unwrap();

        assert_eq!(event.effect.type_id, effect_type_id::AREAENTERED);
        assert_eq!(resolve(event.effect.effect_name), "The Dread Palace");
        assert_eq!(event.effect.effect_id, 137438993410);
        assert_eq!(resolve(event.effect.difficulty_name), "8 Player Master");
        assert_eq!(event.effect.difficulty_id, 836045448953655);
        assert_eq!(event.target_entity.entity_type, EntityType::Empty);
    }

    #[test]
    fn parses_discipline_changed() {
        let line = format!(
            "[18:28:09.000] [{PLAYER}] [{PLAYER}] [] [DisciplineChanged {{836045448953665}}: Jedi Shadow {{3206823655504}}/Kinetic Combat {{2031339142381644}}]"
        );
        let event = parser().parse_line(5, &line).unwrap();

        assert_eq!(event.effect.type_id, effect_type_id::DISCIPLINECHANGED);
        assert_eq!(resolve(event.effect.effect_name), "Jedi Shadow");
        assert_eq!(event.effect.effect_id, 3206823655504);
        assert_eq!(resolve(event.effect.discipline_name), "Kinetic Combat");
        assert_eq!(event.effect.discipline_id, 2031339142381644);
    }

    #[test]
    fn parses_companion_entity() {
        let line = format!(
            "[18:28:13.000] [@Jerran Zeva#689501114780828/Raina Temple {{493328533553152}}:87481369009487|(4749.87,4694.53,710.05,0.00)|(95000/95000)] [{BOSS}] [Rifle Shot {{812118291247104}}] [ApplyEffect {{836045448945477}}: Damage {{836045448945501}}] (341 energy {{836045448940874}}) <341>"
        );
        let event = parser().parse_line(6, &line).unwrap();

        assert_eq!(resolve(event.source_entity.name), "Raina Temple");
        assert_eq!(event.source_entity.entity_type, EntityType::Companion);
        assert_eq!(event.source_entity.class_id, 493328533553152);
        assert_eq!(event.source_entity.log_id, 87481369009487);
    }

    #[test]
    fn parses_charges() {
        let line = format!(
            "[18:28:14.000] [{PLAYER}] [=] [Kolto Shell {{3294102477078528}}] [ModifyCharges {{836045448945474}}: Kolto Shell {{3305254083756032}}] (2 charges {{3294102477078528}})"
        );
        let event = parser().parse_line(7, &line).unwrap();
        assert_eq!(event.details.charges, 2);
        assert_eq!(event.details.ability_id, 3294102477078528);
    }

    #[test]
    fn malformed_line_reports_byte_length() {
        let line = "this is not a combat log line";
        let err = parser().parse_line(9, line).unwrap_err();
        assert_eq!(err.line_number, 9);
        assert_eq!(err.byte_len, line.len() as u64 + 1);
        assert_eq!(err.kind, MalformedKind::IncompleteLine);
    }

    #[test]
    fn truncated_line_is_malformed_not_panic() {
        let line = "[18:28:10.500] [@Jerran Zeva#6895011147";
        assert!(parser().parse_line(10, line).is_err());
    }

    #[test]
    fn enter_combat_event_parses_with_empty_fields() {
        let line = format!(
            "[18:28:15.000] [{PLAYER}] [] [] [Event {{836045448945472}}: EnterCombat {{836045448945489}}]"
        );
        let event = parser().parse_line(11, &line).unwrap();
        assert_eq!(event.effect.type_id, effect_type_id::EVENT);
        assert_eq!(event.effect.effect_id, effect_id::ENTERCOMBAT);
        assert_eq!(event.target_entity.entity_type, EntityType::Empty);
    }
}
