use tracing::debug;

use crate::{
    history::HistoryLog,
    killmail::{Killmail, Role},
    roster::Roster,
    value::format_magnitude,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassCounts {
    pub pruned: usize,
    pub classified: usize,
    pub tagged: usize,
    pub formatted: usize,
}

/// Runs the four enrichment passes over the whole log. Every pass is a
/// per-record no-op once its output field is set, so mixing already-enriched
/// history with freshly appended records is safe and re-runs are free.
pub fn enrich_log(log: &mut HistoryLog, roster: &Roster) -> PassCounts {
    let mut counts = PassCounts::default();
    for killmail in log.events_mut() {
        if prune(killmail, roster) {
            counts.pruned += 1;
        }
    }
    for killmail in log.events_mut() {
        if classify_role(killmail, roster) {
            counts.classified += 1;
        }
    }
    for killmail in log.events_mut() {
        if tag_roster_involved(killmail, roster) {
            counts.tagged += 1;
        }
    }
    for killmail in log.events_mut() {
        if format_value(killmail) {
            counts.formatted += 1;
        }
    }
    debug!(
        pruned = counts.pruned,
        classified = counts.classified,
        tagged = counts.tagged,
        formatted = counts.formatted,
        "enrichment passes complete"
    );
    counts
}

/// Pass 1: drop volatile source metadata, record the pre-prune attacker
/// count, hoist the decisive-blow attacker to a top-level field, and reduce
/// the attacker list to roster members plus the decisive blow. Retaining
/// every roster attacker is what keeps the later passes order-independent.
pub fn prune(killmail: &mut Killmail, roster: &Roster) -> bool {
    if killmail.involved_count.is_some() {
        return false;
    }
    killmail.involved_count = Some(killmail.attackers.len() as u32);
    killmail.points = None;
    killmail.hash = None;
    killmail.position = None;
    killmail.items = None;

    killmail.final_blow = killmail
        .attackers
        .iter()
        .find(|attacker| attacker.final_blow)
        .cloned();
    killmail
        .attackers
        .retain(|attacker| attacker.final_blow || roster.contains_id(attacker.character_id));
    true
}

/// Pass 2: a roster victim makes the event a loss, escalated to
/// friendly-fire when a roster member is also among the attackers; any
/// other victim makes it a kill.
pub fn classify_role(killmail: &mut Killmail, roster: &Roster) -> bool {
    if killmail.role.is_some() {
        return false;
    }
    let role = if roster.contains_id(killmail.victim.character_id) {
        let roster_attacker = killmail
            .attackers
            .iter()
            .any(|attacker| roster.contains_id(attacker.character_id));
        if roster_attacker {
            Role::FriendlyFire
        } else {
            Role::Loss
        }
    } else {
        Role::Kill
    };
    killmail.role = Some(role);
    true
}

/// Pass 3: roster names of involved attackers, in attacker order.
pub fn tag_roster_involved(killmail: &mut Killmail, roster: &Roster) -> bool {
    if killmail.roster_involved.is_some() {
        return false;
    }
    let involved = killmail
        .attackers
        .iter()
        .filter_map(|attacker| roster.name_for(attacker.character_id))
        .map(ToOwned::to_owned)
        .collect();
    killmail.roster_involved = Some(involved);
    true
}

/// Pass 4: human-readable magnitude of the destroyed value.
pub fn format_value(killmail: &mut Killmail) -> bool {
    if killmail.formatted_value.is_some() {
        return false;
    }
    killmail.formatted_value = Some(format_magnitude(killmail.total_value));
    true
}
