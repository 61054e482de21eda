use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    killmail::{Killmail, Role},
    roster::Roster,
    value::format_magnitude,
};

/// Read-only aggregate view handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardContext<'a> {
    pub kills: usize,
    pub losses: usize,
    pub friendlyfire: usize,
    pub money_killed: String,
    pub money_lost: String,
    pub history: Vec<(NaiveDate, Vec<&'a Killmail>)>,
    pub characters: Vec<(String, u64)>,
    pub character_count: usize,
}

pub fn count_by_role(events: &[Killmail], role: Role) -> usize {
    events
        .iter()
        .filter(|killmail| killmail.role == Some(role))
        .count()
}

/// Value destroyed for a role bucket. A friendly-fire event is a value
/// transfer on both sides at once, so it sums into the kill total and the
/// loss total alike while still counting only once per role bucket.
pub fn sum_value(events: &[Killmail], role: Role) -> f64 {
    events
        .iter()
        .filter(|killmail| {
            matches!(killmail.role, Some(r) if r == role || r == Role::FriendlyFire)
        })
        .map(|killmail| killmail.total_value)
        .sum()
}

pub fn sum_value_formatted(events: &[Killmail], role: Role) -> String {
    format_magnitude(sum_value(events, role))
}

/// Groups events by calendar day, newest day first; events within a day are
/// most-recent-first because the log is walked in reverse fetch order.
pub fn group_by_day(events: &[Killmail]) -> Vec<(NaiveDate, Vec<&Killmail>)> {
    let mut grouped: BTreeMap<NaiveDate, Vec<&Killmail>> = BTreeMap::new();
    for killmail in events.iter().rev() {
        grouped
            .entry(killmail.kill_time.date_naive())
            .or_default()
            .push(killmail);
    }
    grouped.into_iter().rev().collect()
}

/// Events where the identity is the victim or its roster name is among the
/// tagged attackers. An ID outside the roster matches nothing.
pub fn filter_by_identity<'a>(
    events: &'a [Killmail],
    roster: &Roster,
    identity_id: u64,
) -> Vec<&'a Killmail> {
    let Some(name) = roster.name_for(identity_id) else {
        return Vec::new();
    };
    events
        .iter()
        .filter(|killmail| {
            killmail.victim.character_id == identity_id
                || killmail
                    .roster_involved
                    .as_ref()
                    .map(|involved| involved.iter().any(|entry| entry == name))
                    .unwrap_or(false)
        })
        .collect()
}

pub fn build_dashboard_context<'a>(events: &'a [Killmail], roster: &Roster) -> DashboardContext<'a> {
    DashboardContext {
        kills: count_by_role(events, Role::Kill),
        losses: count_by_role(events, Role::Loss),
        friendlyfire: count_by_role(events, Role::FriendlyFire),
        money_killed: sum_value_formatted(events, Role::Kill),
        money_lost: sum_value_formatted(events, Role::Loss),
        history: group_by_day(events),
        characters: roster.sorted_pairs(),
        character_count: roster.len(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::{
        killmail::{Killmail, Participant, Role},
        roster::Roster,
    };

    use super::{
        build_dashboard_context, count_by_role, filter_by_identity, group_by_day, sum_value,
        sum_value_formatted,
    };

    const ANSEL: u64 = 101;
    const BRIT: u64 = 202;
    const CASK: u64 = 303;
    const OUTSIDER: u64 = 999;

    fn test_roster() -> Roster {
        let mut map = BTreeMap::new();
        map.insert("Ansel".to_owned(), ANSEL);
        map.insert("Brit".to_owned(), BRIT);
        map.insert("Cask".to_owned(), CASK);
        Roster::new(&map).expect("roster should build")
    }

    fn victim(character_id: u64, name: &str) -> Participant {
        Participant {
            character_id,
            character_name: Some(name.to_owned()),
            ..Participant::default()
        }
    }

    fn event(
        kill_id: u64,
        day: u32,
        hour: u32,
        victim_participant: Participant,
        role: Role,
        involved: &[&str],
        total_value: f64,
    ) -> Killmail {
        Killmail {
            killmail_id: kill_id,
            kill_time: Utc
                .with_ymd_and_hms(2016, 8, day, hour, 0, 0)
                .single()
                .expect("timestamp should be valid"),
            solar_system_id: 30_002_053,
            total_value,
            victim: victim_participant,
            attackers: Vec::new(),
            points: None,
            hash: None,
            position: None,
            items: None,
            involved_count: Some(1),
            final_blow: None,
            role: Some(role),
            roster_involved: Some(involved.iter().map(|name| (*name).to_owned()).collect()),
            formatted_value: None,
        }
    }

    fn sample_log() -> Vec<Killmail> {
        vec![
            event(1, 1, 9, victim(OUTSIDER, "Mark"), Role::Kill, &["Ansel"], 1_000.0),
            event(2, 1, 12, victim(ANSEL, "Ansel"), Role::Loss, &[], 2_000.0),
            event(3, 2, 8, victim(OUTSIDER, "Mark"), Role::Kill, &["Brit"], 4_000.0),
            event(
                4,
                2,
                10,
                victim(BRIT, "Brit"),
                Role::FriendlyFire,
                &["Cask"],
                8_000.0,
            ),
            event(5, 2, 11, victim(OUTSIDER, "Mark"), Role::Kill, &["Cask"], 16_000.0),
        ]
    }

    #[test]
    fn counts_roles_exclusively() {
        let log = sample_log();
        assert_eq!(count_by_role(&log, Role::Kill), 3);
        assert_eq!(count_by_role(&log, Role::Loss), 1);
        assert_eq!(count_by_role(&log, Role::FriendlyFire), 1);
    }

    #[test]
    fn friendly_fire_sums_into_both_value_totals() {
        let log = sample_log();
        assert!((sum_value(&log, Role::Kill) - 29_000.0).abs() < 1e-9);
        assert!((sum_value(&log, Role::Loss) - 10_000.0).abs() < 1e-9);
        assert_eq!(sum_value_formatted(&log, Role::Kill), "29.0k");
        assert_eq!(sum_value_formatted(&log, Role::Loss), "10.0k");
    }

    #[test]
    fn groups_by_day_newest_first() {
        let log = sample_log();
        let grouped = group_by_day(&log);

        assert_eq!(grouped.len(), 2);
        assert_eq!(
            grouped[0].0,
            NaiveDate::from_ymd_opt(2016, 8, 2).expect("valid date")
        );
        assert_eq!(
            grouped[1].0,
            NaiveDate::from_ymd_opt(2016, 8, 1).expect("valid date")
        );

        let day_two_ids: Vec<u64> = grouped[0].1.iter().map(|k| k.killmail_id).collect();
        assert_eq!(day_two_ids, vec![5, 4, 3]);
        let day_one_ids: Vec<u64> = grouped[1].1.iter().map(|k| k.killmail_id).collect();
        assert_eq!(day_one_ids, vec![2, 1]);
    }

    #[test]
    fn filters_events_by_identity() {
        let log = sample_log();
        let roster = test_roster();

        let ansel: Vec<u64> = filter_by_identity(&log, &roster, ANSEL)
            .iter()
            .map(|k| k.killmail_id)
            .collect();
        assert_eq!(ansel, vec![1, 2]);

        let cask: Vec<u64> = filter_by_identity(&log, &roster, CASK)
            .iter()
            .map(|k| k.killmail_id)
            .collect();
        assert_eq!(cask, vec![4, 5]);

        assert!(filter_by_identity(&log, &roster, OUTSIDER).is_empty());
    }

    #[test]
    fn dashboard_context_has_sorted_characters_and_counts() {
        let log = sample_log();
        let roster = test_roster();
        let context = build_dashboard_context(&log, &roster);

        assert_eq!(context.kills, 3);
        assert_eq!(context.losses, 1);
        assert_eq!(context.friendlyfire, 1);
        assert_eq!(context.character_count, 3);
        assert_eq!(
            context.characters,
            vec![
                ("Ansel".to_owned(), ANSEL),
                ("Brit".to_owned(), BRIT),
                ("Cask".to_owned(), CASK)
            ]
        );
        assert_eq!(context.history.len(), 2);

        let serialized = serde_json::to_value(&context).expect("context should serialize");
        assert_eq!(serialized["money_killed"], "29.0k");
        assert_eq!(serialized["history"][0][0], "2016-08-02");
    }
}
