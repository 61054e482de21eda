use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const KILL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Kill,
    Loss,
    FriendlyFire,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Participant {
    pub character_id: u64,
    pub character_name: Option<String>,
    pub corporation_name: Option<String>,
    pub alliance_name: Option<String>,
    pub ship_type_id: u64,
    pub damage: f64,
    pub final_blow: bool,
}

impl Participant {
    pub fn is_named(&self) -> bool {
        self.character_id != 0
            && self
                .character_name
                .as_deref()
                .map(|name| !name.trim().is_empty())
                .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Killmail {
    pub killmail_id: u64,
    pub kill_time: DateTime<Utc>,
    pub solar_system_id: u64,
    pub total_value: f64,
    pub victim: Participant,
    pub attackers: Vec<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub involved_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_blow: Option<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roster_involved: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_value: Option<String>,
}

/// Decodes one raw zKillboard record into the typed model. The source mixes
/// numeric and stringified numbers across API revisions, so every numeric
/// field goes through a coercing lookup.
pub fn decode_killmail(raw: &Value) -> Result<Killmail> {
    let killmail_id = value_to_u64(raw.get("killID")).context("killmail record missing killID")?;
    let kill_time_text = raw
        .get("killTime")
        .and_then(Value::as_str)
        .context("killmail record missing killTime")?;
    let kill_time = parse_kill_time(kill_time_text)
        .with_context(|| format!("invalid killTime in killmail {killmail_id}"))?;
    let victim_raw = raw
        .get("victim")
        .filter(|value| value.is_object())
        .with_context(|| format!("killmail {killmail_id} missing victim"))?;

    let attackers = raw
        .get("attackers")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .map(|entry| decode_participant(entry, "damageDone"))
                .collect()
        })
        .unwrap_or_default();

    let zkb = raw.get("zkb");
    Ok(Killmail {
        killmail_id,
        kill_time,
        solar_system_id: value_to_u64(raw.get("solarSystemID")).unwrap_or(0),
        total_value: value_to_f64(zkb.and_then(|meta| meta.get("totalValue"))).unwrap_or(0.0),
        victim: decode_participant(victim_raw, "damageTaken"),
        attackers,
        points: zkb
            .and_then(|meta| meta.get("points"))
            .and_then(|value| value_to_u64(Some(value)))
            .and_then(|points| u32::try_from(points).ok()),
        hash: zkb
            .and_then(|meta| meta.get("hash"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        position: raw.get("position").filter(|v| !v.is_null()).cloned(),
        items: raw.get("items").filter(|v| !v.is_null()).cloned(),
        involved_count: None,
        final_blow: None,
        role: None,
        roster_involved: None,
        formatted_value: None,
    })
}

fn decode_participant(raw: &Value, damage_field: &str) -> Participant {
    Participant {
        character_id: value_to_u64(raw.get("characterID")).unwrap_or(0),
        character_name: non_empty_string(raw.get("characterName")),
        corporation_name: non_empty_string(raw.get("corporationName")),
        alliance_name: non_empty_string(raw.get("allianceName")),
        ship_type_id: value_to_u64(raw.get("shipTypeID")).unwrap_or(0),
        damage: value_to_f64(raw.get(damage_field)).unwrap_or(0.0),
        final_blow: parse_one_bool(raw.get("finalBlow")),
    }
}

fn parse_kill_time(text: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), KILL_TIME_FORMAT)
        .with_context(|| format!("kill time {text:?} does not match {KILL_TIME_FORMAT}"))?;
    Ok(naive.and_utc())
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

fn value_to_u64(value: Option<&Value>) -> Option<u64> {
    value
        .and_then(Value::as_str)
        .and_then(|s| s.trim().parse::<u64>().ok())
        .or_else(|| value.and_then(Value::as_u64))
}

fn value_to_f64(value: Option<&Value>) -> Option<f64> {
    value
        .and_then(Value::as_str)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .or_else(|| value.and_then(Value::as_f64))
        .or_else(|| value.and_then(Value::as_i64).map(|v| v as f64))
}

fn parse_one_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => s == "1" || s.eq_ignore_ascii_case("true"),
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) == 1,
        _ => false,
    }
}

#[cfg(test)]
pub(crate) fn sample_raw_killmail(kill_id: u64) -> Value {
    serde_json::json!({
        "killID": kill_id,
        "killTime": "2016-08-01 18:22:00",
        "solarSystemID": 30_002_053u64,
        "victim": {
            "characterID": 268_946_627u64,
            "characterName": "Haulmar",
            "corporationName": "Polyhedra Heavy Industries",
            "shipTypeID": 587,
            "damageTaken": 1_204
        },
        "attackers": [
            {
                "characterID": 90_000_001u64,
                "characterName": "Veskin",
                "corporationName": "Blood Raiders",
                "shipTypeID": 17_926,
                "damageDone": 900,
                "finalBlow": 1
            },
            {
                "characterID": 0,
                "characterName": "",
                "shipTypeID": 23_061,
                "damageDone": 304,
                "finalBlow": 0
            }
        ],
        "zkb": {
            "totalValue": 12_345_678.9,
            "points": 4,
            "hash": "abcdef0123456789"
        }
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{decode_killmail, sample_raw_killmail, Killmail, Role};

    #[test]
    fn decodes_sample_record() {
        let raw = sample_raw_killmail(55_555);
        let killmail = decode_killmail(&raw).expect("sample record should decode");

        assert_eq!(killmail.killmail_id, 55_555);
        assert_eq!(killmail.kill_time.to_rfc3339(), "2016-08-01T18:22:00+00:00");
        assert_eq!(killmail.victim.character_name.as_deref(), Some("Haulmar"));
        assert_eq!(killmail.attackers.len(), 2);
        assert!(killmail.attackers[0].final_blow);
        assert!(!killmail.attackers[1].final_blow);
        assert_eq!(killmail.attackers[1].character_name, None);
        assert_eq!(killmail.points, Some(4));
        assert!((killmail.total_value - 12_345_678.9).abs() < 1e-6);
        assert!(killmail.role.is_none());
    }

    #[test]
    fn coerces_stringified_numeric_fields() {
        let raw = json!({
            "killID": "777",
            "killTime": "2016-08-02 01:00:00",
            "victim": {"characterID": "42", "characterName": "Someone", "damageTaken": "10"},
            "attackers": [],
            "zkb": {"totalValue": "999.5"}
        });
        let killmail = decode_killmail(&raw).expect("stringified record should decode");
        assert_eq!(killmail.killmail_id, 777);
        assert_eq!(killmail.victim.character_id, 42);
        assert!((killmail.total_value - 999.5).abs() < 1e-9);
    }

    #[test]
    fn rejects_records_missing_required_fields() {
        assert!(decode_killmail(&json!({"killTime": "2016-08-01 18:22:00"})).is_err());
        assert!(decode_killmail(&json!({"killID": 1})).is_err());
        assert!(decode_killmail(&json!({"killID": 1, "killTime": "not a time", "victim": {}})).is_err());
        assert!(decode_killmail(&json!({"killID": 1, "killTime": "2016-08-01 18:22:00"})).is_err());
    }

    #[test]
    fn enriched_record_roundtrips_through_json() {
        let raw = sample_raw_killmail(9);
        let mut killmail = decode_killmail(&raw).expect("sample record should decode");
        killmail.role = Some(Role::FriendlyFire);
        killmail.roster_involved = Some(vec!["Veskin".to_owned()]);
        killmail.formatted_value = Some("12.3m".to_owned());

        let text = serde_json::to_string(&killmail).expect("serialize");
        assert!(text.contains("\"friendly-fire\""));
        let parsed: Killmail = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(parsed, killmail);
    }
}
