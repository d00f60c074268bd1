use crate::error::{Error, Result};
use crate::settings::PowerSettings;
use chrono::{NaiveDateTime, SubsecRound};
use colored::Colorize;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Every device's saved policies, keyed by hardware UUID, in the order they
/// were first saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyStore {
    pub devices: IndexMap<String, DeviceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_name: String,
    #[serde(default)]
    pub policies: IndexMap<String, PolicySnapshot>,
}

/// A named capture of power settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub settings: PowerSettings,
    #[serde(with = "timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "optional_timestamp"
    )]
    pub last_applied: Option<NaiveDateTime>,
}

/// Stored timestamps: local time, no offset, always six fractional digits.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Current local time at the precision the store keeps.
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local().trunc_subsecs(6)
}

mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

mod optional_timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.serialize_some(&ts.format(TIMESTAMP_FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|raw| raw.parse())
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

impl DeviceRecord {
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            policies: IndexMap::new(),
        }
    }

    pub fn policy_names(&self) -> Vec<String> {
        self.policies.keys().cloned().collect()
    }
}

impl PolicyStore {
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn device(&self, device_id: &str) -> Option<&DeviceRecord> {
        self.devices.get(device_id)
    }

    pub fn device_mut(&mut self, device_id: &str) -> Option<&mut DeviceRecord> {
        self.devices.get_mut(device_id)
    }

    /// Get the record for `device_id`, creating it with `device_name` if missing.
    pub fn device_or_insert(&mut self, device_id: &str, device_name: &str) -> &mut DeviceRecord {
        self.devices
            .entry(device_id.to_string())
            .or_insert_with(|| DeviceRecord::new(device_name))
    }
}

/// Load the store. Never fails: a missing file yields an empty store, an
/// unreadable or malformed one yields an empty store plus a warning.
pub fn load(path: &Path) -> PolicyStore {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return PolicyStore::default(),
        Err(e) => {
            eprintln!(
                "{} failed to read policies file {}: {}",
                "warning:".yellow(),
                path.display(),
                e
            );
            return PolicyStore::default();
        }
    };

    serde_json::from_str(&data).unwrap_or_else(|e| {
        eprintln!(
            "{} invalid policies file {} ({}), starting with an empty store",
            "warning:".yellow(),
            path.display(),
            e
        );
        PolicyStore::default()
    })
}

/// Write the store as pretty-printed JSON, replacing any previous content.
pub fn save(path: &Path, store: &PolicyStore) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| Error::StoreWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = serde_json::to_string_pretty(store)?;
    std::fs::write(path, data).map_err(|source| Error::StoreWrite {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::parse_settings;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_micro_opt(hour, 15, 30, 123456)
            .unwrap()
    }

    fn sample_store() -> PolicyStore {
        let mut store = PolicyStore::default();
        let record = store.device_or_insert("UUID-1", "Work Laptop");
        record.policies.insert(
            "default".to_string(),
            PolicySnapshot {
                settings: parse_settings(
                    "Battery Power:\n lowpowermode 1\nAC Power:\n displaysleep 10\n",
                ),
                created_at: at(1, 9),
                last_applied: Some(at(2, 18)),
            },
        );
        record.policies.insert(
            "travel".to_string(),
            PolicySnapshot {
                settings: parse_settings("Battery Power:\n sleep 1\n"),
                created_at: at(3, 7),
                last_applied: None,
            },
        );
        store.device_or_insert("UUID-2", "Home Mini");
        store
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/device_policies.json");
        let store = sample_store();

        save(&path, &store).unwrap();
        let loaded = load(&path);

        assert_eq!(loaded, store);
    }

    #[test]
    fn test_saved_json_layout() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("device_policies.json");
        save(&path, &sample_store()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(
            text.starts_with("{\n  \"UUID-1\": {\n    \"device_name\": \"Work Laptop\"")
        );
        assert!(text.contains("\"created_at\": \"2025-03-01T09:15:30.123456\""));

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let default = &value["UUID-1"]["policies"]["default"];
        assert_eq!(default["settings"]["ac"]["displaysleep"], "10");
        assert!(value["UUID-2"]["policies"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = load(&tmp.path().join("absent.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_invalid_json_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("device_policies.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = load(&path);
        assert!(store.is_empty());
        // The malformed content stays until the next save.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_load_accepts_python_isoformat_without_last_applied() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("device_policies.json");
        std::fs::write(
            &path,
            r#"{
  "ABC": {
    "device_name": "Old Mac",
    "policies": {
      "default": {
        "settings": {"battery": {"sleep": "1"}},
        "created_at": "2024-11-05T08:01:02.345678"
      }
    }
  }
}"#,
        )
        .unwrap();

        let store = load(&path);
        let snapshot = &store.device("ABC").unwrap().policies["default"];
        assert_eq!(
            snapshot.created_at.date(),
            NaiveDate::from_ymd_opt(2024, 11, 5).unwrap()
        );
        assert!(snapshot.last_applied.is_none());
        assert!(snapshot.settings.ac.is_none());
    }

    #[test]
    fn test_device_or_insert_keeps_existing_name() {
        let mut store = sample_store();
        let record = store.device_or_insert("UUID-1", "Renamed");
        assert_eq!(record.device_name, "Work Laptop");
        assert_eq!(record.policy_names(), vec!["default", "travel"]);
    }

    #[test]
    fn test_fresh_timestamp_has_six_fractional_digits() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("device_policies.json");
        let mut store = PolicyStore::default();
        let record = store.device_or_insert("UUID-1", "Work Laptop");
        record.policies.insert(
            "default".to_string(),
            PolicySnapshot {
                settings: PowerSettings::default(),
                created_at: now(),
                last_applied: Some(now()),
            },
        );
        save(&path, &store).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let snapshot = &value["UUID-1"]["policies"]["default"];
        for field in ["created_at", "last_applied"] {
            let text = snapshot[field].as_str().unwrap();
            let (_, fraction) = text.split_once('.').unwrap();
            assert_eq!(fraction.len(), 6, "{field}: {text}");
            assert!(fraction.bytes().all(|b| b.is_ascii_digit()));
        }
        assert_eq!(load(&path), store);
    }

    #[test]
    fn test_whole_second_timestamp_keeps_fraction() {
        let snapshot = PolicySnapshot {
            settings: PowerSettings::default(),
            created_at: NaiveDate::from_ymd_opt(2025, 3, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            last_applied: None,
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["created_at"], "2025-03-01T09:00:00.000000");
        assert!(value.get("last_applied").is_none());
    }

    #[test]
    fn test_load_keeps_file_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("device_policies.json");
        std::fs::write(
            &path,
            r#"{
  "ZZZ": {"device_name": "Later", "policies": {}},
  "AAA": {"device_name": "Earlier", "policies": {}}
}"#,
        )
        .unwrap();

        let store = load(&path);
        let ids: Vec<&str> = store.devices.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["ZZZ", "AAA"]);

        save(&path, &store).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.find("ZZZ").unwrap() < text.find("AAA").unwrap());
    }
}
