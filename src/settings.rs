use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Settings for one power source: `pmset` key -> value, both kept as text,
/// in the order `pmset -g custom` reported them.
pub type SectionSettings = IndexMap<String, String>;

/// Which power source a block of settings applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerSource {
    Battery,
    Ac,
}

impl PowerSource {
    /// Both sources, in the order they are applied.
    pub const ALL: [PowerSource; 2] = [PowerSource::Battery, PowerSource::Ac];

    /// Section header printed by `pmset -g custom`.
    pub fn marker(self) -> &'static str {
        match self {
            PowerSource::Battery => "Battery Power:",
            PowerSource::Ac => "AC Power:",
        }
    }

    /// `pmset` flag selecting this source when writing.
    pub fn flag(self) -> &'static str {
        match self {
            PowerSource::Battery => "-b",
            PowerSource::Ac => "-c",
        }
    }
}

impl std::fmt::Display for PowerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PowerSource::Battery => write!(f, "battery"),
            PowerSource::Ac => write!(f, "ac"),
        }
    }
}

/// Power settings captured from the system, split by power source.
/// A section is absent when nothing was parsed for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<SectionSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ac: Option<SectionSettings>,
}

impl PowerSettings {
    pub fn section(&self, source: PowerSource) -> Option<&SectionSettings> {
        match source {
            PowerSource::Battery => self.battery.as_ref(),
            PowerSource::Ac => self.ac.as_ref(),
        }
    }

    fn section_mut(&mut self, source: PowerSource) -> &mut SectionSettings {
        match source {
            PowerSource::Battery => self.battery.get_or_insert_with(IndexMap::new),
            PowerSource::Ac => self.ac.get_or_insert_with(IndexMap::new),
        }
    }

    /// Present sections, battery first.
    pub fn sections(&self) -> impl Iterator<Item = (PowerSource, &SectionSettings)> {
        PowerSource::ALL
            .into_iter()
            .filter_map(|source| self.section(source).map(|s| (source, s)))
    }

    pub fn is_empty(&self) -> bool {
        self.battery.is_none() && self.ac.is_none()
    }
}

/// Parse the output of `pmset -g custom`.
///
/// Lines before the first section marker are ignored. Within a section every
/// non-empty line is split at the first whitespace run into key and value;
/// lines without a value are dropped.
pub fn parse_settings(output: &str) -> PowerSettings {
    let mut settings = PowerSettings::default();
    let mut current: Option<PowerSource> = None;

    for line in output.lines() {
        let line = line.trim();
        if line.contains(PowerSource::Battery.marker()) {
            current = Some(PowerSource::Battery);
            continue;
        }
        if line.contains(PowerSource::Ac.marker()) {
            current = Some(PowerSource::Ac);
            continue;
        }

        let Some(source) = current else {
            continue;
        };
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        settings
            .section_mut(source)
            .insert(key.to_string(), value.to_string());
    }

    settings
}
