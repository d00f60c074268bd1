use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the JSON document holding every device's policies.
pub const STORE_FILE: &str = "device_policies.json";

/// Config directory used when neither the flag nor the environment sets one.
pub const DEFAULT_CONFIG_DIR: &str = "~/.config/battery-optimizer";

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "BPM_CONFIG_DIR";

const SYSTEM_CONFIG: &str = "/etc/bpm/config.toml";
const USER_CONFIG_FILE: &str = "config.toml";

/// Top-level bpm configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BpmConfig {
    pub commands: CommandConfig,
    pub log: LogConfig,
}

/// Command lines for the external utilities bpm shells out to.
/// Each entry is an argv: program first, then fixed arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    pub hardware_info: Vec<String>,
    pub computer_name: Vec<String>,
    pub settings_dump: Vec<String>,
    /// Power source flag and key/value pairs are appended to this.
    pub settings_set: Vec<String>,
    /// Prefix for privileged invocations. Empty runs them directly.
    pub elevate: Vec<String>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            hardware_info: argv(&["system_profiler", "SPHardwareDataType"]),
            computer_name: argv(&["scutil", "--get", "ComputerName"]),
            settings_dump: argv(&["pmset", "-g", "custom"]),
            settings_set: argv(&["pmset"]),
            elevate: argv(&["sudo"]),
        }
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Record save/apply/delete events in the system log via `logger`.
    pub syslog: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { syslog: true }
    }
}

/// Everything one invocation needs to locate its state.
#[derive(Debug, Clone)]
pub struct Context {
    pub store_path: PathBuf,
    pub config: BpmConfig,
}

impl Context {
    /// Build a context rooted at `config_dir`, loading any config files.
    pub fn load(config_dir: PathBuf) -> Self {
        let config = load(&config_dir);
        Self::with_config(config_dir, config)
    }

    pub fn with_config(config_dir: PathBuf, config: BpmConfig) -> Self {
        let store_path = config_dir.join(STORE_FILE);
        Self { store_path, config }
    }
}

/// Pick the config directory: explicit flag, then `BPM_CONFIG_DIR`, then the default.
pub fn resolve_config_dir(flag: Option<&Path>) -> PathBuf {
    if let Some(dir) = flag {
        return expand_home(&dir.to_string_lossy());
    }
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return expand_home(&dir.to_string_lossy());
    }
    expand_home(DEFAULT_CONFIG_DIR)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (path, home) {
        ("~", Some(home)) => home,
        (p, Some(home)) if p.starts_with("~/") => home.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    }
}

fn read_toml(path: &Path) -> Option<toml::Value> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            eprintln!(
                "{} failed to parse config at {}: {}",
                "warning:".yellow(),
                path.display(),
                e
            );
            None
        }
    }
}

/// Recursively merge two TOML values. Tables are merged key-by-key;
/// all other types in `overlay` replace `base`.
fn merge_values(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_values(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

fn load_layers(system: &Path, user: &Path) -> BpmConfig {
    let merged = match (read_toml(system), read_toml(user)) {
        (Some(s), Some(u)) => Some(merge_values(s, u)),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    };

    match merged {
        Some(value) => value.try_into().unwrap_or_else(|e| {
            eprintln!("{} failed to deserialize config: {}", "warning:".yellow(), e);
            BpmConfig::default()
        }),
        None => BpmConfig::default(),
    }
}

/// Load the merged config: `/etc/bpm/config.toml`, then `<config_dir>/config.toml`.
pub fn load(config_dir: &Path) -> BpmConfig {
    load_layers(Path::new(SYSTEM_CONFIG), &config_dir.join(USER_CONFIG_FILE))
}
