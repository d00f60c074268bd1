//! Command handlers. Each resolves the device, works on the store and
//! returns an outcome for `output` to render.

use crate::config::Context;
use crate::device::{resolve_device_id, resolve_device_name};
use crate::error::{Error, Result};
use crate::journal::{self, Priority};
use crate::provider::PowerProvider;
use crate::settings::{PowerSettings, PowerSource, parse_settings};
use crate::store::{self, PolicySnapshot};
use serde::Serialize;

/// Policy name used when none is given.
pub const DEFAULT_POLICY: &str = "default";

#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub device_id: String,
    pub device_name: String,
    pub policy_name: String,
    /// False when an existing policy was overwritten.
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome {
    pub device_id: String,
    pub device_name: String,
    pub policy_name: String,
    pub applied: Vec<PowerSource>,
    /// Command lines that would run; only filled for dry runs.
    pub planned: Vec<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyListing {
    pub device_id: String,
    pub device_name: String,
    pub policies: Vec<NamedPolicy>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedPolicy {
    pub name: String,
    #[serde(flatten)]
    pub snapshot: PolicySnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub device_id: String,
    pub policy_name: String,
    pub remaining: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub device_id: String,
    pub device_name: String,
    pub current: bool,
    pub policy_names: Vec<String>,
}

/// Read and parse the live power settings.
pub fn read_current_settings(provider: &impl PowerProvider) -> Result<PowerSettings> {
    let dump = provider.settings_dump()?;
    Ok(parse_settings(&dump))
}

/// Capture the current settings and store them under `policy_name`.
pub fn save_current_policy(
    ctx: &Context,
    provider: &impl PowerProvider,
    policy_name: &str,
) -> Result<SaveOutcome> {
    let device_id = resolve_device_id(provider)?;
    let mut store = store::load(&ctx.store_path);

    let settings = read_current_settings(provider)?;
    let device_name = resolve_device_name(provider);
    let timestamp = store::now();

    let record = store.device_or_insert(&device_id, &device_name);
    let created = match record.policies.get_mut(policy_name) {
        Some(existing) => {
            existing.settings = settings;
            existing.last_applied = Some(timestamp);
            false
        }
        None => {
            record.policies.insert(
                policy_name.to_string(),
                PolicySnapshot {
                    settings,
                    created_at: timestamp,
                    last_applied: Some(timestamp),
                },
            );
            true
        }
    };
    let device_name = record.device_name.clone();

    store::save(&ctx.store_path, &store)?;
    journal::log(
        &ctx.config.log,
        Priority::Info,
        &format!("saved policy '{}' for {}", policy_name, device_id),
    );

    Ok(SaveOutcome {
        device_id,
        device_name,
        policy_name: policy_name.to_string(),
        created,
    })
}

/// Re-apply a saved policy, battery section first.
///
/// Sections are written one after another; if a later one fails the earlier
/// ones stay in effect and the store is left untouched.
pub fn apply_policy(
    ctx: &Context,
    provider: &mut impl PowerProvider,
    policy_name: &str,
    dry_run: bool,
) -> Result<ApplyOutcome> {
    let device_id = resolve_device_id(&*provider)?;
    let mut store = store::load(&ctx.store_path);

    let record = store.device(&device_id).ok_or(Error::NoDeviceRecord)?;
    let snapshot = record
        .policies
        .get(policy_name)
        .ok_or_else(|| Error::PolicyNotFound {
            name: policy_name.to_string(),
            available: record.policy_names(),
        })?;
    let device_name = record.device_name.clone();
    let settings = snapshot.settings.clone();

    if dry_run {
        let planned = settings
            .sections()
            .map(|(source, section)| provider.describe_apply(source, section))
            .collect();
        return Ok(ApplyOutcome {
            device_id,
            device_name,
            policy_name: policy_name.to_string(),
            applied: Vec::new(),
            planned,
            dry_run: true,
        });
    }

    let mut applied = Vec::new();
    for (source, section) in settings.sections() {
        if let Err(e) = provider.apply_section(source, section) {
            journal::log(
                &ctx.config.log,
                Priority::Warning,
                &format!("applying {} settings of '{}' failed: {}", source, policy_name, e),
            );
            return Err(Error::PartialApply {
                failed: source,
                applied,
                source: Box::new(e),
            });
        }
        applied.push(source);
    }

    if let Some(snapshot) = store
        .device_mut(&device_id)
        .and_then(|record| record.policies.get_mut(policy_name))
    {
        snapshot.last_applied = Some(store::now());
    }
    store::save(&ctx.store_path, &store)?;
    journal::log(
        &ctx.config.log,
        Priority::Info,
        &format!("applied policy '{}' for {}", policy_name, device_id),
    );

    Ok(ApplyOutcome {
        device_id,
        device_name,
        policy_name: policy_name.to_string(),
        applied,
        planned: Vec::new(),
        dry_run: false,
    })
}

/// Policies saved for this device.
pub fn list_policies(ctx: &Context, provider: &impl PowerProvider) -> Result<PolicyListing> {
    let device_id = resolve_device_id(provider)?;
    let store = store::load(&ctx.store_path);

    let listing = match store.device(&device_id) {
        Some(record) => PolicyListing {
            device_id,
            device_name: record.device_name.clone(),
            policies: record
                .policies
                .iter()
                .map(|(name, snapshot)| NamedPolicy {
                    name: name.clone(),
                    snapshot: snapshot.clone(),
                })
                .collect(),
        },
        None => PolicyListing {
            device_id,
            device_name: resolve_device_name(provider),
            policies: Vec::new(),
        },
    };
    Ok(listing)
}

/// Remove a policy. The device record stays even when it becomes empty.
pub fn delete_policy(
    ctx: &Context,
    provider: &impl PowerProvider,
    policy_name: &str,
) -> Result<DeleteOutcome> {
    let device_id = resolve_device_id(provider)?;
    let mut store = store::load(&ctx.store_path);

    let record = store.device_mut(&device_id).ok_or(Error::NoDeviceRecord)?;
    if record.policies.shift_remove(policy_name).is_none() {
        return Err(Error::PolicyNotFound {
            name: policy_name.to_string(),
            available: record.policy_names(),
        });
    }
    let remaining = record.policies.len();

    store::save(&ctx.store_path, &store)?;
    journal::log(
        &ctx.config.log,
        Priority::Info,
        &format!("deleted policy '{}' for {}", policy_name, device_id),
    );

    Ok(DeleteOutcome {
        device_id,
        policy_name: policy_name.to_string(),
        remaining,
    })
}

/// Every device in the store, flagging the one we are running on.
pub fn list_all_devices(
    ctx: &Context,
    provider: &impl PowerProvider,
) -> Result<Vec<DeviceSummary>> {
    let device_id = resolve_device_id(provider)?;
    let store = store::load(&ctx.store_path);

    Ok(store
        .devices
        .into_iter()
        .map(|(id, record)| DeviceSummary {
            current: id == device_id,
            policy_names: record.policy_names(),
            device_name: record.device_name,
            device_id: id,
        })
        .collect())
}

/// Live settings, straight from the settings dump.
pub fn show_current(provider: &impl PowerProvider) -> Result<PowerSettings> {
    read_current_settings(provider)
}
