use crate::config::CommandConfig;
use crate::error::{Error, Result};
use crate::settings::{PowerSource, SectionSettings};
use std::process::Command;

/// Access to the machine's power-management utilities.
///
/// Everything bpm learns about or changes on the host goes through here, so
/// handlers can run against an in-memory fake in tests.
pub trait PowerProvider {
    /// Full text of the hardware report (`system_profiler SPHardwareDataType`).
    fn hardware_report(&self) -> Result<String>;

    /// Human-readable machine name (`scutil --get ComputerName`).
    fn computer_name(&self) -> Result<String>;

    /// Raw settings dump (`pmset -g custom`).
    fn settings_dump(&self) -> Result<String>;

    /// Write one power source's settings with elevated privileges.
    fn apply_section(&mut self, source: PowerSource, settings: &SectionSettings) -> Result<()>;

    /// Shell-style rendering of what `apply_section` would run.
    fn describe_apply(&self, source: PowerSource, settings: &SectionSettings) -> String;
}

/// Provider backed by real external commands.
#[derive(Debug, Clone)]
pub struct SystemProvider {
    commands: CommandConfig,
    elevate: bool,
}

impl SystemProvider {
    pub fn new(commands: CommandConfig) -> Self {
        let elevate = !commands.elevate.is_empty() && !nix::unistd::geteuid().is_root();
        Self { commands, elevate }
    }

    /// Full argv used to apply `settings` for `source`.
    pub fn apply_command_line(
        &self,
        source: PowerSource,
        settings: &SectionSettings,
    ) -> Vec<String> {
        set_command_line(&self.commands, self.elevate, source, settings)
    }
}

/// Build the argv for a settings-set invocation: optional elevation prefix,
/// the configured setter, the source flag, then alternating keys and values.
pub fn set_command_line(
    commands: &CommandConfig,
    elevate: bool,
    source: PowerSource,
    settings: &SectionSettings,
) -> Vec<String> {
    let mut cmd = Vec::with_capacity(
        commands.elevate.len() + commands.settings_set.len() + 1 + settings.len() * 2,
    );
    if elevate {
        cmd.extend(commands.elevate.iter().cloned());
    }
    cmd.extend(commands.settings_set.iter().cloned());
    cmd.push(source.flag().to_string());
    for (key, value) in settings {
        cmd.push(key.clone());
        cmd.push(value.clone());
    }
    cmd
}

/// Run a command and capture its stdout. Fails on spawn error or nonzero exit.
fn run_capture(name: &'static str, argv: &[String]) -> Result<String> {
    let (program, args) = argv.split_first().ok_or(Error::EmptyCommand(name))?;
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| Error::Spawn {
            program: program.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(Error::CommandFailed {
            program: program.clone(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a command with inherited stdio so `sudo` can prompt for a password.
fn run_interactive(name: &'static str, argv: &[String]) -> Result<()> {
    let (program, args) = argv.split_first().ok_or(Error::EmptyCommand(name))?;
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|source| Error::Spawn {
            program: program.clone(),
            source,
        })?;

    if !status.success() {
        return Err(Error::CommandFailed {
            program: argv.join(" "),
            status: status.to_string(),
            stderr: String::new(),
        });
    }
    Ok(())
}

impl PowerProvider for SystemProvider {
    fn hardware_report(&self) -> Result<String> {
        run_capture("hardware_info", &self.commands.hardware_info)
    }

    fn computer_name(&self) -> Result<String> {
        run_capture("computer_name", &self.commands.computer_name)
    }

    fn settings_dump(&self) -> Result<String> {
        run_capture("settings_dump", &self.commands.settings_dump)
    }

    fn apply_section(&mut self, source: PowerSource, settings: &SectionSettings) -> Result<()> {
        let argv = self.apply_command_line(source, settings);
        run_interactive("settings_set", &argv)
    }

    fn describe_apply(&self, source: PowerSource, settings: &SectionSettings) -> String {
        self.apply_command_line(source, settings).join(" ")
    }
}
