use anyhow::Result;
use bpm::cli::{Cli, Command};
use bpm::config::{self, Context};
use bpm::output;
use bpm::policy;
use bpm::provider::SystemProvider;
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        bpm::cli::print_help();
        std::process::exit(2);
    };

    let ctx = Context::load(config::resolve_config_dir(cli.config_dir.as_deref()));
    let mut provider = SystemProvider::new(ctx.config.commands.clone());
    let json = cli.json;

    match command {
        Command::Save { name } => cmd_save(&ctx, &provider, &name, json)?,
        Command::Apply { name, dry_run } => cmd_apply(&ctx, &mut provider, &name, dry_run, json)?,
        Command::List => cmd_list(&ctx, &provider, json)?,
        Command::Delete { name } => cmd_delete(&ctx, &provider, &name, json)?,
        Command::Devices => cmd_devices(&ctx, &provider, json)?,
        Command::Current => cmd_current(&provider, json)?,
        Command::Completions { shell } => bpm::cli::print_completions(shell),
    }

    Ok(())
}

fn cmd_save(ctx: &Context, provider: &SystemProvider, name: &str, json: bool) -> Result<()> {
    let outcome = policy::save_current_policy(ctx, provider, name)?;
    if json {
        return output::print_json(&outcome);
    }
    output::print_saved(&outcome);
    Ok(())
}

fn cmd_apply(
    ctx: &Context,
    provider: &mut SystemProvider,
    name: &str,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let outcome = policy::apply_policy(ctx, provider, name, dry_run)?;
    if json {
        return output::print_json(&outcome);
    }
    output::print_applied(&outcome);
    Ok(())
}

fn cmd_list(ctx: &Context, provider: &SystemProvider, json: bool) -> Result<()> {
    let listing = policy::list_policies(ctx, provider)?;
    if json {
        return output::print_json(&listing);
    }
    output::print_policy_listing(&listing);
    Ok(())
}

fn cmd_delete(ctx: &Context, provider: &SystemProvider, name: &str, json: bool) -> Result<()> {
    let outcome = policy::delete_policy(ctx, provider, name)?;
    if json {
        return output::print_json(&outcome);
    }
    output::print_deleted(&outcome);
    Ok(())
}

fn cmd_devices(ctx: &Context, provider: &SystemProvider, json: bool) -> Result<()> {
    let devices = policy::list_all_devices(ctx, provider)?;
    if json {
        return output::print_json(&devices);
    }
    output::print_devices(&devices);
    Ok(())
}

fn cmd_current(provider: &SystemProvider, json: bool) -> Result<()> {
    let settings = policy::show_current(provider)?;
    if json {
        return output::print_json(&settings);
    }
    output::print_current(&settings);
    Ok(())
}
