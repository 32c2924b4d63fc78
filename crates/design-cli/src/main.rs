use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use design_cli::{run, Command as FormCommand, Invocation};
use design_core::{Destination, FormConfig};
use design_snapshot::FieldPath;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn continue_flag() -> Arg {
    Arg::new("continue")
        .long("continue")
        .action(ArgAction::SetTrue)
        .help("Go to the next editing step after saving instead of the overview")
}

fn index_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .required(true)
        .value_parser(value_parser!(usize))
        .help(help)
}

fn cli() -> Command {
    Command::new("design-form")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Edit experiment designs stored in a directory tree")
        .subcommand_required(true)
        .arg(
            Arg::new("root")
                .long("root")
                .global(true)
                .default_value(".")
                .value_parser(value_parser!(PathBuf))
                .help("Store root containing experiments/<slug>/design-<kind>.json"),
        )
        .arg(
            Arg::new("slug")
                .long("slug")
                .global(true)
                .help("Experiment slug"),
        )
        .arg(
            Arg::new("kind")
                .long("kind")
                .global(true)
                .help("Design kind segment (pref, multi-pref, addon, branched-addon, generic)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML file with api_root, site_root and next_step_segment"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging"),
        )
        .subcommand(Command::new("show").about("Print the form"))
        .subcommand(
            Command::new("set")
                .about("Set one field and save")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .value_parser(value_parser!(FieldPath))
                        .help("Field path, e.g. branches[0].name"),
                )
                .arg(Arg::new("value").required(true).help("New value"))
                .arg(continue_flag()),
        )
        .subcommand(
            Command::new("add-branch")
                .about("Append a branch and save")
                .arg(continue_flag()),
        )
        .subcommand(
            Command::new("remove-branch")
                .about("Remove a branch and save")
                .arg(index_arg("index", "Branch index"))
                .arg(continue_flag()),
        )
        .subcommand(
            Command::new("add-pref")
                .about("Append an empty preference to a branch and save")
                .arg(index_arg("branch", "Branch index"))
                .arg(continue_flag()),
        )
        .subcommand(
            Command::new("remove-pref")
                .about("Remove a preference from a branch and save")
                .arg(index_arg("branch", "Branch index"))
                .arg(index_arg("index", "Preference index"))
                .arg(continue_flag()),
        )
}

fn required<T: Clone + Send + Sync + 'static>(args: &ArgMatches, name: &str) -> Result<T> {
    args.get_one::<T>(name)
        .cloned()
        .with_context(|| format!("missing argument '{name}'"))
}

fn form_command(name: &str, args: &ArgMatches) -> Result<FormCommand> {
    Ok(match name {
        "show" => FormCommand::Show,
        "set" => FormCommand::Set {
            path: required(args, "path")?,
            value: required(args, "value")?,
        },
        "add-branch" => FormCommand::AddBranch,
        "remove-branch" => FormCommand::RemoveBranch(required(args, "index")?),
        "add-pref" => FormCommand::AddPref(required(args, "branch")?),
        "remove-pref" => FormCommand::RemovePref {
            branch: required(args, "branch")?,
            index: required(args, "index")?,
        },
        other => anyhow::bail!("unknown command '{other}'"),
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let matches = cli().get_matches();
    let (name, args) = matches.subcommand().context("no command given")?;

    let level = if args.get_flag("verbose") { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => FormConfig::load(path)?,
        None => FormConfig::default(),
    };
    let destination = if args.try_get_one::<bool>("continue").ok().flatten().copied().unwrap_or(false) {
        Destination::NextStep
    } else {
        Destination::Overview
    };

    let report = run(Invocation {
        root: args
            .get_one::<PathBuf>("root")
            .or_else(|| matches.get_one::<PathBuf>("root"))
            .cloned()
            .unwrap_or_else(|| PathBuf::from(".")),
        slug: required(args, "slug")?,
        kind: required(args, "kind")?,
        config,
        command: form_command(name, args)?,
        destination,
    })
    .await?;

    print!("{}", report.render());
    Ok(if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
