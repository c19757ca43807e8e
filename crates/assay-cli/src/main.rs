use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use assay_generator::IteratorOptions;
use assay_init::{ConsolePrompter, InitWizard};
use assay_project::{FileProject, ProjectStore};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let directory = Arg::new("directory")
        .short('d')
        .long("directory")
        .default_value(".")
        .value_parser(value_parser!(PathBuf))
        .help("Directory holding (or to hold) the assay project");

    Command::new("assay")
        .version(assay_init::VERSION)
        .about("Data asset discovery and project setup")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable debug logging on stderr"),
        )
        .subcommand(
            Command::new("init")
                .about("Create or complete a project interactively")
                .arg(directory.clone()),
        )
        .subcommand(
            Command::new("assets")
                .about("List data asset names per generator")
                .arg(directory.clone())
                .arg(
                    Arg::new("datasource")
                        .long("datasource")
                        .help("Only this datasource"),
                ),
        )
        .subcommand(
            Command::new("batches")
                .about("Print the batch descriptors of a data asset as JSON lines")
                .arg(directory)
                .arg(
                    Arg::new("asset")
                        .long("asset")
                        .required(true)
                        .help("Data asset name"),
                )
                .arg(
                    Arg::new("datasource")
                        .long("datasource")
                        .help("Datasource serving the asset (default: first configured)"),
                )
                .arg(
                    Arg::new("generator")
                        .long("generator")
                        .help("Generator serving the asset (default: first reporting it)"),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize))
                        .help("Row limit attached to every descriptor"),
                ),
        )
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn directory(args: &ArgMatches) -> PathBuf {
    args.get_one::<PathBuf>("directory")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."))
}

fn initialized_project(args: &ArgMatches) -> Result<FileProject> {
    let dir = directory(args);
    let project = FileProject::new(&dir);
    anyhow::ensure!(
        project.is_initialized(),
        "no assay project in {}; run `assay init -d {}` first",
        dir.display(),
        dir.display()
    );
    Ok(project)
}

fn run_init(args: &ArgMatches) -> Result<ExitCode> {
    let mut wizard = InitWizard::file_backed(directory(args));
    let outcome = wizard
        .run(&mut ConsolePrompter::stdio())
        .context("init failed")?;
    debug!(state = ?outcome.final_state, load_errors = outcome.load_errors, "init finished");
    Ok(if outcome.exit_code() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_assets(args: &ArgMatches) -> Result<ExitCode> {
    let project = initialized_project(args)?;
    let only = args.get_one::<String>("datasource");
    for summary in project.list_datasources()? {
        if only.is_some_and(|name| *name != summary.name) {
            continue;
        }
        let datasource = project.get_datasource(&summary.name)?;
        for (generator, assets) in datasource.available_data_asset_names()? {
            println!("{}/{generator}:", summary.name);
            for asset in assets {
                println!("  {asset}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_batches(args: &ArgMatches) -> Result<ExitCode> {
    let project = initialized_project(args)?;
    let datasource = match args.get_one::<String>("datasource") {
        Some(name) => name.clone(),
        None => project
            .list_datasources()?
            .into_iter()
            .next()
            .map(|summary| summary.name)
            .context("project has no datasources")?,
    };
    let datasource = project.get_datasource(&datasource)?;
    debug!(datasource = datasource.name(), "listing batches");

    let asset = args
        .get_one::<String>("asset")
        .context("--asset is required")?;
    let generator = args.get_one::<String>("generator").map(String::as_str);
    let mut options = IteratorOptions::new();
    if let Some(limit) = args.get_one::<usize>("limit") {
        options = options.with_limit(*limit);
    }

    for kwargs in datasource.get_iterator(asset, generator, &options)? {
        println!("{}", kwargs.to_json());
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    let result = match matches.subcommand() {
        Some(("init", args)) => run_init(args),
        Some(("assets", args)) => run_assets(args),
        Some(("batches", args)) => run_batches(args),
        _ => Ok(ExitCode::FAILURE),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn batches_parses_limit_and_asset() {
        let matches = cli()
            .try_get_matches_from(["assay", "batches", "-d", "proj", "--asset", "f3", "--limit", "5"])
            .unwrap();
        let Some(("batches", args)) = matches.subcommand() else {
            panic!("expected batches");
        };
        assert_eq!(args.get_one::<String>("asset").unwrap(), "f3");
        assert_eq!(*args.get_one::<usize>("limit").unwrap(), 5);
        assert_eq!(directory(args), PathBuf::from("proj"));
    }

    #[test]
    fn verbose_is_global() {
        let matches = cli()
            .try_get_matches_from(["assay", "assets", "--verbose"])
            .unwrap();
        assert!(matches.get_flag("verbose"));
    }
}
