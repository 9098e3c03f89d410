//! Command dispatch

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::application::{GenerateRequest, GenerationReport, Mode, Outcome};
use crate::cli::args::{Cli, Commands, ConfigCommands, SelectionArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, project_config_path, Settings};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Run the parsed command, returning the process exit code.
pub fn execute_command(cli: &Cli) -> CliResult<i32> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see 'genja --help'".to_string(),
        ));
    };

    let project_dir = project_dir(cli)?;
    match command {
        Commands::Generate(args) => run(cli, &project_dir, args, Mode::Generate),
        Commands::DryRun(args) => run(cli, &project_dir, args, Mode::DryRun),
        Commands::Clean(args) => run(cli, &project_dir, args, Mode::Clean),
        Commands::Rules => cmd_rules(cli, &project_dir),
        Commands::Extensions => cmd_extensions(cli, &project_dir),
        Commands::Config { command } => cmd_config(cli, &project_dir, command),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(crate::exitcode::OK)
        }
    }
}

fn project_dir(cli: &Cli) -> CliResult<PathBuf> {
    match &cli.project_dir {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir()
            .map_err(|e| CliError::Infra(InfraError::io("determine current directory", e))),
    }
}

fn container(cli: &Cli, project_dir: &Path) -> CliResult<ServiceContainer> {
    let settings = Settings::load(project_dir, cli.config.as_deref())?;
    debug!("settings: {:?}", settings);
    Ok(ServiceContainer::new(settings)?)
}

#[instrument(skip(cli))]
fn run(cli: &Cli, project_dir: &Path, args: &SelectionArgs, mode: Mode) -> CliResult<i32> {
    let container = container(cli, project_dir)?;
    let generator = container.generator()?;
    if generator.registered_extensions().is_empty() {
        output::warning("no extensions registered, nothing is a template");
    }

    let request = GenerateRequest {
        dir_pattern: args.dir_pattern.clone(),
        file_pattern: args.file_pattern.clone(),
        mode,
        recursive: args.recursive,
        force: args.force,
    };
    let report = generator.generate(&request)?;

    match mode {
        Mode::Generate => print_generate(&report),
        Mode::DryRun => print_dry_run(&report),
        Mode::Clean => print_clean(&report),
    }

    if report.has_failures() {
        Ok(crate::exitcode::PARTIAL)
    } else {
        Ok(crate::exitcode::OK)
    }
}

fn print_generate(report: &GenerationReport) {
    for record in report.records() {
        match &record.outcome {
            Outcome::Generated => output::action("generated", &record.output.display()),
            Outcome::Failed(reason) => {
                output::failure(&format!("{}: {}", record.output.display(), reason))
            }
            _ => {}
        }
    }
    output::success(&format!(
        "{} generated, {} up to date, {} failed",
        report.generated(),
        report.up_to_date(),
        report.failures().count()
    ));
}

/// One block per template: the rule it resolved to, then its outputs.
fn print_dry_run(report: &GenerationReport) {
    for template in report.templates() {
        output::info(&format!(
            "Process file '{}' with rule '{}':",
            template.template.display(),
            template.rule
        ));
        for record in report.outputs_of(&template.template) {
            output::info(&format!("   -> {}", record.output.display()));
        }
    }
}

fn print_clean(report: &GenerationReport) {
    for record in report.records() {
        match &record.outcome {
            Outcome::Removed => output::action("removed", &record.output.display()),
            Outcome::Failed(reason) => {
                output::failure(&format!("{}: {}", record.output.display(), reason))
            }
            _ => {}
        }
    }
    output::success(&format!("{} removed", report.removed()));
}

fn cmd_rules(cli: &Cli, project_dir: &Path) -> CliResult<i32> {
    let container = container(cli, project_dir)?;
    let generator = container.generator()?;
    let registry = generator.registry();
    if registry.is_empty() {
        output::warning("no rules registered");
        return Ok(crate::exitcode::OK);
    }
    output::header(&generator.root().display());
    output::info(&registry.to_tree());
    Ok(crate::exitcode::OK)
}

fn cmd_extensions(cli: &Cli, project_dir: &Path) -> CliResult<i32> {
    let container = container(cli, project_dir)?;
    let generator = container.generator()?;
    for (input, out) in generator.registered_extensions().iter() {
        if out.is_empty() {
            output::info(&format!(".{} -> (no extension)", input));
        } else {
            output::info(&format!(".{} -> .{}", input, out));
        }
    }
    Ok(crate::exitcode::OK)
}

fn cmd_config(cli: &Cli, project_dir: &Path, command: &ConfigCommands) -> CliResult<i32> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(project_dir, cli.config.as_deref())?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                project_config_path(project_dir)
            };
            if path.exists() {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
            }
            std::fs::write(&path, Settings::template())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::action("created", &path.display());
        }
        ConfigCommands::Path => {
            let global = global_config_path();
            let project = cli
                .config
                .clone()
                .unwrap_or_else(|| project_config_path(project_dir));
            match global {
                Some(path) => output::detail(&format!("global:  {}{}", path.display(), marker(&path))),
                None => output::detail(&"global:  (unavailable)"),
            }
            output::detail(&format!("project: {}{}", project.display(), marker(&project)));
        }
    }
    Ok(crate::exitcode::OK)
}

fn marker(path: &Path) -> &'static str {
    if path.exists() {
        ""
    } else {
        " (missing)"
    }
}
