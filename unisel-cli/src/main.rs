mod app;
mod commands;
mod output;
mod targets;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })
    .expect("failed to set Ctrl+C handler");

    let cli = Cli::parse();

    // Show unisel info+ on stderr unless --json; --verbose enables debug;
    // RUST_LOG overrides.
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("unisel", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Make {
            action,
            function,
            target,
            solution,
            output_dir,
        } => commands::make::run(
            *action,
            function,
            target,
            solution.as_deref(),
            output_dir.as_deref(),
            &cli.global,
        ),
        Command::Transform {
            action,
            function,
            target,
            output_dir,
        } => commands::transform::run(*action, function, target, output_dir.as_deref(), &cli.global),
        Command::Plot {
            action,
            function,
            output_dir,
        } => commands::plot::run(*action, function, output_dir.as_deref(), &cli.global),
        Command::Check { action, function } => commands::check::run(*action, function, &cli.global),
    }
}
