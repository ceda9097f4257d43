//! HL7 Workbench CLI.

use std::io::{self, IsTerminal};
use std::time::Duration;

use clap::{ColorChoice, Parser};

use hl7_core::{Engine, EngineConfig};
use hl7_datagen::EnhancedConfig;

use hl7_cli::cli::{Cli, Command, LogFormatArg};
use hl7_cli::commands::{
    run_deidentify, run_diff, run_generate, run_session, run_standards, run_validate,
};
use hl7_cli::logging::{LogConfig, LogFormat, init_logging};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let engine = match Engine::new(engine_config_from_cli(&cli)) {
        Ok(engine) => engine,
        Err(error) => {
            eprintln!("error: {error:#}");
            std::process::exit(1);
        }
    };

    let result = match &cli.command {
        Command::Generate(args) => run_generate(&engine, args),
        Command::Validate(args) => run_validate(&engine, args),
        Command::Deidentify(args) => run_deidentify(&engine, args),
        Command::Diff(args) => run_diff(&engine, args),
        Command::Session(command) => run_session(&engine, command),
        Command::Standards(command) => run_standards(&engine, command),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn engine_config_from_cli(cli: &Cli) -> EngineConfig {
    EngineConfig {
        standards_dir: cli.standards_dir.clone(),
        session_store: cli.session_store.clone(),
        enhanced: EnhancedConfig {
            endpoint: cli.enhance_endpoint.clone(),
            timeout: Duration::from_secs(cli.enhance_timeout),
        },
    }
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !cli.verbosity.is_present();
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.log_data = cli.log_data;
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
