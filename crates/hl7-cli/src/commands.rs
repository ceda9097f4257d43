use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use hl7_core::Engine;
use hl7_session::SessionTemplate;

use crate::cli::{
    DeidentifyArgs, DiffArgs, GenerateArgs, ReportFormatArg, SessionCommand, StandardsCommand,
    ValidateArgs,
};
use crate::logging::redact_value;
use crate::output::{
    render_deltas, render_report, segment_table, session_table, summary_table,
};

/// Read a message payload from a file, or stdin for `-`.
fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("read stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(source).with_context(|| format!("read {source}"))
    }
}

fn write_output(out: Option<&Path>, contents: &str) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, contents).with_context(|| format!("write {}", path.display()))?;
            info!(path = %path.display(), "wrote output");
        }
        None => print!("{contents}"),
    }
    Ok(())
}

pub fn run_generate(engine: &Engine, args: &GenerateArgs) -> Result<i32> {
    let progress = if args.count > 1 {
        let bar = ProgressBar::new(args.count as u64);
        let style = ProgressStyle::with_template("{bar:30} {pos}/{len} messages")
            .context("progress template")?;
        bar.set_style(style);
        Some(bar)
    } else {
        None
    };

    let messages = engine.generate_batch(
        &args.message_type,
        &args.facility,
        args.session.as_deref(),
        args.count,
    )?;

    let mut rendered = String::new();
    let mut failed = false;
    for (index, message) in messages.iter().enumerate() {
        let wire = engine.render_message(message);

        if args.validate {
            let report = engine.validate_message(&wire, &args.message_type, None)?;
            if report.has_errors() {
                eprintln!("message {} failed validation:", index + 1);
                eprint!("{}", render_report(&report));
                failed = true;
            }
        }

        rendered.push_str(&wire);
        rendered.push('\n');
        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    write_output(args.out.as_deref(), &rendered)?;
    Ok(if failed { 1 } else { 0 })
}

pub fn run_validate(engine: &Engine, args: &ValidateArgs) -> Result<i32> {
    let raw = read_input(&args.input)?;
    let message_type = match &args.message_type {
        Some(message_type) => message_type.clone(),
        None => {
            let message = engine.parse_message(&raw)?;
            message
                .message_type()
                .context("message carries no MSH-9 type; pass --message-type")?
        }
    };
    let report = engine.validate_message(&raw, &message_type, args.vendor.as_deref())?;

    match args.format {
        ReportFormatArg::Text => print!("{}", render_report(&report)),
        ReportFormatArg::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("serialize report")?
            );
        }
    }
    Ok(if report.has_errors() { 1 } else { 0 })
}

pub fn run_deidentify(engine: &Engine, args: &DeidentifyArgs) -> Result<i32> {
    let raw = read_input(&args.input)?;
    let message = engine.deidentify(&raw)?;
    write_output(args.out.as_deref(), &engine.render_message(&message))?;
    Ok(0)
}

pub fn run_diff(engine: &Engine, args: &DiffArgs) -> Result<i32> {
    let raw_a = read_input(&args.a)?;
    let raw_b = read_input(&args.b)?;
    let deltas = engine.diff_messages(&raw_a, &raw_b)?;

    match args.format {
        ReportFormatArg::Text => print!("{}", render_deltas(&deltas, args.all)),
        ReportFormatArg::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&deltas).context("serialize deltas")?
            );
        }
    }
    let differs = deltas.iter().any(|d| !d.is_unchanged());
    Ok(if differs { 1 } else { 0 })
}

pub fn run_session(engine: &Engine, command: &SessionCommand) -> Result<i32> {
    match command {
        SessionCommand::Lock { path, value } => {
            let session = engine.session_lock(path, value)?;
            debug!(path = %path, value = redact_value(value), "locked field");
            println!(
                "locked {path} in session '{}' ({} lock(s))",
                session.name,
                session.locks.len()
            );
        }
        SessionCommand::Clear { path } => {
            engine.session_clear(path)?;
            println!("cleared {path}");
        }
        SessionCommand::Save { name } => {
            let session = engine.session_save(name)?;
            println!("saved session '{}' (permanent)", session.name);
        }
        SessionCommand::Use { name } => {
            let session = engine.session_use(name)?;
            println!(
                "using session '{}' ({} lock(s))",
                session.name,
                session.locks.len()
            );
        }
        SessionCommand::List => {
            let sessions = engine.session_list();
            if sessions.is_empty() {
                println!("no sessions");
            } else {
                let current = engine.sessions().current().map(|s| s.name);
                println!("{}", session_table(&sessions, current.as_deref()));
            }
        }
        SessionCommand::Remove { name } => {
            engine.session_remove(name)?;
            println!("removed session '{name}'");
        }
        SessionCommand::Export { name, out } => {
            let template = engine.session_export(name)?;
            let json = template.to_json().context("serialize template")?;
            write_output(out.as_deref(), &format!("{json}\n"))?;
        }
        SessionCommand::Import { file } => {
            let raw = read_input(file)?;
            let template = SessionTemplate::from_json(&raw).context("parse template")?;
            let session = engine.session_import(&template)?;
            println!(
                "imported session '{}' ({} lock(s))",
                session.name,
                session.locks.len()
            );
        }
    }
    Ok(0)
}

pub fn run_standards(engine: &Engine, command: &StandardsCommand) -> Result<i32> {
    match command {
        StandardsCommand::Verify => {
            // Reaching this point means the registry already loaded and
            // every digest checked out; print what was verified.
            println!("{}", summary_table(&engine.registry().summary()));
        }
        StandardsCommand::Segments => {
            println!("{}", segment_table(engine.registry()));
        }
        StandardsCommand::Types => {
            let registry = engine.registry();
            let types = registry.message_types();
            if types.is_empty() {
                bail!("registry defines no message structures");
            }
            println!("message types:");
            for message_type in types {
                println!("  {message_type}");
            }
            let vendors = registry.vendor_ids();
            if !vendors.is_empty() {
                println!("vendor dialects:");
                for vendor in vendors {
                    println!("  {vendor}");
                }
            }
        }
    }
    Ok(0)
}
