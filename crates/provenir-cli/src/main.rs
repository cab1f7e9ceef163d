use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use provenir_core::Program;
use provenir_emit::{DepGraphDoc, DotEmitter, EmitContext, Emitter, JsonEmitter, TextEmitter};
use provenir_vm::{Machine, MachineConfig, Outcome, QueryTarget, VmError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "provenir")]
#[command(about = "provenir - dependency-tracking interpreter for fault localization")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a program and report the outcome with provenance summaries.
    Run {
        input: PathBuf,

        #[arg(long, default_value = "Main.main")]
        entry: String,

        #[arg(long, default_value_t = 1_000_000)]
        max_steps: u64,

        /// Print the identities of every executed instruction.
        #[arg(long)]
        trace: bool,

        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Execute a program and print the dependency DAG of one slot.
    Explain {
        input: PathBuf,

        #[arg(long, default_value = "Main.main")]
        entry: String,

        /// Local slot of the entry frame to explain.
        #[arg(long, conflicts_with = "ret")]
        local: Option<u16>,

        /// Explain the entry method's return value instead of a local.
        #[arg(long)]
        ret: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: ExplainFormat,
    },

    /// Parse and validate a program without executing it.
    Check {
        input: PathBuf,

        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExplainFormat {
    Text,
    Json,
    Dot,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            entry,
            max_steps,
            trace,
            json,
        } => cmd_run(input, entry, max_steps, trace, json),
        Commands::Explain {
            input,
            entry,
            local,
            ret,
            format,
        } => cmd_explain(input, entry, local, ret, format),
        Commands::Check { input, verbose } => cmd_check(input, verbose),
    }
}

fn load(input: &Path) -> Result<Program> {
    let program = if input.is_dir() {
        provenir_asm::load_dir(input)
    } else {
        provenir_asm::load_file(input)
    };
    program.with_context(|| format!("failed to assemble {}", input.display()))
}

fn cmd_run(input: PathBuf, entry: String, max_steps: u64, trace: bool, json: bool) -> Result<()> {
    let program = Arc::new(load(&input)?);
    let config = MachineConfig {
        max_steps,
        ..MachineConfig::default()
    };
    let mut machine = Machine::with_config(program.clone(), config)?;
    machine.call_entry(&entry, Vec::new())?;

    let result = machine.run();

    if json {
        return print_run_json(&machine, &program, result);
    }

    match result {
        Ok(Outcome::Halted) => {
            println!("{} {}", "halted:".green().bold(), entry);
            print_locals(&machine);
        }
        Ok(Outcome::Finished(slot)) => match slot {
            Some(slot) => {
                println!("{} {}", "returned:".green().bold(), slot.value);
                let doc = DepGraphDoc::single(slot.dep.as_ref());
                print_text_doc(&program, &doc)?;
            }
            None => println!("{} {}", "finished:".green().bold(), entry),
        },
        Err(VmError::Uncaught(thrown)) => {
            println!(
                "{} {} at {}",
                "uncaught:".red().bold(),
                thrown.class_name,
                describe_source(&program, thrown.at)
            );
            let doc = DepGraphDoc::single(thrown.dep.as_ref());
            print_text_doc(&program, &doc)?;
        }
        Err(err) => return Err(err.into()),
    }

    if trace {
        println!("{}", "trace:".bold());
        for source in machine.trace() {
            println!("    {}", describe_source(&program, *source));
        }
    }
    Ok(())
}

fn print_locals(machine: &Machine) {
    let Some(frame) = machine.frames().first() else {
        return;
    };
    for (slot, entry) in frame.locals.iter().enumerate() {
        let leaves = provenir_core::DynamicDependency::leaf_set(entry.dep.as_ref());
        let deps = if leaves.is_empty() {
            "no dependency".dimmed().to_string()
        } else {
            format!("{} leaf source(s)", leaves.len())
        };
        println!("    local {}: {} ({})", slot, entry.value, deps);
    }
}

fn print_run_json(
    machine: &Machine,
    program: &Program,
    result: provenir_vm::Result<Outcome>,
) -> Result<()> {
    let report = match result {
        Ok(Outcome::Halted) => {
            let locals: Vec<serde_json::Value> = machine
                .frames()
                .first()
                .map(|frame| {
                    frame
                        .locals
                        .iter()
                        .enumerate()
                        .map(|(slot, entry)| {
                            serde_json::json!({
                                "slot": slot,
                                "value": entry.value,
                                "dependency": DepGraphDoc::single(entry.dep.as_ref()),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();
            serde_json::json!({ "outcome": "halted", "locals": locals })
        }
        Ok(Outcome::Finished(slot)) => serde_json::json!({
            "outcome": "finished",
            "return": slot.map(|s| serde_json::json!({
                "value": s.value,
                "dependency": DepGraphDoc::single(s.dep.as_ref()),
            })),
        }),
        Err(VmError::Uncaught(thrown)) => serde_json::json!({
            "outcome": "uncaught",
            "exception": thrown.class_name,
            "at": describe_source(program, thrown.at),
            "dependency": DepGraphDoc::single(thrown.dep.as_ref()),
        }),
        Err(err) => return Err(err.into()),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_explain(
    input: PathBuf,
    entry: String,
    local: Option<u16>,
    ret: bool,
    format: ExplainFormat,
) -> Result<()> {
    if local.is_none() && !ret {
        bail!("pass --local <slot> or --ret to pick a value to explain");
    }
    let program = Arc::new(load(&input)?);
    let mut machine = Machine::new(program.clone())?;
    machine.call_entry(&entry, Vec::new())?;
    machine.run()?;

    let target = match local {
        Some(slot) => QueryTarget::Local { frame: 0, slot },
        None => QueryTarget::LastReturn,
    };
    let dep = machine.dependency_of(target);
    let doc = DepGraphDoc::single(dep.as_ref());

    match format {
        ExplainFormat::Text => {
            if let Some(value) = machine.value_of(target) {
                println!("{} {}", "value:".bold(), value);
            }
            print_text_doc(&program, &doc)?;
        }
        ExplainFormat::Json => {
            let mut out = std::io::stdout();
            JsonEmitter::pretty().emit(&doc, &mut out, &mut EmitContext::plain())?;
        }
        ExplainFormat::Dot => {
            let mut out = std::io::stdout();
            DotEmitter.emit(&doc, &mut out, &mut EmitContext::plain())?;
        }
    }
    Ok(())
}

fn cmd_check(input: PathBuf, verbose: bool) -> Result<()> {
    let program = load(&input)?;
    let classes = program.classes.len();
    let methods = program.methods.len();
    println!(
        "{} {} ({} classes, {} methods)",
        "ok:".green().bold(),
        input.display(),
        classes,
        methods
    );
    if verbose {
        for method in program.methods.values() {
            let kind = if method.is_native() { "native" } else { "bytecode" };
            println!(
                "    {} {} {}",
                kind.dimmed(),
                program.qualified_method_name(method.id),
                method.sig
            );
        }
    }
    Ok(())
}

fn print_text_doc(program: &Program, doc: &DepGraphDoc) -> Result<()> {
    let emitter = TextEmitter::with_program(program.clone());
    let mut out = std::io::stdout();
    emitter.emit(doc, &mut out, &mut EmitContext::new())?;
    Ok(())
}

fn describe_source(program: &Program, source: provenir_core::DependencySource) -> String {
    format!(
        "{}{}",
        program.qualified_method_name(source.method),
        source.pc
    )
}
