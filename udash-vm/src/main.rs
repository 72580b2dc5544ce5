#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, NamedSource, Report};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use udash_ast::{Position, Program};
use udash_vm::{
    allowable, Analyzer, ConfigFile, DebugRecord, DrawOp, Environment, Recorder, UnresolvedSymbol,
    Value, Vm, VmConfig,
};

#[derive(Parser, Debug)]
#[command(name = "udash", version, about = "Run and inspect udash image programs")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(clap::Args, Debug)]
struct Common {
    /// Path to the image source
    #[arg(long)]
    file: PathBuf,

    /// Environment as a JSON object, e.g. '{"t": 0.5}'
    #[arg(long)]
    env: Option<String>,

    /// TOML config file with a [vm] table
    #[arg(long)]
    config: Option<PathBuf>,

    /// Label to run
    #[arg(long, default_value = "main")]
    label: String,

    /// Fail on symbols that name nothing instead of pushing them
    #[arg(long, default_value_t = false)]
    reject_unresolved: bool,

    /// Override the nesting limit
    #[arg(long)]
    max_depth: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run a program on a recording canvas and print the final state
    Run {
        #[command(flatten)]
        common: Common,

        /// Print machine-readable JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the instructions a token depends on
    Trace {
        #[command(flatten)]
        common: Common,

        /// 1-based line of the token
        #[arg(long)]
        line: u32,

        /// 1-based token index within the line
        #[arg(long)]
        column: u32,
    },

    /// List the opcodes that could be appended without error
    Allowable {
        #[command(flatten)]
        common: Common,
    },
}

#[derive(Debug, Serialize)]
struct RunOut<'a> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    stack: &'a [Value],
    debug: &'a [DebugRecord],
    ops: &'a [DrawOp],
}

struct Loaded {
    path: PathBuf,
    label: String,
    src: String,
    program: Program,
    env: Environment,
    config: VmConfig,
}

impl Loaded {
    fn with_source(&self, err: impl miette::Diagnostic + Send + Sync + 'static) -> Report {
        with_source(&self.path, &self.src, err)
    }
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Run { common, json } => run_main(&load(&common)?, json),
        Cmd::Trace {
            common,
            line,
            column,
        } => trace_main(&load(&common)?, line, column),
        Cmd::Allowable { common } => allowable_main(&load(&common)?),
    }
}

fn load(common: &Common) -> miette::Result<Loaded> {
    let src = std::fs::read_to_string(&common.file).into_diagnostic()?;

    let mut config = match &common.config {
        Some(path) => ConfigFile::load(path)?.vm,
        None => VmConfig::default(),
    };
    if common.reject_unresolved {
        config.unresolved = UnresolvedSymbol::Reject;
    }
    if let Some(depth) = common.max_depth {
        config.max_depth = depth;
    }

    let env = match &common.env {
        Some(json) => Environment::from_json(json)?,
        None => Environment::new(),
    };

    let program = match udash_compile::compile(&src) {
        Ok(program) => program,
        Err(err) => return Err(with_source(&common.file, &src, err)),
    };

    Ok(Loaded {
        path: common.file.clone(),
        label: common.label.clone(),
        src,
        program,
        env,
        config,
    })
}

fn with_source(path: &Path, src: &str, err: impl miette::Diagnostic + Send + Sync + 'static) -> Report {
    Report::new(err).with_source_code(NamedSource::new(path.display().to_string(), src.to_string()))
}

fn run_main(loaded: &Loaded, json: bool) -> miette::Result<()> {
    let mut vm = Vm::new(loaded.config.clone());
    let mut recorder = Recorder::new();
    let result = vm.run(&loaded.program, &loaded.label, &loaded.env, &mut recorder);

    if json {
        let out = RunOut {
            ok: result.is_ok(),
            error: result.as_ref().err().map(ToString::to_string),
            stack: vm.stack(),
            debug: vm.debug_output(),
            ops: recorder.ops(),
        };
        println!("{}", serde_json::to_string(&out).into_diagnostic()?);
        return Ok(());
    }

    for value in vm.stack() {
        println!("{value}");
    }
    for record in vm.debug_output() {
        match record {
            DebugRecord::Value(value) => println!("debug: {value}"),
            DebugRecord::Stack(values) => println!("debug: {}", Value::List(values.clone())),
        }
    }
    println!("draw ops: {}", recorder.ops().len());

    result.map_err(|err| loaded.with_source(err))
}

fn trace_main(loaded: &Loaded, line: u32, column: u32) -> miette::Result<()> {
    let position = Position::new(line.saturating_sub(1), column.saturating_sub(1));
    let Some(target) = loaded.program.token_at(position) else {
        return Err(miette::miette!("no token at {line}:{column}"));
    };

    let mut analyzer = Analyzer::new(loaded.config.clone());
    let result = analyzer.run(&loaded.program, &loaded.label, &loaded.env, &mut Recorder::new());
    if let Err(err) = &result {
        warn!(%err, "run stopped early; trace covers the executed prefix");
    }

    if !analyzer.executed(target.id) {
        println!("`{}` at {} did not execute", target.source, target.position);
        return Ok(());
    }
    println!("`{}` at {}", target.source, target.position);
    for (id, depth) in analyzer.trace(target.id) {
        let token = loaded.program.token(id);
        println!("{}`{}` at {}", "  ".repeat(depth), token.source, token.position);
    }
    Ok(())
}

fn allowable_main(loaded: &Loaded) -> miette::Result<()> {
    let mut vm = Vm::new(loaded.config.clone());
    let mut recorder = Recorder::new();
    vm.run(&loaded.program, &loaded.label, &loaded.env, &mut recorder)
        .map_err(|err| loaded.with_source(err))?;

    let probe = allowable(&vm, &recorder);
    println!("allowed: {}", probe.allowed.join(" "));
    for (name, err) in &probe.rejected {
        println!("  {name}: {}", err.kind);
    }
    Ok(())
}
