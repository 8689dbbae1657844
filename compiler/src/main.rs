use clap::Parser;
use std::path::PathBuf;

use starc::codegen::{CodegenOptions, Section};
use starc::pass::PassId;
use starc::pipeline::{compute_provenance, run_pipeline, CompilationState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum EmitStage {
    /// Complete C program
    C,
    /// Generated sections as JSON
    Sections,
    /// Graphviz DOT of the dataflow graph
    Graph,
    /// Parsed netlist
    Ast,
    /// Source hash and library fingerprint as JSON
    BuildInfo,
}

#[derive(Parser, Debug)]
#[command(
    name = "starc",
    version,
    about = "Star code assembler: generates C programs from scheduled dataflow netlists"
)]
struct Cli {
    /// Input .net netlist file
    source: PathBuf,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Star library file (repeatable)
    #[arg(short = 'L', long = "library")]
    library: Vec<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::C)]
    emit: EmitStage,

    /// Override the netlist's iteration count
    #[arg(long)]
    iterations: Option<u32>,

    /// Omit the "generated by" banner
    #[arg(long)]
    no_banner: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    log::info!("source = {}", cli.source.display());
    log::info!("emit   = {:?}", cli.emit);

    // ── Load star library ──
    let mut library = match starc::library::StarLibrary::with_builtins() {
        Ok(lib) => lib,
        Err(e) => {
            eprintln!("starc: error: {}", e);
            std::process::exit(2);
        }
    };
    for path in &cli.library {
        match library.load_file(path) {
            Ok(n) => log::info!("loaded {} star classes from {}", n, path.display()),
            Err(e) => {
                eprintln!("starc: error: {}", e);
                std::process::exit(2);
            }
        }
    }
    log::info!("{} star classes available", library.len());

    // ── Read and parse source ──
    let source = match std::fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("starc: error: {}: {}", cli.source.display(), e);
            std::process::exit(2);
        }
    };

    if cli.emit == EmitStage::BuildInfo {
        let json = compute_provenance(&source, &library).and_then(|p| p.to_json());
        match json {
            Ok(text) => write_output(&cli, &text),
            Err(e) => {
                eprintln!("starc: error: {}", e);
                std::process::exit(2);
            }
        }
        return;
    }

    let parse_result = starc::parser::parse(&source);
    if !parse_result.errors.is_empty() {
        for err in &parse_result.errors {
            eprintln!("starc: {}: parse error: {}", cli.source.display(), err);
        }
        std::process::exit(1);
    }
    let program = match parse_result.program {
        Some(p) => p,
        None => {
            eprintln!("starc: parse failed with no output");
            std::process::exit(1);
        }
    };
    log::info!("parsed {} statements", program.statements.len());

    if cli.emit == EmitStage::Ast {
        write_output(&cli, &format!("{:#?}\n", program));
        return;
    }

    // ── Run passes ──
    let terminal = match cli.emit {
        EmitStage::Graph => PassId::CheckSchedule,
        _ => PassId::Generate,
    };
    let options = CodegenOptions {
        iterations: cli.iterations,
        banner: !cli.no_banner,
    };
    let mut state = CompilationState::new(program, library);
    let display = cli.source.display().to_string();
    let result = run_pipeline(&mut state, terminal, &options, |_, diags| {
        for d in diags {
            eprintln!("starc: {}: {}", display, d);
        }
    });
    if let Err(e) = result {
        log::info!("stopped after {:?}", e.failing_pass);
        std::process::exit(1);
    }

    let text = match cli.emit {
        EmitStage::Graph => match &state.graph {
            Some(graph) => starc::dot::emit_dot(graph),
            None => std::process::exit(1),
        },
        EmitStage::Sections => match state.generated.as_ref().map(|p| p.to_json()) {
            Some(Ok(json)) => json,
            Some(Err(e)) => {
                eprintln!("starc: error: {}", e);
                std::process::exit(2);
            }
            None => std::process::exit(1),
        },
        _ => match &state.generated {
            Some(program) => {
                log::debug!(
                    "{} fire fragments",
                    program.section(Section::Fire).len()
                );
                program.render()
            }
            None => std::process::exit(1),
        },
    };
    write_output(&cli, &text);
}

fn write_output(cli: &Cli, text: &str) {
    match &cli.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, text) {
                eprintln!("starc: error: {}: {}", path.display(), e);
                std::process::exit(2);
            }
            log::info!("wrote {}", path.display());
        }
        None => print!("{}", text),
    }
}
