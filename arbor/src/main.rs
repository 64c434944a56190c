//! Arbor Backend CLI

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use arbor::cfg::{BuildLevel, EmitMode, EmitProfile, OptionsFile};

#[derive(Parser)]
#[command(name = "arbor", version, about = "Arbor Compiler - code-lowering backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lower a checked assembly to JavaScript modules
    Emit {
        /// Checked assembly (JSON)
        assembly: PathBuf,
        /// Instantiation map (JSON)
        #[arg(long)]
        instmap: PathBuf,
        /// Diagnostic verbosity of emitted aborts
        #[arg(long)]
        mode: Option<EmitMode>,
        /// Contract enablement level compiled in
        #[arg(long)]
        level: Option<BuildLevel>,
        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Summarize an assembly and its instantiation map
    Info {
        /// Checked assembly (JSON)
        assembly: PathBuf,
        /// Instantiation map (JSON)
        #[arg(long)]
        instmap: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Emit {
            assembly,
            instmap,
            mode,
            level,
            out,
        } => emit_files(&assembly, &instmap, mode, level, out),
        Command::Info { assembly, instmap } => info_files(&assembly, &instmap),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn load_inputs(
    assembly: &PathBuf,
    instmap: &PathBuf,
) -> Result<(arbor::ast::Assembly, arbor::instmap::InstantiationMap), Box<dyn std::error::Error>> {
    let asm_text = std::fs::read_to_string(assembly)?;
    let asm: arbor::ast::Assembly = serde_json::from_str(&asm_text)?;

    let map_text = std::fs::read_to_string(instmap)?;
    let map: arbor::instmap::InstantiationMap = serde_json::from_str(&map_text)?;

    Ok((asm, map))
}

/// Profile and output directory from `arbor.toml` (when present) with
/// CLI flags applied over it
fn resolve_profile(
    mode: Option<EmitMode>,
    level: Option<BuildLevel>,
) -> Result<(EmitProfile, Option<PathBuf>), Box<dyn std::error::Error>> {
    let opts = match std::fs::read_to_string("arbor.toml") {
        Ok(text) => OptionsFile::parse(&text)?,
        Err(_) => OptionsFile::default(),
    };
    let mut profile = opts.profile();
    if let Some(m) = mode {
        profile.mode = m;
    }
    if let Some(l) = level {
        profile.level = l;
    }
    Ok((profile, opts.emit.out_dir.map(PathBuf::from)))
}

fn emit_files(
    assembly: &PathBuf,
    instmap: &PathBuf,
    mode: Option<EmitMode>,
    level: Option<BuildLevel>,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (asm, map) = load_inputs(assembly, instmap)?;
    let (profile, cfg_out) = resolve_profile(mode, level)?;

    let output = arbor::emit::emit_assembly(&asm, &map, profile)?;

    if !output.diagnostics.is_empty() {
        for diag in output.diagnostics.iter() {
            match std::fs::read_to_string(&diag.file) {
                Ok(source) => arbor::error::report_diagnostic(&diag.file, &source, diag),
                Err(_) => eprintln!("{}: {}", diag.file, diag.message()),
            }
        }
        eprintln!(
            "{} lowering gap(s); no output written",
            output.diagnostics.len()
        );
        std::process::exit(1);
    }

    let out_dir = out.or(cfg_out).unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir)?;
    for unit in &output.units {
        let path = out_dir.join(format!("{}.mjs", unit.ns));
        std::fs::write(&path, &unit.contents)?;
        println!("wrote {}", path.display());
    }

    Ok(())
}

fn info_files(assembly: &PathBuf, instmap: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let (asm, map) = load_inputs(assembly, instmap)?;

    println!("namespaces: {}", asm.namespaces.len());
    for ns in &asm.namespaces {
        let live = map.namespace(&ns.name).is_some();
        println!(
            "  {} - {} type(s), {} function(s), {} const(s){}",
            ns.name,
            ns.typedecls.len(),
            ns.functions.len(),
            ns.consts.len(),
            if live { "" } else { " [no instantiations]" }
        );
    }

    let tuples: usize = map
        .namespaces
        .iter()
        .map(|n| {
            n.functions
                .values()
                .map(|f| f.binds.as_ref().map(|b| b.len()).unwrap_or(1))
                .sum::<usize>()
                + n.types.values().map(|t| t.len()).sum::<usize>()
        })
        .sum();
    println!("instantiation tuples: {tuples}");

    Ok(())
}
