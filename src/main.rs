use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;
use colored::Colorize;

use zscript_compiler::diagnostics;
use zscript_compiler::Compiler;

#[derive(ClapParser)]
#[command(name = "zsc", version, about = "The zscript compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Compiles a zscript file to WAT.
    #[command(alias = "compile")]
    Build {
        path: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Type-checks a zscript file without emitting output.
    Check {
        path: PathBuf,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Prints the compiler version.
    Version,
    /// Prints usage information.
    Help,
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Build { path, output, verbose } => run_build(&path, output, verbose, false),
        Commands::Check { path, verbose } => run_build(&path, None, verbose, true),
        Commands::Version => println!("zsc {}", env!("CARGO_PKG_VERSION")),
        Commands::Help => print_help(),
    }
}

fn run_build(path: &PathBuf, output: Option<PathBuf>, verbose: bool, check_only: bool) {
    let total_start = Instant::now();
    let file = path.display().to_string();

    let mut compiler = Compiler::new();
    let compile_start = Instant::now();
    let wat = match compiler.compile_file(path) {
        Ok(wat) => wat,
        Err(err) => {
            diagnostics::print_error(&file, &err);
            process::exit(1);
        }
    };
    let compile_time = compile_start.elapsed();

    if check_only {
        if verbose {
            eprintln!("  check: {:>8.2?}", compile_time);
        }
        println!("{} {}", "ok".green().bold(), file);
        return;
    }

    let out_path = output.unwrap_or_else(|| Compiler::default_output_path(path));
    let write_start = Instant::now();
    if let Err(e) = fs::write(&out_path, wat) {
        eprintln!("{}: {}: {}", out_path.display(), "error".red().bold(), e);
        process::exit(1);
    }
    let write_time = write_start.elapsed();

    if verbose {
        eprintln!("  compile: {:>8.2?}", compile_time);
        eprintln!("  write:   {:>8.2?}", write_time);
        eprintln!("  total:   {:>8.2?}", total_start.elapsed());
    }
    println!("{} {}", "wrote".green().bold(), out_path.display());
}

fn print_help() {
    println!("zsc - the zscript compiler\n");
    println!("USAGE:");
    println!("    zsc build <file> [-o <out>] [-v]");
    println!("    zsc check <file> [-v]");
    println!("    zsc version");
    println!("    zsc help");
}
