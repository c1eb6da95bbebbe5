use clap::{Parser, Subcommand};
use std::path::Path;

#[derive(Parser)]
#[command(name = "ncl")]
#[command(about = "NCL — Nested Configuration Language toolchain")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check an .ncl file for syntax errors
    Check {
        /// Input .ncl file
        path: String,
    },

    /// Parse an .ncl file and print its syntax tree
    Ast {
        /// Input .ncl file
        path: String,
    },

    /// List the variables referenced by dynamic blocks in an .ncl file
    Vars {
        /// Input .ncl file
        path: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Check { path } => cmd_check(&path),
        Command::Ast { path } => cmd_ast(&path),
        Command::Vars { path } => cmd_vars(&path),
    }
}

fn read_source(path: &str) -> String {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("Error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read_to_string(p) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_check(path: &str) {
    let source = read_source(path);

    let (_, diags) = ncl_parser::parse(&source, path);
    if ncl_parser::has_errors(&diags) {
        eprintln!("{}", ncl_parser::render_diagnostics(&diags));
        std::process::exit(1);
    }

    eprintln!("OK: {path}");
}

fn cmd_ast(path: &str) {
    let source = read_source(path);

    let (body, diags) = ncl_parser::parse(&source, path);
    if !diags.is_empty() {
        eprintln!("{}", ncl_parser::render_diagnostics(&diags));
    }

    println!("{body:#?}");

    if ncl_parser::has_errors(&diags) {
        std::process::exit(1);
    }
}

fn cmd_vars(path: &str) {
    let source = read_source(path);

    let (body, diags) = ncl_parser::parse(&source, path);
    if ncl_parser::has_errors(&diags) {
        eprintln!("{}", ncl_parser::render_diagnostics(&diags));
        std::process::exit(1);
    }

    for traversal in ncl_parser::vars::dynamic_block_variables(&body) {
        println!("{} ({})", traversal.root, traversal.src_range);
    }
}
