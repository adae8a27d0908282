//! Quasiquote CLI
//!
//! Rewrites quote sites, inspects modules and maintains native artifacts.

use std::path::{Path, PathBuf};
use std::process;

use quasic::commands::{
    cleanup_artifacts, lex_source, list_sites, read_source, rewrite_files, CommandError,
    RewriteOptions,
};

fn main() {
    quasic::init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "rewrite" => {
            let mut options = RewriteOptions::default();
            let mut paths = Vec::new();
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "-o" | "--output" if i + 1 < args.len() => {
                        options.output = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                    "-f" | "--force" => options.force = true,
                    arg if arg.starts_with('-') => {
                        eprintln!("error: unknown option '{arg}'");
                        process::exit(1);
                    }
                    path => paths.push(PathBuf::from(path)),
                }
                i += 1;
            }
            if paths.is_empty() {
                eprintln!("Usage: quasi rewrite <file.py>... [options]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  -o, --output <path>  Output file (one input) or directory (several)");
                eprintln!("  -f, --force          Rewrite modules without the encoding pragma");
                process::exit(1);
            }

            let mut failed = false;
            for result in rewrite_files(&paths, &options) {
                match result {
                    Ok(rewritten) if rewritten.written.is_none() => print!("{}", rewritten.source),
                    Ok(_) => {}
                    Err(err) => {
                        eprintln!("{err}");
                        failed = true;
                    }
                }
            }
            if failed {
                process::exit(1);
            }
        }
        "sites" => {
            if args.len() < 3 {
                eprintln!("Usage: quasi sites <file.py>");
                process::exit(1);
            }
            let path = Path::new(&args[2]);
            run(read_source(path).and_then(|source| list_sites(path, &source)));
        }
        "lex" => {
            if args.len() < 3 {
                eprintln!("Usage: quasi lex <file.py>");
                process::exit(1);
            }
            let path = Path::new(&args[2]);
            run(read_source(path).and_then(|source| lex_source(path, &source)));
        }
        "cleanup" => {
            let mut path = PathBuf::from(".");
            let mut recurse = true;
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--path" if i + 1 < args.len() => {
                        path = PathBuf::from(&args[i + 1]);
                        i += 1;
                    }
                    "--no-recurse" => recurse = false,
                    other => {
                        eprintln!("error: unexpected argument '{other}'");
                        eprintln!("Usage: quasi cleanup [--path <dir>] [--no-recurse]");
                        process::exit(1);
                    }
                }
                i += 1;
            }
            match cleanup_artifacts(&path, recurse) {
                Ok(removed) => {
                    for path in removed {
                        println!("{}", path.display());
                    }
                }
                Err(err) => {
                    eprintln!("{err}");
                    process::exit(1);
                }
            }
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-V" => {
            println!("quasi {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            process::exit(1);
        }
    }
}

fn run(result: Result<String, CommandError>) {
    match result {
        Ok(out) => print!("{out}"),
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Quasiquote tools");
    println!();
    println!("Usage: quasi <command> [options]");
    println!();
    println!("Commands:");
    println!("  rewrite <file.py>...   Print or write the rewritten module");
    println!("  sites <file.py>        List quote sites and their body hashes");
    println!("  lex <file.py>          Tokenize and display tokens");
    println!("  cleanup                Remove unused native artifacts");
    println!("  help                   Show this help message");
    println!("  version                Show version information");
    println!();
    println!("Set RUST_LOG (e.g. RUST_LOG=quasi_native=debug) for diagnostics.");
}
