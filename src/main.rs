use basp::interpreter::{present, DefaultLoader, LoaderConfig, DEFAULT_REGISTRY_URL};
use basp::{init_tracing, run_source};

use clap::Parser;
use std::rc::Rc;
use std::{fs, io, process};

/// Runs a Basp program and prints what it produced.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path of the program to run.
    file: String,

    /// Registry answering `basp:` package imports.
    #[clap(long, default_value = DEFAULT_REGISTRY_URL)]
    registry_url: String,

    /// Show debug logs when RUST_LOG is not set.
    #[clap(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let source = match fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read \"{}\": {}", args.file, e);
            process::exit(65);
        }
    };

    process::exit(run_file(&args.file, &source, args.registry_url));
}

fn run_file(file_name: &str, source: &str, registry_url: String) -> i32 {
    let loader = DefaultLoader::new(LoaderConfig { registry_url });
    let execution = run_source(file_name, source, Rc::new(loader));

    let stdout = io::stdout();
    if let Err(e) = present(&execution.effects, &mut stdout.lock()) {
        eprintln!("Failed to write output: {}", e);
        return 74;
    }

    match execution.result {
        Ok(_) => 0,
        Err(error) => {
            eprintln!("{}", error.render());
            70
        }
    }
}
