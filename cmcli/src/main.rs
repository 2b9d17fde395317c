use std::fs;
use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use log::debug;

use cmc::codegen::codegen::Context;
use cmc::parser::json;

#[derive(Parser, Debug)]
#[command(name = "cmc", version, about = "Compiler for the CM language", long_about = None)]
struct Cli {
    /// CM source file path
    file: Option<PathBuf>,

    /// Print the typed syntax tree as JSON
    #[arg(long)]
    print_ast: bool,

    /// Print the emitted instruction listing
    #[arg(long)]
    print_asm: bool,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let Some(path) = cli.file else {
        println!("Usage:\n\tcmc [file]");
        return;
    };

    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(_) => {
            eprintln!("cmc: input file non-existent.");
            exit(1);
        }
    };

    let program = match cmc::parse(&source) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };
    debug!("parsed {} top-level declarations", program.statements.len());

    if cli.print_ast {
        let dump = json::program(&program);
        match serde_json::to_string_pretty(&dump) {
            Ok(text) => println!("{}", text),
            Err(err) => {
                eprintln!("cmc: could not serialize the syntax tree: {}", err);
                exit(1);
            }
        }
    }

    let code = Context::new(program.statements).compile();
    debug!("emitted {} instructions", code.len());

    if cli.print_asm {
        for ins in &code {
            println!("{}", ins);
        }
    }
}
