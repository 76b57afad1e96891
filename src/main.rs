use std::io::stdout;
use std::path::Path;

use miette::Report;
use tracing_subscriber::EnvFilter;

use wend::{parse, FsLoader, Interpreter, ReadlineInput};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<_> = std::env::args().skip(1).collect();
    let file = consume_arg(&mut args, |arg| {
        if arg.starts_with("--") {
            None
        } else {
            Some(arg.to_string())
        }
    });
    let file = match (file, args.is_empty()) {
        (Some(file), true) => file,
        _ => {
            eprintln!("Usage: wend <script>");
            std::process::exit(64);
        }
    };

    let source = match std::fs::read_to_string(&file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Could not read {}: {}", file, err);
            std::process::exit(74);
        }
    };

    let program = match parse(file.as_str(), &source) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("{:?}", Report::new(err));
            std::process::exit(65);
        }
    };

    // RUN paths resolve relative to the including script.
    let base = Path::new(&file)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let loader = FsLoader::new(base);
    let mut output = stdout();
    let mut input = ReadlineInput::new();

    let mut interpreter = Interpreter::new(&mut output, &mut input, &loader);
    if let Err(err) = interpreter.run(program) {
        eprintln!("{:?}", Report::new(err));
        std::process::exit(70);
    }
}

fn consume_arg<T, F: Fn(&str) -> Option<T>>(args: &mut Vec<String>, predicate: F) -> Option<T> {
    let found = args
        .iter()
        .enumerate()
        .filter_map(|(idx, arg)| predicate(arg).map(|val| (idx, val)))
        .next();

    if let Some((idx, val)) = found {
        args.remove(idx);
        Some(val)
    } else {
        None
    }
}
