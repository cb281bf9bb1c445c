//! scmvm — interpreter driver.
//!
//! With no arguments: an interactive read-eval-print loop.  With one
//! argument: evaluate the file's top-level forms in order, exiting
//! non-zero on the first uncaught exception.

use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

use rustyline::error::ReadlineError;

use scmvm_core::{ErrorKind, Evaluator, ParseErrorKind, Reader};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => repl(),
        [path] => run_script(path),
        _ => {
            eprintln!("usage: scmvm [file]");
            ExitCode::from(2)
        }
    }
}

fn run_script(path: &str) -> ExitCode {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("scmvm: {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut ev = Evaluator::new();
    let mut reader = Reader::new(BufReader::new(file));
    loop {
        match reader.read_form(&mut ev) {
            Ok(Some(form)) => {
                if ev.eval(ev.top_level(), form).is_err() {
                    ev.print_exception();
                    return ExitCode::FAILURE;
                }
            }
            Ok(None) => return ExitCode::SUCCESS,
            Err(_) => {
                ev.print_exception();
                return ExitCode::FAILURE;
            }
        }
    }
}

fn repl() -> ExitCode {
    let mut rl = match rustyline::DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("scmvm: cannot initialize line editing: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut ev = Evaluator::new();
    log::info!("interpreter ready");

    // Forms may span lines; input accumulates here until the reader stops
    // reporting an unexpected EOF.
    let mut pending = String::new();

    loop {
        let prompt = if pending.is_empty() { ">>> " } else { "... " };
        let line = match rl.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                pending.clear();
                continue;
            }
            Err(ReadlineError::Eof) => return ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("scmvm: {e}");
                return ExitCode::FAILURE;
            }
        };
        if !line.trim().is_empty() {
            let _ = rl.add_history_entry(line.as_str());
        }
        pending.push_str(&line);
        pending.push('\n');

        let mut consumed = 0;
        let mut incomplete = false;
        {
            let mut reader = Reader::new(pending.as_bytes());
            loop {
                match reader.read_form(&mut ev) {
                    Ok(Some(form)) => {
                        match ev.eval(ev.top_level(), form) {
                            Ok(value) => ev.print_value(value),
                            Err(_) => ev.print_exception(),
                        }
                        consumed = reader.offset();
                    }
                    Ok(None) => {
                        consumed = pending.len();
                        break;
                    }
                    Err(_) => {
                        match ev.get_exception() {
                            Some(err)
                                if err.kind
                                    == ErrorKind::Parse(ParseErrorKind::UnexpectedEof) =>
                            {
                                incomplete = true;
                            }
                            Some(err) => {
                                println!("error: {err}");
                                consumed = pending.len();
                            }
                            None => consumed = pending.len(),
                        }
                        break;
                    }
                }
            }
        }

        if incomplete {
            // Keep the unfinished tail; evaluated forms are dropped.
            pending.drain(..consumed);
        } else {
            pending.clear();
        }
    }
}
