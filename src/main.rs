use std::fs;
use std::path::Path;
use std::process::ExitCode;

use loxide::{Loxide, LoxideError, ReplState, report_error, report_warning};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut loxide = Loxide::new();

    match args.len() {
        0 => run_repl(&mut loxide),
        1 => run_file(&mut loxide, Path::new(&args[0])),
        _ => {
            eprintln!("Usage: loxide [script]");
            ExitCode::from(64)
        }
    }
}

fn run_file(loxide: &mut Loxide, path: &Path) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            report_error(&LoxideError::from(e), "", None, std::io::stderr());
            return ExitCode::from(65);
        }
    };

    let filename = path.to_string_lossy();
    let outcome = loxide.run(&source, std::io::stdout());
    for warning in &outcome.warnings {
        report_warning(warning, &source, Some(&filename), std::io::stderr());
    }
    for error in &outcome.errors {
        report_error(error, &source, Some(&filename), std::io::stderr());
    }

    if outcome.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(65)
    }
}

fn run_repl(loxide: &mut Loxide) -> ExitCode {
    let Ok(mut rl) = DefaultEditor::new() else {
        eprintln!("Could not start the REPL.");
        return ExitCode::from(74);
    };
    let mut state = ReplState::new();
    let mut had_error = false;

    loop {
        match rl.readline(&state.prompt()) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);

                if state.process_line(&line) {
                    let buffer = state.take_buffer();
                    let source = if ReplState::should_auto_print(&buffer) {
                        ReplState::wrap_for_print(&buffer)
                    } else {
                        buffer
                    };
                    let outcome = loxide.run(&source, std::io::stdout());
                    for warning in &outcome.warnings {
                        report_warning(warning, &source, None, std::io::stderr());
                    }
                    for error in &outcome.errors {
                        report_error(error, &source, None, std::io::stderr());
                    }
                    had_error = had_error || !outcome.is_clean();
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C cancels pending input; on an empty prompt it exits
                if state.is_empty() {
                    break;
                }
                state.cancel();
                println!();
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                eprintln!("REPL error: {:?}", err);
                break;
            }
        }
    }

    // Piped input exits after the last line; report its status faithfully
    if had_error {
        ExitCode::from(65)
    } else {
        ExitCode::SUCCESS
    }
}
