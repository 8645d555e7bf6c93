use ivy_lang::{ast::Program, Interpreter, RuntimeError};
use miette::{IntoDiagnostic, Report, Result};
use rustyline::error::ReadlineError;

fn main() -> Result<()> {
    env_logger::init();
    let args: Vec<_> = std::env::args().collect();
    match args.as_slice() {
        [_] => run_prompt(),
        [_, script] => run_file(script.clone()),
        _ => {
            println!("Usage: ivy [script]");
            std::process::exit(64);
        }
    }
}

fn parse_and_report_errors(file_name: &str, source: &str) -> Option<Program> {
    let (program, reports) = ivy_lang::parse_and_collect_errors(file_name, source);
    if reports.is_empty() {
        Some(program)
    } else {
        for report in reports {
            eprintln!("{:?}", report);
        }
        None
    }
}

fn report_runtime_error(error: RuntimeError) {
    eprintln!("{:?}", Report::new(error));
}

fn run_file(file_name: String) -> Result<()> {
    let source = std::fs::read_to_string(&file_name).into_diagnostic()?;

    let program = match parse_and_report_errors(&file_name, &source) {
        Some(program) => program,
        None => std::process::exit(65),
    };

    let mut stdout = std::io::stdout();
    let mut interpreter = Interpreter::new(&mut stdout);
    let prepared = match interpreter.prepare(program) {
        Ok(prepared) => prepared,
        Err(errors) => {
            for error in errors {
                eprintln!("{:?}", Report::new(error));
            }
            std::process::exit(65);
        }
    };

    if let Err(error) = interpreter.interpret(&prepared) {
        report_runtime_error(error);
        std::process::exit(70);
    }

    Ok(())
}

fn run_prompt() -> Result<()> {
    let mut rl = rustyline::Editor::<()>::new();
    let mut stdout = std::io::stdout();
    let mut interpreter = Interpreter::new(&mut stdout);
    loop {
        match rl.readline("> ") {
            Ok(line) => {
                rl.add_history_entry(line.as_str());
                let program = match parse_and_report_errors("<repl>", &line) {
                    Some(program) => program,
                    None => continue,
                };
                // Parse and resolve errors only discard this line; bindings
                // from earlier lines stay live in the interpreter.
                let prepared = match interpreter.prepare(program) {
                    Ok(prepared) => prepared,
                    Err(errors) => {
                        for error in errors {
                            eprintln!("{:?}", Report::new(error));
                        }
                        continue;
                    }
                };
                match interpreter.interpret(&prepared) {
                    Ok(value) => println!("==> {}", value),
                    Err(error) => report_runtime_error(error),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
            Err(err) => return Err(err).into_diagnostic(),
        }
    }
}
