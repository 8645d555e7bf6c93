pub mod ast;
mod keywords;
mod parser;
mod resolver;
mod scanner;
mod side_table;
mod source;
mod source_reference;
mod tree_walk_interpreter;

pub use parser::{Parser, ParserError};
pub use resolver::{Resolutions, Resolver, ResolverError};
pub use scanner::{Scanner, ScannerError, Token, TokenType, TokenTypeName};
pub use side_table::{SideTable, Unique, UniqueId};
pub use source::{SourceOffset, SourceSpan};
pub use source_reference::SourceReference;
pub use tree_walk_interpreter::{
    Interpreter, PreparedProgram, RuntimeError, RuntimeValue, ValueType,
};

use miette::Report;

/// Scan and parse `source`, attaching the named source text to every scan
/// and parse diagnostic. The returned program is partial if any reports
/// came back; callers must treat such a program as unrunnable.
pub fn parse_and_collect_errors(
    file_name: &str,
    source: &str,
) -> (ast::Program, Vec<Report>) {
    let source_reference = SourceReference::new(file_name, source);
    let mut reports = Vec::new();

    let mut tokens = Vec::new();
    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),
            Err(error) => {
                reports.push(Report::new(error).with_source_code(source_reference.clone()))
            }
        }
    }

    let (program, parser_errors) = Parser::parse(tokens, source_reference.clone());
    reports.extend(
        parser_errors
            .into_iter()
            .map(|error| Report::new(error).with_source_code(source_reference.clone())),
    );

    (program, reports)
}
