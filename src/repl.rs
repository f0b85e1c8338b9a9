// A thin REPL front-end over the lexer and parser (spec.md §1: out of
// scope, reuses them with no line-editing features of its own). Grounded
// on `Parser::new(lexer, ast)` / `parse_module` - each input line gets its
// own arena since a `Module<'a>` borrows from it for its whole lifetime.

use std::io::{self, BufRead, Write};

use crate::arena::Ast;
use crate::diagnostics;
use crate::lexer::Lexer;
use crate::parser::Parser;

/// Reads lines from `input` until EOF, parsing each as a standalone module
/// and printing its parsed statement count or any parse errors to `output`.
/// No persistent state carries over between lines - this is a parse-and-echo
/// loop, not an evaluator.
pub fn run<R: BufRead, W: Write>(mut input: R, mut output: W) -> io::Result<()> {
    let mut line = String::new();
    loop {
        write!(output, "zs> ")?;
        output.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "exit" || trimmed == "quit" {
            break;
        }

        // each line gets its own arena, leaked rather than torn down - a
        // long REPL session trades memory for not fighting the borrow
        // checker over a self-referential per-iteration arena (matches the
        // `Box::leak` pattern `type_checker`/`parser`'s own tests use).
        let ast: &'static Ast<'static> = Box::leak(Box::new(Ast::new()));
        let lexer = Lexer::new(trimmed);
        let mut parser = Parser::new(lexer, ast);
        let module = parser.parse_module();

        if parser.had_error() {
            for err in parser.errors() {
                diagnostics::print_error("<repl>", err);
            }
        } else {
            writeln!(output, "parsed {} statement(s)", module.stmts.len())?;
        }
    }
    Ok(())
}

pub fn run_stdin() -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run(stdin.lock(), stdout.lock())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_line_statement() {
        let input = b"let x: i32 = 1;\n" as &[u8];
        let mut output = Vec::new();
        run(input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("parsed 1 statement(s)"));
    }

    #[test]
    fn reports_parse_errors_without_panicking() {
        let input = b"let x: = ;\n" as &[u8];
        let mut output = Vec::new();
        run(input, &mut output).unwrap();
    }

    #[test]
    fn exit_keyword_stops_the_loop() {
        let input = b"exit\nlet x: i32 = 1;\n" as &[u8];
        let mut output = Vec::new();
        run(input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(!text.contains("parsed"));
    }
}
