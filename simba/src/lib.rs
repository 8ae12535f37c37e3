//! The simba command-line front-end, as a library so its driver is testable.

mod diagnostics;
use diagnostics::emit_simba_diagnostics;

use libsimba::scanner::ScanResult;
use libsimba::{
    parse_program, resolve_width, scan, Emit, EmitFormat, RuleSet, Simplifier, SimplifyError,
};

/// Options for one simba run.
pub struct Opts {
    /// The program to simplify.
    pub program: String,
    /// Origin file of the program, if any.
    pub file: Option<String>,
    /// Working bit width; inferred when absent.
    pub nbits: Option<u32>,
    /// The form results are printed in.
    pub output_form: EmitFormat,
    /// Stop after parsing and dump the tree.
    pub parse_only: bool,
    /// Per-query solver timeout in milliseconds.
    pub timeout_ms: u64,
    /// Whether diagnostics should be colored.
    pub color: bool,
}

/// Runs simba over `opts`, writing to stdout/stderr. Returns the process exit code.
pub fn run_simba(opts: Opts) -> i32 {
    let program = &opts.program;
    let file = opts.file.as_deref();

    let emit_diagnostics = |diagnostics: &[libsimba::diagnostics::Diagnostic]| {
        eprint!(
            "{}",
            emit_simba_diagnostics(file, program, diagnostics, opts.color)
        );
        1
    };

    let ScanResult {
        tokens,
        diagnostics,
    } = scan(program.as_str());
    if !diagnostics.is_empty() {
        return emit_diagnostics(&diagnostics);
    }

    let (parse_tree, diagnostics) = parse_program(tokens);
    if !diagnostics.is_empty() {
        return emit_diagnostics(&diagnostics);
    }

    if opts.parse_only {
        println!("{}", parse_tree.emit(opts.output_form));
        return 0;
    }

    let nbits = match resolve_width(&parse_tree, opts.nbits) {
        Ok(nbits) => nbits,
        Err(err) => {
            eprintln!("error: {}", err);
            return 1;
        }
    };

    let solver = Box::new(libsimba::smt::Z3Binary::new(opts.timeout_ms));
    let mut simplifier = match Simplifier::with_solver(nbits, &RuleSet::default(), solver) {
        Ok(simplifier) => simplifier,
        Err(SimplifyError::Parse(diagnostics)) => return emit_diagnostics(&diagnostics),
        Err(err) => {
            eprintln!("error: {}", err);
            return 1;
        }
    };

    let simplified = simplifier.simplify_program(parse_tree);
    println!("{}", simplified.emit(opts.output_form));
    0
}
