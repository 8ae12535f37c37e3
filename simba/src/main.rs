use simba::{run_simba, Opts};

use libsimba::EmitFormat;

fn get_opts() -> Result<Opts, String> {
    let matches = clap::App::new(clap::crate_name!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .arg(
            clap::Arg::with_name("expr")
                .help("Expression or program to simplify, or a path to a file containing one")
                .required(true),
        )
        .arg(
            clap::Arg::with_name("nbits")
                .short("n")
                .long("nbits")
                .takes_value(true)
                .help("Bit width of the variables (1-64; inferred from literals when omitted)"),
        )
        .arg(
            clap::Arg::with_name("output-form")
                .short("o")
                .long("output-form")
                .default_value("pretty")
                .takes_value(true)
                .possible_values(&["pretty", "s-expression", "debug"]),
        )
        .arg(
            clap::Arg::with_name("parse-only")
                .long("parse-only")
                .help("Stop after parsing and dump the tree"),
        )
        .arg(
            clap::Arg::with_name("timeout-ms")
                .long("timeout-ms")
                .takes_value(true)
                .default_value("5000")
                .help("Per-query solver timeout, in milliseconds"),
        )
        .get_matches();

    let expr = matches.value_of("expr").unwrap();
    // An argument naming an existing file is read; anything else is the program itself.
    let (program, file) = match std::fs::read_to_string(expr) {
        Ok(content) => (content, Some(expr.to_string())),
        Err(_) => (expr.to_string(), None),
    };

    let nbits = match matches.value_of("nbits") {
        Some(nbits) => Some(
            nbits
                .parse::<u32>()
                .map_err(|_| format!(r#"invalid bit width "{}""#, nbits))?,
        ),
        None => None,
    };
    let timeout_ms = {
        let timeout = matches.value_of("timeout-ms").unwrap();
        timeout
            .parse::<u64>()
            .map_err(|_| format!(r#"invalid timeout "{}""#, timeout))?
    };

    Ok(Opts {
        program,
        file,
        nbits,
        output_form: match matches.value_of("output-form").unwrap() {
            "pretty" => EmitFormat::Pretty,
            "s-expression" => EmitFormat::SExpression,
            "debug" => EmitFormat::Debug,
            _ => unreachable!(),
        },
        parse_only: matches.is_present("parse-only"),
        timeout_ms,
        color: atty::is(atty::Stream::Stderr),
    })
}

fn main_impl() -> i32 {
    match get_opts() {
        Ok(opts) => run_simba(opts),
        Err(msg) => {
            eprintln!("error: {}", msg);
            1
        }
    }
}

fn main() {
    let code = match std::panic::catch_unwind(main_impl) {
        Ok(code) => code,
        Err(..) => {
            eprintln!("\nnote: you found an internal simba error!");
            eprintln!("note: we would appreciate a bug report with the offending expression");
            1
        }
    };
    std::process::exit(code);
}
