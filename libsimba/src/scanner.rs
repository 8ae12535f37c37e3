//! Tokenizes simba programs and produces lexing diagnostics.

pub mod types;
pub use types::*;

use crate::diagnostics::Diagnostic;

/// Describes the result of tokenizing a simba program.
pub struct ScanResult {
    /// Tokens of the program.
    pub tokens: Vec<Token>,
    /// Lexing diagnostics encountered while scanning the program.
    pub diagnostics: Vec<Diagnostic>,
}

/// Scans and tokenizes a string-like simba program.
pub fn scan<'a, T: Into<&'a str>>(input: T) -> ScanResult {
    let mut scanner = Scanner::new(input.into());
    scanner.scan();
    ScanResult {
        tokens: scanner.output,
        diagnostics: scanner.diagnostics,
    }
}

struct Scanner {
    pos: usize,
    input: Vec<char>,
    output: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl Scanner {
    fn new(input: &str) -> Scanner {
        Scanner {
            pos: 0,
            input: input.chars().collect(),
            output: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    #[inline]
    fn peek(&self) -> Option<&char> {
        self.input.get(self.pos)
    }

    #[inline]
    fn next(&mut self) -> Option<&char> {
        let ch = self.input.get(self.pos);
        self.pos += 1;
        ch
    }

    fn push_tok<S: Into<crate::Span>>(&mut self, ty: TokenType, span: S) {
        self.output.push(Token::new(ty, span.into()));
    }

    fn collect_while(&mut self, pred: fn(&char) -> bool) -> String {
        let mut s = String::with_capacity(8);
        while let Some(true) = self.peek().map(pred) {
            s.push(*self.next().unwrap());
        }
        s
    }

    fn scan(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                '\n' | ';' => self.scan_stmt_end(),
                _ if c.is_whitespace() => {
                    self.next();
                }
                _ if c.is_ascii_digit() => self.scan_num(),
                _ if c.is_alphabetic() || *c == '_' => self.scan_var(),
                _ => self.scan_symbol(),
            }
        }

        self.push_tok(TokenType::EOF, (self.pos, self.pos + 1));
    }

    /// Collapses a run of newlines and semicolons into one statement separator.
    fn scan_stmt_end(&mut self) {
        let start = self.pos;
        self.collect_while(|c| *c == '\n' || *c == ';' || c.is_whitespace());
        self.push_tok(TokenType::StmtEnd, (start, self.pos));
    }

    fn scan_symbol(&mut self) {
        use TokenType::*;
        let start = self.pos;
        let ty = match self.next().unwrap() {
            '+' => Plus,
            '-' => Minus,
            '*' => Mult,
            '&' => BitAnd,
            '|' => BitOr,
            '^' => BitXor,
            '~' => BitNot,
            '=' => Equal,
            '(' => OpenParen,
            ')' => CloseParen,
            ',' => Comma,
            '<' => {
                if self.peek() == Some(&'<') {
                    self.next();
                    Shl
                } else {
                    Invalid("<".to_owned())
                }
            }
            '>' => {
                if self.peek() == Some(&'>') {
                    self.next();
                    Shr
                } else {
                    Invalid(">".to_owned())
                }
            }
            c => Invalid(c.to_string()),
        };
        let span = start..self.pos;

        if let Invalid(tok) = &ty {
            self.diagnostics.push(
                Diagnostic::span_err(
                    span.clone(),
                    format!(r#"Invalid token "{}""#, tok),
                    Some("token cannot be used in a simba program".into()),
                ),
            );
        }
        self.push_tok(ty, span);
    }

    fn scan_num(&mut self) {
        let start = self.pos;

        let next = self.input.get(self.pos + 1);
        let is_hex = self.peek() == Some(&'0') && (next == Some(&'x') || next == Some(&'X'));
        let parsed = if is_hex {
            self.next();
            self.next();
            let digits = self.collect_while(|c| c.is_ascii_hexdigit());
            u64::from_str_radix(&digits, 16).map_err(|_| digits)
        } else {
            let digits = self.collect_while(|c| c.is_ascii_digit());
            digits.parse::<u64>().map_err(|_| digits)
        };

        match parsed {
            Ok(num) => self.push_tok(TokenType::Int(num as i128), (start, self.pos)),
            Err(digits) => {
                self.diagnostics.push(
                    Diagnostic::span_err(
                        start..self.pos,
                        format!(r#"Integer literal "{}" does not fit in 64 bits"#, digits),
                        Some("literals are bit-vectors of at most 64 bits".into()),
                    ),
                );
                self.push_tok(TokenType::Invalid(digits), (start, self.pos));
            }
        }
    }

    fn scan_var(&mut self) {
        let start = self.pos;
        let name = self.collect_while(|c| c.is_alphanumeric() || *c == '_');
        self.push_tok(TokenType::Variable(name), (start, self.pos));
    }
}

#[cfg(test)]
mod tests {
    /// Tests the scanner's output against a humanized string representation of the expected
    /// tokens. See [Token]'s impl of Display for more details.
    macro_rules! scanner_tests {
        ($($name:ident: $program:expr, $format_str:expr)*) => {
        $(
            #[test]
            fn $name() {
                use crate::scanner::scan;

                let mut tokens = scan($program).tokens;
                tokens.pop(); // EOF
                let tokens_str = tokens
                    .iter()
                    .map(|tok| tok.to_string())
                    .collect::<Vec<_>>().join(" ");
                assert_eq!(tokens_str, $format_str);
            }
        )*
        }
    }

    mod scan {
        scanner_tests! {
            integer: "2", "2"
            hex_integer: "0xff", "255"
            large_integer: "4211719010", "4211719010"
            plus: "+", "+"
            minus: "-", "-"
            mult: "*", "*"
            bit_and: "&", "&"
            bit_or: "|", "|"
            bit_xor: "^", "^"
            bit_not: "~", "~"
            shl: "<<", "<<"
            shr: ">>", ">>"
            equal: "=", "="
            parens: "()", "( )"

            empty_string: "", ""
            skip_whitespace: "  =  ", "="

            variable: "x", "x"
            variable_underscore: "tmp_2", "tmp_2"
            wildcard: "A", "A"

            expression: "(x ^ ~y) + 2*(x | y)", "( x ^ ~ y ) + 2 * ( x | y )"
            shift_expression: "x << 3 >> 1", "x << 3 >> 1"
            assignment: "a = x + 1", "a = x + 1"
            statements: "a = 1\nb = a", "a = 1 ; b = a"
            statements_semi: "a = 1; b = a", "a = 1 ; b = a"
            call: "bv32(x)", "bv32 ( x )"
        }
    }

    mod scan_invalid {
        scanner_tests! {
            invalid_token: "@", "@"
            invalid_single_angle: "x < y", "x < y"
        }

        #[test]
        fn overlong_literal() {
            let result = crate::scanner::scan("36893488147419103232"); // 2^65
            assert_eq!(result.diagnostics.len(), 1);
            assert!(result.diagnostics[0].title.contains("64 bits"));
        }
    }
}
