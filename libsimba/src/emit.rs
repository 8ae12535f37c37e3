//! Emit strategies for the libsimba grammar IR.

use crate::grammar::*;

/// The format in which a simba grammar should be emitted.
#[derive(Copy, Clone)]
pub enum EmitFormat {
    /// Canonical, human-readable form, with every binary application parenthesised so output
    /// round-trips through the parser: `(77 + x)`.
    Pretty,
    /// S-expression form: `(+ 77 x)`.
    SExpression,
    /// Internal debug form. Unstable; no assumptions should be made about it.
    Debug,
}

/// Implements the emission of a type in an [EmitFormat](EmitFormat).
pub trait Emit
where
    Self: std::fmt::Debug,
{
    /// Emit `self` with the given [EmitFormat](EmitFormat).
    fn emit(&self, form: EmitFormat) -> String {
        match form {
            EmitFormat::Pretty => self.emit_pretty(),
            EmitFormat::SExpression => self.emit_s_expression(),
            EmitFormat::Debug => format!("{:#?}", self),
        }
    }

    /// Emit `self` with the [pretty emit format](EmitFormat::Pretty).
    fn emit_pretty(&self) -> String;

    /// Emit `self` with the [s-expression emit format](EmitFormat::SExpression).
    fn emit_s_expression(&self) -> String;
}

/// Implements `core::fmt::Display` for a type implementing `Emit`.
macro_rules! fmt_emit_impl {
    ($S:path) => {
        impl core::fmt::Display for $S {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.emit_pretty())
            }
        }
    };
}

fn display_binary_op(op: BinaryOperator) -> &'static str {
    use BinaryOperator::*;
    match op {
        Plus => "+",
        Minus => "-",
        Mult => "*",
        BitAnd => "&",
        BitOr => "|",
        BitXor => "^",
        Shl => "<<",
        Shr => ">>",
    }
}

fn display_unary_op(op: UnaryOperator) -> &'static str {
    match op {
        UnaryOperator::Neg => "-",
        UnaryOperator::BitNot => "~",
    }
}

fmt_emit_impl!(Expr);
impl Emit for Expr {
    fn emit_pretty(&self) -> String {
        match self {
            Self::Num(n) => n.to_string(),
            Self::Var(name) => name.clone(),
            Self::BinaryExpr(binary_expr) => format!(
                "({} {} {})",
                binary_expr.lhs.emit_pretty(),
                display_binary_op(binary_expr.op),
                binary_expr.rhs.emit_pretty()
            ),
            Self::UnaryExpr(unary_expr) => format!(
                "{}{}",
                display_unary_op(unary_expr.op),
                unary_expr.rhs.emit_pretty()
            ),
            Self::NaryExpr(nary_expr) => {
                let op = format!(" {} ", display_binary_op(nary_expr.op));
                let args: Vec<String> = nary_expr.args.iter().map(|a| a.emit_pretty()).collect();
                format!("({})", args.join(&op))
            }
            Self::Call(call) => {
                let args: Vec<String> = call.args.iter().map(|a| a.emit_pretty()).collect();
                format!("{}({})", call.func, args.join(", "))
            }
        }
    }

    fn emit_s_expression(&self) -> String {
        match self {
            Self::Num(n) => n.to_string(),
            Self::Var(name) => name.clone(),
            Self::BinaryExpr(binary_expr) => format!(
                "({} {} {})",
                display_binary_op(binary_expr.op),
                binary_expr.lhs.emit_s_expression(),
                binary_expr.rhs.emit_s_expression()
            ),
            Self::UnaryExpr(unary_expr) => format!(
                "({} {})",
                display_unary_op(unary_expr.op),
                unary_expr.rhs.emit_s_expression()
            ),
            Self::NaryExpr(nary_expr) => {
                let args: Vec<String> =
                    nary_expr.args.iter().map(|a| a.emit_s_expression()).collect();
                format!("({} {})", display_binary_op(nary_expr.op), args.join(" "))
            }
            Self::Call(call) => {
                let args: Vec<String> = call.args.iter().map(|a| a.emit_s_expression()).collect();
                format!("({} {})", call.func, args.join(" "))
            }
        }
    }
}

fmt_emit_impl!(Assignment);
impl Emit for Assignment {
    fn emit_pretty(&self) -> String {
        format!("{} = {}", self.var, self.rhs.emit_pretty())
    }

    fn emit_s_expression(&self) -> String {
        format!("(= {} {})", self.var, self.rhs.emit_s_expression())
    }
}

fmt_emit_impl!(Stmt);
impl Emit for Stmt {
    fn emit_pretty(&self) -> String {
        match self {
            Self::Expr(expr) => expr.emit_pretty(),
            Self::Assignment(asgn) => asgn.emit_pretty(),
        }
    }

    fn emit_s_expression(&self) -> String {
        match self {
            Self::Expr(expr) => expr.emit_s_expression(),
            Self::Assignment(asgn) => asgn.emit_s_expression(),
        }
    }
}

fmt_emit_impl!(StmtList);
impl Emit for StmtList {
    fn emit_pretty(&self) -> String {
        self.iter()
            .map(|stmt| stmt.emit_pretty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn emit_s_expression(&self) -> String {
        self.iter()
            .map(|stmt| stmt.emit_s_expression())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test::{parse_expr, parse_stmts};

    macro_rules! emit_tests {
        ($($name:ident: $program:expr => $pretty:expr, $s_expr:expr)*) => {
        $(
            #[test]
            fn $name() {
                let expr = parse_expr($program);
                assert_eq!(expr.emit_pretty(), $pretty);
                assert_eq!(expr.emit_s_expression(), $s_expr);
            }
        )*
        }
    }

    emit_tests! {
        num: "45" => "45", "45"
        var: "x" => "x", "x"
        add: "45 + x" => "(45 + x)", "(+ 45 x)"
        nested: "45 + x*2" => "(45 + (x * 2))", "(+ 45 (* x 2))"
        unary: "-x + ~y" => "(-x + ~y)", "(+ (- x) (~ y))"
        unary_nested: "-(x + y)" => "-(x + y)", "(- (+ x y))"
        shifts: "x << 2 >> 1" => "((x << 2) >> 1)", "(>> (<< x 2) 1)"
        bitwise: "(x ^ ~y) & z" => "((x ^ ~y) & z)", "(& (^ x (~ y)) z)"
        call: "bv32(x, 2)" => "bv32(x, 2)", "(bv32 x 2)"
    }

    #[test]
    fn nary() {
        use crate::leveling::level;
        let expr = level(&parse_expr("x + y + z"), None);
        assert_eq!(expr.emit_pretty(), "(x + y + z)");
        assert_eq!(expr.emit_s_expression(), "(+ x y z)");
    }

    #[test]
    fn stmt_list() {
        let program = parse_stmts("a = 1 + x\na");
        assert_eq!(program.emit_pretty(), "a = (1 + x)\na");
        assert_eq!(program.emit_s_expression(), "(= a (+ 1 x))\na");
    }

    #[test]
    fn round_trips_through_parser() {
        let cases = vec![
            "(x ^ ~y) + 2*(x | y)",
            "-(43 ^ ~tmp2) - (43 | tmp2)",
            "x + ((254*x + 255) & 90) + 211",
        ];
        for case in cases {
            let expr = parse_expr(case);
            let reparsed = parse_expr(&expr.emit_pretty());
            assert_eq!(expr, reparsed);
        }
    }
}
