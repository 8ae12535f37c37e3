//! Algorithms used in the evaluation of an expression.
//!
//! The math module works on its own data representations; the [arith](crate::arith) module
//! provides shims converting between the expression IR and these representations.

pub(crate) mod poly;

pub(crate) use poly::Poly;
