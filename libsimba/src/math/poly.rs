#![allow(clippy::should_implement_trait)]

//! Multivariate polynomials over opaque atoms with coefficients in Z/2^n.
//!
//! Atoms are identified by their index in an external table; a monomial is a sorted multiset of
//! atom ids. The representation supports exactly the operations that are sound modulo `2^n`:
//! addition, negation, and multiplication with full distribution. There is no division.

use crate::fold::modulus;

use std::collections::BTreeMap;

/// A monomial: the sorted atom ids it multiplies, with repetition for powers.
/// The empty monomial is the constant term.
pub(crate) type Monomial = Vec<usize>;

/// A polynomial over opaque atoms, reduced modulo `2^n`.
///
/// Coefficients are kept in `[0, 2^n)`; zero terms are dropped eagerly, so the zero polynomial
/// has no terms. The `BTreeMap` keeps terms in a stable order with the constant term first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Poly {
    nbits: u32,
    terms: BTreeMap<Monomial, i128>,
}

impl Poly {
    /// The zero polynomial.
    pub fn zero(nbits: u32) -> Self {
        Self {
            nbits,
            terms: BTreeMap::new(),
        }
    }

    /// A constant polynomial.
    pub fn constant(value: i128, nbits: u32) -> Self {
        let mut poly = Self::zero(nbits);
        poly.add_term(Monomial::new(), value);
        poly
    }

    /// The polynomial `1 * atom`.
    pub fn atom(id: usize, nbits: u32) -> Self {
        let mut poly = Self::zero(nbits);
        poly.add_term(vec![id], 1);
        poly
    }

    /// Whether this is the zero polynomial.
    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// Iterates terms in stable order: the constant term first, then monomials by lexicographic
    /// atom order.
    pub fn terms(&self) -> impl Iterator<Item = (&Monomial, i128)> {
        self.terms.iter().map(|(mono, coeff)| (mono, *coeff))
    }

    /// Adds `coeff * mono` into the polynomial, collecting like terms.
    pub fn add_term(&mut self, mono: Monomial, coeff: i128) {
        debug_assert!(mono.windows(2).all(|w| w[0] <= w[1]));
        let m = modulus(self.nbits);
        let entry = self.terms.entry(mono);
        match entry {
            std::collections::btree_map::Entry::Vacant(slot) => {
                let coeff = coeff.rem_euclid(m);
                if coeff != 0 {
                    slot.insert(coeff);
                }
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => {
                let sum = (slot.get() + coeff).rem_euclid(m);
                if sum == 0 {
                    slot.remove();
                } else {
                    *slot.get_mut() = sum;
                }
            }
        }
    }

    /// Adds two polynomials.
    pub fn add(mut self, other: Self) -> Self {
        debug_assert_eq!(self.nbits, other.nbits);
        for (mono, coeff) in other.terms {
            self.add_term(mono, coeff);
        }
        self
    }

    /// Negates the polynomial.
    pub fn neg(self) -> Self {
        let mut out = Self::zero(self.nbits);
        for (mono, coeff) in self.terms {
            out.add_term(mono, -coeff);
        }
        out
    }

    /// Multiplies two polynomials, distributing every term pair.
    pub fn mul(&self, other: &Self) -> Self {
        debug_assert_eq!(self.nbits, other.nbits);
        let m = modulus(self.nbits) as u128;
        let mut out = Self::zero(self.nbits);
        for (mono_a, coeff_a) in self.terms.iter() {
            for (mono_b, coeff_b) in other.terms.iter() {
                let mut mono = Vec::with_capacity(mono_a.len() + mono_b.len());
                mono.extend_from_slice(mono_a);
                mono.extend_from_slice(mono_b);
                mono.sort_unstable();
                let coeff = ((*coeff_a as u128) * (*coeff_b as u128) % m) as i128;
                out.add_term(mono, coeff);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation() {
        // x - x == 0
        let x = Poly::atom(0, 8);
        let diff = x.clone().add(x.neg());
        assert!(diff.is_zero());
    }

    #[test]
    fn like_terms_collect() {
        // x + x + x == 3x
        let x = Poly::atom(0, 8);
        let sum = x.clone().add(x.clone()).add(x);
        let terms: Vec<_> = sum.terms().collect();
        assert_eq!(terms, vec![(&vec![0], 3)]);
    }

    #[test]
    fn coefficients_wrap() {
        // 200x + 100x == 44x (mod 256)
        let mut poly = Poly::zero(8);
        poly.add_term(vec![0], 200);
        poly.add_term(vec![0], 100);
        let terms: Vec<_> = poly.terms().collect();
        assert_eq!(terms, vec![(&vec![0], 44)]);
    }

    #[test]
    fn distribution() {
        // (x + 2)(x + 3) == x^2 + 5x + 6
        let mut a = Poly::constant(2, 8);
        a.add_term(vec![0], 1);
        let mut b = Poly::constant(3, 8);
        b.add_term(vec![0], 1);
        let product = a.mul(&b);
        let terms: Vec<_> = product.terms().collect();
        assert_eq!(
            terms,
            vec![(&vec![], 6), (&vec![0], 5), (&vec![0, 0], 1)]
        );
    }

    #[test]
    fn constant_term_orders_first() {
        let mut poly = Poly::constant(7, 8);
        poly.add_term(vec![1], 2);
        poly.add_term(vec![0], 3);
        let monos: Vec<_> = poly.terms().map(|(m, _)| m.clone()).collect();
        assert_eq!(monos, vec![vec![], vec![0], vec![1]]);
    }
}
