//! Small utilities shared across libsimba.

use std::collections::VecDeque;
use std::vec::IntoIter;

/// Indents each line of a string by `n` spaces.
pub(crate) fn indent<S: AsRef<str>>(s: S, n: usize) -> String {
    let pad = " ".repeat(n);
    s.as_ref()
        .lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// An iterator that supports arbitrary-length peeking.
///
/// This is a beefed-up version of rustlib's [`Peekable`], which supports only peeking at the next
/// item. Multi-length peeks are required by applications that need to establish a context, like
/// the parser's statement lookahead.
///
/// [`Peekable`]: core::iter::Peekable
pub(crate) struct PeekIter<T>
where
    T: Clone,
{
    iter: IntoIter<T>,
    /// A store of items consumed from the iterator for peeking.
    lookahead: VecDeque<Option<T>>,
}

impl<T> PeekIter<T>
where
    T: Clone,
{
    pub fn new(iter: IntoIter<T>) -> Self {
        Self {
            iter,
            lookahead: VecDeque::with_capacity(4),
        }
    }

    /// Returns a reference to the next value in the iterator without consuming it, or `None` if
    /// the iteration is complete.
    pub fn peek(&mut self) -> Option<&T> {
        if self.lookahead.is_empty() {
            let next = self.iter.next();
            self.lookahead.push_back(next);
        }
        self.lookahead[0].as_ref()
    }

    /// Returns a deque of up to `n` peeked items mapped over a function `f`.
    ///
    /// The length of the returned deque is `n` or the number of items remaining in the iteration,
    /// whichever is lower.
    pub fn peek_map_n<R>(&mut self, n: usize, f: fn(&T) -> R) -> VecDeque<R> {
        while self.lookahead.len() < n {
            let next = self.iter.next();
            self.lookahead.push_back(next);
        }
        self.lookahead
            .iter()
            .take(n)
            .filter_map(|o| o.as_ref())
            .map(f)
            .collect()
    }
}

impl<T> Iterator for PeekIter<T>
where
    T: Clone,
{
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.lookahead
            .pop_front()
            // unwrap_or cannot be used here because it would eagerly evaluate `self.iter.next()`
            // before the lookahead is checked.
            .unwrap_or_else(|| self.iter.next())
    }
}
