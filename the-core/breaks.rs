//! Line break opportunities.
//!
//! Two strategies are provided. [`WhitespaceBreaker`] only allows a break
//! where a word starts after whitespace, the classic behavior of word
//! processors. [`UnicodeBreaker`] follows the Unicode Line Breaking Algorithm
//! (UAX #14) through `unicode_linebreak`.
//!
//! Both report offsets in chars, not bytes, since layout addresses text by
//! char offsets into a rope.
//!
//! # Example
//!
//! ```
//! use the_core::breaks::{
//!   BreakIterator,
//!   WhitespaceBreaker,
//! };
//!
//! let offsets: Vec<usize> = WhitespaceBreaker
//!   .breaks("hello world")
//!   .into_iter()
//!   .map(|b| b.offset)
//!   .collect();
//! assert_eq!(offsets, vec![6, 11]);
//! ```

use std::fmt;

pub use unicode_linebreak::BreakOpportunity;

use crate::chars::{
  char_is_line_ending,
  char_is_whitespace,
};

/// A position a line may be broken before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Break {
  /// Char offset into the text the breaks were computed over.
  pub offset:    usize,
  /// The line must end here.
  pub mandatory: bool,
}

impl Break {
  pub fn allowed(offset: usize) -> Self {
    Self {
      offset,
      mandatory: false,
    }
  }

  pub fn mandatory(offset: usize) -> Self {
    Self {
      offset,
      mandatory: true,
    }
  }
}

/// Source of break opportunities over a piece of text.
///
/// Offsets are returned in ascending order and lie in `(0, len]`. The end of
/// non-empty text is always reported, as a mandatory break.
pub trait BreakIterator: fmt::Debug + Send + Sync {
  fn breaks(&self, text: &str) -> Vec<Break>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceBreaker;

impl BreakIterator for WhitespaceBreaker {
  fn breaks(&self, text: &str) -> Vec<Break> {
    let mut out = Vec::new();
    let mut prev: Option<char> = None;
    let mut len = 0;

    for (idx, ch) in text.chars().enumerate() {
      if let Some(prev) = prev {
        if char_is_line_ending(prev) {
          out.push(Break::mandatory(idx));
        } else if char_is_whitespace(prev) && !char_is_whitespace(ch) && !char_is_line_ending(ch) {
          out.push(Break::allowed(idx));
        }
      }
      prev = Some(ch);
      len = idx + 1;
    }

    if len > 0 && out.last().is_none_or(|b| b.offset != len) {
      out.push(Break::mandatory(len));
    }
    out
  }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnicodeBreaker;

impl BreakIterator for UnicodeBreaker {
  fn breaks(&self, text: &str) -> Vec<Break> {
    let mut out = Vec::new();
    let mut chars = 0;
    let mut last_byte = 0;

    for (byte, opportunity) in unicode_linebreak::linebreaks(text) {
      chars += text[last_byte..byte].chars().count();
      last_byte = byte;
      out.push(Break {
        offset:    chars,
        mandatory: opportunity == BreakOpportunity::Mandatory,
      });
    }
    out
  }
}

/// Breaks from a fixed table, used where callers need exact control over the
/// opportunities, most often in tests.
#[derive(Debug, Default, Clone)]
pub struct TableBreaker {
  breaks: Vec<Break>,
}

impl TableBreaker {
  pub fn new(mut breaks: Vec<Break>) -> Self {
    breaks.sort_by_key(|b| b.offset);
    breaks.dedup_by_key(|b| b.offset);
    Self { breaks }
  }
}

impl BreakIterator for TableBreaker {
  fn breaks(&self, text: &str) -> Vec<Break> {
    let len = text.chars().count();
    self
      .breaks
      .iter()
      .copied()
      .filter(|b| b.offset > 0 && b.offset <= len)
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn offsets(breaks: Vec<Break>) -> Vec<usize> {
    breaks.into_iter().map(|b| b.offset).collect()
  }

  #[test]
  fn test_whitespace_breaks() {
    assert_eq!(offsets(WhitespaceBreaker.breaks("hello world")), vec![6, 11]);
    assert_eq!(offsets(WhitespaceBreaker.breaks("a  b")), vec![3, 4]);
    assert_eq!(offsets(WhitespaceBreaker.breaks("  a")), vec![2, 3]);
    assert_eq!(offsets(WhitespaceBreaker.breaks("abc   ")), vec![6]);
    assert!(WhitespaceBreaker.breaks("").is_empty());
  }

  #[test]
  fn test_whitespace_counts_chars() {
    assert_eq!(offsets(WhitespaceBreaker.breaks("héllo wörld")), vec![6, 11]);
  }

  #[test]
  fn test_whitespace_mandatory() {
    let breaks = WhitespaceBreaker.breaks("a\u{2028}b c\n");
    assert_eq!(breaks, vec![
      Break::mandatory(2),
      Break::allowed(4),
      Break::mandatory(6)
    ]);
  }

  #[test]
  fn test_unicode_breaks() {
    let breaks = UnicodeBreaker.breaks("hello world");
    assert_eq!(breaks, vec![Break::allowed(6), Break::mandatory(11)]);

    let breaks = UnicodeBreaker.breaks("a\u{2028}b");
    assert_eq!(breaks[0], Break::mandatory(2));
  }

  #[test]
  fn test_unicode_counts_chars() {
    assert_eq!(offsets(UnicodeBreaker.breaks("日本語")), vec![1, 2, 3]);
  }

  #[test]
  fn test_table_breaks() {
    let table = TableBreaker::new(vec![Break::allowed(5), Break::allowed(2), Break::allowed(40)]);
    assert_eq!(offsets(table.breaks("hello world")), vec![2, 5]);
  }

  quickcheck::quickcheck! {
      fn breaks_are_ascending_and_bounded(text: String) -> bool {
          let len = text.chars().count();
          [&WhitespaceBreaker as &dyn BreakIterator, &UnicodeBreaker].iter().all(|breaker| {
              let breaks = breaker.breaks(&text);
              breaks.windows(2).all(|w| w[0].offset < w[1].offset)
                && breaks.iter().all(|b| b.offset > 0 && b.offset <= len)
          })
      }
  }
}
