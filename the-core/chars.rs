//! Character classification used while measuring and breaking text.

use unicode_width::UnicodeWidthChar;

pub const TAB: char = '\t';
pub const SPACE: char = ' ';

/// Characters that terminate a line or paragraph.
#[inline]
pub fn char_is_line_ending(ch: char) -> bool {
  matches!(
    ch,
    '\u{000A}' | // LineFeed
    '\u{000B}' | // VerticalTab
    '\u{000C}' | // FormFeed
    '\u{000D}' | // CarriageReturn
    '\u{0085}' | // NextLine
    '\u{2028}' | // Line Separator
    '\u{2029}' // ParagraphSeparator
  )
}

#[inline]
pub fn char_is_whitespace(ch: char) -> bool {
  match ch {
      '\u{0009}' | // Character Tabulation
      '\u{0020}' | // Space
      '\u{00A0}' | // No-break Space
      '\u{180E}' | // Mongolian Vowel Separator
      '\u{202F}' | // Narrow No-break Space
      '\u{205F}' | // Medium Mathematical Space
      '\u{3000}' | // Ideographic Space
      '\u{FEFF}'   // Zero Width No-break Space
      => true,

      // En Quad through Zero Width Space.
      ch if ('\u{2000}' ..= '\u{200B}').contains(&ch) => true,

      _ => false,
    }
}

/// Only the plain space is stretched when a row is justified.
#[inline]
pub fn char_is_justifiable_space(ch: char) -> bool {
  ch == SPACE
}

/// Terminators a decimal tab stop aligns on.
#[inline]
pub fn char_is_decimal_stop(ch: char) -> bool {
  ch == TAB || ch == '.'
}

/// Characters from scripts that are laid out right to left. A document
/// containing any of them is treated as needing bidirectional handling.
#[inline]
pub fn char_is_rtl(ch: char) -> bool {
  matches!(
    ch,
    '\u{0590}'..='\u{08FF}' | '\u{FB1D}'..='\u{FDFF}' | '\u{FE70}'..='\u{FEFF}'
  ) && ch != '\u{FEFF}'
}

/// Number of terminal style cells a character occupies. Control and line
/// ending characters take no room.
#[inline]
pub fn char_cells(ch: char) -> usize {
  if char_is_line_ending(ch) {
    return 0;
  }
  ch.width().unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cells() {
    assert_eq!(char_cells('a'), 1);
    assert_eq!(char_cells('\n'), 0);
    assert_eq!(char_cells('漢'), 2);
    assert_eq!(char_cells('\u{0301}'), 0);
  }

  #[test]
  fn test_rtl() {
    assert!(char_is_rtl('\u{05D0}'));
    assert!(char_is_rtl('\u{0627}'));
    assert!(!char_is_rtl('a'));
    assert!(!char_is_rtl('\u{FEFF}'));
  }

  #[test]
  fn test_justifiable() {
    assert!(char_is_justifiable_space(' '));
    assert!(!char_is_justifiable_space('\t'));
    assert!(!char_is_justifiable_space('\u{00A0}'));
  }
}
