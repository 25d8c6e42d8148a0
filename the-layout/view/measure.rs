//! Measuring and painting glyphs.
//!
//! A [`GlyphMeasurer`] is owned by one glyph run. It is handed the run's text
//! on every call rather than holding on to it, so measurers never see stale
//! text after an edit. The built-in [`CellMeasurer`] treats every character
//! as a number of fixed width cells, which is what terminal-like hosts and
//! the tests want.

use std::{
  borrow::Cow,
  fmt,
  ops::Range,
};

use the_core::chars::{
  TAB,
  char_cells,
  char_is_justifiable_space,
  char_is_line_ending,
};

use crate::{
  LayoutError,
  Result,
  config::CellMetrics,
  document::Attributes,
  geometry::{
    Bias,
    Rect,
  },
  surface::Surface,
  view::tabs::TabExpander,
};

/// Extra space given to the plain spaces of a justified row.
///
/// Offsets are absolute model offsets. Every space in
/// `start_justifiable..=end_justifiable` grows by `space_addon`, and the ones
/// up to `space_addon_leftover_end` by one more unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Justification {
  pub space_addon:              i32,
  pub space_addon_leftover_end: Option<usize>,
  pub start_justifiable:        usize,
  pub end_justifiable:          usize,
}

impl Justification {
  pub fn extra(&self, offset: usize, ch: char) -> f32 {
    if !char_is_justifiable_space(ch) || offset < self.start_justifiable || offset > self.end_justifiable {
      return 0.0;
    }
    let leftover = self.space_addon_leftover_end.is_some_and(|end| offset <= end);
    (self.space_addon + i32::from(leftover)) as f32
  }
}

/// The text of a glyph run, starting at model offset `start`.
#[derive(Debug, Clone)]
pub struct GlyphText<'a> {
  pub text:          Cow<'a, str>,
  pub start:         usize,
  pub justification: Option<Justification>,
}

impl<'a> GlyphText<'a> {
  pub fn new(text: Cow<'a, str>, start: usize) -> Self {
    Self {
      text,
      start,
      justification: None,
    }
  }

  pub fn with_justification(mut self, justification: Option<Justification>) -> Self {
    self.justification = justification;
    self
  }

  pub fn end(&self) -> usize {
    self.start + self.text.chars().count()
  }

  /// Characters of `range` paired with their model offsets.
  pub fn chars(&self, range: Range<usize>) -> impl Iterator<Item = (usize, char)> + '_ {
    let skip = range.start.saturating_sub(self.start);
    let take = range.end.saturating_sub(range.start.max(self.start));
    self
      .text
      .chars()
      .skip(skip)
      .take(take)
      .enumerate()
      .map(move |(index, ch)| (self.start + skip + index, ch))
  }
}

pub trait GlyphMeasurer: Send + fmt::Debug {
  /// Width of `range` when it starts at `x`.
  fn span(&self, text: &GlyphText<'_>, range: Range<usize>, x: f32, tabs: &dyn TabExpander) -> f32;

  fn height(&self) -> f32;

  fn ascent(&self) -> f32;

  fn descent(&self) -> f32;

  /// Offset of the first character after `p0` that no longer fits in `len`.
  fn bounded_position(&self, text: &GlyphText<'_>, p0: usize, x: f32, len: f32, tabs: &dyn TabExpander) -> usize;

  fn model_to_view(
    &self,
    text: &GlyphText<'_>,
    pos: usize,
    bias: Bias,
    alloc: Rect,
    tabs: &dyn TabExpander,
  ) -> Result<Rect>;

  fn view_to_model(&self, text: &GlyphText<'_>, x: f32, alloc: Rect, tabs: &dyn TabExpander) -> (usize, Bias);

  fn paint(&self, text: &GlyphText<'_>, surface: &mut dyn Surface, alloc: Rect, tabs: &dyn TabExpander);

  /// A measurer for a fragment split off the owning run.
  fn fragment(&self) -> Box<dyn GlyphMeasurer>;
}

/// Creates the measurer of a glyph run from its attributes.
pub trait MeasurerFactory: Send + Sync + fmt::Debug {
  fn measurer(&self, attributes: &Attributes) -> Box<dyn GlyphMeasurer>;
}

impl MeasurerFactory for CellMetrics {
  fn measurer(&self, attributes: &Attributes) -> Box<dyn GlyphMeasurer> {
    Box::new(CellMeasurer::new(*self, attributes.scale))
  }
}

#[derive(Debug, Clone, Copy)]
pub struct CellMeasurer {
  metrics: CellMetrics,
  scale:   f32,
}

impl CellMeasurer {
  pub fn new(metrics: CellMetrics, scale: f32) -> Self {
    Self { metrics, scale }
  }

  fn width(&self, text: &GlyphText<'_>, offset: usize, ch: char, x: f32, tabs: &dyn TabExpander) -> f32 {
    if ch == TAB {
      return (tabs.next_tab_stop(x, offset) - x).max(0.0);
    }
    let advance = char_cells(ch) as f32 * self.metrics.cell_width * self.scale;
    match &text.justification {
      Some(justification) => advance + justification.extra(offset, ch),
      None => advance,
    }
  }
}

impl GlyphMeasurer for CellMeasurer {
  fn span(&self, text: &GlyphText<'_>, range: Range<usize>, x: f32, tabs: &dyn TabExpander) -> f32 {
    let mut pos = x;
    for (offset, ch) in text.chars(range) {
      pos += self.width(text, offset, ch, pos, tabs);
    }
    pos - x
  }

  fn height(&self) -> f32 {
    (self.metrics.ascent + self.metrics.descent) * self.scale
  }

  fn ascent(&self) -> f32 {
    self.metrics.ascent * self.scale
  }

  fn descent(&self) -> f32 {
    self.metrics.descent * self.scale
  }

  fn bounded_position(&self, text: &GlyphText<'_>, p0: usize, x: f32, len: f32, tabs: &dyn TabExpander) -> usize {
    let mut used = 0.0;
    for (offset, ch) in text.chars(p0..text.end()) {
      let width = self.width(text, offset, ch, x + used, tabs);
      if used + width > len {
        return offset;
      }
      used += width;
    }
    text.end()
  }

  fn model_to_view(
    &self,
    text: &GlyphText<'_>,
    pos: usize,
    _bias: Bias,
    alloc: Rect,
    tabs: &dyn TabExpander,
  ) -> Result<Rect> {
    if pos < text.start || pos > text.end() {
      return Err(LayoutError::BadLocation { offset: pos });
    }
    let x = self.span(text, text.start..pos, alloc.x as f32, tabs);
    Ok(Rect::new(alloc.x + x as i32, alloc.y, 0, self.height() as i32))
  }

  fn view_to_model(&self, text: &GlyphText<'_>, x: f32, alloc: Rect, tabs: &dyn TabExpander) -> (usize, Bias) {
    let mut pos = alloc.x as f32;
    for (offset, ch) in text.chars(text.start..text.end()) {
      let width = self.width(text, offset, ch, pos, tabs);
      if x < pos + width / 2.0 {
        return (offset, Bias::Forward);
      }
      pos += width;
    }
    // Past the end maps onto the last character of the run.
    let end = text.end();
    (if end > text.start { end - 1 } else { end }, Bias::Forward)
  }

  fn paint(&self, text: &GlyphText<'_>, surface: &mut dyn Surface, alloc: Rect, tabs: &dyn TabExpander) {
    let baseline = alloc.y as f32 + self.ascent();
    let mut pos = alloc.x as f32;
    let mut segment = String::new();
    let mut segment_x = pos;
    let flush = |segment: &mut String, x: f32, surface: &mut dyn Surface| {
      if !segment.is_empty() {
        surface.draw_text(segment, x, baseline, self.scale);
        segment.clear();
      }
    };

    for (offset, ch) in text.chars(text.start..text.end()) {
      let width = self.width(text, offset, ch, pos, tabs);
      if ch == TAB || char_is_line_ending(ch) {
        flush(&mut segment, segment_x, surface);
        pos += width;
        continue;
      }
      if segment.is_empty() {
        segment_x = pos;
      }
      segment.push(ch);
      pos += width;
      if text.justification.is_some_and(|justification| justification.extra(offset, ch) > 0.0) {
        flush(&mut segment, segment_x, surface);
      }
    }
    flush(&mut segment, segment_x, surface);
  }

  fn fragment(&self) -> Box<dyn GlyphMeasurer> {
    Box::new(*self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    surface::RecordingSurface,
    view::tabs::FixedPitch,
  };

  fn measurer() -> CellMeasurer {
    CellMeasurer::new(
      CellMetrics {
        cell_width: 10.0,
        ascent:     8.0,
        descent:    2.0,
      },
      1.0,
    )
  }

  fn text(s: &str) -> GlyphText<'_> {
    GlyphText::new(Cow::Borrowed(s), 100)
  }

  const TABS: FixedPitch = FixedPitch {
    base:  0.0,
    pitch: 80.0,
  };

  #[test]
  fn test_chars_are_offset() {
    let text = text("abcd");
    let chars: Vec<(usize, char)> = text.chars(101..103).collect();
    assert_eq!(chars, vec![(101, 'b'), (102, 'c')]);
    assert_eq!(text.end(), 104);
  }

  #[test]
  fn test_span() {
    let m = measurer();
    let text = text("ab\tc\n");
    assert_eq!(m.span(&text, 100..102, 0.0, &TABS), 20.0);
    // The tab runs from 20 to 80.
    assert_eq!(m.span(&text, 100..104, 0.0, &TABS), 90.0);
    assert_eq!(m.span(&text, 100..105, 0.0, &TABS), 90.0);
    assert_eq!(m.height(), 10.0);
  }

  #[test]
  fn test_wide_chars() {
    let m = measurer();
    let text = text("中a");
    assert_eq!(m.span(&text, 100..102, 0.0, &TABS), 30.0);
  }

  #[test]
  fn test_bounded_position() {
    let m = measurer();
    let text = text("hello world");
    assert_eq!(m.bounded_position(&text, 100, 0.0, 35.0, &TABS), 103);
    assert_eq!(m.bounded_position(&text, 106, 0.0, 1000.0, &TABS), 111);
    assert_eq!(m.bounded_position(&text, 100, 0.0, 5.0, &TABS), 100);
  }

  #[test]
  fn test_model_to_view() {
    let m = measurer();
    let text = text("abc");
    let alloc = Rect::new(5, 7, 30, 10);
    let rect = m.model_to_view(&text, 102, Bias::Forward, alloc, &TABS).unwrap();
    assert_eq!(rect, Rect::new(25, 7, 0, 10));
    assert!(m.model_to_view(&text, 99, Bias::Forward, alloc, &TABS).is_err());
    assert!(m.model_to_view(&text, 104, Bias::Forward, alloc, &TABS).is_err());
  }

  #[test]
  fn test_view_to_model() {
    let m = measurer();
    let text = text("abc");
    let alloc = Rect::new(0, 0, 30, 10);
    assert_eq!(m.view_to_model(&text, 3.0, alloc, &TABS), (100, Bias::Forward));
    assert_eq!(m.view_to_model(&text, 6.0, alloc, &TABS), (101, Bias::Forward));
    assert_eq!(m.view_to_model(&text, 500.0, alloc, &TABS), (102, Bias::Forward));
  }

  #[test]
  fn test_justified_spaces() {
    let m = measurer();
    let justification = Justification {
      space_addon:              2,
      space_addon_leftover_end: Some(101),
      start_justifiable:        100,
      end_justifiable:          104,
    };
    let text = text("a b c ").with_justification(Some(justification));
    // Spaces at 101 and 103 grow by 3 and 2, the trailing one stays.
    assert_eq!(m.span(&text, 100..106, 0.0, &TABS), 65.0);
    assert_eq!(justification.extra(105, ' '), 0.0);
    assert_eq!(justification.extra(102, 'b'), 0.0);
  }

  #[test]
  fn test_paint_splits_at_tabs() {
    let m = measurer();
    let text = text("ab\tcd\n");
    let mut surface = RecordingSurface::new(Rect::new(0, 0, 200, 20));
    m.paint(&text, &mut surface, Rect::new(0, 0, 100, 10), &TABS);
    let drawn: Vec<(&str, f32)> = surface.runs.iter().map(|run| (run.text.as_str(), run.x)).collect();
    assert_eq!(drawn, vec![("ab", 0.0), ("cd", 80.0)]);
    assert_eq!(surface.runs[0].baseline, 8.0);
  }
}
