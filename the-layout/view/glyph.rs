//! Glyph runs: leaf views presenting a run element, or a fragment of one.

use std::{
  cell::RefCell,
  ops::Range,
  sync::Arc,
};

use smallvec::SmallVec;
use the_core::{
  breaks::Break,
  chars::{
    SPACE,
    TAB,
    char_is_line_ending,
  },
};
use tracing::trace;

use crate::{
  Result,
  document::{
    DocumentEvent,
    ElementId,
  },
  geometry::{
    Axis,
    Bias,
    Rect,
  },
  surface::Surface,
  view::{
    BreakWeight,
    Breakable,
    FromElement,
    LayoutCx,
    ModelMapped,
    Paintable,
    PreferenceChange,
    Sizable,
    View,
    ViewId,
    measure::{
      GlyphMeasurer,
      GlyphText,
      Justification,
    },
    tabs::{
      FixedPitch,
      ResolvedTabs,
      TabExpander,
    },
  },
};

/// Where the spaces of a run are, as seen when justifying the row it sits
/// on. Only the part right of the last tab is scanned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JustificationInfo {
  /// First content character, absolute.
  pub start:           Option<usize>,
  /// Last content character, absolute.
  pub end:             Option<usize>,
  pub leading_spaces:  usize,
  pub content_spaces:  usize,
  pub trailing_spaces: usize,
  pub has_tab:         bool,
  /// Offsets of every plain space scanned.
  pub spaces:          SmallVec<[usize; 8]>,
}

#[derive(Clone, Copy)]
enum ScanState {
  Trailing,
  Content,
  Spaces,
}

impl JustificationInfo {
  pub fn scan(text: &GlyphText<'_>) -> Self {
    let mut info = Self::default();
    let mut state = ScanState::Trailing;
    let chars: Vec<(usize, char)> = text.chars(text.start..text.end()).collect();

    for &(offset, ch) in chars.iter().rev() {
      if ch == SPACE {
        info.spaces.push(offset);
        match state {
          ScanState::Trailing => info.trailing_spaces += 1,
          ScanState::Content => {
            state = ScanState::Spaces;
            info.leading_spaces = 1;
          },
          ScanState::Spaces => info.leading_spaces += 1,
        }
      } else if ch == TAB {
        info.has_tab = true;
        break;
      } else if char_is_line_ending(ch) && matches!(state, ScanState::Trailing) {
        continue;
      } else {
        match state {
          ScanState::Trailing => {
            state = ScanState::Content;
            info.end = Some(offset);
          },
          ScanState::Content => {},
          ScanState::Spaces => {
            info.content_spaces += info.leading_spaces;
            info.leading_spaces = 0;
            state = ScanState::Content;
          },
        }
        info.start = Some(offset);
      }
    }
    info.spaces.reverse();
    info
  }
}

/// Records the advance of every tab while a run is measured against the
/// expander of the row it is placed on.
struct TabRecorder<'a> {
  inner:    &'a dyn TabExpander,
  origin:   usize,
  advances: RefCell<SmallVec<[(usize, f32); 2]>>,
}

impl TabExpander for TabRecorder<'_> {
  fn next_tab_stop(&self, x: f32, tab_offset: usize) -> f32 {
    let next = self.inner.next_tab_stop(x, tab_offset);
    self.advances.borrow_mut().push((tab_offset - self.origin, (next - x).max(0.0)));
    next
  }
}

/// A run of uniformly attributed text.
///
/// The view caches everything expensive about its text: the break table,
/// the minimum span and the justification info. Edits to the run clear the
/// caches. The break table is shared with every fragment split off the run.
#[derive(Debug)]
pub struct GlyphRunView {
  id:                 ViewId,
  parent:             Option<ViewId>,
  element:            ElementId,
  /// Part of the element shown, relative to the element start.
  fragment:           Option<Range<usize>>,
  measurer:           Box<dyn GlyphMeasurer>,
  superscript:        bool,
  /// Where the run starts on its row, for tab expansion.
  x:                  f32,
  /// Breaks strictly inside the element, relative to its start.
  breaks:             Option<Arc<[Break]>>,
  minimum_span:       Option<f32>,
  justification_info: Option<JustificationInfo>,
  justification:      Option<Justification>,
  tab_advances:       SmallVec<[(usize, f32); 2]>,
}

impl GlyphRunView {
  pub fn new(element: ElementId, cx: &LayoutCx<'_>) -> Self {
    let attributes = cx.doc.element(element).attributes();
    Self {
      id: ViewId::next(),
      parent: None,
      element,
      fragment: None,
      measurer: cx.env.measurers().measurer(attributes),
      superscript: attributes.superscript,
      x: 0.0,
      breaks: None,
      minimum_span: None,
      justification_info: None,
      justification: None,
      tab_advances: SmallVec::new(),
    }
  }

  /// The same text with a view of its own.
  pub fn duplicate(&self) -> Self {
    Self {
      id:                 ViewId::next(),
      parent:             None,
      element:            self.element,
      fragment:           self.fragment.clone(),
      measurer:           self.measurer.fragment(),
      superscript:        self.superscript,
      x:                  self.x,
      breaks:             self.breaks.clone(),
      minimum_span:       self.minimum_span,
      justification_info: None,
      justification:      None,
      tab_advances:       self.tab_advances.clone(),
    }
  }

  pub fn is_fragment(&self) -> bool {
    self.fragment.is_some()
  }

  fn element_start(&self, cx: &LayoutCx<'_>) -> usize {
    cx.doc.element(self.element).start()
  }

  /// The run's text without justification.
  pub fn plain_text<'a>(&self, cx: &LayoutCx<'a>) -> GlyphText<'a> {
    let range = self.range(cx);
    GlyphText::new(cx.doc.text(range.clone()), range.start)
  }

  pub fn text<'a>(&self, cx: &LayoutCx<'a>) -> GlyphText<'a> {
    self.plain_text(cx).with_justification(self.justification)
  }

  fn tabs(&self, cx: &LayoutCx<'_>) -> ResolvedTabs<'_> {
    ResolvedTabs {
      origin:   self.element_start(cx),
      advances: &self.tab_advances,
      fallback: FixedPitch::new(cx.env.config().tab_pitch),
    }
  }

  /// Width of `p0..p1`, which must lie inside the run.
  pub fn partial_span(&self, p0: usize, p1: usize, cx: &LayoutCx<'_>) -> f32 {
    self.measurer.span(&self.text(cx), p0..p1, self.x, &self.tabs(cx))
  }

  /// Width of the run when it starts at `x` on a row whose tabs are expanded
  /// by `expander`. The resulting tab advances are kept for later queries.
  pub fn tabbed_span(&mut self, x: f32, expander: &dyn TabExpander, cx: &LayoutCx<'_>) -> f32 {
    self.x = x;
    let text = self.text(cx);
    let range = text.start..text.end();
    if !text.text.contains(TAB) {
      self.tab_advances.clear();
      return self.measurer.span(&text, range, x, &self.tabs(cx));
    }

    let recorder = TabRecorder {
      inner:    expander,
      origin:   self.element_start(cx),
      advances: RefCell::new(SmallVec::new()),
    };
    let span = self.measurer.span(&text, range, x, &recorder);
    self.tab_advances = recorder.advances.into_inner();
    span
  }

  fn break_table(&mut self, cx: &LayoutCx<'_>) -> Arc<[Break]> {
    if let Some(breaks) = &self.breaks {
      return Arc::clone(breaks);
    }
    let element = cx.doc.element(self.element);
    let (start, end) = (element.start(), element.end());
    let paragraph = element.parent().map_or(start..end, |parent| cx.doc.element(parent).range());
    let text = cx.doc.text(paragraph.clone());

    let breaks: Arc<[Break]> = cx
      .env
      .breaker()
      .breaks(&text)
      .into_iter()
      .map(|b| {
        Break {
          offset:    paragraph.start + b.offset,
          mandatory: b.mandatory,
        }
      })
      .filter(|b| b.offset > start && b.offset < end)
      .map(|b| {
        Break {
          offset:    b.offset - start,
          mandatory: b.mandatory,
        }
      })
      .collect();
    trace!(view = self.id.get(), breaks = breaks.len(), "computed break table");
    self.breaks = Some(Arc::clone(&breaks));
    breaks
  }

  /// Compute the break table now, so fragments split off later share it.
  pub fn ensure_breaks(&mut self, cx: &LayoutCx<'_>) {
    self.break_table(cx);
  }

  /// Break opportunities strictly inside the run, in model offsets.
  pub fn break_spots(&mut self, cx: &LayoutCx<'_>) -> Vec<usize> {
    let (p0, p1) = (self.start_offset(cx), self.end_offset(cx));
    self.breaks_within(p0, p1, cx).into_iter().map(|b| b.offset).collect()
  }

  /// Mandatory breaks strictly inside the run, in model offsets.
  pub fn mandatory_breaks(&mut self, cx: &LayoutCx<'_>) -> Vec<usize> {
    let (p0, p1) = (self.start_offset(cx), self.end_offset(cx));
    self
      .breaks_within(p0, p1, cx)
      .into_iter()
      .filter(|b| b.mandatory)
      .map(|b| b.offset)
      .collect()
  }

  /// Breaks in `(p0, p1)`, shifted to model offsets.
  fn breaks_within(&mut self, p0: usize, p1: usize, cx: &LayoutCx<'_>) -> Vec<Break> {
    let origin = self.element_start(cx);
    self
      .break_table(cx)
      .iter()
      .map(|b| {
        Break {
          offset:    origin + b.offset,
          mandatory: b.mandatory,
        }
      })
      .filter(|b| b.offset > p0 && b.offset < p1)
      .collect()
  }

  /// Last break opportunity in `(p0, p1]`.
  fn break_spot(&mut self, p0: usize, p1: usize, cx: &LayoutCx<'_>) -> Option<usize> {
    let end = self.end_offset(cx);
    self
      .breaks_within(p0, end, cx)
      .into_iter()
      .filter(|b| b.offset <= p1)
      .last()
      .map(|b| b.offset)
  }

  /// First mandatory break in `(p0, p1]`.
  fn forced_break(&mut self, p0: usize, p1: usize, cx: &LayoutCx<'_>) -> Option<usize> {
    let end = self.end_offset(cx);
    self
      .breaks_within(p0, end, cx)
      .into_iter()
      .find(|b| b.mandatory && b.offset <= p1)
      .map(|b| b.offset)
  }

  fn bounded_position(&self, p0: usize, pos: f32, len: f32, cx: &LayoutCx<'_>) -> usize {
    self.measurer.bounded_position(&self.plain_text(cx), p0, pos, len, &self.tabs(cx))
  }

  pub fn justification_info(&mut self, cx: &LayoutCx<'_>) -> &JustificationInfo {
    if self.justification_info.is_none() {
      self.justification_info = Some(JustificationInfo::scan(&self.plain_text(cx)));
    }
    self.justification_info.get_or_insert_default()
  }

  pub fn justification(&self) -> Option<Justification> {
    self.justification
  }

  pub fn set_justification(&mut self, justification: Option<Justification>) {
    self.justification = justification;
  }

  fn invalidate(&mut self) {
    self.breaks = None;
    self.minimum_span = None;
    self.justification_info = None;
  }
}

impl FromElement for GlyphRunView {
  fn from_element(element: ElementId, cx: &LayoutCx<'_>) -> Option<Box<Self>> {
    Some(Box::new(Self::new(element, cx)))
  }
}

impl Sizable for GlyphRunView {
  fn preferred_span(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> f32 {
    match axis {
      Axis::X => {
        let text = self.text(cx);
        self.measurer.span(&text, text.start..text.end(), self.x, &self.tabs(cx))
      },
      Axis::Y => self.measurer.height(),
    }
  }

  /// Along X, the widest piece between two break opportunities.
  fn minimum_span(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> f32 {
    if axis == Axis::Y {
      return self.measurer.height();
    }
    if let Some(span) = self.minimum_span {
      return span;
    }

    let (p0, mut p1) = (self.start_offset(cx), self.end_offset(cx));
    let spots = self.breaks_within(p0, p1, cx);
    let mut span = 0.0f32;
    for spot in spots.iter().rev().map(|b| b.offset) {
      span = span.max(self.partial_span(spot, p1, cx));
      p1 = spot;
    }
    span = span.max(self.partial_span(p0, p1, cx));
    self.minimum_span = Some(span);
    span
  }

  fn alignment(&mut self, axis: Axis, _cx: &LayoutCx<'_>) -> f32 {
    match axis {
      Axis::X => 0.5,
      Axis::Y if self.superscript => 1.0,
      Axis::Y => {
        let height = self.measurer.height();
        if height > 0.0 { self.measurer.ascent() / height } else { 0.0 }
      },
    }
  }

  fn set_size(&mut self, _width: f32, _height: f32, _cx: &LayoutCx<'_>) -> PreferenceChange {
    PreferenceChange::NONE
  }
}

impl Breakable for GlyphRunView {
  fn break_weight(&mut self, axis: Axis, pos: f32, len: f32, cx: &LayoutCx<'_>) -> BreakWeight {
    if axis == Axis::Y {
      return if len > self.preferred_span(axis, cx) {
        BreakWeight::Good
      } else {
        BreakWeight::Bad
      };
    }
    let p0 = self.start_offset(cx);
    let p1 = self.bounded_position(p0, pos, len, cx);
    if p1 == p0 {
      BreakWeight::Bad
    } else if self.forced_break(p0, p1, cx).is_some() {
      BreakWeight::Forced
    } else if self.break_spot(p0, p1, cx).is_some() {
      BreakWeight::Excellent
    } else {
      BreakWeight::Good
    }
  }

  fn break_view(&mut self, axis: Axis, offset: usize, pos: f32, len: f32, cx: &LayoutCx<'_>) -> Option<Self> {
    if axis != Axis::X {
      return None;
    }
    let end = self.end_offset(cx);
    let mut p1 = self.bounded_position(offset, pos, len, cx);
    if let Some(forced) = self.forced_break(offset, p1, cx) {
      p1 = forced;
    } else if p1 < end {
      // The rest of the run fits, it is not cut back to an earlier spot.
      if let Some(spot) = self.break_spot(offset, p1, cx) {
        p1 = spot;
      }
    }
    if offset == self.start_offset(cx) && p1 == end {
      return None;
    }
    let mut fragment = self.create_fragment(offset, p1, cx)?;
    fragment.x = pos;
    Some(fragment)
  }

  fn create_fragment(&self, p0: usize, p1: usize, cx: &LayoutCx<'_>) -> Option<Self> {
    let origin = self.element_start(cx);
    Some(Self {
      id:                 ViewId::next(),
      parent:             None,
      element:            self.element,
      fragment:           Some(p0 - origin..p1 - origin),
      measurer:           self.measurer.fragment(),
      superscript:        self.superscript,
      x:                  self.x,
      breaks:             self.breaks.clone(),
      minimum_span:       None,
      justification_info: None,
      justification:      None,
      tab_advances:       self.tab_advances.clone(),
    })
  }
}

impl Paintable for GlyphRunView {
  fn paint(&mut self, surface: &mut dyn Surface, alloc: Rect, cx: &LayoutCx<'_>) {
    if !alloc.intersects(&surface.clip()) {
      return;
    }
    self.measurer.paint(&self.text(cx), surface, alloc, &self.tabs(cx));
  }
}

impl ModelMapped for GlyphRunView {
  fn model_to_view(&mut self, pos: usize, alloc: Rect, bias: Bias, cx: &LayoutCx<'_>) -> Result<Rect> {
    self.measurer.model_to_view(&self.text(cx), pos, bias, alloc, &self.tabs(cx))
  }

  fn view_to_model(&mut self, x: f32, _y: f32, alloc: Rect, cx: &LayoutCx<'_>) -> (usize, Bias) {
    self.measurer.view_to_model(&self.text(cx), x, alloc, &self.tabs(cx))
  }
}

impl View for GlyphRunView {
  fn id(&self) -> ViewId {
    self.id
  }

  fn parent(&self) -> Option<ViewId> {
    self.parent
  }

  fn set_parent(&mut self, parent: Option<ViewId>) {
    self.parent = parent;
  }

  fn element(&self) -> Option<ElementId> {
    Some(self.element)
  }

  fn start_offset(&self, cx: &LayoutCx<'_>) -> usize {
    let element = cx.doc.element(self.element);
    match &self.fragment {
      Some(fragment) => element.start() + fragment.start,
      None => element.start(),
    }
  }

  fn end_offset(&self, cx: &LayoutCx<'_>) -> usize {
    let element = cx.doc.element(self.element);
    match &self.fragment {
      Some(fragment) => element.start() + fragment.end,
      None => element.end(),
    }
  }

  fn insert_update(&mut self, _event: &DocumentEvent, _cx: &LayoutCx<'_>) -> PreferenceChange {
    self.invalidate();
    PreferenceChange::along(Axis::X)
  }

  fn remove_update(&mut self, _event: &DocumentEvent, _cx: &LayoutCx<'_>) -> PreferenceChange {
    self.invalidate();
    PreferenceChange::along(Axis::X)
  }

  fn changed_update(&mut self, _event: &DocumentEvent, cx: &LayoutCx<'_>) -> PreferenceChange {
    self.invalidate();
    let attributes = cx.doc.element(self.element).attributes();
    self.measurer = cx.env.measurers().measurer(attributes);
    self.superscript = attributes.superscript;
    PreferenceChange::BOTH
  }
}
