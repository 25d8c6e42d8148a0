//! Paragraphs: flow a pool of glyph runs into rows of a given width.
//!
//! The pool holds one [`GlyphRunView`] per run element and never changes
//! with the width. Flowing copies runs out of the pool, breaking them where
//! a row runs out of room, and fills rows with the copies. Edits mark the
//! lowest offset they touched, and the next flow starts at the row before
//! it so earlier rows keep their layout.

use tracing::{
  debug,
  trace,
};

use crate::{
  Result,
  config::Justify,
  document::{
    DocumentEvent,
    ElementId,
  },
  geometry::{
    Axis,
    Bias,
    Insets,
    Rect,
  },
  requirements::{
    SizeRequirements,
    UNBOUNDED,
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
    box_view::{
      BoxView,
      Tiled,
    },
    dispatch_update,
    glyph::GlyphRunView,
    row::{
      RowLayout,
      RowView,
    },
    tabs::{
      FixedPitch,
      TabAlign,
      TabExpander,
      TabSet,
    },
    update_targets,
  },
};

impl FromElement for RowView {
  fn from_element(_element: ElementId, _cx: &LayoutCx<'_>) -> Option<Box<Self>> {
    None
  }
}

/// Tab expansion against the paragraph's tab stops. Aligned stops measure
/// the text following the tab in the pool.
struct ParagraphTabs<'a> {
  pool:    &'a [GlyphRunView],
  tab_set: &'a TabSet,
  pitch:   f32,
  end:     usize,
  cx:      LayoutCx<'a>,
}

impl ParagraphTabs<'_> {
  /// Offset of the first tab, or decimal point when `decimal`, at or after
  /// `from`. The paragraph end if there is none.
  fn terminator(&self, from: usize, decimal: bool) -> usize {
    if from >= self.end {
      return self.end;
    }
    self
      .cx
      .doc
      .rope()
      .chars_at(from)
      .take(self.end - from)
      .position(|ch| ch == '\t' || (decimal && ch == '.'))
      .map_or(self.end, |index| from + index)
  }

  fn partial_size(&self, p0: usize, p1: usize) -> f32 {
    let cx = &self.cx;
    self
      .pool
      .iter()
      .map(|run| (run, run.range(cx)))
      .filter(|(_, range)| range.start < p1 && range.end > p0)
      .map(|(run, range)| run.partial_span(p0.max(range.start), p1.min(range.end), cx))
      .sum()
  }
}

impl TabExpander for ParagraphTabs<'_> {
  fn next_tab_stop(&self, x: f32, tab_offset: usize) -> f32 {
    if self.tab_set.is_empty() {
      return FixedPitch::new(self.pitch).next_tab_stop(x, tab_offset);
    }
    let Some(stop) = self.tab_set.tab_after(x + 0.01) else {
      return x + 5.0;
    };
    match stop.align {
      TabAlign::Left | TabAlign::Bar => stop.position,
      TabAlign::Right | TabAlign::Decimal => {
        let terminator = self.terminator(tab_offset + 1, stop.align == TabAlign::Decimal);
        x.max(stop.position - self.partial_size(tab_offset + 1, terminator))
      },
      TabAlign::Center => {
        let terminator = self.terminator(tab_offset + 1, false);
        x.max(stop.position - self.partial_size(tab_offset + 1, terminator) / 2.0)
      },
    }
  }
}

/// A copy of the pool run covering `pos`, starting at `pos`.
fn view_at(pool: &[GlyphRunView], pos: usize, cx: &LayoutCx<'_>) -> Option<GlyphRunView> {
  let index = pool.partition_point(|run| run.end_offset(cx) <= pos);
  let run = pool.get(index)?;
  if run.start_offset(cx) == pos {
    Some(run.duplicate())
  } else {
    run.create_fragment(pos, run.end_offset(cx), cx)
  }
}

struct RowSpec {
  index:     usize,
  start:     usize,
  end:       usize,
  span:      i32,
  indent:    i32,
  alignment: f32,
}

/// Fill one row starting at `spec.start`. Returns the row and the offset the
/// next row starts at.
fn layout_row(pool: &[GlyphRunView], tabs: &ParagraphTabs<'_>, spec: RowSpec, cx: &LayoutCx<'_>) -> (RowView, usize) {
  let indent = if spec.index == 0 { spec.indent } else { 0 };
  let mut x = indent as f32;
  let mut span_left = spec.span as f32 - x;
  let mut pos = spec.start;

  let mut views: Vec<GlyphRunView> = Vec::new();
  let mut best = BreakWeight::Bad;
  let mut break_x = 0.0;
  let mut break_span = 0.0;
  let mut break_index = None;
  let mut forced = false;

  while pos < spec.end && span_left >= 0.0 {
    let Some(mut view) = view_at(pool, pos, cx) else {
      break;
    };
    let weight = view.break_weight(Axis::X, x, span_left, cx);
    if weight >= BreakWeight::Forced {
      let mut head = view.break_view(Axis::X, pos, x, span_left, cx).unwrap_or(view);
      head.tabbed_span(x, tabs, cx);
      views.push(head);
      forced = true;
      break;
    } else if weight >= best && weight > BreakWeight::Bad {
      best = weight;
      break_x = x;
      break_span = span_left;
      break_index = Some(views.len());
    }

    let chunk = view.tabbed_span(x, tabs, cx);
    if chunk > span_left {
      if let Some(index) = break_index {
        // Go back to the best break seen and split the view there.
        view = views.drain(index..).next().unwrap_or(view);
        let start = view.start_offset(cx);
        if let Some(mut head) = view.break_view(Axis::X, start, break_x, break_span, cx) {
          head.tabbed_span(break_x, tabs, cx);
          view = head;
        }
      }
    }
    span_left -= chunk;
    x += chunk;
    pos = view.end_offset(cx);
    views.push(view);
  }

  let next = views.last().map_or(pos, |view| view.end_offset(cx));
  let layout = RowLayout {
    alignment: spec.alignment,
    justify: false,
    forced,
  };
  let mut row = RowView::new(Axis::X, None, layout);
  if indent != 0 {
    row.set_insets(Insets::new(0, indent, 0, 0));
  }
  row.replace(0, 0, views.into_iter().map(Box::new).collect());
  (row, next)
}

/// View of a paragraph element.
#[derive(Debug)]
pub struct ParagraphView {
  element:      ElementId,
  /// Rows along Y. Shares the paragraph's id.
  body:         BoxView<Tiled, RowView>,
  pool:         Vec<GlyphRunView>,
  pool_request: Option<SizeRequirements>,
  /// Width rows were flowed into, inside the insets.
  flow_span:    Option<i32>,
  flow_valid:   bool,
  /// Lowest offset changed since the last flow.
  damage:       Option<usize>,
  /// Preferred height after the last flow.
  height:       f32,
}

impl ParagraphView {
  pub fn new(element: ElementId, cx: &LayoutCx<'_>) -> Self {
    let id = ViewId::next();
    let body = BoxView::with_id(id, Axis::Y, Some(element), Tiled).with_insets(cx.env.config().insets);
    let pool = cx
      .doc
      .element(element)
      .children()
      .iter()
      .map(|run| {
        let mut view = GlyphRunView::new(*run, cx);
        view.set_parent(Some(id));
        view
      })
      .collect();
    Self {
      element,
      body,
      pool,
      pool_request: None,
      flow_span: None,
      flow_valid: false,
      damage: None,
      height: 0.0,
    }
  }

  pub fn rows(&self) -> &BoxView<Tiled, RowView> {
    &self.body
  }

  pub fn row_count(&self) -> usize {
    self.body.view_count()
  }

  pub fn row(&self, index: usize) -> &RowView {
    self.body.view(index)
  }

  fn mark_damage(&mut self, offset: usize) {
    self.damage = Some(self.damage.map_or(offset, |damage| damage.min(offset)));
    self.flow_valid = false;
  }

  /// Requirements of the runs laid end to end, breaking only where a run
  /// has to break.
  fn pool_requirements(&mut self, cx: &LayoutCx<'_>) -> SizeRequirements {
    if let Some(request) = self.pool_request {
      return request;
    }
    let mut minimum = 0.0f32;
    let mut preferred = 0.0f32;
    let mut line = 0.0f32;
    for run in &mut self.pool {
      minimum = minimum.max(run.minimum_span(Axis::X, cx));
      let mut p0 = run.start_offset(cx);
      for spot in run.mandatory_breaks(cx) {
        preferred = preferred.max(line + run.partial_span(p0, spot, cx));
        line = 0.0;
        p0 = spot;
      }
      line += run.partial_span(p0, run.end_offset(cx), cx);
    }
    preferred = preferred.max(line).max(minimum);
    let request = SizeRequirements::new(minimum, preferred, UNBOUNDED, 0.5);
    self.pool_request = Some(request);
    request
  }

  fn ensure_flow(&mut self, cx: &LayoutCx<'_>) {
    if !self.flow_valid {
      self.flow(self.flow_span.unwrap_or(i32::MAX), cx);
    }
  }

  fn ensure_layout(&mut self, alloc: Rect, cx: &LayoutCx<'_>) {
    let span = alloc.width - self.body.insets().span(Axis::X);
    if !self.flow_valid || self.flow_span != Some(span.max(0)) || !self.body.is_allocation_valid() {
      self.set_size(alloc.width as f32, alloc.height as f32, cx);
    }
  }

  /// Rebuild the rows from the damaged one on.
  fn flow(&mut self, span: i32, cx: &LayoutCx<'_>) {
    let range = cx.doc.element(self.element).range();
    let damage = self.damage.take().unwrap_or(range.start);
    for run in &mut self.pool {
      run.ensure_breaks(cx);
    }

    let count = self.body.view_count();
    let mut index = 0;
    if damage > range.start && count > 0 {
      let containing = (0..count)
        .take_while(|row| self.body.view(*row).start_offset(cx) <= damage)
        .count();
      // The row before the damage may take up text from the damaged one.
      index = containing.saturating_sub(2);
    }
    let mut pos = if index == 0 {
      range.start
    } else {
      self.body.view(index).start_offset(cx)
    };

    let config = cx.env.config();
    let tabs = ParagraphTabs {
      pool:    &self.pool,
      tab_set: cx.env.tab_set(),
      pitch:   config.tab_pitch,
      end:     range.end,
      cx:      *cx,
    };
    let mut rows = Vec::new();
    while pos < range.end {
      let spec = RowSpec {
        index: index + rows.len(),
        start: pos,
        end: range.end,
        span,
        indent: config.first_line_indent,
        alignment: config.justify.row_alignment(),
      };
      let (row, next) = layout_row(&self.pool, &tabs, spec, cx);
      rows.push(Box::new(row));
      if next <= pos {
        break;
      }
      pos = next;
    }
    debug!(
      paragraph = self.body.id().get(),
      from = index,
      rows = rows.len(),
      span,
      "flowed paragraph"
    );
    self.body.replace(index, count - index, rows);
    self.update_justification(cx);
    self.flow_valid = true;
    self.height = self.body.preferred_span(Axis::Y, cx);
  }

  /// Justify every row but the last and those ending at a forced break.
  fn update_justification(&mut self, cx: &LayoutCx<'_>) {
    let justified = cx.env.config().justify == Justify::Justified && !cx.doc.is_i18n();
    let count = self.body.view_count();
    for index in 0..count {
      let row = self.body.view_mut(index);
      let justify = justified && index + 1 < count && !row.layout().forced;
      if row.layout().justify != justify {
        row.layout_mut().justify = justify;
        self.body.child_preference_changed(index, PreferenceChange::along(Axis::X));
      }
    }
  }

  fn update(&mut self, event: &DocumentEvent, cx: &LayoutCx<'_>) -> PreferenceChange {
    let start = self.start_offset(cx);
    let mut added = None;
    if let Some(change) = event.change_for(self.element) {
      let id = self.body.id();
      let views: Vec<GlyphRunView> = change
        .added
        .iter()
        .map(|run| {
          let mut view = GlyphRunView::new(*run, cx);
          view.set_parent(Some(id));
          view
        })
        .collect();
      added = Some(change.index..change.index + views.len());
      let removed = change.index..change.index + change.removed.len();
      for mut view in self.pool.splice(removed, views) {
        view.set_parent(None);
      }
      trace!(paragraph = id.get(), "rebuilt run pool");
      // Rows may hold fragments of the removed runs.
      self.mark_damage(start);
    }

    let ranges: Vec<_> = self.pool.iter().map(|run| run.range(cx)).collect();
    for index in update_targets(&ranges, event, added) {
      dispatch_update(&mut self.pool[index], event, cx);
    }
    self.mark_damage(event.offset.max(start));
    self.pool_request = None;
    self.body.layout_changed(Axis::X);
    self.body.layout_changed(Axis::Y);
    PreferenceChange::BOTH
  }
}

impl Sizable for ParagraphView {
  fn preferred_span(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> f32 {
    match axis {
      Axis::X => self.pool_requirements(cx).preferred + self.body.insets().span(axis) as f32,
      Axis::Y => {
        self.ensure_flow(cx);
        self.body.preferred_span(axis, cx)
      },
    }
  }

  fn minimum_span(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> f32 {
    match axis {
      Axis::X => self.pool_requirements(cx).minimum + self.body.insets().span(axis) as f32,
      Axis::Y => {
        self.ensure_flow(cx);
        self.body.minimum_span(axis, cx)
      },
    }
  }

  fn maximum_span(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> f32 {
    match axis {
      Axis::X => UNBOUNDED,
      Axis::Y => {
        self.ensure_flow(cx);
        self.body.maximum_span(axis, cx)
      },
    }
  }

  fn alignment(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> f32 {
    match axis {
      Axis::X => 0.5,
      Axis::Y => {
        self.ensure_flow(cx);
        self.body.alignment(axis, cx)
      },
    }
  }

  fn resize_weight(&mut self, axis: Axis, _cx: &LayoutCx<'_>) -> i32 {
    i32::from(axis == Axis::X)
  }

  fn set_size(&mut self, width: f32, height: f32, cx: &LayoutCx<'_>) -> PreferenceChange {
    let span = (width as i32).saturating_sub(self.body.insets().span(Axis::X)).max(0);
    if self.flow_span != Some(span) {
      self.flow_span = Some(span);
      let start = self.start_offset(cx);
      self.mark_damage(start);
    }

    let mut change = PreferenceChange::NONE;
    if !self.flow_valid {
      let old = self.height;
      self.flow(span, cx);
      change.height = self.height != old;
    }
    change | self.body.set_size(width, height, cx)
  }
}

impl Breakable for ParagraphView {}

impl Paintable for ParagraphView {
  fn paint(&mut self, surface: &mut dyn Surface, alloc: Rect, cx: &LayoutCx<'_>) {
    self.ensure_layout(alloc, cx);
    self.body.paint(surface, alloc, cx);
  }
}

impl ModelMapped for ParagraphView {
  fn model_to_view(&mut self, pos: usize, alloc: Rect, bias: Bias, cx: &LayoutCx<'_>) -> Result<Rect> {
    self.ensure_layout(alloc, cx);
    self.body.model_to_view(pos, alloc, bias, cx)
  }

  fn view_to_model(&mut self, x: f32, y: f32, alloc: Rect, cx: &LayoutCx<'_>) -> (usize, Bias) {
    self.ensure_layout(alloc, cx);
    self.body.view_to_model(x, y, alloc, cx)
  }
}

impl View for ParagraphView {
  fn id(&self) -> ViewId {
    self.body.id()
  }

  fn parent(&self) -> Option<ViewId> {
    self.body.parent()
  }

  fn set_parent(&mut self, parent: Option<ViewId>) {
    if parent.is_none() {
      for run in &mut self.pool {
        run.set_parent(None);
      }
    }
    self.body.set_parent(parent);
  }

  fn element(&self) -> Option<ElementId> {
    Some(self.element)
  }

  fn start_offset(&self, cx: &LayoutCx<'_>) -> usize {
    cx.doc.element(self.element).start()
  }

  fn end_offset(&self, cx: &LayoutCx<'_>) -> usize {
    cx.doc.element(self.element).end()
  }

  fn insert_update(&mut self, event: &DocumentEvent, cx: &LayoutCx<'_>) -> PreferenceChange {
    self.update(event, cx)
  }

  fn remove_update(&mut self, event: &DocumentEvent, cx: &LayoutCx<'_>) -> PreferenceChange {
    self.update(event, cx)
  }

  fn changed_update(&mut self, event: &DocumentEvent, cx: &LayoutCx<'_>) -> PreferenceChange {
    self.update(event, cx)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use the_core::breaks::{
    Break,
    TableBreaker,
  };

  use super::*;
  use crate::{
    config::LayoutConfig,
    document::{
      Attributes,
      DocumentContent,
    },
    surface::RecordingSurface,
    test_util,
    view::tabs::TabStop,
  };

  fn paragraph(doc: &DocumentContent, cx: &LayoutCx<'_>) -> ParagraphView {
    let first = doc.element(doc.root()).children()[0];
    ParagraphView::new(first, cx)
  }

  fn row_ranges(view: &ParagraphView, cx: &LayoutCx<'_>) -> Vec<std::ops::Range<usize>> {
    (0..view.row_count()).map(|index| view.row(index).range(cx)).collect()
  }

  #[test]
  fn test_wraps_at_word_boundary() {
    let doc = DocumentContent::new("hello world");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = paragraph(&doc, &cx);
    let change = view.set_size(60.0, 100.0, &cx);
    assert!(change.height);
    assert_eq!(row_ranges(&view, &cx), vec![0..6, 6..12]);
    assert_eq!(view.preferred_span(Axis::Y, &cx), 20.0);
    assert_eq!(view.preferred_span(Axis::X, &cx), 110.0);
    assert_eq!(view.minimum_span(Axis::X, &cx), 60.0);
  }

  #[test]
  fn test_breaks_at_last_spot_before_bound() {
    let doc = DocumentContent::new("hello world");
    let env = test_util::env().with_breaker(Arc::new(TableBreaker::new(vec![Break::allowed(5)])));
    let cx = LayoutCx::new(&doc, &env);
    let mut view = paragraph(&doc, &cx);
    view.set_size(80.0, 100.0, &cx);
    assert_eq!(row_ranges(&view, &cx), vec![0..5, 5..12]);
  }

  #[test]
  fn test_single_row_when_wide() {
    let doc = DocumentContent::new("hello world");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = paragraph(&doc, &cx);
    view.set_size(1000.0, 100.0, &cx);
    assert_eq!(row_ranges(&view, &cx), vec![0..12]);
    assert!(!view.set_size(1000.0, 100.0, &cx).height);

    view.set_size(60.0, 100.0, &cx);
    assert_eq!(view.row_count(), 2);
  }

  #[test]
  fn test_long_word_breaks_anywhere() {
    let doc = DocumentContent::new("abcdefgh ij");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = paragraph(&doc, &cx);
    view.set_size(50.0, 100.0, &cx);
    assert_eq!(row_ranges(&view, &cx), vec![0..5, 5..9, 9..12]);
  }

  #[test]
  fn test_forced_break() {
    let doc = DocumentContent::new("ab\u{2028}cd");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = paragraph(&doc, &cx);
    view.set_size(1000.0, 100.0, &cx);
    assert_eq!(row_ranges(&view, &cx), vec![0..3, 3..6]);
    assert!(view.row(0).layout().forced);
    assert!(!view.row(1).layout().forced);
    assert_eq!(view.preferred_span(Axis::X, &cx), 20.0);
  }

  #[test]
  fn test_fitting_run_is_not_cut_back() {
    let mut doc = DocumentContent::new("aa bb cccccc");
    let raised = Attributes {
      superscript: true,
      ..Attributes::default()
    };
    doc.set_attributes(6..12, raised).unwrap();
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = paragraph(&doc, &cx);
    view.set_size(80.0, 100.0, &cx);
    assert_eq!(row_ranges(&view, &cx), vec![0..6, 6..13]);
    assert_eq!(view.row(0).view_count(), 1);
  }

  #[test]
  fn test_runs_flow_across_rows() {
    let mut doc = DocumentContent::new("aaa bbb ccc");
    let raised = Attributes {
      superscript: true,
      ..Attributes::default()
    };
    doc.set_attributes(4..7, raised).unwrap();
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = paragraph(&doc, &cx);
    view.set_size(75.0, 100.0, &cx);
    // No break inside "bbb" or before it, so the row ends with the run.
    assert_eq!(row_ranges(&view, &cx), vec![0..7, 7..12]);
    assert_eq!(view.row(0).view_count(), 2);
    assert_eq!(view.row(1).view_count(), 1);
  }

  #[test]
  fn test_justified_rows() {
    let config = LayoutConfig {
      justify: Justify::Justified,
      ..test_util::config()
    };
    let doc = DocumentContent::new("aa bb cc dd ee");
    let env = test_util::env_with(config);
    let cx = LayoutCx::new(&doc, &env);
    let mut view = paragraph(&doc, &cx);
    view.set_size(100.0, 100.0, &cx);
    assert_eq!(row_ranges(&view, &cx), vec![0..9, 9..15]);
    let first = view.rows().view(0);
    assert!(first.layout().justify);
    assert!(!view.rows().view(1).layout().justify);

    let mut surface = RecordingSurface::new(Rect::new(0, 0, 100, 100));
    view.paint(&mut surface, Rect::new(0, 0, 100, 100), &cx);
    assert_eq!(view.rows().spans(Axis::X), &[100, 50]);
    let row = view.rows().view(0);
    assert_eq!(row.spans(Axis::X).iter().sum::<i32>(), 100);
  }

  #[test]
  fn test_no_justification_for_rtl_text() {
    let config = LayoutConfig {
      justify: Justify::Justified,
      ..test_util::config()
    };
    let doc = DocumentContent::new("aa bb \u{05d0}c dd ee");
    let env = test_util::env_with(config);
    let cx = LayoutCx::new(&doc, &env);
    let mut view = paragraph(&doc, &cx);
    view.set_size(100.0, 100.0, &cx);
    assert!(view.row_count() > 1);
    assert!(!view.rows().view(0).layout().justify);
  }

  #[test]
  fn test_right_aligned_rows() {
    let config = LayoutConfig {
      justify: Justify::Right,
      ..test_util::config()
    };
    let doc = DocumentContent::new("abc");
    let env = test_util::env_with(config);
    let cx = LayoutCx::new(&doc, &env);
    let mut view = paragraph(&doc, &cx);
    view.set_size(100.0, 100.0, &cx);
    assert_eq!(view.rows().offsets(Axis::X), &[70]);
    let rect = view.model_to_view(0, Rect::new(0, 0, 100, 100), Bias::Forward, &cx).unwrap();
    assert_eq!(rect.x, 70);
  }

  #[test]
  fn test_first_line_indent() {
    let config = LayoutConfig {
      first_line_indent: 20,
      ..test_util::config()
    };
    let doc = DocumentContent::new("hello world");
    let env = test_util::env_with(config);
    let cx = LayoutCx::new(&doc, &env);
    let mut view = paragraph(&doc, &cx);
    view.set_size(80.0, 100.0, &cx);
    assert_eq!(row_ranges(&view, &cx), vec![0..6, 6..12]);
    let alloc = Rect::new(0, 0, 80, 100);
    assert_eq!(view.model_to_view(0, alloc, Bias::Forward, &cx).unwrap().x, 20);
    assert_eq!(view.model_to_view(6, alloc, Bias::Forward, &cx).unwrap().x, 0);
  }

  #[test]
  fn test_fixed_pitch_tabs() {
    let doc = DocumentContent::new("a\tb");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = paragraph(&doc, &cx);
    view.set_size(200.0, 100.0, &cx);
    let alloc = Rect::new(0, 0, 200, 100);
    assert_eq!(view.model_to_view(2, alloc, Bias::Forward, &cx).unwrap().x, 80);
  }

  #[test]
  fn test_aligned_tab_stops() {
    let stops = vec![
      TabStop::new(100.0, TabAlign::Right),
      TabStop::new(200.0, TabAlign::Decimal),
      TabStop::new(300.0, TabAlign::Center),
    ];
    let config = LayoutConfig {
      tab_stops: stops,
      ..test_util::config()
    };
    let doc = DocumentContent::new("x\t12\t3.5\tab");
    let env = test_util::env_with(config);
    let cx = LayoutCx::new(&doc, &env);
    let mut view = paragraph(&doc, &cx);
    let alloc = Rect::new(0, 0, 400, 100);
    view.set_size(400.0, 100.0, &cx);
    // "12" ends at the right stop.
    assert_eq!(view.model_to_view(2, alloc, Bias::Forward, &cx).unwrap().x, 80);
    // The decimal point lands on the decimal stop.
    assert_eq!(view.model_to_view(6, alloc, Bias::Forward, &cx).unwrap().x, 200);
    // "ab" is centered on the last stop.
    assert_eq!(view.model_to_view(9, alloc, Bias::Forward, &cx).unwrap().x, 290);
  }

  #[test]
  fn test_view_to_model() {
    let doc = DocumentContent::new("hello world");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = paragraph(&doc, &cx);
    let alloc = Rect::new(0, 0, 60, 20);
    assert_eq!(view.view_to_model(22.0, 15.0, alloc, &cx), (8, Bias::Forward));
    assert_eq!(view.view_to_model(500.0, 15.0, alloc, &cx), (11, Bias::Forward));
    assert_eq!(view.view_to_model(0.0, -5.0, alloc, &cx), (0, Bias::Forward));
  }

  #[test]
  fn test_edit_keeps_earlier_rows() {
    let mut doc = DocumentContent::new("aaa bbb ccc ddd eee");
    let env = test_util::env();
    let mut view = {
      let cx = LayoutCx::new(&doc, &env);
      let mut view = paragraph(&doc, &cx);
      view.set_size(40.0, 100.0, &cx);
      assert_eq!(view.row_count(), 5);
      view
    };
    let first = view.row(0).id();
    let second = view.row(1).id();

    let event = doc.insert(17, "x", Attributes::default()).unwrap();
    let cx = LayoutCx::new(&doc, &env);
    assert_eq!(view.insert_update(&event, &cx), PreferenceChange::BOTH);
    view.set_size(40.0, 100.0, &cx);
    assert_eq!(view.row(0).id(), first);
    assert_eq!(view.row(1).id(), second);
    assert_eq!(row_ranges(&view, &cx), vec![0..4, 4..8, 8..12, 12..16, 16..21]);
  }

  #[test]
  fn test_attribute_change_rebuilds_pool() {
    let mut doc = DocumentContent::new("aaa bbb");
    let env = test_util::env();
    let mut view = {
      let cx = LayoutCx::new(&doc, &env);
      let mut view = paragraph(&doc, &cx);
      view.set_size(1000.0, 100.0, &cx);
      view
    };
    let large = Attributes {
      scale: 2.0,
      ..Attributes::default()
    };
    let event = doc.set_attributes(4..7, large).unwrap();
    let cx = LayoutCx::new(&doc, &env);
    view.changed_update(&event, &cx);
    assert_eq!(view.preferred_span(Axis::Y, &cx), 20.0);
    assert_eq!(view.preferred_span(Axis::X, &cx), 100.0);
    view.set_size(1000.0, 100.0, &cx);
    assert_eq!(view.row(0).view_count(), 3);
  }
}
