//! Boxes: composite views tiling children along one axis and stacking them
//! along the other.

use std::fmt;

use tracing::trace;

use crate::{
  LayoutError,
  Result,
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
    self,
    SizeRequirements,
  },
  surface::Surface,
  view::{
    Breakable,
    FromElement,
    LayoutCx,
    ModelMapped,
    Paintable,
    PreferenceChange,
    Sizable,
    View,
    ViewId,
    dispatch_update,
    update_targets,
  },
};

/// How a box turns the requirements of its children into its own, and a
/// target span into child offsets and spans.
pub trait BoxLayout<V: View + ?Sized>: Send + fmt::Debug {
  fn major_requirements(&mut self, axis: Axis, children: &mut [Box<V>], cx: &LayoutCx<'_>) -> SizeRequirements {
    requirements::tiled(&child_requirements(children, axis, cx))
  }

  fn minor_requirements(&mut self, axis: Axis, children: &mut [Box<V>], cx: &LayoutCx<'_>) -> SizeRequirements {
    requirements::stacked(&child_requirements(children, axis, cx))
  }

  fn layout_major(
    &mut self,
    target: i32,
    axis: Axis,
    children: &mut [Box<V>],
    offsets: &mut [i32],
    spans: &mut [i32],
    cx: &LayoutCx<'_>,
  ) {
    requirements::tile(target, &child_requirements(children, axis, cx), offsets, spans);
  }

  fn layout_minor(
    &mut self,
    target: i32,
    axis: Axis,
    children: &mut [Box<V>],
    offsets: &mut [i32],
    spans: &mut [i32],
    cx: &LayoutCx<'_>,
  ) {
    requirements::stack(target, &child_requirements(children, axis, cx), offsets, spans);
  }
}

pub fn child_requirements<V: View + ?Sized>(
  children: &mut [Box<V>],
  axis: Axis,
  cx: &LayoutCx<'_>,
) -> Vec<SizeRequirements> {
  children.iter_mut().map(|child| child.requirements(axis, cx)).collect()
}

/// Plain tiling along the major axis.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tiled;

impl<V: View + ?Sized> BoxLayout<V> for Tiled {}

#[derive(Debug, Default)]
struct AxisState {
  request:       SizeRequirements,
  request_valid: bool,
  alloc_valid:   bool,
  /// Allocated span, inside the insets.
  span:          i32,
  offsets:       Vec<i32>,
  spans:         Vec<i32>,
}

impl AxisState {
  fn invalidate(&mut self) {
    self.request_valid = false;
    self.alloc_valid = false;
  }
}

/// A composite view laying its children out along `axis`.
///
/// Requirements are computed lazily and cached per axis until a child
/// reports a preference change along it. Allocations are cached until the
/// box is given a different span or its requirements change.
#[derive(Debug)]
pub struct BoxView<L = Tiled, V: ?Sized = dyn View> {
  id:       ViewId,
  parent:   Option<ViewId>,
  element:  Option<ElementId>,
  axis:     Axis,
  insets:   Insets,
  children: Vec<Box<V>>,
  major:    AxisState,
  minor:    AxisState,
  layout:   L,
}

impl<L, V: View + ?Sized> BoxView<L, V> {
  pub fn new(axis: Axis, element: Option<ElementId>, layout: L) -> Self {
    Self::with_id(ViewId::next(), axis, element, layout)
  }

  /// A box sharing the id of the view that wraps it.
  pub fn with_id(id: ViewId, axis: Axis, element: Option<ElementId>, layout: L) -> Self {
    Self {
      id,
      parent: None,
      element,
      axis,
      insets: Insets::default(),
      children: Vec::new(),
      major: AxisState::default(),
      minor: AxisState::default(),
      layout,
    }
  }

  pub fn with_insets(mut self, insets: Insets) -> Self {
    self.insets = insets;
    self
  }

  pub fn axis(&self) -> Axis {
    self.axis
  }

  pub fn insets(&self) -> &Insets {
    &self.insets
  }

  pub fn set_insets(&mut self, insets: Insets) {
    if self.insets != insets {
      self.insets = insets;
      self.major.invalidate();
      self.minor.invalidate();
    }
  }

  pub fn layout(&self) -> &L {
    &self.layout
  }

  /// Changing the layout policy invalidates the allocation along both axes.
  pub fn layout_mut(&mut self) -> &mut L {
    self.major.invalidate();
    self.minor.invalidate();
    &mut self.layout
  }

  pub fn view_count(&self) -> usize {
    self.children.len()
  }

  pub fn view(&self, index: usize) -> &V {
    &self.children[index]
  }

  pub fn view_mut(&mut self, index: usize) -> &mut V {
    &mut self.children[index]
  }

  pub fn children(&self) -> &[Box<V>] {
    &self.children
  }

  fn state(&self, axis: Axis) -> &AxisState {
    if axis == self.axis { &self.major } else { &self.minor }
  }

  fn state_mut(&mut self, axis: Axis) -> &mut AxisState {
    if axis == self.axis {
      &mut self.major
    } else {
      &mut self.minor
    }
  }

  pub fn offsets(&self, axis: Axis) -> &[i32] {
    &self.state(axis).offsets
  }

  pub fn spans(&self, axis: Axis) -> &[i32] {
    &self.state(axis).spans
  }

  /// Allocated span along `axis`, inside the insets.
  pub fn span(&self, axis: Axis) -> i32 {
    self.state(axis).span
  }

  /// Drop the allocation along `axis` so the next sizing lays it out again.
  pub fn layout_changed(&mut self, axis: Axis) {
    self.state_mut(axis).alloc_valid = false;
  }

  pub fn is_layout_valid(&self, axis: Axis) -> bool {
    self.state(axis).alloc_valid
  }

  pub fn is_allocation_valid(&self) -> bool {
    self.major.alloc_valid && self.minor.alloc_valid
  }

  /// Replace `count` children starting at `index`. Layout entries of the
  /// children outside of the range are kept, new ones start out zeroed.
  pub fn replace(&mut self, index: usize, count: usize, views: Vec<Box<V>>) -> Vec<Box<V>> {
    let inserted = views.len();
    let id = self.id;
    let views = views.into_iter().map(|mut view| {
      view.set_parent(Some(id));
      view
    });
    let mut removed: Vec<Box<V>> = self.children.splice(index..index + count, views).collect();
    for view in &mut removed {
      view.set_parent(None);
    }
    for state in [&mut self.major, &mut self.minor] {
      state.offsets.splice(index..index + count, std::iter::repeat_n(0, inserted));
      state.spans.splice(index..index + count, std::iter::repeat_n(0, inserted));
      state.invalidate();
    }
    trace!(view = self.id.get(), index, count, inserted, "replaced children");
    removed
  }

  pub fn append(&mut self, view: Box<V>) {
    let index = self.children.len();
    self.replace(index, 0, vec![view]);
  }

  /// Record that the child at `index` changed its preferences. Returns the
  /// change for the caller to pass on to this box's parent.
  pub fn child_preference_changed(&mut self, _index: usize, change: PreferenceChange) -> PreferenceChange {
    if change.affects(self.axis) {
      self.major.invalidate();
    }
    if change.affects(self.axis.other()) {
      self.minor.invalidate();
    }
    change
  }

  /// Rectangle of child `index` inside `inside`, the allocation without the
  /// insets.
  fn child_rect(&self, index: usize, inside: Rect) -> Rect {
    let mut rect = Rect::default();
    for (axis, state) in [(self.axis, &self.major), (self.axis.other(), &self.minor)] {
      rect.set_offset(axis, inside.offset(axis) + state.offsets[index]);
      rect.set_span(axis, state.spans[index]);
    }
    rect
  }

  /// Child whose slot along the major axis holds the point, clamped to the
  /// first and last child.
  fn index_at_point(&self, x: i32, y: i32, inside: Rect) -> Option<usize> {
    if self.children.is_empty() {
      return None;
    }
    let (pos, origin) = match self.axis {
      Axis::X => (x, inside.x),
      Axis::Y => (y, inside.y),
    };
    let index = self.major.offsets.partition_point(|offset| origin + offset <= pos);
    Some(index.saturating_sub(1))
  }

  fn model_start(&self, cx: &LayoutCx<'_>) -> usize {
    match (self.element, self.children.first()) {
      (Some(element), _) => cx.doc.element(element).start(),
      (None, Some(first)) => first.start_offset(cx),
      (None, None) => 0,
    }
  }

  fn model_end(&self, cx: &LayoutCx<'_>) -> usize {
    match (self.element, self.children.last()) {
      (Some(element), _) => cx.doc.element(element).end(),
      (None, Some(last)) => last.end_offset(cx),
      (None, None) => 0,
    }
  }

  /// Child presenting `pos`. A backward bias looks at the character before.
  pub fn view_index_at_position(&self, pos: usize, bias: Bias, cx: &LayoutCx<'_>) -> Option<usize> {
    let pos = match bias {
      Bias::Backward => pos.saturating_sub(1),
      Bias::Forward => pos,
    };
    let index = self.children.partition_point(|child| child.end_offset(cx) <= pos);
    (index < self.children.len() && self.children[index].start_offset(cx) <= pos).then_some(index)
  }
}

impl<L: BoxLayout<V>, V: View + ?Sized> BoxView<L, V> {
  fn check_request(&mut self, axis: Axis, cx: &LayoutCx<'_>) {
    let major = axis == self.axis;
    let state = if major { &mut self.major } else { &mut self.minor };
    if state.request_valid {
      return;
    }
    state.request = if major {
      self.layout.major_requirements(axis, &mut self.children, cx)
    } else {
      self.layout.minor_requirements(axis, &mut self.children, cx)
    };
    state.request_valid = true;
  }

  pub fn requirements_along(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> SizeRequirements {
    self.check_request(axis, cx);
    self.state(axis).request
  }

  /// Lay the children out along `axis` if `span` differs from the last
  /// allocation or the allocation was invalidated.
  pub fn set_span_on_axis(&mut self, axis: Axis, span: i32, cx: &LayoutCx<'_>) -> PreferenceChange {
    let state = self.state_mut(axis);
    if state.span != span {
      state.alloc_valid = false;
    }
    if state.alloc_valid {
      return PreferenceChange::NONE;
    }
    state.span = span;

    self.check_request(axis, cx);
    let major = axis == self.axis;
    let state = if major { &mut self.major } else { &mut self.minor };
    if major {
      self.layout.layout_major(span, axis, &mut self.children, &mut state.offsets, &mut state.spans, cx);
    } else {
      self.layout.layout_minor(span, axis, &mut self.children, &mut state.offsets, &mut state.spans, cx);
    }
    state.alloc_valid = true;
    self.update_child_sizes(cx)
  }

  fn update_child_sizes(&mut self, cx: &LayoutCx<'_>) -> PreferenceChange {
    let mut change = PreferenceChange::NONE;
    for index in 0..self.children.len() {
      let rect = self.child_rect(index, Rect::default());
      let child_change = self.children[index].set_size(rect.width as f32, rect.height as f32, cx);
      if !child_change.is_none() {
        change |= self.child_preference_changed(index, child_change);
      }
    }
    change
  }

  /// Allocation of child `index` within `alloc`, laying the box out first
  /// if needed. `None` if the box couldn't be laid out.
  pub fn child_allocation(&mut self, index: usize, alloc: Rect, cx: &LayoutCx<'_>) -> Option<Rect> {
    if index >= self.children.len() {
      return None;
    }
    if !self.is_allocation_valid() {
      self.set_size(alloc.width as f32, alloc.height as f32, cx);
    }
    let rect = self.child_rect(index, alloc.inset(&self.insets));
    if rect.width == 0 && rect.height == 0 && !self.is_allocation_valid() {
      return None;
    }
    Some(rect)
  }

  /// Child under the point and its allocation.
  pub fn view_at_point(&mut self, x: i32, y: i32, alloc: Rect, cx: &LayoutCx<'_>) -> Option<(usize, Rect)> {
    if !self.is_allocation_valid() {
      self.set_size(alloc.width as f32, alloc.height as f32, cx);
    }
    let inside = alloc.inset(&self.insets);
    let index = self.index_at_point(x, y, inside)?;
    Some((index, self.child_rect(index, inside)))
  }

  fn ensure_allocation(&mut self, alloc: Rect, cx: &LayoutCx<'_>) {
    if !self.is_allocation_valid() {
      self.set_size(alloc.width as f32, alloc.height as f32, cx);
    }
  }

  fn forward_update(&mut self, event: &DocumentEvent, cx: &LayoutCx<'_>) -> PreferenceChange
  where
    V: FromElement,
  {
    let mut change = PreferenceChange::NONE;
    let mut added = None;
    if let Some(element) = self.element {
      if let Some(element_change) = event.change_for(element) {
        let views: Vec<Box<V>> = element_change
          .added
          .iter()
          .filter_map(|element| V::from_element(*element, cx))
          .collect();
        added = Some(element_change.index..element_change.index + views.len());
        self.replace(element_change.index, element_change.removed.len(), views);
        change = PreferenceChange::BOTH;
      }
    }

    let ranges: Vec<_> = self.children.iter().map(|child| child.range(cx)).collect();
    for index in update_targets(&ranges, event, added) {
      let child_change = dispatch_update(&mut *self.children[index], event, cx);
      change |= self.child_preference_changed(index, child_change);
    }
    change
  }
}

impl<L: BoxLayout<V>, V: View + ?Sized> Sizable for BoxView<L, V> {
  fn preferred_span(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> f32 {
    self.requirements_along(axis, cx).preferred + self.insets.span(axis) as f32
  }

  fn minimum_span(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> f32 {
    self.requirements_along(axis, cx).minimum + self.insets.span(axis) as f32
  }

  fn maximum_span(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> f32 {
    self.requirements_along(axis, cx).maximum + self.insets.span(axis) as f32
  }

  fn alignment(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> f32 {
    self.requirements_along(axis, cx).alignment
  }

  fn resize_weight(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> i32 {
    i32::from(self.requirements_along(axis, cx).is_resizable())
  }

  fn set_size(&mut self, width: f32, height: f32, cx: &LayoutCx<'_>) -> PreferenceChange {
    let width = (width as i32).saturating_sub(self.insets.span(Axis::X)).max(0);
    let height = (height as i32).saturating_sub(self.insets.span(Axis::Y)).max(0);
    let mut change = self.set_span_on_axis(Axis::X, width, cx);
    change |= self.set_span_on_axis(Axis::Y, height, cx);
    change
  }
}

impl<L: BoxLayout<V>, V: View + ?Sized> Breakable for BoxView<L, V> {}

impl<L: BoxLayout<V>, V: View + ?Sized> Paintable for BoxView<L, V> {
  fn paint(&mut self, surface: &mut dyn Surface, alloc: Rect, cx: &LayoutCx<'_>) {
    self.ensure_allocation(alloc, cx);
    let inside = alloc.inset(&self.insets);
    let clip = surface.clip();
    for index in 0..self.children.len() {
      let rect = self.child_rect(index, inside);
      if clip.intersects(&rect) {
        self.children[index].paint(surface, rect, cx);
      }
    }
  }
}

impl<L: BoxLayout<V>, V: View + ?Sized> ModelMapped for BoxView<L, V> {
  fn model_to_view(&mut self, pos: usize, alloc: Rect, bias: Bias, cx: &LayoutCx<'_>) -> Result<Rect> {
    self.ensure_allocation(alloc, cx);
    let bad_location = LayoutError::BadLocation { offset: pos };
    let test_pos = match bias {
      Bias::Backward => {
        if pos == 0 || pos - 1 < self.model_start(cx) {
          return Err(bad_location);
        }
        pos - 1
      },
      Bias::Forward => pos,
    };

    let Some(index) = self.view_index_at_position(test_pos, Bias::Forward, cx) else {
      return Err(bad_location);
    };
    let Some(child_alloc) = self.child_allocation(index, alloc, cx) else {
      return Err(bad_location);
    };
    match self.children[index].model_to_view(pos, child_alloc, bias, cx) {
      Err(LayoutError::BadLocation { .. }) if self.children[index].end_offset(cx) == pos => {
        let next = index + 1;
        let Some(next_alloc) = self.child_allocation(next, alloc, cx) else {
          return Err(bad_location);
        };
        self.children[next].model_to_view(pos, next_alloc, bias, cx)
      },
      result => result,
    }
  }

  fn view_to_model(&mut self, x: f32, y: f32, alloc: Rect, cx: &LayoutCx<'_>) -> (usize, Bias) {
    self.ensure_allocation(alloc, cx);
    let inside = alloc.inset(&self.insets);
    let (px, py) = (x as i32, y as i32);

    let before = match self.axis {
      Axis::X => px < inside.x,
      Axis::Y => py < inside.y,
    };
    let after = match self.axis {
      Axis::X => px >= inside.right(),
      Axis::Y => py >= inside.bottom(),
    };
    if self.children.is_empty() || before {
      return (self.model_start(cx), Bias::Forward);
    }
    if after {
      let end = self.model_end(cx);
      return (end.saturating_sub(1).max(self.model_start(cx)), Bias::Forward);
    }

    match self.index_at_point(px, py, inside) {
      Some(index) => {
        let rect = self.child_rect(index, inside);
        self.children[index].view_to_model(x, y, rect, cx)
      },
      None => (self.model_start(cx), Bias::Forward),
    }
  }
}

impl<L: BoxLayout<V>, V: View + FromElement + ?Sized> View for BoxView<L, V> {
  fn id(&self) -> ViewId {
    self.id
  }

  fn parent(&self) -> Option<ViewId> {
    self.parent
  }

  fn set_parent(&mut self, parent: Option<ViewId>) {
    if parent.is_none() {
      for child in &mut self.children {
        child.set_parent(None);
      }
    }
    self.parent = parent;
  }

  fn element(&self) -> Option<ElementId> {
    self.element
  }

  fn start_offset(&self, cx: &LayoutCx<'_>) -> usize {
    self.model_start(cx)
  }

  fn end_offset(&self, cx: &LayoutCx<'_>) -> usize {
    self.model_end(cx)
  }

  fn insert_update(&mut self, event: &DocumentEvent, cx: &LayoutCx<'_>) -> PreferenceChange {
    self.forward_update(event, cx)
  }

  fn remove_update(&mut self, event: &DocumentEvent, cx: &LayoutCx<'_>) -> PreferenceChange {
    self.forward_update(event, cx)
  }

  fn changed_update(&mut self, event: &DocumentEvent, cx: &LayoutCx<'_>) -> PreferenceChange {
    self.forward_update(event, cx)
  }
}

impl BoxView {
  /// A vertical box over views of the element's children.
  pub fn for_element(element: ElementId, cx: &LayoutCx<'_>) -> Self {
    let mut view = BoxView::new(Axis::Y, Some(element), Tiled);
    let children: Vec<Box<dyn View>> = cx
      .doc
      .element(element)
      .children()
      .iter()
      .filter_map(|child| <dyn View>::from_element(*child, cx))
      .collect();
    view.replace(0, 0, children);
    view
  }
}

impl FromElement for BoxView {
  fn from_element(element: ElementId, cx: &LayoutCx<'_>) -> Option<Box<Self>> {
    Some(Box::new(Self::for_element(element, cx)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    document::DocumentContent,
    test_util::{
      self,
      FixedView,
    },
  };

  fn fixed_box(axis: Axis, spans: &[f32]) -> BoxView<Tiled, FixedView> {
    let mut view = BoxView::new(axis, None, Tiled);
    let children = spans
      .iter()
      .enumerate()
      .map(|(i, span)| Box::new(FixedView::new(i * 10..(i + 1) * 10, *span, 10.0)))
      .collect();
    view.replace(0, 0, children);
    view
  }

  #[test]
  fn test_tiles_fixed_children() {
    let doc = DocumentContent::new("");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = fixed_box(Axis::X, &[10.0, 20.0, 30.0]);
    assert_eq!(view.preferred_span(Axis::X, &cx), 60.0);
    assert_eq!(view.preferred_span(Axis::Y, &cx), 10.0);
    view.set_size(60.0, 10.0, &cx);
    assert_eq!(view.offsets(Axis::X), &[0, 10, 30]);
    assert_eq!(view.spans(Axis::X), &[10, 20, 30]);
    assert_eq!(view.child_allocation(2, Rect::new(5, 5, 60, 10), &cx), Some(Rect::new(35, 5, 30, 10)));
    assert_eq!(view.child_allocation(3, Rect::new(5, 5, 60, 10), &cx), None);
  }

  #[test]
  fn test_insets() {
    let doc = DocumentContent::new("");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = fixed_box(Axis::Y, &[10.0]).with_insets(Insets::new(1, 2, 3, 4));
    assert_eq!(view.preferred_span(Axis::X, &cx), 16.0);
    assert_eq!(view.preferred_span(Axis::Y, &cx), 14.0);
    view.set_size(16.0, 14.0, &cx);
    assert_eq!(view.span(Axis::X), 10);
    assert_eq!(view.child_allocation(0, Rect::new(0, 0, 16, 14), &cx), Some(Rect::new(2, 1, 10, 10)));
  }

  #[test]
  fn test_requirements_are_cached() {
    let doc = DocumentContent::new("");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = fixed_box(Axis::X, &[10.0, 20.0]);
    let calls = view.view(0).calls();
    view.preferred_span(Axis::X, &cx);
    view.preferred_span(Axis::X, &cx);
    view.minimum_span(Axis::X, &cx);
    assert_eq!(calls.get(), 1);

    view.child_preference_changed(0, PreferenceChange::along(Axis::Y));
    view.preferred_span(Axis::X, &cx);
    assert_eq!(calls.get(), 1);
    view.child_preference_changed(0, PreferenceChange::along(Axis::X));
    view.preferred_span(Axis::X, &cx);
    assert_eq!(calls.get(), 2);
  }

  #[test]
  fn test_set_size_is_idempotent() {
    let doc = DocumentContent::new("");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = fixed_box(Axis::X, &[10.0, 20.0]);
    view.set_size(50.0, 10.0, &cx);
    let sizes = view.view(1).sizes();
    let before = sizes.get();
    assert!(before > 0);
    let offsets = view.offsets(Axis::X).to_vec();
    view.set_size(50.0, 10.0, &cx);
    assert_eq!(view.offsets(Axis::X), offsets.as_slice());
    assert_eq!(sizes.get(), before);
  }

  #[test]
  fn test_replace_keeps_layout_of_other_children() {
    let doc = DocumentContent::new("");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = fixed_box(Axis::X, &[10.0, 10.0, 10.0, 10.0, 10.0]);
    view.set_size(50.0, 10.0, &cx);
    let removed = view.replace(2, 1, vec![Box::new(FixedView::new(20..30, 5.0, 10.0))]);
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].parent(), None);
    assert_eq!(view.view_count(), 5);
    assert_eq!(view.offsets(Axis::X), &[0, 10, 0, 30, 40]);
    assert_eq!(view.spans(Axis::X), &[10, 10, 0, 10, 10]);
    assert!(!view.is_allocation_valid());
    assert_eq!(view.view(2).parent(), Some(view.id()));
  }

  #[test]
  fn test_view_at_point() {
    let doc = DocumentContent::new("");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = fixed_box(Axis::X, &[10.0, 20.0, 30.0]);
    let alloc = Rect::new(0, 0, 60, 10);
    assert_eq!(view.view_at_point(-5, 0, alloc, &cx).map(|(i, _)| i), Some(0));
    assert_eq!(view.view_at_point(15, 0, alloc, &cx), Some((1, Rect::new(10, 0, 20, 10))));
    assert_eq!(view.view_at_point(100, 0, alloc, &cx).map(|(i, _)| i), Some(2));
  }

  #[test]
  fn test_view_index_at_position() {
    let doc = DocumentContent::new("");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let view = fixed_box(Axis::X, &[10.0, 20.0]);
    assert_eq!(view.view_index_at_position(10, Bias::Forward, &cx), Some(1));
    assert_eq!(view.view_index_at_position(10, Bias::Backward, &cx), Some(0));
    assert_eq!(view.view_index_at_position(20, Bias::Forward, &cx), None);
  }

  #[test]
  fn test_model_to_view() {
    let doc = DocumentContent::new("");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = fixed_box(Axis::X, &[10.0, 20.0]);
    let alloc = Rect::new(0, 0, 30, 10);
    assert_eq!(view.model_to_view(12, alloc, Bias::Forward, &cx).unwrap(), Rect::new(12, 0, 0, 10));
    // The end of the first child belongs to the second one going forward.
    assert_eq!(view.model_to_view(10, alloc, Bias::Forward, &cx).unwrap(), Rect::new(10, 0, 0, 10));
    assert_eq!(view.model_to_view(10, alloc, Bias::Backward, &cx).unwrap(), Rect::new(10, 0, 0, 10));
    assert!(matches!(
      view.model_to_view(0, alloc, Bias::Backward, &cx),
      Err(LayoutError::BadLocation { offset: 0 })
    ));
    assert!(view.model_to_view(25, alloc, Bias::Forward, &cx).is_err());
  }

  #[test]
  fn test_view_to_model() {
    let doc = DocumentContent::new("");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = fixed_box(Axis::X, &[10.0, 20.0]);
    let alloc = Rect::new(0, 0, 30, 10);
    assert_eq!(view.view_to_model(-3.0, 5.0, alloc, &cx), (0, Bias::Forward));
    assert_eq!(view.view_to_model(14.0, 5.0, alloc, &cx), (14, Bias::Forward));
    assert_eq!(view.view_to_model(40.0, 5.0, alloc, &cx), (19, Bias::Forward));
  }

  #[test]
  fn test_paint_skips_children_outside_clip() {
    let doc = DocumentContent::new("");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let mut view = fixed_box(Axis::Y, &[10.0, 10.0, 10.0]);
    let mut surface = crate::surface::RecordingSurface::new(Rect::new(0, 12, 10, 5));
    view.paint(&mut surface, Rect::new(0, 0, 10, 30), &cx);
    assert_eq!(surface.line(10.0 + 8.0), "10");
    assert_eq!(surface.runs.len(), 1);
  }

  #[test]
  fn test_from_element_builds_paragraphs() {
    let doc = DocumentContent::new("a\nb\nc");
    let env = test_util::env();
    let cx = LayoutCx::new(&doc, &env);
    let view = <BoxView>::from_element(doc.root(), &cx).unwrap();
    assert_eq!(view.view_count(), 3);
    assert_eq!(view.view(1).range(&cx), 2..4);
    assert_eq!(view.view(1).parent(), Some(view.id()));
  }
}
