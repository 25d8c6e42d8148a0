//! Rows: one line of a paragraph, aligning its glyph runs on a common
//! baseline and optionally justifying them to the full width.

use tracing::trace;

use crate::{
  geometry::Axis,
  requirements::{
    self,
    SizeRequirements,
    UNBOUNDED,
  },
  view::{
    LayoutCx,
    View,
    box_view::{
      BoxLayout,
      BoxView,
      child_requirements,
    },
    glyph::GlyphRunView,
    measure::Justification,
  },
};

pub type RowView = BoxView<RowLayout, GlyphRunView>;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RowLayout {
  /// Where the row sits inside the paragraph when narrower than it.
  pub alignment: f32,
  /// Stretch the spaces of the row to fill the allocated width.
  pub justify:   bool,
  /// The row ends at a mandatory break.
  pub forced:    bool,
}

impl RowLayout {
  pub fn new(alignment: f32) -> Self {
    Self {
      alignment,
      ..Self::default()
    }
  }
}

fn clear_justification(children: &mut [Box<GlyphRunView>]) {
  for child in children {
    if child.justification().is_some() {
      child.set_justification(None);
    }
  }
}

impl BoxLayout<GlyphRunView> for RowLayout {
  fn major_requirements(
    &mut self,
    axis: Axis,
    children: &mut [Box<GlyphRunView>],
    cx: &LayoutCx<'_>,
  ) -> SizeRequirements {
    clear_justification(children);
    let mut request = requirements::tiled(&child_requirements(children, axis, cx));
    request.alignment = self.alignment;
    if self.justify {
      request.maximum = UNBOUNDED;
    }
    request
  }

  fn minor_requirements(
    &mut self,
    axis: Axis,
    children: &mut [Box<GlyphRunView>],
    cx: &LayoutCx<'_>,
  ) -> SizeRequirements {
    requirements::baseline_requirements(&child_requirements(children, axis, cx))
  }

  fn layout_major(
    &mut self,
    target: i32,
    axis: Axis,
    children: &mut [Box<GlyphRunView>],
    offsets: &mut [i32],
    spans: &mut [i32],
    cx: &LayoutCx<'_>,
  ) {
    clear_justification(children);
    requirements::tile(target, &child_requirements(children, axis, cx), offsets, spans);
    if !self.justify {
      return;
    }

    let current: i64 = spans.iter().map(|span| *span as i64).sum();
    if current >= target as i64 {
      return;
    }
    let Some(justification) = justification_plan(children, (target as i64 - current) as i32, cx) else {
      return;
    };
    trace!(target, current, addon = justification.space_addon, "justifying row");
    for child in children.iter_mut() {
      child.set_justification(Some(justification));
    }
    requirements::tile(target, &child_requirements(children, axis, cx), offsets, spans);
  }

  fn layout_minor(
    &mut self,
    target: i32,
    axis: Axis,
    children: &mut [Box<GlyphRunView>],
    offsets: &mut [i32],
    spans: &mut [i32],
    cx: &LayoutCx<'_>,
  ) {
    let children = child_requirements(children, axis, cx);
    let alignment = requirements::baseline_requirements(&children).alignment;
    requirements::baseline_layout(target, alignment, &children, offsets, spans);
  }
}

/// Spread `adjustment` over the spaces between the first and the last
/// content character of the row, right of its last tab.
fn justification_plan(
  children: &mut [Box<GlyphRunView>],
  adjustment: i32,
  cx: &LayoutCx<'_>,
) -> Option<Justification> {
  let row_start = children.first()?.start_offset(cx);
  let row_end = children.last()?.end_offset(cx);
  let mut space_map = vec![false; row_end.saturating_sub(row_start)];

  let mut extendable = 0usize;
  // Spaces left of the leftmost content seen so far. They only count once
  // more content shows up further left.
  let mut pending = 0usize;
  let mut start = None;
  let mut end = None;

  for child in children.iter_mut().rev() {
    let info = child.justification_info(cx);
    for offset in &info.spaces {
      space_map[offset - row_start] = true;
    }
    if info.start.is_some() {
      if end.is_none() {
        end = info.end;
      } else {
        extendable += pending + info.trailing_spaces;
      }
      extendable += info.content_spaces;
      pending = info.leading_spaces;
      start = info.start;
    } else if end.is_some() {
      pending += info.trailing_spaces;
    }
    if info.has_tab {
      break;
    }
  }

  let (start, end) = (start?, end?);
  if extendable == 0 {
    return None;
  }
  let extendable = extendable as i32;
  let space_addon = adjustment / extendable;
  let mut leftover = adjustment - space_addon * extendable;
  let mut space_addon_leftover_end = None;
  let mut offset = start;
  while leftover > 0 && offset < row_end {
    space_addon_leftover_end = Some(offset);
    if space_map[offset - row_start] {
      leftover -= 1;
    }
    offset += 1;
  }

  if space_addon == 0 && space_addon_leftover_end.is_none() {
    return None;
  }
  Some(Justification {
    space_addon,
    space_addon_leftover_end,
    start_justifiable: start,
    end_justifiable: end,
  })
}
