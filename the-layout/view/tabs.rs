//! Tab stops and tab expansion.

use serde::{
  Deserialize,
  Serialize,
};
use tracing::warn;

/// Resolves where a tab character ends.
pub trait TabExpander {
  /// Position the tab at model offset `tab_offset` advances to, when it
  /// starts at `x`.
  fn next_tab_stop(&self, x: f32, tab_offset: usize) -> f32;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TabAlign {
  #[default]
  Left,
  Right,
  Center,
  /// Aligns the first `.` or tab following the stop.
  Decimal,
  Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TabStop {
  pub position: f32,
  #[serde(default)]
  pub align:    TabAlign,
}

impl TabStop {
  pub const fn new(position: f32, align: TabAlign) -> Self {
    Self { position, align }
  }
}

/// Explicit tab stops, ordered by position.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TabSet {
  stops: Vec<TabStop>,
}

impl TabSet {
  pub fn new(mut stops: Vec<TabStop>) -> Self {
    if !stops.is_sorted_by(|a, b| a.position <= b.position) {
      warn!(count = stops.len(), "tab stops are not ordered by position, sorting");
      stops.sort_by(|a, b| a.position.total_cmp(&b.position));
    }
    Self { stops }
  }

  pub fn is_empty(&self) -> bool {
    self.stops.is_empty()
  }

  pub fn stops(&self) -> &[TabStop] {
    &self.stops
  }

  /// First stop strictly after `x`.
  pub fn tab_after(&self, x: f32) -> Option<&TabStop> {
    let index = self.stops.partition_point(|stop| stop.position <= x);
    self.stops.get(index)
  }
}

/// Implicit stops every `pitch` units, counted from `base`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPitch {
  pub base:  f32,
  pub pitch: f32,
}

impl FixedPitch {
  pub fn new(pitch: f32) -> Self {
    Self { base: 0.0, pitch }
  }
}

impl TabExpander for FixedPitch {
  fn next_tab_stop(&self, x: f32, _tab_offset: usize) -> f32 {
    let steps = ((x - self.base) / self.pitch).max(0.0) as i32 + 1;
    self.base + steps as f32 * self.pitch
  }
}

/// Tabs whose advances were fixed when a run was placed on a row, keyed by
/// offset relative to the run's element. Unknown tabs fall back to `pitch`.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedTabs<'a> {
  pub origin:   usize,
  pub advances: &'a [(usize, f32)],
  pub fallback: FixedPitch,
}

impl TabExpander for ResolvedTabs<'_> {
  fn next_tab_stop(&self, x: f32, tab_offset: usize) -> f32 {
    let relative = tab_offset.wrapping_sub(self.origin);
    match self.advances.iter().find(|(offset, _)| *offset == relative) {
      Some((_, advance)) => x + advance,
      None => self.fallback.next_tab_stop(x, tab_offset),
    }
  }
}
