//! Paint targets.

use crate::geometry::Rect;

/// Something views paint text onto.
pub trait Surface {
  /// Area that needs painting. Views outside of it are skipped.
  fn clip(&self) -> Rect;

  fn draw_text(&mut self, text: &str, x: f32, baseline: f32, scale: f32);
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawnText {
  pub text:     String,
  pub x:        f32,
  pub baseline: f32,
  pub scale:    f32,
}

/// Keeps every draw call, for tests and headless hosts.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
  pub clip: Rect,
  pub runs: Vec<DrawnText>,
}

impl RecordingSurface {
  pub fn new(clip: Rect) -> Self {
    Self {
      clip,
      runs: Vec::new(),
    }
  }

  /// Everything drawn on the given baseline, left to right.
  pub fn line(&self, baseline: f32) -> String {
    let mut runs: Vec<&DrawnText> = self.runs.iter().filter(|run| run.baseline == baseline).collect();
    runs.sort_by(|a, b| a.x.total_cmp(&b.x));
    runs.iter().map(|run| run.text.as_str()).collect()
  }
}

impl Surface for RecordingSurface {
  fn clip(&self) -> Rect {
    self.clip
  }

  fn draw_text(&mut self, text: &str, x: f32, baseline: f32, scale: f32) {
    self.runs.push(DrawnText {
      text: text.to_string(),
      x,
      baseline,
      scale,
    });
  }
}
