//! Layout configuration, read from TOML.
//!
//! ```toml
//! tab-pitch = 64.0
//! justify = "justified"
//! break-mode = "unicode"
//! tab-stops = [{ position = 40.0, align = "decimal" }]
//!
//! [metrics]
//! cell-width = 8.0
//! ascent = 12.0
//! descent = 4.0
//! ```

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

use crate::{
  geometry::Insets,
  view::tabs::{
    TabSet,
    TabStop,
  },
};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to parse layout config: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("tab pitch must be positive, got {0}")]
  TabPitch(f32),
  #[error("cell metrics must be positive")]
  Metrics,
}

/// Horizontal placement of the rows of a paragraph.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Justify {
  #[default]
  Left,
  Center,
  Right,
  Justified,
}

impl Justify {
  /// Alignment of a row inside its paragraph.
  pub fn row_alignment(self) -> f32 {
    match self {
      Self::Left | Self::Justified => 0.0,
      Self::Center => 0.5,
      Self::Right => 1.0,
    }
  }
}

/// Which break iterator glyph runs consult.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakMode {
  #[default]
  Whitespace,
  Unicode,
}

/// Metrics of the built-in cell measurer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CellMetrics {
  pub cell_width: f32,
  pub ascent:     f32,
  pub descent:    f32,
}

impl Default for CellMetrics {
  fn default() -> Self {
    Self {
      cell_width: 8.0,
      ascent:     12.0,
      descent:    4.0,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct LayoutConfig {
  /// Distance between implicit tab stops.
  pub tab_pitch:          f32,
  pub tab_stops:          Vec<TabStop>,
  pub justify:            Justify,
  pub first_line_indent:  i32,
  /// Insets of every paragraph.
  pub insets:             Insets,
  pub break_mode:         BreakMode,
  /// Worker threads of a [`crate::queue::LayoutQueue`].
  pub layout_workers:     usize,
  /// Async boxes with at least this many children start with an estimated
  /// major span.
  pub estimate_threshold: usize,
  pub metrics:            CellMetrics,
}

impl Default for LayoutConfig {
  fn default() -> Self {
    Self {
      tab_pitch:          72.0,
      tab_stops:          Vec::new(),
      justify:            Justify::Left,
      first_line_indent:  0,
      insets:             Insets::default(),
      break_mode:         BreakMode::Whitespace,
      layout_workers:     1,
      estimate_threshold: 2000,
      metrics:            CellMetrics::default(),
    }
  }
}

impl LayoutConfig {
  pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
    let config: Self = toml::from_str(source)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(self.tab_pitch > 0.0) {
      return Err(ConfigError::TabPitch(self.tab_pitch));
    }
    let metrics = &self.metrics;
    if !(metrics.cell_width > 0.0) || metrics.ascent < 0.0 || metrics.descent < 0.0 {
      return Err(ConfigError::Metrics);
    }
    Ok(())
  }

  pub fn tab_set(&self) -> TabSet {
    TabSet::new(self.tab_stops.clone())
  }
}
