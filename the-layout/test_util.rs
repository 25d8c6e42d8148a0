use std::{
  ops::Range,
  sync::{
    Arc,
    atomic::{
      AtomicUsize,
      Ordering,
    },
  },
};

use parking_lot::Mutex;

use crate::{
  LayoutError,
  Result,
  config::{
    CellMetrics,
    LayoutConfig,
  },
  document::{
    DocumentContent,
    ElementId,
  },
  geometry::{
    Axis,
    Bias,
    Rect,
  },
  requirements::SizeRequirements,
  surface::Surface,
  view::{
    Breakable,
    FromElement,
    LayoutCx,
    LayoutHost,
    ModelMapped,
    Paintable,
    PreferenceChange,
    Sizable,
    View,
    ViewEnv,
    ViewId,
  },
};

/// Ten units per cell, eight above the baseline and two below.
pub fn metrics() -> CellMetrics {
  CellMetrics {
    cell_width: 10.0,
    ascent:     8.0,
    descent:    2.0,
  }
}

pub fn config() -> LayoutConfig {
  LayoutConfig {
    tab_pitch: 80.0,
    metrics: metrics(),
    ..LayoutConfig::default()
  }
}

pub fn env() -> ViewEnv {
  ViewEnv::new(config())
}

pub fn env_with(config: LayoutConfig) -> ViewEnv {
  ViewEnv::new(LayoutConfig {
    metrics: metrics(),
    ..config
  })
}

/// Every run of the document, in order.
pub fn runs(doc: &DocumentContent) -> Vec<ElementId> {
  doc
    .element(doc.root())
    .children()
    .iter()
    .flat_map(|paragraph| doc.element(*paragraph).children().iter().copied())
    .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

/// A span that can be changed while the view holding it is owned elsewhere.
#[derive(Debug, Clone, Default)]
pub struct SharedSpan(Arc<Mutex<f32>>);

impl SharedSpan {
  pub fn new(span: f32) -> Self {
    Self(Arc::new(Mutex::new(span)))
  }

  pub fn get(&self) -> f32 {
    *self.0.lock()
  }

  pub fn set(&self, span: f32) {
    *self.0.lock() = span;
  }
}

impl Counter {
  pub fn bump(&self) {
    self.0.fetch_add(1, Ordering::SeqCst);
  }

  pub fn get(&self) -> usize {
    self.0.load(Ordering::SeqCst)
  }
}

/// Leaf of a fixed size over a fixed model range. Counts how often its
/// requirements are asked for and how often it is sized.
#[derive(Debug)]
pub struct FixedView {
  id:       ViewId,
  parent:   Option<ViewId>,
  range:    Range<usize>,
  width:    f32,
  height:   SharedSpan,
  requests: Counter,
  sizes:    Counter,
  open_end: bool,
}

impl FixedView {
  pub fn new(range: Range<usize>, width: f32, height: f32) -> Self {
    Self {
      id: ViewId::next(),
      parent: None,
      range,
      width,
      height: SharedSpan::new(height),
      requests: Counter::default(),
      sizes: Counter::default(),
      open_end: false,
    }
  }

  /// Refuse to map the end offset, leaving it to the next view.
  pub fn with_open_end(mut self) -> Self {
    self.open_end = true;
    self
  }

  pub fn calls(&self) -> Counter {
    self.requests.clone()
  }

  pub fn sizes(&self) -> Counter {
    self.sizes.clone()
  }

  pub fn height(&self) -> SharedSpan {
    self.height.clone()
  }
}

impl Sizable for FixedView {
  fn preferred_span(&mut self, axis: Axis, _cx: &LayoutCx<'_>) -> f32 {
    match axis {
      Axis::X => self.width,
      Axis::Y => self.height.get(),
    }
  }

  fn requirements(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> SizeRequirements {
    self.requests.bump();
    SizeRequirements::fixed(self.preferred_span(axis, cx), 0.5)
  }

  fn set_size(&mut self, _width: f32, _height: f32, _cx: &LayoutCx<'_>) -> PreferenceChange {
    self.sizes.bump();
    PreferenceChange::NONE
  }
}

impl Breakable for FixedView {}

impl Paintable for FixedView {
  fn paint(&mut self, surface: &mut dyn Surface, alloc: Rect, _cx: &LayoutCx<'_>) {
    surface.draw_text(&self.range.start.to_string(), alloc.x as f32, alloc.y as f32 + 8.0, 1.0);
  }
}

impl ModelMapped for FixedView {
  fn model_to_view(&mut self, pos: usize, alloc: Rect, _bias: Bias, _cx: &LayoutCx<'_>) -> Result<Rect> {
    if pos < self.range.start || pos > self.range.end || (self.open_end && pos == self.range.end) {
      return Err(LayoutError::BadLocation { offset: pos });
    }
    Ok(Rect::new(alloc.x + (pos - self.range.start) as i32, alloc.y, 0, alloc.height))
  }

  fn view_to_model(&mut self, x: f32, _y: f32, alloc: Rect, _cx: &LayoutCx<'_>) -> (usize, Bias) {
    let offset = (x as i32 - alloc.x).clamp(0, self.range.len() as i32) as usize;
    (self.range.start + offset, Bias::Forward)
  }
}

impl View for FixedView {
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
    None
  }

  fn start_offset(&self, _cx: &LayoutCx<'_>) -> usize {
    self.range.start
  }

  fn end_offset(&self, _cx: &LayoutCx<'_>) -> usize {
    self.range.end
  }
}

impl FromElement for FixedView {
  fn from_element(_element: ElementId, _cx: &LayoutCx<'_>) -> Option<Box<Self>> {
    None
  }
}

/// Host recording every preference change it is told about.
#[derive(Debug, Default)]
pub struct RecordingHost {
  changes:  Mutex<Vec<(bool, bool)>>,
  repaints: Counter,
}

impl RecordingHost {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn changes(&self) -> Vec<(bool, bool)> {
    self.changes.lock().clone()
  }

  pub fn repaints(&self) -> usize {
    self.repaints.get()
  }
}

impl LayoutHost for RecordingHost {
  fn preference_changed(&self, width: bool, height: bool) {
    self.changes.lock().push((width, height));
  }

  fn repaint(&self) {
    self.repaints.bump();
  }
}
