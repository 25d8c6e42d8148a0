//! The view tree.
//!
//! Views are split by capability: [`Sizable`] answers span queries and
//! accepts an allocation, [`Breakable`] lets flows wrap a view, [`Paintable`]
//! renders it and [`ModelMapped`] converts between model offsets and
//! positions. [`View`] ties them together with the tree links every node
//! carries: its own id, a non owning parent id and the element it presents.
//!
//! Parents own their children outright. A child only knows the [`ViewId`] of
//! its parent, and notifies it of preference changes through return values
//! rather than calling back up the tree.

use std::{
  fmt,
  num::NonZeroUsize,
  ops::{
    BitOr,
    BitOrAssign,
    Range,
  },
  sync::{
    Arc,
    atomic::{
      AtomicUsize,
      Ordering,
    },
  },
};

use the_core::breaks::{
  BreakIterator,
  UnicodeBreaker,
  WhitespaceBreaker,
};

use crate::{
  Result,
  config::{
    BreakMode,
    LayoutConfig,
  },
  document::{
    DocumentContent,
    DocumentEvent,
    ElementId,
    EventKind,
  },
  geometry::{
    Axis,
    Bias,
    Rect,
  },
  requirements::{
    SizeRequirements,
    UNBOUNDED,
  },
  surface::Surface,
  view::{
    factory::{
      DefaultViewFactory,
      ViewFactory,
    },
    measure::MeasurerFactory,
    tabs::TabSet,
  },
};

pub mod async_box;
pub mod box_view;
pub mod factory;
pub mod glyph;
pub mod measure;
pub mod paragraph;
pub mod row;
pub mod tabs;

pub use async_box::AsyncBoxView;
pub use box_view::{
  BoxLayout,
  BoxView,
  Tiled,
};
pub use glyph::GlyphRunView;
pub use paragraph::ParagraphView;
pub use row::{
  RowLayout,
  RowView,
};

/// Process wide unique identifier of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(NonZeroUsize);

impl ViewId {
  pub fn next() -> Self {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    Self(NonZeroUsize::MIN.saturating_add(NEXT.fetch_add(1, Ordering::Relaxed)))
  }

  pub fn get(self) -> usize {
    self.0.get()
  }
}

/// Axes along which a view's preferences changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PreferenceChange {
  pub width:  bool,
  pub height: bool,
}

impl PreferenceChange {
  pub const NONE: Self = Self {
    width:  false,
    height: false,
  };
  pub const BOTH: Self = Self {
    width:  true,
    height: true,
  };

  pub fn along(axis: Axis) -> Self {
    match axis {
      Axis::X => {
        Self {
          width:  true,
          height: false,
        }
      },
      Axis::Y => {
        Self {
          width:  false,
          height: true,
        }
      },
    }
  }

  pub fn affects(self, axis: Axis) -> bool {
    match axis {
      Axis::X => self.width,
      Axis::Y => self.height,
    }
  }

  pub fn is_none(self) -> bool {
    !self.width && !self.height
  }
}

impl BitOr for PreferenceChange {
  type Output = Self;

  fn bitor(self, rhs: Self) -> Self {
    Self {
      width:  self.width || rhs.width,
      height: self.height || rhs.height,
    }
  }
}

impl BitOrAssign for PreferenceChange {
  fn bitor_assign(&mut self, rhs: Self) {
    *self = *self | rhs;
  }
}

/// How attractive it is to break a view at a given place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BreakWeight {
  Bad,
  Good,
  Excellent,
  /// The line has to end here.
  Forced,
}

/// Everything views share while laying out: the document content, read
/// under its lock for the duration of the pass, and the environment.
#[derive(Clone, Copy)]
pub struct LayoutCx<'a> {
  pub doc: &'a DocumentContent,
  pub env: &'a ViewEnv,
}

impl<'a> LayoutCx<'a> {
  pub fn new(doc: &'a DocumentContent, env: &'a ViewEnv) -> Self {
    Self { doc, env }
  }
}

/// Configuration and collaborators of a view tree.
#[derive(Debug)]
pub struct ViewEnv {
  config:    LayoutConfig,
  tab_set:   TabSet,
  measurers: Arc<dyn MeasurerFactory>,
  factory:   Arc<dyn ViewFactory>,
  breaker:   Arc<dyn BreakIterator>,
}

impl ViewEnv {
  pub fn new(config: LayoutConfig) -> Self {
    let breaker: Arc<dyn BreakIterator> = match config.break_mode {
      BreakMode::Whitespace => Arc::new(WhitespaceBreaker),
      BreakMode::Unicode => Arc::new(UnicodeBreaker),
    };
    Self {
      tab_set: config.tab_set(),
      measurers: Arc::new(config.metrics),
      factory: Arc::new(DefaultViewFactory),
      breaker,
      config,
    }
  }

  pub fn with_measurers(mut self, measurers: Arc<dyn MeasurerFactory>) -> Self {
    self.measurers = measurers;
    self
  }

  pub fn with_factory(mut self, factory: Arc<dyn ViewFactory>) -> Self {
    self.factory = factory;
    self
  }

  pub fn with_breaker(mut self, breaker: Arc<dyn BreakIterator>) -> Self {
    self.breaker = breaker;
    self
  }

  pub fn config(&self) -> &LayoutConfig {
    &self.config
  }

  pub fn tab_set(&self) -> &TabSet {
    &self.tab_set
  }

  pub fn measurers(&self) -> &dyn MeasurerFactory {
    &*self.measurers
  }

  pub fn factory(&self) -> &dyn ViewFactory {
    &*self.factory
  }

  pub fn breaker(&self) -> &dyn BreakIterator {
    &*self.breaker
  }
}

pub trait Sizable {
  fn preferred_span(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> f32;

  fn minimum_span(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> f32 {
    if self.resize_weight(axis, cx) == 0 {
      self.preferred_span(axis, cx)
    } else {
      0.0
    }
  }

  fn maximum_span(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> f32 {
    if self.resize_weight(axis, cx) == 0 {
      self.preferred_span(axis, cx)
    } else {
      UNBOUNDED
    }
  }

  fn alignment(&mut self, _axis: Axis, _cx: &LayoutCx<'_>) -> f32 {
    0.5
  }

  fn resize_weight(&mut self, _axis: Axis, _cx: &LayoutCx<'_>) -> i32 {
    0
  }

  fn requirements(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> SizeRequirements {
    SizeRequirements::new(
      self.minimum_span(axis, cx),
      self.preferred_span(axis, cx),
      self.maximum_span(axis, cx),
      self.alignment(axis, cx),
    )
  }

  /// Allocate a size. Returns the axes along which the view's own
  /// preferences changed as a consequence, for the parent to invalidate.
  fn set_size(&mut self, width: f32, height: f32, cx: &LayoutCx<'_>) -> PreferenceChange;
}

pub trait Breakable: Sizable {
  /// Weight of breaking this view when it starts at `pos` and `len` is left
  /// on the line.
  fn break_weight(&mut self, axis: Axis, _pos: f32, len: f32, cx: &LayoutCx<'_>) -> BreakWeight {
    if len > self.preferred_span(axis, cx) {
      BreakWeight::Good
    } else {
      BreakWeight::Bad
    }
  }

  /// Break the view starting at model `offset`. `None` means the whole view
  /// is used.
  fn break_view(
    &mut self,
    _axis: Axis,
    _offset: usize,
    _pos: f32,
    _len: f32,
    _cx: &LayoutCx<'_>,
  ) -> Option<Self>
  where
    Self: Sized,
  {
    None
  }

  /// A view over part of this one. `None` if the view can't be split.
  fn create_fragment(&self, _p0: usize, _p1: usize, _cx: &LayoutCx<'_>) -> Option<Self>
  where
    Self: Sized,
  {
    None
  }
}

pub trait Paintable {
  fn paint(&mut self, surface: &mut dyn Surface, alloc: Rect, cx: &LayoutCx<'_>);
}

pub trait ModelMapped {
  fn model_to_view(&mut self, pos: usize, alloc: Rect, bias: Bias, cx: &LayoutCx<'_>) -> Result<Rect>;

  fn view_to_model(&mut self, x: f32, y: f32, alloc: Rect, cx: &LayoutCx<'_>) -> (usize, Bias);
}

pub trait View: Sizable + Breakable + Paintable + ModelMapped + Send + fmt::Debug {
  fn id(&self) -> ViewId;

  fn parent(&self) -> Option<ViewId>;

  /// Link or unlink the view. Unlinking also unlinks the view's children.
  fn set_parent(&mut self, parent: Option<ViewId>);

  fn element(&self) -> Option<ElementId>;

  fn start_offset(&self, cx: &LayoutCx<'_>) -> usize;

  fn end_offset(&self, cx: &LayoutCx<'_>) -> usize;

  fn range(&self, cx: &LayoutCx<'_>) -> Range<usize> {
    self.start_offset(cx)..self.end_offset(cx)
  }

  fn insert_update(&mut self, _event: &DocumentEvent, _cx: &LayoutCx<'_>) -> PreferenceChange {
    PreferenceChange::NONE
  }

  fn remove_update(&mut self, _event: &DocumentEvent, _cx: &LayoutCx<'_>) -> PreferenceChange {
    PreferenceChange::NONE
  }

  fn changed_update(&mut self, _event: &DocumentEvent, _cx: &LayoutCx<'_>) -> PreferenceChange {
    PreferenceChange::NONE
  }
}

/// Route `event` to the update hook matching its kind.
pub fn dispatch_update<V: View + ?Sized>(view: &mut V, event: &DocumentEvent, cx: &LayoutCx<'_>) -> PreferenceChange {
  match event.kind {
    EventKind::Insert => view.insert_update(event, cx),
    EventKind::Remove => view.remove_update(event, cx),
    EventKind::Change => view.changed_update(event, cx),
  }
}

/// Views a composite can create for the elements it gains.
pub trait FromElement {
  fn from_element(element: ElementId, cx: &LayoutCx<'_>) -> Option<Box<Self>>;
}

impl FromElement for dyn View {
  fn from_element(element: ElementId, cx: &LayoutCx<'_>) -> Option<Box<Self>> {
    Some(cx.env.factory().create(element, cx))
  }
}

/// Receives the preference changes published by the root of a view tree,
/// possibly from a layout worker.
pub trait LayoutHost: Send + Sync {
  fn preference_changed(&self, width: bool, height: bool);

  fn repaint(&self);
}

/// Children an edit has to be forwarded to, given the model ranges of all
/// children and the indices of the ones just created for it.
pub(crate) fn update_targets(
  ranges: &[Range<usize>],
  event: &DocumentEvent,
  added: Option<Range<usize>>,
) -> Vec<usize> {
  if ranges.is_empty() {
    return Vec::new();
  }
  let last = ranges.len() - 1;
  let index_at = |pos: usize| ranges.partition_point(|range| range.end <= pos).min(last);

  let pos = event.offset;
  let mut lo = index_at(pos);
  // An edit on a boundary concerns the child before it too.
  if lo > 0 && pos > 0 && ranges[lo].start == pos {
    lo -= 1;
  }
  let hi = match event.kind {
    EventKind::Remove => index_at(pos),
    EventKind::Insert | EventKind::Change => index_at(pos + event.len),
  };

  (lo..=hi.max(lo))
    .filter(|index| added.as_ref().is_none_or(|added| !added.contains(index)))
    .collect()
}
