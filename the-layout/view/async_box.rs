//! A box measuring its children on a task queue.
//!
//! Every child is wrapped in a [`ChildState`] caching its requirements. The
//! caches are refreshed by layout tasks, and the box publishes the sum of
//! them to its [`LayoutHost`] from a trailing flush task. Queries from the
//! interactive thread only ever read the caches, so they never wait for a
//! child to be measured.
//!
//! Locks are taken in this order, and never the other way around:
//! document, locator, box state, child list, child geometry. The box state
//! lock is never held while the host is notified.

use std::{
  fmt,
  sync::{
    Arc,
    Weak,
    atomic::{
      AtomicBool,
      AtomicUsize,
      Ordering,
    },
  },
};

use parking_lot::{
  Mutex,
  RwLock,
};
use tracing::{
  debug,
  trace,
};

use crate::{
  LayoutError,
  Result,
  document::{
    Document,
    DocumentEvent,
    ElementId,
  },
  geometry::{
    Axis,
    Bias,
    Insets,
    Rect,
  },
  queue::{
    LayoutTask,
    TaskQueue,
  },
  requirements::{
    SizeRequirements,
    UNBOUNDED,
  },
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
    dispatch_update,
    update_targets,
  },
};

/// Offset and span along the minor axis of a child with `request` in a box
/// `target` wide.
fn minor_placement(request: &SizeRequirements, target: f32) -> (f32, f32) {
  if request.maximum < target {
    ((target - request.maximum) * request.alignment, request.maximum)
  } else {
    (0.0, request.minimum.max(target))
  }
}

#[derive(Debug)]
struct ChildGeometry {
  view:   Box<dyn View>,
  minor:  SizeRequirements,
  major:  f32,
  /// Offset along the major axis, relative to the box content. Only
  /// meaningful for children the locator confirmed.
  offset: f32,
}

/// Cached layout of one child of an [`AsyncBoxView`], and the task
/// refreshing it.
pub struct ChildState {
  owner:       Weak<Shared>,
  /// Position in the child list, kept current by `replace`.
  index:       AtomicUsize,
  minor_valid: AtomicBool,
  major_valid: AtomicBool,
  size_valid:  AtomicBool,
  geometry:    Mutex<ChildGeometry>,
}

impl ChildState {
  fn new(owner: Weak<Shared>, index: usize, view: Box<dyn View>) -> Self {
    Self {
      owner,
      index: AtomicUsize::new(index),
      minor_valid: AtomicBool::new(false),
      major_valid: AtomicBool::new(false),
      size_valid: AtomicBool::new(false),
      geometry: Mutex::new(ChildGeometry {
        view,
        minor: SizeRequirements::default(),
        major: 0.0,
        offset: 0.0,
      }),
    }
  }

  pub fn is_layout_valid(&self) -> bool {
    self.minor_valid.load(Ordering::Acquire)
      && self.major_valid.load(Ordering::Acquire)
      && self.size_valid.load(Ordering::Acquire)
  }

  pub fn major_span(&self) -> f32 {
    self.geometry.lock().major
  }

  pub fn minor_requirements(&self) -> SizeRequirements {
    self.geometry.lock().minor
  }

  fn preference_changed(&self, axis: Axis, change: PreferenceChange) {
    if change.affects(axis) {
      self.major_valid.store(false, Ordering::Release);
    }
    if change.affects(axis.other()) {
      self.minor_valid.store(false, Ordering::Release);
    }
    if !change.is_none() {
      self.size_valid.store(false, Ordering::Release);
    }
  }

  /// Refresh whatever is stale, one phase at a time. A flag is set before
  /// its phase queries the child, so an invalidation arriving meanwhile
  /// leaves it cleared.
  fn update_child(self: &Arc<Self>, shared: &Shared, cx: &LayoutCx<'_>) {
    let major_axis = shared.axis;
    let minor_axis = major_axis.other();

    let minor_changed = {
      let mut geometry = self.geometry.lock();
      if self.minor_valid.swap(true, Ordering::AcqRel) {
        false
      } else {
        let request = geometry.view.requirements(minor_axis, cx);
        let changed = request != geometry.minor;
        geometry.minor = request;
        changed
      }
    };
    if minor_changed {
      shared.minor_requirement_change();
    }

    let delta = {
      let mut geometry = self.geometry.lock();
      if self.major_valid.swap(true, Ordering::AcqRel) {
        0.0
      } else {
        let span = geometry.view.preferred_span(major_axis, cx);
        let delta = span - geometry.major;
        geometry.major = span;
        delta
      }
    };
    if delta != 0.0 {
      shared.major_requirement_change(delta);
      shared.child_offset_changed(self);
    }

    let minor_span = shared.state.lock().minor_span;
    let mut geometry = self.geometry.lock();
    if !self.size_valid.swap(true, Ordering::AcqRel) {
      let (_, minor) = minor_placement(&geometry.minor, minor_span);
      let (width, height) = match major_axis {
        Axis::X => (geometry.major, minor),
        Axis::Y => (minor, geometry.major),
      };
      let change = geometry.view.set_size(width, height, cx);
      // Picked up by the next pass of the running task.
      self.preference_changed(major_axis, change);
    }
  }
}

impl LayoutTask for ChildState {
  fn run(self: Arc<Self>) {
    let Some(shared) = self.owner.upgrade() else {
      return;
    };
    let doc = shared.document.read();
    let cx = LayoutCx::new(&doc, &shared.env);
    if self.is_layout_valid() {
      return;
    }
    if self.geometry.lock().view.parent() != Some(shared.id) {
      trace!(view = shared.id.get(), "skipping detached child");
      return;
    }

    shared.state.lock().changing = Some(Arc::clone(&self));
    // Sizing along the minor axis may change the major preference.
    self.update_child(&shared, &cx);
    self.update_child(&shared, &cx);

    let requeue = {
      let mut state = shared.state.lock();
      if state.changing.as_ref().is_some_and(|child| Arc::ptr_eq(child, &self)) {
        state.changing = None;
      }
      !self.is_layout_valid()
    };
    drop(doc);
    if requeue {
      shared.enqueue_children([self]);
    }
  }
}

impl fmt::Debug for ChildState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ChildState")
      .field("minor_valid", &self.minor_valid)
      .field("major_valid", &self.major_valid)
      .field("size_valid", &self.size_valid)
      .finish_non_exhaustive()
  }
}

#[derive(Debug, Default)]
struct BoxState {
  insets:           Insets,
  /// Sum of the children's major spans, or a guess while `estimated`.
  major_span:       f32,
  /// Allocated span along the minor axis, inside the insets.
  minor_span:       f32,
  estimated:        bool,
  major_changed:    bool,
  minor_changed:    bool,
  minor_request:    SizeRequirements,
  /// Child whose task is running. Its preference changes are folded into
  /// that task.
  changing:         Option<Arc<ChildState>>,
  flush_queued:     bool,
  /// Generation of the latest flush enqueued.
  flush_generation: u64,
}

/// Maps visual offsets along the major axis to children, confirming child
/// offsets lazily from the front.
#[derive(Debug, Default)]
struct ChildLocator {
  /// Children before this index have accurate offsets.
  valid:      usize,
  last_alloc: Rect,
}

impl ChildLocator {
  fn child_changed(&mut self, index: usize) {
    self.valid = self.valid.min(index + 1);
  }

  fn confirmed_end(&self, children: &[Arc<ChildState>]) -> f32 {
    match self.valid.checked_sub(1) {
      Some(last) => {
        let geometry = children[last].geometry.lock();
        geometry.offset + geometry.major
      },
      None => 0.0,
    }
  }

  /// Confirm offsets up to and including child `index`.
  fn confirm_through(&mut self, children: &[Arc<ChildState>], index: usize) {
    let mut offset = self.confirmed_end(children);
    while self.valid <= index && self.valid < children.len() {
      let mut geometry = children[self.valid].geometry.lock();
      geometry.offset = offset;
      offset += geometry.major;
      self.valid += 1;
    }
  }

  fn index_at_visual_offset(&mut self, children: &[Arc<ChildState>], target: f32) -> Option<usize> {
    let last = children.len().checked_sub(1)?;
    if self.valid > 0 && target < self.confirmed_end(children) {
      let index = children[..self.valid].partition_point(|child| {
        let geometry = child.geometry.lock();
        geometry.offset + geometry.major <= target
      });
      return Some(index.min(last));
    }

    let mut offset = self.confirmed_end(children);
    while self.valid < children.len() {
      let index = self.valid;
      let end = {
        let mut geometry = children[index].geometry.lock();
        geometry.offset = offset;
        offset + geometry.major
      };
      self.valid += 1;
      if target < end {
        return Some(index);
      }
      offset = end;
    }
    Some(last)
  }

  fn child_rect(&mut self, children: &[Arc<ChildState>], index: usize, axis: Axis, inside: Rect) -> Rect {
    self.confirm_through(children, index);
    let geometry = children[index].geometry.lock();
    let minor_axis = axis.other();
    let (minor_offset, minor_span) = minor_placement(&geometry.minor, inside.span(minor_axis) as f32);
    let mut rect = Rect::default();
    rect.set_offset(axis, inside.offset(axis) + geometry.offset as i32);
    rect.set_span(axis, geometry.major as i32);
    rect.set_offset(minor_axis, inside.offset(minor_axis) + minor_offset as i32);
    rect.set_span(minor_axis, minor_span as i32);
    rect
  }
}

/// Publishes requirement changes. Only the most recently enqueued flush of a
/// box does anything, older ones sit in front of child tasks they would
/// miss.
struct FlushTask {
  owner:      Weak<Shared>,
  generation: u64,
}

impl LayoutTask for FlushTask {
  fn run(self: Arc<Self>) {
    if let Some(shared) = self.owner.upgrade() {
      shared.flush_requirement_changes(self.generation);
    }
  }
}

/// The part of the box reachable from layout tasks.
struct Shared {
  id:       ViewId,
  axis:     Axis,
  document: Arc<Document>,
  env:      Arc<ViewEnv>,
  queue:    Arc<dyn TaskQueue>,
  state:    Mutex<BoxState>,
  children: RwLock<Vec<Arc<ChildState>>>,
  locator:  Mutex<ChildLocator>,
  host:     RwLock<Option<Arc<dyn LayoutHost>>>,
  this:     Weak<Shared>,
}

impl Shared {
  fn enqueue_flush(&self, state: &mut BoxState) -> Arc<FlushTask> {
    state.flush_generation += 1;
    state.flush_queued = true;
    Arc::new(FlushTask {
      owner:      self.this.clone(),
      generation: state.flush_generation,
    })
  }

  /// Make sure a flush is pending. Used from child tasks, which always run
  /// ahead of the flush enqueued with them.
  fn schedule_flush(&self) {
    let flush = {
      let mut state = self.state.lock();
      if state.flush_queued {
        return;
      }
      self.enqueue_flush(&mut state)
    };
    self.queue.enqueue(flush);
  }

  /// Queue child tasks followed by a flush that supersedes any pending one.
  fn enqueue_children(&self, children: impl IntoIterator<Item = Arc<ChildState>>) {
    for child in children {
      self.queue.enqueue(child);
    }
    let flush = self.enqueue_flush(&mut self.state.lock());
    self.queue.enqueue(flush);
  }

  fn major_requirement_change(&self, delta: f32) {
    {
      let mut state = self.state.lock();
      if !state.estimated {
        state.major_span += delta;
      }
      state.major_changed = true;
    }
    self.schedule_flush();
  }

  fn minor_requirement_change(&self) {
    self.state.lock().minor_changed = true;
    self.schedule_flush();
  }

  fn child_offset_changed(&self, child: &Arc<ChildState>) {
    let index = {
      let children = self.children.read();
      let index = child.index.load(Ordering::Acquire);
      children
        .get(index)
        .is_some_and(|other| Arc::ptr_eq(other, child))
        .then_some(index)
    };
    if let Some(index) = index {
      self.locator.lock().child_changed(index);
    }
  }

  fn notify_host(&self, width: bool, height: bool) {
    let host = self.host.read().clone();
    if let Some(host) = host {
      host.preference_changed(width, height);
      host.repaint();
    }
  }

  /// Publish the requirement changes made by child tasks since the last
  /// flush.
  fn flush_requirement_changes(&self, generation: u64) {
    let doc = self.document.read();
    let (width, height) = {
      let mut state = self.state.lock();
      if state.flush_generation != generation {
        return;
      }
      state.flush_queued = false;
      if state.minor_changed || state.estimated {
        let children = self.children.read();
        let mut minimum = 0.0f32;
        let mut preferred = 0.0f32;
        let mut major = 0.0f32;
        for child in children.iter() {
          let geometry = child.geometry.lock();
          minimum = minimum.max(geometry.minor.minimum);
          preferred = preferred.max(geometry.minor.preferred);
          major += geometry.major;
        }
        state.minor_request = SizeRequirements::new(minimum, preferred, UNBOUNDED, 0.5);
        if state.estimated {
          state.estimated = false;
          state.major_span = major;
          state.major_changed = true;
        }
      }
      let (major, minor) = (state.major_changed, state.minor_changed);
      state.major_changed = false;
      state.minor_changed = false;
      match self.axis {
        Axis::X => (major, minor),
        Axis::Y => (minor, major),
      }
    };
    drop(doc);

    if width || height {
      debug!(view = self.id.get(), width, height, "publishing requirement change");
      self.notify_host(width, height);
    }
  }
}

/// A box whose children are measured off the interactive thread.
pub struct AsyncBoxView {
  shared:  Arc<Shared>,
  parent:  Option<ViewId>,
  element: Option<ElementId>,
}

impl AsyncBoxView {
  pub fn new(
    axis: Axis,
    element: Option<ElementId>,
    document: Arc<Document>,
    env: Arc<ViewEnv>,
    queue: Arc<dyn TaskQueue>,
  ) -> Self {
    let shared = Arc::new_cyclic(|owner| {
      Shared {
        id: ViewId::next(),
        axis,
        document,
        env,
        queue,
        state: Mutex::new(BoxState::default()),
        children: RwLock::new(Vec::new()),
        locator: Mutex::new(ChildLocator::default()),
        host: RwLock::new(None),
        this: owner.clone(),
      }
    });
    Self {
      shared,
      parent: None,
      element,
    }
  }

  pub fn axis(&self) -> Axis {
    self.shared.axis
  }

  pub fn set_host(&self, host: Option<Arc<dyn LayoutHost>>) {
    *self.shared.host.write() = host;
  }

  pub fn insets(&self) -> Insets {
    self.shared.state.lock().insets
  }

  pub fn set_insets(&self, insets: Insets) {
    let changed = {
      let mut state = self.shared.state.lock();
      let changed = state.insets != insets;
      state.insets = insets;
      changed
    };
    if changed {
      self.shared.notify_host(true, true);
    }
  }

  pub fn estimated_major_span(&self) -> bool {
    self.shared.state.lock().estimated
  }

  /// Treat the major span as a guess, set from the allocation, until the
  /// next flush sums up every child.
  pub fn set_estimated_major_span(&self, estimated: bool) {
    self.shared.state.lock().estimated = estimated;
  }

  pub fn view_count(&self) -> usize {
    self.shared.children.read().len()
  }

  pub fn child_state(&self, index: usize) -> Option<Arc<ChildState>> {
    self.shared.children.read().get(index).cloned()
  }

  /// Create a child per child element, replacing the current children.
  pub fn load_children(&mut self, cx: &LayoutCx<'_>) {
    let Some(element) = self.element else {
      return;
    };
    let views: Vec<Box<dyn View>> = cx
      .doc
      .element(element)
      .children()
      .iter()
      .filter_map(|child| <dyn View>::from_element(*child, cx))
      .collect();
    self.set_estimated_major_span(views.len() >= cx.env.config().estimate_threshold);
    let count = self.view_count();
    self.replace(0, count, views);
  }

  /// Replace `count` children starting at `index`. Removed children are
  /// unlinked, so tasks still queued for them do nothing.
  pub fn replace(&mut self, index: usize, count: usize, views: Vec<Box<dyn View>>) {
    let id = self.shared.id;
    let owner = Arc::downgrade(&self.shared);
    let added: Vec<Arc<ChildState>> = views
      .into_iter()
      .enumerate()
      .map(|(i, mut view)| {
        view.set_parent(Some(id));
        Arc::new(ChildState::new(owner.clone(), index + i, view))
      })
      .collect();

    let (removed_major, remaining) = {
      let mut children = self.shared.children.write();
      let removed: Vec<Arc<ChildState>> = children.splice(index..index + count, added.iter().cloned()).collect();
      for (i, child) in children.iter().enumerate().skip(index + added.len()) {
        child.index.store(i, Ordering::Release);
      }
      let mut major = 0.0f32;
      for child in &removed {
        let mut geometry = child.geometry.lock();
        geometry.view.set_parent(None);
        major += geometry.major;
      }
      (major, children.len())
    };
    {
      let mut locator = self.shared.locator.lock();
      locator.valid = locator.valid.min(index);
    }
    trace!(view = id.get(), index, count, inserted = added.len(), "replaced async children");

    if remaining == 0 {
      {
        let mut state = self.shared.state.lock();
        state.major_span = 0.0;
        state.minor_request = SizeRequirements::default();
        state.estimated = false;
        state.major_changed = false;
        state.minor_changed = false;
        state.changing = None;
      }
      if count > 0 {
        self.shared.notify_host(true, true);
      }
      return;
    }

    {
      let mut state = self.shared.state.lock();
      if !state.estimated {
        state.major_span -= removed_major;
      }
      if removed_major != 0.0 {
        state.major_changed = true;
      }
      if count > 0 {
        state.minor_changed = true;
      }
    }
    self.shared.enqueue_children(added);
  }

  /// Record that child `index` changed its preferences and queue it for
  /// measuring. A change to the child being measured right now is folded
  /// into the running task.
  pub fn child_preference_changed(&self, index: usize, change: PreferenceChange) {
    let Some(child) = self.child_state(index) else {
      return;
    };
    let axis = self.shared.axis;
    let folded = {
      let state = self.shared.state.lock();
      let folded = state.changing.as_ref().is_some_and(|changing| Arc::ptr_eq(changing, &child));
      if folded {
        child.preference_changed(axis, change);
      }
      folded
    };
    if folded {
      return;
    }
    child.preference_changed(axis, change);
    self.shared.enqueue_children([child]);
  }

  fn set_span_on_axis(&self, axis: Axis, span: f32) {
    let mut state = self.shared.state.lock();
    let inside = (span - state.insets.span(axis) as f32).max(0.0);
    if axis == self.shared.axis {
      // Ignored unless the major span is only a guess anyway.
      if state.estimated {
        state.major_span = inside;
      }
      return;
    }
    if state.minor_span == inside {
      return;
    }
    state.minor_span = inside;
    drop(state);

    let children = self.shared.children.read().clone();
    if children.is_empty() {
      return;
    }
    for child in &children {
      child.size_valid.store(false, Ordering::Release);
    }
    self.shared.enqueue_children(children);
  }

  fn model_start(&self, cx: &LayoutCx<'_>) -> usize {
    if let Some(element) = self.element {
      return cx.doc.element(element).start();
    }
    self
      .child_state(0)
      .map_or(0, |child| child.geometry.lock().view.start_offset(cx))
  }

  fn model_end(&self, cx: &LayoutCx<'_>) -> usize {
    if let Some(element) = self.element {
      return cx.doc.element(element).end();
    }
    let last = self.view_count().checked_sub(1);
    last
      .and_then(|last| self.child_state(last))
      .map_or(0, |child| child.geometry.lock().view.end_offset(cx))
  }

  pub fn view_index_at_position(&self, pos: usize, cx: &LayoutCx<'_>) -> Option<usize> {
    let children = self.shared.children.read();
    let index = children.partition_point(|child| child.geometry.lock().view.end_offset(cx) <= pos);
    let child = children.get(index)?;
    (child.geometry.lock().view.start_offset(cx) <= pos).then_some(index)
  }

  /// Allocation of child `index` within `alloc`.
  pub fn child_allocation(&self, index: usize, alloc: Rect) -> Option<Rect> {
    let inside = alloc.inset(&self.insets());
    let mut locator = self.shared.locator.lock();
    locator.last_alloc = alloc;
    let children = self.shared.children.read();
    if index >= children.len() {
      return None;
    }
    Some(locator.child_rect(&children, index, self.shared.axis, inside))
  }

  fn forward_update(&mut self, event: &DocumentEvent, cx: &LayoutCx<'_>) -> PreferenceChange {
    let mut added = None;
    if let Some(element) = self.element {
      if let Some(change) = event.change_for(element) {
        let views: Vec<Box<dyn View>> = change
          .added
          .iter()
          .filter_map(|element| <dyn View>::from_element(*element, cx))
          .collect();
        added = Some(change.index..change.index + views.len());
        self.replace(change.index, change.removed.len(), views);
      }
    }

    let children = self.shared.children.read().clone();
    let ranges: Vec<_> = children
      .iter()
      .map(|child| child.geometry.lock().view.range(cx))
      .collect();
    for index in update_targets(&ranges, event, added) {
      let change = {
        let mut geometry = children[index].geometry.lock();
        dispatch_update(&mut *geometry.view, event, cx)
      };
      if !change.is_none() {
        self.child_preference_changed(index, change);
      }
    }
    // Published to the host by the flush.
    PreferenceChange::NONE
  }
}

impl fmt::Debug for AsyncBoxView {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AsyncBoxView")
      .field("id", &self.shared.id)
      .field("axis", &self.shared.axis)
      .field("children", &self.view_count())
      .finish_non_exhaustive()
  }
}

impl Sizable for AsyncBoxView {
  fn preferred_span(&mut self, axis: Axis, _cx: &LayoutCx<'_>) -> f32 {
    let state = self.shared.state.lock();
    let inset = state.insets.span(axis) as f32;
    if axis == self.shared.axis {
      state.major_span + inset
    } else {
      state.minor_request.preferred + inset
    }
  }

  fn minimum_span(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> f32 {
    if axis == self.shared.axis {
      return self.preferred_span(axis, cx);
    }
    let state = self.shared.state.lock();
    state.minor_request.minimum + state.insets.span(axis) as f32
  }

  fn maximum_span(&mut self, axis: Axis, cx: &LayoutCx<'_>) -> f32 {
    if axis == self.shared.axis {
      self.preferred_span(axis, cx)
    } else {
      UNBOUNDED
    }
  }

  fn resize_weight(&mut self, axis: Axis, _cx: &LayoutCx<'_>) -> i32 {
    i32::from(axis != self.shared.axis)
  }

  fn set_size(&mut self, width: f32, height: f32, _cx: &LayoutCx<'_>) -> PreferenceChange {
    self.set_span_on_axis(Axis::X, width);
    self.set_span_on_axis(Axis::Y, height);
    PreferenceChange::NONE
  }
}

impl Breakable for AsyncBoxView {}

impl Paintable for AsyncBoxView {
  fn paint(&mut self, surface: &mut dyn Surface, alloc: Rect, cx: &LayoutCx<'_>) {
    let axis = self.shared.axis;
    let clip = surface.clip();
    let inside = alloc.inset(&self.insets());

    let mut locator = self.shared.locator.lock();
    locator.last_alloc = alloc;
    let children = self.shared.children.read();
    let target = (clip.offset(axis) - inside.offset(axis)).max(0) as f32;
    let Some(first) = locator.index_at_visual_offset(&children, target) else {
      return;
    };
    let clip_end = clip.offset(axis) + clip.span(axis);
    for index in first..children.len() {
      let rect = locator.child_rect(&children, index, axis, inside);
      if rect.offset(axis) >= clip_end {
        break;
      }
      if rect.intersects(&clip) {
        children[index].geometry.lock().view.paint(surface, rect, cx);
      }
    }
  }
}

impl ModelMapped for AsyncBoxView {
  fn model_to_view(&mut self, pos: usize, alloc: Rect, bias: Bias, cx: &LayoutCx<'_>) -> Result<Rect> {
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
    let Some(index) = self.view_index_at_position(test_pos, cx) else {
      return Err(bad_location);
    };
    let Some(rect) = self.child_allocation(index, alloc) else {
      return Err(bad_location);
    };
    let Some(child) = self.child_state(index) else {
      return Err(bad_location);
    };
    let (result, end) = {
      let mut geometry = child.geometry.lock();
      (geometry.view.model_to_view(pos, rect, bias, cx), geometry.view.end_offset(cx))
    };
    match result {
      // A child may not map its own end, the next child starts there.
      Err(LayoutError::BadLocation { .. }) if end == pos => {
        let next = index + 1;
        let (Some(next_rect), Some(next_child)) = (self.child_allocation(next, alloc), self.child_state(next)) else {
          return Err(bad_location);
        };
        next_child.geometry.lock().view.model_to_view(pos, next_rect, bias, cx)
      },
      result => result,
    }
  }

  fn view_to_model(&mut self, x: f32, y: f32, alloc: Rect, cx: &LayoutCx<'_>) -> (usize, Bias) {
    let axis = self.shared.axis;
    let inside = alloc.inset(&self.insets());
    let point = match axis {
      Axis::X => x as i32,
      Axis::Y => y as i32,
    };
    if point < inside.offset(axis) {
      return (self.model_start(cx), Bias::Forward);
    }

    let found = {
      let mut locator = self.shared.locator.lock();
      locator.last_alloc = alloc;
      let children = self.shared.children.read();
      let target = (point - inside.offset(axis)) as f32;
      locator.index_at_visual_offset(&children, target).map(|index| {
        let rect = locator.child_rect(&children, index, axis, inside);
        (Arc::clone(&children[index]), rect)
      })
    };
    match found {
      Some((child, rect)) => child.geometry.lock().view.view_to_model(x, y, rect, cx),
      None => (self.model_start(cx), Bias::Forward),
    }
  }
}

impl View for AsyncBoxView {
  fn id(&self) -> ViewId {
    self.shared.id
  }

  fn parent(&self) -> Option<ViewId> {
    self.parent
  }

  fn set_parent(&mut self, parent: Option<ViewId>) {
    if parent.is_none() {
      let children = self.shared.children.read().clone();
      for child in children {
        child.geometry.lock().view.set_parent(None);
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
