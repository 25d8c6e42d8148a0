//! A document and the view tree presenting it, behind one handle.

use std::{
  fmt,
  ops::Range,
  sync::Arc,
};

use tracing::debug;

use crate::{
  Result,
  document::{
    self,
    Attributes,
    Document,
    DocumentContent,
    DocumentEvent,
  },
  geometry::{
    Axis,
    Bias,
    Rect,
  },
  queue::{
    LayoutQueue,
    TaskQueue,
  },
  surface::Surface,
  view::{
    AsyncBoxView,
    BoxView,
    LayoutCx,
    LayoutHost,
    PreferenceChange,
    View,
    ViewEnv,
    dispatch_update,
  },
};

#[derive(Debug)]
enum Root {
  Sync(BoxView),
  Async(AsyncBoxView),
}

impl Root {
  fn view(&mut self) -> &mut dyn View {
    match self {
      Root::Sync(view) => view,
      Root::Async(view) => view,
    }
  }
}

pub struct TextLayout {
  document: Arc<Document>,
  env:      Arc<ViewEnv>,
  root:     Root,
  host:     Option<Arc<dyn LayoutHost>>,
  size:     (f32, f32),
}

impl TextLayout {
  /// Lay the document out on the calling thread.
  pub fn new(document: Arc<Document>, env: Arc<ViewEnv>) -> Self {
    let root = {
      let doc = document.read();
      let cx = LayoutCx::new(&doc, &env);
      BoxView::for_element(doc.root(), &cx)
    };
    Self::with_root(document, env, Root::Sync(root))
  }

  /// Measure paragraphs on `queue`. Requirements reach the host once the
  /// queue got to them.
  pub fn new_async(document: Arc<Document>, env: Arc<ViewEnv>, queue: Arc<dyn TaskQueue>) -> Self {
    let root = {
      let doc = document.read();
      let cx = LayoutCx::new(&doc, &env);
      let mut root = AsyncBoxView::new(Axis::Y, Some(doc.root()), document.clone(), env.clone(), queue);
      root.load_children(&cx);
      root
    };
    Self::with_root(document, env, Root::Async(root))
  }

  /// Measure paragraphs on a worker pool sized by the configuration.
  pub fn with_workers(document: Arc<Document>, env: Arc<ViewEnv>) -> Result<(Self, Arc<LayoutQueue>)> {
    let queue = Arc::new(LayoutQueue::new(env.config().layout_workers)?);
    let layout = Self::new_async(document, env, queue.clone());
    Ok((layout, queue))
  }

  fn with_root(document: Arc<Document>, env: Arc<ViewEnv>, root: Root) -> Self {
    Self {
      document,
      env,
      root,
      host: None,
      size: (0.0, 0.0),
    }
  }

  pub fn document(&self) -> &Arc<Document> {
    &self.document
  }

  pub fn env(&self) -> &Arc<ViewEnv> {
    &self.env
  }

  pub fn is_async(&self) -> bool {
    matches!(self.root, Root::Async(_))
  }

  pub fn set_host(&mut self, host: Option<Arc<dyn LayoutHost>>) {
    if let Root::Async(root) = &self.root {
      root.set_host(host.clone());
    }
    self.host = host;
  }

  pub fn insert(&mut self, offset: usize, text: &str, attributes: Attributes) -> Result<()> {
    self.edit(|doc| doc.insert(offset, text, attributes))
  }

  pub fn remove(&mut self, offset: usize, len: usize) -> Result<()> {
    self.edit(|doc| doc.remove(offset, len))
  }

  pub fn set_attributes(&mut self, range: Range<usize>, attributes: Attributes) -> Result<()> {
    self.edit(|doc| doc.set_attributes(range, attributes))
  }

  /// Apply an edit and hand its event to the views. The write lock is held
  /// until every view saw the event.
  fn edit<F>(&mut self, apply: F) -> Result<()>
  where
    F: FnOnce(&mut DocumentContent) -> document::Result<DocumentEvent>,
  {
    let change = {
      let mut doc = self.document.write();
      let event = apply(&mut *doc)?;
      debug!(offset = event.offset, len = event.len, kind = ?event.kind, "document edited");
      let cx = LayoutCx::new(&doc, &self.env);
      dispatch_update(self.root.view(), &event, &cx)
    };
    self.notify(change, true);
    Ok(())
  }

  fn notify(&self, change: PreferenceChange, repaint: bool) {
    let Some(host) = &self.host else {
      return;
    };
    if !change.is_none() {
      host.preference_changed(change.width, change.height);
    }
    if repaint || !change.is_none() {
      host.repaint();
    }
  }

  pub fn size(&self) -> (f32, f32) {
    self.size
  }

  pub fn set_size(&mut self, width: f32, height: f32) {
    self.size = (width, height);
    let change = {
      let doc = self.document.read();
      let cx = LayoutCx::new(&doc, &self.env);
      self.root.view().set_size(width, height, &cx)
    };
    self.notify(change, false);
  }

  pub fn preferred_span(&mut self, axis: Axis) -> f32 {
    let doc = self.document.read();
    let cx = LayoutCx::new(&doc, &self.env);
    self.root.view().preferred_span(axis, &cx)
  }

  pub fn minimum_span(&mut self, axis: Axis) -> f32 {
    let doc = self.document.read();
    let cx = LayoutCx::new(&doc, &self.env);
    self.root.view().minimum_span(axis, &cx)
  }

  fn allocation(&self) -> Rect {
    Rect::new(0, 0, self.size.0 as i32, self.size.1 as i32)
  }

  pub fn paint(&mut self, surface: &mut dyn Surface) {
    let alloc = self.allocation();
    let doc = self.document.read();
    let cx = LayoutCx::new(&doc, &self.env);
    self.root.view().paint(surface, alloc, &cx);
  }

  pub fn model_to_view(&mut self, pos: usize, bias: Bias) -> Result<Rect> {
    let alloc = self.allocation();
    let doc = self.document.read();
    let cx = LayoutCx::new(&doc, &self.env);
    self.root.view().model_to_view(pos, alloc, bias, &cx)
  }

  pub fn view_to_model(&mut self, x: f32, y: f32) -> (usize, Bias) {
    let alloc = self.allocation();
    let doc = self.document.read();
    let cx = LayoutCx::new(&doc, &self.env);
    self.root.view().view_to_model(x, y, alloc, &cx)
  }
}

impl fmt::Debug for TextLayout {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TextLayout")
      .field("root", &self.root)
      .field("size", &self.size)
      .field("host", &self.host.is_some())
      .finish_non_exhaustive()
  }
}
