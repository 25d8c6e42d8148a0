use std::fmt;

use crate::{
  document::{
    ElementId,
    ElementKind,
  },
  view::{
    BoxView,
    GlyphRunView,
    LayoutCx,
    ParagraphView,
    View,
  },
};

/// Creates the view presenting an element.
pub trait ViewFactory: Send + Sync + fmt::Debug {
  fn create(&self, element: ElementId, cx: &LayoutCx<'_>) -> Box<dyn View>;
}

/// A box per root, a flowed paragraph per line and a glyph run per run.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultViewFactory;

impl ViewFactory for DefaultViewFactory {
  fn create(&self, element: ElementId, cx: &LayoutCx<'_>) -> Box<dyn View> {
    match cx.doc.element(element).kind() {
      ElementKind::Root => Box::new(BoxView::for_element(element, cx)),
      ElementKind::Paragraph => Box::new(ParagraphView::new(element, cx)),
      ElementKind::Run => Box::new(GlyphRunView::new(element, cx)),
    }
  }
}
