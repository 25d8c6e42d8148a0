//! Benchmarks for paragraph flow and asynchronous box convergence.
//!
//! Run with: `cargo bench -p the-layout --bench layout`

use std::sync::Arc;

use divan::{
  Bencher,
  black_box,
};
use the_layout::{
  config::LayoutConfig,
  document::{
    Attributes,
    Document,
  },
  geometry::Axis,
  queue::ManualQueue,
  text_layout::TextLayout,
  view::ViewEnv,
};

fn main() {
  divan::main();
}

fn make_text(paragraphs: usize) -> String {
  let line = "The quick brown fox jumps over the lazy dog. ";
  let mut s = String::new();
  for _ in 0..paragraphs {
    for _ in 0..8 {
      s.push_str(line);
    }
    s.push('\n');
  }
  s
}

fn env() -> Arc<ViewEnv> {
  Arc::new(ViewEnv::new(LayoutConfig::default()))
}

#[divan::bench(args = [1, 16, 256])]
fn sync_reflow(bencher: Bencher, paragraphs: usize) {
  let mut layout = TextLayout::new(Arc::new(Document::new(&make_text(paragraphs))), env());
  let mut width = 300.0;
  bencher.bench_local(|| {
    width = if width == 300.0 { 420.0 } else { 300.0 };
    layout.set_size(width, 10_000.0);
    black_box(layout.preferred_span(Axis::Y))
  });
}

#[divan::bench(args = [16, 256])]
fn async_reflow(bencher: Bencher, paragraphs: usize) {
  let queue = Arc::new(ManualQueue::new());
  let document = Arc::new(Document::new(&make_text(paragraphs)));
  let mut layout = TextLayout::new_async(document, env(), queue.clone());
  let mut width = 300.0;
  bencher.bench_local(|| {
    width = if width == 300.0 { 420.0 } else { 300.0 };
    layout.set_size(width, 10_000.0);
    queue.drain();
    black_box(layout.preferred_span(Axis::Y))
  });
}

#[divan::bench]
fn insert_in_long_paragraph(bencher: Bencher) {
  let mut layout = TextLayout::new(Arc::new(Document::new(&make_text(1))), env());
  layout.set_size(300.0, 10_000.0);
  bencher.bench_local(|| {
    layout.insert(10, "x", Attributes::default()).ok();
    layout.remove(10, 1).ok();
    black_box(layout.preferred_span(Axis::Y))
  });
}
