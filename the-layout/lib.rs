//! Box and flow layout for styled text.
//!
//! A document is presented by a tree of views. Boxes tile their children
//! along a major axis and stack them along the other, paragraphs flow runs
//! of glyphs into rows, and an asynchronous box moves the measuring of its
//! children onto a task queue so very large documents stay responsive.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use the_layout::{
//!   config::LayoutConfig,
//!   document::Document,
//!   geometry::Axis,
//!   text_layout::TextLayout,
//!   view::ViewEnv,
//! };
//!
//! let document = Arc::new(Document::new("hello world\n"));
//! let env = Arc::new(ViewEnv::new(LayoutConfig::default()));
//! let mut layout = TextLayout::new(document, env);
//! layout.set_size(80.0, 24.0);
//! let width = layout.preferred_span(Axis::X);
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod queue;
pub mod requirements;
pub mod surface;
pub mod text_layout;
pub mod view;

#[cfg(test)]
mod test_util;

pub use error::{
  LayoutError,
  Result,
};
