use thiserror::Error;

use crate::{
  config::ConfigError,
  document::DocumentError,
  queue::QueueError,
};

#[derive(Debug, Error)]
pub enum LayoutError {
  /// A model offset outside of what a view represents.
  #[error("bad location {offset}")]
  BadLocation { offset: usize },
  #[error(transparent)]
  Document(#[from] DocumentError),
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error(transparent)]
  Queue(#[from] QueueError),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
