//! Axes, positions and integer rectangles.

/// One of the two layout axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
  X,
  Y,
}

impl Axis {
  /// Axis for a numeric index, `0` for X and `1` for Y.
  ///
  /// # Panics
  ///
  /// Any other index is a programming error and panics.
  pub fn from_index(index: usize) -> Self {
    match index {
      0 => Self::X,
      1 => Self::Y,
      _ => panic!("invalid axis index {index}"),
    }
  }

  pub fn index(self) -> usize {
    match self {
      Self::X => 0,
      Self::Y => 1,
    }
  }

  pub fn other(self) -> Self {
    match self {
      Self::X => Self::Y,
      Self::Y => Self::X,
    }
  }
}

/// Which side of a model position a location refers to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bias {
  #[default]
  Forward,
  Backward,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
  pub x:      i32,
  pub y:      i32,
  pub width:  i32,
  pub height: i32,
}

impl Rect {
  pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  pub fn offset(&self, axis: Axis) -> i32 {
    match axis {
      Axis::X => self.x,
      Axis::Y => self.y,
    }
  }

  pub fn span(&self, axis: Axis) -> i32 {
    match axis {
      Axis::X => self.width,
      Axis::Y => self.height,
    }
  }

  pub fn set_offset(&mut self, axis: Axis, offset: i32) {
    match axis {
      Axis::X => self.x = offset,
      Axis::Y => self.y = offset,
    }
  }

  pub fn set_span(&mut self, axis: Axis, span: i32) {
    match axis {
      Axis::X => self.width = span,
      Axis::Y => self.height = span,
    }
  }

  pub fn right(&self) -> i32 {
    self.x.saturating_add(self.width)
  }

  pub fn bottom(&self) -> i32 {
    self.y.saturating_add(self.height)
  }

  pub fn is_empty(&self) -> bool {
    self.width <= 0 || self.height <= 0
  }

  pub fn intersects(&self, other: &Rect) -> bool {
    !self.is_empty()
      && !other.is_empty()
      && self.x < other.right()
      && other.x < self.right()
      && self.y < other.bottom()
      && other.y < self.bottom()
  }

  pub fn contains(&self, x: i32, y: i32) -> bool {
    x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
  }

  /// Shrink by `insets`, never below an empty rectangle.
  pub fn inset(&self, insets: &Insets) -> Rect {
    Rect {
      x:      self.x + insets.left,
      y:      self.y + insets.top,
      width:  (self.width - insets.left - insets.right).max(0),
      height: (self.height - insets.top - insets.bottom).max(0),
    }
  }
}

/// Space reserved around the content of a box.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Insets {
  pub top:    i32,
  pub left:   i32,
  pub bottom: i32,
  pub right:  i32,
}

impl Insets {
  pub const fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
    Self {
      top,
      left,
      bottom,
      right,
    }
  }

  /// Inset before the content along `axis`.
  pub fn leading(&self, axis: Axis) -> i32 {
    match axis {
      Axis::X => self.left,
      Axis::Y => self.top,
    }
  }

  /// Total inset along `axis`.
  pub fn span(&self, axis: Axis) -> i32 {
    match axis {
      Axis::X => self.left + self.right,
      Axis::Y => self.top + self.bottom,
    }
  }
}
