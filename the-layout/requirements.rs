//! Size requirements and the tiling algorithms boxes are built on.
//!
//! Spans are `f32` while requested and `i32` once allocated, so every
//! allocation step truncates the requested value before working with it.

/// Span used for "as large as you like".
pub const UNBOUNDED: f32 = i32::MAX as f32;

/// Minimum, preferred and maximum span of a view along one axis, plus where
/// along that span the view wants to be aligned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeRequirements {
  pub minimum:   f32,
  pub preferred: f32,
  pub maximum:   f32,
  pub alignment: f32,
}

impl Default for SizeRequirements {
  fn default() -> Self {
    Self {
      minimum:   0.0,
      preferred: 0.0,
      maximum:   0.0,
      alignment: 0.5,
    }
  }
}

impl SizeRequirements {
  pub const fn new(minimum: f32, preferred: f32, maximum: f32, alignment: f32) -> Self {
    Self {
      minimum,
      preferred,
      maximum,
      alignment,
    }
  }

  /// Requirements of something that can't be resized.
  pub const fn fixed(span: f32, alignment: f32) -> Self {
    Self::new(span, span, span, alignment)
  }

  /// Whether any of the three spans differ.
  pub fn is_resizable(&self) -> bool {
    self.minimum != self.preferred || self.preferred != self.maximum
  }
}

fn saturate(value: f64) -> f32 {
  value.min(UNBOUNDED as f64) as f32
}

/// Requirements of children placed end to end: every span is summed.
pub fn tiled(children: &[SizeRequirements]) -> SizeRequirements {
  let (mut min, mut pref, mut max) = (0.0f64, 0.0f64, 0.0f64);
  for child in children {
    min += child.minimum as f64;
    pref += child.preferred as f64;
    max += child.maximum as f64;
  }
  SizeRequirements::new(saturate(min), saturate(pref), saturate(max), 0.5)
}

/// Requirements of children placed on top of each other: every span is the
/// largest of the children.
pub fn stacked(children: &[SizeRequirements]) -> SizeRequirements {
  let mut out = SizeRequirements::default();
  for child in children {
    out.minimum = out.minimum.max(child.minimum);
    out.preferred = out.preferred.max(child.preferred);
    out.maximum = out.maximum.max(child.maximum);
  }
  out
}

/// Allocate `target` among `children` laid end to end.
///
/// Every child starts at its preferred span. The difference to `target` is
/// then distributed in proportion to how far each child can shrink (towards
/// its minimum) or grow (towards its maximum). Offsets accumulate the spans
/// and saturate at `i32::MAX`.
pub fn tile(target: i32, children: &[SizeRequirements], offsets: &mut [i32], spans: &mut [i32]) {
  let n = children.len();
  debug_assert!(offsets.len() >= n && spans.len() >= n);

  let mut preferred: i64 = 0;
  for (span, child) in spans.iter_mut().zip(children) {
    *span = child.preferred as i32;
    preferred += *span as i64;
  }

  let desired = target as i64 - preferred;
  let mut factor = 0.0f32;
  let mut diffs = vec![0i32; if desired != 0 { n } else { 0 }];
  if desired != 0 {
    let mut total: i64 = 0;
    for (i, child) in children.iter().enumerate() {
      let extreme = if desired < 0 {
        child.minimum as i32
      } else {
        child.maximum as i32
      };
      diffs[i] = if desired < 0 {
        spans[i].saturating_sub(extreme)
      } else {
        extreme.saturating_sub(spans[i])
      };
      total += extreme as i64;
    }
    let flexibility = (total - preferred).abs() as f32;
    // No flexibility divides to an infinity, which clamps to a full step.
    factor = (desired as f32 / flexibility).clamp(-1.0, 1.0);
  }

  let mut offset: i64 = 0;
  for i in 0..n {
    offsets[i] = offset as i32;
    if desired != 0 {
      // Halves round towards positive infinity.
      let adjustment = (factor * diffs[i] as f32 + 0.5).floor() as i32;
      spans[i] = spans[i].saturating_add(adjustment);
    }
    offset = (offset + spans[i] as i64).min(i32::MAX as i64);
  }
}

/// Allocate `target` to each child independently, aligning the children
/// that can't grow that far.
pub fn stack(target: i32, children: &[SizeRequirements], offsets: &mut [i32], spans: &mut [i32]) {
  for (i, child) in children.iter().enumerate() {
    let max = child.maximum as i32;
    if max < target {
      offsets[i] = ((target - max) as f32 * child.alignment) as i32;
      spans[i] = max;
    } else {
      offsets[i] = 0;
      spans[i] = (child.minimum as i32).max(target);
    }
  }
}

#[derive(Debug, Default, Clone, Copy)]
struct Extent {
  min:  i64,
  pref: i64,
  max:  i64,
}

fn split(span: i32, alignment: f32) -> (i64, i64) {
  let ascent = (alignment * span as f32) as i32;
  (ascent as i64, (span - ascent) as i64)
}

/// Requirements of children aligned on a common baseline.
///
/// Each child is split into an ascent above its alignment point and a
/// descent below it. The box needs the largest ascent plus the largest
/// descent, and its own alignment puts the baseline at the same place.
pub fn baseline_requirements(children: &[SizeRequirements]) -> SizeRequirements {
  let mut ascent = Extent::default();
  let mut descent = Extent::default();

  for child in children {
    let (a, d) = split(child.preferred as i32, child.alignment);
    ascent.pref = ascent.pref.max(a);
    descent.pref = descent.pref.max(d);

    let (min, max) = if child.is_resizable() {
      (
        split(child.minimum as i32, child.alignment),
        split(child.maximum as i32, child.alignment),
      )
    } else {
      ((a, d), (a, d))
    };
    ascent.min = ascent.min.max(min.0);
    descent.min = descent.min.max(min.1);
    ascent.max = ascent.max.max(max.0);
    descent.max = descent.max.max(max.1);
  }

  let mut out = SizeRequirements {
    preferred: (ascent.pref + descent.pref).min(i32::MAX as i64) as f32,
    ..Default::default()
  };
  if out.preferred > 0.0 {
    out.alignment = ascent.pref as f32 / out.preferred;
  }

  if out.alignment == 0.0 {
    out.minimum = descent.min as f32;
    out.maximum = descent.max as f32;
  } else if out.alignment == 1.0 {
    out.minimum = ascent.min as f32;
    out.maximum = ascent.max as f32;
  } else {
    let a = out.alignment;
    out.minimum = (ascent.min as f32 / a).max(descent.min as f32 / (1.0 - a)).round();
    out.maximum = saturate((ascent.max as f32 / a).min(descent.max as f32 / (1.0 - a)).round() as f64);
  }
  out
}

/// Allocate `target` to children sharing a baseline placed at
/// `target * alignment`.
///
/// Resizable children are fitted into the room above and below the
/// baseline, the rest get their preferred span.
pub fn baseline_layout(
  target: i32,
  alignment: f32,
  children: &[SizeRequirements],
  offsets: &mut [i32],
  spans: &mut [i32],
) {
  let total_ascent = (target as f32 * alignment) as i32;
  let total_descent = target - total_ascent;

  for (i, child) in children.iter().enumerate() {
    let align = child.alignment;
    let span = if child.is_resizable() {
      let min = child.minimum as i32;
      let max = child.maximum as i32;
      let fit = if align == 0.0 {
        total_descent
      } else if align == 1.0 {
        total_ascent
      } else {
        (total_ascent as f32 / align).min(total_descent as f32 / (1.0 - align)) as i32
      };
      fit.min(max).max(min)
    } else {
      child.preferred as i32
    };
    offsets[i] = total_ascent - (span as f32 * align) as i32;
    spans[i] = span;
  }
}
