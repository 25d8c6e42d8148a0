//! The styled text views are built from.
//!
//! A [`Document`] holds its text in a rope and an element tree over it:
//! one root, one paragraph element per line (each ending with `\n`, the last
//! one with an implicit newline that is never part of the user visible
//! length), and attribute runs inside every paragraph.
//!
//! Every edit returns a [`DocumentEvent`] describing what changed, including
//! the structural [`ElementChange`]s views use to replace their children.
//!
//! # Example
//!
//! ```
//! use the_layout::document::{
//!   Attributes,
//!   Document,
//! };
//!
//! let document = Document::new("hello\nworld");
//! let mut content = document.write();
//! let event = content.insert(5, " there", Attributes::default()).unwrap();
//! assert!(event.changes.is_empty());
//! assert_eq!(content.text(0..12), "hello there\n");
//! ```

use std::{
  borrow::Cow,
  ops::Range,
};

use parking_lot::{
  RwLock,
  RwLockReadGuard,
  RwLockWriteGuard,
};
use ropey::Rope;
use slotmap::SlotMap;
use the_core::chars::char_is_rtl;
use thiserror::Error;

slotmap::new_key_type! {
  pub struct ElementId;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
  #[error("offset {offset} is out of bounds for a document of length {len}")]
  OutOfBounds { offset: usize, len: usize },
  #[error("invalid range {start}..{end}")]
  InvalidRange { start: usize, end: usize },
}

pub type Result<T> = std::result::Result<T, DocumentError>;

/// Character attributes of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attributes {
  /// Multiplier applied to the base glyph metrics.
  pub scale:       f32,
  pub superscript: bool,
}

impl Default for Attributes {
  fn default() -> Self {
    Self {
      scale:       1.0,
      superscript: false,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
  Root,
  Paragraph,
  Run,
}

#[derive(Debug, Clone)]
pub struct Element {
  kind:       ElementKind,
  parent:     Option<ElementId>,
  children:   Vec<ElementId>,
  start:      usize,
  end:        usize,
  attributes: Attributes,
}

impl Element {
  pub fn kind(&self) -> ElementKind {
    self.kind
  }

  pub fn parent(&self) -> Option<ElementId> {
    self.parent
  }

  pub fn children(&self) -> &[ElementId] {
    &self.children
  }

  pub fn start(&self) -> usize {
    self.start
  }

  pub fn end(&self) -> usize {
    self.end
  }

  pub fn range(&self) -> Range<usize> {
    self.start..self.end
  }

  pub fn len(&self) -> usize {
    self.end - self.start
  }

  pub fn is_empty(&self) -> bool {
    self.start == self.end
  }

  pub fn attributes(&self) -> &Attributes {
    &self.attributes
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
  Insert,
  Remove,
  Change,
}

/// Children of `element` starting at `index` were replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementChange {
  pub element: ElementId,
  pub index:   usize,
  pub removed: Vec<ElementId>,
  pub added:   Vec<ElementId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEvent {
  pub offset:  usize,
  pub len:     usize,
  pub kind:    EventKind,
  pub changes: Vec<ElementChange>,
}

impl DocumentEvent {
  fn new(offset: usize, len: usize, kind: EventKind) -> Self {
    Self {
      offset,
      len,
      kind,
      changes: Vec::new(),
    }
  }

  /// Structural change to the children of `element`, if any.
  pub fn change_for(&self, element: ElementId) -> Option<&ElementChange> {
    self.changes.iter().find(|change| change.element == element)
  }
}

/// Shared handle guarding the content with a read/write lock. Layout holds
/// the read lock while measuring, edits hold the write lock.
#[derive(Debug)]
pub struct Document {
  content: RwLock<DocumentContent>,
}

impl Document {
  pub fn new(text: &str) -> Self {
    Self {
      content: RwLock::new(DocumentContent::new(text)),
    }
  }

  pub fn read(&self) -> RwLockReadGuard<'_, DocumentContent> {
    self.content.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, DocumentContent> {
    self.content.write()
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
  len:        usize,
  attributes: Attributes,
}

#[derive(Debug)]
pub struct DocumentContent {
  text:     Rope,
  elements: SlotMap<ElementId, Element>,
  root:     ElementId,
  i18n:     bool,
}

impl DocumentContent {
  pub fn new(text: &str) -> Self {
    let mut rope = Rope::from_str(text);
    rope.insert_char(rope.len_chars(), '\n');

    let mut elements = SlotMap::with_key();
    let root = elements.insert(Element {
      kind:       ElementKind::Root,
      parent:     None,
      children:   Vec::new(),
      start:      0,
      end:        rope.len_chars(),
      attributes: Attributes::default(),
    });

    let mut content = Self {
      i18n: text.chars().any(char_is_rtl),
      text: rope,
      elements,
      root,
    };
    let segments = vec![Segment {
      len:        content.text.len_chars(),
      attributes: Attributes::default(),
    }];
    let lengths = content.paragraph_lengths(0, content.text.len_chars());
    let mut start = 0;
    for segments in split_segments(&segments, &lengths) {
      let paragraph = content.build_paragraph(start, &coalesce(segments));
      start = content.elements[paragraph].end;
      content.elements[root].children.push(paragraph);
    }
    content
  }

  /// Length visible to users, without the implicit trailing newline.
  pub fn len_chars(&self) -> usize {
    self.text.len_chars() - 1
  }

  pub fn rope(&self) -> &Rope {
    &self.text
  }

  pub fn text(&self, range: Range<usize>) -> Cow<'_, str> {
    self.text.slice(range).into()
  }

  pub fn char(&self, offset: usize) -> char {
    self.text.char(offset)
  }

  pub fn root(&self) -> ElementId {
    self.root
  }

  pub fn element(&self, id: ElementId) -> &Element {
    &self.elements[id]
  }

  pub fn get_element(&self, id: ElementId) -> Option<&Element> {
    self.elements.get(id)
  }

  /// Whether the text contains right to left script.
  pub fn is_i18n(&self) -> bool {
    self.i18n
  }

  /// Index of the child of `parent` containing `offset`, clamped to the last
  /// child.
  pub fn element_index(&self, parent: ElementId, offset: usize) -> usize {
    let children = &self.elements[parent].children;
    children
      .partition_point(|id| self.elements[*id].end <= offset)
      .min(children.len().saturating_sub(1))
  }

  pub fn paragraph_at(&self, offset: usize) -> ElementId {
    let root = &self.elements[self.root];
    root.children[self.element_index(self.root, offset)]
  }

  pub fn insert(&mut self, offset: usize, text: &str, attributes: Attributes) -> Result<DocumentEvent> {
    self.check_offset(offset)?;
    let len = text.chars().count();
    let mut event = DocumentEvent::new(offset, len, EventKind::Insert);
    if len == 0 {
      return Ok(event);
    }

    let index = self.element_index(self.root, offset);
    let start = self.paragraph(index).start;
    let mut segments = self.segments(index, index);
    splice_segment(&mut segments, offset - start, Segment { len, attributes });

    self.text.insert(offset, text);
    self.i18n |= text.chars().any(char_is_rtl);
    event.changes = self.apply(index, index, &segments);
    Ok(event)
  }

  pub fn remove(&mut self, offset: usize, len: usize) -> Result<DocumentEvent> {
    let end = offset.saturating_add(len);
    self.check_offset(end)?;
    let mut event = DocumentEvent::new(offset, len, EventKind::Remove);
    if len == 0 {
      return Ok(event);
    }

    let first = self.element_index(self.root, offset);
    let last = self.element_index(self.root, end);
    let start = self.paragraph(first).start;
    let mut segments = self.segments(first, last);
    cut_segments(&mut segments, offset - start, len);

    self.text.remove(offset..end);
    event.changes = self.apply(first, last, &segments);
    Ok(event)
  }

  pub fn set_attributes(&mut self, range: Range<usize>, attributes: Attributes) -> Result<DocumentEvent> {
    if range.start > range.end {
      return Err(DocumentError::InvalidRange {
        start: range.start,
        end:   range.end,
      });
    }
    self.check_offset(range.end)?;
    let len = range.end - range.start;
    let mut event = DocumentEvent::new(range.start, len, EventKind::Change);
    if len == 0 {
      return Ok(event);
    }

    let first = self.element_index(self.root, range.start);
    let last = self.element_index(self.root, range.end - 1);
    let start = self.paragraph(first).start;
    let mut segments = self.segments(first, last);
    cut_segments(&mut segments, range.start - start, len);
    splice_segment(&mut segments, range.start - start, Segment { len, attributes });

    event.changes = self.apply(first, last, &segments);
    Ok(event)
  }

  fn check_offset(&self, offset: usize) -> Result<()> {
    let len = self.len_chars();
    if offset > len {
      return Err(DocumentError::OutOfBounds { offset, len });
    }
    Ok(())
  }

  fn paragraph(&self, index: usize) -> &Element {
    &self.elements[self.elements[self.root].children[index]]
  }

  fn segments(&self, first: usize, last: usize) -> Vec<Segment> {
    self.elements[self.root].children[first..=last]
      .iter()
      .flat_map(|paragraph| &self.elements[*paragraph].children)
      .map(|run| {
        let run = &self.elements[*run];
        Segment {
          len:        run.len(),
          attributes: run.attributes,
        }
      })
      .collect()
  }

  /// Lengths of the lines in `start..end`, which must end with a newline.
  fn paragraph_lengths(&self, start: usize, end: usize) -> Vec<usize> {
    let mut lengths = Vec::new();
    let mut len = 0;
    for ch in self.text.slice(start..end).chars() {
      len += 1;
      if ch == '\n' {
        lengths.push(len);
        len = 0;
      }
    }
    debug_assert_eq!(len, 0, "paragraph region must end with a newline");
    lengths
  }

  /// Rebuild the paragraphs `first..=last` from `segments`, which describe the
  /// already edited text of that region.
  fn apply(&mut self, first: usize, last: usize, segments: &[Segment]) -> Vec<ElementChange> {
    let start = self.paragraph(first).start;
    let len: usize = segments.iter().map(|segment| segment.len).sum();
    let lengths = self.paragraph_lengths(start, start + len);
    let paragraphs = split_segments(segments, &lengths);
    let count = paragraphs.len();

    let mut changes = Vec::new();
    if count == last - first + 1 {
      let mut offset = start;
      for (i, segments) in paragraphs.into_iter().enumerate() {
        let paragraph = self.elements[self.root].children[first + i];
        if let Some(change) = self.update_runs(paragraph, offset, coalesce(segments)) {
          changes.push(change);
        }
        offset = self.elements[paragraph].end;
      }
    } else {
      changes.push(self.replace_paragraphs(first, last, start, paragraphs));
    }

    self.relocate(first + count);
    let end = self.text.len_chars();
    self.elements[self.root].end = end;
    changes
  }

  fn update_runs(&mut self, paragraph: ElementId, start: usize, segments: Vec<Segment>) -> Option<ElementChange> {
    let old = self.elements[paragraph].children.clone();
    let unchanged = old.len() == segments.len()
      && old
        .iter()
        .zip(&segments)
        .all(|(run, segment)| self.elements[*run].attributes == segment.attributes);

    if unchanged {
      let mut offset = start;
      for (run, segment) in old.iter().zip(&segments) {
        let run = &mut self.elements[*run];
        run.start = offset;
        offset += segment.len;
        run.end = offset;
      }
      let paragraph = &mut self.elements[paragraph];
      paragraph.start = start;
      paragraph.end = offset;
      return None;
    }

    for run in &old {
      self.elements.remove(*run);
    }
    let added = self.build_runs(paragraph, start, &segments);
    let end = added.last().map_or(start, |run| self.elements[*run].end);
    let element = &mut self.elements[paragraph];
    element.children = added.clone();
    element.start = start;
    element.end = end;

    Some(ElementChange {
      element: paragraph,
      index: 0,
      removed: old,
      added,
    })
  }

  fn replace_paragraphs(
    &mut self,
    first: usize,
    last: usize,
    start: usize,
    paragraphs: Vec<Vec<Segment>>,
  ) -> ElementChange {
    let removed: Vec<ElementId> = self.elements[self.root].children[first..=last].to_vec();
    for paragraph in &removed {
      if let Some(element) = self.elements.remove(*paragraph) {
        for run in element.children {
          self.elements.remove(run);
        }
      }
    }

    let mut offset = start;
    let mut added = Vec::with_capacity(paragraphs.len());
    for segments in paragraphs {
      let paragraph = self.build_paragraph(offset, &coalesce(segments));
      offset = self.elements[paragraph].end;
      added.push(paragraph);
    }

    let root = self.root;
    self.elements[root]
      .children
      .splice(first..=last, added.iter().copied());

    ElementChange {
      element: root,
      index: first,
      removed,
      added,
    }
  }

  fn build_paragraph(&mut self, start: usize, segments: &[Segment]) -> ElementId {
    let paragraph = self.elements.insert(Element {
      kind: ElementKind::Paragraph,
      parent: Some(self.root),
      children: Vec::new(),
      start,
      end: start,
      attributes: Attributes::default(),
    });
    let runs = self.build_runs(paragraph, start, segments);
    let end = runs.last().map_or(start, |run| self.elements[*run].end);
    let element = &mut self.elements[paragraph];
    element.children = runs;
    element.end = end;
    paragraph
  }

  fn build_runs(&mut self, paragraph: ElementId, start: usize, segments: &[Segment]) -> Vec<ElementId> {
    let mut offset = start;
    segments
      .iter()
      .map(|segment| {
        let run = self.elements.insert(Element {
          kind:       ElementKind::Run,
          parent:     Some(paragraph),
          children:   Vec::new(),
          start:      offset,
          end:        offset + segment.len,
          attributes: segment.attributes,
        });
        offset += segment.len;
        run
      })
      .collect()
  }

  /// Shift paragraphs from `from` onwards so they follow their predecessor.
  fn relocate(&mut self, from: usize) {
    let root = self.root;
    let mut offset = match from {
      0 => 0,
      _ => self.paragraph(from - 1).end,
    };
    for index in from..self.elements[root].children.len() {
      let paragraph = self.elements[root].children[index];
      let delta = offset as isize - self.elements[paragraph].start as isize;
      if delta == 0 {
        break;
      }
      let runs = self.elements[paragraph].children.clone();
      for id in runs.into_iter().chain(std::iter::once(paragraph)) {
        let element = &mut self.elements[id];
        element.start = element.start.saturating_add_signed(delta);
        element.end = element.end.saturating_add_signed(delta);
      }
      offset = self.elements[paragraph].end;
    }
  }
}

/// Drop empty segments and merge neighbours with equal attributes.
fn coalesce(segments: Vec<Segment>) -> Vec<Segment> {
  let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
  for segment in segments.into_iter().filter(|segment| segment.len > 0) {
    match out.last_mut() {
      Some(last) if last.attributes == segment.attributes => last.len += segment.len,
      _ => out.push(segment),
    }
  }
  out
}

/// Insert `segment` at `offset`, splitting the segment it falls into.
fn splice_segment(segments: &mut Vec<Segment>, offset: usize, segment: Segment) {
  let mut start = 0;
  for i in 0..segments.len() {
    let len = segments[i].len;
    if offset < start + len {
      let head = offset - start;
      if head > 0 {
        segments[i].len = head;
        let tail = Segment {
          len:        len - head,
          attributes: segments[i].attributes,
        };
        segments.insert(i + 1, tail);
        segments.insert(i + 1, segment);
      } else {
        segments.insert(i, segment);
      }
      return;
    }
    start += len;
  }
  segments.push(segment);
}

/// Remove `len` units starting at `offset`.
fn cut_segments(segments: &mut Vec<Segment>, offset: usize, len: usize) {
  let end = offset + len;
  let mut start = 0;
  for segment in segments.iter_mut() {
    let seg_end = start + segment.len;
    let overlap = end.min(seg_end).saturating_sub(offset.max(start));
    segment.len -= overlap;
    start = seg_end;
  }
  segments.retain(|segment| segment.len > 0);
}

/// Split `segments` into consecutive groups of the given total lengths.
fn split_segments(segments: &[Segment], lengths: &[usize]) -> Vec<Vec<Segment>> {
  let mut out = Vec::with_capacity(lengths.len());
  let mut pending = segments.iter().copied();
  let mut carry: Option<Segment> = None;

  for &length in lengths {
    let mut group = Vec::new();
    let mut remaining = length;
    while remaining > 0 {
      let Some(mut segment) = carry.take().or_else(|| pending.next()) else {
        break;
      };
      if segment.len > remaining {
        carry = Some(Segment {
          len:        segment.len - remaining,
          attributes: segment.attributes,
        });
        segment.len = remaining;
      }
      remaining -= segment.len;
      group.push(segment);
    }
    out.push(group);
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bold() -> Attributes {
    Attributes {
      scale:       2.0,
      superscript: false,
    }
  }

  fn paragraph_ranges(content: &DocumentContent) -> Vec<Range<usize>> {
    content
      .element(content.root())
      .children()
      .iter()
      .map(|id| content.element(*id).range())
      .collect()
  }

  fn run_ranges(content: &DocumentContent, paragraph: usize) -> Vec<Range<usize>> {
    let paragraph = content.element(content.root()).children()[paragraph];
    content
      .element(paragraph)
      .children()
      .iter()
      .map(|id| content.element(*id).range())
      .collect()
  }

  #[test]
  fn test_new_document() {
    let content = DocumentContent::new("ab\ncd");
    assert_eq!(content.len_chars(), 5);
    assert_eq!(paragraph_ranges(&content), vec![0..3, 3..6]);
    assert_eq!(run_ranges(&content, 1), vec![3..6]);
    assert_eq!(content.text(3..6), "cd\n");
    assert_eq!(content.element(content.root()).range(), 0..6);

    let empty = DocumentContent::new("");
    assert_eq!(empty.len_chars(), 0);
    assert_eq!(paragraph_ranges(&empty), vec![0..1]);
  }

  #[test]
  fn test_element_index() {
    let content = DocumentContent::new("ab\ncd\n");
    let root = content.root();
    assert_eq!(content.element_index(root, 0), 0);
    assert_eq!(content.element_index(root, 2), 0);
    assert_eq!(content.element_index(root, 3), 1);
    assert_eq!(content.element_index(root, 6), 2);
    assert_eq!(content.element_index(root, 100), 2);
  }

  #[test]
  fn test_insert_extends_run() {
    let mut content = DocumentContent::new("ab\ncd");
    let paragraphs = content.element(content.root()).children().to_vec();
    let event = content.insert(1, "xy", Attributes::default()).unwrap();

    assert!(event.changes.is_empty());
    assert_eq!(event.kind, EventKind::Insert);
    assert_eq!(content.text(0..content.len_chars()), "axyb\ncd");
    assert_eq!(content.element(content.root()).children(), paragraphs.as_slice());
    assert_eq!(paragraph_ranges(&content), vec![0..5, 5..8]);
    assert_eq!(run_ranges(&content, 1), vec![5..8]);
  }

  #[test]
  fn test_insert_with_attributes_splits_run() {
    let mut content = DocumentContent::new("abcd");
    let paragraph = content.paragraph_at(0);
    let event = content.insert(2, "X", bold()).unwrap();

    let change = event.change_for(paragraph).unwrap();
    assert_eq!(change.index, 0);
    assert_eq!(change.removed.len(), 1);
    assert_eq!(change.added.len(), 3);
    assert_eq!(run_ranges(&content, 0), vec![0..2, 2..3, 3..6]);
    assert_eq!(content.element(change.added[1]).attributes(), &bold());
  }

  #[test]
  fn test_insert_newline_splits_paragraph() {
    let mut content = DocumentContent::new("abcd\nef");
    let root = content.root();
    let event = content.insert(2, "\n", Attributes::default()).unwrap();

    let change = event.change_for(root).unwrap();
    assert_eq!(change.index, 0);
    assert_eq!(change.removed.len(), 1);
    assert_eq!(change.added.len(), 2);
    assert_eq!(paragraph_ranges(&content), vec![0..3, 3..6, 6..9]);
    assert!(content.get_element(change.removed[0]).is_none());
  }

  #[test]
  fn test_remove_within_paragraph() {
    let mut content = DocumentContent::new("hello\nworld");
    let event = content.remove(1, 3).unwrap();
    assert!(event.changes.is_empty());
    assert_eq!(content.text(0..content.len_chars()), "ho\nworld");
    assert_eq!(paragraph_ranges(&content), vec![0..3, 3..9]);
  }

  #[test]
  fn test_remove_newline_merges_paragraphs() {
    let mut content = DocumentContent::new("ab\ncd\nef");
    let root = content.root();
    let event = content.remove(1, 3).unwrap();

    let change = event.change_for(root).unwrap();
    assert_eq!(change.index, 0);
    assert_eq!(change.removed.len(), 2);
    assert_eq!(change.added.len(), 1);
    assert_eq!(content.text(0..content.len_chars()), "ad\nef");
    assert_eq!(paragraph_ranges(&content), vec![0..3, 3..6]);
  }

  #[test]
  fn test_remove_emptied_run() {
    let mut content = DocumentContent::new("abcd");
    content.set_attributes(1..2, bold()).unwrap();
    let paragraph = content.paragraph_at(0);
    let event = content.remove(1, 1).unwrap();

    let change = event.change_for(paragraph).unwrap();
    assert_eq!(change.removed.len(), 3);
    assert_eq!(change.added.len(), 1);
    assert_eq!(run_ranges(&content, 0), vec![0..4]);
  }

  #[test]
  fn test_set_attributes_per_paragraph() {
    let mut content = DocumentContent::new("ab\ncd");
    let paragraphs = content.element(content.root()).children().to_vec();
    let event = content.set_attributes(1..4, bold()).unwrap();

    assert_eq!(event.kind, EventKind::Change);
    assert!(event.change_for(content.root()).is_none());
    assert!(event.change_for(paragraphs[0]).is_some());
    assert!(event.change_for(paragraphs[1]).is_some());
    assert_eq!(run_ranges(&content, 0), vec![0..1, 1..3]);
    assert_eq!(run_ranges(&content, 1), vec![3..4, 4..6]);
  }

  #[test]
  fn test_errors() {
    let mut content = DocumentContent::new("ab");
    assert_eq!(
      content.insert(3, "x", Attributes::default()),
      Err(DocumentError::OutOfBounds { offset: 3, len: 2 })
    );
    assert_eq!(
      content.remove(1, 2),
      Err(DocumentError::OutOfBounds { offset: 3, len: 2 })
    );
    assert_eq!(
      content.set_attributes(2..1, bold()),
      Err(DocumentError::InvalidRange { start: 2, end: 1 })
    );
  }

  #[test]
  fn test_i18n() {
    let mut content = DocumentContent::new("abc");
    assert!(!content.is_i18n());
    content.insert(0, "\u{05D0}", Attributes::default()).unwrap();
    assert!(content.is_i18n());
  }

  #[test]
  fn test_edits_shift_later_paragraphs() {
    let mut content = DocumentContent::new("a\nb\nc\nd");
    content.insert(0, "xx", Attributes::default()).unwrap();
    assert_eq!(paragraph_ranges(&content), vec![0..4, 4..6, 6..8, 8..10]);
    content.remove(4, 2).unwrap();
    assert_eq!(paragraph_ranges(&content), vec![0..4, 4..6, 6..8]);
    assert_eq!(content.text(0..content.len_chars()), "xxa\nc\nd");
  }
}
