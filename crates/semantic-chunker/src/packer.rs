//! Size-bounded packing of a text into overlapping windows.
//!
//! Chunkers describe *where* a text may be cut as a [`Segmentation`]: split
//! candidates grouped by level (0 = most structural) plus atomic spans that
//! must never be cut. [`pack`] then walks the text greedily. Every window is a
//! contiguous slice, and the next window starts `overlap` characters before the
//! previous one ended, so the overlap is an exact shared substring.

use crate::text::{advance_chars, char_len, retreat_chars};
use std::ops::Range;

/// Legal cut positions of a text
#[derive(Debug, Clone, Default)]
pub(crate) struct Segmentation {
    levels: Vec<Vec<usize>>,
    atomic: Vec<Range<usize>>,
}

impl Segmentation {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allow a cut at byte offset `pos` with the given preference level
    pub(crate) fn add(&mut self, level: usize, pos: usize) {
        if self.levels.len() <= level {
            self.levels.resize_with(level + 1, Vec::new);
        }
        self.levels[level].push(pos);
    }

    pub(crate) fn extend(&mut self, level: usize, positions: impl IntoIterator<Item = usize>) {
        for pos in positions {
            self.add(level, pos);
        }
    }

    /// Forbid cuts strictly inside `range`
    pub(crate) fn add_atomic(&mut self, range: Range<usize>) {
        if range.start < range.end {
            self.atomic.push(range);
        }
    }

    /// Sort, merge and drop candidates that fall inside atomic spans.
    ///
    /// The text end is always a level-0 candidate; atomic span edges are
    /// added at the finest level so a fallback cut never lands inside one.
    pub(crate) fn finish(mut self, text_len: usize) -> Self {
        self.atomic.sort_by_key(|r| (r.start, r.end));
        let mut merged: Vec<Range<usize>> = Vec::with_capacity(self.atomic.len());
        for span in self.atomic.drain(..) {
            match merged.last_mut() {
                Some(last) if span.start < last.end => last.end = last.end.max(span.end),
                _ => merged.push(span),
            }
        }
        self.atomic = merged;

        self.add(0, text_len);
        let finest = self.levels.len();
        let edges: Vec<usize> = self
            .atomic
            .iter()
            .flat_map(|span| [span.start, span.end])
            .collect();
        self.extend(finest, edges);

        let atomic = &self.atomic;
        for level in &mut self.levels {
            level.retain(|&pos| pos > 0 && pos <= text_len && !inside_atomic(atomic, pos));
            level.sort_unstable();
            level.dedup();
        }
        self
    }

    fn atomic_containing(&self, pos: usize) -> Option<&Range<usize>> {
        let idx = self.atomic.partition_point(|span| span.start <= pos);
        idx.checked_sub(1)
            .map(|i| &self.atomic[i])
            .filter(|span| pos < span.end)
    }
}

fn inside_atomic(atomic: &[Range<usize>], pos: usize) -> bool {
    let idx = atomic.partition_point(|span| span.start < pos);
    idx.checked_sub(1)
        .is_some_and(|i| pos > atomic[i].start && pos < atomic[i].end)
}

/// Size budget in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Budget {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Budget {
    pub(crate) fn new(max_chars: usize, overlap_chars: usize) -> Self {
        let max_chars = max_chars.max(1);
        Self {
            max_chars,
            overlap_chars: overlap_chars.min(max_chars - 1),
        }
    }
}

/// One packed slice of the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Window {
    pub range: Range<usize>,
    pub oversized: bool,
}

/// Greedily pack `text` into windows no longer than the budget.
///
/// Only an atomic span longer than the budget produces an oversized window.
pub(crate) fn pack(text: &str, segmentation: &Segmentation, budget: Budget) -> Vec<Window> {
    let len = text.len();
    let mut windows = Vec::new();
    let mut start = 0;
    let mut covered = 0;

    while covered < len {
        let (window_start, end) = next_cut(text, segmentation, budget, start, covered);
        let slice = &text[window_start..end];
        if !slice.trim().is_empty() {
            windows.push(Window {
                range: window_start..end,
                oversized: char_len(slice) > budget.max_chars,
            });
        }
        covered = end;
        start = retreat_chars(text, end, budget.overlap_chars).max(window_start);
    }

    windows
}

/// Pick the end of the window starting at `start` that must cover past `covered`.
///
/// Returns the (possibly shifted) window start and its end.
fn next_cut(
    text: &str,
    segmentation: &Segmentation,
    budget: Budget,
    start: usize,
    covered: usize,
) -> (usize, usize) {
    let limit = advance_chars(text, start, budget.max_chars);
    let reach = advance_chars(text, covered, budget.max_chars);

    for level in &segmentation.levels {
        let lo = level.partition_point(|&c| c <= covered);
        let hi = level.partition_point(|&c| c <= reach);
        if lo == hi {
            continue;
        }

        let within = level.partition_point(|&c| c <= limit);
        if within > lo {
            return (start, level[within - 1]);
        }

        // The next unit fits on its own but not behind the full overlap:
        // shorten the overlap instead of cutting the unit.
        let end = level[lo];
        let shifted = retreat_chars(text, end, budget.max_chars).max(start);
        return (shifted, end);
    }

    if let Some(span) = segmentation.atomic_containing(covered) {
        return (start, span.end);
    }

    let mut cut = limit;
    if cut <= covered {
        cut = advance_chars(text, covered, 1);
    }
    (start, cut)
}
