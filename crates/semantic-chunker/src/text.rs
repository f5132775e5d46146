//! Byte/line/character bookkeeping shared by the chunkers.
//!
//! All positions are byte offsets into the source that always sit on a UTF-8
//! character boundary. Budgets are counted in characters.

/// Byte offsets of line starts
#[derive(Debug, Clone)]
pub(crate) struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1)
                .filter(|&i| i < text.len()),
        );
        Self {
            starts,
            len: text.len(),
        }
    }

    /// Byte offset where a 1-indexed line starts (clamped to the text end)
    pub(crate) fn line_start(&self, line: usize) -> usize {
        line.checked_sub(1)
            .and_then(|idx| self.starts.get(idx))
            .copied()
            .unwrap_or(self.len)
    }

    /// Byte offset just past a 1-indexed line, including its newline
    pub(crate) fn line_end(&self, line: usize) -> usize {
        self.starts.get(line).copied().unwrap_or(self.len)
    }

    /// 1-indexed line containing a byte offset
    pub(crate) fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset).max(1)
    }

    /// Starts of every line after the first
    pub(crate) fn interior_starts(&self) -> &[usize] {
        &self.starts[1..]
    }

    #[cfg(test)]
    pub(crate) fn line_count(&self) -> usize {
        self.starts.len()
    }
}

/// Move forward `n` characters from `from`, clamped to the text end
pub(crate) fn advance_chars(text: &str, from: usize, n: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(n)
        .map_or(text.len(), |(i, _)| from + i)
}

/// Move backward `n` characters from `from`, clamped to the text start
pub(crate) fn retreat_chars(text: &str, from: usize, n: usize) -> usize {
    if n == 0 {
        return from;
    }
    text[..from]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map_or(0, |(i, _)| i)
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Leading whitespace width of a line (tabs count as one column)
pub(crate) fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}
