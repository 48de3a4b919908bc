//! Character-level edit alignment between two strings.
//!
//! Used to carry a span from one transcription of an utterance into another
//! (primary text to N-best hypothesis, reference manuscript to ASR text).
//! Alignment is Levenshtein with unit costs; the backtrace prefers diagonal
//! steps, then deletions, then insertions, so the mapping is deterministic.

use crate::types::Span;

/// A monotone alignment path between `source` and `target`, reduced to
/// boundary projections.
#[derive(Debug, Clone)]
pub struct CharAlignment {
    /// Byte offset of every source char boundary (len = source chars + 1).
    source_bounds: Vec<usize>,
    /// Byte offset of every target char boundary (len = target chars + 1).
    target_bounds: Vec<usize>,
    /// Smallest target boundary the path visits at each source boundary.
    lo: Vec<usize>,
    /// Largest target boundary the path visits at each source boundary.
    hi: Vec<usize>,
    distance: usize,
}

fn char_bounds(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect()
}

impl CharAlignment {
    pub fn new(source: &str, target: &str) -> Self {
        let src: Vec<char> = source.chars().collect();
        let tgt: Vec<char> = target.chars().collect();
        let (n, m) = (src.len(), tgt.len());
        let width = m + 1;

        let mut cost = vec![0usize; (n + 1) * width];
        for j in 0..=m {
            cost[j] = j;
        }
        for i in 1..=n {
            cost[i * width] = i;
            for j in 1..=m {
                let sub = cost[(i - 1) * width + j - 1] + usize::from(src[i - 1] != tgt[j - 1]);
                let del = cost[(i - 1) * width + j] + 1;
                let ins = cost[i * width + j - 1] + 1;
                cost[i * width + j] = sub.min(del).min(ins);
            }
        }

        let mut lo = vec![usize::MAX; n + 1];
        let mut hi = vec![0usize; n + 1];
        let mut visit = |i: usize, j: usize| {
            lo[i] = lo[i].min(j);
            hi[i] = hi[i].max(j);
        };

        let (mut i, mut j) = (n, m);
        visit(i, j);
        while i > 0 || j > 0 {
            let here = cost[i * width + j];
            if i > 0
                && j > 0
                && here == cost[(i - 1) * width + j - 1] + usize::from(src[i - 1] != tgt[j - 1])
            {
                i -= 1;
                j -= 1;
            } else if i > 0 && here == cost[(i - 1) * width + j] + 1 {
                i -= 1;
            } else {
                j -= 1;
            }
            visit(i, j);
        }

        Self {
            source_bounds: char_bounds(source),
            target_bounds: char_bounds(target),
            lo,
            hi,
            distance: cost[n * width + m],
        }
    }

    /// Edit distance in characters.
    pub fn distance(&self) -> usize {
        self.distance
    }

    /// Project a source byte span onto the target.
    ///
    /// Insertions adjacent to the span are absorbed into it. Returns `None`
    /// when the span does not sit on source char boundaries.
    pub fn map_span(&self, span: Span) -> Option<Span> {
        if span.start > span.end {
            return None;
        }
        let start = self.source_bounds.binary_search(&span.start).ok()?;
        let end = self.source_bounds.binary_search(&span.end).ok()?;
        let t_start = self.lo[start];
        let t_end = if start == end {
            t_start
        } else {
            self.hi[end].max(t_start)
        };
        Some(Span::new(
            self.target_bounds[t_start],
            self.target_bounds[t_end],
        ))
    }

    /// Project a source byte span onto the target, leaving out insertions
    /// adjacent to the span.
    ///
    /// Use this when the projected text is compared against the source
    /// mention: a target that keeps the mention and adds text next to it
    /// still yields exactly the mention.
    pub fn map_span_tight(&self, span: Span) -> Option<Span> {
        if span.start > span.end {
            return None;
        }
        let start = self.source_bounds.binary_search(&span.start).ok()?;
        let end = self.source_bounds.binary_search(&span.end).ok()?;
        // The path is monotone, so hi[start] <= lo[end] whenever start < end.
        let t_start = self.hi[start];
        let t_end = if start == end {
            t_start
        } else {
            self.lo[end].max(t_start)
        };
        Some(Span::new(
            self.target_bounds[t_start],
            self.target_bounds[t_end],
        ))
    }
}

/// Shrink `span` so it neither starts nor ends with whitespace in `text`.
pub fn trim_span(text: &str, span: Span) -> Span {
    let Some(slice) = span.slice(text) else {
        return span;
    };
    let leading = slice.len() - slice.trim_start().len();
    let trimmed = slice.trim();
    let start = span.start + leading;
    Span::new(start, start + trimmed.len())
}
