use crate::highlight::{Highlight, HighlightColor};
use uuid::Uuid;

/// One piece of a section's content, in document order. Concatenating the
/// text of every segment reproduces the content exactly.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Plain {
        text: String,
    },
    Highlighted {
        text: String,
        id: Uuid,
        color: HighlightColor,
    },
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Plain { text } => text,
            Segment::Highlighted { text, .. } => text,
        }
    }

    pub fn is_highlighted(&self) -> bool {
        matches!(self, Segment::Highlighted { .. })
    }
}

/// Splits `content` into plain and highlighted segments. Highlights are
/// sorted by start offset; callers must hand in pairwise disjoint ranges,
/// which is what the section store enforces. Empty segments are never
/// emitted.
pub fn segments(content: &str, highlights: &[Highlight]) -> Vec<Segment> {
    let mut order: Vec<usize> = (0..highlights.len()).collect();
    order.sort_by_key(|&i| highlights[i].start);
    debug_assert!(
        order
            .windows(2)
            .all(|w| highlights[w[0]].end <= highlights[w[1]].start),
        "highlight ranges must be pairwise disjoint"
    );

    let char_len = content.chars().count();
    let mut out = Vec::new();
    let mut cursor = 0usize;

    for &i in &order {
        let highlight = &highlights[i];
        let start = highlight.start.min(char_len);
        let end = highlight.end.min(char_len);
        if start > cursor {
            out.push(Segment::Plain {
                text: slice_chars(content, cursor, start).to_string(),
            });
        }
        if end > start {
            out.push(Segment::Highlighted {
                text: slice_chars(content, start, end).to_string(),
                id: highlight.id,
                color: highlight.color,
            });
        }
        cursor = cursor.max(end);
    }

    if cursor < char_len {
        out.push(Segment::Plain {
            text: slice_chars(content, cursor, char_len).to_string(),
        });
    }

    out
}

/// Slices `text` by char offsets. Out-of-range offsets clamp to the end.
pub(crate) fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let from = byte_offset(text, start);
    let to = byte_offset(text, end);
    &text[from..to]
}

fn byte_offset(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
