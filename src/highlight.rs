use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Cosmetic color token assigned to a highlight. Cycled round-robin as
/// highlights are added; carries no meaning beyond display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightColor {
    Yellow,
    Green,
    Cyan,
    Blue,
    Purple,
    Pink,
}

impl HighlightColor {
    pub const ALL: [HighlightColor; 6] = [
        HighlightColor::Yellow,
        HighlightColor::Green,
        HighlightColor::Cyan,
        HighlightColor::Blue,
        HighlightColor::Purple,
        HighlightColor::Pink,
    ];

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn name(&self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
            HighlightColor::Cyan => "cyan",
            HighlightColor::Blue => "blue",
            HighlightColor::Purple => "purple",
            HighlightColor::Pink => "pink",
        }
    }
}

/// An annotation over a half-open char range of a section's content.
/// Offsets count Unicode chars, not bytes, and are anchored to the content
/// as it was when the highlight was created.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub id: Uuid,
    pub start: usize,
    pub end: usize,
    /// Snapshot of the selected substring, used for display and for the
    /// rewrite request.
    pub text: String,
    pub note: Option<String>,
    pub color: HighlightColor,
    pub updated_at: DateTime<Utc>,
}

impl Highlight {
    pub fn new(start: usize, end: usize, text: impl Into<String>, color: HighlightColor) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
            text: text.into(),
            note: None,
            color,
            updated_at: Utc::now(),
        }
    }

    pub fn range(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

/// Why an `add_highlight` call changed nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HighlightRejected {
    #[error("range {start}..{end} overlaps an existing highlight")]
    Overlaps {
        start: usize,
        end: usize,
        existing: Uuid,
    },

    #[error("range {start}..{end} is outside the section text (length {len})")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("selection is empty")]
    EmptyRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_cycles_round_robin() {
        assert_eq!(HighlightColor::from_index(0), HighlightColor::Yellow);
        assert_eq!(HighlightColor::from_index(5), HighlightColor::Pink);
        assert_eq!(HighlightColor::from_index(6), HighlightColor::Yellow);
        assert_eq!(HighlightColor::from_index(13), HighlightColor::Green);
    }

    #[test]
    fn test_overlaps_is_strict_on_shared_boundaries() {
        let highlight = Highlight::new(4, 9, "quick", HighlightColor::Yellow);

        assert!(highlight.overlaps(4, 9));
        assert!(highlight.overlaps(0, 5));
        assert!(highlight.overlaps(8, 12));
        assert!(highlight.overlaps(5, 7));
        // Half-open ranges touching at a boundary do not overlap
        assert!(!highlight.overlaps(0, 4));
        assert!(!highlight.overlaps(9, 12));
    }
}
