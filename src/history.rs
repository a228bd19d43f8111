use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable record of one successful refinement. Entries are only ever
/// appended to a section's history and never edited afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionEntry {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Section content immediately before the refinement ran.
    pub original_content: String,
    /// Content returned by the rewrite service.
    pub refined_content: String,
    /// Instructions that were sent to the service, kept for inspection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl RevisionEntry {
    pub fn new(
        original_content: String,
        refined_content: String,
        prompt: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            original_content,
            refined_content,
            prompt,
        }
    }
}

/// Read-only pointer into a section's revision history. `None` is the
/// baseline position: the content as it was before any refinement.
/// `Some(i)` points at the refined content of `history[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryCursor {
    position: Option<usize>,
}

impl HistoryCursor {
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn is_baseline(&self) -> bool {
        self.position.is_none()
    }

    /// Step towards the baseline. Returns false when already there.
    pub fn back(&mut self) -> bool {
        match self.position {
            None => false,
            Some(0) => {
                self.position = None;
                true
            }
            Some(i) => {
                self.position = Some(i - 1);
                true
            }
        }
    }

    /// Step towards the newest of `len` entries. Returns false when already
    /// at the newest entry or when the history is empty.
    pub fn forward(&mut self, len: usize) -> bool {
        match self.position {
            None if len > 0 => {
                self.position = Some(0);
                true
            }
            Some(i) if i + 1 < len => {
                self.position = Some(i + 1);
                true
            }
            _ => false,
        }
    }

    /// Re-point at the newest of `len` entries, or the baseline when there
    /// are none. Called after every committed refinement.
    pub fn jump_to_newest(&mut self, len: usize) {
        self.position = len.checked_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_walks_to_baseline_and_stops() {
        let mut cursor = HistoryCursor::default();
        cursor.jump_to_newest(2);
        assert_eq!(cursor.position(), Some(1));

        assert!(cursor.back());
        assert_eq!(cursor.position(), Some(0));

        assert!(cursor.back());
        assert!(cursor.is_baseline());

        // Already at the baseline: no-op
        assert!(!cursor.back());
        assert!(cursor.is_baseline());
    }

    #[test]
    fn test_forward_stops_at_newest_entry() {
        let mut cursor = HistoryCursor::default();

        assert!(cursor.forward(2));
        assert_eq!(cursor.position(), Some(0));

        assert!(cursor.forward(2));
        assert_eq!(cursor.position(), Some(1));

        assert!(!cursor.forward(2));
        assert_eq!(cursor.position(), Some(1));
    }

    #[test]
    fn test_forward_is_noop_with_empty_history() {
        let mut cursor = HistoryCursor::default();
        assert!(!cursor.forward(0));
        assert!(cursor.is_baseline());
    }

    #[test]
    fn test_jump_to_newest_handles_empty_history() {
        let mut cursor = HistoryCursor::default();
        cursor.jump_to_newest(0);
        assert!(cursor.is_baseline());

        cursor.jump_to_newest(3);
        assert_eq!(cursor.position(), Some(2));
    }
}
