use crate::highlight::{Highlight, HighlightColor, HighlightRejected};
use crate::history::{HistoryCursor, RevisionEntry};
use crate::render::{self, Segment, slice_chars};
use log::{debug, info};
use uuid::Uuid;

/// One refinable unit of a report. Owns its content, the highlights over it,
/// its revision history, and the cursor into that history. Highlights are
/// kept sorted by start offset and pairwise disjoint.
#[derive(Debug, Clone)]
pub struct Section {
    pub id: Uuid,
    pub title: String,
    pub(crate) heading: Option<String>,
    pub(crate) content: String,
    pub(crate) highlights: Vec<Highlight>,
    pub(crate) history: Vec<RevisionEntry>,
    pub(crate) cursor: HistoryCursor,
    pub(crate) refining: bool,
    pub(crate) generation: u64,
    palette_seq: usize,
}

impl Section {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_identity(Uuid::new_v4(), title.into(), None, content.into())
    }

    pub(crate) fn with_identity(
        id: Uuid,
        title: String,
        heading: Option<String>,
        content: String,
    ) -> Self {
        Self {
            id,
            title,
            heading,
            content,
            highlights: Vec::new(),
            history: Vec::new(),
            cursor: HistoryCursor::default(),
            refining: false,
            generation: 0,
            palette_seq: 0,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Content length in chars, the unit all highlight offsets use.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Raw markdown heading line this section was segmented from, if any.
    pub fn heading(&self) -> Option<&str> {
        self.heading.as_deref()
    }

    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn highlight_by_id(&self, id: Uuid) -> Option<&Highlight> {
        self.highlights.iter().find(|h| h.id == id)
    }

    pub fn history(&self) -> &[RevisionEntry] {
        &self.history
    }

    pub fn is_refining(&self) -> bool {
        self.refining
    }

    /// Commit epoch for this section. Bumped whenever the content is changed
    /// outside a refinement commit, which invalidates in-flight refinements.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Splits the current content into plain and highlighted segments.
    pub fn segments(&self) -> Vec<Segment> {
        render::segments(&self.content, &self.highlights)
    }

    /// Adds a highlight over `range` (half-open, char offsets). The selected
    /// substring is snapshotted into the highlight. Rejects empty and
    /// out-of-bounds ranges and any range that overlaps an existing
    /// highlight; a rejected call changes nothing.
    pub fn add_highlight(&mut self, range: (usize, usize)) -> Result<Uuid, HighlightRejected> {
        let (start, end) = range;
        if start >= end {
            return Err(HighlightRejected::EmptyRange);
        }
        let len = self.char_len();
        if end > len {
            return Err(HighlightRejected::OutOfBounds { start, end, len });
        }
        if let Some(existing) = self.highlights.iter().find(|h| h.overlaps(start, end)) {
            return Err(HighlightRejected::Overlaps {
                start,
                end,
                existing: existing.id,
            });
        }

        let text = slice_chars(&self.content, start, end).to_string();
        let color = HighlightColor::from_index(self.palette_seq);
        self.palette_seq += 1;

        let highlight = Highlight::new(start, end, text, color);
        let id = highlight.id;
        self.highlights.push(highlight);
        self.highlights.sort_by_key(|h| h.start);

        debug!("Added highlight {start}..{end} to section {}", self.id);
        Ok(id)
    }

    /// Replaces the note on a highlight. Blank notes clear it. Returns false
    /// for unknown ids.
    pub fn set_highlight_note(&mut self, id: Uuid, note: Option<String>) -> bool {
        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        match self.highlights.iter_mut().find(|h| h.id == id) {
            Some(highlight) => {
                highlight.note = note;
                highlight.updated_at = chrono::Utc::now();
                true
            }
            None => false,
        }
    }

    /// Recolors a highlight. Returns false for unknown ids.
    pub fn set_highlight_color(&mut self, id: Uuid, color: HighlightColor) -> bool {
        match self.highlights.iter_mut().find(|h| h.id == id) {
            Some(highlight) => {
                highlight.color = color;
                highlight.updated_at = chrono::Utc::now();
                true
            }
            None => false,
        }
    }

    /// Removes a highlight. Unknown ids are a no-op, so removing twice is
    /// the same as removing once.
    pub fn remove_highlight(&mut self, id: Uuid) -> bool {
        let before = self.highlights.len();
        self.highlights.retain(|h| h.id != id);
        let removed = self.highlights.len() != before;
        if removed {
            debug!("Removed highlight {id} from section {}", self.id);
        }
        removed
    }

    /// Index of the revision the cursor points at; `None` is the baseline.
    pub fn viewed_revision(&self) -> Option<usize> {
        self.cursor.position()
    }

    /// The content the navigator currently points at. At the baseline this
    /// is the content before the first refinement, or the live content when
    /// nothing has been refined yet. Navigation never mutates the section.
    pub fn viewed_content(&self) -> &str {
        match self.cursor.position() {
            Some(i) => self
                .history
                .get(i)
                .map(|e| e.refined_content.as_str())
                .unwrap_or(&self.content),
            None => self
                .history
                .first()
                .map(|e| e.original_content.as_str())
                .unwrap_or(&self.content),
        }
    }

    /// Moves the view one revision towards the baseline. No-op at the
    /// baseline.
    pub fn history_back(&mut self) -> bool {
        self.cursor.back()
    }

    /// Moves the view one revision towards the newest entry. No-op at the
    /// newest entry.
    pub fn history_forward(&mut self) -> bool {
        self.cursor.forward(self.history.len())
    }

    /// Makes the currently viewed revision the live content again. Clears
    /// all highlights, whose offsets referenced the replaced text, and bumps
    /// the generation so an in-flight refinement cannot commit over the
    /// restored content. Returns false when the viewed revision already
    /// matches the live content.
    pub fn restore_viewed_revision(&mut self) -> bool {
        if self.viewed_content() == self.content {
            return false;
        }
        self.content = self.viewed_content().to_string();
        self.highlights.clear();
        self.generation += 1;
        info!("Restored section {} to an earlier revision", self.id);
        true
    }

    /// Replaces content and history with state saved by a previous session.
    pub(crate) fn apply_saved(&mut self, content: String, history: Vec<RevisionEntry>) {
        self.content = content;
        self.history = history;
        self.highlights.clear();
        self.cursor.jump_to_newest(self.history.len());
    }
}
