/// A position in a rendered view: display line index plus char column
/// within that line. Columns count chars, not bytes or terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPoint {
    pub line: usize,
    pub column: usize,
}

impl SelectionPoint {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A raw selection over a rendered view. Endpoints may arrive in either
/// order; `normalized` puts the start first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionSpan {
    pub start: SelectionPoint,
    pub end: SelectionPoint,
}

impl SelectionSpan {
    pub fn new(start: SelectionPoint, end: SelectionPoint) -> Self {
        Self { start, end }
    }

    pub fn normalized(&self) -> SelectionSpan {
        if (self.end.line, self.end.column) < (self.start.line, self.start.column) {
            SelectionSpan {
                start: self.end,
                end: self.start,
            }
        } else {
            *self
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Why a selection could not be mapped to a content range. Callers treat
/// both cases as "nothing to highlight" rather than as failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("selection is empty")]
    Collapsed,

    #[error("selection lies outside the rendered view")]
    OutsideView,
}

/// Maps a view selection to a half-open char range over the canonical
/// section content. Implementations read the view only; resolving never
/// mutates anything.
pub trait TextOffsetResolver {
    fn resolve(&self, span: &SelectionSpan) -> Result<(usize, usize), SelectionError>;
}
