use crate::highlight::Highlight;
use crate::render::slice_chars;
use crate::selection::{SelectionError, SelectionPoint, SelectionSpan, TextOffsetResolver};

/// One display row of a wrapped section. `canonical_start` is the char
/// offset of the row's first char within the section content, so every
/// display position maps back to exactly one content offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLine {
    pub text: String,
    pub canonical_start: usize,
}

/// Word-wrapped projection of a section's content that selections are
/// expressed against. Whitespace consumed at wrap points stays accounted
/// for in the canonical offsets, so the view and the content never drift.
#[derive(Debug, Clone)]
pub struct SectionView {
    lines: Vec<ViewLine>,
    content: String,
    total_chars: usize,
}

impl SectionView {
    pub fn build(content: &str, width: usize) -> Self {
        let mut lines = Vec::new();
        let mut canonical_start = 0usize;
        for source_line in content.split('\n') {
            let chars: Vec<char> = source_line.chars().collect();
            for (start, end) in wrap_spans(&chars, width) {
                lines.push(ViewLine {
                    text: chars[start..end].iter().collect(),
                    canonical_start: canonical_start + start,
                });
            }
            canonical_start += chars.len() + 1;
        }
        Self {
            lines,
            content: content.to_string(),
            total_chars: content.chars().count(),
        }
    }

    pub fn lines(&self) -> &[ViewLine] {
        &self.lines
    }

    pub fn line_char_len(&self, line_idx: usize) -> usize {
        self.lines
            .get(line_idx)
            .map(|line| line.text.chars().count())
            .unwrap_or(0)
    }

    /// Content slice for a half-open char range, wrap-eaten whitespace
    /// included.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        slice_chars(&self.content, start, end)
    }

    /// Display column ranges of `line_idx` covered by the given highlights,
    /// used to underline annotated spans.
    pub fn line_annotation_ranges(
        &self,
        line_idx: usize,
        highlights: &[Highlight],
    ) -> Vec<(usize, usize)> {
        let Some(line) = self.lines.get(line_idx) else {
            return Vec::new();
        };
        let line_start = line.canonical_start;
        let line_end = line_start + line.text.chars().count();

        let mut ranges: Vec<(usize, usize)> = highlights
            .iter()
            .filter_map(|h| {
                let start = h.start.max(line_start);
                let end = h.end.min(line_end);
                (start < end).then(|| (start - line_start, end - line_start))
            })
            .collect();
        ranges.sort_unstable();
        ranges
    }

    /// Clamps selection points into the view. An end column of zero on a
    /// later line snaps back to the end of the previous line, which is how
    /// line-granular selections usually arrive.
    fn clamp_points(
        &self,
        start: SelectionPoint,
        end: SelectionPoint,
    ) -> (SelectionPoint, SelectionPoint) {
        let last_line = self.lines.len() - 1;
        let start_line = start.line.min(last_line);
        let start_col = start.column.min(self.line_char_len(start_line));

        let mut end_line = end.line.min(last_line);
        let mut end_col = end.column;
        if end_line > start_line && end_col == 0 {
            end_line -= 1;
            end_col = self.line_char_len(end_line);
        } else {
            end_col = end_col.min(self.line_char_len(end_line));
        }

        (
            SelectionPoint::new(start_line, start_col),
            SelectionPoint::new(end_line, end_col),
        )
    }
}

impl TextOffsetResolver for SectionView {
    fn resolve(&self, span: &SelectionSpan) -> Result<(usize, usize), SelectionError> {
        if self.lines.is_empty() {
            return Err(SelectionError::OutsideView);
        }
        let span = span.normalized();
        if span.start.line >= self.lines.len() {
            return Err(SelectionError::OutsideView);
        }

        let (start, end) = self.clamp_points(span.start, span.end);
        let resolved_start = self.lines[start.line].canonical_start + start.column;
        let resolved_end = (self.lines[end.line].canonical_start + end.column).min(self.total_chars);
        if resolved_start >= resolved_end {
            return Err(SelectionError::Collapsed);
        }
        if self.slice(resolved_start, resolved_end).trim().is_empty() {
            return Err(SelectionError::Collapsed);
        }
        Ok((resolved_start, resolved_end))
    }
}

/// Greedy word wrap over one source line, producing char ranges into it.
/// The first row keeps the line's leading whitespace; words longer than the
/// width are split hard.
fn wrap_spans(chars: &[char], width: usize) -> Vec<(usize, usize)> {
    if chars.is_empty() {
        return vec![(0, 0)];
    }
    let width = width.max(1);

    let mut words: Vec<(usize, usize)> = Vec::new();
    let mut word_start: Option<usize> = None;
    for (idx, c) in chars.iter().enumerate() {
        if c.is_whitespace() {
            if let Some(start) = word_start.take() {
                words.push((start, idx));
            }
        } else if word_start.is_none() {
            word_start = Some(idx);
        }
    }
    if let Some(start) = word_start {
        words.push((start, chars.len()));
    }
    if words.is_empty() {
        // Whitespace-only line, kept as a single row
        return vec![(0, chars.len())];
    }

    let mut rows: Vec<(usize, usize)> = Vec::new();
    let mut row_start = Some(0usize);
    let mut row_end = 0usize;
    for &(word_from, word_to) in &words {
        match row_start {
            None => {
                row_start = Some(word_from);
                row_end = word_to;
            }
            Some(from) => {
                if word_to - from <= width {
                    row_end = word_to;
                } else {
                    if row_end > from {
                        rows.push((from, row_end));
                    }
                    row_start = Some(word_from);
                    row_end = word_to;
                }
            }
        }
        while let Some(from) = row_start {
            if row_end - from > width {
                rows.push((from, from + width));
                row_start = Some(from + width);
            } else {
                break;
            }
        }
    }
    if let Some(from) = row_start {
        if row_end > from {
            rows.push((from, row_end));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::HighlightColor;

    const PANGRAM: &str = "The quick brown fox jumps over the lazy dog.";

    fn span(
        start_line: usize,
        start_col: usize,
        end_line: usize,
        end_col: usize,
    ) -> SelectionSpan {
        SelectionSpan::new(
            SelectionPoint::new(start_line, start_col),
            SelectionPoint::new(end_line, end_col),
        )
    }

    #[test]
    fn test_wrap_records_canonical_offsets() {
        let view = SectionView::build(PANGRAM, 30);

        assert_eq!(view.lines().len(), 2);
        assert_eq!(view.lines()[0].text, "The quick brown fox jumps over");
        assert_eq!(view.lines()[0].canonical_start, 0);
        assert_eq!(view.lines()[1].text, "the lazy dog.");
        // The wrap point swallowed one space, still counted here
        assert_eq!(view.lines()[1].canonical_start, 31);
    }

    #[test]
    fn test_newlines_count_towards_canonical_offsets() {
        let view = SectionView::build("alpha\n\nbeta gamma", 40);

        assert_eq!(view.lines().len(), 3);
        assert_eq!(view.lines()[1].text, "");
        assert_eq!(view.lines()[2].canonical_start, 7);

        let range = view.resolve(&span(2, 0, 2, 4)).unwrap();
        assert_eq!(range, (7, 11));
        assert_eq!(view.slice(range.0, range.1), "beta");
    }

    #[test]
    fn test_resolve_single_line_selection() {
        let view = SectionView::build(PANGRAM, 80);
        let range = view.resolve(&span(0, 4, 0, 9)).unwrap();
        assert_eq!(range, (4, 9));
        assert_eq!(view.slice(range.0, range.1), "quick");
    }

    #[test]
    fn test_resolve_selection_across_wrap_boundary() {
        let view = SectionView::build(PANGRAM, 30);
        let range = view.resolve(&span(0, 16, 1, 8)).unwrap();
        assert_eq!(range, (16, 39));
        assert_eq!(view.slice(range.0, range.1), "fox jumps over the lazy");
    }

    #[test]
    fn test_resolve_reversed_selection() {
        let view = SectionView::build(PANGRAM, 80);
        let range = view.resolve(&span(0, 9, 0, 4)).unwrap();
        assert_eq!(range, (4, 9));
    }

    #[test]
    fn test_collapsed_selection_is_rejected() {
        let view = SectionView::build(PANGRAM, 80);
        assert_eq!(
            view.resolve(&span(0, 4, 0, 4)),
            Err(SelectionError::Collapsed)
        );
    }

    #[test]
    fn test_whitespace_only_selection_is_rejected() {
        let view = SectionView::build("word   tail", 80);
        assert_eq!(
            view.resolve(&span(0, 4, 0, 7)),
            Err(SelectionError::Collapsed)
        );
    }

    #[test]
    fn test_selection_starting_past_the_view_is_rejected() {
        let view = SectionView::build(PANGRAM, 80);
        assert_eq!(
            view.resolve(&span(7, 0, 7, 4)),
            Err(SelectionError::OutsideView)
        );
    }

    #[test]
    fn test_columns_clamp_to_line_length() {
        let view = SectionView::build(PANGRAM, 80);
        let range = view.resolve(&span(0, 40, 0, 999)).unwrap();
        assert_eq!(range, (40, 44));
        assert_eq!(view.slice(range.0, range.1), "dog.");
    }

    #[test]
    fn test_end_column_zero_snaps_to_previous_line_end() {
        let view = SectionView::build(PANGRAM, 30);
        let range = view.resolve(&span(0, 20, 1, 0)).unwrap();
        assert_eq!(range, (20, 30));
        assert_eq!(view.slice(range.0, range.1), "jumps over");
    }

    #[test]
    fn test_empty_content_has_nothing_to_select() {
        let view = SectionView::build("", 80);
        assert_eq!(view.lines().len(), 1);
        assert_eq!(
            view.resolve(&span(0, 0, 0, 5)),
            Err(SelectionError::Collapsed)
        );
    }

    #[test]
    fn test_overlong_words_split_hard() {
        let view = SectionView::build("abcdefghijklmno end", 5);
        let texts: Vec<&str> = view.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["abcde", "fghij", "klmno", "end"]);
        assert_eq!(view.lines()[2].canonical_start, 10);
        assert_eq!(view.lines()[3].canonical_start, 16);
    }

    #[test]
    fn test_leading_indent_stays_on_first_row() {
        let view = SectionView::build("  - item one", 40);
        assert_eq!(view.lines()[0].text, "  - item one");
        assert_eq!(view.resolve(&span(0, 4, 0, 8)).unwrap(), (4, 8));
    }

    #[test]
    fn test_annotation_ranges_project_per_line() {
        let view = SectionView::build(PANGRAM, 30);
        let mut marks = vec![Highlight::new(16, 39, "fox jumps over the lazy", HighlightColor::Yellow)];
        marks.push(Highlight::new(0, 3, "The", HighlightColor::Green));

        assert_eq!(
            view.line_annotation_ranges(0, &marks),
            vec![(0, 3), (16, 30)]
        );
        assert_eq!(view.line_annotation_ranges(1, &marks), vec![(0, 8)]);
        assert!(view.line_annotation_ranges(9, &marks).is_empty());
    }
}
