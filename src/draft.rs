use crate::section::Section;
use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// An authoring session over one report: its sections in document order.
/// The source file is read once and never written back; refined content
/// leaves through `export` or the sidecar store.
pub struct ReportDraft {
    source_path: Option<PathBuf>,
    sections: Vec<Section>,
}

impl ReportDraft {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("Failed to read report {path:?}"))?;
        let mut draft = Self::from_text(&text);
        draft.source_path = Some(path.to_path_buf());
        info!("Loaded report {path:?} ({} sections)", draft.sections.len());
        Ok(draft)
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            source_path: None,
            sections: segment_markdown(text),
        }
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn sections_mut(&mut self) -> impl Iterator<Item = &mut Section> {
        self.sections.iter_mut()
    }

    pub fn section_mut(&mut self, index: usize) -> Option<&mut Section> {
        self.sections.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Reassembles the full document from the current section contents.
    /// With no refinements applied this returns the source text exactly.
    pub fn assemble(&self) -> String {
        let parts: Vec<String> = self
            .sections
            .iter()
            .map(|section| match section.heading() {
                Some(heading) => format!("{heading}\n{}", section.content()),
                None => section.content().to_string(),
            })
            .collect();
        parts.join("\n")
    }

    /// Writes the assembled document to `path`, adding a trailing newline
    /// when the content lacks one.
    pub fn export(&self, path: &Path) -> Result<()> {
        let mut assembled = self.assemble();
        if !assembled.ends_with('\n') {
            assembled.push('\n');
        }
        fs::write(path, assembled).with_context(|| format!("Failed to export report to {path:?}"))?;
        info!("Exported {} sections to {path:?}", self.sections.len());
        Ok(())
    }
}

/// Splits markdown into sections at ATX headings. Heading markers inside
/// fenced code blocks don't start a new section. Text before the first
/// heading becomes a "(preamble)" section, unless it is blank.
fn segment_markdown(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut heading: Option<String> = None;
    let mut body: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in text.split('\n') {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        if !in_fence && is_heading(line) {
            push_section(&mut sections, heading.take(), std::mem::take(&mut body));
            heading = Some(line.to_string());
        } else {
            body.push(line);
        }
    }
    push_section(&mut sections, heading, body);

    sections
}

fn push_section(sections: &mut Vec<Section>, heading: Option<String>, body: Vec<&str>) {
    let content = body.join("\n");
    let title = match &heading {
        Some(line) => heading_title(line),
        None if content.trim().is_empty() => return,
        None => "(preamble)".to_string(),
    };
    let id = section_id(sections.len(), &title);
    sections.push(Section::with_identity(id, title, heading, content));
}

/// ATX heading: one to six '#' followed by a space or the end of the line.
fn is_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return false;
    }
    matches!(line[hashes..].chars().next(), None | Some(' '))
}

fn heading_title(line: &str) -> String {
    let title = line.trim_start_matches('#').trim();
    if title.is_empty() {
        "(untitled)".to_string()
    } else {
        title.to_string()
    }
}

/// Stable id derived from the section's position and title, so the same
/// report parses to the same ids on every load.
fn section_id(index: usize, title: &str) -> Uuid {
    let digest = md5::compute(format!("{index}:{title}").as_bytes());
    Uuid::from_bytes(digest.0)
}
