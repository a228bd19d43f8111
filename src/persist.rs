use crate::draft::ReportDraft;
use crate::history::RevisionEntry;
use crate::section::Section;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Write-through persistence for refined sections. Implementations must not
/// fail the refinement that triggered the write; callers log and carry on.
pub trait DraftStore: Send + Sync {
    fn persist_section(&self, section: &Section) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SectionRecord {
    title: String,
    content: String,
    #[serde(default)]
    history: Vec<RevisionEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SidecarFile {
    #[serde(default)]
    sections: HashMap<Uuid, SectionRecord>,
}

/// Stores refined content and revision history in a JSON sidecar next to
/// the app data, keyed by section id. The report file itself is never
/// touched; `export` is the only way content leaves the sidecar.
pub struct SidecarStore {
    file_path: Option<PathBuf>,
}

impl SidecarStore {
    /// A store that keeps nothing. Used for tests and `--ephemeral` runs.
    pub fn ephemeral() -> Self {
        Self { file_path: None }
    }

    /// Resolves the sidecar file for a report. Reports with the same
    /// filename share a sidecar, so a moved report keeps its history.
    pub fn for_report(report_path: &Path, data_dir: Option<&Path>) -> Result<Self> {
        let report_hash = Self::compute_report_hash(report_path);
        let resolved_dir = match data_dir {
            Some(dir) => {
                if !dir.exists() {
                    fs::create_dir_all(dir).context("Failed to create data directory")?;
                }
                dir.to_path_buf()
            }
            None => Self::default_data_dir()?,
        };
        let file_path = resolved_dir.join(format!("report_{report_hash}.json"));
        Ok(Self {
            file_path: Some(file_path),
        })
    }

    fn compute_report_hash(report_path: &Path) -> String {
        let filename = report_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_else(|| {
                // Fallback: use the full path if we can't get the filename
                report_path.to_str().unwrap_or("unknown")
            });

        let digest = md5::compute(filename.as_bytes());
        format!("{digest:x}")
    }

    fn default_data_dir() -> Result<PathBuf> {
        let data_dir = if let Ok(custom_dir) = std::env::var("REDRAFT_DATA_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::data_dir()
                .context("Could not determine data directory")?
                .join("redraft")
        };

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
        }

        Ok(data_dir)
    }

    fn load_file(&self) -> SidecarFile {
        let Some(path) = &self.file_path else {
            return SidecarFile::default();
        };
        if !path.exists() {
            return SidecarFile::default();
        }
        match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => SidecarFile::default(),
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Failed to parse sidecar {path:?}, starting fresh: {e}");
                SidecarFile::default()
            }),
            Err(e) => {
                warn!("Failed to read sidecar {path:?}: {e}");
                SidecarFile::default()
            }
        }
    }

    /// Applies saved content and history to every matching section of the
    /// draft. Returns how many sections were brought forward.
    pub fn restore_sections(&self, draft: &mut ReportDraft) -> usize {
        let file = self.load_file();
        if file.sections.is_empty() {
            return 0;
        }

        let mut restored = 0;
        for section in draft.sections_mut() {
            if let Some(record) = file.sections.get(&section.id) {
                section.apply_saved(record.content.clone(), record.history.clone());
                restored += 1;
            }
        }
        if restored > 0 {
            info!("Restored {restored} refined sections from {:?}", self.file_path);
        }
        restored
    }
}

impl DraftStore for SidecarStore {
    fn persist_section(&self, section: &Section) -> Result<()> {
        let Some(path) = &self.file_path else {
            // Ephemeral stores don't write to disk
            return Ok(());
        };

        let mut file = self.load_file();
        file.sections.insert(
            section.id,
            SectionRecord {
                title: section.title.clone(),
                content: section.content().to_string(),
                history: section.history().to_vec(),
            },
        );

        let content = serde_json::to_string_pretty(&file).context("Failed to serialize sidecar")?;
        fs::write(path, content).context("Failed to write sidecar file")?;
        debug!("Persisted section {} to {path:?}", section.id);
        Ok(())
    }
}
