use crate::history::RevisionEntry;
use crate::persist::DraftStore;
use crate::section::Section;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// One highlighted passage as sent to the rewrite service: the selected
/// text plus the author's note on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightDirective {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Wire contract consumed by rewrite services. `base_content` is the full
/// section text the rewrite applies to; offsets are deliberately absent,
/// the service works from the quoted passages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteRequest {
    pub base_content: String,
    pub highlights: Vec<HighlightDirective>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

/// Failure of a single rewrite call. Calls are never retried; the section
/// is left untouched and the caller decides what to surface.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("rewrite request failed: {0}")]
    Transport(String),

    #[error("rewrite service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("rewrite service returned an unusable response: {0}")]
    BadResponse(String),
}

/// External service that rewrites section text. Implementations receive the
/// full request and return the complete replacement content.
#[async_trait::async_trait]
pub trait RewriteService: Send + Sync {
    async fn rewrite(&self, request: &RewriteRequest) -> Result<String, RewriteError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RefineError {
    #[error("a refinement is already running for this section")]
    InFlight,

    #[error("nothing to refine: add a highlight or give an instruction")]
    NothingToRefine,

    #[error(transparent)]
    Rewrite(#[from] RewriteError),
}

/// Token for a refinement that has started but not yet committed. Holds the
/// request snapshot and the generation it was taken from. Must be handed
/// back through `commit_refinement` or `abort_refinement`.
#[derive(Debug)]
pub struct PendingRefinement {
    section_id: Uuid,
    generation: u64,
    request: RewriteRequest,
    prompt: String,
}

impl PendingRefinement {
    pub fn request(&self) -> &RewriteRequest {
        &self.request
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// What became of a finished rewrite call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A revision entry was appended and the content replaced.
    Committed,
    /// The section changed while the rewrite was in flight; the result was
    /// dropped and the section left as it is.
    StaleDiscarded,
}

impl Section {
    /// Starts a refinement: snapshots the current content and highlights
    /// into a rewrite request and marks the section busy. At most one
    /// refinement may be in flight per section; a second call is rejected
    /// rather than queued. Requires at least one highlight or a non-blank
    /// instruction.
    pub fn begin_refinement(
        &mut self,
        instruction: Option<&str>,
    ) -> Result<PendingRefinement, RefineError> {
        if self.refining {
            return Err(RefineError::InFlight);
        }
        let instruction = instruction
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty());
        if self.highlights.is_empty() && instruction.is_none() {
            return Err(RefineError::NothingToRefine);
        }

        let request = RewriteRequest {
            base_content: self.content.clone(),
            highlights: self
                .highlights
                .iter()
                .map(|h| HighlightDirective {
                    text: h.text.clone(),
                    note: h.note.clone(),
                })
                .collect(),
            instruction,
        };
        let prompt = synthesize_prompt(&request);

        self.refining = true;
        debug!(
            "Began refinement of section {} ({} highlighted passages)",
            self.id,
            request.highlights.len()
        );
        Ok(PendingRefinement {
            section_id: self.id,
            generation: self.generation,
            request,
            prompt,
        })
    }

    /// Finishes a successful rewrite: appends a revision entry, replaces the
    /// content, clears all highlights and points the history cursor at the
    /// new entry. If the section moved to a new generation while the rewrite
    /// was in flight the result is discarded instead, leaving the section
    /// exactly as the intervening change left it. Clears the busy flag
    /// either way.
    pub fn commit_refinement(
        &mut self,
        pending: PendingRefinement,
        refined_content: String,
    ) -> CommitOutcome {
        debug_assert_eq!(pending.section_id, self.id);
        self.refining = false;

        if pending.generation != self.generation {
            warn!(
                "Discarding stale refinement result for section {} (generation {} != {})",
                self.id, pending.generation, self.generation
            );
            return CommitOutcome::StaleDiscarded;
        }

        self.history.push(RevisionEntry::new(
            pending.request.base_content,
            refined_content.clone(),
            Some(pending.prompt),
        ));
        self.content = refined_content;
        self.highlights.clear();
        self.cursor.jump_to_newest(self.history.len());

        info!(
            "Committed refinement of section {} (revision {})",
            self.id,
            self.history.len()
        );
        CommitOutcome::Committed
    }

    /// Finishes a failed rewrite: clears the busy flag and nothing else.
    /// Content, highlights and history keep their pre-refinement state.
    pub fn abort_refinement(&mut self, pending: PendingRefinement) {
        debug_assert_eq!(pending.section_id, self.id);
        self.refining = false;
        debug!("Aborted refinement of section {}", self.id);
    }
}

/// Human-readable instructions derived from a rewrite request, also what
/// gets stored on the revision entry for later inspection.
pub fn synthesize_prompt(request: &RewriteRequest) -> String {
    let mut prompt = String::new();
    prompt.push_str("ORIGINAL TEXT:\n");
    prompt.push_str(&request.base_content);
    prompt.push_str("\n\nREFINEMENT INSTRUCTIONS:\n");
    for (idx, directive) in request.highlights.iter().enumerate() {
        match &directive.note {
            Some(note) => prompt.push_str(&format!(
                "{}. Revise the passage \"{}\": {}\n",
                idx + 1,
                directive.text,
                note
            )),
            None => prompt.push_str(&format!(
                "{}. Revise the passage \"{}\"\n",
                idx + 1,
                directive.text
            )),
        }
    }
    if let Some(instruction) = &request.instruction {
        prompt.push_str(&format!("Overall: {instruction}\n"));
    }
    prompt
}

/// Runs refinements against an injected rewrite service and pushes each
/// committed section to the draft store, when one is attached.
pub struct RefineDriver {
    service: Arc<dyn RewriteService>,
    store: Option<Arc<dyn DraftStore>>,
}

impl RefineDriver {
    pub fn new(service: Arc<dyn RewriteService>) -> Self {
        Self {
            service,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn DraftStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Full refinement pass over one section: begin, await the service,
    /// commit or abort. A store failure after a commit is logged and does
    /// not roll the commit back.
    pub async fn refine(
        &self,
        section: &mut Section,
        instruction: Option<&str>,
    ) -> Result<CommitOutcome, RefineError> {
        let pending = section.begin_refinement(instruction)?;
        match self.service.rewrite(pending.request()).await {
            Ok(refined_content) => {
                let outcome = section.commit_refinement(pending, refined_content);
                if outcome == CommitOutcome::Committed {
                    if let Some(store) = &self.store {
                        if let Err(e) = store.persist_section(section) {
                            warn!("Failed to persist section {}: {e}", section.id);
                        }
                    }
                }
                Ok(outcome)
            }
            Err(e) => {
                section.abort_refinement(pending);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::ScriptedRewriteService;

    fn marked_section() -> Section {
        let mut section = Section::new("Summary", "The quick brown fox");
        let id = section.add_highlight((4, 9)).unwrap();
        section.set_highlight_note(id, Some("pick a livelier verb".to_string()));
        section
    }

    #[test]
    fn test_begin_requires_highlights_or_instruction() {
        let mut section = Section::new("Summary", "The quick brown fox");
        assert!(matches!(
            section.begin_refinement(None),
            Err(RefineError::NothingToRefine)
        ));
        assert!(matches!(
            section.begin_refinement(Some("   ")),
            Err(RefineError::NothingToRefine)
        ));
        assert!(section.begin_refinement(Some("shorten it")).is_ok());
    }

    #[test]
    fn test_second_begin_is_rejected_while_in_flight() {
        let mut section = marked_section();
        let pending = section.begin_refinement(None).unwrap();
        assert!(section.is_refining());

        assert!(matches!(
            section.begin_refinement(None),
            Err(RefineError::InFlight)
        ));

        section.commit_refinement(pending, "The nimble brown fox".to_string());
        assert!(!section.is_refining());
        assert_eq!(section.history().len(), 1);
    }

    #[test]
    fn test_commit_replaces_content_and_clears_highlights() {
        let mut section = marked_section();
        let original = section.content().to_string();

        let pending = section.begin_refinement(Some("more vivid")).unwrap();
        let outcome = section.commit_refinement(pending, "The nimble brown fox".to_string());

        assert_eq!(outcome, CommitOutcome::Committed);
        assert_eq!(section.content(), "The nimble brown fox");
        assert!(section.highlights().is_empty());
        assert_eq!(section.history().len(), 1);
        let entry = &section.history()[0];
        assert_eq!(entry.original_content, original);
        assert_eq!(entry.refined_content, "The nimble brown fox");
        assert_eq!(section.viewed_revision(), Some(0));
        assert_eq!(section.viewed_content(), "The nimble brown fox");
    }

    #[test]
    fn test_abort_leaves_section_untouched() {
        let mut section = marked_section();
        let pending = section.begin_refinement(None).unwrap();

        section.abort_refinement(pending);

        assert!(!section.is_refining());
        assert_eq!(section.content(), "The quick brown fox");
        assert_eq!(section.highlights().len(), 1);
        assert!(section.history().is_empty());
    }

    #[test]
    fn test_stale_commit_is_discarded_after_restore() {
        let mut section = marked_section();
        let pending = section.begin_refinement(None).unwrap();
        section.commit_refinement(pending, "first rewrite".to_string());

        // A second refinement starts, then the user restores the baseline
        // while it is in flight.
        section.add_highlight((0, 5)).unwrap();
        let pending = section.begin_refinement(None).unwrap();
        section.history_back();
        assert!(section.restore_viewed_revision());
        assert_eq!(section.content(), "The quick brown fox");

        let outcome = section.commit_refinement(pending, "late result".to_string());
        assert_eq!(outcome, CommitOutcome::StaleDiscarded);
        assert_eq!(section.content(), "The quick brown fox");
        assert_eq!(section.history().len(), 1);
        assert!(!section.is_refining());
    }

    #[test]
    fn test_sequential_refinements_append_history_in_order() {
        let mut section = marked_section();

        let pending = section.begin_refinement(None).unwrap();
        section.commit_refinement(pending, "second draft".to_string());

        section.add_highlight((0, 6)).unwrap();
        let pending = section.begin_refinement(None).unwrap();
        section.commit_refinement(pending, "third draft".to_string());

        assert_eq!(section.history().len(), 2);
        assert_eq!(section.history()[0].refined_content, "second draft");
        assert_eq!(section.history()[1].original_content, "second draft");
        assert_eq!(section.viewed_revision(), Some(1));

        // Walk the full chain back to the baseline and forward again
        section.history_back();
        assert_eq!(section.viewed_content(), "second draft");
        section.history_back();
        assert_eq!(section.viewed_content(), "The quick brown fox");
        assert!(!section.history_back());
        section.history_forward();
        assert_eq!(section.viewed_content(), "second draft");
    }

    #[test]
    fn test_prompt_lists_passages_notes_and_instruction() {
        let request = RewriteRequest {
            base_content: "The quick brown fox".to_string(),
            highlights: vec![
                HighlightDirective {
                    text: "quick".to_string(),
                    note: Some("pick a livelier verb".to_string()),
                },
                HighlightDirective {
                    text: "fox".to_string(),
                    note: None,
                },
            ],
            instruction: Some("keep it short".to_string()),
        };

        let prompt = synthesize_prompt(&request);
        assert!(prompt.starts_with("ORIGINAL TEXT:\nThe quick brown fox"));
        assert!(prompt.contains("1. Revise the passage \"quick\": pick a livelier verb"));
        assert!(prompt.contains("2. Revise the passage \"fox\""));
        assert!(prompt.contains("Overall: keep it short"));
    }

    #[test]
    fn test_request_quotes_highlights_in_offset_order() {
        let mut section = Section::new("Summary", "The quick brown fox");
        section.add_highlight((16, 19)).unwrap();
        section.add_highlight((4, 9)).unwrap();

        let pending = section.begin_refinement(None).unwrap();
        let quoted: Vec<&str> = pending
            .request()
            .highlights
            .iter()
            .map(|d| d.text.as_str())
            .collect();
        assert_eq!(quoted, vec!["quick", "fox"]);
    }

    #[tokio::test]
    async fn test_driver_commits_service_result() {
        let service = Arc::new(ScriptedRewriteService::new().respond_with("The nimble brown fox"));
        let driver = RefineDriver::new(service.clone());
        let mut section = marked_section();

        let outcome = driver.refine(&mut section, Some("more vivid")).await.unwrap();

        assert_eq!(outcome, CommitOutcome::Committed);
        assert_eq!(section.content(), "The nimble brown fox");
        assert_eq!(service.call_count(), 1);

        let request = service.last_request().unwrap();
        assert_eq!(request.base_content, "The quick brown fox");
        assert_eq!(request.highlights[0].text, "quick");
        assert_eq!(
            request.highlights[0].note.as_deref(),
            Some("pick a livelier verb")
        );
        assert_eq!(request.instruction.as_deref(), Some("more vivid"));
    }

    #[tokio::test]
    async fn test_driver_aborts_on_service_failure() {
        let service = Arc::new(ScriptedRewriteService::new().fail_with("connection refused"));
        let driver = RefineDriver::new(service);
        let mut section = marked_section();

        let result = driver.refine(&mut section, None).await;

        assert!(matches!(
            result,
            Err(RefineError::Rewrite(RewriteError::Transport(_)))
        ));
        assert!(!section.is_refining());
        assert_eq!(section.content(), "The quick brown fox");
        assert_eq!(section.highlights().len(), 1);
        assert!(section.history().is_empty());
    }

    #[tokio::test]
    async fn test_driver_rejects_while_another_refinement_is_pending() {
        let service = Arc::new(ScriptedRewriteService::new().respond_with("unused"));
        let driver = RefineDriver::new(service.clone());
        let mut section = marked_section();

        let pending = section.begin_refinement(None).unwrap();
        let result = driver.refine(&mut section, None).await;

        assert!(matches!(result, Err(RefineError::InFlight)));
        // The rejected attempt never reached the service
        assert_eq!(service.call_count(), 0);

        section.abort_refinement(pending);
        let outcome = driver.refine(&mut section, None).await.unwrap();
        assert_eq!(outcome, CommitOutcome::Committed);
        assert_eq!(service.call_count(), 1);
    }
}
