pub mod draft;
pub mod highlight;
pub mod history;
pub mod persist;
pub mod refine;
pub mod render;
pub mod rewrite_http;
pub mod section;
pub mod selection;
pub mod settings;
pub mod view;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use draft::ReportDraft;
pub use highlight::{Highlight, HighlightColor, HighlightRejected};
pub use history::RevisionEntry;
pub use persist::{DraftStore, SidecarStore};
pub use refine::{CommitOutcome, RefineDriver, RefineError, RewriteService};
pub use render::Segment;
pub use section::Section;
pub use selection::{SelectionPoint, SelectionSpan, TextOffsetResolver};
pub use view::SectionView;
