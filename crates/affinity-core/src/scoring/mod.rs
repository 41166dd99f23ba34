//! Candidate scoring
//!
//! Every scorer reads a [`ModelSnapshot`](crate::snapshot::ModelSnapshot) it was
//! handed and returns a ranked list (score descending, id ascending).

pub mod collaborative;
pub mod content;
pub mod hybrid;
pub mod popularity;

pub use collaborative::CollaborativeScorer;
pub use content::ContentScorer;
pub use hybrid::combine;
pub use popularity::PopularityRanker;
