//! Ranking of per-template similarity scores.

use crate::library::TemplateLibrary;
use std::cmp::Ordering;

/// Similarity of a slot against one library template, by index.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Scored {
    /// Index into [`TemplateLibrary::templates`].
    pub index: usize,
    pub score: f32,
}

fn scored_cmp_desc(a: &Scored, b: &Scored) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.index.cmp(&b.index))
}

/// Sorts by descending score; equal scores keep library order.
pub fn rank_desc(scores: &mut [Scored]) {
    scores.sort_by(scored_cmp_desc);
}

/// Ranked candidate resolved to its template id.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchCandidate {
    pub template_id: String,
    /// Similarity in `[0, 1]`, after any rarity boost.
    pub score: f32,
}

impl MatchCandidate {
    /// Resolves a scored entry against the library it was computed with.
    pub fn resolve(scored: Scored, library: &TemplateLibrary) -> Option<Self> {
        library.templates().get(scored.index).map(|t| Self {
            template_id: t.id().to_owned(),
            score: scored.score,
        })
    }
}
