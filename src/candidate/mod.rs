//! Candidate scoring records and deterministic ranking.

mod ranking;

pub use ranking::{rank_desc, MatchCandidate, Scored};
