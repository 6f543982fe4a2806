use serde::Serialize;

/// Outcome of a follow attempt: public targets yield an edge immediately,
/// private targets a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowOutcome {
    Following,
    Pending,
}

#[derive(Debug, Clone, Serialize)]
pub struct Relationship {
    pub is_following: bool,
    pub is_pending: bool,
}
