use uuid::Uuid;

/// What the requester wants to do with a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
    Delete,
}

/// Ownership-based access predicate, evaluated on every request.
///
/// Reads are open to the owner and, for public habits, to anyone —
/// including unauthenticated callers (`requester = None`). Writes and
/// deletes belong to the owner alone, public flag or not.
///
/// Handlers translate a denial into not-found when the habit is invisible
/// to the requester and forbidden when it is visible but not writable.
pub fn is_allowed(requester: Option<Uuid>, owner: Uuid, is_public: bool, op: Operation) -> bool {
    match op {
        Operation::Read => is_public || requester == Some(owner),
        Operation::Write | Operation::Delete => requester == Some(owner),
    }
}
