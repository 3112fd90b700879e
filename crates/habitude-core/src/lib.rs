//! Pure domain rules: habit validation and ownership-based access control.
//! No I/O lives here; `habitude-db` calls the validator on every write and
//! the API handlers call the access predicate on every request.

pub mod access;
pub mod validate;

pub use access::{Operation, is_allowed};
pub use validate::{HabitCandidate, Violation, validate};
