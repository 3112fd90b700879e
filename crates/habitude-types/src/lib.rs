//! Shared wire types for the habitude API, plus the JWT claims used by
//! both token issuance and the auth middleware.

pub mod api;
