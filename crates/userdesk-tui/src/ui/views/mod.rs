//! Content for each protected route.

pub mod detail;
pub mod edit;
pub mod users;
