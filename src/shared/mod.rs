pub mod identity;
pub mod names;
pub mod signal;
