//! Filter predicate compilation and edit debouncing

pub mod debounce;
pub mod predicate;

pub use debounce::FilterDebouncer;
pub use predicate::{effective_floor, Predicate, Rejection};
