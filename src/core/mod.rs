// Core modules implementing library loading, scoped probe runs, and error modeling.
pub mod error;
pub mod library;
pub mod probe;
