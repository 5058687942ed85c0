pub mod retention;

pub use retention::{RetentionConfig, RetentionEngine};
