pub mod language;
pub mod tracing;

pub use language::language_middleware;
pub use self::tracing::observability_middleware;
