pub mod backend;
pub mod channel;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod runtime;
pub mod store;
pub mod tracing_setup;
pub mod transitions;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the types most callers need at crate root
pub use engine::{AuthContext, FeedEngine, IntentKind, MutationIntent, MutationOutcome};
pub use error::{FeedError, FeedResult};
pub use runtime::FeedSession;
