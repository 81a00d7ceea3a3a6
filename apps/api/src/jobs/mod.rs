pub mod dedupe;
pub mod handlers;
pub mod scout;
pub mod sources;
