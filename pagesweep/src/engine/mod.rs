//! The batched pagination engine.
//!
//! The engine is a small state machine run by one coordinating flow:
//!
//! ```text
//! Running ──build batch──▶ BatchInFlight ──barrier──▶ Draining ──merge, pace──▶ Running
//!                                                        │
//!                                                        └──empty batch / limit / cancel──▶ Done
//! ```

mod builder;
mod report;
mod runner;
mod state;

mod engine_tests;

pub use builder::PaginationEngineBuilder;
pub use report::{StopReason, SweepProgress, SweepReport, SweepResult};
pub use runner::PaginationEngine;
pub use state::{batch_had_failures, is_end_of_pagination, EngineState, PageOutcome};
