//! Producer half of the funnel generator.
//!
//! Each pipeline iteration fabricates a lead, persists it, publishes a
//! conversion prediction, maybe issues a coupon, and (when the weighted
//! coin flips land) schedules a future conversion on the shared
//! [`DelayQueue`].
//!
//! [`DelayQueue`]: funnel_scheduler::DelayQueue

pub mod error;
pub mod generator;
pub mod producer;

pub use error::PipelineError;
pub use generator::rand_lead;
pub use producer::LeadPipeline;
