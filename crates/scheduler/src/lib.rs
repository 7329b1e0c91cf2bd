//! Delayed-event scheduling engine.
//!
//! The lead pipeline inserts [`ConversionEvent`]s into a shared
//! [`DelayQueue`]; the [`SchedulerLoop`] drains them once their fire time
//! has arrived and finalizes each conversion against the store. One
//! producer and one consumer share the queue for the process lifetime.
//!
//! [`ConversionEvent`]: funnel_core::ConversionEvent

pub mod consumer;
pub mod metrics;
pub mod queue;

pub use consumer::SchedulerLoop;
pub use metrics::SchedulerMetrics;
pub use queue::DelayQueue;
