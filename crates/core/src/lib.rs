pub mod config;
pub mod event;
pub mod lead;
pub mod prediction;

pub use config::Config;
pub use event::*;
pub use lead::*;
pub use prediction::*;
