//! Topic constants for PUB/SUB routing.
//!
//! Topics follow the pattern `funnel.<domain>.<event>` so subscribers can
//! prefix-filter on `funnel.`.

/// Fired for every lead with its conversion prediction.
pub const PREDICTION_LOGGED: &str = "funnel.prediction.logged";
