use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use funnel_core::config::SimConfig;
use funnel_core::{ConversionEvent, ExperimentBucket, Prediction};
use funnel_publish::{topics, Envelope, PredictionPublisher};
use funnel_scheduler::DelayQueue;
use funnel_store::FunnelStore;

use crate::error::PipelineError;
use crate::generator::rand_lead;

/// Prediction scores above this are labeled "will convert".
pub const SCORE_THRESHOLD: f64 = 0.5;

/// Coupon amounts in cents ($5–$50).
const COUPON_CENTS: RangeInclusive<i64> = 500..=5_000;

/// Conversion amounts in cents ($10–$250).
const CONVERSION_CENTS: RangeInclusive<i64> = 1_000..=25_000;

/// Producer half of the scheduling engine.
///
/// Owns `NewLead` values until the store assigns an id, then embeds the
/// resulting `Lead` (by value) in any [`ConversionEvent`] it enqueues.
pub struct LeadPipeline<S, P> {
    store: S,
    publisher: P,
    queue: Arc<DelayQueue>,
    config: SimConfig,
}

impl<S: FunnelStore, P: PredictionPublisher> LeadPipeline<S, P> {
    pub fn new(store: S, publisher: P, queue: Arc<DelayQueue>, config: SimConfig) -> Self {
        Self {
            store,
            publisher,
            queue,
            config,
        }
    }

    /// Run until `shutdown` is notified, producing one lead per tick.
    ///
    /// A failed iteration is logged and skipped; the cadence continues.
    pub async fn run(&self, shutdown: Arc<Notify>) {
        let mut ticker =
            tokio::time::interval(Duration::from_millis(self.config.lead_interval_ms));
        let mut rng = StdRng::from_entropy();

        info!(
            interval_ms = self.config.lead_interval_ms,
            "lead pipeline started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_iteration(&mut rng).await {
                        warn!(error = %e, "lead iteration aborted");
                    }
                }
                _ = shutdown.notified() => break,
            }
        }

        info!("lead pipeline stopped");
    }

    /// One producer iteration: persist a fabricated lead, publish its
    /// conversion prediction, maybe issue a coupon, and schedule a future
    /// conversion if the weighted coin flips say so.
    pub async fn run_iteration<R: Rng>(&self, rng: &mut R) -> Result<(), PipelineError> {
        let new_lead = rand_lead(rng);
        let id = self.store.create_lead(&new_lead).await?;
        let lead = new_lead.with_id(id);
        debug!(lead_id = lead.id, utm_medium = %lead.utm_medium, "created lead");

        // Make a "prediction".
        let score: f64 = rng.gen();
        let label = u8::from(score > SCORE_THRESHOLD);
        let bucket = ExperimentBucket::for_lead(lead.id);

        self.log_prediction(&Prediction {
            lead_id: lead.id,
            experiment_bucket: bucket,
            score,
            label,
            predicted_at: Utc::now(),
        })
        .await;

        // Leads we expect to lose get a coupon, unless held out in control.
        let mut sent_coupon = false;
        if label == 0 && bucket == ExperimentBucket::Experiment {
            let amount_cents = rng.gen_range(COUPON_CENTS);
            match self.store.create_coupon(lead.id, amount_cents).await {
                Ok(()) => {
                    debug!(lead_id = lead.id, amount_cents, "issued coupon");
                    sent_coupon = true;
                }
                Err(e) => warn!(lead_id = lead.id, error = %e, "coupon insert failed"),
            }
        }

        // The score doubles as the true conversion probability, and a
        // coupon buys one extra roll of the same weighted coin.
        let mut did_convert = rng.gen::<f64>() < score;
        if sent_coupon && !did_convert {
            did_convert = rng.gen::<f64>() < score;
        }

        if did_convert {
            let delay_ms = (rng.gen::<f64>() * self.config.conversion_window_secs * 1_000.0) as i64;
            let fire_at = Utc::now() + TimeDelta::milliseconds(delay_ms);
            let amount_cents = rng.gen_range(CONVERSION_CENTS);

            debug!(lead_id = lead.id, %fire_at, amount_cents, "pushing conversion onto the queue");
            self.queue
                .insert(ConversionEvent {
                    fire_at,
                    lead,
                    amount_cents,
                })
                .await;
        }

        Ok(())
    }

    /// Best-effort, fire-and-forget.
    async fn log_prediction(&self, prediction: &Prediction) {
        match Envelope::new(topics::PREDICTION_LOGGED, prediction) {
            Ok(envelope) => {
                if let Err(e) = self.publisher.publish(envelope).await {
                    warn!(lead_id = prediction.lead_id, error = %e, "failed to publish prediction");
                }
            }
            Err(e) => {
                warn!(lead_id = prediction.lead_id, error = %e, "failed to serialize prediction");
            }
        }
    }
}
