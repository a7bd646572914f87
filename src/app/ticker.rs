//! Fixed-rate driver for the orchestrator

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::util::time::{tick_period, tick_period_millis, unix_millis, Timer};

use super::AppState;

/// Tick every match at the configured rate, forever.
///
/// A tick that overruns its period delays the next one; missed ticks are
/// not replayed.
pub async fn run_tick_loop(state: AppState) {
    let tick_rate_hz = state.config.tick_rate_hz;
    let period_ms = tick_period_millis(tick_rate_hz);
    let mut ticker = interval(tick_period(tick_rate_hz));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(tick_rate_hz, period_ms, "Tick loop started");

    loop {
        ticker.tick().await;

        let timer = Timer::new();
        let stats = state.orchestrator.lock().tick(unix_millis());
        let elapsed_ms = timer.elapsed_ms();

        if elapsed_ms > period_ms {
            warn!(
                elapsed_ms,
                period_ms,
                matches = stats.matches,
                "Tick overran its period"
            );
        }
        if stats.failed > 0 {
            debug!(failed = stats.failed, matches = stats.matches, "Tick finished with failures");
        }
    }
}
