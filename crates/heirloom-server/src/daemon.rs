//! The daemon loop: periodically loads the ledger and reports heartbeat deadlines.
//!
//! Read-only. The monitor never submits transactions; it only tells the
//! operator which vaults need a heartbeat and which are already claimable.

use crate::config::ServerConfig;
use anyhow::{Context, Result};
use heirloom_vault::{
    evaluate_batch, Clock, HeartbeatAction, HeartbeatStatus, SystemClock, VaultLedger,
};
use std::time::Duration;

/// Run the daemon loop. Blocks forever (until shutdown signal).
pub async fn run(config: ServerConfig) -> Result<()> {
    log::info!("Heirloom monitor starting…");
    log::info!(
        "  Interval:   {} seconds ({:.1} hours)",
        config.server.check_interval_secs,
        config.server.check_interval_secs as f64 / 3600.0
    );
    log::info!("  Data dir:   {}", config.server.data_dir.display());
    log::info!(
        "  Scheme:     {}-of-{}",
        config.scheme.threshold,
        config.scheme.total_shares
    );

    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data dir: {}",
            config.server.data_dir.display()
        )
    })?;

    let interval = Duration::from_secs(config.server.check_interval_secs);

    // Run first check immediately, then loop
    let mut first = true;
    loop {
        if !first {
            log::info!(
                "Sleeping {} seconds until next check…",
                config.server.check_interval_secs
            );
            tokio::time::sleep(interval).await;
        }
        first = false;

        match run_check_cycle(&config).await {
            Ok(()) => log::info!("Check cycle completed successfully."),
            Err(e) => log::error!("Check cycle failed: {:#}", e),
        }
    }
}

/// Execute a single check cycle against the wall clock.
pub async fn run_check_cycle(config: &ServerConfig) -> Result<()> {
    log::info!("Starting check cycle…");

    let statuses = evaluate_ledger(config, SystemClock.now_ms())?;
    for status in &statuses {
        report(status);
    }

    let count = |action: HeartbeatAction| statuses.iter().filter(|s| s.action == action).count();
    log::info!(
        "Vaults: {}  |  claimable: {}  |  check-in required: {}  |  recommended: {}",
        statuses.len(),
        count(HeartbeatAction::Claimable),
        count(HeartbeatAction::CheckinRequired),
        count(HeartbeatAction::CheckinRecommended)
    );

    Ok(())
}

/// Load the persisted ledger and evaluate every vault at `now_ms`.
///
/// Results are ordered most urgent first.
pub fn evaluate_ledger(config: &ServerConfig, now_ms: u64) -> Result<Vec<HeartbeatStatus>> {
    let path = config.ledger_path();
    if !path.exists() {
        log::warn!("No ledger state at {}; nothing to monitor.", path.display());
    }

    let ledger = VaultLedger::load(&path)
        .with_context(|| format!("Failed to load ledger from {}", path.display()))?;

    let configured = config.share_scheme();
    if !ledger.vault_ids().is_empty() && ledger.scheme() != &configured {
        log::warn!(
            "Ledger uses a {}-of-{} scheme but config says {}-of-{}",
            ledger.scheme().threshold,
            ledger.scheme().total_shares,
            configured.threshold,
            configured.total_shares
        );
    }

    Ok(evaluate_batch(ledger.vaults(), now_ms, &config.heartbeat))
}

fn report(status: &HeartbeatStatus) {
    let pct = status.elapsed_fraction * 100.0;
    match status.action {
        HeartbeatAction::Claimable => log::warn!(
            "[{}] Heartbeat lapsed ({:.0}% elapsed). Beneficiary can claim now.",
            status.vault_id,
            pct
        ),
        HeartbeatAction::CheckinRequired => log::warn!(
            "[{}] Heartbeat required: {} left ({:.0}% elapsed)",
            status.vault_id,
            format_remaining(status.remaining_ms),
            pct
        ),
        HeartbeatAction::CheckinRecommended => log::info!(
            "[{}] Heartbeat recommended: {} left ({:.0}% elapsed)",
            status.vault_id,
            format_remaining(status.remaining_ms),
            pct
        ),
        HeartbeatAction::Healthy => log::debug!(
            "[{}] Healthy: {} left",
            status.vault_id,
            format_remaining(status.remaining_ms)
        ),
        HeartbeatAction::Claimed => log::debug!("[{}] Claimed", status.vault_id),
    }
}

/// Human-readable remaining time, coarsest two units.
fn format_remaining(ms: u64) -> String {
    let secs = ms / 1000;
    let (days, hours, mins) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60);
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs % 60)
    } else {
        format!("{}ms", ms)
    }
}
