//! Poll scheduler - drives fetch, classify, decide, dispatch for every target
//!
//! One cycle loads the target map, checks each target at most once (optionally
//! several targets at a time), and merges the results back into the store only
//! after every check has finished. Cycles never overlap; the loop sleeps a fixed interval
//! between them and stops cleanly on a shutdown signal.

use crate::classifier::Classifier;
use crate::config::Config;
use crate::notify::{format_message, DiscordWebhook, Notifier};
use crate::state::{Target, TargetMap, Transition};
use crate::storage::{open_store, JsonStore, TargetStore};
use crate::watcher::engine::{Decision, DeliveryOutcome, TransitionEngine};
use crate::watcher::fetcher::{build_http_client, fetch_page};
use crate::WatchError;
use chrono::Utc;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

/// What happened to a single target during a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The page could not be fetched; the target was left untouched
    FetchFailed,

    /// Classified; nothing to send
    Quiet,

    /// A notification was due but the cooldown held it back
    Suppressed(Transition),

    /// A notification was delivered
    Notified(Transition),

    /// A notification was attempted and failed
    DispatchFailed(Transition),

    /// A notification was due but no webhook is configured
    DispatchSkipped(Transition),
}

/// Totals for one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub fetch_failures: usize,
    pub notified: usize,
    pub suppressed: usize,
    pub dispatch_failures: usize,
    pub dispatch_skipped: usize,
    /// Check tasks that panicked; their targets were kept as loaded
    pub aborted: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: CheckOutcome) {
        self.checked += 1;
        match outcome {
            CheckOutcome::FetchFailed => self.fetch_failures += 1,
            CheckOutcome::Quiet => {}
            CheckOutcome::Suppressed(_) => self.suppressed += 1,
            CheckOutcome::Notified(_) => self.notified += 1,
            CheckOutcome::DispatchFailed(_) => self.dispatch_failures += 1,
            CheckOutcome::DispatchSkipped(_) => self.dispatch_skipped += 1,
        }
    }
}

/// Everything a single target check needs, shared across check tasks
struct CheckContext {
    client: Client,
    classifier: Classifier,
    engine: TransitionEngine,
    notifier: Option<Arc<dyn Notifier>>,
}

impl CheckContext {
    /// Runs one tick for one target
    async fn check(&self, mut target: Target) -> (Target, CheckOutcome) {
        tracing::debug!("Checking {}", target.name);

        let body = match fetch_page(&self.client, &target.url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Error checking slots for {}: {}", target.name, e);
                return (target, CheckOutcome::FetchFailed);
            }
        };

        let new_state = self.classifier.classify(&body);
        let previous = target.current_state();
        let now = Utc::now();

        match self.engine.observe(&mut target, new_state, now) {
            Decision::Quiet => {
                if previous != new_state {
                    tracing::info!(
                        "State changed for {}: {} -> {}",
                        target.name,
                        previous,
                        new_state
                    );
                } else {
                    tracing::debug!("No state change for {} ({})", target.name, new_state);
                }
                (target, CheckOutcome::Quiet)
            }

            Decision::Suppressed {
                transition,
                remaining,
            } => {
                tracing::info!(
                    "Slots {} for {} but notification is cooling down ({}s left)",
                    transition,
                    target.name,
                    remaining.num_seconds()
                );
                (target, CheckOutcome::Suppressed(transition))
            }

            Decision::Notify(transition) => {
                tracing::info!("Slots {} for {}: {}", transition, target.name, target.url);
                let message = format_message(&target, transition);

                let delivery = match &self.notifier {
                    Some(notifier) => match notifier.send(&target, &message).await {
                        Ok(()) => DeliveryOutcome::Delivered,
                        Err(_) => DeliveryOutcome::Failed,
                    },
                    None => {
                        tracing::warn!(
                            "Skipping notification for {} as no webhook URL is set",
                            target.name
                        );
                        DeliveryOutcome::Skipped
                    }
                };

                self.engine.record_delivery(&mut target, transition, delivery, now);

                let outcome = match delivery {
                    DeliveryOutcome::Delivered => CheckOutcome::Notified(transition),
                    DeliveryOutcome::Failed => CheckOutcome::DispatchFailed(transition),
                    DeliveryOutcome::Skipped => CheckOutcome::DispatchSkipped(transition),
                };
                (target, outcome)
            }
        }
    }
}

/// Long-running poller over every target in a store
pub struct Watcher<S: TargetStore = JsonStore> {
    store: S,
    context: Arc<CheckContext>,
    interval: Duration,
    max_concurrent: usize,
}

impl Watcher<JsonStore> {
    /// Builds a watcher from configuration and the environment
    ///
    /// Opens the store at `config.storage.path` (fatal if it cannot be written)
    /// and reads the webhook URL from the configured environment variable.
    pub fn from_config(config: &Config) -> Result<Self, WatchError> {
        let store = open_store(Path::new(&config.storage.path))?;
        let client = build_http_client(&config.http)?;

        let notifier: Option<Arc<dyn Notifier>> = match config.notify.webhook_url() {
            Some(url) => {
                if let Err(e) = crate::config::validate_webhook_url(&url) {
                    tracing::warn!("{} looks wrong: {}", config.notify.webhook_env, e);
                }
                Some(Arc::new(DiscordWebhook::new(client.clone(), url)))
            }
            None => {
                tracing::warn!(
                    "{} is not set. Notifications will not be sent.",
                    config.notify.webhook_env
                );
                None
            }
        };

        Ok(Self::new(store, client, config, notifier))
    }
}

impl<S: TargetStore> Watcher<S> {
    /// Creates a watcher over an existing store, client and notifier
    pub fn new(
        store: S,
        client: Client,
        config: &Config,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let context = CheckContext {
            client,
            classifier: Classifier::from_config(&config.classifier),
            engine: TransitionEngine::from_config(&config.watch),
            notifier,
        };

        Self {
            store,
            context: Arc::new(context),
            interval: config.watch.interval(),
            max_concurrent: config.watch.max_concurrent_checks.max(1) as usize,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one poll cycle over every target and persists the result
    ///
    /// Per-target failures are logged and counted. Only a store that cannot be
    /// read or written is returned as an error, and then nothing is saved.
    pub async fn run_cycle(&self) -> Result<CycleReport, WatchError> {
        let loaded = self.store.try_load()?.into_vec();
        let mut report = CycleReport::default();

        if loaded.is_empty() {
            tracing::info!("No targets to monitor");
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for (index, target) in loaded.iter().cloned().enumerate() {
            let context = Arc::clone(&self.context);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let (target, outcome) = context.check(target).await;
                (index, target, outcome)
            });
        }

        let mut results = loaded;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, target, outcome)) => {
                    results[index] = target;
                    report.record(outcome);
                }
                Err(e) => {
                    tracing::error!("Target check task failed: {}", e);
                    report.aborted += 1;
                }
            }
        }

        // Edits made while the checks ran must survive the write-back
        let targets = merge_checked(self.store.try_load()?, results);
        self.store.save(&targets)?;

        Ok(report)
    }

    /// Polls until `shutdown` flips to true
    ///
    /// A shutdown requested mid-cycle lets the cycle finish and persist first;
    /// one requested while sleeping ends the loop immediately.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), WatchError> {
        tracing::info!(
            "Starting slot watcher (interval {}s)",
            self.interval.as_secs()
        );

        let mut cycles: u64 = 0;
        loop {
            let started = Instant::now();
            match self.run_cycle().await {
                Ok(report) => {
                    cycles += 1;
                    tracing::info!(
                        "Cycle {} done in {:?}: {} checked, {} fetch/{} dispatch failures, \
                         {} notified, {} suppressed",
                        cycles,
                        started.elapsed(),
                        report.checked,
                        report.fetch_failures,
                        report.dispatch_failures,
                        report.notified,
                        report.suppressed
                    );
                }
                Err(e) => tracing::error!("Poll cycle failed: {}", e),
            }

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!("Slot watcher stopped after {} cycles", cycles);
        Ok(())
    }
}

/// Folds checked targets into the store's current contents
///
/// Targets removed during the cycle stay removed and targets added during it
/// are kept as stored. A result is dropped when its URL no longer matches,
/// since it describes a page the target no longer points at.
fn merge_checked(mut current: TargetMap, checked: Vec<Target>) -> TargetMap {
    for target in checked {
        match current.get_mut(&target.name) {
            Some(stored) if stored.url == target.url => *stored = target,
            Some(_) => tracing::debug!("{} changed URL mid-cycle, dropping result", target.name),
            None => tracing::debug!("{} was removed mid-cycle, dropping result", target.name),
        }
    }
    current
}

/// Spawns a task that flips the returned receiver on SIGINT or SIGTERM
pub fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown requested, finishing current cycle");
        let _ = tx.send(true);
        // Keep the sender alive so the receiver never sees a closed channel
        std::future::pending::<()>().await;
    });

    rx
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Cannot listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
