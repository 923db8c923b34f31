use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use encodeck::api::ApiClient;
use encodeck::controller::{Command, Dashboard, Event};
use encodeck::poller::PollerSet;
use encodeck::prefs;

const QUEUE_POLL: Duration = Duration::from_secs(2);
const TELEMETRY_POLL: Duration = Duration::from_secs(1);
const STATS_POLL: Duration = Duration::from_secs(3);
const HISTORY_POLL: Duration = Duration::from_secs(10);
const NOTIFY_TICK: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("encodeck starting...");

    let base_url = std::env::var("ENCODECK_SERVER")
        .unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());
    let store = prefs::open_store(&prefs::data_path()).expect("Failed to open preference store");

    let api = Arc::new(ApiClient::new(base_url));
    let mut dashboard = Dashboard::new(store);

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let mut pollers = PollerSet::new();

    // One-shot initial loads; refreshed again on demand via commands.
    {
        let api = api.clone();
        let tx = tx.clone();
        pollers.spawn_once(async move {
            let _ = tx.send(Event::FilesLoaded(1, api.list_files().await));
            let _ = tx.send(Event::PresetsLoaded(1, api.list_presets().await));
        });
    }

    {
        let api = api.clone();
        let tx = tx.clone();
        pollers.spawn("queue", QUEUE_POLL, move |seq| {
            let api = api.clone();
            let tx = tx.clone();
            async move {
                let _ = tx.send(Event::QueuePolled(seq, api.queue_snapshot().await));
            }
        });
    }

    {
        let api = api.clone();
        let tx = tx.clone();
        pollers.spawn("telemetry", TELEMETRY_POLL, move |seq| {
            let api = api.clone();
            let tx = tx.clone();
            async move {
                let _ = tx.send(Event::TelemetryPolled(seq, api.telemetry().await));
            }
        });
    }

    {
        let api = api.clone();
        let tx = tx.clone();
        pollers.spawn("stats", STATS_POLL, move |seq| {
            let api = api.clone();
            let tx = tx.clone();
            async move {
                let _ = tx.send(Event::StatsPolled(seq, api.system_stats().await));
            }
        });
    }

    {
        let api = api.clone();
        let tx = tx.clone();
        pollers.spawn("history", HISTORY_POLL, move |seq| {
            let api = api.clone();
            let tx = tx.clone();
            async move {
                let _ = tx.send(Event::HistoryLoaded(seq, api.list_history().await));
            }
        });
    }

    {
        let tx = tx.clone();
        pollers.spawn("notify", NOTIFY_TICK, move |_| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(Event::NotifyTick);
            }
        });
    }

    // Manual refreshes reuse the one-shot sequence space, continuing after
    // the initial load's seq 1.
    let mut files_seq: u64 = 1;
    let mut presets_seq: u64 = 1;

    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                match dashboard.update(event) {
                    Some(Command::RefreshFiles) => {
                        files_seq += 1;
                        let seq = files_seq;
                        let api = api.clone();
                        let tx = tx.clone();
                        pollers.spawn_once(async move {
                            let _ = tx.send(Event::FilesLoaded(seq, api.list_files().await));
                        });
                    }
                    Some(Command::RefreshPresets) => {
                        presets_seq += 1;
                        let seq = presets_seq;
                        let api = api.clone();
                        let tx = tx.clone();
                        pollers.spawn_once(async move {
                            let _ = tx.send(Event::PresetsLoaded(seq, api.list_presets().await));
                        });
                    }
                    None => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    pollers.shutdown().await;
    tracing::info!("encodeck stopped");
}
