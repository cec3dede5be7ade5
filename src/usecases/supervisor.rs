//! Price Supervisor - Owner of the Live Price State
//!
//! One tokio task owns the price cache, the row board, the channel state
//! and the poll timer. Everything that mutates them arrives as an event on
//! that task: channel events, fallback results, poll ticks and commands
//! from [`PriceHandle`]s. Each event runs to completion before the next, so
//! no locking is needed and a merge is fully applied before any row is
//! re-rendered.
//!
//! Network work never runs on the task itself. Fallback fetches are spawned
//! and report back through a channel; a result that lands after the poll
//! loop was cancelled is still merged.
//!
//! Refresh policy, owned here and nowhere else:
//! - channel `Open`: stream only, poll timer dropped;
//! - any other state: poll every `poll_interval`.

use std::collections::HashSet;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::domain::board::{CellWrite, PriceBoard, RowBinding};
use crate::domain::cache::{PriceCache, PriceMap};
use crate::domain::connection::{ConnectionState, RefreshMode, Transition};
use crate::domain::feed::{classify_text, FeedUpdate};
use crate::domain::keys::{LookupKey, RowId};
use crate::ports::display::PriceDisplay;
use crate::ports::price_channel::{ChannelEvent, PriceChannel};
use crate::ports::telemetry::PriceTelemetry;

use super::fallback::BatchedFallback;

/// Default poll period while the stream is down.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Buffer for commands, channel events and fallback results.
const QUEUE_CAPACITY: usize = 1024;

/// Point-in-time view of the supervisor, published on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorStatus {
    /// Streaming channel state.
    pub connection: ConnectionState,
    /// Whether the poll timer is armed.
    pub polling: bool,
    /// Rows currently bound.
    pub rows: usize,
    /// Entries in the price cache.
    pub cache_entries: usize,
}

impl SupervisorStatus {
    /// Active refresh mechanism.
    pub const fn refresh_mode(&self) -> RefreshMode {
        self.connection.refresh_mode()
    }
}

/// Requests accepted by the supervisor task.
#[derive(Debug)]
enum Command {
    StartChannel,
    ReplaceRows {
        scope: String,
        rows: Vec<RowBinding>,
    },
    AttachResolution {
        row: RowId,
        scrip_code: Option<String>,
        key: LookupKey,
    },
    Prices {
        keys: Vec<LookupKey>,
        reply: oneshot::Sender<PriceMap>,
    },
    PriceOrFallback {
        key: LookupKey,
        reply: oneshot::Sender<Option<f64>>,
    },
    Unpriced {
        scope: String,
        reply: oneshot::Sender<Vec<RowId>>,
    },
}

/// Who is waiting for a fallback fetch.
#[derive(Debug)]
enum FetchReply {
    /// Poll sweep, nobody waits.
    Poll,
    Many(oneshot::Sender<PriceMap>),
    Single(LookupKey, oneshot::Sender<Option<f64>>),
}

#[derive(Debug)]
struct FallbackResult {
    prices: PriceMap,
    reply: FetchReply,
}

/// Cloneable entry point for the rest of the application.
#[derive(Debug, Clone)]
pub struct PriceHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<SupervisorStatus>,
}

impl PriceHandle {
    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("price supervisor stopped"))
    }

    /// Start the streaming channel. Safe to call repeatedly: a channel that
    /// is connecting or open is left alone.
    pub async fn start_channel(&self) -> Result<()> {
        self.send(Command::StartChannel).await
    }

    /// Replace every row under `scope` with `rows` and render them.
    pub async fn replace_rows(&self, scope: impl Into<String>, rows: Vec<RowBinding>) -> Result<()> {
        self.send(Command::ReplaceRows {
            scope: scope.into(),
            rows,
        })
        .await
    }

    /// Attach a resolved scrip code and option key to a bound row.
    pub async fn attach_resolution(
        &self,
        row: impl Into<RowId>,
        scrip_code: Option<String>,
        key: LookupKey,
    ) -> Result<()> {
        self.send(Command::AttachResolution {
            row: row.into(),
            scrip_code,
            key,
        })
        .await
    }

    /// Prices for an explicit key set.
    ///
    /// While the stream is open this answers from the cache only and never
    /// touches the network; otherwise all keys go through the batched REST
    /// fallback and the result is merged into the cache before returning.
    pub async fn prices(&self, keys: Vec<LookupKey>) -> Result<PriceMap> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Prices { keys, reply }).await?;
        rx.await.context("price supervisor dropped the request")
    }

    /// One key: cache first; if missing and the stream is open, wait for the
    /// stream (`None`); otherwise a single REST request.
    pub async fn price_or_fallback(&self, key: LookupKey) -> Result<Option<f64>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::PriceOrFallback { key, reply }).await?;
        rx.await.context("price supervisor dropped the request")
    }

    /// Rows under `scope` that still display no price.
    pub async fn unpriced_rows(&self, scope: impl Into<String>) -> Result<Vec<RowId>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Unpriced {
            scope: scope.into(),
            reply,
        })
        .await?;
        rx.await.context("price supervisor dropped the request")
    }

    /// Latest published status.
    pub fn status(&self) -> SupervisorStatus {
        *self.status.borrow()
    }

    /// Watch channel for status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<SupervisorStatus> {
        self.status.clone()
    }
}

/// Single-task owner of cache, board, channel state and poll timer.
pub struct PriceSupervisor {
    /// Last price per lookup key.
    cache: PriceCache,
    /// Displayed rows and their cell text.
    board: PriceBoard,
    /// Streaming channel state.
    connection: ConnectionState,
    /// Armed only while the channel is not open.
    poll: Option<Interval>,
    /// Poll period.
    poll_interval: Duration,
    /// REST fallback shared with spawned fetches.
    fallback: Arc<BatchedFallback>,
    /// Streaming transport.
    channel: Arc<dyn PriceChannel>,
    /// Running channel session, if any.
    session: Option<JoinHandle<()>>,
    /// Cell sink.
    display: Arc<dyn PriceDisplay>,
    /// Counters.
    telemetry: Arc<dyn PriceTelemetry>,
    commands_rx: mpsc::Receiver<Command>,
    events_tx: mpsc::Sender<ChannelEvent>,
    events_rx: mpsc::Receiver<ChannelEvent>,
    results_tx: mpsc::Sender<FallbackResult>,
    results_rx: mpsc::Receiver<FallbackResult>,
    status_tx: watch::Sender<SupervisorStatus>,
}

impl PriceSupervisor {
    /// Create the supervisor and its handle. Nothing runs until
    /// [`PriceSupervisor::run`] is spawned.
    pub fn new(
        fallback: Arc<BatchedFallback>,
        channel: Arc<dyn PriceChannel>,
        display: Arc<dyn PriceDisplay>,
        telemetry: Arc<dyn PriceTelemetry>,
        poll_interval: Duration,
    ) -> (Self, PriceHandle) {
        let (commands_tx, commands_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (results_tx, results_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (status_tx, status_rx) = watch::channel(SupervisorStatus {
            connection: ConnectionState::Disconnected,
            polling: false,
            rows: 0,
            cache_entries: 0,
        });

        let supervisor = Self {
            cache: PriceCache::new(),
            board: PriceBoard::new(),
            connection: ConnectionState::Disconnected,
            poll: None,
            poll_interval,
            fallback,
            channel,
            session: None,
            display,
            telemetry,
            commands_rx,
            events_tx,
            events_rx,
            results_tx,
            results_rx,
            status_tx,
        };
        let handle = PriceHandle {
            commands: commands_tx,
            status: status_rx,
        };
        (supervisor, handle)
    }

    /// Run the event loop until shutdown or until every handle is dropped.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        self.sync_refresh_mode();
        self.publish_status();
        info!(poll_interval_ms = self.poll_interval.as_millis(), "Price supervisor started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Price supervisor shutting down");
                    break;
                }
                Some(event) = self.events_rx.recv() => self.on_channel_event(event),
                Some(result) = self.results_rx.recv() => self.on_fallback_result(result),
                command = self.commands_rx.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => {
                        info!("All price handles dropped, supervisor exiting");
                        break;
                    }
                },
                _ = next_poll(&mut self.poll) => self.on_poll_tick(),
            }
        }

        if let Some(session) = self.session.take() {
            session.abort();
        }
        Ok(())
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::StartChannel => self.start_channel(),
            Command::ReplaceRows { scope, rows } => {
                let count = rows.len();
                let (writes, removed) = self.board.replace_scope(&scope, rows, &self.cache);
                for row in &removed {
                    self.display.remove_row(row);
                }
                debug!(scope = %scope, rows = count, removed = removed.len(), "Rows bound");
                self.flush(writes);
            }
            Command::AttachResolution { row, scrip_code, key } => {
                debug!(row = %row, key = %key, scrip_code = ?scrip_code, "Resolution attached");
                let write = self.board.attach_resolution(&row, scrip_code, key, &self.cache);
                self.flush(write.into_iter().collect());
            }
            Command::Prices { keys, reply } => {
                if self.connection.is_open() {
                    let _ = reply.send(self.cache.resident(&keys));
                } else {
                    self.spawn_fetch(keys, FetchReply::Many(reply));
                }
            }
            Command::PriceOrFallback { key, reply } => {
                if let Some(price) = self.cache.get(key.as_str()) {
                    let _ = reply.send(Some(price));
                } else if self.connection.is_open() {
                    let _ = reply.send(None);
                } else {
                    self.spawn_fetch(vec![key.clone()], FetchReply::Single(key, reply));
                }
            }
            Command::Unpriced { scope, reply } => {
                let _ = reply.send(self.board.unpriced(&scope));
            }
        }
        self.publish_status();
    }

    /// Open the streaming channel unless it is already connecting or open.
    fn start_channel(&mut self) {
        let next = self.connection.next(Transition::Connect);
        if next == self.connection {
            debug!(state = %self.connection, "Channel already started");
            return;
        }
        self.set_connection(next);

        let channel = Arc::clone(&self.channel);
        let events = self.events_tx.clone();
        self.session = Some(tokio::spawn(async move {
            channel.run_session(events).await;
        }));
        info!("Price channel connecting");
    }

    fn on_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Opened => {
                info!("Price channel open, poll loop cancelled");
                self.set_connection(self.connection.next(Transition::Opened));
            }
            ChannelEvent::Message(text) => self.on_feed_message(&text),
            ChannelEvent::Closed { reason } => {
                info!(reason = reason.as_deref().unwrap_or("closed"), "Price channel down, falling back to polling");
                self.session = None;
                self.set_connection(self.connection.next(Transition::Closed));
            }
        }
        self.publish_status();
    }

    fn on_feed_message(&mut self, text: &str) {
        let (shape, update) = match classify_text(text) {
            Ok(classified) => classified,
            Err(e) => {
                debug!(error = %e, len = text.len(), "Dropping feed message");
                self.telemetry.feed_message("dropped");
                return;
            }
        };
        self.telemetry.feed_message(shape.as_str());

        match update {
            FeedUpdate::ScripTick { scrip_code, price } => {
                let writes = self.board.apply_scrip_tick(&scrip_code, price);
                self.flush(writes);
            }
            FeedUpdate::Prices(prices) => self.merge(prices),
        }
    }

    fn on_fallback_result(&mut self, result: FallbackResult) {
        let FallbackResult { prices, reply } = result;
        match reply {
            FetchReply::Poll => self.merge(prices),
            FetchReply::Many(reply) => {
                self.merge(prices.clone());
                let _ = reply.send(prices);
            }
            FetchReply::Single(key, reply) => {
                let price = prices.get(key.as_str()).copied();
                self.merge(prices);
                let _ = reply.send(price);
            }
        }
        self.publish_status();
    }

    fn on_poll_tick(&mut self) {
        let keys: Vec<LookupKey> = self.board.tracked_keys().into_iter().collect();
        if keys.is_empty() {
            return;
        }
        debug!(keys = keys.len(), "Poll tick");
        self.spawn_fetch(keys, FetchReply::Poll);
    }

    /// Merge into the cache, then re-render the rows that reference any of
    /// the updated keys.
    fn merge(&mut self, prices: PriceMap) {
        if prices.is_empty() {
            return;
        }
        let changed: HashSet<LookupKey> = self.cache.merge_all(prices);
        let writes = self.board.refresh(&self.cache, &changed);
        self.telemetry.cache_entries(self.cache.len());
        self.flush(writes);
    }

    fn flush(&self, writes: Vec<CellWrite>) {
        if writes.is_empty() {
            return;
        }
        for write in &writes {
            self.display.write_price(&write.row, &write.text);
        }
        self.telemetry.cell_writes(writes.len());
    }

    fn spawn_fetch(&self, keys: Vec<LookupKey>, reply: FetchReply) {
        let fallback = Arc::clone(&self.fallback);
        let results = self.results_tx.clone();
        tokio::spawn(async move {
            let prices = fallback.fetch(&keys).await;
            if results.send(FallbackResult { prices, reply }).await.is_err() {
                warn!("Price supervisor gone, fallback result dropped");
            }
        });
    }

    fn set_connection(&mut self, state: ConnectionState) {
        self.connection = state;
        self.telemetry.channel_open(state.is_open());
        self.sync_refresh_mode();
    }

    /// Arm or drop the poll timer to match the connection state.
    fn sync_refresh_mode(&mut self) {
        match self.connection.refresh_mode() {
            RefreshMode::Polling if self.poll.is_none() => {
                let mut timer = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.poll = Some(timer);
                info!(interval_ms = self.poll_interval.as_millis(), "Poll loop started");
            }
            RefreshMode::Streaming if self.poll.is_some() => {
                self.poll = None;
                info!("Poll loop stopped");
            }
            _ => {}
        }
    }

    fn publish_status(&self) {
        let status = self.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    /// Current status.
    pub fn status(&self) -> SupervisorStatus {
        SupervisorStatus {
            connection: self.connection,
            polling: self.poll.is_some(),
            rows: self.board.len(),
            cache_entries: self.cache.len(),
        }
    }
}

/// Next tick of the poll timer, or never when polling is off.
async fn next_poll(poll: &mut Option<Interval>) {
    match poll {
        Some(timer) => {
            timer.tick().await;
        }
        None => pending::<()>().await,
    }
}
