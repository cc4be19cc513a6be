//! Live view of one turnstile page.
//!
//! A [`LiveView`] task owns the page on display and is the only code that mutates it.
//! It consumes three inputs:
//!
//! - pushed turnstile updates (reconciled with [`classify`])
//! - [`Command`]s from the UI (`ShowPage`, `Updated`, `Reload`, `Clear`)
//! - completions of the re-fetches it started
//!
//! Re-fetches run concurrently and are applied in completion order. Each carries a
//! sequence number (per turnstile id for item re-fetches, one counter for page
//! loads); a result older than one already applied is discarded. After every input
//! the task publishes a new [`Snapshot`] on a `watch` channel.

use crate::error::{describe_error, HalError, Result};
use crate::turnstile::reconcile::{classify, patch_message, place, Reconciliation};
use crate::turnstile::service::TurnstileSource;
use crate::turnstile::types::{TurnstilePage, TurnstileResource};
use crate::types::PageRequest;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Requests from the UI to the live view.
#[derive(Debug, Clone)]
pub enum Command {
    /// Display this page (already fetched by the caller).
    ShowPage(TurnstilePage),
    /// The caller obtained a fresh copy of a turnstile.
    Updated(TurnstileResource),
    /// Re-read the current page.
    Reload,
    /// Drop the page on display and start over.
    Clear,
}

/// What observers see after each step.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Page on display, if one has been loaded.
    pub page: Option<Arc<TurnstilePage>>,
    /// Incremented on every publish.
    pub revision: u64,
    /// Text of the last failed load, cleared by the next successful one.
    pub error: Option<String>,
    /// Re-fetches still running.
    pub in_flight: usize,
}

impl Snapshot {
    /// Turnstile `id` on the displayed page.
    pub fn item(&self, id: i64) -> Option<&TurnstileResource> {
        self.page
            .as_ref()
            .and_then(|page| page.embedded.turnstiles.iter().find(|item| item.id == id))
    }
}

/// Paging defaults used when reloading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadDefaults {
    /// Page size when nothing is displayed yet.
    pub size: u32,
    /// Sort sent with every reload.
    pub sort: Option<String>,
}

enum Outcome {
    Page {
        seq: u64,
        result: Result<TurnstilePage>,
        place: Option<TurnstileResource>,
    },
    Item {
        id: i64,
        seq: u64,
        result: Result<TurnstileResource>,
    },
}

type InFlight = FuturesUnordered<BoxFuture<'static, Outcome>>;

/// Cloneable handle to a running [`LiveView`].
#[derive(Clone)]
pub struct LiveViewHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Snapshot>,
}

impl LiveViewHandle {
    /// Send a command. Returns `false` if the live view has stopped.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Display `page` as is.
    pub fn show_page(&self, page: TurnstilePage) -> bool {
        self.send(Command::ShowPage(page))
    }

    /// Apply a turnstile the user just changed.
    pub fn updated(&self, item: TurnstileResource) -> bool {
        self.send(Command::Updated(item))
    }

    /// Reload the displayed page.
    pub fn reload(&self) -> bool {
        self.send(Command::Reload)
    }

    /// Drop the displayed page.
    pub fn clear(&self) -> bool {
        self.send(Command::Clear)
    }

    /// Latest snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified on every publish.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`.
    pub async fn wait_for(&self, mut predicate: impl FnMut(&Snapshot) -> bool) -> Result<Snapshot> {
        let mut rx = self.snapshots.clone();
        loop {
            {
                let current = rx.borrow_and_update();
                if predicate(&current) {
                    return Ok(current.clone());
                }
            }
            rx.changed()
                .await
                .map_err(|_| HalError::Push("live view stopped".to_string()))?;
        }
    }
}

/// The reconciliation task.
pub struct LiveView<S> {
    source: Arc<S>,
    defaults: ReloadDefaults,
    page: Option<Arc<TurnstilePage>>,
    error: Option<String>,
    revision: u64,
    page_seq: u64,
    applied_page_seq: u64,
    item_seq: HashMap<i64, u64>,
    applied_item_seq: HashMap<i64, u64>,
    /// Re-fetches still running, per turnstile id.
    refreshing: HashMap<i64, usize>,
    snapshots: watch::Sender<Snapshot>,
}

impl<S: TurnstileSource + 'static> LiveView<S> {
    /// Spawn the task. It runs until every [`LiveViewHandle`] is dropped.
    pub fn spawn<U>(source: Arc<S>, updates: U, defaults: ReloadDefaults) -> (LiveViewHandle, JoinHandle<()>)
    where
        U: Stream<Item = Result<TurnstileResource>> + Send + Unpin + 'static,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (snapshots, snapshot_rx) = watch::channel(Snapshot::default());
        let view = LiveView {
            source,
            defaults,
            page: None,
            error: None,
            revision: 0,
            page_seq: 0,
            applied_page_seq: 0,
            item_seq: HashMap::new(),
            applied_item_seq: HashMap::new(),
            refreshing: HashMap::new(),
            snapshots,
        };
        let task = tokio::spawn(view.run(updates, command_rx));
        (
            LiveViewHandle {
                commands,
                snapshots: snapshot_rx,
            },
            task,
        )
    }

    async fn run<U>(mut self, mut updates: U, mut commands: mpsc::UnboundedReceiver<Command>)
    where
        U: Stream<Item = Result<TurnstileResource>> + Send + Unpin + 'static,
    {
        let mut in_flight: InFlight = FuturesUnordered::new();
        let mut updates_open = true;

        loop {
            // UI commands first, then completed fetches, then pushes.
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command, &mut in_flight),
                    None => break,
                },
                Some(outcome) = in_flight.next(), if !in_flight.is_empty() => {
                    self.on_outcome(outcome, &mut in_flight);
                }
                update = updates.next(), if updates_open => match update {
                    Some(Ok(update)) => self.on_push(update, &mut in_flight),
                    Some(Err(e)) => tracing::warn!("Ignoring push update: {}", e),
                    None => {
                        tracing::info!("Push updates ended");
                        updates_open = false;
                    }
                },
            }
            self.publish(in_flight.len());
        }
        tracing::debug!("Live view stopped");
    }

    fn on_push(&mut self, update: TurnstileResource, in_flight: &mut InFlight) {
        match classify(self.page.as_deref(), &update) {
            Reconciliation::PatchMessage { index } => {
                if let Some(page) = self.page.as_mut() {
                    patch_message(Arc::make_mut(page), index, update.message);
                }
            }
            Reconciliation::Refetch { index } => {
                let held = self
                    .page
                    .as_ref()
                    .and_then(|page| page.embedded.turnstiles.get(index).cloned());
                if let Some(held) = held {
                    self.start_refresh(held, in_flight);
                }
            }
            Reconciliation::Reload => {
                tracing::debug!("Turnstile {} not on display, reloading page", update.id);
                self.start_reload(None, in_flight);
            }
        }
    }

    fn on_command(&mut self, command: Command, in_flight: &mut InFlight) {
        match command {
            Command::ShowPage(page) => {
                self.page_seq += 1;
                self.applied_page_seq = self.page_seq;
                self.page = Some(Arc::new(page));
                self.error = None;
                self.prune_item_seqs();
            }
            Command::Updated(item) => {
                let seq = self.next_item_seq(item.id);
                self.applied_item_seq.insert(item.id, seq);
                self.apply_fresh(item, in_flight);
            }
            Command::Reload => self.start_reload(None, in_flight),
            Command::Clear => self.page = None,
        }
    }

    fn on_outcome(&mut self, outcome: Outcome, in_flight: &mut InFlight) {
        match outcome {
            Outcome::Page { seq, result, place: fresh } => {
                if seq <= self.applied_page_seq {
                    tracing::debug!("Discarding stale page load {}", seq);
                    return;
                }
                self.applied_page_seq = seq;
                match result {
                    Ok(mut page) => {
                        if let Some(fresh) = fresh {
                            place(&mut page, &fresh);
                        }
                        self.page = Some(Arc::new(page));
                        self.error = None;
                        self.prune_item_seqs();
                    }
                    Err(e) => {
                        tracing::warn!("Page load failed: {}", e);
                        self.error = Some(describe_error(&e));
                    }
                }
            }
            Outcome::Item { id, seq, result } => {
                if let Some(count) = self.refreshing.get_mut(&id) {
                    *count -= 1;
                    if *count == 0 {
                        self.refreshing.remove(&id);
                    }
                }
                if seq <= self.applied_item_seq.get(&id).copied().unwrap_or(0) {
                    tracing::debug!("Discarding stale re-fetch {} of turnstile {}", seq, id);
                    return;
                }
                self.applied_item_seq.insert(id, seq);
                match result {
                    Ok(fresh) => self.apply_fresh(fresh, in_flight),
                    Err(e) if e.is_not_found() => {
                        tracing::debug!("Turnstile {} is gone, reloading page", id);
                        self.start_reload(None, in_flight);
                    }
                    Err(e) => {
                        tracing::warn!("Re-fetch of turnstile {} failed: {}", id, e);
                        self.error = Some(describe_error(&e));
                    }
                }
            }
        }
    }

    /// Put a fresh turnstile in its slot, or reload the page and place it afterwards.
    fn apply_fresh(&mut self, fresh: TurnstileResource, in_flight: &mut InFlight) {
        let placed = match self.page.as_mut() {
            Some(page) => place(Arc::make_mut(page), &fresh),
            None => false,
        };
        if !placed {
            self.start_reload(Some(fresh), in_flight);
        }
    }

    fn start_refresh(&mut self, held: TurnstileResource, in_flight: &mut InFlight) {
        let id = held.id;
        let seq = self.next_item_seq(id);
        *self.refreshing.entry(id).or_insert(0) += 1;
        let source = self.source.clone();
        in_flight.push(Box::pin(async move {
            let result = source.refresh(held).await;
            Outcome::Item { id, seq, result }
        }));
    }

    fn start_reload(&mut self, fresh: Option<TurnstileResource>, in_flight: &mut InFlight) {
        self.page_seq += 1;
        let seq = self.page_seq;
        let request = self.reload_request();
        let source = self.source.clone();
        in_flight.push(Box::pin(async move {
            let result = source.reload(request).await;
            Outcome::Page {
                seq,
                result,
                place: fresh,
            }
        }));
    }

    fn next_item_seq(&mut self, id: i64) -> u64 {
        let seq = self.item_seq.entry(id).or_insert(0);
        *seq += 1;
        *seq
    }

    /// Forget sequence numbers of turnstiles that left the display and have no
    /// re-fetch running. A later fetch for them starts again from 1.
    fn prune_item_seqs(&mut self) {
        let page = self.page.clone();
        let refreshing = &self.refreshing;
        let keep = |id: &i64| {
            refreshing.contains_key(id)
                || page
                    .as_ref()
                    .map(|page| page.embedded.turnstiles.iter().any(|t| t.id == *id))
                    .unwrap_or(false)
        };
        self.item_seq.retain(|id, _| keep(id));
        self.applied_item_seq.retain(|id, _| keep(id));
    }

    fn reload_request(&self) -> PageRequest {
        let (page, size) = match &self.page {
            Some(current) if current.page.size > 0 => (current.page.number, current.page.size),
            Some(current) => (current.page.number, self.defaults.size),
            None => (0, self.defaults.size),
        };
        PageRequest {
            sort: self.defaults.sort.clone(),
            size: Some(size),
            page: Some(page),
        }
    }

    fn publish(&mut self, in_flight: usize) {
        self.revision += 1;
        self.snapshots.send_replace(Snapshot {
            page: self.page.clone(),
            revision: self.revision,
            error: self.error.clone(),
            in_flight,
        });
    }
}
