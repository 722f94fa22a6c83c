//! List view-model built on [`RecordClient`].
//!
//! One task owns the entity list. UI commands and the results of client
//! calls arrive on queues that only this task drains, so results are
//! applied one at a time no matter what order the store answers in. Each
//! client call runs in its own spawned task and posts its outcome back.
//! Observers read snapshots through a `watch` channel.

use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::client::RecordClient;
use crate::codec::RecordCodec;
use crate::core::{CREATION_DATE_KEY, RecordId, Result, SyncError};
use crate::query::{Filter, SortDescriptor};

/// What the list shows.
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub filter: Filter,
    pub sort: Vec<SortDescriptor>,
    pub limit: Option<usize>,
}

impl ListRequest {
    pub fn all() -> Self {
        Self {
            filter: Filter::all(),
            sort: Vec::new(),
            limit: None,
        }
    }

    /// Every record, most recently created first.
    pub fn newest_first() -> Self {
        Self::all().sort_by(SortDescriptor::descending(CREATION_DATE_KEY))
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn sort_by(mut self, descriptor: SortDescriptor) -> Self {
        self.sort.push(descriptor);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl Default for ListRequest {
    fn default() -> Self {
        Self::all()
    }
}

/// Snapshot published after every change.
#[derive(Debug, Clone)]
pub struct ListState<T> {
    pub items: Vec<T>,
    /// Most recent failure, cleared by the next successful fetch.
    pub error: Option<SyncError>,
    /// Client calls dispatched but not yet answered.
    pub in_flight: usize,
    /// Commands the owner task has taken off its queue.
    pub commands_handled: u64,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            error: None,
            in_flight: 0,
            commands_handled: 0,
        }
    }
}

enum Command<T> {
    Refresh,
    Add(T),
    Update(T),
    DeleteAt(usize),
}

enum Outcome<T> {
    Fetched { seq: u64, result: Result<Vec<T>> },
    Saved(Result<RecordId>),
    Deleted { id: Option<RecordId>, result: Result<bool> },
}

/// Handle to a running list model. Dropping it stops the owner task once
/// in-flight calls have answered.
pub struct RecordListModel<T> {
    commands: mpsc::UnboundedSender<Command<T>>,
    state: watch::Receiver<ListState<T>>,
    issued: AtomicU64,
    task: JoinHandle<()>,
}

impl<T> RecordListModel<T>
where
    T: RecordCodec + Clone,
{
    /// Starts the owner task and issues the initial fetch.
    pub fn spawn(client: RecordClient, request: ListRequest) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ListState::default());

        let owner = ListOwner::new(client, request, state_tx);
        let task = tokio::spawn(owner.run(command_rx));

        let model = Self {
            commands,
            state,
            issued: AtomicU64::new(0),
            task,
        };
        model.send(Command::Refresh);
        model
    }

    pub fn refresh(&self) {
        self.send(Command::Refresh);
    }

    /// Saves a new entity, then re-fetches the list.
    pub fn add(&self, item: T) {
        self.send(Command::Add(item));
    }

    /// Overwrites a stored entity, then re-fetches the list.
    pub fn update(&self, item: T) {
        self.send(Command::Update(item));
    }

    /// Deletes the entity at `index` in the current list; it is removed
    /// locally once the store confirms.
    pub fn delete_at(&self, index: usize) {
        self.send(Command::DeleteAt(index));
    }

    pub fn state(&self) -> ListState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState<T>> {
        self.state.clone()
    }

    /// Waits until every command sent so far has been handled and no
    /// client call is outstanding.
    pub async fn settled(&self) -> ListState<T> {
        let issued = self.issued.load(Ordering::SeqCst);
        let mut state = self.state.clone();
        let done = state
            .wait_for(|s| s.commands_handled >= issued && s.in_flight == 0)
            .await
            .map(|snapshot| snapshot.clone());
        match done {
            Ok(snapshot) => snapshot,
            Err(_) => state.borrow().clone(),
        }
    }

    /// Stops accepting commands and waits for the owner task to finish.
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(err) = task.await {
            warn!("list model task ended abnormally: {}", err);
        }
    }

    fn send(&self, command: Command<T>) {
        if self.commands.send(command).is_err() {
            warn!("list model for '{}' is no longer running", T::RECORD_TYPE);
            return;
        }
        self.issued.fetch_add(1, Ordering::SeqCst);
    }
}

struct ListOwner<T> {
    client: RecordClient,
    request: ListRequest,
    state: watch::Sender<ListState<T>>,
    outcomes_tx: mpsc::UnboundedSender<Outcome<T>>,
    outcomes_rx: mpsc::UnboundedReceiver<Outcome<T>>,
    items: Vec<T>,
    next_fetch: u64,
    applied_fetch: u64,
}

impl<T> ListOwner<T>
where
    T: RecordCodec + Clone,
{
    fn new(client: RecordClient, request: ListRequest, state: watch::Sender<ListState<T>>) -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        Self {
            client,
            request,
            state,
            outcomes_tx,
            outcomes_rx,
            items: Vec::new(),
            next_fetch: 0,
            applied_fetch: 0,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command<T>>) {
        let mut accepting = true;
        loop {
            let in_flight = self.state.borrow().in_flight;
            if !accepting && in_flight == 0 {
                break;
            }

            tokio::select! {
                command = commands.recv(), if accepting => match command {
                    Some(command) => self.handle_command(command),
                    None => accepting = false,
                },
                Some(outcome) = self.outcomes_rx.recv() => self.apply(outcome),
            }
        }
        debug!("list model for '{}' stopped", T::RECORD_TYPE);
    }

    fn handle_command(&mut self, command: Command<T>) {
        match command {
            Command::Refresh => self.dispatch_fetch(),
            Command::Add(item) => self.dispatch_save(item, false),
            Command::Update(item) => self.dispatch_save(item, true),
            Command::DeleteAt(index) => match self.items.get(index).cloned() {
                Some(item) => self.dispatch_delete(item),
                None => warn!("delete ignored: no '{}' at index {}", T::RECORD_TYPE, index),
            },
        }
        self.state.send_modify(|s| s.commands_handled += 1);
    }

    fn dispatch_fetch(&mut self) {
        self.next_fetch += 1;
        let seq = self.next_fetch;
        let client = self.client.clone();
        let request = self.request.clone();
        self.spawn_call(async move {
            let result = client.query(request.filter, request.sort, request.limit).await;
            Outcome::Fetched { seq, result }
        });
    }

    fn dispatch_save(&mut self, item: T, update: bool) {
        let client = self.client.clone();
        self.spawn_call(async move {
            let result = if update {
                client.update(&item).await
            } else {
                client.create(&item).await
            };
            Outcome::Saved(result)
        });
    }

    fn dispatch_delete(&mut self, item: T) {
        let client = self.client.clone();
        self.spawn_call(async move {
            let id = item.record_id().cloned();
            let result = client.delete(&item).await;
            Outcome::Deleted { id, result }
        });
    }

    fn spawn_call<F>(&mut self, call: F)
    where
        F: std::future::Future<Output = Outcome<T>> + Send + 'static,
    {
        self.state.send_modify(|s| s.in_flight += 1);
        let outcomes = self.outcomes_tx.clone();
        tokio::spawn(async move {
            // The owner only goes away after every in-flight call answered.
            let _ = outcomes.send(call.await);
        });
    }

    fn apply(&mut self, outcome: Outcome<T>) {
        let mut error = None;
        let mut clear_error = false;

        match outcome {
            Outcome::Fetched { seq, result } => match result {
                // A fetch issued before the one already applied is stale.
                Ok(items) if seq > self.applied_fetch => {
                    self.applied_fetch = seq;
                    self.items = items;
                    clear_error = true;
                }
                Ok(_) => debug!("stale fetch #{} discarded", seq),
                Err(err) if seq > self.applied_fetch => error = Some(err),
                Err(err) => debug!("stale fetch #{} failed: {}", seq, err),
            },
            Outcome::Saved(result) => match result {
                Ok(id) => {
                    debug!("saved '{}' {}, refreshing", T::RECORD_TYPE, id);
                    self.dispatch_fetch();
                }
                Err(err) => error = Some(err),
            },
            Outcome::Deleted { id, result } => match (result, id) {
                (Ok(_), Some(id)) => self.items.retain(|item| item.record_id() != Some(&id)),
                (Ok(_), None) => {}
                (Err(err), _) => error = Some(err),
            },
        }

        if let Some(err) = &error {
            warn!("'{}' list operation failed: {}", T::RECORD_TYPE, err);
        }

        let items = self.items.clone();
        self.state.send_modify(|s| {
            s.in_flight -= 1;
            s.items = items;
            if error.is_some() {
                s.error = error;
            } else if clear_error {
                s.error = None;
            }
        });
    }
}
