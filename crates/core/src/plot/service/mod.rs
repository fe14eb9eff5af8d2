//! The plot service owns every [`PlotWorld`] on a dedicated thread. Callers
//! hand it closures and block until the result comes back, so plot state is
//! never shared between threads.

mod save;
mod state;

pub use save::{SaveJob, SaveQueue, SaveWorker, SharedStorage};
pub use state::{PlotLocation, ServiceState};

use super::roads::WorldEditor;
use super::{MergeDirection, Plot, PlotBounds, PlotId, PlotWorld};
use crate::config::PluginConfig;
use crate::utils::{lock, panic_message};
use allayplots_save_data::{PlotStorage, StorageError, WorldRecords};
use once_cell::sync::OnceCell;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("the plot service is not running")]
    NotRunning,
    #[error("a plot service task panicked")]
    TaskFailed,
    #[error("the plot service cannot wait on itself")]
    Reentrant,
    #[error("saving plot data failed: {0}")]
    SaveFailed(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to spawn plot thread")]
    Spawn(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimResult {
    Success,
    AlreadyClaimed,
    TooMany,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerActionResult {
    Success,
    Unclaimed,
    NotOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeResult {
    Success,
    Unclaimed,
    NotOwner,
    TargetUnclaimed,
    NotSameOwner,
    AlreadyMerged,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmergeResult {
    Success,
    NotMerged,
    Unclaimed,
    NotOwner,
    Failed,
}

type Task = Box<dyn FnOnce(&mut ServiceState) + Send>;

enum Message {
    Task(Task),
    Stop,
}

enum Lifecycle {
    Idle,
    Running {
        sender: Sender<Message>,
        handle: JoinHandle<()>,
        saver: SaveWorker,
    },
    Stopped,
}

pub struct PlotService {
    config: Arc<PluginConfig>,
    storage: SharedStorage,
    editor: Option<Arc<dyn WorldEditor>>,
    saves: SaveQueue,
    lifecycle: Mutex<Lifecycle>,
    thread_id: OnceCell<ThreadId>,
}

impl PlotService {
    pub fn new(
        config: Arc<PluginConfig>,
        storage: Box<dyn PlotStorage>,
        editor: Option<Arc<dyn WorldEditor>>,
    ) -> PlotService {
        PlotService {
            config,
            storage: Arc::new(Mutex::new(storage)),
            editor,
            saves: SaveQueue::default(),
            lifecycle: Mutex::new(Lifecycle::Idle),
            thread_id: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Arc<PluginConfig> {
        &self.config
    }

    pub fn storage_name(&self) -> &'static str {
        lock(&self.storage).name()
    }

    /// Spawns the service and save threads. Calling it again while running
    /// does nothing. A service that was shut down stays down.
    pub fn start(&self) -> Result<(), ServiceError> {
        let mut lifecycle = lock(&self.lifecycle);
        match *lifecycle {
            Lifecycle::Running { .. } => return Ok(()),
            Lifecycle::Stopped => return Err(ServiceError::NotRunning),
            Lifecycle::Idle => {}
        }

        let saver = SaveWorker::spawn(self.saves.clone(), self.storage.clone())?;
        let state = ServiceState::new(
            self.config.clone(),
            self.storage.clone(),
            self.saves.clone(),
            self.editor.clone(),
        );
        let (sender, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("plot-service".to_owned())
            .spawn(move || service_loop(state, receiver))
            .map_err(ServiceError::Spawn)?;
        let _ = self.thread_id.set(handle.thread().id());
        debug!("Plot service started");
        *lifecycle = Lifecycle::Running {
            sender,
            handle,
            saver,
        };
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        matches!(*lock(&self.lifecycle), Lifecycle::Running { .. })
    }

    fn on_service_thread(&self) -> bool {
        self.thread_id.get() == Some(&thread::current().id())
    }

    fn sender(&self) -> Result<Sender<Message>, ServiceError> {
        match &*lock(&self.lifecycle) {
            Lifecycle::Running { sender, .. } => Ok(sender.clone()),
            _ => Err(ServiceError::NotRunning),
        }
    }

    /// Runs `f` on the service thread and waits for its result.
    pub fn run<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&mut ServiceState) -> T + Send + 'static,
    {
        if self.on_service_thread() {
            return Err(ServiceError::Reentrant);
        }
        let sender = self.sender()?;
        let (reply, result) = mpsc::sync_channel(1);
        let task: Task = Box::new(move |state| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(state)));
            let outcome = outcome.map_err(|payload| {
                error!("Plot service task panicked: {}", panic_message(&*payload));
            });
            let _ = reply.send(outcome);
        });
        sender
            .send(Message::Task(task))
            .map_err(|_| ServiceError::NotRunning)?;
        match result.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(())) => Err(ServiceError::TaskFailed),
            Err(_) => Err(ServiceError::NotRunning),
        }
    }

    /// Queues `f` without waiting for it.
    pub fn execute<F>(&self, f: F) -> Result<(), ServiceError>
    where
        F: FnOnce(&mut ServiceState) + Send + 'static,
    {
        let sender = self.sender()?;
        sender
            .send(Message::Task(Box::new(f)))
            .map_err(|_| ServiceError::NotRunning)
    }

    /// Stops the service thread, then writes whatever is still queued and
    /// stops the save thread.
    pub fn shutdown(&self) {
        if self.on_service_thread() {
            warn!("Plot service cannot shut itself down");
            return;
        }
        let lifecycle = std::mem::replace(&mut *lock(&self.lifecycle), Lifecycle::Stopped);
        let Lifecycle::Running {
            sender,
            handle,
            mut saver,
        } = lifecycle
        else {
            return;
        };
        let _ = sender.send(Message::Stop);
        drop(sender);
        if handle.join().is_err() {
            error!("Plot service thread panicked");
        }
        saver.shutdown();
        info!("Plot service stopped");
    }

    pub fn load(&self) -> Result<(), ServiceError> {
        self.run(|state| state.load())??;
        Ok(())
    }

    /// Writes all changes and waits for the write to finish.
    pub fn save(&self) -> Result<(), ServiceError> {
        match self.run(|state| state.submit_save())? {
            Some(ticket) => self.saves.wait_for(ticket),
            None => Ok(()),
        }
    }

    /// Queues a save. Requests made before the save thread gets to them are
    /// written together.
    pub fn request_save(&self) -> Result<(), ServiceError> {
        self.execute(|state| {
            state.submit_save();
        })
    }

    pub fn snapshot(&self) -> Result<WorldRecords, ServiceError> {
        self.run(|state| state.snapshot())
    }

    pub fn plot(&self, world: &str, id: PlotId) -> Result<Option<Plot>, ServiceError> {
        let world = world.to_owned();
        self.run(move |state| state.plot(&world, id).cloned())
    }

    /// Runs `f` against a world, or returns `None` if it is not a plot world.
    pub fn with_world<T, F>(&self, world: &str, f: F) -> Result<Option<T>, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&PlotWorld) -> T + Send + 'static,
    {
        let world = world.to_owned();
        self.run(move |state| state.world(&world).map(f))
    }

    pub fn merged_plot_bounds(&self, world: &str, id: PlotId) -> Result<Option<PlotBounds>, ServiceError> {
        self.with_world(world, move |world| world.merged_plot_bounds(id))
    }

    pub fn resolve_plot(&self, world: &str, x: i32, z: i32) -> Result<Option<PlotLocation>, ServiceError> {
        let world = world.to_owned();
        self.run(move |state| state.resolve_plot(&world, x, z))
    }

    pub fn count_owned_plots(&self, world: &str, owner: u128) -> Result<usize, ServiceError> {
        let world = world.to_owned();
        self.run(move |state| state.count_owned_plots(&world, owner))
    }

    pub fn find_next_free_plot_id(&self, world: &str) -> Result<Option<PlotId>, ServiceError> {
        let world = world.to_owned();
        self.run(move |state| state.find_next_free_plot_id(&world))
    }

    pub fn find_home_plot(&self, owner: u128) -> Result<Option<PlotLocation>, ServiceError> {
        self.run(move |state| state.find_home_plot(owner))
    }

    pub fn resolve_player_name(&self, player: u128) -> Result<Option<String>, ServiceError> {
        self.run(move |state| state.resolve_player_name(player))
    }

    pub fn claim_plot(
        &self,
        world: &str,
        id: PlotId,
        owner: u128,
        owner_name: Option<String>,
        max_plots: u32,
    ) -> Result<ClaimResult, ServiceError> {
        let world = world.to_owned();
        self.run(move |state| state.claim_plot(&world, id, owner, owner_name, max_plots))
    }

    pub fn delete_plot(
        &self,
        world: &str,
        id: PlotId,
        requester: u128,
        bypass: bool,
    ) -> Result<OwnerActionResult, ServiceError> {
        let world = world.to_owned();
        self.run(move |state| state.delete_plot(&world, id, requester, bypass))
    }

    pub fn set_home_plot(&self, owner: u128, world: &str, id: PlotId) -> Result<OwnerActionResult, ServiceError> {
        let world = world.to_owned();
        self.run(move |state| state.set_home_plot(owner, &world, id))
    }

    pub fn set_plot_owner(
        &self,
        world: &str,
        id: PlotId,
        requester: u128,
        bypass: bool,
        new_owner: u128,
        new_owner_name: Option<String>,
    ) -> Result<OwnerActionResult, ServiceError> {
        let world = world.to_owned();
        self.run(move |state| {
            state.set_plot_owner(&world, id, requester, bypass, new_owner, new_owner_name)
        })
    }

    pub fn merge_plots(
        &self,
        world: &str,
        id: PlotId,
        dir: MergeDirection,
        requester: u128,
        bypass: bool,
    ) -> Result<MergeResult, ServiceError> {
        let world = world.to_owned();
        self.run(move |state| state.merge_plots(&world, id, dir, requester, bypass))
    }

    pub fn unmerge_plots(
        &self,
        world: &str,
        id: PlotId,
        dir: MergeDirection,
        requester: u128,
        bypass: bool,
    ) -> Result<UnmergeResult, ServiceError> {
        let world = world.to_owned();
        self.run(move |state| state.unmerge_plots(&world, id, dir, requester, bypass))
    }

    pub fn update_merge_group_owned<F>(
        &self,
        world: &str,
        id: PlotId,
        requester: u128,
        bypass: bool,
        mut updater: F,
    ) -> Result<OwnerActionResult, ServiceError>
    where
        F: FnMut(&mut Plot) -> bool + Send + 'static,
    {
        let world = world.to_owned();
        self.run(move |state| {
            state.update_merge_group_owned(&world, id, requester, bypass, &mut updater)
        })
    }
}

impl Drop for PlotService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn service_loop(mut state: ServiceState, receiver: Receiver<Message>) {
    for message in receiver {
        match message {
            Message::Task(task) => task(&mut state),
            Message::Stop => break,
        }
    }
    // Hand the last changes to the save thread before it drains.
    state.submit_save();
}
