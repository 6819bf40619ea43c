//! Experiment state machine.
//!
//! `ExperimentController` coordinates the generator, the scheduler, the host
//! data sink and the view. State lives behind mutexes and every method takes
//! `&self`, so the paced drive task and user-facing calls (pause, stop, speed
//! change) interleave at await points without aliasing; locks are never held
//! across an await.
//!
//! Lock order, where more than one is taken: state, scheduler, variables,
//! rng.
//!
//! Sink failures are logged and dropped here; they never feed back into the
//! state machine.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use super::snapshot::{PersistedSnapshot, SnapshotEnvelope};
use super::state::{Device, ExperimentState, Speed};
use crate::events::{Notification, ObserverList};
use crate::scheduler::{Scheduler, Tick};
use crate::sequence::Sequence;
use crate::sink::{Collection, DataSink};
use crate::variables::VariableSet;
use crate::view::View;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The experiment state machine: Idle → Running ⇄ Paused → Idle.
///
/// # Example
///
/// ```rust
/// use tp_sampler::experiment::{ExperimentController, Speed};
/// use tp_sampler::sink::MemorySink;
/// use tp_sampler::view::NullView;
///
/// # async fn example() {
/// let controller = ExperimentController::new(MemorySink::new(), NullView);
/// controller.change_speed(Speed::Instant).await;
/// controller.start().await;
/// assert_eq!(controller.sink().batches().len(), 3);
/// # }
/// ```
pub struct ExperimentController<S, V> {
    state: Mutex<ExperimentState>,
    scheduler: Mutex<Option<Scheduler>>,
    variables: Mutex<VariableSet>,
    rng: Mutex<StdRng>,
    observers: ObserverList,
    sink: S,
    view: V,
}

impl<S: DataSink, V: View> ExperimentController<S, V> {
    /// Create a controller at the Idle baseline with an entropy-seeded RNG.
    #[must_use]
    pub fn new(sink: S, view: V) -> Self {
        Self::with_seed_rng(sink, view, StdRng::from_entropy())
    }

    /// Create a controller with a deterministic draw source.
    #[must_use]
    pub fn with_seed(sink: S, view: V, seed: u64) -> Self {
        Self::with_seed_rng(sink, view, StdRng::seed_from_u64(seed))
    }

    fn with_seed_rng(sink: S, view: V, rng: StdRng) -> Self {
        Self {
            state: Mutex::new(ExperimentState::new()),
            scheduler: Mutex::new(None),
            variables: Mutex::new(VariableSet::new()),
            rng: Mutex::new(rng),
            observers: ObserverList::new(),
            sink,
            view,
        }
    }

    /// Register a UI observer. Must happen before the controller is shared.
    pub fn subscribe(&mut self, observer: impl Fn(&Notification) + Send + Sync + 'static) {
        self.observers.subscribe(observer);
    }

    /// Snapshot of the current session state.
    #[must_use]
    pub fn state(&self) -> ExperimentState {
        lock(&self.state).clone()
    }

    /// The active variable pool, in pool order.
    #[must_use]
    pub fn variables(&self) -> Vec<String> {
        lock(&self.variables).active().to_vec()
    }

    /// Whether an experiment is live.
    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    /// Whether a generated sequence is currently installed.
    #[must_use]
    pub fn has_live_sequence(&self) -> bool {
        lock(&self.scheduler).is_some()
    }

    /// The attached data sink.
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// The attached view.
    pub const fn view(&self) -> &V {
        &self.view
    }

    /// Start a new experiment. Guarded no-op unless Idle.
    ///
    /// Bumps the experiment number, confirms the experiment with the sink,
    /// then generates the sequence — generation never precedes a confirmed
    /// experiment number. At instant speed the whole sequence is flushed here
    /// and the controller returns to Idle; otherwise the sequence is handed
    /// to the scheduler and [`drive`](Self::drive) paces it.
    pub async fn start(&self) {
        if lock(&self.variables).active_len() == 0 {
            warn!("start ignored: active variable pool is empty");
            return;
        }
        let begun = {
            let mut state = lock(&self.state);
            state.begin().map(|number| (number, state.sample_size))
        };
        let Some((number, sample_size)) = begun else {
            debug!("start ignored: experiment already live");
            return;
        };
        self.observers.notify(&Notification::ControlsEnabled(false));

        if let Err(error) = self.sink.start_experiment(number, sample_size).await {
            // Logged only: counters stay put and the run stalls until stop().
            warn!(%error, experiment = number, "create-experiment call failed");
            return;
        }

        // A response landing after stop(), or for a superseded start, must
        // not install a sequence.
        {
            let state = lock(&self.state);
            if !state.running || state.experiment_number != number {
                debug!(experiment = number, "discarding stale create-experiment response");
                return;
            }
        }

        let generated = {
            let state = lock(&self.state);
            let variables = lock(&self.variables);
            let pool = variables.active_len();
            if pool == 0 {
                None
            } else {
                let mut rng = lock(&self.rng);
                Some((
                    state.speed,
                    state.device.uses_mixer_animation(),
                    Sequence::random(state.sample_size, state.num_runs, pool, &mut *rng),
                ))
            }
        };
        let Some((speed, mixer_animation, sequence)) = generated else {
            warn!(experiment = number, "active pool emptied while starting; abandoning");
            self.reset();
            return;
        };

        *lock(&self.scheduler) = Some(Scheduler::new(sequence));
        if speed.is_instant() {
            self.flush_pending().await;
            self.reset();
            return;
        }
        if mixer_animation {
            self.view.animate_mixer();
        }
    }

    /// Pace the live sequence: one draw per period until the sequence is
    /// exhausted or the experiment is stopped.
    ///
    /// Every iteration re-reads the shared state, so a pause holds the
    /// pointers while the clock keeps firing, a stop ends the loop on the
    /// next tick, and a superseding start (new experiment number) retires
    /// this task without touching the new experiment's scheduler. The
    /// end-of-animation notification fires one period after the final draw.
    pub async fn drive(&self) {
        // Wake interval while the speed sits at instant: there is no period
        // to pace with, but a paused experiment must survive a speed change
        // back to a timed setting.
        const HELD_POLL: Duration = Duration::from_millis(250);

        let generation = lock(&self.state).experiment_number;
        loop {
            let paced = {
                let state = lock(&self.state);
                if !state.running || state.experiment_number != generation {
                    return;
                }
                match state.speed.period() {
                    Some(period) => {
                        let mut scheduler = lock(&self.scheduler);
                        let Some(scheduler) = scheduler.as_mut() else {
                            return;
                        };
                        (scheduler.tick(state.paused), period)
                    }
                    // Unpaused instant is completed by the fast-forward in
                    // change_speed/resume, never paced here.
                    None if state.paused => (Tick::Held, HELD_POLL),
                    None => return,
                }
            };
            let (tick, period) = paced;
            match tick {
                Tick::Draw {
                    index,
                    draw,
                    run_complete,
                } => {
                    let value = lock(&self.variables)
                        .active()
                        .get(index)
                        .cloned()
                        .unwrap_or_default();
                    self.view.animate_select_next_variable(&value, draw);
                    if run_complete {
                        self.flush_next_run().await;
                    }
                }
                Tick::Held => {}
                Tick::Done => {
                    self.view.end_animation();
                    self.reset();
                    return;
                }
            }
            tokio::time::sleep(period).await;
        }
    }

    /// Pause the live experiment. No-op unless Running and unpaused.
    pub fn pause(&self) {
        self.set_paused(true);
    }

    /// Resume a paused experiment from the exact frozen run/draw pointer.
    ///
    /// If the speed was switched to instant while paused, resuming completes
    /// the fast-forward that change deferred.
    pub async fn resume(&self) {
        self.set_paused(false);
        self.fast_forward_if_instant().await;
    }

    fn set_paused(&self, paused: bool) {
        let changed = {
            let mut state = lock(&self.state);
            if !state.running || state.paused == paused {
                false
            } else {
                state.paused = paused;
                true
            }
        };
        if changed {
            self.view.pause(paused);
            self.observers.notify(&Notification::RunButton { paused });
        }
    }

    /// Stop the live experiment: discard the sequence and pending visuals
    /// and return to Idle. Safe to call repeatedly.
    pub fn stop(&self) {
        self.view.end_animation();
        self.reset();
    }

    /// Unconditional return to the Idle baseline. Also runs after natural
    /// completion; re-enables all controls and re-renders.
    pub fn reset(&self) {
        lock(&self.state).go_idle();
        *lock(&self.scheduler) = None;
        self.view.reset();
        self.observers.notify(&Notification::ControlsEnabled(true));
        self.view.render();
    }

    /// Change animation pacing. Switching to instant while running unpaused
    /// fast-forwards: every remaining run is flushed in order and the
    /// experiment completes exactly as an instant-speed start. While paused
    /// the fast-forward waits for [`resume`](Self::resume).
    pub async fn change_speed(&self, speed: Speed) {
        lock(&self.state).speed = speed;
        self.fast_forward_if_instant().await;
    }

    async fn fast_forward_if_instant(&self) {
        let fast_forward = {
            let state = lock(&self.state);
            state.running && !state.paused && state.speed.is_instant()
        };
        if fast_forward {
            debug!("fast-forwarding remaining runs at instant speed");
            self.view.end_animation();
            self.flush_pending().await;
            self.reset();
        }
    }

    /// Append an auto-labelled variable to the user pool. No-op while
    /// running or at the pool cap.
    pub fn add_variable(&self) {
        if lock(&self.state).running {
            return;
        }
        let changed = {
            let mut variables = lock(&self.variables);
            variables
                .add_auto()
                .then(|| (variables.can_grow(), variables.can_shrink()))
        };
        if let Some((can_grow, can_shrink)) = changed {
            self.view.render();
            self.observers
                .notify(&Notification::VariablesChanged { can_grow, can_shrink });
        }
    }

    /// Remove the last user-pool variable. No-op while running or when a
    /// single variable remains.
    pub fn remove_variable(&self) {
        if lock(&self.state).running {
            return;
        }
        let changed = {
            let mut variables = lock(&self.variables);
            variables
                .remove_last()
                .then(|| (variables.can_grow(), variables.can_shrink()))
        };
        if let Some((can_grow, can_shrink)) = changed {
            self.view.render();
            self.observers
                .notify(&Notification::VariablesChanged { can_grow, can_shrink });
        }
    }

    /// Switch sampling device. No-op if unchanged; otherwise rebinds the
    /// active pool (grouping it when entering spinner mode) and resets.
    pub fn switch_device(&self, device: Device) {
        {
            let mut state = lock(&self.state);
            if state.device == device {
                return;
            }
            state.device = device;
        }
        lock(&self.variables).bind_device(device);
        self.observers.notify(&Notification::DeviceChanged(device));
        self.reset();
    }

    /// Set draws per run. Zero is rejected (never below 1).
    pub fn set_sample_size(&self, sample_size: u32) {
        if sample_size == 0 {
            return;
        }
        lock(&self.state).sample_size = sample_size;
        self.view.render();
    }

    /// Set runs per experiment. Zero is rejected (never below 1).
    pub fn set_num_runs(&self, num_runs: u32) {
        if num_runs == 0 {
            return;
        }
        lock(&self.state).num_runs = num_runs;
        self.view.render();
    }

    /// List the host collections available to the collector device. Failures
    /// are logged and yield an empty list.
    pub async fn refresh_contexts(&self) -> Vec<Collection> {
        match self.sink.get_contexts().await {
            Ok(contexts) => contexts,
            Err(error) => {
                warn!(%error, "context listing failed");
                Vec::new()
            }
        }
    }

    /// Fill the case-derived pool from a host collection.
    pub async fn load_collector_cases(&self, collection: &str) {
        match self.sink.cases_from_context(collection).await {
            Ok(cases) => {
                lock(&self.variables).set_cases(cases);
                self.view.render();
            }
            Err(error) => warn!(%error, collection, "case fetch failed"),
        }
    }

    /// Zero the experiment counter and wipe everything written to the sink.
    pub async fn clear_experiment_data(&self) {
        lock(&self.state).experiment_number = 0;
        if let Err(error) = self.sink.delete_all().await {
            warn!(%error, "delete-all call failed");
        }
    }

    /// Capture the persistable configuration for the host save lifecycle.
    #[must_use]
    pub fn capture_state(&self) -> SnapshotEnvelope {
        let state = lock(&self.state);
        let variables = lock(&self.variables);
        SnapshotEnvelope::ok(PersistedSnapshot {
            experiment_number: Some(state.experiment_number),
            variables: Some(variables.active().to_vec()),
            draw: Some(state.sample_size),
            repeat: Some(state.num_runs),
            speed: Some(state.speed),
            device: Some(state.device),
        })
    }

    /// Restore configuration from a host snapshot.
    ///
    /// Absent and falsy fields keep their current values; a present device
    /// goes through [`switch_device`](Self::switch_device); running/paused
    /// always come back false. Always re-renders.
    pub fn restore_state(&self, snapshot: &PersistedSnapshot) {
        let snapshot = snapshot.clone().normalized();
        let device = {
            let mut state = lock(&self.state);
            if let Some(number) = snapshot.experiment_number {
                state.experiment_number = number;
            }
            if let Some(draw) = snapshot.draw {
                state.sample_size = draw;
            }
            if let Some(repeat) = snapshot.repeat {
                state.num_runs = repeat;
            }
            if let Some(speed) = snapshot.speed {
                state.speed = speed;
            }
            state.go_idle();
            snapshot.device
        };
        if let Some(labels) = snapshot.variables {
            lock(&self.variables).set_user(labels);
        }
        if let Some(device) = device {
            self.switch_device(device);
        }
        self.view.render();
    }

    /// Flush the next unsent run to the sink, if one remains. Returns whether
    /// a run was flushed; flushing past the end is a no-op.
    async fn flush_next_run(&self) -> bool {
        let flushed = {
            let mut state = lock(&self.state);
            let scheduler = lock(&self.scheduler);
            let Some(scheduler) = scheduler.as_ref() else {
                return false;
            };
            let Some(run) = scheduler.sequence().run(state.sent_run as usize) else {
                return false;
            };
            let variables = lock(&self.variables);
            let values = variables.labels_for(run);
            state.sent_run += 1;
            state.run_number = state.sent_run;
            (state.sent_run, values, variables.is_collector())
        };
        let (run_index, values, collector) = flushed;
        if let Err(error) = self.sink.add_values(run_index, values, collector).await {
            warn!(%error, run = run_index, "value flush failed");
        }
        true
    }

    async fn flush_pending(&self) {
        while self.flush_next_run().await {}
    }
}

impl<S: std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for ExperimentController<S, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentController")
            .field("state", &self.state)
            .field("sink", &self.sink)
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}
