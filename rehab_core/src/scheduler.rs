//! Sequential playback of a validated exercise program.
//!
//! One program runs at a time per [`Scheduler`]. Steps run strictly in
//! document order:
//! - start the step's motion program on the actuator
//! - wait the commanded duration on the wall clock
//! - if another step follows and rest is due, reset the pose and wait the rest
//!
//! Cancellation is cooperative. It is observed before each step and ends any
//! wait in progress; an in-flight `perform_motion` is never interrupted.
//! After a completed run the pose is reset once more after a settle delay.

use crate::catalog::{display_name, resolve_motion_program};
use crate::config::PlaybackConfig;
use crate::{ActuatorError, Error, ExerciseProgram, MotionActuator, MotionProgramId, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Where a run is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Running { step: usize },
    Resting { step: usize },
    Completed,
    Cancelled,
}

impl PlaybackState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackState::Completed | PlaybackState::Cancelled)
    }
}

/// Progress notifications delivered to the caller's callback
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    StateChanged(PlaybackState),
    StepStarted {
        index: usize,
        total: usize,
        exercise: String,
        program: MotionProgramId,
    },
    /// Step `index` finished its active duration and any rest
    StepFinished { index: usize, total: usize },
}

/// How a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    /// Cancelled while step `step` was running, resting or about to start
    Cancelled { step: usize },
}

/// Summary returned when a run's task finishes
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub patient_id: String,
    pub outcome: RunOutcome,
    /// Steps whose full active duration elapsed
    pub steps_completed: usize,
    pub total_steps: usize,
    /// Time from the first step starting to the terminal state
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Timing knobs for a scheduler
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackSettings {
    pub settle_delay: Duration,
    pub start_delay: Duration,
    pub time_scale: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(2000),
            start_delay: Duration::ZERO,
            time_scale: 1.0,
        }
    }
}

impl From<&PlaybackConfig> for PlaybackSettings {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            settle_delay: config.settle_delay(),
            start_delay: config.start_delay(),
            time_scale: config.time_scale,
        }
    }
}

impl PlaybackSettings {
    fn scale(&self, duration: Duration) -> Duration {
        if self.time_scale.is_finite() && self.time_scale > 0.0 {
            Duration::try_from_secs_f64(duration.as_secs_f64() / self.time_scale)
                .unwrap_or(Duration::MAX)
        } else {
            duration
        }
    }
}

/// Releases the scheduler's single-run guard when the run's task ends
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs exercise programs against an injected actuator
pub struct Scheduler {
    actuator: Arc<dyn MotionActuator>,
    settings: PlaybackSettings,
    busy: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(actuator: Arc<dyn MotionActuator>) -> Self {
        Self {
            actuator,
            settings: PlaybackSettings::default(),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_settings(mut self, settings: PlaybackSettings) -> Self {
        if !(settings.time_scale.is_finite() && settings.time_scale > 0.0) {
            tracing::warn!(
                "Ignoring invalid time scale {}, playing in real time",
                settings.time_scale
            );
        }
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> PlaybackSettings {
        self.settings
    }

    /// Whether a run started by this scheduler is still in flight
    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start a run without a progress callback
    pub fn start(&self, program: ExerciseProgram) -> Result<PlaybackHandle> {
        self.start_with_progress(program, |_| {})
    }

    /// Start a run on the current Tokio runtime
    ///
    /// Fails if another run from this scheduler is still in flight or if no
    /// runtime is available. Everything after that is reported through the
    /// returned handle.
    pub fn start_with_progress<F>(
        &self,
        program: ExerciseProgram,
        on_event: F,
    ) -> Result<PlaybackHandle>
    where
        F: FnMut(&PlaybackEvent) + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Playback(format!("no async runtime available: {}", e)))?;

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Playback(
                "a program is already running; cancel it or wait for it to finish".into(),
            ));
        }
        let guard = RunGuard(Arc::clone(&self.busy));

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(PlaybackState::Idle);

        let playback = Playback {
            program,
            actuator: Arc::clone(&self.actuator),
            settings: self.settings,
            cancel: cancel_rx,
            state: state_tx,
            on_event: Box::new(on_event),
        };

        let task = runtime.spawn(async move {
            let _guard = guard;
            playback.run().await
        });

        Ok(PlaybackHandle {
            cancel: Arc::new(cancel_tx),
            state: state_rx,
            task,
        })
    }
}

/// Cloneable trigger for cooperative cancellation
#[derive(Clone, Debug)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Caller's view of a run in flight
pub struct PlaybackHandle {
    cancel: Arc<watch::Sender<bool>>,
    state: watch::Receiver<PlaybackState>,
    task: JoinHandle<Result<RunReport>>,
}

impl PlaybackHandle {
    /// Request cancellation; takes effect at the next suspension boundary
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn canceller(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancel))
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end
    ///
    /// Actuator failures arrive here as [`Error::Actuator`].
    pub async fn wait(self) -> Result<RunReport> {
        self.task
            .await
            .map_err(|e| Error::Playback(format!("playback task failed: {}", e)))?
    }
}

/// State owned by one run's task
struct Playback {
    program: ExerciseProgram,
    actuator: Arc<dyn MotionActuator>,
    settings: PlaybackSettings,
    cancel: watch::Receiver<bool>,
    state: watch::Sender<PlaybackState>,
    on_event: Box<dyn FnMut(&PlaybackEvent) + Send>,
}

impl Playback {
    async fn run(mut self) -> Result<RunReport> {
        let started_at = Utc::now();
        let total = self.program.steps().len();

        tracing::info!(
            "Starting exercise program for patient {} (run {}): {} exercises, score {:.1}%",
            self.program.patient_id,
            self.program.run_id,
            total,
            self.program.recommended.score * 100.0
        );

        if !self.settings.start_delay.is_zero() && self.wait(self.settings.start_delay).await {
            return Ok(self.cancelled(0, 0, Instant::now(), started_at));
        }

        let clock = Instant::now();
        let mut steps_completed = 0;

        for index in 0..total {
            if self.is_cancelled() {
                return Ok(self.cancelled(index, steps_completed, clock, started_at));
            }

            let step = self.program.steps()[index].clone();
            let program = resolve_motion_program(&step.exercise);
            let duration = self.settings.scale(step.duration());

            self.set_state(PlaybackState::Running { step: index });
            self.emit(PlaybackEvent::StepStarted {
                index,
                total,
                exercise: step.exercise.clone(),
                program,
            });
            tracing::info!(
                "Exercise {}/{}: {} ({}) intensity={} duration={:?} reps={} pressure={} cadence={} program={}",
                index + 1,
                total,
                display_name(&step.exercise),
                step.exercise,
                step.intensity,
                duration,
                step.repetitions,
                fmt_param(step.pressure_percentage, "%"),
                fmt_param(step.cadence_rpm, " rpm"),
                program
            );

            if let Err(e) = self.actuator.perform_motion(program, duration, step.repetitions) {
                return Err(self.fail(index, e));
            }

            if self.wait(duration).await {
                return Ok(self.cancelled(index, steps_completed, clock, started_at));
            }
            steps_completed += 1;
            tracing::info!("Exercise {}/{} completed", index + 1, total);

            let rest = self.settings.scale(step.rest());
            if index + 1 < total && !rest.is_zero() {
                self.set_state(PlaybackState::Resting { step: index });
                tracing::info!("Resting for {:?}, pose reset", rest);
                if let Err(e) = self.actuator.reset_pose() {
                    return Err(self.fail(index, e));
                }
                if self.wait(rest).await {
                    return Ok(self.cancelled(index, steps_completed, clock, started_at));
                }
            }

            self.emit(PlaybackEvent::StepFinished { index, total });
            tracing::info!("Progress: {}/{} exercises completed", index + 1, total);
        }

        let elapsed = clock.elapsed();
        self.set_state(PlaybackState::Completed);
        tracing::info!(
            "Exercise program {} completed in {:?}",
            self.program.run_id,
            elapsed
        );
        let report = self.report(RunOutcome::Completed, steps_completed, elapsed, started_at);

        tokio::time::sleep(self.settings.settle_delay).await;
        match self.actuator.reset_pose() {
            Ok(()) => tracing::debug!("Final pose reset completed"),
            Err(e) => tracing::warn!("Final pose reset failed: {}", e),
        }

        Ok(report)
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Sleep for `duration`; returns true if cancellation ended the wait
    async fn wait(&mut self, duration: Duration) -> bool {
        wait_or_cancel(&mut self.cancel, duration).await
    }

    fn set_state(&mut self, state: PlaybackState) {
        self.state.send_replace(state);
        self.emit(PlaybackEvent::StateChanged(state));
    }

    fn emit(&mut self, event: PlaybackEvent) {
        (self.on_event)(&event);
    }

    fn cancelled(
        &mut self,
        step: usize,
        steps_completed: usize,
        clock: Instant,
        started_at: DateTime<Utc>,
    ) -> RunReport {
        self.set_state(PlaybackState::Cancelled);
        tracing::info!(
            "Exercise program {} stopped by user at exercise {}",
            self.program.run_id,
            step + 1
        );
        self.report(
            RunOutcome::Cancelled { step },
            steps_completed,
            clock.elapsed(),
            started_at,
        )
    }

    fn fail(&mut self, step: usize, error: ActuatorError) -> Error {
        self.set_state(PlaybackState::Cancelled);
        tracing::error!(
            "Exercise program {} aborted at exercise {}: {}",
            self.program.run_id,
            step + 1,
            error
        );
        Error::Actuator(error)
    }

    fn report(
        &self,
        outcome: RunOutcome,
        steps_completed: usize,
        elapsed: Duration,
        started_at: DateTime<Utc>,
    ) -> RunReport {
        RunReport {
            run_id: self.program.run_id.clone(),
            patient_id: self.program.patient_id.clone(),
            outcome,
            steps_completed,
            total_steps: self.program.steps().len(),
            elapsed,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Sleep unless cancelled first; a flag already set wins over an elapsed timer
async fn wait_or_cancel(cancel: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancelled(cancel) => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

/// Resolves once the cancel flag is set; never resolves if the sender is gone
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn fmt_param(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{}{}", v, unit),
        None => "n/a".to_string(),
    }
}
