use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, error, info};

use super::{Controller, Event, SelectionState};
use crate::config::RetryPolicy;
use crate::engine::{Engine, EngineError, compute_with_retry};
use crate::layers::{Layer, MapDisplay};

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Idle,
    Computing(SelectionState),
    Failed { state: SelectionState, reason: String },
}

type Completion = (u64, SelectionState, Result<Option<Layer>, EngineError>);

/// Event loop tying operator input to the engine and the map.
///
/// Each selection change starts a new compute task and aborts the previous
/// one. Results carry the generation they were requested under and only
/// the latest generation reaches the display.
pub struct Session<D: MapDisplay> {
    engine: Arc<dyn Engine>,
    controller: Controller,
    display: D,
    retry: RetryPolicy,
    status: Status,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
}

impl<D: MapDisplay> Session<D> {
    pub fn new(engine: Arc<dyn Engine>, controller: Controller, display: D, retry: RetryPolicy) -> Self {
        Self {
            engine,
            controller,
            display,
            retry,
            status: Status::Idle,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn state(&self) -> &SelectionState {
        self.controller.state()
    }

    /// Runs until `events` closes, then waits for the last requested layer.
    ///
    /// With `auto_advance` set the year moves forward every period, wrapping
    /// back to the first year after the last.
    pub async fn run(mut self, mut events: mpsc::Receiver<Event>, auto_advance: Option<Duration>) -> Self {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();

        let mut ticker = auto_advance.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        let initial = self.controller.state().clone();
        self.request(initial, &done_tx);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        let state = self.controller.handle(event);
                        self.request(state, &done_tx);
                    }
                    None => break,
                },
                _ = tick(&mut ticker) => {
                    let state = self.controller.handle(Event::Tick);
                    self.request(state, &done_tx);
                }
                Some((generation, state, result)) = done_rx.recv() => {
                    self.complete(generation, state, result);
                }
            }
        }

        if let Some(handle) = self.in_flight.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "compute task ended abnormally");
            }
        }
        while let Ok((generation, state, result)) = done_rx.try_recv() {
            self.complete(generation, state, result);
        }

        self
    }

    fn request(&mut self, state: SelectionState, done: &mpsc::UnboundedSender<Completion>) {
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }

        self.generation += 1;
        let generation = self.generation;
        info!(generation, year = state.year, layer = %state.layer, "requesting layer");
        self.status = Status::Computing(state.clone());

        let engine = Arc::clone(&self.engine);
        let retry = self.retry;
        let done = done.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = compute_with_retry(engine.as_ref(), &state, retry).await;
            // The receiver lives as long as the session loop
            let _ = done.send((generation, state, result));
        }));
    }

    fn complete(
        &mut self,
        generation: u64,
        state: SelectionState,
        result: Result<Option<Layer>, EngineError>,
    ) {
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale result");
            return;
        }
        self.in_flight = None;

        let shown = match result {
            Ok(layer) => {
                match &layer {
                    Some(layer) => info!(
                        generation,
                        layer = %layer.name,
                        summary = %layer.content.summary(),
                        "displaying layer"
                    ),
                    None => info!(generation, layer = %state.layer, "no product, clearing map"),
                }
                self.display.replace(layer.into_iter().collect())
            }
            Err(e) => {
                error!(generation, year = state.year, layer = %state.layer, error = %e, "layer computation failed");
                self.status = Status::Failed {
                    state,
                    reason: e.to_string(),
                };
                if let Err(e) = self.display.replace(Vec::new()) {
                    error!(error = %e, "failed to clear map");
                }
                return;
            }
        };

        self.status = match shown {
            Ok(()) => Status::Idle,
            Err(e) => {
                error!(generation, error = %e, "failed to display layer");
                if let Err(e) = self.display.replace(Vec::new()) {
                    error!(error = %e, "failed to clear map");
                }
                Status::Failed {
                    state,
                    reason: e.to_string(),
                }
            }
        };
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
