//! Runs requests off the caller's thread and sends results back as events.
//!
//! A UI submits one request per user trigger and drains the receiver on its
//! own thread. Submitting while a request is in flight aborts the older one;
//! any of its events still queued are recognisable by their stale id.

use serde::Serialize;
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::debug;

use crate::{
    error::UserMessage,
    fetch::Fetch,
    model::{CurrentWeather, ForecastSeries},
    pipeline::{RenderSink, WeatherPipeline},
};

pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum RenderUpdate {
    Current(CurrentWeather),
    Forecast(ForecastSeries),
    Message(UserMessage),
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderEvent {
    pub request: RequestId,
    pub update: RenderUpdate,
}

/// `RenderSink` that forwards every update over a channel, tagged with its request.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    request: RequestId,
    tx: UnboundedSender<RenderEvent>,
}

impl ChannelSink {
    pub fn new(request: RequestId, tx: UnboundedSender<RenderEvent>) -> Self {
        Self { request, tx }
    }

    fn send(&self, update: RenderUpdate) {
        if self.tx.send(RenderEvent { request: self.request, update }).is_err() {
            debug!(request = self.request, "render receiver dropped, discarding update");
        }
    }
}

impl RenderSink for ChannelSink {
    fn current(&self, weather: CurrentWeather) {
        self.send(RenderUpdate::Current(weather));
    }

    fn forecast(&self, series: ForecastSeries) {
        self.send(RenderUpdate::Forecast(series));
    }

    fn message(&self, message: UserMessage) {
        self.send(RenderUpdate::Message(message));
    }

    fn finished(&self) {
        self.send(RenderUpdate::Finished);
    }
}

#[derive(Debug)]
pub struct Dispatcher<F> {
    pipeline: Arc<WeatherPipeline<F>>,
    tx: UnboundedSender<RenderEvent>,
    latest: AtomicU64,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl<F: Fetch + 'static> Dispatcher<F> {
    pub fn new(pipeline: WeatherPipeline<F>) -> (Self, UnboundedReceiver<RenderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            pipeline: Arc::new(pipeline),
            tx,
            latest: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        };
        (dispatcher, rx)
    }

    pub fn pipeline(&self) -> &WeatherPipeline<F> {
        &self.pipeline
    }

    /// Start a request for `input`, replacing any request still running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, input: impl Into<String>) -> RequestId {
        let request = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let input = input.into();
        let sink = ChannelSink::new(request, self.tx.clone());
        let pipeline = Arc::clone(&self.pipeline);

        let handle = tokio::spawn(async move {
            pipeline.run(&input, &sink).await;
        });

        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(handle) {
            if !previous.is_finished() {
                debug!(request, "superseding request still in flight");
                previous.abort();
            }
        }

        request
    }

    /// Id of the most recent submission; 0 before the first.
    pub fn latest(&self) -> RequestId {
        self.latest.load(Ordering::SeqCst)
    }

    /// Events from superseded requests should not be rendered.
    pub fn is_stale(&self, event: &RenderEvent) -> bool {
        event.request != self.latest()
    }
}

impl<F> Drop for Dispatcher<F> {
    fn drop(&mut self) {
        let slot = self.in_flight.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}
