// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event queue and delivery engine.
//!
//! Events are buffered in a bounded in-memory queue and delivered in batches.
//! Only one delivery is in flight at a time: `flush` is a no-op unless the
//! transport is idle. Failed batches are retried with linear backoff and,
//! once the retry budget is spent, demoted to the offline queue. Offline
//! batches are always attempted before newly queued events.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use monitor_core::{sign_payload, Event, EventPayload, PayloadMeta, SIGNATURE_HEADER};
use parking_lot::Mutex;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use serde::Deserialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::compress::Compressor;
use crate::config::{OfflineStorage, SdkConfig};
use crate::error::{Result, SdkError};
use crate::offline::{Batch, FileOfflineStore, MemoryOfflineStore, OfflineQueue};

/// SDK name reported in batch metadata.
pub const SDK_NAME: &str = "monitor-sdk";
/// SDK version reported in batch metadata.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Delivery state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
	Idle,
	Sending,
	/// Connectivity lost. Flushes are skipped until [`Transport::on_online`].
	Offline,
}

/// What a flush call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
	/// Another delivery was in flight, the transport is offline, or there was nothing to send.
	Skipped,
	Delivered { events: usize },
	RetryScheduled { attempt: u32, delay: Duration },
	/// Retries exhausted, the batch now lives in the offline queue.
	MovedOffline { events: usize },
}

/// A serialized batch ready for the wire.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
	pub body: Vec<u8>,
	pub content_encoding: Option<&'static str>,
	pub signature: Option<String>,
	pub event_count: usize,
}

/// Delivers serialized batches to the collector.
#[async_trait]
pub trait BatchSender: Send + Sync {
	async fn send(&self, request: &OutgoingRequest) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct Ack {
	code: i64,
	#[serde(default)]
	message: String,
}

/// HTTP sender posting to the collector endpoint.
#[derive(Debug, Clone)]
pub struct HttpBatchSender {
	client: reqwest::Client,
	endpoint: String,
}

impl HttpBatchSender {
	pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.user_agent(format!("{SDK_NAME}/{SDK_VERSION}"))
			.build()?;
		Ok(Self {
			client,
			endpoint: endpoint.into(),
		})
	}
}

#[async_trait]
impl BatchSender for HttpBatchSender {
	async fn send(&self, request: &OutgoingRequest) -> Result<()> {
		let mut builder = self
			.client
			.post(&self.endpoint)
			.header(CONTENT_TYPE, "application/json")
			.body(request.body.clone());
		if let Some(encoding) = request.content_encoding {
			builder = builder.header(CONTENT_ENCODING, encoding);
		}
		if let Some(signature) = &request.signature {
			builder = builder.header(SIGNATURE_HEADER, signature);
		}

		let response = builder.send().await?;
		let status = response.status();
		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();
			return Err(SdkError::ServerError {
				status: status.as_u16(),
				message,
			});
		}

		// A 2xx with a failure envelope is still a failure.
		if let Ok(ack) = response.json::<Ack>().await {
			if ack.code != 0 {
				return Err(SdkError::ServerError {
					status: status.as_u16(),
					message: ack.message,
				});
			}
		}
		Ok(())
	}
}

#[derive(Debug)]
struct QueuedEvent {
	event: Event,
	enqueued_at: DateTime<Utc>,
}

#[derive(Debug)]
struct State {
	status: TransportStatus,
	queue: VecDeque<QueuedEvent>,
	/// Batch that failed and awaits its next attempt.
	pending: Option<Batch>,
	retry_count: u32,
}

impl State {
	/// Pending batch followed by everything queued since.
	fn take_batch(&mut self) -> Option<Batch> {
		let first_enqueued_at = self.queue.front().map(|q| q.enqueued_at);
		let drained: Vec<Event> = self.queue.drain(..).map(|q| q.event).collect();
		match (self.pending.take(), first_enqueued_at) {
			(Some(mut pending), _) => {
				pending.events.extend(drained);
				Some(pending)
			}
			(None, Some(first_enqueued_at)) => Some(Batch {
				events: drained,
				attempt_count: 0,
				first_enqueued_at,
			}),
			(None, None) => None,
		}
	}
}

struct Inner {
	sender: Arc<dyn BatchSender>,
	compressor: Compressor,
	meta: PayloadMeta,
	signing_secret: Option<String>,
	max_queue_size: usize,
	max_retries: u32,
	retry_delay: Duration,
	timeout: Duration,
	flush_interval: Duration,
	state: Mutex<State>,
	offline: Mutex<OfflineQueue>,
	/// Held for the whole of a flush. Shutdown waits on it.
	delivery: tokio::sync::Mutex<()>,
	closed: AtomicBool,
	stop_timer: Notify,
	timer: Mutex<Option<JoinHandle<()>>>,
}

/// Cheaply cloneable handle to the delivery engine.
#[derive(Clone)]
pub struct Transport {
	inner: Arc<Inner>,
}

impl fmt::Debug for Transport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Transport")
			.field("status", &self.status())
			.field("queue_len", &self.queue_len())
			.field("offline_events", &self.offline_len())
			.finish()
	}
}

/// Opens the offline queue described by the configuration.
///
/// Without a usable file location the queue lives in memory only.
pub fn open_offline_queue(config: &SdkConfig) -> OfflineQueue {
	match config.offline_file() {
		Some(path) => {
			debug!(path = %path.display(), "offline queue backed by file");
			OfflineQueue::open(Box::new(FileOfflineStore::new(path)), config.max_offline_events)
		}
		None => {
			if config.offline_storage != OfflineStorage::Memory {
				warn!("no data directory for the offline queue, keeping it in memory");
			}
			OfflineQueue::open(Box::new(MemoryOfflineStore::default()), config.max_offline_events)
		}
	}
}

impl Transport {
	pub fn new(config: &SdkConfig, sender: Arc<dyn BatchSender>, offline: OfflineQueue) -> Self {
		let meta = PayloadMeta {
			sdk: SDK_NAME.to_string(),
			version: SDK_VERSION.to_string(),
			app_id: config.app_id.clone(),
			release: config.release.clone(),
			environment: Some(config.environment.clone()),
			timestamp: 0,
		};
		Self {
			inner: Arc::new(Inner {
				sender,
				compressor: Compressor::new(&config.compression),
				meta,
				signing_secret: config.signing_secret.clone(),
				max_queue_size: config.max_queue_size,
				max_retries: config.max_retries,
				retry_delay: config.retry_delay,
				timeout: config.timeout,
				flush_interval: config.flush_interval,
				state: Mutex::new(State {
					status: TransportStatus::Idle,
					queue: VecDeque::new(),
					pending: None,
					retry_count: 0,
				}),
				offline: Mutex::new(offline),
				delivery: tokio::sync::Mutex::new(()),
				closed: AtomicBool::new(false),
				stop_timer: Notify::new(),
				timer: Mutex::new(None),
			}),
		}
	}

	/// Transport posting over HTTP to the configured DSN.
	pub fn http(config: &SdkConfig) -> Result<Self> {
		let sender = HttpBatchSender::new(&config.dsn, config.timeout)?;
		Ok(Self::new(config, Arc::new(sender), open_offline_queue(config)))
	}

	pub fn status(&self) -> TransportStatus {
		self.inner.state.lock().status
	}

	/// Events waiting in memory, including a batch awaiting retry.
	pub fn queue_len(&self) -> usize {
		let state = self.inner.state.lock();
		state.queue.len() + state.pending.as_ref().map_or(0, |b| b.events.len())
	}

	pub fn offline_len(&self) -> usize {
		self.inner.offline.lock().len_events()
	}

	/// Queues an event. Error-level events are flushed immediately.
	pub async fn enqueue(&self, event: Event) -> Result<()> {
		if self.inner.closed.load(Ordering::Acquire) {
			return Err(SdkError::ClientShutdown);
		}

		let urgent = event.level().is_error();
		{
			let mut state = self.inner.state.lock();
			if state.queue.len() >= self.inner.max_queue_size {
				state.queue.pop_front();
				warn!(
					max_queue_size = self.inner.max_queue_size,
					"event queue full, dropping oldest event"
				);
			}
			state.queue.push_back(QueuedEvent {
				event,
				enqueued_at: Utc::now(),
			});
		}

		if urgent {
			self.flush().await;
		}
		Ok(())
	}

	/// Delivers offline batches, then everything queued.
	pub async fn flush(&self) -> FlushOutcome {
		let Ok(_delivery) = self.inner.delivery.try_lock() else {
			return FlushOutcome::Skipped;
		};
		self.flush_exclusive().await
	}

	/// One flush. The caller holds `delivery`.
	async fn flush_exclusive(&self) -> FlushOutcome {
		{
			let mut state = self.inner.state.lock();
			if state.status != TransportStatus::Idle {
				return FlushOutcome::Skipped;
			}
			if state.queue.is_empty() && state.pending.is_none() && self.inner.offline.lock().is_empty() {
				return FlushOutcome::Skipped;
			}
			state.status = TransportStatus::Sending;
		}

		let outcome = self.deliver().await;

		{
			let mut state = self.inner.state.lock();
			if state.status == TransportStatus::Sending {
				state.status = TransportStatus::Idle;
			}
		}

		if let FlushOutcome::RetryScheduled { delay, .. } = outcome {
			if !self.inner.closed.load(Ordering::Acquire) {
				self.schedule_retry(delay);
			}
		}
		outcome
	}

	async fn deliver(&self) -> FlushOutcome {
		let mut delivered = 0;

		loop {
			let front = self.inner.offline.lock().front().cloned();
			let Some(batch) = front else {
				break;
			};
			// Only a flush mutates the offline queue and `delivery` admits one
			// at a time, so the front is still `batch` once the send returns.
			match self.send_events(&batch.events).await {
				Ok(()) => {
					delivered += batch.events.len();
					let mut offline = self.inner.offline.lock();
					if offline.front() == Some(&batch) {
						offline.pop_front();
					}
					debug!(events = batch.events.len(), "delivered offline batch");
				}
				Err(e) => {
					warn!(error = %e, events = batch.events.len(), "offline batch delivery failed");
					return self.on_failure();
				}
			}
		}

		let batch = self.inner.state.lock().take_batch();
		let Some(mut batch) = batch else {
			self.inner.state.lock().retry_count = 0;
			return FlushOutcome::Delivered { events: delivered };
		};

		match self.send_events(&batch.events).await {
			Ok(()) => {
				delivered += batch.events.len();
				self.inner.state.lock().retry_count = 0;
				debug!(events = delivered, "delivered batch");
				FlushOutcome::Delivered { events: delivered }
			}
			Err(e) => {
				batch.attempt_count += 1;
				warn!(
					error = %e,
					events = batch.events.len(),
					attempt = batch.attempt_count,
					"batch delivery failed"
				);
				self.inner.state.lock().pending = Some(batch);
				self.on_failure()
			}
		}
	}

	fn on_failure(&self) -> FlushOutcome {
		let demoted = {
			let mut state = self.inner.state.lock();
			state.retry_count += 1;
			if state.retry_count <= self.inner.max_retries {
				let attempt = state.retry_count;
				return FlushOutcome::RetryScheduled {
					attempt,
					delay: self.inner.retry_delay * attempt,
				};
			}
			state.retry_count = 0;
			// When the failing batch came from the offline queue it stays at the
			// front, and the queued events are parked behind it.
			state.take_batch()
		};

		let events = demoted.as_ref().map_or(0, |b| b.events.len());
		if let Some(batch) = demoted {
			self.inner.offline.lock().push(batch);
		}
		warn!(events, "delivery retries exhausted, batch moved to offline queue");
		FlushOutcome::MovedOffline { events }
	}

	fn schedule_retry(&self, delay: Duration) {
		let transport = self.clone();
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			if !transport.inner.closed.load(Ordering::Acquire) {
				transport.flush().await;
			}
		});
	}

	async fn send_events(&self, events: &[Event]) -> Result<()> {
		let request = self.build_request(events)?;
		match tokio::time::timeout(self.inner.timeout, self.inner.sender.send(&request)).await {
			Ok(result) => result,
			Err(_) => Err(SdkError::Timeout(self.inner.timeout)),
		}
	}

	fn build_request(&self, events: &[Event]) -> Result<OutgoingRequest> {
		let mut meta = self.inner.meta.clone();
		meta.timestamp = Utc::now().timestamp_millis();
		let json = serde_json::to_vec(&EventPayload { events, meta })?;

		// Signed over the uncompressed form.
		let signature = match &self.inner.signing_secret {
			Some(secret) => Some(sign_payload(secret.as_bytes(), &json)?),
			None => None,
		};
		let (body, content_encoding) = self.inner.compressor.compress(json);

		Ok(OutgoingRequest {
			body,
			content_encoding,
			signature,
			event_count: events.len(),
		})
	}

	/// Starts the periodic flush timer. A zero interval disables it.
	pub fn start(&self) {
		let interval = self.inner.flush_interval;
		if interval.is_zero() {
			return;
		}

		let transport = self.clone();
		let handle = tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			ticker.tick().await;
			loop {
				tokio::select! {
					_ = ticker.tick() => {
						transport.flush().await;
					}
					_ = transport.inner.stop_timer.notified() => break,
				}
			}
		});
		if let Some(previous) = self.inner.timer.lock().replace(handle) {
			previous.abort();
		}
	}

	/// Connectivity restored.
	pub async fn on_online(&self) -> FlushOutcome {
		{
			let mut state = self.inner.state.lock();
			if state.status == TransportStatus::Offline {
				state.status = TransportStatus::Idle;
			}
		}
		info!("connectivity restored, flushing");
		self.flush().await
	}

	/// Connectivity lost.
	pub fn on_offline(&self) {
		self.inner.state.lock().status = TransportStatus::Offline;
		info!("connectivity lost, deliveries paused");
	}

	/// The host is going to the background.
	pub async fn on_visibility_hidden(&self) -> FlushOutcome {
		self.flush().await
	}

	/// Stops the timer, makes a final flush and parks whatever is left offline.
	pub async fn shutdown(&self) {
		if self.inner.closed.swap(true, Ordering::AcqRel) {
			return;
		}

		self.inner.stop_timer.notify_one();
		let timer = self.inner.timer.lock().take();
		if let Some(timer) = timer {
			let _ = timer.await;
		}

		// Waits out an in-flight delivery so a batch it fails is parked below.
		let _delivery = self.inner.delivery.lock().await;
		self.flush_exclusive().await;

		let leftover = self.inner.state.lock().take_batch();
		if let Some(batch) = leftover {
			info!(events = batch.events.len(), "saving undelivered events to offline queue");
			self.inner.offline.lock().push(batch);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::CompressionConfig;
	use monitor_core::{ErrorData, EventType};
	use serde_json::{json, Value};
	use std::sync::atomic::AtomicUsize;

	#[derive(Default)]
	struct MockSender {
		should_fail: AtomicBool,
		sent: Mutex<Vec<OutgoingRequest>>,
	}

	impl MockSender {
		fn failing() -> Self {
			Self {
				should_fail: AtomicBool::new(true),
				..Default::default()
			}
		}

		fn attempts(&self) -> usize {
			self.sent.lock().len()
		}

		/// `tag` of every event, per request.
		fn tags(&self) -> Vec<Vec<String>> {
			self
				.sent
				.lock()
				.iter()
				.map(|request| {
					let payload: Value = serde_json::from_slice(&request.body).unwrap();
					payload["events"]
						.as_array()
						.unwrap()
						.iter()
						.map(|e| e["data"]["tag"].as_str().unwrap_or_default().to_string())
						.collect()
				})
				.collect()
		}
	}

	#[async_trait]
	impl BatchSender for MockSender {
		async fn send(&self, request: &OutgoingRequest) -> Result<()> {
			self.sent.lock().push(request.clone());
			if self.should_fail.load(Ordering::SeqCst) {
				return Err(SdkError::ServerError {
					status: 503,
					message: "unavailable".to_string(),
				});
			}
			Ok(())
		}
	}

	struct SlowSender;

	#[async_trait]
	impl BatchSender for SlowSender {
		async fn send(&self, _request: &OutgoingRequest) -> Result<()> {
			tokio::time::sleep(Duration::from_secs(3600)).await;
			Ok(())
		}
	}

	/// Fails every request after a short delay.
	#[derive(Default)]
	struct SlowFailSender {
		attempts: AtomicUsize,
	}

	#[async_trait]
	impl BatchSender for SlowFailSender {
		async fn send(&self, _request: &OutgoingRequest) -> Result<()> {
			self.attempts.fetch_add(1, Ordering::SeqCst);
			tokio::time::sleep(Duration::from_millis(100)).await;
			Err(SdkError::ServerError {
				status: 502,
				message: "bad gateway".to_string(),
			})
		}
	}

	fn config() -> SdkConfig {
		let mut config = SdkConfig::new("http://collector.test/api/tracker", "app1");
		config.offline_storage = OfflineStorage::Memory;
		config.flush_interval = Duration::ZERO;
		config.compression = CompressionConfig {
			enabled: false,
			threshold_bytes: 0,
		};
		config
	}

	fn memory_offline(config: &SdkConfig) -> OfflineQueue {
		open_offline_queue(config)
	}

	fn tagged(tag: &str) -> Event {
		Event::new(EventType::Custom, json!({ "tag": tag }))
	}

	fn error(tag: &str) -> Event {
		let mut event = Event::from_error(&ErrorData::new("js_error", "boom")).unwrap();
		event.data["tag"] = json!(tag);
		event
	}

	#[tokio::test]
	async fn flush_delivers_queue_in_one_batch() {
		let config = config();
		let sender = Arc::new(MockSender::default());
		let transport = Transport::new(&config, sender.clone(), memory_offline(&config));

		transport.enqueue(tagged("a")).await.unwrap();
		transport.enqueue(tagged("b")).await.unwrap();
		assert_eq!(sender.attempts(), 0);

		assert_eq!(transport.flush().await, FlushOutcome::Delivered { events: 2 });
		assert_eq!(sender.tags(), vec![vec!["a".to_string(), "b".to_string()]]);
		assert_eq!(transport.queue_len(), 0);
		assert_eq!(transport.status(), TransportStatus::Idle);
	}

	#[tokio::test]
	async fn empty_flush_is_skipped() {
		let config = config();
		let sender = Arc::new(MockSender::default());
		let transport = Transport::new(&config, sender.clone(), memory_offline(&config));
		assert_eq!(transport.flush().await, FlushOutcome::Skipped);
		assert_eq!(sender.attempts(), 0);
	}

	#[tokio::test]
	async fn error_event_flushes_immediately() {
		let config = config();
		let sender = Arc::new(MockSender::default());
		let transport = Transport::new(&config, sender.clone(), memory_offline(&config));

		transport.enqueue(tagged("ctx")).await.unwrap();
		transport.enqueue(error("err")).await.unwrap();
		assert_eq!(sender.tags(), vec![vec!["ctx".to_string(), "err".to_string()]]);
	}

	#[tokio::test]
	async fn overflow_drops_oldest() {
		let mut config = config();
		config.max_queue_size = 2;
		let sender = Arc::new(MockSender::default());
		let transport = Transport::new(&config, sender.clone(), memory_offline(&config));

		for tag in ["a", "b", "c"] {
			transport.enqueue(tagged(tag)).await.unwrap();
		}
		assert_eq!(transport.queue_len(), 2);
		transport.flush().await;
		assert_eq!(sender.tags(), vec![vec!["b".to_string(), "c".to_string()]]);
	}

	#[tokio::test(start_paused = true)]
	async fn retry_ceiling_moves_batch_offline_once() {
		let config = config();
		let sender = Arc::new(MockSender::failing());
		let transport = Transport::new(&config, sender.clone(), memory_offline(&config));

		transport.enqueue(tagged("a")).await.unwrap();
		let outcome = transport.flush().await;
		assert_eq!(
			outcome,
			FlushOutcome::RetryScheduled {
				attempt: 1,
				delay: Duration::from_secs(1)
			}
		);

		// Linear backoff: retries at +1s, +2s, +3s.
		tokio::time::sleep(Duration::from_secs(10)).await;

		assert_eq!(sender.attempts(), config.max_retries as usize + 1);
		assert_eq!(transport.queue_len(), 0);
		assert_eq!(transport.offline_len(), 1);
		assert_eq!(transport.inner.offline.lock().len_batches(), 1);
		assert_eq!(
			transport.inner.offline.lock().front().unwrap().attempt_count,
			config.max_retries + 1
		);

		// Nothing further is scheduled once demoted.
		tokio::time::sleep(Duration::from_secs(100)).await;
		assert_eq!(sender.attempts(), config.max_retries as usize + 1);
	}

	#[tokio::test]
	async fn offline_batches_go_first() {
		let config = config();
		let mut offline = memory_offline(&config);
		offline.push(Batch::new(vec![tagged("old")]));

		let sender = Arc::new(MockSender::default());
		let transport = Transport::new(&config, sender.clone(), offline);
		transport.enqueue(tagged("new")).await.unwrap();

		assert_eq!(transport.flush().await, FlushOutcome::Delivered { events: 2 });
		assert_eq!(
			sender.tags(),
			vec![vec!["old".to_string()], vec!["new".to_string()]]
		);
		assert_eq!(transport.offline_len(), 0);
	}

	#[tokio::test]
	async fn failed_offline_batch_holds_back_queue() {
		let config = config();
		let mut offline = memory_offline(&config);
		offline.push(Batch::new(vec![tagged("old")]));

		let sender = Arc::new(MockSender::failing());
		let transport = Transport::new(&config, sender.clone(), offline);
		transport.enqueue(tagged("new")).await.unwrap();

		let outcome = transport.flush().await;
		assert!(matches!(outcome, FlushOutcome::RetryScheduled { attempt: 1, .. }));
		assert_eq!(sender.tags(), vec![vec!["old".to_string()]]);
		assert_eq!(transport.offline_len(), 1);
		assert_eq!(transport.queue_len(), 1);
	}

	#[tokio::test]
	async fn flush_is_skipped_while_sending() {
		let config = config();
		let transport = Transport::new(&config, Arc::new(SlowSender), memory_offline(&config));
		transport.enqueue(tagged("a")).await.unwrap();

		let background = transport.clone();
		let handle = tokio::spawn(async move { background.flush().await });
		while transport.status() != TransportStatus::Sending {
			tokio::task::yield_now().await;
		}

		assert_eq!(transport.flush().await, FlushOutcome::Skipped);
		handle.abort();
	}

	#[tokio::test(start_paused = true)]
	async fn timeout_counts_as_failure() {
		let config = config();
		let transport = Transport::new(&config, Arc::new(SlowSender), memory_offline(&config));
		transport.enqueue(tagged("a")).await.unwrap();

		let outcome = transport.flush().await;
		assert!(matches!(outcome, FlushOutcome::RetryScheduled { attempt: 1, .. }));
		assert_eq!(transport.queue_len(), 1);
		transport.inner.closed.store(true, Ordering::Release);
	}

	#[tokio::test]
	async fn offline_status_pauses_delivery() {
		let config = config();
		let sender = Arc::new(MockSender::default());
		let transport = Transport::new(&config, sender.clone(), memory_offline(&config));

		transport.on_offline();
		transport.enqueue(error("err")).await.unwrap();
		assert_eq!(sender.attempts(), 0);
		assert_eq!(transport.status(), TransportStatus::Offline);

		assert_eq!(transport.on_online().await, FlushOutcome::Delivered { events: 1 });
		assert_eq!(transport.status(), TransportStatus::Idle);
	}

	#[tokio::test]
	async fn visibility_hidden_flushes_queue() {
		let config = config();
		let sender = Arc::new(MockSender::default());
		let transport = Transport::new(&config, sender.clone(), memory_offline(&config));

		transport.enqueue(tagged("a")).await.unwrap();
		assert_eq!(
			transport.on_visibility_hidden().await,
			FlushOutcome::Delivered { events: 1 }
		);
		assert_eq!(sender.tags(), vec![vec!["a".to_string()]]);
		assert_eq!(transport.queue_len(), 0);
	}

	#[tokio::test]
	async fn visibility_hidden_is_skipped_while_offline() {
		let config = config();
		let sender = Arc::new(MockSender::default());
		let transport = Transport::new(&config, sender.clone(), memory_offline(&config));

		transport.on_offline();
		transport.enqueue(tagged("a")).await.unwrap();
		assert_eq!(transport.on_visibility_hidden().await, FlushOutcome::Skipped);
		assert_eq!(sender.attempts(), 0);
		assert_eq!(transport.queue_len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn shutdown_during_delivery_parks_failed_batch() {
		let config = config();
		let sender = Arc::new(SlowFailSender::default());
		let transport = Transport::new(&config, sender.clone(), memory_offline(&config));
		transport.enqueue(tagged("a")).await.unwrap();

		let background = transport.clone();
		let in_flight = tokio::spawn(async move { background.flush().await });
		while transport.status() != TransportStatus::Sending {
			tokio::task::yield_now().await;
		}

		transport.shutdown().await;

		assert!(matches!(
			in_flight.await.unwrap(),
			FlushOutcome::RetryScheduled { attempt: 1, .. }
		));
		// The in-flight attempt plus the final one made by shutdown.
		assert_eq!(sender.attempts.load(Ordering::SeqCst), 2);
		assert_eq!(transport.queue_len(), 0);
		assert_eq!(transport.offline_len(), 1);

		tokio::time::sleep(Duration::from_secs(60)).await;
		assert_eq!(sender.attempts.load(Ordering::SeqCst), 2);
		assert_eq!(transport.offline_len(), 1);
	}

	#[tokio::test]
	async fn signed_and_compressed_requests() {
		let mut config = config();
		config.signing_secret = Some("s3cret".to_string());
		config.compression = CompressionConfig {
			enabled: true,
			threshold_bytes: 64,
		};
		let sender = Arc::new(MockSender::default());
		let transport = Transport::new(&config, sender.clone(), memory_offline(&config));

		for i in 0..20 {
			transport.enqueue(tagged(&format!("event-{i}"))).await.unwrap();
		}
		transport.flush().await;

		let request = sender.sent.lock()[0].clone();
		assert_eq!(request.content_encoding, Some("gzip"));
		assert_eq!(request.event_count, 20);
		let json = crate::compress::decompress_gzip(&request.body).unwrap();
		assert!(monitor_core::verify_payload(
			b"s3cret",
			&json,
			request.signature.as_deref().unwrap()
		));
		let payload: Value = serde_json::from_slice(&json).unwrap();
		assert_eq!(payload["meta"]["appId"], "app1");
		assert_eq!(payload["meta"]["sdk"], SDK_NAME);
	}

	#[tokio::test]
	async fn shutdown_parks_undelivered_events() {
		let config = config();
		let sender = Arc::new(MockSender::failing());
		let transport = Transport::new(&config, sender.clone(), memory_offline(&config));

		transport.enqueue(tagged("a")).await.unwrap();
		transport.shutdown().await;

		assert_eq!(transport.queue_len(), 0);
		assert_eq!(transport.offline_len(), 1);
		assert!(matches!(
			transport.enqueue(tagged("b")).await,
			Err(SdkError::ClientShutdown)
		));
	}

	#[tokio::test(start_paused = true)]
	async fn timer_flushes_periodically() {
		let mut config = config();
		config.flush_interval = Duration::from_secs(5);
		let sender = Arc::new(MockSender::default());
		let transport = Transport::new(&config, sender.clone(), memory_offline(&config));
		transport.start();

		transport.enqueue(tagged("a")).await.unwrap();
		tokio::time::sleep(Duration::from_secs(6)).await;
		assert_eq!(sender.attempts(), 1);

		transport.shutdown().await;
	}
}
