// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Monitoring client: the capture pipeline in front of the transport.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use monitor_core::{
	AppInfo, Breadcrumb, BreadcrumbBuffer, ErrorData, Event, EventId, EventType, Level, SdkInfo,
	UserContext,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::{
	CompressionConfig, DedupConfig, OfflineStorage, SanitizeConfig, SdkConfig,
};
use crate::dedup::Deduplicator;
use crate::error::{Result, SdkError};
use crate::processor::{BreadcrumbProcessor, ErrorReporter, EventProcessor};
use crate::sampler::{SampleRates, Sampler};
use crate::sanitize::Sanitizer;
use crate::transport::{
	open_offline_queue, BatchSender, FlushOutcome, HttpBatchSender, Transport, TransportStatus,
	SDK_NAME, SDK_VERSION,
};

/// What happened to a captured event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
	/// Handed to the transport.
	Queued(EventId),
	/// Lost the sampling draw.
	Sampled,
	/// Suppressed as a repeat within the dedup window.
	Deduplicated,
	/// Dropped by an event processor.
	Dropped,
}

/// Builder for constructing a [`MonitorClient`].
pub struct MonitorClientBuilder {
	dsn: Option<String>,
	app_id: Option<String>,
	config: SdkConfig,
	sender: Option<Arc<dyn BatchSender>>,
	sample_source: Option<Box<dyn Fn() -> f64 + Send + Sync>>,
	event_processors: Vec<Box<dyn EventProcessor>>,
	breadcrumb_processors: Vec<Box<dyn BreadcrumbProcessor>>,
}

impl MonitorClientBuilder {
	pub fn new() -> Self {
		Self {
			dsn: None,
			app_id: None,
			config: SdkConfig::new("", ""),
			sender: None,
			sample_source: None,
			event_processors: Vec::new(),
			breadcrumb_processors: Vec::new(),
		}
	}

	/// Sets the collector ingestion URL.
	///
	/// Example: `https://monitor.example.com/api/tracker`
	pub fn dsn(mut self, dsn: impl Into<String>) -> Self {
		self.dsn = Some(dsn.into());
		self
	}

	pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
		self.app_id = Some(app_id.into());
		self
	}

	/// Sets the release version. Source maps are looked up by this value.
	pub fn release(mut self, release: impl Into<String>) -> Self {
		self.config.release = Some(release.into());
		self
	}

	/// Sets the environment name.
	///
	/// Example: `production`, `staging`, `development`
	pub fn environment(mut self, environment: impl Into<String>) -> Self {
		self.config.environment = environment.into();
		self
	}

	pub fn sample_rates(mut self, rates: SampleRates) -> Self {
		self.config.sample_rates = rates;
		self
	}

	pub fn max_breadcrumbs(mut self, max: usize) -> Self {
		self.config.max_breadcrumbs = max;
		self
	}

	pub fn max_queue_size(mut self, max: usize) -> Self {
		self.config.max_queue_size = max;
		self
	}

	/// Sets the periodic flush interval. Zero disables the timer.
	pub fn flush_interval(mut self, interval: Duration) -> Self {
		self.config.flush_interval = interval;
		self
	}

	pub fn max_retries(mut self, retries: u32) -> Self {
		self.config.max_retries = retries;
		self
	}

	/// Base retry delay. The n-th retry waits `delay * n`.
	pub fn retry_delay(mut self, delay: Duration) -> Self {
		self.config.retry_delay = delay;
		self
	}

	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.config.timeout = timeout;
		self
	}

	pub fn dedup(mut self, dedup: DedupConfig) -> Self {
		self.config.dedup = dedup;
		self
	}

	pub fn sanitize(mut self, sanitize: SanitizeConfig) -> Self {
		self.config.sanitize = sanitize;
		self
	}

	pub fn compression(mut self, compression: CompressionConfig) -> Self {
		self.config.compression = compression;
		self
	}

	/// Signs every request with HMAC-SHA256 under this secret.
	pub fn signing_secret(mut self, secret: impl Into<String>) -> Self {
		self.config.signing_secret = Some(secret.into());
		self
	}

	/// Persists the offline queue to this file.
	pub fn offline_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.config.offline_storage = OfflineStorage::File(path.into());
		self
	}

	/// Keeps the offline queue in memory instead of the platform data directory.
	pub fn in_memory_offline(mut self) -> Self {
		self.config.offline_storage = OfflineStorage::Memory;
		self
	}

	pub fn max_offline_events(mut self, max: usize) -> Self {
		self.config.max_offline_events = max;
		self
	}

	/// Replaces the HTTP sender.
	pub fn sender(mut self, sender: Arc<dyn BatchSender>) -> Self {
		self.sender = Some(sender);
		self
	}

	/// Replaces the random source used for sampling.
	pub fn sample_source(mut self, roll: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
		self.sample_source = Some(Box::new(roll));
		self
	}

	/// Adds an event processor. Processors run in registration order.
	pub fn event_processor(mut self, processor: impl EventProcessor + 'static) -> Self {
		self.event_processors.push(Box::new(processor));
		self
	}

	/// Adds a breadcrumb processor. Processors run in registration order.
	pub fn before_breadcrumb(mut self, processor: impl BreadcrumbProcessor + 'static) -> Self {
		self.breadcrumb_processors.push(Box::new(processor));
		self
	}

	/// Builds the client without starting the flush timer.
	pub fn build(mut self) -> Result<MonitorClient> {
		self.config.dsn = self.dsn.ok_or(SdkError::MissingDsn)?;
		self.config.app_id = self.app_id.ok_or(SdkError::MissingAppId)?;
		self.config.validate()?;

		let config = self.config;
		let sender = match self.sender {
			Some(sender) => sender,
			None => Arc::new(HttpBatchSender::new(&config.dsn, config.timeout)?),
		};
		let transport = Transport::new(&config, sender, open_offline_queue(&config));
		let sampler = match self.sample_source {
			Some(roll) => Sampler::with_source(config.sample_rates.clone(), roll),
			None => Sampler::new(config.sample_rates.clone()),
		};

		let inner = Arc::new(MonitorClientInner {
			sampler,
			dedup: Deduplicator::new(&config.dedup),
			sanitizer: Sanitizer::new(&config.sanitize)?,
			event_processors: self.event_processors,
			breadcrumb_processors: self.breadcrumb_processors,
			breadcrumbs: RwLock::new(BreadcrumbBuffer::new(config.max_breadcrumbs)),
			user: RwLock::new(None),
			tags: RwLock::new(BTreeMap::new()),
			transport,
			closed: AtomicBool::new(false),
			config,
		});

		info!(
			dsn = %inner.config.dsn,
			app_id = %inner.config.app_id,
			"Monitor client initialized"
		);
		Ok(MonitorClient { inner })
	}

	/// Builds the client and starts the periodic flush timer.
	///
	/// Must be called from within a Tokio runtime.
	pub async fn build_async(self) -> Result<MonitorClient> {
		let client = self.build()?;
		client.start();
		Ok(client)
	}
}

impl Default for MonitorClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

struct MonitorClientInner {
	config: SdkConfig,
	sampler: Sampler,
	dedup: Deduplicator,
	sanitizer: Sanitizer,
	event_processors: Vec<Box<dyn EventProcessor>>,
	breadcrumb_processors: Vec<Box<dyn BreadcrumbProcessor>>,
	breadcrumbs: RwLock<BreadcrumbBuffer>,
	user: RwLock<Option<UserContext>>,
	tags: RwLock<BTreeMap<String, String>>,
	transport: Transport,
	closed: AtomicBool,
}

/// Client for capturing events and delivering them to the collector.
///
/// # Example
///
/// ```ignore
/// use monitor_sdk::{ErrorData, MonitorClient};
///
/// let client = MonitorClient::builder()
///     .dsn("https://monitor.example.com/api/tracker")
///     .app_id("web-shop")
///     .release("1.4.2")
///     .build_async()
///     .await?;
///
/// client.capture_error(ErrorData::new("js_error", "x is undefined")).await?;
/// client.shutdown().await;
/// ```
#[derive(Clone)]
pub struct MonitorClient {
	inner: Arc<MonitorClientInner>,
}

impl MonitorClient {
	pub fn builder() -> MonitorClientBuilder {
		MonitorClientBuilder::new()
	}

	/// Starts the periodic flush timer.
	pub fn start(&self) {
		self.inner.transport.start();
	}

	pub fn config(&self) -> &SdkConfig {
		&self.inner.config
	}

	/// Runs an event through sampling, deduplication, sanitization and the
	/// processors, then queues it for delivery.
	pub async fn capture(&self, mut event: Event) -> Result<CaptureOutcome> {
		self.check_closed()?;
		self.attach_context(&mut event).await;

		if !self.inner.sampler.sample(&event) {
			debug!(event_type = %event.event_type, "event sampled out");
			return Ok(CaptureOutcome::Sampled);
		}

		let dedup = &self.inner.config.dedup;
		if dedup.enabled && (event.is_error() || !dedup.errors_only) && !self.inner.dedup.should_report(&event) {
			return Ok(CaptureOutcome::Deduplicated);
		}

		let mut event = self.inner.sanitizer.sanitize_event(&event)?;
		for processor in &self.inner.event_processors {
			match processor.process(event) {
				Some(processed) => event = processed,
				None => {
					debug!("event dropped by processor");
					return Ok(CaptureOutcome::Dropped);
				}
			}
		}

		let event_id = event.event_id;
		self.inner.transport.enqueue(event).await?;
		Ok(CaptureOutcome::Queued(event_id))
	}

	/// Captures a structured error.
	pub async fn capture_error(&self, error: ErrorData) -> Result<CaptureOutcome> {
		let event = Event::from_error(&error)?;
		self.capture(event).await
	}

	/// Captures an event of any type from a raw payload, recording `level` in it.
	pub async fn capture_data(
		&self,
		event_type: EventType,
		level: Level,
		mut data: serde_json::Value,
	) -> Result<CaptureOutcome> {
		if let Some(object) = data.as_object_mut() {
			object.insert("level".to_string(), serde_json::to_value(level)?);
		}
		self.capture(Event::new(event_type, data)).await
	}

	/// Captures a free-form message at the given level.
	pub async fn capture_message(&self, message: impl Into<String>, level: Level) -> Result<CaptureOutcome> {
		let event = Event::new(
			EventType::Custom,
			serde_json::json!({
				"message": message.into(),
				"level": level,
			}),
		);
		self.capture(event).await
	}

	async fn attach_context(&self, event: &mut Event) {
		let context = &mut event.context;
		context.sdk.get_or_insert_with(|| SdkInfo {
			name: SDK_NAME.to_string(),
			version: SDK_VERSION.to_string(),
		});
		context.app.get_or_insert_with(|| AppInfo {
			app_id: self.inner.config.app_id.clone(),
			release: self.inner.config.release.clone(),
			environment: Some(self.inner.config.environment.clone()),
		});
		if context.user.is_none() {
			context.user = self.inner.user.read().await.clone();
		}
		for (key, value) in self.inner.tags.read().await.iter() {
			context.tags.entry(key.clone()).or_insert_with(|| value.clone());
		}
		if event.breadcrumbs.is_empty() {
			event.breadcrumbs = self.inner.breadcrumbs.read().await.all();
		}
	}

	/// Records a breadcrumb, unless a breadcrumb processor drops it.
	pub async fn add_breadcrumb(&self, breadcrumb: Breadcrumb) {
		let mut breadcrumb = breadcrumb;
		for processor in &self.inner.breadcrumb_processors {
			match processor.process(breadcrumb) {
				Some(processed) => breadcrumb = processed,
				None => return,
			}
		}
		self.inner.breadcrumbs.write().await.push(breadcrumb);
	}

	pub async fn breadcrumbs(&self) -> Vec<Breadcrumb> {
		self.inner.breadcrumbs.read().await.all()
	}

	pub async fn clear_breadcrumbs(&self) {
		self.inner.breadcrumbs.write().await.clear();
	}

	/// Sets the user context attached to every event.
	pub async fn set_user(&self, user: UserContext) {
		*self.inner.user.write().await = Some(user);
	}

	pub async fn clear_user(&self) {
		*self.inner.user.write().await = None;
	}

	/// Sets a global tag. Tags on the event itself take precedence.
	pub async fn set_tag(&self, key: impl Into<String>, value: impl Into<String>) {
		self.inner.tags.write().await.insert(key.into(), value.into());
	}

	pub async fn remove_tag(&self, key: &str) {
		self.inner.tags.write().await.remove(key);
	}

	pub async fn flush(&self) -> FlushOutcome {
		self.inner.transport.flush().await
	}

	/// Connectivity restored: resume delivery and flush.
	pub async fn on_online(&self) -> FlushOutcome {
		self.inner.transport.on_online().await
	}

	pub fn on_offline(&self) {
		self.inner.transport.on_offline();
	}

	/// The host is being backgrounded: flush while we still can.
	pub async fn on_visibility_hidden(&self) -> FlushOutcome {
		self.inner.transport.on_visibility_hidden().await
	}

	/// Undelivered events, in memory and offline.
	pub fn queue_len(&self) -> usize {
		self.inner.transport.queue_len() + self.inner.transport.offline_len()
	}

	/// Events parked in the offline queue.
	pub fn offline_len(&self) -> usize {
		self.inner.transport.offline_len()
	}

	pub fn status(&self) -> TransportStatus {
		self.inner.transport.status()
	}

	/// Makes a final flush and persists anything undelivered.
	pub async fn shutdown(&self) {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		self.inner.transport.shutdown().await;
		info!("Monitor client shutdown");
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}

	fn check_closed(&self) -> Result<()> {
		if self.inner.closed.load(Ordering::SeqCst) {
			return Err(SdkError::ClientShutdown);
		}
		Ok(())
	}
}

#[async_trait]
impl ErrorReporter for MonitorClient {
	async fn report_error(&self, error: ErrorData) -> Result<CaptureOutcome> {
		self.capture_error(error).await
	}

	async fn report_event(&self, event: Event) -> Result<CaptureOutcome> {
		self.capture(event).await
	}

	async fn record_breadcrumb(&self, breadcrumb: Breadcrumb) {
		self.add_breadcrumb(breadcrumb).await;
	}
}
