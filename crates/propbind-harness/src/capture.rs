#![forbid(unsafe_code)]

//! In-memory `tracing` capture.
//!
//! [`LogCapture::install`] sets a thread-local default subscriber that records
//! every event (level, message, and the `binding_id`/`direction` fields) and
//! the name of every span created. Only the installing thread is captured.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub binding_id: Option<u64>,
    pub direction: Option<String>,
}

#[derive(Default)]
struct Captured {
    events: Vec<CapturedEvent>,
    spans: Vec<String>,
}

/// Shared view of everything recorded since installation.
#[derive(Clone, Default)]
pub struct LogCapture {
    inner: Arc<Mutex<Captured>>,
}

impl LogCapture {
    /// Capture on the current thread until the guard drops.
    #[must_use]
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::registry().with(CaptureLayer {
            inner: Arc::clone(&capture.inner),
        });
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    #[must_use]
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.inner.lock().events.clone()
    }

    /// Events at exactly `level`.
    #[must_use]
    pub fn at(&self, level: Level) -> Vec<CapturedEvent> {
        self.inner
            .lock()
            .events
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    /// Whether any event at `level` has a message containing `needle`.
    #[must_use]
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.inner
            .lock()
            .events
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }

    /// Number of spans created with `name`.
    #[must_use]
    pub fn span_count(&self, name: &str) -> usize {
        self.inner.lock().spans.iter().filter(|s| *s == name).count()
    }
}

impl fmt::Debug for LogCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("LogCapture")
            .field("events", &inner.events.len())
            .field("spans", &inner.spans.len())
            .finish()
    }
}

struct CaptureLayer {
    inner: Arc<Mutex<Captured>>,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::Id,
        _ctx: Context<'_, S>,
    ) {
        self.inner
            .lock()
            .spans
            .push(attrs.metadata().name().to_owned());
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        self.inner.lock().events.push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message.unwrap_or_default(),
            binding_id: visitor.binding_id,
            direction: visitor.direction,
        });
    }
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    binding_id: Option<u64>,
    direction: Option<String>,
}

impl Visit for EventVisitor {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "binding_id" {
            self.binding_id = Some(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_owned()),
            "direction" => self.direction = Some(value.to_owned()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{value:?}")),
            "direction" => {
                self.direction = Some(format!("{value:?}").trim_matches('"').to_owned());
            }
            _ => {}
        }
    }
}
