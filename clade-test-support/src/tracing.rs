//! Recording layer utilities for capturing spans and events in tests.
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

/// Recording layer installed during tests to capture spans and events for
/// later assertions.
///
/// Events also record the names of the spans they were emitted in, outermost
/// first, so tests can check that run-scoped diagnostics carry the run span.
#[derive(Clone, Default)]
pub struct RecordingLayer {
    spans: Arc<Mutex<Vec<SpanRecord>>>,
    events: Arc<Mutex<Vec<EventRecord>>>,
}

impl RecordingLayer {
    /// Runs `f` with a fresh registry carrying a recording layer installed as
    /// the default subscriber and returns its output with the layer.
    ///
    /// # Examples
    /// ```
    /// use clade_test_support::tracing::RecordingLayer;
    ///
    /// let (value, layer) = RecordingLayer::capture(|| {
    ///     tracing::warn!(dropped = 2, "stale records dropped");
    ///     7
    /// });
    /// assert_eq!(value, 7);
    /// assert!(layer.has_message(tracing::Level::WARN, "stale records dropped"));
    /// ```
    pub fn capture<T>(f: impl FnOnce() -> T) -> (T, Self) {
        let layer = Self::default();
        let subscriber = tracing_subscriber::registry().with(layer.clone());
        let output = tracing::subscriber::with_default(subscriber, f);
        (output, layer)
    }

    /// Returns a snapshot of the closed spans in completion order.
    ///
    /// # Examples
    /// ```
    /// use clade_test_support::tracing::RecordingLayer;
    ///
    /// let layer = RecordingLayer::default();
    /// assert!(layer.spans().is_empty());
    /// ```
    #[must_use]
    pub fn spans(&self) -> Vec<SpanRecord> {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns a snapshot of the emitted events in emission order.
    ///
    /// # Examples
    /// ```
    /// use clade_test_support::tracing::RecordingLayer;
    ///
    /// let layer = RecordingLayer::default();
    /// assert!(layer.events().is_empty());
    /// ```
    #[must_use]
    pub fn events(&self) -> Vec<EventRecord> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the first closed span with the given name.
    #[must_use]
    pub fn span(&self, name: &str) -> Option<SpanRecord> {
        self.spans().into_iter().find(|span| span.name == name)
    }

    /// Returns every event at `level` whose message equals `message`.
    #[must_use]
    pub fn events_with_message(&self, level: Level, message: &str) -> Vec<EventRecord> {
        self.events()
            .into_iter()
            .filter(|event| event.level == level && event.message() == Some(message))
            .collect()
    }

    /// Reports whether an event at `level` carried exactly `message`.
    #[must_use]
    pub fn has_message(&self, level: Level, message: &str) -> bool {
        !self.events_with_message(level, message).is_empty()
    }
}

/// Snapshot of a closed span, including its name and recorded fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanRecord {
    /// Span name captured from the tracing metadata.
    pub name: String,
    /// Structured fields recorded against the span.
    pub fields: HashMap<String, String>,
}

/// Snapshot of an emitted tracing event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Log level associated with the recorded event.
    pub level: Level,
    /// Event target string extracted from the metadata.
    pub target: String,
    /// Structured fields attached to the event.
    pub fields: HashMap<String, String>,
    /// Names of the enclosing spans, outermost first.
    pub scope: Vec<String>,
}

impl EventRecord {
    /// The event's message, if it carried one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.field("message")
    }

    /// The recorded value of `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Reports whether the event was emitted inside a span called `name`.
    #[must_use]
    pub fn within(&self, name: &str) -> bool {
        self.scope.iter().any(|span| span == name)
    }
}

#[derive(Default)]
struct SpanData {
    name: String,
    fields: HashMap<String, String>,
}

impl<S> Layer<S> for RecordingLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: Context<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            let mut data = SpanData {
                name: attrs.metadata().name().to_owned(),
                fields: HashMap::new(),
            };
            attrs.record(&mut FieldRecorder {
                fields: &mut data.fields,
            });
            span.extensions_mut().insert(data);
        }
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        ctx: Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        let Some(data) = extensions.get_mut::<SpanData>() else {
            return;
        };
        values.record(&mut FieldRecorder {
            fields: &mut data.fields,
        });
    }

    fn on_close(&self, id: tracing::span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else {
            return;
        };
        let Some(data) = span.extensions_mut().remove::<SpanData>() else {
            return;
        };
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SpanRecord {
                name: data.name,
                fields: data.fields,
            });
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldRecorder {
            fields: &mut fields,
        });
        let scope = ctx
            .event_scope(event)
            .map(|scope| {
                scope
                    .from_root()
                    .map(|span| span.name().to_owned())
                    .collect()
            })
            .unwrap_or_default();
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(EventRecord {
                level: *event.metadata().level(),
                target: event.metadata().target().to_owned(),
                fields,
                scope,
            });
    }
}

struct FieldRecorder<'a> {
    fields: &'a mut HashMap<String, String>,
}

impl FieldRecorder<'_> {
    fn insert(&mut self, field: &Field, value: String) {
        self.fields.insert(field.name().to_owned(), value);
    }
}

impl Visit for FieldRecorder<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_owned());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.to_string());
    }
}
