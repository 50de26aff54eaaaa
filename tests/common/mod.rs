//! Synthetic-image builder shared by the integration tests.
//!
//! Tests lay out metadata structures exactly as a compiler would emit them
//! into a binary's data sections, then register named section ranges over
//! the buffer.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use objlift::{Address, MemoryFile};

pub const BASE: Address = 0x1_0000_0000;

#[derive(Clone, Default)]
#[allow(dead_code)]
struct WarningLayer(Arc<Mutex<Vec<String>>>);

impl<S: tracing::Subscriber> Layer<S> for WarningLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != tracing::Level::WARN {
            return;
        }
        struct Collector(String);
        impl Visit for Collector {
            fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
                let _ = write!(self.0, "{}={:?} ", field.name(), value);
            }
        }
        let mut collector = Collector(String::new());
        event.record(&mut collector);
        self.0.lock().unwrap().push(collector.0);
    }
}

/// Run `f` under a subscriber that records warning events, returning the
/// result alongside the rendered warnings.
#[allow(dead_code)]
pub fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    let layer = WarningLayer::default();
    let store = Arc::clone(&layer.0);
    let subscriber = tracing_subscriber::registry().with(layer);
    let result = tracing::subscriber::with_default(subscriber, f);
    let warnings = store.lock().unwrap().clone();
    (result, warnings)
}

pub struct ImageBuilder {
    base: Address,
    bytes: Vec<u8>,
    sections: Vec<(String, Address, Address)>,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self {
            base: BASE,
            bytes: Vec::new(),
            sections: Vec::new(),
        }
    }

    /// Address the next pushed byte will land at.
    pub fn pos(&self) -> Address {
        self.base + self.bytes.len() as u64
    }

    pub fn u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Push a NUL-terminated string, returning its address.
    pub fn str(&mut self, s: &str) -> Address {
        let at = self.pos();
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        at
    }

    /// Push `len` zero bytes, returning the start address.
    pub fn zeros(&mut self, len: usize) -> Address {
        let at = self.pos();
        self.bytes.resize(self.bytes.len() + len, 0);
        at
    }

    /// Overwrite a previously pushed u64 in place.
    pub fn patch_u64(&mut self, address: Address, value: u64) {
        let offset = (address - self.base) as usize;
        self.bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    pub fn section(&mut self, name: &str, start: Address, end: Address) {
        self.sections.push((name.to_string(), start, end));
    }

    pub fn build(self) -> MemoryFile {
        let mut file = MemoryFile::new(self.bytes, self.base, 8);
        for (name, start, end) in self.sections {
            file.add_section(name, start, end);
        }
        file
    }
}
