//! Host state the exporter reads from.
//!
//! The editor exposes its live shapes under one or more bindings, an optional
//! code editor and an optional persistent store. They are handed to the
//! exporter explicitly through [`HostBindings`].

use crate::model::DrawingSnapshot;
use crate::storage::ShapeStore;
use std::fmt;

/// A live, in-memory shape list exposed by the host.
pub trait ShapeBinding {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Current shapes, or `None` when the binding is not defined.
    fn shapes(&self) -> Option<DrawingSnapshot>;
}

/// The host's code editor.
pub trait CodeEditor {
    /// Current editor contents.
    fn text(&self) -> String;
}

/// Binding over a fixed snapshot.
#[derive(Debug, Clone)]
pub struct StaticShapes {
    name: String,
    snapshot: DrawingSnapshot,
}

impl StaticShapes {
    pub fn new(name: impl Into<String>, snapshot: DrawingSnapshot) -> Self {
        Self {
            name: name.into(),
            snapshot,
        }
    }
}

impl ShapeBinding for StaticShapes {
    fn name(&self) -> &str {
        &self.name
    }

    fn shapes(&self) -> Option<DrawingSnapshot> {
        Some(self.snapshot.clone())
    }
}

/// Editor with fixed contents.
#[derive(Debug, Clone, Default)]
pub struct StaticEditor(pub String);

impl CodeEditor for StaticEditor {
    fn text(&self) -> String {
        self.0.clone()
    }
}

/// Where the exported snapshot came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    /// A non-empty live binding, by name.
    Binding(String),
    /// The persistent store answered in time.
    Store,
    /// The store query outlived its timeout.
    StoreTimedOut,
    /// The store query failed.
    StoreFailed,
    /// Every binding was empty and no store was attached.
    Unavailable,
}

impl fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotSource::Binding(name) => write!(f, "binding `{}`", name),
            SnapshotSource::Store => f.write_str("persistent store"),
            SnapshotSource::StoreTimedOut => f.write_str("persistent store (timed out)"),
            SnapshotSource::StoreFailed => f.write_str("persistent store (failed)"),
            SnapshotSource::Unavailable => f.write_str("nothing"),
        }
    }
}

/// Everything the exporter may read from the host, in priority order.
#[derive(Default)]
pub struct HostBindings {
    bindings: Vec<Box<dyn ShapeBinding>>,
    editor: Option<Box<dyn CodeEditor>>,
    store: Option<Box<dyn ShapeStore>>,
}

impl HostBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a live binding; earlier bindings take priority.
    pub fn with_binding(mut self, binding: impl ShapeBinding + 'static) -> Self {
        self.bindings.push(Box::new(binding));
        self
    }

    pub fn with_editor(mut self, editor: impl CodeEditor + 'static) -> Self {
        self.editor = Some(Box::new(editor));
        self
    }

    pub fn with_store(mut self, store: impl ShapeStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn store(&self) -> Option<&dyn ShapeStore> {
        self.store.as_deref()
    }

    /// First live binding holding at least one shape.
    pub fn live_snapshot(&self) -> Option<(DrawingSnapshot, SnapshotSource)> {
        self.bindings.iter().find_map(|binding| {
            let snapshot = binding.shapes().filter(|s| !s.is_empty())?;
            log::info!("Using binding `{}` with {} shapes", binding.name(), snapshot.len());
            Some((snapshot, SnapshotSource::Binding(binding.name().to_string())))
        })
    }

    /// Editor contents, empty without an editor.
    pub fn editor_text(&self) -> String {
        self.editor.as_ref().map(|e| e.text()).unwrap_or_default()
    }
}
