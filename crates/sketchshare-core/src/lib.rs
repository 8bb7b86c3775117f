//! SketchShare Core Library
//!
//! Platform-agnostic pipeline that turns the live state of the sketch editor
//! into a standalone, shareable HTML page.

pub mod config;
pub mod emit;
pub mod export;
pub mod model;
pub mod provider;
pub mod splice;
pub mod storage;

pub use config::{ConfigError, ShareConfig};
pub use emit::{DownloadEmitter, EmitError, EmitResult, MemoryEmitter};
pub use export::{
    Delay, EXPORT_FAILED_MESSAGE, ExportError, ExportReport, Exporter, MarkupError, MarkupSource,
    Notifier,
};
pub use model::{DrawingSnapshot, ShapeRecord, ShareMode};
pub use provider::{
    CodeEditor, HostBindings, ShapeBinding, SnapshotSource, StaticEditor, StaticShapes,
};
pub use splice::{ANCHOR_MISSING_MESSAGE, Anchor, SpliceOptions, SpliceOutput, splice};
pub use storage::{BoxFuture, MemoryShapeStore, ShapeStore, StoreError, StoreResult};
