//! Export orchestration.
//!
//! Resolves the drawing, fetches the page's own markup, splices the two
//! together and hands the page to a [`DownloadEmitter`]. Platform pieces
//! (markup fetch, timers, alerts) come in through small traits so the same
//! flow runs in the browser, on the command line and in tests.

use crate::config::ShareConfig;
use crate::emit::{DownloadEmitter, EmitError};
use crate::model::{DrawingSnapshot, ShareMode};
use crate::provider::{HostBindings, SnapshotSource};
use crate::splice::{ANCHOR_MISSING_MESSAGE, Anchor, splice};
use crate::storage::{BoxFuture, ShapeStore};
use futures::future::{Either, select};
use std::time::Duration;
use thiserror::Error;

/// Alert text for a failed export.
pub const EXPORT_FAILED_MESSAGE: &str = "Error creating shareable version. Please try again.";

/// Errors while obtaining the page markup.
#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Fetch failed: {0}")]
    Fetch(String),
    #[error("Invalid response body: {0}")]
    Decode(String),
}

/// Errors that abort an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to fetch page markup: {0}")]
    Markup(#[from] MarkupError),
    #[error("Failed to serialize shapes: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to deliver file: {0}")]
    Emit(#[from] EmitError),
}

/// Source of the page's own markup.
pub trait MarkupSource {
    fn fetch(&self) -> BoxFuture<'_, Result<String, MarkupError>>;
}

/// Platform timer.
pub trait Delay {
    /// Resolve after `duration`.
    fn delay(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

/// User-facing notices.
pub trait Notifier {
    fn alert(&self, message: &str);
}

/// Summary of a finished export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub file_name: String,
    pub bytes: usize,
    pub shape_count: usize,
    pub source: SnapshotSource,
    pub anchor: Option<Anchor>,
    pub editor_embedded: bool,
}

/// Runs exports against one set of platform services.
pub struct Exporter<M, E, D> {
    markup: M,
    emitter: E,
    delay: D,
    config: ShareConfig,
}

impl<M: MarkupSource, E: DownloadEmitter, D: Delay> Exporter<M, E, D> {
    pub fn new(markup: M, emitter: E, delay: D, config: ShareConfig) -> Self {
        Self {
            markup,
            emitter,
            delay,
            config,
        }
    }

    pub fn config(&self) -> &ShareConfig {
        &self.config
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    /// Export and download the page, alerting the user on failure.
    ///
    /// Returns the report when a file was produced.
    pub async fn run(
        &self,
        host: &HostBindings,
        mode: ShareMode,
        notifier: &dyn Notifier,
    ) -> Option<ExportReport> {
        match self.export(host, mode).await {
            Ok(report) => {
                if report.anchor.is_none() {
                    notifier.alert(ANCHOR_MISSING_MESSAGE);
                }
                Some(report)
            }
            Err(e) => {
                log::error!("Error sharing drawing: {}", e);
                notifier.alert(EXPORT_FAILED_MESSAGE);
                None
            }
        }
    }

    /// Export and download the page.
    ///
    /// Nothing is emitted unless every step before the download succeeded.
    pub async fn export(
        &self,
        host: &HostBindings,
        mode: ShareMode,
    ) -> Result<ExportReport, ExportError> {
        log::info!("Sharing drawing ({})", mode);

        let (markup, snapshot, source) = self.resolve(host).await?;
        log::info!("Exporting {} shapes from {}", snapshot.len(), source);

        let editor_text = host.editor_text();
        let output = splice(&markup, &snapshot, &editor_text, mode, &self.config.splice)?;

        let file_name = self.config.file_name(mode).to_string();
        self.emitter.emit(&output.markup, &file_name)?;
        log::info!("Downloaded {} ({} bytes)", file_name, output.markup.len());

        Ok(ExportReport {
            file_name,
            bytes: output.markup.len(),
            shape_count: snapshot.len(),
            source,
            anchor: output.anchor,
            editor_embedded: output.editor_embedded,
        })
    }

    /// Pick the snapshot and fetch the markup.
    ///
    /// Live bindings are read synchronously; the store query runs alongside
    /// the markup fetch.
    async fn resolve(
        &self,
        host: &HostBindings,
    ) -> Result<(String, DrawingSnapshot, SnapshotSource), ExportError> {
        if let Some((snapshot, source)) = host.live_snapshot() {
            let markup = self.markup.fetch().await?;
            return Ok((markup, snapshot, source));
        }

        match host.store() {
            Some(store) => {
                log::warn!("No shapes in live bindings, querying the persistent store");
                let (markup, (snapshot, source)) =
                    futures::join!(self.markup.fetch(), self.query_store(store));
                Ok((markup?, snapshot, source))
            }
            None => {
                log::warn!("No shapes in live bindings and no persistent store attached");
                let markup = self.markup.fetch().await?;
                Ok((markup, DrawingSnapshot::empty(), SnapshotSource::Unavailable))
            }
        }
    }

    /// Query the store, giving up after the configured timeout.
    async fn query_store(&self, store: &dyn ShapeStore) -> (DrawingSnapshot, SnapshotSource) {
        let timeout = self.config.store_timeout();
        match select(store.get_all(), self.delay.delay(timeout)).await {
            Either::Left((Ok(records), _)) => {
                log::info!("Retrieved {} shapes from the persistent store", records.len());
                (DrawingSnapshot::new(records), SnapshotSource::Store)
            }
            Either::Left((Err(e), _)) => {
                log::error!("Error retrieving shapes from the persistent store: {}", e);
                (DrawingSnapshot::empty(), SnapshotSource::StoreFailed)
            }
            Either::Right(((), _)) => {
                log::warn!("Persistent store did not answer within {:?}", timeout);
                (DrawingSnapshot::empty(), SnapshotSource::StoreTimedOut)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::{EmitResult, MemoryEmitter};
    use crate::model::ShapeRecord;
    use crate::provider::{StaticEditor, StaticShapes};
    use crate::splice::{SCRIPT_MARKER, STYLE_MARKER};
    use crate::storage::{MemoryShapeStore, StoreError, StoreResult};
    use futures::executor::block_on;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::task::Poll;

    const PAGE: &str = "<html><head></head><body>\n\
        <textarea id=\"code\">// default</textarea>\n\
        <script>\nconst premadeSketch = [];\nopenDB().then(init);\n</script>\n\
        </body></html>";

    struct StaticMarkup(&'static str);

    impl MarkupSource for StaticMarkup {
        fn fetch(&self) -> BoxFuture<'_, Result<String, MarkupError>> {
            let markup = self.0.to_string();
            Box::pin(async move { Ok(markup) })
        }
    }

    struct OfflineMarkup;

    impl MarkupSource for OfflineMarkup {
        fn fetch(&self) -> BoxFuture<'_, Result<String, MarkupError>> {
            Box::pin(async { Err(MarkupError::Fetch("network down".to_string())) })
        }
    }

    /// Fires at once.
    struct Instant;

    impl Delay for Instant {
        fn delay(&self, _duration: Duration) -> BoxFuture<'_, ()> {
            Box::pin(futures::future::ready(()))
        }
    }

    /// Never fires.
    struct Forever;

    impl Delay for Forever {
        fn delay(&self, _duration: Duration) -> BoxFuture<'_, ()> {
            Box::pin(futures::future::pending())
        }
    }

    struct HangingStore;

    impl ShapeStore for HangingStore {
        fn get_all(&self) -> BoxFuture<'_, StoreResult<Vec<ShapeRecord>>> {
            Box::pin(futures::future::pending())
        }
    }

    struct BrokenStore;

    impl ShapeStore for BrokenStore {
        fn get_all(&self) -> BoxFuture<'_, StoreResult<Vec<ShapeRecord>>> {
            Box::pin(async { Err(StoreError::Other("transaction aborted".to_string())) })
        }
    }

    type EventLog = Rc<RefCell<Vec<&'static str>>>;

    /// Pending for one poll, then ready.
    async fn yield_once() {
        let mut yielded = false;
        futures::future::poll_fn(|cx| {
            if yielded {
                Poll::Ready(())
            } else {
                yielded = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        })
        .await
    }

    /// Markup that takes one extra poll and logs when it starts and ends.
    struct SlowMarkup(EventLog);

    impl MarkupSource for SlowMarkup {
        fn fetch(&self) -> BoxFuture<'_, Result<String, MarkupError>> {
            Box::pin(async move {
                self.0.borrow_mut().push("fetch started");
                yield_once().await;
                self.0.borrow_mut().push("fetch finished");
                Ok(PAGE.to_string())
            })
        }
    }

    /// Store that takes one extra poll and logs when it starts and ends.
    struct SlowStore(EventLog);

    impl ShapeStore for SlowStore {
        fn get_all(&self) -> BoxFuture<'_, StoreResult<Vec<ShapeRecord>>> {
            Box::pin(async move {
                self.0.borrow_mut().push("query started");
                yield_once().await;
                self.0.borrow_mut().push("query finished");
                Ok(vec![json!({"type": "rect"})])
            })
        }
    }

    struct FullDisk;

    impl DownloadEmitter for FullDisk {
        fn emit(&self, _content: &str, _file_name: &str) -> EmitResult<()> {
            Err(EmitError::Io("no space left".to_string()))
        }
    }

    #[derive(Default)]
    struct Alerts(RefCell<Vec<String>>);

    impl Notifier for Alerts {
        fn alert(&self, message: &str) {
            self.0.borrow_mut().push(message.to_string());
        }
    }

    fn exporter<M: MarkupSource, D: Delay>(markup: M, delay: D) -> Exporter<M, MemoryEmitter, D> {
        Exporter::new(markup, MemoryEmitter::new(), delay, ShareConfig::default())
    }

    fn circle() -> DrawingSnapshot {
        DrawingSnapshot::new(vec![json!({"id": "x1", "type": "circle", "x": 10, "y": 20, "r": 5})])
    }

    #[test]
    fn test_export_from_live_binding() {
        let exporter = exporter(StaticMarkup(PAGE), Forever);
        let host = HostBindings::new()
            .with_binding(StaticShapes::new("window.shapes", circle()))
            .with_editor(StaticEditor("// hi".to_string()))
            .with_store(HangingStore);

        let report = block_on(exporter.export(&host, ShareMode::Editable)).unwrap();

        assert_eq!(report.source, SnapshotSource::Binding("window.shapes".to_string()));
        assert_eq!(report.file_name, "sketch-editable.html");
        assert_eq!(report.shape_count, 1);
        assert_eq!(report.anchor, Some(Anchor::StrictDeclaration));
        assert!(report.editor_embedded);

        let (name, content) = exporter.emitter().last().unwrap();
        assert_eq!(name, "sketch-editable.html");
        assert!(content.contains("\"type\": \"circle\""));
        assert!(!content.contains("x1"));
        assert!(content.contains(">// hi</textarea>"));
        assert_eq!(report.bytes, content.len());
    }

    #[test]
    fn test_second_binding_used_when_first_empty() {
        let exporter = exporter(StaticMarkup(PAGE), Forever);
        let host = HostBindings::new()
            .with_binding(StaticShapes::new("window.shapes", DrawingSnapshot::empty()))
            .with_binding(StaticShapes::new("shapes", circle()));

        let report = block_on(exporter.export(&host, ShareMode::Editable)).unwrap();
        assert_eq!(report.source, SnapshotSource::Binding("shapes".to_string()));
    }

    #[test]
    fn test_store_used_when_bindings_empty() {
        let exporter = exporter(StaticMarkup(PAGE), Forever);
        let host = HostBindings::new()
            .with_binding(StaticShapes::new("window.shapes", DrawingSnapshot::empty()))
            .with_store(MemoryShapeStore::with_records(vec![
                json!({"id": 4, "type": "rect"}),
                json!({"type": "line"}),
            ]));

        let report = block_on(exporter.export(&host, ShareMode::ViewOnly)).unwrap();

        assert_eq!(report.source, SnapshotSource::Store);
        assert_eq!(report.shape_count, 2);
        assert_eq!(report.file_name, "sketch-view-only.html");

        let (_, content) = exporter.emitter().last().unwrap();
        assert!(content.contains(STYLE_MARKER));
        assert!(content.contains(SCRIPT_MARKER));
    }

    #[test]
    fn test_store_query_overlaps_markup_fetch() {
        let log = EventLog::default();
        let exporter = exporter(SlowMarkup(log.clone()), Forever);
        let host = HostBindings::new().with_store(SlowStore(log.clone()));

        let report = block_on(exporter.export(&host, ShareMode::Editable)).unwrap();
        assert_eq!(report.source, SnapshotSource::Store);

        let events = log.borrow();
        let at = |event: &str| events.iter().position(|e| *e == event).unwrap();
        assert!(at("query started") < at("fetch finished"));
        assert!(at("fetch started") < at("query finished"));
    }

    #[test]
    fn test_hanging_store_times_out_to_empty() {
        let exporter = exporter(StaticMarkup(PAGE), Instant);
        let host = HostBindings::new().with_store(HangingStore);

        let report = block_on(exporter.export(&host, ShareMode::Editable)).unwrap();

        assert_eq!(report.source, SnapshotSource::StoreTimedOut);
        assert_eq!(report.shape_count, 0);
        let (_, content) = exporter.emitter().last().unwrap();
        assert!(content.contains("const premadeSketch = [];"));
    }

    #[test]
    fn test_failing_store_degrades_to_empty() {
        let exporter = exporter(StaticMarkup(PAGE), Forever);
        let host = HostBindings::new().with_store(BrokenStore);

        let report = block_on(exporter.export(&host, ShareMode::Editable)).unwrap();
        assert_eq!(report.source, SnapshotSource::StoreFailed);
        assert_eq!(exporter.emitter().files().len(), 1);
    }

    #[test]
    fn test_no_data_still_exports() {
        let exporter = exporter(StaticMarkup(PAGE), Forever);
        let report = block_on(exporter.export(&HostBindings::new(), ShareMode::Editable)).unwrap();

        assert_eq!(report.source, SnapshotSource::Unavailable);
        assert_eq!(report.shape_count, 0);
        assert!(!report.editor_embedded);
    }

    #[test]
    fn test_markup_failure_alerts_once_without_file() {
        let exporter = exporter(OfflineMarkup, Instant);
        let host = HostBindings::new().with_binding(StaticShapes::new("window.shapes", circle()));
        let alerts = Alerts::default();

        let report = block_on(exporter.run(&host, ShareMode::Editable, &alerts));

        assert!(report.is_none());
        assert!(exporter.emitter().files().is_empty());
        assert_eq!(*alerts.0.borrow(), vec![EXPORT_FAILED_MESSAGE.to_string()]);
    }

    #[test]
    fn test_markup_failure_on_store_path() {
        let exporter = exporter(OfflineMarkup, Instant);
        let store = MemoryShapeStore::with_records(vec![json!({"type": "a"})]);
        let host = HostBindings::new().with_store(store);

        let result = block_on(exporter.export(&host, ShareMode::Editable));
        assert!(matches!(result, Err(ExportError::Markup(MarkupError::Fetch(_)))));
        assert!(exporter.emitter().files().is_empty());
    }

    #[test]
    fn test_emit_failure_alerts() {
        let exporter = Exporter::new(StaticMarkup(PAGE), FullDisk, Forever, ShareConfig::default());
        let host = HostBindings::new().with_binding(StaticShapes::new("window.shapes", circle()));
        let alerts = Alerts::default();

        assert!(block_on(exporter.run(&host, ShareMode::Editable, &alerts)).is_none());
        assert_eq!(alerts.0.borrow().len(), 1);
    }

    #[test]
    fn test_missing_anchor_warns_but_exports() {
        let exporter = exporter(StaticMarkup("<p>no anchors</p>"), Forever);
        let host = HostBindings::new().with_binding(StaticShapes::new("window.shapes", circle()));
        let alerts = Alerts::default();

        let report = block_on(exporter.run(&host, ShareMode::Editable, &alerts)).unwrap();

        assert_eq!(report.anchor, None);
        assert_eq!(*alerts.0.borrow(), vec![ANCHOR_MISSING_MESSAGE.to_string()]);
        assert_eq!(exporter.emitter().files().len(), 1);
    }

    #[test]
    fn test_successful_run_is_silent() {
        let exporter = exporter(StaticMarkup(PAGE), Forever);
        let host = HostBindings::new().with_binding(StaticShapes::new("window.shapes", circle()));
        let alerts = Alerts::default();

        assert!(block_on(exporter.run(&host, ShareMode::ViewOnly, &alerts)).is_some());
        assert!(alerts.0.borrow().is_empty());
    }

    #[test]
    fn test_custom_file_names() {
        let config = ShareConfig {
            view_only_file_name: "readonly.html".to_string(),
            ..ShareConfig::default()
        };
        let exporter = Exporter::new(StaticMarkup(PAGE), MemoryEmitter::new(), Forever, config);
        let host = HostBindings::new().with_binding(StaticShapes::new("window.shapes", circle()));

        let report = block_on(exporter.export(&host, ShareMode::ViewOnly)).unwrap();
        assert_eq!(report.file_name, "readonly.html");
    }
}
