//! Native platform services: files on disk, tokio timers, save dialogs.

use serde_json::Value;
use sketchshare_core::{
    BoxFuture, CodeEditor, Delay, DownloadEmitter, DrawingSnapshot, EmitError, EmitResult,
    MarkupError, MarkupSource, Notifier, ShapeBinding,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Page markup read from a saved copy of the sketch page.
pub struct FileMarkup {
    path: PathBuf,
}

impl FileMarkup {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl MarkupSource for FileMarkup {
    fn fetch(&self) -> BoxFuture<'_, Result<String, MarkupError>> {
        Box::pin(async move {
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| {
                    MarkupError::Io(format!("Failed to read {}: {}", self.path.display(), e))
                })
        })
    }
}

/// Where exported pages are written.
pub enum NativeEmitter {
    /// Write `<dir>/<file_name>`.
    Directory(PathBuf),
    /// Ask with a native save dialog.
    Dialog,
}

impl NativeEmitter {
    fn write(path: &Path, content: &str) -> EmitResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                EmitError::Io(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        fs::write(path, content)
            .map_err(|e| EmitError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
        log::info!("Saved shared sketch to: {:?}", path);
        Ok(())
    }
}

impl DownloadEmitter for NativeEmitter {
    fn emit(&self, content: &str, file_name: &str) -> EmitResult<()> {
        match self {
            NativeEmitter::Directory(dir) => Self::write(&dir.join(file_name), content),
            NativeEmitter::Dialog => {
                let dialog = rfd::FileDialog::new()
                    .set_title("Save Shared Sketch")
                    .set_file_name(file_name)
                    .add_filter("HTML Page", &["html"]);
                let path = dialog.save_file().ok_or(EmitError::Cancelled)?;
                Self::write(&path, content)
            }
        }
    }
}

/// `tokio::time::sleep`.
pub struct TokioDelay;

impl Delay for TokioDelay {
    fn delay(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Prints user-facing notices on stderr.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn alert(&self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Shape list loaded from a JSON file.
///
/// `pointer` selects the array inside the document (RFC 6901), e.g.
/// `/shapes` for a saved editor state object. Empty means the whole file.
pub struct JsonFileShapes {
    name: String,
    snapshot: Option<DrawingSnapshot>,
}

impl JsonFileShapes {
    pub fn load(path: &Path, pointer: &str) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let document: Value = serde_json::from_str(&json)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        Ok(Self::from_value(path.display().to_string(), &document, pointer))
    }

    pub fn from_value(name: String, document: &Value, pointer: &str) -> Self {
        let snapshot = match document.pointer(pointer) {
            Some(Value::Array(records)) => Some(DrawingSnapshot::new(records.clone())),
            Some(_) => {
                log::warn!("{}{} is not an array of shapes", name, pointer);
                None
            }
            None => None,
        };
        let name = if pointer.is_empty() { name } else { format!("{}#{}", name, pointer) };
        Self { name, snapshot }
    }
}

impl ShapeBinding for JsonFileShapes {
    fn name(&self) -> &str {
        &self.name
    }

    fn shapes(&self) -> Option<DrawingSnapshot> {
        self.snapshot.clone()
    }
}

/// Editor text read from a file.
pub struct FileEditor(String);

impl FileEditor {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        Ok(Self(text))
    }
}

impl CodeEditor for FileEditor {
    fn text(&self) -> String {
        self.0.clone()
    }
}
