//! Delivering the finished page to the user.

use std::cell::RefCell;
use thiserror::Error;

/// MIME type of exported pages.
pub const HTML_MIME_TYPE: &str = "text/html";

/// Errors while handing the page over.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("Download cancelled")]
    Cancelled,
}

pub type EmitResult<T> = Result<T, EmitError>;

/// Turns a string into a file download.
///
/// Every call owns the resources it allocates and releases them itself.
pub trait DownloadEmitter {
    fn emit(&self, content: &str, file_name: &str) -> EmitResult<()>;
}

/// Keeps emitted files in memory.
#[derive(Debug, Default)]
pub struct MemoryEmitter {
    files: RefCell<Vec<(String, String)>>,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(file_name, content)` pairs in emission order.
    pub fn files(&self) -> Vec<(String, String)> {
        self.files.borrow().clone()
    }

    pub fn last(&self) -> Option<(String, String)> {
        self.files.borrow().last().cloned()
    }
}

impl DownloadEmitter for MemoryEmitter {
    fn emit(&self, content: &str, file_name: &str) -> EmitResult<()> {
        self.files
            .borrow_mut()
            .push((file_name.to_string(), content.to_string()));
        Ok(())
    }
}
