//! Command line interface of the native exporter.

use crate::file_ops::{FileEditor, FileMarkup, JsonFileShapes, NativeEmitter};
use anyhow::Context;
use clap::Parser;
use sketchshare_core::storage::FileShapeStore;
use sketchshare_core::{HostBindings, ShareConfig, ShareMode};
use std::path::PathBuf;

/// Export a canvas sketch as a standalone HTML page.
#[derive(Debug, Parser)]
#[command(name = "sketchshare", version, about)]
pub struct Cli {
    /// Saved copy of the sketch page to embed the drawing into.
    #[arg(long)]
    pub page: PathBuf,

    /// `editable` or `view-only`.
    #[arg(long, default_value = "editable")]
    pub mode: ShareMode,

    /// JSON array of shapes (primary binding).
    #[arg(long)]
    pub shapes: Option<PathBuf>,

    /// JSON editor state holding a shape array (secondary binding).
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Location of the shape array inside `--state`.
    #[arg(long, default_value = "/shapes")]
    pub state_pointer: String,

    /// Directory of `<key>.json` shape records, used when the bindings are empty.
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// File with the code panel contents.
    #[arg(long)]
    pub editor: Option<PathBuf>,

    /// JSON configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory the page is written to.
    #[arg(long, default_value = ".", conflicts_with = "save_dialog")]
    pub out_dir: PathBuf,

    /// Choose the destination in a save dialog.
    #[arg(long)]
    pub save_dialog: bool,
}

impl Cli {
    pub fn share_config(&self) -> anyhow::Result<ShareConfig> {
        match &self.config {
            Some(path) => ShareConfig::load(path)
                .with_context(|| format!("Loading config {}", path.display())),
            None => Ok(ShareConfig::default()),
        }
    }

    pub fn markup(&self) -> FileMarkup {
        FileMarkup::new(self.page.clone())
    }

    pub fn emitter(&self) -> NativeEmitter {
        if self.save_dialog {
            NativeEmitter::Dialog
        } else {
            NativeEmitter::Directory(self.out_dir.clone())
        }
    }

    /// Bindings, editor and store named on the command line.
    pub fn host_bindings(&self) -> anyhow::Result<HostBindings> {
        let mut host = HostBindings::new();

        if let Some(path) = &self.shapes {
            host = host.with_binding(JsonFileShapes::load(path, "")?);
        }
        if let Some(path) = &self.state {
            host = host.with_binding(JsonFileShapes::load(path, &self.state_pointer)?);
        }
        if let Some(path) = &self.editor {
            host = host.with_editor(FileEditor::load(path)?);
        }
        if let Some(dir) = &self.store_dir {
            let store = FileShapeStore::open(dir.clone())
                .with_context(|| format!("Opening shape store {}", dir.display()))?;
            host = host.with_store(store);
        }
        Ok(host)
    }
}
