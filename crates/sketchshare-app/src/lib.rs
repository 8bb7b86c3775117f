//! SketchShare Application
//!
//! Share buttons for the sketch page (WASM) and a command line exporter
//! (native), both driving the export pipeline from `sketchshare-core`.

#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
pub mod cli;
#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
pub mod file_ops;

#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
pub use cli::Cli;

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::{run_wasm, share_drawing};
