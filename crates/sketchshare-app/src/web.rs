//! WebAssembly entry point and browser bindings.

use sketchshare_core::storage::IndexedDbShapeStore;
use sketchshare_core::{
    BoxFuture, CodeEditor, Delay, DownloadEmitter, DrawingSnapshot, EmitError, EmitResult,
    Exporter, HostBindings, MarkupError, MarkupSource, Notifier, ShapeBinding, ShareConfig,
    ShareMode, emit::HTML_MIME_TYPE,
};
use std::time::Duration;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

/// Buttons wired on startup.
const SHARE_BUTTONS: [(&str, ShareMode); 2] = [
    ("share-editable", ShareMode::Editable),
    ("share-view-only", ShareMode::ViewOnly),
];

/// Initialize logging and wire the share buttons.
#[wasm_bindgen(start)]
pub fn run_wasm() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    log::info!("SketchShare loaded");

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("No document"))?;

    if document.ready_state() == web_sys::DocumentReadyState::Loading {
        let on_ready = Closure::once(Box::new(|| {
            if let Err(e) = wire_buttons() {
                log::error!("Failed to wire share buttons: {:?}", e);
            }
        }) as Box<dyn FnOnce()>);
        document.add_event_listener_with_callback(
            "DOMContentLoaded",
            on_ready.as_ref().unchecked_ref(),
        )?;
        on_ready.forget();
        Ok(())
    } else {
        wire_buttons()
    }
}

/// Export the current drawing; callable from page scripts.
#[wasm_bindgen(js_name = shareDrawing)]
pub async fn share_drawing(view_only: bool) {
    let mode = if view_only { ShareMode::ViewOnly } else { ShareMode::Editable };
    share(mode).await;
}

fn wire_buttons() -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("No document"))?;

    for (id, mode) in SHARE_BUTTONS {
        let Some(button) = document.get_element_by_id(id) else {
            log::warn!("Share button #{} not found", id);
            continue;
        };
        let on_click = Closure::<dyn FnMut()>::new(move || {
            log::info!("Share {} clicked", mode);
            wasm_bindgen_futures::spawn_local(share(mode));
        });
        button.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
        on_click.forget();
    }
    Ok(())
}

async fn share(mode: ShareMode) {
    let config = ShareConfig::default();
    let host = host_bindings(&config);
    let emitter = BrowserEmitter {
        release_delay_ms: config.release_delay_ms,
    };
    let exporter = Exporter::new(PageMarkup, emitter, BrowserDelay, config);
    exporter.run(&host, mode, &AlertNotifier).await;
}

/// Collect the page's shape lists, editor and store.
fn host_bindings(config: &ShareConfig) -> HostBindings {
    let mut host = HostBindings::new()
        .with_binding(WindowShapes)
        .with_binding(ScriptShapes);

    if window_property("editor").is_some() {
        host = host.with_editor(WindowEditor);
    }

    let store = IndexedDbShapeStore::from_window(&config.store_name).or_else(|| {
        config
            .db_name
            .as_deref()
            .map(|name| IndexedDbShapeStore::named(name, &config.store_name))
    });
    if let Some(store) = store {
        host = host.with_store(store);
    }
    host
}

fn window_property(name: &str) -> Option<JsValue> {
    let window = web_sys::window()?;
    js_sys::Reflect::get(&window, &JsValue::from_str(name))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

/// Deep copy a JS array of shapes through JSON.
fn snapshot_from_js(value: &JsValue) -> Option<DrawingSnapshot> {
    if !js_sys::Array::is_array(value) {
        return None;
    }
    let json: String = js_sys::JSON::stringify(value).ok()?.into();
    match DrawingSnapshot::from_json(&json) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            log::warn!("Ignoring unreadable shape list: {}", e);
            None
        }
    }
}

/// `window.shapes`.
struct WindowShapes;

impl ShapeBinding for WindowShapes {
    fn name(&self) -> &str {
        "window.shapes"
    }

    fn shapes(&self) -> Option<DrawingSnapshot> {
        snapshot_from_js(&window_property("shapes")?)
    }
}

/// A script-scoped `shapes` declared with `let`/`const`, invisible on `window`.
struct ScriptShapes;

impl ShapeBinding for ScriptShapes {
    fn name(&self) -> &str {
        "shapes"
    }

    fn shapes(&self) -> Option<DrawingSnapshot> {
        let lookup = js_sys::Function::new_no_args(
            "return typeof shapes !== 'undefined' ? shapes : undefined;",
        );
        snapshot_from_js(&lookup.call0(&JsValue::NULL).ok()?)
    }
}

/// `window.editor`, a CodeMirror instance.
struct WindowEditor;

impl CodeEditor for WindowEditor {
    fn text(&self) -> String {
        let Some(editor) = window_property("editor") else {
            return String::new();
        };
        js_sys::Reflect::get(&editor, &JsValue::from_str("getValue"))
            .ok()
            .and_then(|f| f.dyn_into::<js_sys::Function>().ok())
            .and_then(|get_value| get_value.call0(&editor).ok())
            .and_then(|text| text.as_string())
            .unwrap_or_default()
    }
}

/// Fetches `window.location.href`.
struct PageMarkup;

impl MarkupSource for PageMarkup {
    fn fetch(&self) -> BoxFuture<'_, Result<String, MarkupError>> {
        Box::pin(async {
            let window =
                web_sys::window().ok_or_else(|| MarkupError::Fetch("No window".to_string()))?;
            let href = window
                .location()
                .href()
                .map_err(|e| MarkupError::Fetch(format!("{:?}", e)))?;

            let response: web_sys::Response = JsFuture::from(window.fetch_with_str(&href))
                .await
                .map_err(|e| MarkupError::Fetch(format!("{:?}", e)))?
                .dyn_into()
                .map_err(|_| MarkupError::Decode("Not a Response".to_string()))?;

            if !response.ok() {
                let status = response.status();
                return Err(MarkupError::Fetch(format!("HTTP {} for {}", status, href)));
            }

            let text = response.text().map_err(|e| MarkupError::Decode(format!("{:?}", e)))?;
            JsFuture::from(text)
                .await
                .map_err(|e| MarkupError::Decode(format!("{:?}", e)))?
                .as_string()
                .ok_or_else(|| MarkupError::Decode("Body is not text".to_string()))
        })
    }
}

/// `setTimeout` as a future.
struct BrowserDelay;

impl Delay for BrowserDelay {
    fn delay(&self, duration: Duration) -> BoxFuture<'_, ()> {
        let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window().is_some_and(|window| {
                window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
                    .is_ok()
            });
            // Without a timer the delay elapses at once.
            if !scheduled {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });
        Box::pin(async move {
            let _ = JsFuture::from(promise).await;
        })
    }
}

/// Blob download through a transient anchor.
struct BrowserEmitter {
    release_delay_ms: u32,
}

impl DownloadEmitter for BrowserEmitter {
    fn emit(&self, content: &str, file_name: &str) -> EmitResult<()> {
        let browser = |e: JsValue| EmitError::Browser(format!("{:?}", e));

        let window =
            web_sys::window().ok_or_else(|| EmitError::Browser("No window".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| EmitError::Browser("No document".to_string()))?;
        let body = document
            .body()
            .ok_or_else(|| EmitError::Browser("No body".to_string()))?;

        let blob_parts = js_sys::Array::new();
        blob_parts.push(&JsValue::from_str(content));

        let options = web_sys::BlobPropertyBag::new();
        options.set_type(HTML_MIME_TYPE);

        let blob = web_sys::Blob::new_with_str_sequence_and_options(&blob_parts, &options)
            .map_err(browser)?;
        let url = web_sys::Url::create_object_url_with_blob(&blob).map_err(browser)?;

        let a = document
            .create_element("a")
            .map_err(browser)?
            .dyn_into::<web_sys::HtmlAnchorElement>()
            .map_err(|_| EmitError::Browser("Failed to cast to anchor".to_string()))?;
        a.set_href(&url);
        a.set_download(file_name);
        body.append_child(&a).map_err(browser)?;
        a.click();

        // Release once the download has started.
        let release = Closure::once_into_js(move || {
            a.remove();
            let _ = web_sys::Url::revoke_object_url(&url);
        });
        window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                release.unchecked_ref(),
                self.release_delay_ms as i32,
            )
            .map_err(browser)?;

        log::info!("Download of {} started", file_name);
        Ok(())
    }
}

/// `window.alert`.
struct AlertNotifier;

impl Notifier for AlertNotifier {
    fn alert(&self, message: &str) {
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(message);
        }
    }
}
