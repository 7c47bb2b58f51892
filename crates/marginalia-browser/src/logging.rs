use tracing::Level;
use tracing::subscriber::set_global_default;
use tracing_subscriber::Registry;
use tracing_subscriber::layer::SubscriberExt;
use wasm_bindgen::prelude::*;

/// Install the panic hook. Runs when the module is instantiated.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// Route `tracing` output to the browser console.
///
/// `level` is one of `trace`, `debug`, `info`, `warn` or `error`; anything
/// else falls back to `debug` in debug builds and `info` otherwise. Calling
/// this more than once keeps the first subscriber.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: Option<String>) {
    let default = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let max_level = level
        .as_deref()
        .and_then(|l| l.parse::<Level>().ok())
        .unwrap_or(default);

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(max_level)
            .build(),
    );
    let _ = set_global_default(Registry::default().with(wasm_layer));
}
