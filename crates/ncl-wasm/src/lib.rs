//! WASM bindings for the NCL parser.
//!
//! Exposes `check()` to JavaScript via wasm-bindgen.
//! Returns a JS object `{ ok, diagnostics }`; diagnostics carry their
//! summaries, details and source ranges for editor integrations.

use wasm_bindgen::prelude::*;

/// Check NCL source for syntax errors.
///
/// Returns a JS object `{ ok: boolean, diagnostics: Diagnostic[] }`, where
/// each diagnostic has `severity`, `summary`, `detail`, `subject` and
/// optionally `context` fields mirroring the parser's diagnostics.
#[wasm_bindgen]
pub fn check(source: &str) -> Result<JsValue, JsError> {
    let (_, diags) = ncl_parser::parse(source, "input.ncl");

    let ok = !ncl_parser::has_errors(&diags);
    let diagnostics = serde_wasm_bindgen::to_value(&diags)
        .map_err(|e| JsError::new(&e.to_string()))?;

    let js_obj = js_sys::Object::new();
    js_sys::Reflect::set(&js_obj, &"ok".into(), &ok.into())
        .map_err(|_| JsError::new("Failed to set ok property"))?;
    js_sys::Reflect::set(&js_obj, &"diagnostics".into(), &diagnostics)
        .map_err(|_| JsError::new("Failed to set diagnostics property"))?;

    Ok(js_obj.into())
}

/// Get the parser version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
