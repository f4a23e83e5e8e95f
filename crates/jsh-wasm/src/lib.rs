//! WASM bindings for the JSH compiler.
//!
//! Exposes `compile()`, `parse()` and `version()` to JavaScript via
//! wasm-bindgen. Errors are thrown as JS errors.

use jsh_codegen::CompileOptions;
use wasm_bindgen::prelude::*;

/// Compile JSH source to JavaScript.
///
/// `options` is an optional object `{ runtimeModule?, renderContext?,
/// denyWarnings? }`. Returns `{ code: string, warnings: string[] }`.
/// Throws a JS error if parsing or lowering fails.
#[wasm_bindgen]
pub fn compile(source: &str, options: JsValue) -> Result<JsValue, JsError> {
    let options = read_options(options)?;
    let output = jsh_codegen::compile(source, &options).map_err(|e| JsError::new(&e.to_string()))?;

    let warnings = js_sys::Array::new();
    for warning in &output.warnings {
        warnings.push(&warning.to_string().into());
    }

    let js_obj = js_sys::Object::new();
    js_sys::Reflect::set(&js_obj, &"code".into(), &output.code.into())
        .map_err(|_| JsError::new("Failed to set code property"))?;
    js_sys::Reflect::set(&js_obj, &"warnings".into(), &warnings.into())
        .map_err(|_| JsError::new("Failed to set warnings property"))?;

    Ok(js_obj.into())
}

/// Parse JSH source and return the AST as a plain JS object.
#[wasm_bindgen]
pub fn parse(source: &str) -> Result<JsValue, JsError> {
    let program = jsh_parser::Parser::parse(source).map_err(|e| JsError::new(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&program).map_err(|e| JsError::new(&e.to_string()))
}

/// Get the compiler version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// `undefined`/`null` mean defaults.
fn read_options(options: JsValue) -> Result<CompileOptions, JsError> {
    if options.is_undefined() || options.is_null() {
        return Ok(CompileOptions::default());
    }
    serde_wasm_bindgen::from_value(options).map_err(|e| JsError::new(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // =========================================================================
    // Native tests (non-WASM): verify the pipeline behind the bindings
    // =========================================================================

    fn native_compile(source: &str) -> jsh_codegen::CompilerOutput {
        jsh_codegen::compile(source, &CompileOptions::default()).unwrap()
    }

    #[test]
    fn test_empty_source() {
        let output = native_compile("");
        assert_eq!(output.code, "");
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_template_function() {
        let output = native_compile("@Template()\nfunction hello(name) {\n  <p>\"Hello\"</p>\n}");
        assert!(output
            .code
            .starts_with("import { ΘelementEnd, ΘelementStart, Θtext } from \"fw-x\";\n"));
        assert!(output.code.contains("function hello($renderContext, name) {"));
        assert!(output.code.contains("Θtext($renderContext, 1, \"Hello\");"));
    }

    #[test]
    fn test_multiple_compiles() {
        // No state leaks between units.
        let out1 = native_compile("@T() function a() { <br/> }");
        let out2 = native_compile("@T() function b() { \"x\" }");
        assert!(out1.code.contains("Θelement($renderContext, 0"));
        assert!(!out1.code.contains("Θtext"));
        assert!(out2.code.contains("Θtext($renderContext, 0"));
        assert!(!out2.code.contains("Θelement"));
    }

    #[test]
    fn test_parse_error_message() {
        let err = jsh_codegen::compile("<a href=1>", &CompileOptions::default()).unwrap_err();
        assert!(err.to_string().starts_with("Parse error at line 1, column 9"));
    }

    #[test]
    fn test_version() {
        let v = version();
        assert!(!v.is_empty());
        assert!(v.contains('.'));
    }
}
