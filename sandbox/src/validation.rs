//! WASM module validation — ABI compatibility checks.
//!
//! Validates that a compiled module exposes exactly the interface the
//! marshaling layer depends on before it is instantiated:
//!
//! 1. A `memory` export that is a linear memory
//! 2. `alloc`, `dealloc`, `interpolate` exported as functions with the
//!    expected i32 signatures
//! 3. No imports at all (the guest is instantiated without host functions)

use wasmtime::{ExternType, Module, ValType};

use crate::error::SandboxError;

/// Name of the guest's linear memory export.
pub const MEMORY_EXPORT: &str = "memory";

/// Expected export: (name, param_count_of_i32, result_count_of_i32).
/// Addresses and sizes are all u32, which WASM carries as i32.
pub const REQUIRED_EXPORTS: &[(&str, usize, usize)] = &[
    ("alloc", 1, 1),
    ("dealloc", 2, 0),
    ("interpolate", 2, 1),
];

fn is_i32(vt: &ValType) -> bool {
    matches!(vt, ValType::I32)
}

/// Validate that a WASM module meets the interpolator guest ABI.
pub fn validate_module(module: &Module) -> Result<(), SandboxError> {
    validate_exports(module)?;
    validate_imports(module)?;
    Ok(())
}

/// Check that all required exports are present with correct signatures.
fn validate_exports(module: &Module) -> Result<(), SandboxError> {
    let has_memory = module
        .exports()
        .any(|e| e.name() == MEMORY_EXPORT && matches!(e.ty(), ExternType::Memory(_)));
    if !has_memory {
        return Err(SandboxError::Bootstrap(format!(
            "module must export '{}' as a memory",
            MEMORY_EXPORT
        )));
    }

    for &(name, expected_param_count, expected_result_count) in REQUIRED_EXPORTS {
        let export = module
            .exports()
            .find(|e| e.name() == name)
            .ok_or_else(|| SandboxError::Bootstrap(format!("missing required export: {}", name)))?;

        let func_ty = match export.ty() {
            ExternType::Func(ft) => ft,
            _ => {
                return Err(SandboxError::Bootstrap(format!(
                    "export '{}' must be a function",
                    name
                )));
            }
        };

        let params: Vec<ValType> = func_ty.params().collect();
        let results: Vec<ValType> = func_ty.results().collect();

        if params.len() != expected_param_count || !params.iter().all(is_i32) {
            return Err(SandboxError::Bootstrap(format!(
                "export '{}' has wrong param signature: expected {} i32 params, got {} params",
                name,
                expected_param_count,
                params.len()
            )));
        }

        if results.len() != expected_result_count || !results.iter().all(is_i32) {
            return Err(SandboxError::Bootstrap(format!(
                "export '{}' has wrong result signature: expected {} i32 results, got {} results",
                name,
                expected_result_count,
                results.len()
            )));
        }
    }

    Ok(())
}

/// Reject every import: the guest gets no host functions.
fn validate_imports(module: &Module) -> Result<(), SandboxError> {
    if let Some(import) = module.imports().next() {
        return Err(SandboxError::Bootstrap(format!(
            "guest must not import anything, found {}::{}",
            import.module(),
            import.name()
        )));
    }
    Ok(())
}
