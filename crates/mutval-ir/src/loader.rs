//! Reading and writing serialized modules.
//!
//! Files ending in `.json` hold the JSON encoding, anything else is bincode.

use crate::context::Context;
use crate::module::Module;
use mutval_core::{Error, Result};
use std::path::Path;
use tracing::{debug, info};

fn is_json(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
}

/// Load a module, checking it matches the context's format version
pub fn load_module(path: &Path, context: &Context) -> Result<Module> {
    let load_error = |reason: String| Error::Load {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = std::fs::read(path).map_err(|e| load_error(e.to_string()))?;
    debug!(path = %path.display(), size = bytes.len(), "Read module file");

    let module = if is_json(path) {
        let text = std::str::from_utf8(&bytes).map_err(|e| load_error(e.to_string()))?;
        Module::from_json(text)
    } else {
        Module::from_bytes(&bytes)
    }
    .map_err(|e| load_error(format!("not a valid serialized module: {}", e)))?;

    if module.version != context.format_version() {
        return Err(load_error(format!(
            "IR version {} does not match context version {}",
            module.version,
            context.format_version()
        )));
    }

    info!(
        module = %module.name,
        functions = module.num_functions(),
        instructions = module.total_instructions(),
        "Loaded module"
    );
    Ok(module)
}

/// Write a module using the encoding implied by the file extension
pub fn save_module(module: &Module, path: &Path) -> Result<()> {
    let bytes = if is_json(path) {
        module.to_json()?.into_bytes()
    } else {
        module.to_bytes()?
    };
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{Instruction, Register, Value};
    use crate::module::{Function, ReturnType};

    fn sample_module() -> Module {
        let mut func = Function::new("answer", 0, ReturnType::Int).with_locals(1);
        func.get_block_mut(0)
            .unwrap()
            .add_instruction(Instruction::load_const(Register(0), Value::Int(42)));
        func.get_block_mut(0)
            .unwrap()
            .add_instruction(Instruction::return_value(Register(0)));
        Module::with_functions("sample", vec![func])
    }

    #[test]
    fn test_round_trip_bincode_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let context = Context::new();
        let module = sample_module();

        for name in ["sample.bc", "sample.json"] {
            let path = dir.path().join(name);
            save_module(&module, &path).unwrap();
            assert_eq!(load_module(&path, &context).unwrap(), module);
        }
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let context = Context::new();
        let result = load_module(Path::new("/nonexistent/module.bc"), &context);
        assert!(matches!(result, Err(Error::Load { .. })));
    }

    #[test]
    fn test_garbage_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, "{ not a module").unwrap();

        let result = load_module(&path, &Context::new());
        match result {
            Err(Error::Load { reason, .. }) => assert!(reason.contains("not a valid")),
            other => panic!("expected load error, got {:?}", other),
        }
    }

    #[test]
    fn test_version_mismatch_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.bc");
        save_module(&sample_module(), &path).unwrap();

        let context = Context::with_format_version(99);
        assert!(matches!(
            load_module(&path, &context),
            Err(Error::Load { .. })
        ));
    }
}
