//! Intermediate Representation (IR) the mutator validator operates on.
//!
//! A module is an ordered list of functions, each function an ordered list of
//! basic blocks of instructions. The crate also provides:
//! - the context that owns loaded modules' identity and format version
//! - the loader reading serialized modules from disk
//! - the structural verifier
//! - the lowering of a module to WebAssembly

pub mod instruction;
pub mod module;
pub mod context;
pub mod loader;
pub mod verifier;
pub mod compiler;

pub use instruction::{Instruction, Opcode, Operand, Register, Value};
pub use module::{BasicBlock, Function, Location, Module, ReturnType};
pub use context::{Context, LoadedModule, Program};
pub use loader::{load_module, save_module};
pub use verifier::{verify, verify_module, Diagnostic, Verifier};
pub use compiler::{Compiler, FUNCTION_EXPORT_PREFIX, SWITCH_EXPORT_PREFIX};
