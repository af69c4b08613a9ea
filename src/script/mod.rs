//! Script modules: identifier resolution, `require`, and the compiler and
//! LESS seams the host runtime plugs into

pub mod compiler;
pub mod less;
pub mod require;
pub mod resolve;

pub use compiler::{CompiledScript, ScriptCompiler, SourceCompiler};
pub use less::{LessProcessor, PassthroughLess};
pub use require::{module_key, require_module};
pub use resolve::{normalize, require, resolve};
