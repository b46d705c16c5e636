//! Shader program build pipeline.
//!
//! `compile` turns one stage's WGSL source into a [`CompiledStageUnit`];
//! `link` consumes a vertex and a fragment unit and yields a [`ShaderProgram`].
//! Failures are values carrying [`Diagnostic`]s, never panics or retries.

pub mod builtin;
mod compiler;
pub(crate) mod front;
mod linker;
mod types;

pub use compiler::{compile, compile_source};
pub use front::{InterfaceVar, StageInterface, ValueKind};
pub use linker::{build_program, link};
pub use types::{
    CompileStatus, CompiledStageUnit, Diagnostic, DiagnosticScope, LinkStatus, Severity,
    ShaderProgram, ShaderSource, ShaderStage,
};
