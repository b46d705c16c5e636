use std::fmt;

use crate::gfx::ResourceId;

/// Programmable pipeline stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source text for one stage. Immutable once constructed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ShaderSource {
    stage: ShaderStage,
    text: String,
}

impl ShaderSource {
    pub fn new(stage: ShaderStage, text: impl Into<String>) -> Self {
        Self {
            stage,
            text: text.into(),
        }
    }

    pub fn vertex(text: impl Into<String>) -> Self {
        Self::new(ShaderStage::Vertex, text)
    }

    pub fn fragment(text: impl Into<String>) -> Self {
        Self::new(ShaderStage::Fragment, text)
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// What a diagnostic is about.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DiagnosticScope {
    Stage(ShaderStage),
    Program,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Severity {
    /// The resource is unusable.
    Error,
    /// Advisory only (post-link validation).
    Warning,
}

/// Human-readable report attached to a failed (or questionable) build step.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub scope: DiagnosticScope,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(scope: DiagnosticScope, message: impl Into<String>) -> Self {
        Self {
            scope,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(scope: DiagnosticScope, message: impl Into<String>) -> Self {
        Self {
            scope,
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match self.scope {
            DiagnosticScope::Stage(stage) => write!(f, "{stage} shader {kind}: {}", self.message),
            DiagnosticScope::Program => write!(f, "program {kind}: {}", self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CompileStatus {
    Compiled,
    Failed,
}

/// Output of [`compile`](super::compile).
///
/// Owned by value and deliberately not `Clone`: the linker consumes it, which
/// is where the stage resource is released.
#[derive(Debug, PartialEq)]
pub struct CompiledStageUnit {
    pub(crate) stage: ShaderStage,
    pub(crate) handle: ResourceId,
    pub(crate) status: CompileStatus,
    pub(crate) diagnostic: Option<Diagnostic>,
}

impl CompiledStageUnit {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// `ResourceId::NULL` when compilation failed.
    pub fn handle(&self) -> ResourceId {
        self.handle
    }

    pub fn status(&self) -> CompileStatus {
        self.status
    }

    pub fn is_compiled(&self) -> bool {
        self.status == CompileStatus::Compiled
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        self.diagnostic.as_ref()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LinkStatus {
    Linked,
    Failed,
}

/// A linked (bindable) or failed program.
///
/// Release with [`ShaderProgram::destroy`] at the end of the render session.
#[derive(Debug, PartialEq)]
pub struct ShaderProgram {
    pub(crate) handle: ResourceId,
    pub(crate) status: LinkStatus,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl ShaderProgram {
    pub fn handle(&self) -> ResourceId {
        self.handle
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    pub fn is_linked(&self) -> bool {
        self.status == LinkStatus::Linked
    }

    /// Link errors (when failed), precompiled stage errors (when short-circuited)
    /// and validation warnings.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// First error-severity diagnostic, if any.
    pub fn error(&self) -> Option<&Diagnostic> {
        self.diagnostics.iter().find(|d| d.is_error())
    }

    /// Deletes the program resource.
    pub fn destroy<C>(self, ctx: &mut C)
    where
        C: crate::gfx::GraphicsContext + ?Sized,
    {
        if !self.handle.is_null() {
            ctx.delete_program(self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display_names_scope() {
        let d = Diagnostic::error(DiagnosticScope::Stage(ShaderStage::Vertex), "boom");
        assert_eq!(d.to_string(), "vertex shader error: boom");

        let w = Diagnostic::warning(DiagnosticScope::Program, "unbound input");
        assert_eq!(w.to_string(), "program warning: unbound input");
        assert!(!w.is_error());
    }

    #[test]
    fn source_keeps_stage() {
        let s = ShaderSource::fragment("x");
        assert_eq!(s.stage(), ShaderStage::Fragment);
        assert_eq!(s.text(), "x");
    }
}
