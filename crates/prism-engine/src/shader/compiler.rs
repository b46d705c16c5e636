use crate::gfx::{GraphicsContext, ResourceId};

use super::{CompileStatus, CompiledStageUnit, Diagnostic, DiagnosticScope, ShaderSource, ShaderStage};

/// Compiles one stage's source into a stage unit.
///
/// On failure the stage resource is deleted before returning, the unit's
/// handle is `ResourceId::NULL`, and the unit carries the driver's info log.
/// No retries.
pub fn compile<C>(ctx: &mut C, stage: ShaderStage, source: &str) -> CompiledStageUnit
where
    C: GraphicsContext + ?Sized,
{
    let id = ctx.create_shader(stage);
    ctx.shader_source(id, source);
    ctx.compile_shader(id);

    if ctx.compile_status(id) {
        log::debug!("compiled {stage} shader {id}");
        return CompiledStageUnit {
            stage,
            handle: id,
            status: CompileStatus::Compiled,
            diagnostic: None,
        };
    }

    let message = ctx
        .shader_diagnostic(id)
        .unwrap_or_else(|| "compilation failed without an info log".to_string());
    log::error!("failed to compile {stage} shader:\n{message}");

    ctx.delete_shader(id);

    CompiledStageUnit {
        stage,
        handle: ResourceId::NULL,
        status: CompileStatus::Failed,
        diagnostic: Some(Diagnostic::error(DiagnosticScope::Stage(stage), message)),
    }
}

/// [`compile`] for a [`ShaderSource`].
pub fn compile_source<C>(ctx: &mut C, source: &ShaderSource) -> CompiledStageUnit
where
    C: GraphicsContext + ?Sized,
{
    compile(ctx, source.stage(), source.text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::HeadlessContext;
    use crate::shader::builtin;

    const MISSING_MAIN: &str = r#"
        fn helper(p: vec4<f32>) -> vec4<f32> {
            return p;
        }
    "#;

    #[test]
    fn valid_source_compiles_to_live_handle() {
        let mut ctx = HeadlessContext::new();
        let unit = compile(&mut ctx, ShaderStage::Vertex, builtin::PASSTHROUGH_VERTEX);
        assert_eq!(unit.status(), CompileStatus::Compiled);
        assert!(!unit.handle().is_null());
        assert!(ctx.is_shader(unit.handle()));
        assert!(unit.diagnostic().is_none());
    }

    #[test]
    fn syntax_errors_fail_with_null_handle_and_diagnostic() {
        let bad = [
            "fn vs_main( {",
            "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return 1; }",
            "this is not a shader",
        ];
        for src in bad {
            let mut ctx = HeadlessContext::new();
            let unit = compile(&mut ctx, ShaderStage::Vertex, src);
            assert_eq!(unit.status(), CompileStatus::Failed, "{src}");
            assert!(unit.handle().is_null());
            let diag = unit.diagnostic().expect("diagnostic");
            assert!(!diag.message.is_empty());
            assert_eq!(diag.scope, DiagnosticScope::Stage(ShaderStage::Vertex));
            // The allocated resource was reclaimed.
            assert_eq!(ctx.live_shaders(), 0);
        }
    }

    #[test]
    fn missing_entry_point_reports_compiler_message() {
        let mut ctx = HeadlessContext::new();
        let unit = compile(&mut ctx, ShaderStage::Vertex, MISSING_MAIN);
        assert_eq!(unit.status(), CompileStatus::Failed);
        let diag = unit.diagnostic().unwrap();
        assert!(diag.message.contains("entry point"), "{}", diag.message);
    }

    #[test]
    fn fragment_source_is_not_a_vertex_stage() {
        let mut ctx = HeadlessContext::new();
        let unit = compile_source(
            &mut ctx,
            &ShaderSource::vertex(builtin::SOLID_WHITE_FRAGMENT),
        );
        assert!(!unit.is_compiled());
        assert_eq!(unit.stage(), ShaderStage::Vertex);
    }
}
