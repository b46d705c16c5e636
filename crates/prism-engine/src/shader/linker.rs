use crate::gfx::{GraphicsContext, ResourceId};

use super::{CompiledStageUnit, Diagnostic, DiagnosticScope, LinkStatus, ShaderProgram, ShaderStage};

/// Links a vertex and a fragment unit into a program.
///
/// Both units are consumed. Their stage resources are deleted before this
/// returns whatever the outcome; the program keeps the compiled code.
///
/// - A failed or mis-staged input short-circuits: nothing is allocated or
///   attached and the result carries the precompiled diagnostics.
/// - Validation runs after every link attempt and is advisory: its findings
///   are logged and attached as warnings but never turn a linked program
///   into a failed one.
/// - A failed program's resource is deleted; its handle is `ResourceId::NULL`.
pub fn link<C>(ctx: &mut C, vertex: CompiledStageUnit, fragment: CompiledStageUnit) -> ShaderProgram
where
    C: GraphicsContext + ?Sized,
{
    if let Some(diagnostics) = precondition_failures(&vertex, &fragment) {
        release_stage(ctx, &vertex);
        release_stage(ctx, &fragment);
        for d in &diagnostics {
            log::error!("program not linked: {d}");
        }
        return ShaderProgram {
            handle: ResourceId::NULL,
            status: LinkStatus::Failed,
            diagnostics,
        };
    }

    let program = ctx.create_program();
    ctx.attach_shader(program, vertex.handle);
    ctx.attach_shader(program, fragment.handle);

    ctx.link_program(program);
    let linked = ctx.link_status(program);
    let link_log = ctx.program_diagnostic(program);

    ctx.validate_program(program);
    let validated = ctx.validate_status(program);

    release_stage(ctx, &vertex);
    release_stage(ctx, &fragment);

    let mut diagnostics = Vec::new();

    if !linked {
        let message = link_log.unwrap_or_else(|| "link failed without an info log".to_string());
        log::error!("failed to link program:\n{message}");
        diagnostics.push(Diagnostic::error(DiagnosticScope::Program, message));
        ctx.delete_program(program);
        return ShaderProgram {
            handle: ResourceId::NULL,
            status: LinkStatus::Failed,
            diagnostics,
        };
    }

    if !validated {
        let message = ctx
            .program_diagnostic(program)
            .unwrap_or_else(|| "validation failed without an info log".to_string());
        log::warn!("program {program} validation: {message}");
        diagnostics.push(Diagnostic::warning(DiagnosticScope::Program, message));
    }

    log::debug!("linked program {program}");

    ShaderProgram {
        handle: program,
        status: LinkStatus::Linked,
        diagnostics,
    }
}

/// Compiles both stages and links them.
pub fn build_program<C>(ctx: &mut C, vertex_source: &str, fragment_source: &str) -> ShaderProgram
where
    C: GraphicsContext + ?Sized,
{
    let vertex = super::compile(ctx, ShaderStage::Vertex, vertex_source);
    let fragment = super::compile(ctx, ShaderStage::Fragment, fragment_source);
    link(ctx, vertex, fragment)
}

fn precondition_failures(
    vertex: &CompiledStageUnit,
    fragment: &CompiledStageUnit,
) -> Option<Vec<Diagnostic>> {
    let mut out = Vec::new();

    for (unit, expected) in [(vertex, ShaderStage::Vertex), (fragment, ShaderStage::Fragment)] {
        if unit.stage != expected {
            out.push(Diagnostic::error(
                DiagnosticScope::Program,
                format!("expected a {expected} unit, got a {} unit", unit.stage),
            ));
        }
        if !unit.is_compiled() {
            out.push(unit.diagnostic.clone().unwrap_or_else(|| {
                Diagnostic::error(
                    DiagnosticScope::Stage(unit.stage),
                    "stage failed to compile",
                )
            }));
        }
    }

    if out.is_empty() { None } else { Some(out) }
}

fn release_stage<C>(ctx: &mut C, unit: &CompiledStageUnit)
where
    C: GraphicsContext + ?Sized,
{
    if !unit.handle.is_null() {
        ctx.delete_shader(unit.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{FrameCommand, GeometryUpload, HeadlessContext};
    use crate::shader::{builtin, compile, Severity};

    const NO_MAIN_VERTEX: &str = r#"
        fn transform(position: vec4<f32>) -> vec4<f32> {
            return position;
        }
    "#;

    fn with_triangle() -> HeadlessContext {
        let mut ctx = HeadlessContext::new();
        let buf = ctx
            .upload_static_vertices(&[-0.5, 0.5, 0.5, 0.5, 0.0, -0.5], 2)
            .unwrap();
        ctx.bind_vertex_layout(buf, 0, 2);
        ctx
    }

    #[test]
    fn valid_pair_links_and_reclaims_stage_resources() {
        let mut ctx = with_triangle();
        let vs = compile(&mut ctx, ShaderStage::Vertex, builtin::PASSTHROUGH_VERTEX);
        let fs = compile(&mut ctx, ShaderStage::Fragment, builtin::SOLID_WHITE_FRAGMENT);
        let (vs_id, fs_id) = (vs.handle(), fs.handle());
        assert!(ctx.is_shader(vs_id) && ctx.is_shader(fs_id));

        let program = link(&mut ctx, vs, fs);

        assert_eq!(program.status(), LinkStatus::Linked);
        assert!(ctx.is_program(program.handle()));
        assert!(!ctx.is_shader(vs_id));
        assert!(!ctx.is_shader(fs_id));
        assert_eq!(ctx.live_shaders(), 0);
        assert!(program.diagnostics().is_empty());
    }

    #[test]
    fn stage_resources_are_reclaimed_when_link_fails() {
        let mut ctx = with_triangle();
        let fs_src = r#"
            @fragment
            fn fs_main(@location(3) c: vec4<f32>) -> @location(0) vec4<f32> {
                return c;
            }
        "#;
        let vs = compile(&mut ctx, ShaderStage::Vertex, builtin::PASSTHROUGH_VERTEX);
        let fs = compile(&mut ctx, ShaderStage::Fragment, fs_src);
        let (vs_id, fs_id) = (vs.handle(), fs.handle());
        assert!(vs.is_compiled() && fs.is_compiled());

        let program = link(&mut ctx, vs, fs);

        assert_eq!(program.status(), LinkStatus::Failed);
        assert!(program.handle().is_null());
        assert!(!ctx.is_shader(vs_id) && !ctx.is_shader(fs_id));
        assert_eq!(ctx.live_programs(), 0);
        let err = program.error().unwrap();
        assert_eq!(err.scope, DiagnosticScope::Program);
        assert!(err.message.contains("location 3"), "{}", err.message);
    }

    #[test]
    fn malformed_vertex_short_circuits_and_is_never_bound() {
        let mut ctx = with_triangle();
        let vs = compile(&mut ctx, ShaderStage::Vertex, NO_MAIN_VERTEX);
        assert!(!vs.is_compiled());
        let vs_diag = vs.diagnostic().cloned().unwrap();

        let fs = compile(&mut ctx, ShaderStage::Fragment, builtin::SOLID_WHITE_FRAGMENT);
        let fs_id = fs.handle();

        let program = link(&mut ctx, vs, fs);

        assert_eq!(program.status(), LinkStatus::Failed);
        assert!(program.handle().is_null());
        // No program was ever allocated, the healthy stage was still released.
        assert_eq!(ctx.live_programs(), 0);
        assert!(!ctx.is_shader(fs_id));
        assert_eq!(program.diagnostics(), &[vs_diag]);
        assert!(!ctx
            .commands()
            .iter()
            .any(|c| matches!(c, FrameCommand::UseProgram(_))));
    }

    #[test]
    fn short_circuit_is_repeatable() {
        for _ in 0..3 {
            let mut ctx = with_triangle();
            let vs = compile(&mut ctx, ShaderStage::Vertex, builtin::PASSTHROUGH_VERTEX);
            let fs = compile(&mut ctx, ShaderStage::Fragment, "not wgsl");
            let program = link(&mut ctx, vs, fs);
            assert_eq!(program.status(), LinkStatus::Failed);
            assert_eq!(ctx.live_programs(), 0);
            assert_eq!(ctx.live_shaders(), 0);
        }
    }

    #[test]
    fn swapped_units_are_rejected() {
        let mut ctx = with_triangle();
        let vs = compile(&mut ctx, ShaderStage::Vertex, builtin::PASSTHROUGH_VERTEX);
        let fs = compile(&mut ctx, ShaderStage::Fragment, builtin::SOLID_WHITE_FRAGMENT);
        let program = link(&mut ctx, fs, vs);
        assert_eq!(program.status(), LinkStatus::Failed);
        assert_eq!(ctx.live_shaders(), 0);
        assert_eq!(ctx.live_programs(), 0);
    }

    #[test]
    fn validation_warning_does_not_fail_link() {
        // No vertex layout bound: validation cannot pass.
        let mut ctx = HeadlessContext::new();
        let program = build_program(
            &mut ctx,
            builtin::PASSTHROUGH_VERTEX,
            builtin::SOLID_WHITE_FRAGMENT,
        );
        assert_eq!(program.status(), LinkStatus::Linked);
        assert!(program.error().is_none());
        let warning = &program.diagnostics()[0];
        assert_eq!(warning.severity, Severity::Warning);
        assert!(warning.message.contains("no bound vertex attribute"));
    }

    #[test]
    fn canonical_program_validates_against_triangle_layout() {
        let mut ctx = with_triangle();
        let program = build_program(
            &mut ctx,
            builtin::PASSTHROUGH_VERTEX,
            builtin::SOLID_WHITE_FRAGMENT,
        );
        assert!(program.is_linked());
        assert!(ctx.validate_status(program.handle()));
        assert!(program.diagnostics().is_empty());

        program.destroy(&mut ctx);
        assert_eq!(ctx.live_programs(), 0);
    }
}
