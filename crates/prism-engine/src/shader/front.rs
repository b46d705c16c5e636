//! WGSL front-end (naga parse + validate) and stage interface reflection.
//!
//! Everything the driver-level compile/link steps need to know about a stage
//! is extracted here, so contexts never touch naga IR directly.

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{Binding, Handle, Module, ScalarKind, Type, TypeInner};

use super::ShaderStage;

/// Scalar class of an interface value.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ValueKind {
    Float,
    Sint,
    Uint,
    Other,
}

/// One `@location(n)` value crossing a stage boundary.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InterfaceVar {
    pub location: u32,
    pub kind: ValueKind,
    pub components: u32,
}

/// Reflected entry point of a successfully compiled stage.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StageInterface {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub inputs: Vec<InterfaceVar>,
    pub outputs: Vec<InterfaceVar>,
}

impl StageInterface {
    pub fn input(&self, location: u32) -> Option<&InterfaceVar> {
        self.inputs.iter().find(|v| v.location == location)
    }

    pub fn output(&self, location: u32) -> Option<&InterfaceVar> {
        self.outputs.iter().find(|v| v.location == location)
    }
}

/// Parses and validates `source`, then locates the single entry point for `stage`.
///
/// The error string is the compiler's own report, formatted against the source.
pub(crate) fn compile_wgsl(stage: ShaderStage, source: &str) -> Result<StageInterface, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| e.emit_to_string(source))?;

    let wanted = naga_stage(stage);
    let mut candidates = module.entry_points.iter().filter(|ep| ep.stage == wanted);

    let Some(ep) = candidates.next() else {
        return Err(format!("error: no @{stage} entry point found"));
    };
    if let Some(extra) = candidates.next() {
        return Err(format!(
            "error: multiple @{stage} entry points (`{}`, `{}`); expected exactly one",
            ep.name, extra.name
        ));
    }

    let mut inputs = Vec::new();
    for arg in &ep.function.arguments {
        collect_locations(&module, arg.ty, arg.binding.as_ref(), &mut inputs);
    }

    let mut outputs = Vec::new();
    if let Some(result) = &ep.function.result {
        collect_locations(&module, result.ty, result.binding.as_ref(), &mut outputs);
    }

    Ok(StageInterface {
        stage,
        entry_point: ep.name.clone(),
        inputs,
        outputs,
    })
}

/// Inter-stage interface check performed at link time.
///
/// Every fragment input must be written by the vertex stage with the same type.
pub(crate) fn check_link(vertex: &StageInterface, fragment: &StageInterface) -> Result<(), String> {
    let mut problems = Vec::new();

    for input in &fragment.inputs {
        match vertex.output(input.location) {
            None => problems.push(format!(
                "fragment input at location {} is not written by the vertex stage",
                input.location
            )),
            Some(out) if out.kind != input.kind || out.components != input.components => {
                problems.push(format!(
                    "type mismatch at location {}: vertex writes {}, fragment reads {}",
                    input.location,
                    describe(out),
                    describe(input)
                ))
            }
            Some(_) => {}
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("\n"))
    }
}

pub(crate) fn describe(var: &InterfaceVar) -> String {
    let scalar = match var.kind {
        ValueKind::Float => "f32",
        ValueKind::Sint => "i32",
        ValueKind::Uint => "u32",
        ValueKind::Other => "?",
    };
    if var.components == 1 {
        scalar.to_string()
    } else {
        format!("vec{}<{scalar}>", var.components)
    }
}

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

fn collect_locations(
    module: &Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut Vec<InterfaceVar>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => {
            let (kind, components) = value_shape(&module.types[ty].inner);
            out.push(InterfaceVar {
                location: *location,
                kind,
                components,
            });
        }
        Some(Binding::BuiltIn(_)) => {}
        None => {
            // Struct-typed arguments/results carry bindings on their members.
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn value_shape(inner: &TypeInner) -> (ValueKind, u32) {
    match inner {
        TypeInner::Scalar(scalar) => (value_kind(scalar.kind), 1),
        TypeInner::Vector { size, scalar } => (value_kind(scalar.kind), *size as u32),
        _ => (ValueKind::Other, 0),
    }
}

fn value_kind(kind: ScalarKind) -> ValueKind {
    match kind {
        ScalarKind::Float => ValueKind::Float,
        ScalarKind::Sint => ValueKind::Sint,
        ScalarKind::Uint => ValueKind::Uint,
        _ => ValueKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::builtin;

    #[test]
    fn passthrough_vertex_reflects_position_input() {
        let iface = compile_wgsl(ShaderStage::Vertex, builtin::PASSTHROUGH_VERTEX).unwrap();
        assert_eq!(iface.entry_point, "vs_main");
        assert_eq!(
            iface.input(0),
            Some(&InterfaceVar {
                location: 0,
                kind: ValueKind::Float,
                components: 4
            })
        );
        assert!(iface.outputs.is_empty());
    }

    #[test]
    fn solid_white_fragment_writes_location_zero() {
        let iface = compile_wgsl(ShaderStage::Fragment, builtin::SOLID_WHITE_FRAGMENT).unwrap();
        assert_eq!(iface.entry_point, "fs_main");
        assert_eq!(iface.output(0).map(|v| v.components), Some(4));
        assert!(iface.inputs.is_empty());
    }

    #[test]
    fn syntax_error_reports_compiler_message() {
        let err = compile_wgsl(ShaderStage::Vertex, "fn vs_main( {").unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn missing_stage_entry_point_is_an_error() {
        // Valid WGSL, but only a fragment entry point.
        let err =
            compile_wgsl(ShaderStage::Vertex, builtin::SOLID_WHITE_FRAGMENT).unwrap_err();
        assert!(err.contains("no @vertex entry point"), "{err}");
    }

    #[test]
    fn struct_members_are_reflected() {
        let src = r#"
            struct VsOut {
                @builtin(position) pos: vec4<f32>,
                @location(1) uv: vec2<f32>,
            };

            @vertex
            fn vs_main(@location(0) p: vec2<f32>) -> VsOut {
                var o: VsOut;
                o.pos = vec4<f32>(p, 0.0, 1.0);
                o.uv = p;
                return o;
            }
        "#;
        let iface = compile_wgsl(ShaderStage::Vertex, src).unwrap();
        assert_eq!(iface.outputs.len(), 1);
        assert_eq!(iface.outputs[0].location, 1);
        assert_eq!(iface.outputs[0].components, 2);
    }

    #[test]
    fn link_detects_unwritten_fragment_input() {
        let vs = compile_wgsl(ShaderStage::Vertex, builtin::PASSTHROUGH_VERTEX).unwrap();
        let fs_src = r#"
            @fragment
            fn fs_main(@location(2) tint: vec4<f32>) -> @location(0) vec4<f32> {
                return tint;
            }
        "#;
        let fs = compile_wgsl(ShaderStage::Fragment, fs_src).unwrap();
        let err = check_link(&vs, &fs).unwrap_err();
        assert!(err.contains("location 2"), "{err}");
    }

    #[test]
    fn link_detects_type_mismatch() {
        let vs_src = r#"
            struct VsOut {
                @builtin(position) pos: vec4<f32>,
                @location(0) c: vec3<f32>,
            };
            @vertex
            fn vs_main(@location(0) p: vec4<f32>) -> VsOut {
                var o: VsOut;
                o.pos = p;
                o.c = p.xyz;
                return o;
            }
        "#;
        let fs_src = r#"
            @fragment
            fn fs_main(@location(0) c: vec4<f32>) -> @location(0) vec4<f32> {
                return c;
            }
        "#;
        let vs = compile_wgsl(ShaderStage::Vertex, vs_src).unwrap();
        let fs = compile_wgsl(ShaderStage::Fragment, fs_src).unwrap();
        let err = check_link(&vs, &fs).unwrap_err();
        assert!(err.contains("vec3<f32>") && err.contains("vec4<f32>"), "{err}");
    }

    #[test]
    fn canonical_pair_links() {
        let vs = compile_wgsl(ShaderStage::Vertex, builtin::PASSTHROUGH_VERTEX).unwrap();
        let fs = compile_wgsl(ShaderStage::Fragment, builtin::SOLID_WHITE_FRAGMENT).unwrap();
        assert!(check_link(&vs, &fs).is_ok());
    }
}
