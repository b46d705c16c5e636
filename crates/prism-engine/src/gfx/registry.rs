//! Shader/program object model shared by every graphics context.
//!
//! Contexts differ only in what a compiled stage turns into on their side
//! (a `wgpu::ShaderModule`, or nothing at all when headless); that payload is
//! the `M` parameter. Status flags, info logs, attachment and deletion rules
//! live here once.

use std::rc::Rc;

use crate::shader::front::{self, StageInterface, ValueKind};
use crate::shader::ShaderStage;

use super::{ResourceId, ResourceTable, VertexLayout};

/// A successfully compiled stage plus the context's payload for it.
#[derive(Debug)]
pub(crate) struct CompiledModule<M> {
    pub interface: StageInterface,
    pub backend: M,
}

#[derive(Debug)]
struct ShaderObject<M> {
    stage: ShaderStage,
    source: String,
    compiled: Option<Rc<CompiledModule<M>>>,
    info_log: String,
}

#[derive(Debug)]
struct Attachment<M> {
    shader: ResourceId,
    stage: ShaderStage,
    compiled: Option<Rc<CompiledModule<M>>>,
}

/// Linked pair of stages. Keeps compiled code alive after the stage objects
/// themselves are deleted.
#[derive(Debug)]
pub(crate) struct LinkedProgram<M> {
    pub vertex: Rc<CompiledModule<M>>,
    pub fragment: Rc<CompiledModule<M>>,
}

#[derive(Debug)]
struct ProgramObject<M> {
    attached: Vec<Attachment<M>>,
    linked: Option<LinkedProgram<M>>,
    validated: bool,
    info_log: String,
}

impl<M> Default for ProgramObject<M> {
    fn default() -> Self {
        Self {
            attached: Vec::new(),
            linked: None,
            validated: false,
            info_log: String::new(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct ProgramRegistry<M> {
    shaders: ResourceTable<ShaderObject<M>>,
    programs: ResourceTable<ProgramObject<M>>,
}

impl<M> Default for ProgramRegistry<M> {
    fn default() -> Self {
        Self {
            shaders: ResourceTable::default(),
            programs: ResourceTable::default(),
        }
    }
}

impl<M> ProgramRegistry<M> {
    // ── stage objects ─────────────────────────────────────────────────────

    pub(crate) fn create_shader(&mut self, stage: ShaderStage) -> ResourceId {
        self.shaders.insert(ShaderObject {
            stage,
            source: String::new(),
            compiled: None,
            info_log: String::new(),
        })
    }

    pub(crate) fn shader_source(&mut self, shader: ResourceId, source: &str) {
        let Some(obj) = self.shaders.get_mut(shader) else {
            log::warn!("shader_source: unknown shader {shader}");
            return;
        };
        obj.source.clear();
        obj.source.push_str(source);
    }

    /// Runs the front-end; on success `make_module` builds the context payload.
    pub(crate) fn compile_shader<F>(&mut self, shader: ResourceId, make_module: F)
    where
        F: FnOnce(ShaderStage, &str, &StageInterface) -> M,
    {
        let Some(obj) = self.shaders.get_mut(shader) else {
            log::warn!("compile_shader: unknown shader {shader}");
            return;
        };

        match front::compile_wgsl(obj.stage, &obj.source) {
            Ok(interface) => {
                let backend = make_module(obj.stage, &obj.source, &interface);
                obj.compiled = Some(Rc::new(CompiledModule { interface, backend }));
                obj.info_log.clear();
            }
            Err(message) => {
                obj.compiled = None;
                obj.info_log = message;
            }
        }
    }

    pub(crate) fn compile_status(&self, shader: ResourceId) -> bool {
        self.shaders
            .get(shader)
            .is_some_and(|obj| obj.compiled.is_some())
    }

    pub(crate) fn shader_diagnostic(&self, shader: ResourceId) -> Option<String> {
        self.shaders
            .get(shader)
            .map(|obj| obj.info_log.clone())
            .filter(|log| !log.is_empty())
    }

    pub(crate) fn delete_shader(&mut self, shader: ResourceId) {
        if shader.is_null() {
            return;
        }
        if self.shaders.remove(shader).is_none() {
            log::warn!("delete_shader: unknown shader {shader}");
        }
    }

    pub(crate) fn is_shader(&self, shader: ResourceId) -> bool {
        self.shaders.contains(shader)
    }

    pub(crate) fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    // ── program objects ───────────────────────────────────────────────────

    pub(crate) fn create_program(&mut self) -> ResourceId {
        self.programs.insert(ProgramObject::default())
    }

    pub(crate) fn attach_shader(&mut self, program: ResourceId, shader: ResourceId) {
        let Some(sh) = self.shaders.get(shader) else {
            log::warn!("attach_shader: unknown shader {shader}");
            return;
        };
        let Some(prog) = self.programs.get_mut(program) else {
            log::warn!("attach_shader: unknown program {program}");
            return;
        };
        if prog.attached.iter().any(|a| a.shader == shader) {
            log::warn!("attach_shader: shader {shader} already attached to program {program}");
            return;
        }
        prog.attached.push(Attachment {
            shader,
            stage: sh.stage,
            compiled: sh.compiled.clone(),
        });
    }

    pub(crate) fn link_program(&mut self, program: ResourceId) {
        let Some(prog) = self.programs.get_mut(program) else {
            log::warn!("link_program: unknown program {program}");
            return;
        };

        prog.validated = false;
        match link_attachments(&prog.attached) {
            Ok(linked) => {
                prog.linked = Some(linked);
                prog.info_log.clear();
            }
            Err(message) => {
                prog.linked = None;
                prog.info_log = message;
            }
        }
    }

    pub(crate) fn link_status(&self, program: ResourceId) -> bool {
        self.programs
            .get(program)
            .is_some_and(|p| p.linked.is_some())
    }

    /// Checks `program` against the current pipeline state. Never touches link status.
    pub(crate) fn validate_program(&mut self, program: ResourceId, layout: Option<&VertexLayout>) {
        let Some(prog) = self.programs.get_mut(program) else {
            log::warn!("validate_program: unknown program {program}");
            return;
        };

        let outcome = match &prog.linked {
            Some(linked) => check_pipeline_state(linked, layout),
            None => Err("program is not successfully linked".to_string()),
        };

        match outcome {
            Ok(()) => prog.validated = true,
            Err(message) => {
                prog.validated = false;
                if !prog.info_log.is_empty() {
                    prog.info_log.push('\n');
                }
                prog.info_log.push_str("validation: ");
                prog.info_log.push_str(&message);
            }
        }
    }

    pub(crate) fn validate_status(&self, program: ResourceId) -> bool {
        self.programs.get(program).is_some_and(|p| p.validated)
    }

    pub(crate) fn program_diagnostic(&self, program: ResourceId) -> Option<String> {
        self.programs
            .get(program)
            .map(|p| p.info_log.clone())
            .filter(|log| !log.is_empty())
    }

    pub(crate) fn delete_program(&mut self, program: ResourceId) {
        if program.is_null() {
            return;
        }
        if self.programs.remove(program).is_none() {
            log::warn!("delete_program: unknown program {program}");
        }
    }

    pub(crate) fn is_program(&self, program: ResourceId) -> bool {
        self.programs.contains(program)
    }

    pub(crate) fn linked(&self, program: ResourceId) -> Option<&LinkedProgram<M>> {
        self.programs.get(program).and_then(|p| p.linked.as_ref())
    }

    pub(crate) fn live_programs(&self) -> usize {
        self.programs.len()
    }
}

fn link_attachments<M>(attached: &[Attachment<M>]) -> Result<LinkedProgram<M>, String> {
    let vertex = single_stage(attached, ShaderStage::Vertex)?;
    let fragment = single_stage(attached, ShaderStage::Fragment)?;
    front::check_link(&vertex.interface, &fragment.interface)?;
    Ok(LinkedProgram { vertex, fragment })
}

fn single_stage<M>(
    attached: &[Attachment<M>],
    stage: ShaderStage,
) -> Result<Rc<CompiledModule<M>>, String> {
    let mut matching = attached.iter().filter(|a| a.stage == stage);
    let Some(first) = matching.next() else {
        return Err(format!("no {stage} shader attached"));
    };
    if matching.next().is_some() {
        return Err(format!("more than one {stage} shader attached"));
    }
    first
        .compiled
        .clone()
        .ok_or_else(|| format!("{stage} shader {} was not successfully compiled", first.shader))
}

/// Whether `linked` can draw with the given vertex layout into a single color target.
pub(crate) fn check_pipeline_state<M>(
    linked: &LinkedProgram<M>,
    layout: Option<&VertexLayout>,
) -> Result<(), String> {
    let mut problems = Vec::new();

    for input in &linked.vertex.interface.inputs {
        match layout {
            Some(l) if l.attribute == input.location => {
                if input.kind != ValueKind::Float {
                    problems.push(format!(
                        "vertex input at location {} is {}, but the bound attribute is float",
                        input.location,
                        front::describe(input)
                    ));
                }
            }
            _ => problems.push(format!(
                "vertex input at location {} has no bound vertex attribute",
                input.location
            )),
        }
    }

    for output in &linked.fragment.interface.outputs {
        if output.location != 0 {
            problems.push(format!(
                "fragment output at location {} has no color target",
                output.location
            ));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::builtin;

    fn compiled(reg: &mut ProgramRegistry<()>, stage: ShaderStage, src: &str) -> ResourceId {
        let id = reg.create_shader(stage);
        reg.shader_source(id, src);
        reg.compile_shader(id, |_, _, _| ());
        id
    }

    fn layout0() -> VertexLayout {
        VertexLayout {
            buffer: ResourceId::NULL,
            attribute: 0,
            dims: 2,
        }
    }

    #[test]
    fn failed_compile_keeps_info_log() {
        let mut reg = ProgramRegistry::<()>::default();
        let id = compiled(&mut reg, ShaderStage::Vertex, "this is not wgsl");
        assert!(!reg.compile_status(id));
        assert!(reg.shader_diagnostic(id).is_some());
    }

    #[test]
    fn program_outlives_deleted_stages() {
        let mut reg = ProgramRegistry::<()>::default();
        let vs = compiled(&mut reg, ShaderStage::Vertex, builtin::PASSTHROUGH_VERTEX);
        let fs = compiled(&mut reg, ShaderStage::Fragment, builtin::SOLID_WHITE_FRAGMENT);
        let p = reg.create_program();
        reg.attach_shader(p, vs);
        reg.attach_shader(p, fs);
        reg.delete_shader(vs);
        reg.delete_shader(fs);

        reg.link_program(p);
        assert!(reg.link_status(p));
        assert!(!reg.is_shader(vs));
        assert_eq!(reg.live_shaders(), 0);
        assert!(reg.linked(p).is_some());
    }

    #[test]
    fn link_without_fragment_fails() {
        let mut reg = ProgramRegistry::<()>::default();
        let vs = compiled(&mut reg, ShaderStage::Vertex, builtin::PASSTHROUGH_VERTEX);
        let p = reg.create_program();
        reg.attach_shader(p, vs);
        reg.link_program(p);
        assert!(!reg.link_status(p));
        let log = reg.program_diagnostic(p).unwrap();
        assert!(log.contains("no fragment shader attached"), "{log}");
    }

    #[test]
    fn link_with_uncompiled_stage_fails() {
        let mut reg = ProgramRegistry::<()>::default();
        let vs = compiled(&mut reg, ShaderStage::Vertex, "garbage");
        let fs = compiled(&mut reg, ShaderStage::Fragment, builtin::SOLID_WHITE_FRAGMENT);
        let p = reg.create_program();
        reg.attach_shader(p, vs);
        reg.attach_shader(p, fs);
        reg.link_program(p);
        assert!(!reg.link_status(p));
        assert!(reg.program_diagnostic(p).unwrap().contains("not successfully compiled"));
    }

    #[test]
    fn validate_failure_leaves_link_status_alone() {
        let mut reg = ProgramRegistry::<()>::default();
        let vs = compiled(&mut reg, ShaderStage::Vertex, builtin::PASSTHROUGH_VERTEX);
        let fs = compiled(&mut reg, ShaderStage::Fragment, builtin::SOLID_WHITE_FRAGMENT);
        let p = reg.create_program();
        reg.attach_shader(p, vs);
        reg.attach_shader(p, fs);
        reg.link_program(p);

        reg.validate_program(p, None);
        assert!(reg.link_status(p));
        assert!(!reg.validate_status(p));
        assert!(reg.program_diagnostic(p).unwrap().contains("no bound vertex attribute"));

        reg.validate_program(p, Some(&layout0()));
        assert!(reg.validate_status(p));
    }

    #[test]
    fn validate_after_failed_link_reports_but_does_not_panic() {
        let mut reg = ProgramRegistry::<()>::default();
        let p = reg.create_program();
        reg.link_program(p);
        reg.validate_program(p, Some(&layout0()));
        assert!(!reg.validate_status(p));
        assert!(reg.program_diagnostic(p).unwrap().contains("not successfully linked"));
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut reg = ProgramRegistry::<()>::default();
        let bogus = ResourceId::NULL;
        reg.shader_source(bogus, "x");
        reg.compile_shader(bogus, |_, _, _| ());
        reg.link_program(bogus);
        assert!(!reg.compile_status(bogus));
        assert!(!reg.link_status(bogus));
        assert!(!reg.is_program(bogus));
        assert_eq!(reg.live_programs(), 0);
    }
}
