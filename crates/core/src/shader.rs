//! Shader stages and linked shader programs.
//!
//! A [`Shader`] is a single compiled stage. A [`ShaderProgram`] is created
//! unlinked and becomes usable only after a successful
//! [`link`](ShaderProgram::link); stages can be released as soon as the
//! program is linked.

use crate::error::GlError;
use crate::gpu::{GlHandle, Gpu, ShaderStage, UniformValue};
use std::path::Path;

/// Prefixes every source line with a right-aligned line number and
/// appends the driver log, so log positions can be matched to the GLSL.
pub fn format_shader_error(source: &str, log: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let width = lines.len().max(1).to_string().len();

    let numbered = lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}: {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    match (numbered.is_empty(), log.trim().is_empty()) {
        (true, true) => String::new(),
        (true, false) => log.trim_end().to_string(),
        (false, true) => numbered,
        (false, false) => format!("{numbered}\n\n{}", log.trim_end()),
    }
}

/// One compiled shader stage.
#[derive(Debug)]
pub struct Shader {
    handle: Option<GlHandle>,
    stage: ShaderStage,
    label: String,
}

impl Shader {
    /// Compiles `source` as a `stage` shader.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::Compile`] with the numbered source and driver log
    /// (the stage object is deleted), or [`GlError::Allocation`].
    pub fn compile(
        gpu: &dyn Gpu,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> Result<Self, GlError> {
        let handle = gpu
            .create_shader(stage)
            .map_err(|e| GlError::allocation(format!("{stage} shader '{label}'"), e))?;

        if !gpu.compile_shader(handle, source) {
            let log = gpu.shader_info_log(handle);
            gpu.delete_shader(handle);
            return Err(GlError::Compile {
                stage,
                label: label.to_string(),
                log: format_shader_error(source, &log),
            });
        }

        log::debug!("compiled {stage} shader '{label}' {handle}");
        Ok(Self {
            handle: Some(handle),
            stage,
            label: label.to_string(),
        })
    }

    /// Reads GLSL from `path` and compiles it, labelled with the path.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::Io`] if the file cannot be read, otherwise as
    /// [`compile`](Self::compile).
    pub fn from_file(
        gpu: &dyn Gpu,
        stage: ShaderStage,
        path: impl AsRef<Path>,
    ) -> Result<Self, GlError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| GlError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::compile(gpu, stage, &path.display().to_string(), &source)
    }

    pub fn handle(&self) -> Option<GlHandle> {
        self.handle
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// # Errors
    ///
    /// Returns [`GlError::UseAfterRelease`] if already released.
    pub fn release(&mut self, gpu: &dyn Gpu) -> Result<(), GlError> {
        let handle = self.live()?;
        gpu.delete_shader(handle);
        self.handle = None;
        Ok(())
    }

    fn live(&self) -> Result<GlHandle, GlError> {
        self.handle.ok_or_else(|| {
            GlError::use_after_release(format!("{} shader '{}'", self.stage, self.label))
        })
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            log::warn!(
                "{} shader '{}' {handle} dropped without release",
                self.stage,
                self.label
            );
        }
    }
}

/// A program object linking one vertex and one fragment stage.
#[derive(Debug)]
pub struct ShaderProgram {
    handle: Option<GlHandle>,
    label: String,
    linked: bool,
}

impl ShaderProgram {
    /// Allocates an empty, unlinked program.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::Allocation`] if the backend refuses.
    pub fn new(gpu: &dyn Gpu, label: &str) -> Result<Self, GlError> {
        let handle = gpu
            .create_program()
            .map_err(|e| GlError::allocation(format!("program '{label}'"), e))?;
        Ok(Self {
            handle: Some(handle),
            label: label.to_string(),
            linked: false,
        })
    }

    /// Compiles both stages, links them and releases the stages again,
    /// whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns the first [`GlError::Compile`], [`GlError::Link`] or
    /// [`GlError::Allocation`] encountered. Nothing stays allocated on error.
    pub fn build(
        gpu: &dyn Gpu,
        label: &str,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Self, GlError> {
        let mut vertex = Shader::compile(gpu, ShaderStage::Vertex, label, vertex_src)?;
        let mut fragment = match Shader::compile(gpu, ShaderStage::Fragment, label, fragment_src) {
            Ok(f) => f,
            Err(e) => {
                vertex.release(gpu)?;
                return Err(e);
            }
        };

        let result = Self::new(gpu, label).and_then(|mut program| {
            match program.link(gpu, &vertex, &fragment) {
                Ok(()) => Ok(program),
                Err(e) => {
                    program.release(gpu)?;
                    Err(e)
                }
            }
        });

        vertex.release(gpu)?;
        fragment.release(gpu)?;
        result
    }

    /// Attaches `vertex` and `fragment`, links, then detaches both.
    ///
    /// On failure the program stays unlinked and can be linked again.
    ///
    /// # Errors
    ///
    /// - [`GlError::Link`] with the backend log if linking fails.
    /// - [`GlError::InvalidArgument`] if the stages are swapped.
    /// - [`GlError::UseAfterRelease`] if the program or a stage was released.
    pub fn link(
        &mut self,
        gpu: &dyn Gpu,
        vertex: &Shader,
        fragment: &Shader,
    ) -> Result<(), GlError> {
        let program = self.live()?;
        let vs = vertex.live()?;
        let fs = fragment.live()?;
        if vertex.stage() != ShaderStage::Vertex || fragment.stage() != ShaderStage::Fragment {
            return Err(GlError::InvalidArgument(format!(
                "program '{}' needs a vertex and a fragment stage, got {} and {}",
                self.label,
                vertex.stage(),
                fragment.stage()
            )));
        }

        gpu.attach_shader(program, vs);
        gpu.attach_shader(program, fs);
        let ok = gpu.link_program(program);
        gpu.detach_shader(program, vs);
        gpu.detach_shader(program, fs);

        self.linked = ok;
        if !ok {
            return Err(GlError::Link {
                label: self.label.clone(),
                log: gpu.program_info_log(program),
            });
        }
        log::debug!("linked program '{}' {program}", self.label);
        Ok(())
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    pub fn handle(&self) -> Option<GlHandle> {
        self.handle
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Makes this the current program.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::NotLinked`] unless a link succeeded, and
    /// [`GlError::UseAfterRelease`] after release.
    pub fn use_program(&self, gpu: &dyn Gpu) -> Result<(), GlError> {
        let handle = self.live()?;
        if !self.linked {
            return Err(GlError::NotLinked {
                label: self.label.clone(),
            });
        }
        gpu.use_program(Some(handle));
        Ok(())
    }

    /// Activates the program and uploads `value` to uniform `name`.
    ///
    /// Names the linker optimised away or never declared are ignored, as in
    /// GL. On an unlinked program this logs a warning and uploads nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::UseAfterRelease`] after release.
    pub fn set_uniform(
        &self,
        gpu: &dyn Gpu,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<(), GlError> {
        let handle = self.live()?;
        if !self.linked {
            log::warn!(
                "ignoring uniform '{name}' on unlinked program '{}'",
                self.label
            );
            return Ok(());
        }
        gpu.use_program(Some(handle));
        match gpu.uniform_location(handle, name) {
            Some(location) => gpu.set_uniform(location, &value.into()),
            None => log::trace!("uniform '{name}' not active in program '{}'", self.label),
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`GlError::UseAfterRelease`] if already released.
    pub fn release(&mut self, gpu: &dyn Gpu) -> Result<(), GlError> {
        let handle = self.live()?;
        gpu.delete_program(handle);
        self.handle = None;
        self.linked = false;
        log::debug!("released program '{}'", self.label);
        Ok(())
    }

    fn live(&self) -> Result<GlHandle, GlError> {
        self.handle
            .ok_or_else(|| GlError::use_after_release(format!("program '{}'", self.label)))
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            log::warn!("program '{}' {handle} dropped without release", self.label);
        }
    }
}
