//! In-memory [`Gpu`] backend.
//!
//! `HeadlessGpu` performs the bookkeeping a GL driver would: it hands out
//! object names, tracks which objects are alive and bound, records
//! attribute pointers per vertex array, and remembers uniform uploads and
//! draw calls. Misuse that GL would flag with `GL_INVALID_OPERATION` is
//! appended to [`HeadlessGpu::errors`] instead of panicking.
//!
//! Shader "compilation" accepts any source declaring `void main`; linking
//! requires exactly one compiled vertex and one compiled fragment stage.
//! Uniforms resolve from `uniform <type> <name>;` declarations in the
//! linked sources.

use super::{
    AttributeDesc, BufferKind, BufferUsage, ClearMask, DriverInfo, GlHandle, Gpu, IndexType,
    PixelFormat, Primitive, Sampler, ShaderStage, StencilMode, UniformLocation, UniformValue,
};
use glam::Vec4;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Maximum vertex attributes reported by the headless driver.
const HEADLESS_MAX_VERTEX_ATTRIBS: u32 = 16;

/// One recorded draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub primitive: Primitive,
    pub count: u32,
    pub indexed: bool,
    pub vertex_array: Option<GlHandle>,
    pub program: Option<GlHandle>,
    pub stencil: StencilMode,
}

#[derive(Debug)]
struct BufferRecord {
    len: usize,
    usage: Option<BufferUsage>,
}

#[derive(Debug, Default)]
struct VertexArrayRecord {
    attributes: BTreeMap<u32, AttributeDesc>,
    enabled: BTreeSet<u32>,
    index_buffer: Option<GlHandle>,
}

#[derive(Debug)]
struct TextureRecord {
    width: u32,
    height: u32,
    format: Option<PixelFormat>,
    sampler: Option<Sampler>,
    mipmapped: bool,
}

#[derive(Debug)]
struct ShaderRecord {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramRecord {
    attached: Vec<GlHandle>,
    linked: bool,
    log: String,
    uniforms: Vec<String>,
    values: HashMap<String, UniformValue>,
}

#[derive(Debug)]
struct State {
    next_name: u32,
    fail_allocations: bool,
    fail_uploads: bool,
    link_failure: Option<String>,
    buffers: HashMap<GlHandle, BufferRecord>,
    vertex_arrays: HashMap<GlHandle, VertexArrayRecord>,
    textures: HashMap<GlHandle, TextureRecord>,
    shaders: HashMap<GlHandle, ShaderRecord>,
    programs: HashMap<GlHandle, ProgramRecord>,
    bound_vertex_buffer: Option<GlHandle>,
    bound_index_buffer: Option<GlHandle>,
    bound_vertex_array: Option<GlHandle>,
    active_unit: u32,
    texture_units: HashMap<u32, GlHandle>,
    current_program: Option<GlHandle>,
    viewport: (u32, u32),
    depth_test: bool,
    stencil: StencilMode,
    clear_color: Vec4,
    clears: usize,
    draw_calls: Vec<DrawCall>,
    deleted: Vec<GlHandle>,
    errors: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            next_name: 0,
            fail_allocations: false,
            fail_uploads: false,
            link_failure: None,
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            textures: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            bound_vertex_buffer: None,
            bound_index_buffer: None,
            bound_vertex_array: None,
            active_unit: 0,
            texture_units: HashMap::new(),
            current_program: None,
            viewport: (0, 0),
            depth_test: false,
            stencil: StencilMode::Disabled,
            clear_color: Vec4::ZERO,
            clears: 0,
            draw_calls: Vec::new(),
            deleted: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl State {
    fn allocate(&mut self, what: &str) -> Result<GlHandle, String> {
        if self.fail_allocations {
            return Err(format!("out of memory while creating {what}"));
        }
        self.next_name += 1;
        GlHandle::new(self.next_name).ok_or_else(|| format!("name space exhausted for {what}"))
    }

    fn error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        log::trace!("headless GL error: {msg}");
        self.errors.push(msg);
    }

    fn bound(&self, kind: BufferKind) -> Option<GlHandle> {
        match kind {
            BufferKind::Vertex => self.bound_vertex_buffer,
            BufferKind::Index => match self.bound_vertex_array {
                Some(vao) => self.vertex_arrays.get(&vao).and_then(|v| v.index_buffer),
                None => self.bound_index_buffer,
            },
        }
    }
}

/// A [`Gpu`] that runs entirely in memory. See the module docs.
#[derive(Debug, Default)]
pub struct HeadlessGpu {
    state: RefCell<State>,
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `create_*` call fail, as a context without
    /// memory would.
    pub fn set_fail_allocations(&self, fail: bool) {
        self.state.borrow_mut().fail_allocations = fail;
    }

    /// Makes every subsequent texture upload fail, as a driver running out
    /// of texture memory would.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.state.borrow_mut().fail_uploads = fail;
    }

    /// Makes every subsequent link fail with `log`, as a driver rejecting
    /// mismatched stage interfaces would. `None` restores normal linking.
    pub fn set_link_failure(&self, log: Option<&str>) {
        self.state.borrow_mut().link_failure = log.map(str::to_string);
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.state.borrow().vertex_arrays.len()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    /// Total number of GPU objects not yet deleted.
    pub fn live_objects(&self) -> usize {
        let s = self.state.borrow();
        s.buffers.len()
            + s.vertex_arrays.len()
            + s.textures.len()
            + s.shaders.len()
            + s.programs.len()
    }

    /// Byte length last uploaded to `buffer`.
    pub fn buffer_len(&self, buffer: GlHandle) -> Option<usize> {
        self.state.borrow().buffers.get(&buffer).map(|b| b.len)
    }

    /// Usage hint of the last upload to `buffer`.
    pub fn buffer_usage(&self, buffer: GlHandle) -> Option<BufferUsage> {
        self.state.borrow().buffers.get(&buffer).and_then(|b| b.usage)
    }

    /// Attribute pointers recorded on `vertex_array`, ordered by slot.
    pub fn attributes(&self, vertex_array: GlHandle) -> Vec<AttributeDesc> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&vertex_array)
            .map(|v| v.attributes.values().copied().collect())
            .unwrap_or_default()
    }

    /// Enabled attribute slots of `vertex_array`, ascending.
    pub fn enabled_slots(&self, vertex_array: GlHandle) -> Vec<u32> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&vertex_array)
            .map(|v| v.enabled.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Index buffer captured by `vertex_array`.
    pub fn index_buffer_of(&self, vertex_array: GlHandle) -> Option<GlHandle> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&vertex_array)
            .and_then(|v| v.index_buffer)
    }

    pub fn texture_size(&self, texture: GlHandle) -> Option<(u32, u32)> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .map(|t| (t.width, t.height))
    }

    pub fn texture_format(&self, texture: GlHandle) -> Option<PixelFormat> {
        self.state.borrow().textures.get(&texture).and_then(|t| t.format)
    }

    pub fn texture_sampler(&self, texture: GlHandle) -> Option<Sampler> {
        self.state.borrow().textures.get(&texture).and_then(|t| t.sampler)
    }

    pub fn texture_mipmapped(&self, texture: GlHandle) -> bool {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .is_some_and(|t| t.mipmapped)
    }

    /// Texture bound to `unit`.
    pub fn bound_texture(&self, unit: u32) -> Option<GlHandle> {
        self.state.borrow().texture_units.get(&unit).copied()
    }

    pub fn bound_vertex_array(&self) -> Option<GlHandle> {
        self.state.borrow().bound_vertex_array
    }

    pub fn bound_buffer(&self, kind: BufferKind) -> Option<GlHandle> {
        self.state.borrow().bound(kind)
    }

    pub fn current_program(&self) -> Option<GlHandle> {
        self.state.borrow().current_program
    }

    /// Whether `program` exists and linked successfully.
    pub fn program_linked(&self, program: GlHandle) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|p| p.linked)
    }

    /// Last value uploaded to uniform `name` of `program`.
    pub fn uniform_value(&self, program: GlHandle, name: &str) -> Option<UniformValue> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.values.get(name).copied())
    }

    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.state.borrow().draw_calls.clone()
    }

    pub fn clear_count(&self) -> usize {
        self.state.borrow().clears
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        self.state.borrow().viewport
    }

    pub fn depth_test(&self) -> bool {
        self.state.borrow().depth_test
    }

    pub fn stencil(&self) -> StencilMode {
        self.state.borrow().stencil
    }

    /// Every successfully deleted object, in deletion order.
    pub fn deleted(&self) -> Vec<GlHandle> {
        self.state.borrow().deleted.clone()
    }

    /// Invalid operations recorded so far.
    pub fn errors(&self) -> Vec<String> {
        self.state.borrow().errors.clone()
    }
}

/// Extracts uniform names from GLSL declarations such as
/// `uniform sampler2D texture_diffuse1;` or `uniform mat4 bones[4];`.
fn declared_uniforms(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    for statement in source.split(';') {
        let tokens: Vec<&str> = statement.split_whitespace().collect();
        let Some(pos) = tokens.iter().position(|t| *t == "uniform") else {
            continue;
        };
        if let Some(name) = tokens.get(pos + 2) {
            let name = name.split('[').next().unwrap_or(name);
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
    }
    names
}

impl Gpu for HeadlessGpu {
    fn create_buffer(&self) -> Result<GlHandle, String> {
        let mut s = self.state.borrow_mut();
        let handle = s.allocate("buffer")?;
        s.buffers.insert(handle, BufferRecord { len: 0, usage: None });
        Ok(handle)
    }

    fn bind_buffer(&self, kind: BufferKind, buffer: Option<GlHandle>) {
        let mut s = self.state.borrow_mut();
        if let Some(b) = buffer {
            if !s.buffers.contains_key(&b) {
                s.error(format!("bind of unknown buffer {b}"));
                return;
            }
        }
        match kind {
            BufferKind::Vertex => s.bound_vertex_buffer = buffer,
            BufferKind::Index => match s.bound_vertex_array {
                Some(vao) => {
                    if let Some(record) = s.vertex_arrays.get_mut(&vao) {
                        record.index_buffer = buffer;
                    }
                }
                None => s.bound_index_buffer = buffer,
            },
        }
    }

    fn buffer_data(&self, kind: BufferKind, data: &[u8], usage: BufferUsage) {
        let mut s = self.state.borrow_mut();
        let Some(bound) = s.bound(kind) else {
            s.error(format!("buffer_data with no {kind} buffer bound"));
            return;
        };
        if let Some(record) = s.buffers.get_mut(&bound) {
            record.len = data.len();
            record.usage = Some(usage);
        }
    }

    fn delete_buffer(&self, buffer: GlHandle) {
        let mut s = self.state.borrow_mut();
        if s.buffers.remove(&buffer).is_none() {
            s.error(format!("delete of unknown buffer {buffer}"));
            return;
        }
        s.deleted.push(buffer);
        if s.bound_vertex_buffer == Some(buffer) {
            s.bound_vertex_buffer = None;
        }
        if s.bound_index_buffer == Some(buffer) {
            s.bound_index_buffer = None;
        }
        for vao in s.vertex_arrays.values_mut() {
            if vao.index_buffer == Some(buffer) {
                vao.index_buffer = None;
            }
        }
    }

    fn create_vertex_array(&self) -> Result<GlHandle, String> {
        let mut s = self.state.borrow_mut();
        let handle = s.allocate("vertex array")?;
        s.vertex_arrays.insert(handle, VertexArrayRecord::default());
        Ok(handle)
    }

    fn bind_vertex_array(&self, vertex_array: Option<GlHandle>) {
        let mut s = self.state.borrow_mut();
        if let Some(v) = vertex_array {
            if !s.vertex_arrays.contains_key(&v) {
                s.error(format!("bind of unknown vertex array {v}"));
                return;
            }
        }
        s.bound_vertex_array = vertex_array;
    }

    fn vertex_attrib_pointer(&self, attr: &AttributeDesc) {
        let mut s = self.state.borrow_mut();
        let Some(vao) = s.bound_vertex_array else {
            s.error("vertex_attrib_pointer with no vertex array bound");
            return;
        };
        if s.bound_vertex_buffer.is_none() {
            s.error("vertex_attrib_pointer with no vertex buffer bound");
            return;
        }
        if let Some(record) = s.vertex_arrays.get_mut(&vao) {
            record.attributes.insert(attr.slot, *attr);
        }
    }

    fn enable_vertex_attrib_array(&self, slot: u32) {
        let mut s = self.state.borrow_mut();
        let Some(vao) = s.bound_vertex_array else {
            s.error(format!("enable of slot {slot} with no vertex array bound"));
            return;
        };
        if let Some(record) = s.vertex_arrays.get_mut(&vao) {
            record.enabled.insert(slot);
        }
    }

    fn delete_vertex_array(&self, vertex_array: GlHandle) {
        let mut s = self.state.borrow_mut();
        if s.vertex_arrays.remove(&vertex_array).is_none() {
            s.error(format!("delete of unknown vertex array {vertex_array}"));
            return;
        }
        s.deleted.push(vertex_array);
        if s.bound_vertex_array == Some(vertex_array) {
            s.bound_vertex_array = None;
        }
    }

    fn create_texture(&self) -> Result<GlHandle, String> {
        let mut s = self.state.borrow_mut();
        let handle = s.allocate("texture")?;
        s.textures.insert(
            handle,
            TextureRecord {
                width: 0,
                height: 0,
                format: None,
                sampler: None,
                mipmapped: false,
            },
        );
        Ok(handle)
    }

    fn active_texture(&self, unit: u32) {
        self.state.borrow_mut().active_unit = unit;
    }

    fn bind_texture(&self, texture: Option<GlHandle>) {
        let mut s = self.state.borrow_mut();
        let unit = s.active_unit;
        match texture {
            Some(t) if !s.textures.contains_key(&t) => {
                s.error(format!("bind of unknown texture {t}"));
            }
            Some(t) => {
                s.texture_units.insert(unit, t);
            }
            None => {
                s.texture_units.remove(&unit);
            }
        }
    }

    fn set_sampler(&self, sampler: &Sampler) {
        let mut s = self.state.borrow_mut();
        let unit = s.active_unit;
        match s.texture_units.get(&unit).copied() {
            Some(t) => {
                if let Some(record) = s.textures.get_mut(&t) {
                    record.sampler = Some(*sampler);
                }
            }
            None => s.error("set_sampler with no texture bound"),
        }
    }

    fn tex_image_2d(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: &[u8],
    ) -> Result<(), String> {
        let mut s = self.state.borrow_mut();
        if s.fail_uploads {
            return Err("out of memory (GL_OUT_OF_MEMORY)".into());
        }
        let expected = width as usize * height as usize * format.channels() as usize;
        if pixels.len() != expected {
            let msg = format!(
                "tex_image_2d expected {expected} bytes for {width}x{height}, got {}",
                pixels.len()
            );
            s.error(msg.clone());
            return Err(msg);
        }
        let unit = s.active_unit;
        let Some(t) = s.texture_units.get(&unit).copied() else {
            s.error("tex_image_2d with no texture bound");
            return Err("no texture bound".into());
        };
        if let Some(record) = s.textures.get_mut(&t) {
            record.width = width;
            record.height = height;
            record.format = Some(format);
            record.mipmapped = false;
        }
        Ok(())
    }

    fn generate_mipmap(&self) {
        let mut s = self.state.borrow_mut();
        let unit = s.active_unit;
        match s.texture_units.get(&unit).copied() {
            Some(t) => {
                if let Some(record) = s.textures.get_mut(&t) {
                    record.mipmapped = true;
                }
            }
            None => s.error("generate_mipmap with no texture bound"),
        }
    }

    fn delete_texture(&self, texture: GlHandle) {
        let mut s = self.state.borrow_mut();
        if s.textures.remove(&texture).is_none() {
            s.error(format!("delete of unknown texture {texture}"));
            return;
        }
        s.deleted.push(texture);
        s.texture_units.retain(|_, t| *t != texture);
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<GlHandle, String> {
        let mut s = self.state.borrow_mut();
        let handle = s.allocate("shader")?;
        s.shaders.insert(
            handle,
            ShaderRecord {
                stage,
                source: String::new(),
                compiled: false,
                log: String::new(),
            },
        );
        Ok(handle)
    }

    fn compile_shader(&self, shader: GlHandle, source: &str) -> bool {
        let mut s = self.state.borrow_mut();
        let Some(record) = s.shaders.get_mut(&shader) else {
            s.error(format!("compile of unknown shader {shader}"));
            return false;
        };
        record.source = source.to_string();
        record.compiled = source.contains("void main");
        record.log = if record.compiled {
            String::new()
        } else {
            format!("0:1: error: {} stage has no `void main()` entry point", record.stage)
        };
        record.compiled
    }

    fn shader_info_log(&self, shader: GlHandle) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|r| r.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: GlHandle) {
        let mut s = self.state.borrow_mut();
        if s.shaders.remove(&shader).is_none() {
            s.error(format!("delete of unknown shader {shader}"));
            return;
        }
        s.deleted.push(shader);
    }

    fn create_program(&self) -> Result<GlHandle, String> {
        let mut s = self.state.borrow_mut();
        let handle = s.allocate("program")?;
        s.programs.insert(handle, ProgramRecord::default());
        Ok(handle)
    }

    fn attach_shader(&self, program: GlHandle, shader: GlHandle) {
        let mut s = self.state.borrow_mut();
        if !s.shaders.contains_key(&shader) {
            s.error(format!("attach of unknown shader {shader}"));
            return;
        }
        match s.programs.get_mut(&program) {
            Some(p) => p.attached.push(shader),
            None => s.error(format!("attach to unknown program {program}")),
        }
    }

    fn detach_shader(&self, program: GlHandle, shader: GlHandle) {
        let mut s = self.state.borrow_mut();
        if let Some(p) = s.programs.get_mut(&program) {
            p.attached.retain(|a| *a != shader);
        }
    }

    fn link_program(&self, program: GlHandle) -> bool {
        let mut guard = self.state.borrow_mut();
        let s = &mut *guard;
        let Some(record) = s.programs.get_mut(&program) else {
            s.errors.push(format!("link of unknown program {program}"));
            return false;
        };

        let stages: Vec<&ShaderRecord> = record
            .attached
            .iter()
            .filter_map(|h| s.shaders.get(h))
            .collect();
        let vertex = stages
            .iter()
            .filter(|r| r.stage == ShaderStage::Vertex && r.compiled)
            .count();
        let fragment = stages
            .iter()
            .filter(|r| r.stage == ShaderStage::Fragment && r.compiled)
            .count();

        record.linked = vertex == 1 && fragment == 1 && stages.len() == 2;
        if let (true, Some(log)) = (record.linked, &s.link_failure) {
            record.linked = false;
            record.log = log.clone();
            record.uniforms.clear();
        } else if record.linked {
            record.log.clear();
            let mut seen = BTreeSet::new();
            record.uniforms = stages
                .iter()
                .flat_map(|r| declared_uniforms(&r.source))
                .filter(|name| seen.insert(name.clone()))
                .collect();
        } else {
            record.log = format!(
                "error: linking needs one compiled vertex and one compiled fragment stage \
                 (found {vertex} vertex, {fragment} fragment, {} attached)",
                stages.len()
            );
            record.uniforms.clear();
        }
        record.values.clear();
        record.linked
    }

    fn program_info_log(&self, program: GlHandle) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: Option<GlHandle>) {
        let mut s = self.state.borrow_mut();
        if let Some(p) = program {
            if !s.programs.get(&p).is_some_and(|r| r.linked) {
                s.error(format!("use of unlinked program {p}"));
                return;
            }
        }
        s.current_program = program;
    }

    fn uniform_location(&self, program: GlHandle, name: &str) -> Option<UniformLocation> {
        let s = self.state.borrow();
        let record = s.programs.get(&program)?;
        if !record.linked {
            return None;
        }
        record
            .uniforms
            .iter()
            .position(|u| u == name)
            .and_then(|i| u32::try_from(i).ok())
            .map(UniformLocation)
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        let mut s = self.state.borrow_mut();
        let Some(program) = s.current_program else {
            s.error("set_uniform with no program in use");
            return;
        };
        let Some(record) = s.programs.get_mut(&program) else {
            return;
        };
        match record.uniforms.get(location.0 as usize).cloned() {
            Some(name) => {
                record.values.insert(name, *value);
            }
            None => s.error(format!("set_uniform at unknown location {}", location.0)),
        }
    }

    fn delete_program(&self, program: GlHandle) {
        let mut s = self.state.borrow_mut();
        if s.programs.remove(&program).is_none() {
            s.error(format!("delete of unknown program {program}"));
            return;
        }
        s.deleted.push(program);
        if s.current_program == Some(program) {
            s.current_program = None;
        }
    }

    fn viewport(&self, width: u32, height: u32) {
        self.state.borrow_mut().viewport = (width, height);
    }

    fn clear(&self, color: Vec4, mask: ClearMask) {
        let mut s = self.state.borrow_mut();
        if mask.color {
            s.clear_color = color;
        }
        s.clears += 1;
    }

    fn set_depth_test(&self, enabled: bool) {
        self.state.borrow_mut().depth_test = enabled;
    }

    fn set_stencil(&self, mode: StencilMode) {
        self.state.borrow_mut().stencil = mode;
    }

    fn draw_arrays(&self, primitive: Primitive, _first: u32, count: u32) {
        let mut s = self.state.borrow_mut();
        if s.current_program.is_none() {
            s.error("draw_arrays with no program in use");
            return;
        }
        let call = DrawCall {
            primitive,
            count,
            indexed: false,
            vertex_array: s.bound_vertex_array,
            program: s.current_program,
            stencil: s.stencil,
        };
        s.draw_calls.push(call);
    }

    fn draw_elements(
        &self,
        primitive: Primitive,
        count: u32,
        _index_type: IndexType,
        _offset: u32,
    ) {
        let mut s = self.state.borrow_mut();
        if s.current_program.is_none() {
            s.error("draw_elements with no program in use");
            return;
        }
        if s.bound(BufferKind::Index).is_none() {
            s.error("draw_elements with no index buffer bound");
            return;
        }
        let call = DrawCall {
            primitive,
            count,
            indexed: true,
            vertex_array: s.bound_vertex_array,
            program: s.current_program,
            stencil: s.stencil,
        };
        s.draw_calls.push(call);
    }

    fn read_pixels(&self, width: u32, height: u32) -> Vec<u8> {
        let color = self.state.borrow().clear_color;
        let texel = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
        let texel = [texel.x as u8, texel.y as u8, texel.z as u8, texel.w as u8];
        texel
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect()
    }

    fn driver_info(&self) -> DriverInfo {
        DriverInfo {
            vendor: "learngl".to_string(),
            renderer: "headless".to_string(),
            version: "3.3 (headless)".to_string(),
            shading_language: "3.30".to_string(),
            max_vertex_attributes: HEADLESS_MAX_VERTEX_ATTRIBS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::ComponentType;

    const VS: &str = "#version 330 core\nuniform mat4 transform;\nvoid main() {}\n";
    const FS: &str = "#version 330 core\nuniform sampler2D ourTexture1;\n\
                      uniform float ourColor;\nvoid main() {}\n";

    fn linked_program(gpu: &HeadlessGpu) -> GlHandle {
        let vs = gpu.create_shader(ShaderStage::Vertex).unwrap();
        let fs = gpu.create_shader(ShaderStage::Fragment).unwrap();
        assert!(gpu.compile_shader(vs, VS));
        assert!(gpu.compile_shader(fs, FS));
        let program = gpu.create_program().unwrap();
        gpu.attach_shader(program, vs);
        gpu.attach_shader(program, fs);
        assert!(gpu.link_program(program));
        program
    }

    #[test]
    fn declared_uniforms_finds_names_and_strips_arrays() {
        let names = declared_uniforms("uniform mat4 model;\nuniform vec3 lights[4];\nin vec3 pos;");
        assert_eq!(names, vec!["model".to_string(), "lights".to_string()]);
    }

    #[test]
    fn allocations_get_distinct_nonzero_names() {
        let gpu = HeadlessGpu::new();
        let a = gpu.create_buffer().unwrap();
        let b = gpu.create_texture().unwrap();
        assert_ne!(a, b);
        assert_eq!(gpu.live_objects(), 2);
    }

    #[test]
    fn failing_allocations_return_backend_text() {
        let gpu = HeadlessGpu::new();
        gpu.set_fail_allocations(true);
        let err = gpu.create_buffer().unwrap_err();
        assert!(err.contains("out of memory"), "got: {err}");
        assert_eq!(gpu.live_objects(), 0);
    }

    #[test]
    fn index_buffer_binding_is_captured_by_vertex_array() {
        let gpu = HeadlessGpu::new();
        let vao = gpu.create_vertex_array().unwrap();
        let ebo = gpu.create_buffer().unwrap();
        gpu.bind_vertex_array(Some(vao));
        gpu.bind_buffer(BufferKind::Index, Some(ebo));
        gpu.bind_vertex_array(None);
        assert_eq!(gpu.index_buffer_of(vao), Some(ebo));
        assert_eq!(gpu.bound_buffer(BufferKind::Index), None);
    }

    #[test]
    fn attrib_pointer_without_vertex_buffer_is_an_error() {
        let gpu = HeadlessGpu::new();
        let vao = gpu.create_vertex_array().unwrap();
        gpu.bind_vertex_array(Some(vao));
        gpu.vertex_attrib_pointer(&AttributeDesc {
            slot: 0,
            components: 3,
            component_type: ComponentType::Float,
            normalized: false,
            stride_bytes: 12,
            offset_bytes: 0,
        });
        assert_eq!(gpu.errors().len(), 1);
        assert!(gpu.attributes(vao).is_empty());
    }

    #[test]
    fn link_resolves_uniforms_from_both_stages() {
        let gpu = HeadlessGpu::new();
        let program = linked_program(&gpu);
        assert!(gpu.uniform_location(program, "transform").is_some());
        assert!(gpu.uniform_location(program, "ourColor").is_some());
        assert!(gpu.uniform_location(program, "missing").is_none());
    }

    #[test]
    fn two_vertex_stages_fail_to_link() {
        let gpu = HeadlessGpu::new();
        let a = gpu.create_shader(ShaderStage::Vertex).unwrap();
        let b = gpu.create_shader(ShaderStage::Vertex).unwrap();
        gpu.compile_shader(a, VS);
        gpu.compile_shader(b, VS);
        let program = gpu.create_program().unwrap();
        gpu.attach_shader(program, a);
        gpu.attach_shader(program, b);
        assert!(!gpu.link_program(program));
        assert!(gpu.program_info_log(program).contains("2 vertex"));
    }

    #[test]
    fn set_uniform_records_value_on_current_program() {
        let gpu = HeadlessGpu::new();
        let program = linked_program(&gpu);
        gpu.use_program(Some(program));
        let loc = gpu.uniform_location(program, "ourColor").unwrap();
        gpu.set_uniform(loc, &UniformValue::Float(0.5));
        assert_eq!(
            gpu.uniform_value(program, "ourColor"),
            Some(UniformValue::Float(0.5))
        );
    }

    #[test]
    fn draw_elements_requires_index_buffer() {
        let gpu = HeadlessGpu::new();
        let program = linked_program(&gpu);
        gpu.use_program(Some(program));
        gpu.draw_elements(Primitive::Triangles, 6, IndexType::UnsignedInt, 0);
        assert!(gpu.draw_calls().is_empty());
        assert_eq!(gpu.errors().len(), 1);
    }

    #[test]
    fn read_pixels_returns_clear_color() {
        let gpu = HeadlessGpu::new();
        gpu.clear(Vec4::new(1.0, 0.0, 0.0, 1.0), ClearMask::ALL);
        let pixels = gpu.read_pixels(2, 2);
        assert_eq!(pixels.len(), 16);
        assert_eq!(&pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn tex_image_rejects_wrong_pixel_count() {
        let gpu = HeadlessGpu::new();
        let t = gpu.create_texture().unwrap();
        gpu.bind_texture(Some(t));
        assert!(gpu.tex_image_2d(2, 2, PixelFormat::Rgba, &[0; 15]).is_err());
        assert_eq!(gpu.texture_size(t), Some((0, 0)));
        assert_eq!(gpu.errors().len(), 1);
    }
}
