//! In-memory backend that records every call.
//!
//! Used by the renderer's tests and usable by downstream crates to assert on
//! draw-call structure without a GPU. Tracks live resources so leaks and
//! double frees show up as assertion failures.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::Range;

use super::{
    DrawTarget, FramebufferHandle, GpuBackend, ProgramDesc, ProgramHandle, TargetBinding,
    TextureDesc, TextureHandle, UNIFORM_FLOATS,
};
use crate::shader::{ShaderError, ShaderErrorKind, ShaderStage};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateTexture { texture: TextureHandle, width: u32, height: u32 },
    DestroyTexture(TextureHandle),
    CreateFramebuffer(FramebufferHandle),
    AttachColor { framebuffer: FramebufferHandle, texture: TextureHandle },
    DestroyFramebuffer(FramebufferHandle),
    BindTarget(TargetBinding),
    Clear([f32; 4]),
    UploadGeometry { positions: Vec<f32>, uvs: Vec<f32> },
    CompileProgram { program: ProgramHandle, label: String },
    DestroyProgram(ProgramHandle),
    WriteUniforms { program: ProgramHandle, header: [f32; 4] },
    Draw { program: ProgramHandle, texture: TextureHandle, vertices: Range<u32>, target: TargetBinding },
    Finish,
}

/// A draw call together with the state it was issued under.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub program: ProgramHandle,
    pub texture: TextureHandle,
    pub vertices: Range<u32>,
    pub target: TargetBinding,
    /// Position floats covered by `vertices`.
    pub positions: Vec<f32>,
    /// Uv floats covered by `vertices`.
    pub uvs: Vec<f32>,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<Call>,
    next_id: u32,

    textures: BTreeMap<TextureHandle, TextureDesc>,
    framebuffers: BTreeMap<FramebufferHandle, Option<TextureHandle>>,
    programs: BTreeMap<ProgramHandle, String>,
    double_frees: usize,

    bound: Option<TargetBinding>,
    geometry: (Vec<f32>, Vec<f32>),
    draws: Vec<RecordedDraw>,

    fail_textures: bool,
    incomplete_framebuffers: bool,
    failing_programs: HashSet<String>,
    flipped_targets: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports render targets as bottom-up (GL-style storage).
    pub fn with_flipped_targets(mut self) -> Self {
        self.flipped_targets = true;
        self
    }

    /// Makes every subsequent texture creation fail.
    pub fn fail_texture_creation(&mut self, fail: bool) {
        self.fail_textures = fail;
    }

    /// Makes every subsequent completeness check fail.
    pub fn fail_framebuffer_completeness(&mut self, fail: bool) {
        self.incomplete_framebuffers = fail;
    }

    /// Makes compilation of the program labelled `label` fail.
    pub fn fail_program(&mut self, label: impl Into<String>) {
        self.failing_programs.insert(label.into());
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    /// Draws issued while `target` was bound.
    pub fn draws_into(&self, target: DrawTarget) -> impl Iterator<Item = &RecordedDraw> {
        self.draws.iter().filter(move |d| d.target.target == target)
    }

    /// Forgets recorded calls and draws; live resource tracking is kept.
    pub fn clear_log(&mut self) {
        self.calls.clear();
        self.draws.clear();
    }

    pub fn live_textures(&self) -> BTreeSet<TextureHandle> {
        self.textures.keys().copied().collect()
    }

    pub fn live_framebuffers(&self) -> BTreeSet<FramebufferHandle> {
        self.framebuffers.keys().copied().collect()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn texture_desc(&self, texture: TextureHandle) -> Option<&TextureDesc> {
        self.textures.get(&texture)
    }

    /// Number of destroy calls that targeted an already-destroyed handle.
    pub fn double_frees(&self) -> usize {
        self.double_frees
    }

    pub fn bound(&self) -> Option<TargetBinding> {
        self.bound
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GpuBackend for RecordingBackend {
    fn create_texture(&mut self, desc: &TextureDesc, _rgba: Option<&[u8]>) -> Option<TextureHandle> {
        if self.fail_textures {
            return None;
        }
        let texture = TextureHandle::new(self.next());
        self.textures.insert(texture, *desc);
        self.calls.push(Call::CreateTexture {
            texture,
            width: desc.width,
            height: desc.height,
        });
        Some(texture)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_none() {
            self.double_frees += 1;
        }
        self.calls.push(Call::DestroyTexture(texture));
    }

    fn create_framebuffer(&mut self) -> Option<FramebufferHandle> {
        let framebuffer = FramebufferHandle::new(self.next());
        self.framebuffers.insert(framebuffer, None);
        self.calls.push(Call::CreateFramebuffer(framebuffer));
        Some(framebuffer)
    }

    fn attach_color(&mut self, framebuffer: FramebufferHandle, texture: TextureHandle) {
        if let Some(slot) = self.framebuffers.get_mut(&framebuffer) {
            *slot = Some(texture);
        }
        self.calls.push(Call::AttachColor { framebuffer, texture });
    }

    fn is_framebuffer_complete(&self, framebuffer: FramebufferHandle) -> bool {
        if self.incomplete_framebuffers {
            return false;
        }
        match self.framebuffers.get(&framebuffer) {
            Some(Some(texture)) => self
                .textures
                .get(texture)
                .is_some_and(|d| d.render_target && d.width > 0 && d.height > 0),
            _ => false,
        }
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if self.framebuffers.remove(&framebuffer).is_none() {
            self.double_frees += 1;
        }
        self.calls.push(Call::DestroyFramebuffer(framebuffer));
    }

    fn bind_target(&mut self, binding: TargetBinding) {
        self.bound = Some(binding);
        self.calls.push(Call::BindTarget(binding));
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        self.calls.push(Call::Clear(rgba));
    }

    fn upload_geometry(&mut self, positions: &[f32], uvs: &[f32]) {
        self.geometry = (positions.to_vec(), uvs.to_vec());
        self.calls.push(Call::UploadGeometry {
            positions: positions.to_vec(),
            uvs: uvs.to_vec(),
        });
    }

    fn compile_program(&mut self, desc: &ProgramDesc) -> Result<ProgramHandle, ShaderError> {
        if self.failing_programs.contains(&desc.label) {
            return Err(ShaderError {
                kind: ShaderErrorKind::Link,
                stage: ShaderStage::Fragment,
                effect: None,
                line: None,
                message: format!("recording backend rejected `{}`", desc.label),
            });
        }
        let program = ProgramHandle::new(self.next());
        self.programs.insert(program, desc.label.clone());
        self.calls.push(Call::CompileProgram {
            program,
            label: desc.label.clone(),
        });
        Ok(program)
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(&program).is_none() {
            self.double_frees += 1;
        }
        self.calls.push(Call::DestroyProgram(program));
    }

    fn write_uniforms(&mut self, program: ProgramHandle, data: &[f32; UNIFORM_FLOATS]) {
        self.calls.push(Call::WriteUniforms {
            program,
            header: [data[0], data[1], data[2], data[3]],
        });
    }

    fn draw(&mut self, program: ProgramHandle, texture: TextureHandle, vertices: Range<u32>) {
        let target = self.bound.unwrap_or(TargetBinding::surface(0, 0));
        let floats = (vertices.start as usize * 2)..(vertices.end as usize * 2);
        let slice = |v: &[f32]| v.get(floats.clone()).map(<[f32]>::to_vec).unwrap_or_default();

        self.draws.push(RecordedDraw {
            program,
            texture,
            vertices: vertices.clone(),
            target,
            positions: slice(&self.geometry.0),
            uvs: slice(&self.geometry.1),
        });
        self.calls.push(Call::Draw {
            program,
            texture,
            vertices,
            target,
        });
    }

    fn finish(&mut self) {
        self.calls.push(Call::Finish);
    }

    fn flips_render_targets(&self) -> bool {
        self.flipped_targets
    }
}
