//! Presentation pass: main render target → post-process chain → surface.
//!
//! With no effects the main target is blitted straight to the surface. With
//! N effects the image ping-pongs through two intermediate targets sized to
//! the surface and the last effect writes to the surface.

mod uniforms;

pub use uniforms::{SharedUniforms, UniformMappingError, UniformSlot, SHARED_UNIFORM_FLOATS};

use crate::backend::{BlendMode, GpuBackend, ProgramDesc, ProgramHandle, TargetBinding, TextureHandle};
use crate::batch::{quad_positions, quad_uvs};
use crate::coords::Rect;
use crate::error::RenderError;
use crate::shader::{self, ShaderSource, PASSTHROUGH_EFFECT_WGSL};
use crate::target::RenderTarget;

/// A post-process effect.
///
/// `source` defines `fn effect(uv: vec2<f32>, color: vec4<f32>) -> vec4<f32>`;
/// it can read `u.header` (`resolution.xy, flip_v, frame`), the shared buffer
/// through `param(i)`, and sample `source_texture` / `source_sampler`.
#[derive(Debug, Clone)]
pub struct EffectDesc {
    pub name: String,
    pub source: String,
    pub uniforms: Option<UniformSlot>,
}

impl EffectDesc {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            uniforms: None,
        }
    }

    pub fn with_uniforms(mut self, offset: usize, size: usize) -> Self {
        self.uniforms = Some(UniformSlot::new(offset, size));
        self
    }
}

#[derive(Debug)]
struct Effect {
    name: String,
    program: ProgramHandle,
    slot: Option<UniformSlot>,
}

#[derive(Debug)]
pub struct PresentPass {
    /// `None` once released.
    blit: Option<ProgramHandle>,
    effects: Vec<Effect>,
    shared: SharedUniforms,
    intermediates: Option<[RenderTarget; 2]>,
}

impl PresentPass {
    /// Compiles the blit program. Failure is fatal: nothing can be shown
    /// without it.
    pub fn new<B: GpuBackend + ?Sized>(backend: &mut B) -> Result<Self, RenderError> {
        let blit = compile(backend, "nabu blit", &ShaderSource::effect(PASSTHROUGH_EFFECT_WGSL))?;
        Ok(Self {
            blit: Some(blit),
            effects: Vec::new(),
            shared: SharedUniforms::default(),
            intermediates: None,
        })
    }

    /// Validates the uniform slot, then the WGSL, then compiles.
    ///
    /// A rejected slot never reaches the shader compiler, so no program is
    /// created for an invalid mapping.
    pub fn add_effect<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        desc: &EffectDesc,
    ) -> Result<(), RenderError> {
        if let Some(slot) = desc.uniforms {
            slot.validate(&desc.name)?;
        }

        let label = format!("nabu effect {}", desc.name);
        let program = compile(backend, &label, &ShaderSource::effect(&desc.source))
            .map_err(|e| match e {
                RenderError::Shader(err) => RenderError::Shader(err.with_effect(&desc.name)),
                other => other,
            })?;

        if let Some(pos) = self.effects.iter().position(|e| e.name == desc.name) {
            let old = std::mem::replace(
                &mut self.effects[pos],
                Effect {
                    name: desc.name.clone(),
                    program,
                    slot: desc.uniforms,
                },
            );
            backend.destroy_program(old.program);
        } else {
            self.effects.push(Effect {
                name: desc.name.clone(),
                program,
                slot: desc.uniforms,
            });
        }
        Ok(())
    }

    pub fn remove_effect<B: GpuBackend + ?Sized>(&mut self, backend: &mut B, name: &str) -> bool {
        let Some(pos) = self.effects.iter().position(|e| e.name == name) else {
            return false;
        };
        let effect = self.effects.remove(pos);
        backend.destroy_program(effect.program);
        if self.effects.len() < 2
            && let Some(targets) = self.intermediates.take()
        {
            for t in targets {
                t.destroy(backend);
            }
        }
        true
    }

    pub fn effect_names(&self) -> impl Iterator<Item = &str> {
        self.effects.iter().map(|e| e.name.as_str())
    }

    /// Writes `values` into the slot declared by effect `name`.
    pub fn set_effect_uniforms(&mut self, name: &str, values: &[f32]) -> Result<(), UniformMappingError> {
        let slot = self
            .effects
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.slot)
            .ok_or_else(|| UniformMappingError::NoSlot(name.to_string()))?;

        if values.len() != slot.size {
            return Err(UniformMappingError::LengthMismatch {
                effect: name.to_string(),
                expected: slot.size,
                actual: values.len(),
            });
        }
        self.shared.write(slot.offset, values)
    }

    pub fn shared_uniforms_mut(&mut self) -> &mut SharedUniforms {
        &mut self.shared
    }

    /// Renders `source` (the main target's texture) to `surface`.
    pub fn run<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        source: TextureHandle,
        surface: TargetBinding,
        frame: u64,
    ) -> Result<(), RenderError> {
        let flip = backend.flips_render_targets();
        let programs: Vec<ProgramHandle> = if self.effects.is_empty() {
            self.blit.into_iter().collect()
        } else {
            self.effects.iter().map(|e| e.program).collect()
        };
        if programs.is_empty() {
            return Ok(());
        }

        let chain = if programs.len() > 1 {
            let [a, b] = self.ensure_intermediates(backend, surface.width, surface.height)?;
            Some([(a.binding(), a.texture()), (b.binding(), b.texture())])
        } else {
            None
        };

        let mut input = source;
        let last = programs.len() - 1;
        for (i, program) in programs.into_iter().enumerate() {
            let (binding, output) = match chain {
                Some(targets) if i != last => {
                    let (binding, texture) = targets[i % 2];
                    (binding, Some(texture))
                }
                _ => (surface, None),
            };

            backend.bind_target(binding);
            let full = Rect::new(0.0, 0.0, binding.width as f32, binding.height as f32);
            let uv = if flip { [0.0, 1.0, 1.0, 0.0] } else { [0.0, 0.0, 1.0, 1.0] };
            backend.upload_geometry(&quad_positions(full), &quad_uvs(uv));

            let header = [
                binding.width as f32,
                binding.height as f32,
                if flip { 1.0 } else { 0.0 },
                frame as f32,
            ];
            backend.write_uniforms(program, &self.shared.block(header));
            backend.draw(program, input, 0..6);

            if let Some(texture) = output {
                input = texture;
            }
        }
        Ok(())
    }

    /// Drops intermediates so they are recreated at the next surface size.
    pub fn release_intermediates<B: GpuBackend + ?Sized>(&mut self, backend: &mut B) {
        if let Some(targets) = self.intermediates.take() {
            for t in targets {
                t.destroy(backend);
            }
        }
    }

    /// Frees every program and target. Safe to call more than once.
    pub fn release<B: GpuBackend + ?Sized>(&mut self, backend: &mut B) {
        self.release_intermediates(backend);
        for effect in self.effects.drain(..) {
            backend.destroy_program(effect.program);
        }
        if let Some(blit) = self.blit.take() {
            backend.destroy_program(blit);
        }
    }

    fn ensure_intermediates<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> Result<&[RenderTarget; 2], RenderError> {
        let stale = match &self.intermediates {
            Some([a, _]) => a.width() != width || a.height() != height,
            None => true,
        };
        if stale {
            self.release_intermediates(backend);
            let a = RenderTarget::create(backend, width, height)?;
            let b = match RenderTarget::create(backend, width, height) {
                Ok(b) => b,
                Err(e) => {
                    a.destroy(backend);
                    return Err(e);
                }
            };
            log::debug!("present: allocated {width}x{height} effect intermediates");
            self.intermediates = Some([a, b]);
        }
        match &self.intermediates {
            Some(targets) => Ok(targets),
            None => Err(RenderError::InvalidTargetSize { width, height }),
        }
    }
}

/// Validates `source` and compiles it with replace blending.
fn compile<B: GpuBackend + ?Sized>(
    backend: &mut B,
    label: &str,
    source: &ShaderSource,
) -> Result<ProgramHandle, RenderError> {
    shader::validate(source)?;
    let program = backend.compile_program(&ProgramDesc {
        label: label.to_string(),
        source: source.wgsl.clone(),
        blend: BlendMode::Replace,
    })?;
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::RecordingBackend;
    use crate::backend::DrawTarget;

    const INVERT: &str = "fn effect(uv: vec2<f32>, color: vec4<f32>) -> vec4<f32> {\n    return vec4<f32>(color.a - color.rgb, color.a);\n}\n";
    const TINT: &str = "fn effect(uv: vec2<f32>, color: vec4<f32>) -> vec4<f32> {\n    return color * param(0u);\n}\n";

    fn setup() -> (RecordingBackend, PresentPass) {
        let mut gpu = RecordingBackend::new();
        let pass = PresentPass::new(&mut gpu).unwrap();
        (gpu, pass)
    }

    #[test]
    fn no_effects_blits_once_to_surface() {
        let (mut gpu, mut pass) = setup();
        gpu.clear_log();
        pass.run(&mut gpu, TextureHandle::new(99), TargetBinding::surface(320, 240), 0).unwrap();

        let draws = gpu.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].texture, TextureHandle::new(99));
        assert_eq!(draws[0].target, TargetBinding::surface(320, 240));
    }

    #[test]
    fn effect_chain_ping_pongs_and_ends_on_surface() {
        let (mut gpu, mut pass) = setup();
        pass.add_effect(&mut gpu, &EffectDesc::new("invert", INVERT)).unwrap();
        pass.add_effect(&mut gpu, &EffectDesc::new("tint", TINT).with_uniforms(0, 1)).unwrap();
        pass.add_effect(&mut gpu, &EffectDesc::new("invert2", INVERT)).unwrap();
        gpu.clear_log();

        pass.run(&mut gpu, TextureHandle::new(99), TargetBinding::surface(64, 64), 1).unwrap();

        let draws = gpu.draws();
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[0].texture, TextureHandle::new(99));
        assert!(matches!(draws[0].target.target, DrawTarget::Framebuffer(_)));
        assert!(matches!(draws[1].target.target, DrawTarget::Framebuffer(_)));
        assert_ne!(draws[0].target, draws[1].target);
        assert_eq!(draws[2].target.target, DrawTarget::Surface);
        // each pass samples what the previous one wrote
        assert_ne!(draws[1].texture, draws[0].texture);
        assert_ne!(draws[2].texture, draws[1].texture);
    }

    #[test]
    fn invalid_slot_is_rejected_before_compilation() {
        let (mut gpu, mut pass) = setup();
        let programs = gpu.live_programs();
        let err = pass
            .add_effect(&mut gpu, &EffectDesc::new("bad", TINT).with_uniforms(59, 4))
            .unwrap_err();
        assert!(matches!(err, RenderError::UniformMapping(UniformMappingError::OutOfBounds { .. })));
        assert_eq!(gpu.live_programs(), programs);
    }

    #[test]
    fn shader_error_carries_effect_name() {
        let (mut gpu, mut pass) = setup();
        let err = pass
            .add_effect(&mut gpu, &EffectDesc::new("broken", "fn effect() {"))
            .unwrap_err();
        let RenderError::Shader(err) = err else { panic!("expected shader error") };
        assert_eq!(err.effect.as_deref(), Some("broken"));
        assert_eq!(pass.effect_names().count(), 0);
    }

    #[test]
    fn effect_uniforms_must_match_slot() {
        let (mut gpu, mut pass) = setup();
        pass.add_effect(&mut gpu, &EffectDesc::new("tint", TINT).with_uniforms(4, 2)).unwrap();
        assert!(pass.set_effect_uniforms("tint", &[0.5, 0.25]).is_ok());
        assert_eq!(&pass.shared_uniforms_mut().values()[4..6], &[0.5, 0.25]);
        assert!(matches!(
            pass.set_effect_uniforms("tint", &[1.0]),
            Err(UniformMappingError::LengthMismatch { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            pass.set_effect_uniforms("missing", &[1.0]),
            Err(UniformMappingError::NoSlot(_))
        ));
    }

    #[test]
    fn flipped_backend_flips_present_uvs() {
        let mut gpu = RecordingBackend::new().with_flipped_targets();
        let mut pass = PresentPass::new(&mut gpu).unwrap();
        pass.run(&mut gpu, TextureHandle::new(5), TargetBinding::surface(8, 8), 0).unwrap();
        // first vertex is the top-left corner; it samples the bottom of the texture
        assert_eq!(&gpu.draws()[0].uvs[..2], &[0.0, 1.0]);
    }

    #[test]
    fn release_frees_everything_once() {
        let (mut gpu, mut pass) = setup();
        pass.add_effect(&mut gpu, &EffectDesc::new("a", INVERT)).unwrap();
        pass.add_effect(&mut gpu, &EffectDesc::new("b", INVERT)).unwrap();
        pass.run(&mut gpu, TextureHandle::new(5), TargetBinding::surface(8, 8), 0).unwrap();
        pass.release(&mut gpu);
        pass.release(&mut gpu);
        assert_eq!(gpu.live_programs(), 0);
        assert!(gpu.live_textures().is_empty());
        assert!(gpu.live_framebuffers().is_empty());
        assert_eq!(gpu.double_frees(), 0);
    }
}
