//! The renderer context.
//!
//! [`Renderer`] owns every piece of mutable state: the backend, both
//! geometry batches, the segment list, the offset stack, the cache registry,
//! the capture mode and the currently bound target. Draw entry points live in
//! `draw`, the capture/playback protocol in `cache`.
//!
//! Frame shape:
//! - `render` resets per-frame state, binds and clears the main target
//! - the frame callback appends quads; source changes open segments
//! - frame end replays segments into the main target (one draw each)
//! - the presentation pass renders the main target to the surface

mod cache;
mod draw;

use std::time::Instant;

use crate::backend::{
    BlendMode, GpuBackend, ProgramDesc, ProgramHandle, TargetBinding, TextureDesc, TextureFilter,
    UNIFORM_FLOATS,
};
use crate::batch::GeometryBatch;
use crate::cache::{CacheId, CacheRegistry};
use crate::config::RendererConfig;
use crate::coords::Rect;
use crate::error::{RenderError, ResourceKind};
use crate::present::{EffectDesc, PresentPass};
use crate::segment::{Segment, SegmentList};
use crate::shader::{self, ShaderError, ShaderSource, SPRITE_WGSL};
use crate::sprite::SpriteSheet;
use crate::target::RenderTarget;
use crate::transform::OffsetStack;

/// Capture in flight: draws go to the scratch batch and `binding`.
#[derive(Debug)]
struct ActiveCapture {
    id: CacheId,
    binding: TargetBinding,
}

type ShaderErrorHandler = Box<dyn FnMut(&ShaderError)>;

pub struct Renderer<B: GpuBackend> {
    backend: B,
    config: RendererConfig,

    sprite_program: ProgramHandle,
    sheet: SpriteSheet,
    /// `None` if a resize failed to allocate, or after shutdown.
    main_target: Option<RenderTarget>,
    surface_size: (u32, u32),

    main_batch: GeometryBatch,
    scratch_batch: GeometryBatch,
    segments: SegmentList,
    frame_segments: Vec<Segment>,
    offsets: OffsetStack,

    cache: CacheRegistry<RenderTarget>,
    capture: Option<ActiveCapture>,
    /// Evicted targets still sampled by pending main-batch segments.
    retired: Vec<RenderTarget>,
    bound: TargetBinding,

    present: PresentPass,
    shader_errors: Option<ShaderErrorHandler>,

    in_frame: bool,
    frame_index: u64,
    released: bool,
}

impl<B: GpuBackend> Renderer<B> {
    /// Compiles the sprite program, creates the default 1x1 white sheet,
    /// the presentation pass and a main target of the surface size.
    ///
    /// Every failure here is fatal; resources allocated before the failing
    /// step are released.
    pub fn new(
        mut backend: B,
        config: RendererConfig,
        surface_width: u32,
        surface_height: u32,
    ) -> Result<Self, RenderError> {
        let sprite_source = ShaderSource::program(SPRITE_WGSL);
        shader::validate(&sprite_source)?;
        let sprite_program = backend.compile_program(&ProgramDesc {
            label: "nabu sprite".to_string(),
            source: sprite_source.wgsl,
            blend: BlendMode::PremultipliedAlpha,
        })?;

        let Some(white) = backend.create_texture(
            &TextureDesc::sampled(1, 1, TextureFilter::Nearest),
            Some(&[255, 255, 255, 255]),
        ) else {
            backend.destroy_program(sprite_program);
            return Err(RenderError::ResourceCreation {
                kind: ResourceKind::Texture,
                width: 1,
                height: 1,
            });
        };

        let mut present = match PresentPass::new(&mut backend) {
            Ok(p) => p,
            Err(e) => {
                backend.destroy_texture(white);
                backend.destroy_program(sprite_program);
                return Err(e);
            }
        };

        let main_target = match RenderTarget::create(&mut backend, surface_width, surface_height) {
            Ok(t) => t,
            Err(e) => {
                present.release(&mut backend);
                backend.destroy_texture(white);
                backend.destroy_program(sprite_program);
                return Err(e);
            }
        };

        log::debug!(
            "renderer: created {surface_width}x{surface_height}, cache capacity {}",
            config.max_cache_entries
        );

        Ok(Self {
            cache: CacheRegistry::new(config.max_cache_entries),
            main_batch: GeometryBatch::with_quad_capacity(config.batch_capacity_quads),
            scratch_batch: GeometryBatch::with_quad_capacity(config.batch_capacity_quads),
            bound: main_target.binding(),
            backend,
            config,
            sprite_program,
            sheet: SpriteSheet::new(white, 1, 1),
            main_target: Some(main_target),
            surface_size: (surface_width, surface_height),
            segments: SegmentList::new(),
            frame_segments: Vec::new(),
            offsets: OffsetStack::new(),
            capture: None,
            retired: Vec::new(),
            present,
            shader_errors: None,
            in_frame: false,
            frame_index: 0,
            released: false,
        })
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Runs one frame.
    ///
    /// Resets batching, segmentation and the offset stack, binds and clears
    /// the main target, calls `frame`, flushes the main batch and presents.
    /// If `frame` fails, pending geometry is discarded, nothing is presented
    /// and the error propagates.
    pub fn render<F>(&mut self, frame: F) -> Result<(), RenderError>
    where
        F: FnOnce(&mut Self) -> Result<(), RenderError>,
    {
        if self.in_frame {
            return Err(RenderError::FrameInProgress);
        }
        let main = self.main_binding()?;

        self.main_batch.reset();
        self.scratch_batch.reset();
        self.segments.clear();
        self.frame_segments.clear();
        self.offsets.reset();
        self.in_frame = true;

        self.bind(main);
        self.backend.clear(self.config.clear_color.to_array());

        let result = frame(self);
        if self.offsets.depth() > 0 {
            log::warn!(
                "renderer: frame {} ended with {} unbalanced start_group call(s)",
                self.frame_index,
                self.offsets.depth()
            );
        }

        let result = result.and_then(|()| self.flush_main());
        if result.is_err() {
            self.main_batch.reset();
            self.segments.clear();
            self.destroy_retired();
        }
        self.in_frame = false;
        result?;

        let source = self.main_texture()?;
        let surface = TargetBinding::surface(self.surface_size.0, self.surface_size.1);
        self.present.run(&mut self.backend, source, surface, self.frame_index)?;
        self.bound = surface;

        self.frame_index += 1;
        Ok(())
    }

    /// Recreates the main target (and the effect intermediates) for a new
    /// surface size. Not allowed inside a frame.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.ensure_live()?;
        if self.in_frame {
            return Err(RenderError::FrameInProgress);
        }
        if self.surface_size == (width, height) && self.main_target.is_some() {
            return Ok(());
        }

        if let Some(old) = self.main_target.take() {
            old.destroy(&mut self.backend);
        }
        self.present.release_intermediates(&mut self.backend);
        self.surface_size = (width, height);

        let target = RenderTarget::create(&mut self.backend, width, height)?;
        self.bound = target.binding();
        self.main_target = Some(target);
        log::debug!("renderer: resized to {width}x{height}");
        Ok(())
    }

    /// Segments submitted in the current (or last completed) frame, in
    /// submission order.
    pub fn frame_segments(&self) -> &[Segment] {
        &self.frame_segments
    }

    /// Number of frames presented so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Whether the frame callback is running.
    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    // ── sprite sheet ──────────────────────────────────────────────────────

    /// Replaces the sprite sheet with `width x height` RGBA8 texels.
    ///
    /// Frames and the line region of the previous sheet are dropped.
    pub fn load_sprite_sheet(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<(), RenderError> {
        self.ensure_live()?;
        if self.in_frame {
            return Err(RenderError::FrameInProgress);
        }
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidTargetSize { width, height });
        }
        let desc = TextureDesc::sampled(width, height, TextureFilter::Nearest);
        if rgba.len() != desc.byte_len() {
            return Err(RenderError::InvalidTextureData {
                expected: desc.byte_len(),
                actual: rgba.len(),
            });
        }

        let texture = self
            .backend
            .create_texture(&desc, Some(rgba))
            .ok_or(RenderError::ResourceCreation {
                kind: ResourceKind::Texture,
                width,
                height,
            })?;
        let old = std::mem::replace(&mut self.sheet, SpriteSheet::new(texture, width, height));
        self.backend.destroy_texture(old.texture());
        log::debug!("renderer: loaded {width}x{height} sprite sheet");
        Ok(())
    }

    /// Names a texel region of the current sheet. Regions reaching past the
    /// sheet are rejected.
    pub fn define_frame(&mut self, name: impl Into<String>, region: Rect) -> Result<(), RenderError> {
        self.sheet.define_frame(name, region)
    }

    /// Sets the solid texel region sampled by lines.
    pub fn set_line_region(&mut self, region: Rect) -> Result<(), RenderError> {
        self.sheet.set_line_region(region)
    }

    pub fn sheet(&self) -> &SpriteSheet {
        &self.sheet
    }

    // ── effects ───────────────────────────────────────────────────────────

    /// Receives every shader error reported by `add_effect`.
    pub fn set_shader_error_handler(&mut self, handler: impl FnMut(&ShaderError) + 'static) {
        self.shader_errors = Some(Box::new(handler));
    }

    /// Registers (or replaces) a post-process effect.
    ///
    /// Returns `Ok(false)` when the effect's shader failed and
    /// `skip_failed_effects` is set; the error has then been reported to the
    /// shader error handler and logged. Uniform mapping errors always
    /// propagate.
    pub fn add_effect(&mut self, desc: &EffectDesc) -> Result<bool, RenderError> {
        self.ensure_live()?;
        match self.present.add_effect(&mut self.backend, desc) {
            Ok(()) => {
                log::debug!("renderer: effect `{}` registered", desc.name);
                Ok(true)
            }
            Err(RenderError::Shader(err)) => {
                if let Some(handler) = self.shader_errors.as_mut() {
                    handler(&err);
                }
                if self.config.skip_failed_effects {
                    log::warn!("renderer: skipping effect `{}`: {err}", desc.name);
                    Ok(false)
                } else {
                    Err(RenderError::Shader(err))
                }
            }
            Err(e) => Err(e),
        }
    }

    pub fn remove_effect(&mut self, name: &str) -> bool {
        self.present.remove_effect(&mut self.backend, name)
    }

    /// Registered effects in chain order.
    pub fn effect_names(&self) -> Vec<String> {
        self.present.effect_names().map(str::to_string).collect()
    }

    pub fn set_effect_uniforms(&mut self, name: &str, values: &[f32]) -> Result<(), RenderError> {
        Ok(self.present.set_effect_uniforms(name, values)?)
    }

    /// Writes directly into the shared effect uniform buffer.
    pub fn set_shared_uniforms(&mut self, offset: usize, values: &[f32]) -> Result<(), RenderError> {
        Ok(self.present.shared_uniforms_mut().write(offset, values)?)
    }

    // ── teardown ──────────────────────────────────────────────────────────

    /// Releases every GPU resource. Also performed on drop; calling it more
    /// than once is harmless. The renderer rejects further work afterwards.
    pub fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let entries = self.cache.drain();
        let count = entries.len();
        for (_, target) in entries {
            target.destroy(&mut self.backend);
        }
        self.destroy_retired();
        if let Some(target) = self.main_target.take() {
            target.destroy(&mut self.backend);
        }
        self.present.release(&mut self.backend);
        self.backend.destroy_texture(self.sheet.texture());
        self.backend.destroy_program(self.sprite_program);
        log::debug!("renderer: released ({count} cache entries)");
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn ensure_live(&self) -> Result<(), RenderError> {
        if self.released {
            Err(RenderError::ShutDown)
        } else {
            Ok(())
        }
    }

    fn main_binding(&self) -> Result<TargetBinding, RenderError> {
        self.ensure_live()?;
        self.main_target
            .as_ref()
            .map(RenderTarget::binding)
            .ok_or(RenderError::ResourceCreation {
                kind: ResourceKind::Texture,
                width: self.surface_size.0,
                height: self.surface_size.1,
            })
    }

    fn main_texture(&self) -> Result<crate::backend::TextureHandle, RenderError> {
        self.main_target
            .as_ref()
            .map(RenderTarget::texture)
            .ok_or(RenderError::ResourceCreation {
                kind: ResourceKind::Texture,
                width: self.surface_size.0,
                height: self.surface_size.1,
            })
    }

    fn bind(&mut self, binding: TargetBinding) {
        self.bound = binding;
        self.backend.bind_target(binding);
    }

    fn sprite_uniforms(&self, binding: TargetBinding) -> [f32; UNIFORM_FLOATS] {
        let mut block = [0.0; UNIFORM_FLOATS];
        block[0] = binding.width as f32;
        block[1] = binding.height as f32;
        block[2] = if self.backend.flips_render_targets() { 1.0 } else { 0.0 };
        block[3] = self.frame_index as f32;
        block
    }

    /// Replays the pending main-batch segments into the main target, one
    /// draw call per segment, then destroys retired cache targets.
    fn flush_main(&mut self) -> Result<(), RenderError> {
        let segments = self.segments.take(self.main_batch.vertex_count());

        if !self.main_batch.is_empty() {
            let main = self.main_binding()?;
            let started = self.config.measure_performance.then(Instant::now);
            let previous = self.bound;
            if previous != main {
                self.bind(main);
            }

            self.backend
                .upload_geometry(self.main_batch.positions(), self.main_batch.uvs());
            let uniforms = self.sprite_uniforms(main);
            self.backend.write_uniforms(self.sprite_program, &uniforms);

            let mut draws = 0;
            for segment in segments.iter().filter(|s| s.vertex_count() > 0) {
                self.backend
                    .draw(self.sprite_program, segment.texture, segment.vertices());
                draws += 1;
            }
            log::trace!(
                "renderer: main flush, {} vertices in {draws} draw call(s)",
                self.main_batch.vertex_count()
            );

            if previous != main {
                self.bind(previous);
            }
            if let Some(started) = started {
                self.backend.finish();
                log::trace!("renderer: main flush took {:?}", started.elapsed());
            }
        }

        self.frame_segments.extend(segments);
        self.main_batch.reset();
        self.destroy_retired();
        Ok(())
    }

    /// Draws the scratch batch into the capture target in one call.
    fn flush_scratch(&mut self) -> Result<(), RenderError> {
        let Some(binding) = self.capture.as_ref().map(|c| c.binding) else {
            self.scratch_batch.reset();
            return Ok(());
        };
        if self.scratch_batch.is_empty() {
            return Ok(());
        }

        let started = self.config.measure_performance.then(Instant::now);
        self.backend
            .upload_geometry(self.scratch_batch.positions(), self.scratch_batch.uvs());
        let uniforms = self.sprite_uniforms(binding);
        self.backend.write_uniforms(self.sprite_program, &uniforms);
        self.backend.draw(
            self.sprite_program,
            self.sheet.texture(),
            0..self.scratch_batch.vertex_count(),
        );
        log::trace!(
            "renderer: scratch flush, {} vertices",
            self.scratch_batch.vertex_count()
        );
        self.scratch_batch.reset();

        if let Some(started) = started {
            self.backend.finish();
            log::trace!("renderer: scratch flush took {:?}", started.elapsed());
        }
        Ok(())
    }

    fn destroy_retired(&mut self) {
        for target in self.retired.drain(..) {
            target.destroy(&mut self.backend);
        }
    }
}

impl<B: GpuBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backend::recording::{Call, RecordingBackend};
    use crate::backend::DrawTarget;
    use crate::coords::Color;
    use crate::present::UniformMappingError;
    use std::cell::RefCell;
    use std::rc::Rc;

    pub(crate) const W: u32 = 320;
    pub(crate) const H: u32 = 240;

    pub(crate) fn renderer_with(config: RendererConfig) -> Renderer<RecordingBackend> {
        Renderer::new(RecordingBackend::new(), config, W, H).unwrap()
    }

    pub(crate) fn renderer() -> Renderer<RecordingBackend> {
        renderer_with(RendererConfig::default())
    }

    /// 4x4 sheet with a 2x2 "dot" frame.
    pub(crate) fn with_sheet(r: &mut Renderer<RecordingBackend>) {
        r.load_sprite_sheet(4, 4, &[255; 64]).unwrap();
        r.define_frame("dot", Rect::new(0.0, 0.0, 2.0, 2.0)).unwrap();
    }

    pub(crate) fn main_draws(r: &Renderer<RecordingBackend>) -> Vec<crate::backend::recording::RecordedDraw> {
        let main = r.main_target.as_ref().unwrap().framebuffer();
        r.backend().draws_into(DrawTarget::Framebuffer(main)).cloned().collect()
    }

    const INVERT: &str = "fn effect(uv: vec2<f32>, color: vec4<f32>) -> vec4<f32> {\n    return vec4<f32>(color.a - color.rgb, color.a);\n}\n";

    // ── frame ─────────────────────────────────────────────────────────────

    #[test]
    fn empty_frame_clears_and_presents() {
        let mut r = renderer_with(RendererConfig {
            clear_color: Color::from_premul(0.1, 0.2, 0.3, 1.0),
            ..Default::default()
        });
        r.backend_mut().clear_log();
        r.render(|_| Ok(())).unwrap();

        assert!(r.backend().calls().contains(&Call::Clear([0.1, 0.2, 0.3, 1.0])));
        let draws = r.backend().draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].target, TargetBinding::surface(W, H));
        assert_eq!(r.frame_index(), 1);
    }

    #[test]
    fn draws_outside_render_fail() {
        let mut r = renderer();
        with_sheet(&mut r);
        assert!(matches!(r.draw_sprite("dot", 0.0, 0.0), Err(RenderError::OutsideFrame)));
        assert!(matches!(
            r.cache_group("a", 8, 8, |_| Ok(())),
            Err(RenderError::OutsideFrame)
        ));
    }

    #[test]
    fn nested_render_is_rejected() {
        let mut r = renderer();
        let err = r.render(|r| r.render(|_| Ok(()))).unwrap_err();
        assert!(matches!(err, RenderError::FrameInProgress));
        assert!(!r.in_frame());
    }

    #[test]
    fn failed_frame_is_not_presented() {
        let mut r = renderer();
        with_sheet(&mut r);
        r.backend_mut().clear_log();

        let err = r
            .render(|r| {
                r.draw_sprite("dot", 0.0, 0.0)?;
                r.draw_sprite("missing", 0.0, 0.0)
            })
            .unwrap_err();
        assert!(matches!(err, RenderError::UnknownFrame(name) if name == "missing"));
        assert!(r.backend().draws().is_empty());
        assert_eq!(r.frame_index(), 0);

        // the next frame starts clean
        r.render(|r| r.draw_sprite("dot", 1.0, 1.0)).unwrap();
        assert_eq!(main_draws(&r).len(), 1);
        assert_eq!(main_draws(&r)[0].vertices, 0..6);
    }

    #[test]
    fn offset_stack_is_reset_each_frame() {
        let mut r = renderer();
        with_sheet(&mut r);
        r.render(|r| {
            r.start_group(100.0, 100.0);
            Ok(())
        })
        .unwrap();
        r.backend_mut().clear_log();
        r.render(|r| r.draw_sprite("dot", 0.0, 0.0)).unwrap();
        assert_eq!(&main_draws(&r)[0].positions[..2], &[0.0, 0.0]);
    }

    #[test]
    fn resize_recreates_main_target() {
        let mut r = renderer();
        let old = r.main_target.as_ref().unwrap().texture();
        r.resize(640, 480).unwrap();
        let new = r.main_target.as_ref().unwrap();
        assert_ne!(new.texture(), old);
        assert_eq!((new.width(), new.height()), (640, 480));
        assert!(!r.backend().live_textures().contains(&old));

        r.backend_mut().clear_log();
        r.render(|_| Ok(())).unwrap();
        assert_eq!(r.backend().draws()[0].target, TargetBinding::surface(640, 480));
    }

    #[test]
    fn resize_inside_frame_fails() {
        let mut r = renderer();
        let err = r.render(|r| r.resize(10, 10)).unwrap_err();
        assert!(matches!(err, RenderError::FrameInProgress));
    }

    #[test]
    fn measured_flush_waits_for_gpu() {
        let mut r = renderer_with(RendererConfig {
            measure_performance: true,
            ..Default::default()
        });
        with_sheet(&mut r);
        r.render(|r| r.draw_sprite("dot", 0.0, 0.0)).unwrap();
        assert!(r.backend().calls().contains(&Call::Finish));
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn sprite_program_failure_is_fatal() {
        let mut gpu = RecordingBackend::new();
        gpu.fail_program("nabu sprite");
        let err = Renderer::new(gpu, RendererConfig::default(), W, H).err().unwrap();
        assert!(matches!(err, RenderError::Shader(_)));
    }

    #[test]
    fn incomplete_main_target_is_fatal() {
        let mut gpu = RecordingBackend::new();
        gpu.fail_framebuffer_completeness(true);
        let err = Renderer::new(gpu, RendererConfig::default(), W, H).err().unwrap();
        assert!(matches!(err, RenderError::FramebufferIncomplete { .. }));
    }

    #[test]
    fn zero_surface_is_rejected() {
        let err = Renderer::new(RecordingBackend::new(), RendererConfig::default(), 0, H)
            .err()
            .unwrap();
        assert!(matches!(err, RenderError::InvalidTargetSize { .. }));
    }

    // ── sprite sheet ──────────────────────────────────────────────────────

    #[test]
    fn sheet_data_length_is_validated() {
        let mut r = renderer();
        let err = r.load_sprite_sheet(2, 2, &[0; 15]).unwrap_err();
        assert!(matches!(err, RenderError::InvalidTextureData { expected: 16, actual: 15 }));
    }

    #[test]
    fn loading_sheet_replaces_old_texture() {
        let mut r = renderer();
        let old = r.sheet().texture();
        with_sheet(&mut r);
        assert_ne!(r.sheet().texture(), old);
        assert!(!r.backend().live_textures().contains(&old));
        assert_eq!(r.sheet().size(), (4, 4));
    }

    #[test]
    fn frame_past_sheet_edge_is_never_drawable() {
        let mut r = renderer();
        with_sheet(&mut r);
        let err = r.define_frame("big", Rect::new(2.0, 2.0, 4.0, 4.0)).unwrap_err();
        assert!(matches!(err, RenderError::RegionOutOfBounds { width: 4, height: 4, .. }));

        let err = r.render(|r| r.draw_sprite("big", 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, RenderError::UnknownFrame(ref name) if name == "big"));
    }

    // ── effects ───────────────────────────────────────────────────────────

    #[test]
    fn failed_effect_is_reported_and_skipped() {
        let mut r = renderer();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        r.set_shader_error_handler(move |e| sink.borrow_mut().push(e.effect.clone()));

        let added = r.add_effect(&EffectDesc::new("broken", "fn effect(")).unwrap();
        assert!(!added);
        assert_eq!(*seen.borrow(), vec![Some("broken".to_string())]);
        assert!(r.effect_names().is_empty());

        // presentation still works with the blit
        r.backend_mut().clear_log();
        r.render(|_| Ok(())).unwrap();
        assert_eq!(r.backend().draws().len(), 1);
    }

    #[test]
    fn failed_effect_propagates_when_not_skipping() {
        let mut r = renderer_with(RendererConfig {
            skip_failed_effects: false,
            ..Default::default()
        });
        let err = r.add_effect(&EffectDesc::new("broken", "fn effect(")).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn invalid_uniform_slot_always_propagates() {
        let mut r = renderer();
        let programs = r.backend().live_programs();
        let err = r
            .add_effect(&EffectDesc::new("wide", INVERT).with_uniforms(0, 0))
            .unwrap_err();
        assert!(matches!(err, RenderError::UniformMapping(UniformMappingError::Empty { .. })));
        assert_eq!(r.backend().live_programs(), programs);
    }

    #[test]
    fn effects_run_in_chain_order() {
        let mut r = renderer();
        assert!(r.add_effect(&EffectDesc::new("a", INVERT)).unwrap());
        assert!(r.add_effect(&EffectDesc::new("b", INVERT)).unwrap());
        assert_eq!(r.effect_names(), vec!["a".to_string(), "b".to_string()]);

        r.backend_mut().clear_log();
        r.render(|_| Ok(())).unwrap();
        let draws = r.backend().draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].texture, r.main_target.as_ref().unwrap().texture());
        assert_eq!(draws[1].target, TargetBinding::surface(W, H));

        assert!(r.remove_effect("a"));
        assert!(!r.remove_effect("a"));
        assert_eq!(r.effect_names(), vec!["b".to_string()]);
    }

    #[test]
    fn shared_uniforms_are_bounds_checked() {
        let mut r = renderer();
        assert!(r.set_shared_uniforms(58, &[1.0, 2.0]).is_ok());
        assert!(matches!(
            r.set_shared_uniforms(59, &[1.0, 2.0]),
            Err(RenderError::UniformMapping(UniformMappingError::WriteOutOfBounds { .. }))
        ));
    }

    // ── teardown ──────────────────────────────────────────────────────────

    #[test]
    fn shutdown_releases_everything_exactly_once() {
        let mut r = renderer();
        with_sheet(&mut r);
        r.add_effect(&EffectDesc::new("a", INVERT)).unwrap();
        r.add_effect(&EffectDesc::new("b", INVERT)).unwrap();
        r.render(|r| {
            r.cache_group("x", 16, 16, |r| r.draw_sprite("dot", 0.0, 0.0))?;
            r.cache_group("y", 8, 8, |r| r.draw_line(0.0, 0.0, 8.0, 8.0, 1.0))?;
            Ok(())
        })
        .unwrap();

        r.shutdown();
        r.shutdown();
        let gpu = r.backend();
        assert!(gpu.live_textures().is_empty());
        assert!(gpu.live_framebuffers().is_empty());
        assert_eq!(gpu.live_programs(), 0);
        assert_eq!(gpu.double_frees(), 0);

        assert!(matches!(r.render(|_| Ok(())), Err(RenderError::ShutDown)));
        assert!(matches!(
            r.add_effect(&EffectDesc::new("c", INVERT)),
            Err(RenderError::ShutDown)
        ));
    }
}
