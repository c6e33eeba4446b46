use anyhow::{Context, Result};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use nabu_engine::backend::WgpuBackend;
use nabu_engine::core::{App, AppControl, FrameCtx};
use nabu_engine::device::GpuInit;
use nabu_engine::logging::{init_logging, LoggingConfig};
use nabu_engine::window::{Runtime, RuntimeConfig};
use nabu_engine::{BitmapFont, Color, EffectDesc, Rect, RenderError, Renderer, RendererConfig};

const SHEET_SIZE: u32 = 64;
const GLYPH_W: u32 = 6;
const GLYPH_H: u32 = 8;
const GLYPH_ROW: u32 = 32;

// 5x7 digits, one byte per row, low five bits used.
const DIGITS: [[u8; 7]; 10] = [
    [0x0e, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0e],
    [0x04, 0x0c, 0x04, 0x04, 0x04, 0x04, 0x0e],
    [0x0e, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1f],
    [0x1f, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0e],
    [0x02, 0x06, 0x0a, 0x12, 0x1f, 0x02, 0x02],
    [0x1f, 0x10, 0x1e, 0x01, 0x01, 0x11, 0x0e],
    [0x06, 0x08, 0x10, 0x1e, 0x11, 0x11, 0x0e],
    [0x1f, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
    [0x0e, 0x11, 0x11, 0x0e, 0x11, 0x11, 0x0e],
    [0x0e, 0x11, 0x11, 0x0f, 0x01, 0x02, 0x0c],
];

const VIGNETTE: &str = "\
fn effect(uv: vec2<f32>, color: vec4<f32>) -> vec4<f32> {
    let d = distance(uv, vec2<f32>(0.5, 0.5));
    let k = 1.0 - smoothstep(0.35, 0.85, d) * param(0u);
    return vec4<f32>(color.rgb * k, color.a);
}
";

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    Runtime::run(
        RuntimeConfig {
            title: "nabu demo".to_string(),
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        Demo::default(),
    )
}

#[derive(Default)]
struct Demo {
    renderer: Option<Renderer<WgpuBackend>>,
    font: Option<BitmapFont>,
    background_size: (u32, u32),
    invalidate: bool,
}

impl App for Demo {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        if let WindowEvent::KeyboardInput { event, .. } = event
            && event.state == ElementState::Pressed
        {
            match event.physical_key {
                PhysicalKey::Code(KeyCode::Escape) => return AppControl::Exit,
                PhysicalKey::Code(KeyCode::KeyC) => self.invalidate = true,
                _ => {}
            }
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.renderer.is_none() {
            match setup(ctx) {
                Ok(renderer) => self.renderer = Some(renderer),
                Err(e) => {
                    log::error!("renderer setup failed: {e:#}");
                    return AppControl::Exit;
                }
            }
        }
        let (Some(renderer), font) = (self.renderer.as_mut(), &mut self.font) else {
            return AppControl::Exit;
        };
        let font = font.get_or_insert_with(|| {
            BitmapFont::grid(
                (0.0, GLYPH_ROW as f32),
                (GLYPH_W as f32, GLYPH_H as f32),
                10,
                '0',
                10,
            )
        });

        let size = renderer.surface_size();
        if self.invalidate || self.background_size != size {
            if let Err(e) = renderer.clear_cache("background") {
                log::error!("failed to clear background cache: {e}");
                return AppControl::Exit;
            }
            self.background_size = size;
            self.invalidate = false;
        }

        let frame = renderer.frame_index();
        let strength = 0.6 + 0.3 * ((frame as f32) * 0.02).sin();
        if let Err(e) = renderer.set_effect_uniforms("vignette", &[strength]) {
            log::warn!("vignette uniforms rejected: {e}");
        }

        match ctx.present(renderer, |r| draw_scene(r, font, size, frame)) {
            Ok(control) => control,
            Err(e) => {
                log::error!("frame failed: {e}");
                AppControl::Exit
            }
        }
    }

    fn on_window_closed(&mut self, _window_id: WindowId) {
        if let Some(mut renderer) = self.renderer.take() {
            let stats = renderer.cache_stats();
            log::info!(
                "shutting down after {} frames, {} cache entries live",
                renderer.frame_index(),
                stats.item_count
            );
            renderer.shutdown();
        }
    }
}

fn setup(ctx: &FrameCtx<'_, '_>) -> Result<Renderer<WgpuBackend>> {
    let mut renderer = ctx
        .create_renderer(RendererConfig {
            clear_color: Color::from_srgb_u8(18, 20, 28, 255),
            ..RendererConfig::default()
        })
        .context("failed to create renderer")?;

    renderer.set_shader_error_handler(|err| log::error!("{err}"));

    let pixels = build_sheet();
    renderer
        .load_sprite_sheet(SHEET_SIZE, SHEET_SIZE, &pixels)
        .context("failed to upload sprite sheet")?;
    renderer.define_frame("tile", Rect::new(0.0, 0.0, 16.0, 16.0))?;
    renderer.define_frame("orb", Rect::new(16.0, 0.0, 16.0, 16.0))?;
    renderer.set_line_region(Rect::new(60.0, 60.0, 2.0, 2.0))?;

    let vignette = EffectDesc::new("vignette", VIGNETTE).with_uniforms(0, 1);
    let added = renderer
        .add_effect(&vignette)
        .context("failed to add vignette effect")?;
    if !added {
        log::warn!("running without the vignette effect");
    }

    Ok(renderer)
}

fn draw_scene(
    r: &mut Renderer<WgpuBackend>,
    font: &BitmapFont,
    (width, height): (u32, u32),
    frame: u64,
) -> Result<(), RenderError> {
    let captured = r.cache_group("background", width, height, |r| {
        for y in (0..height).step_by(32) {
            for x in (0..width).step_by(32) {
                r.draw_sprite_scaled("tile", x as f32, y as f32, 32.0, 32.0)?;
            }
        }
        Ok(())
    })?;
    if captured {
        log::debug!("background captured at {width}x{height}");
        r.draw_cached_content("background", 0.0, 0.0)?;
    }

    let t = frame as f32 * 0.03;
    let (cx, cy) = (width as f32 * 0.5, height as f32 * 0.5);

    r.start_group(cx, cy);
    for i in 0..12 {
        let a = t + i as f32 * std::f32::consts::TAU / 12.0;
        let (x, y) = (a.cos() * 160.0, a.sin() * 160.0);
        r.draw_line(0.0, 0.0, x, y, 2.0)?;
        r.draw_sprite("orb", x - 8.0, y - 8.0)?;
    }
    r.end_group()?;

    r.draw_text(font, &frame.to_string(), 12.0, 12.0)
}

/// Builds the demo atlas: a checker tile, an orb, digits and a white line region.
fn build_sheet() -> Vec<u8> {
    let mut px = vec![0u8; (SHEET_SIZE * SHEET_SIZE * 4) as usize];
    let mut put = |x: u32, y: u32, rgba: [u8; 4]| {
        let i = ((y * SHEET_SIZE + x) * 4) as usize;
        px[i..i + 4].copy_from_slice(&rgba);
    };

    for y in 0..16 {
        for x in 0..16 {
            let dark = ((x / 8) + (y / 8)) % 2 == 0;
            put(x, y, if dark { [34, 40, 56, 255] } else { [44, 52, 72, 255] });
        }
    }

    for y in 0..16 {
        for x in 0..16 {
            let (dx, dy) = (x as f32 - 7.5, y as f32 - 7.5);
            let d = (dx * dx + dy * dy).sqrt();
            if d < 7.5 {
                // premultiplied
                let a = ((7.5 - d).min(1.0) * 255.0) as u8;
                put(16 + x, y, [a, (a as u32 * 180 / 255) as u8, (a as u32 * 60 / 255) as u8, a]);
            }
        }
    }

    for (digit, rows) in DIGITS.iter().enumerate() {
        let ox = digit as u32 * GLYPH_W;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..5 {
                if bits & (0x10 >> col) != 0 {
                    put(ox + col, GLYPH_ROW + row as u32, [255, 255, 255, 255]);
                }
            }
        }
    }

    for y in 60..62 {
        for x in 60..62 {
            put(x, y, [255, 255, 255, 255]);
        }
    }

    px
}
