//! WGSL sources and front-end validation.
//!
//! Every program is validated with naga before a backend sees it, so an
//! invalid shader never produces a GPU object. Parse and validation failures
//! are reported as compile errors; a missing or mis-staged `vs_main` /
//! `fs_main` entry point is reported as a link error.

use naga::valid::{Capabilities, ValidationFlags, Validator};

/// Sprite / cache playback program.
pub const SPRITE_WGSL: &str = include_str!("sprite.wgsl");

/// Vertex stage and bindings wrapped around every effect source.
pub const EFFECT_PRELUDE_WGSL: &str = include_str!("effect_prelude.wgsl");

/// Effect body used by the blit (no effects configured).
pub const PASSTHROUGH_EFFECT_WGSL: &str =
    "fn effect(uv: vec2<f32>, color: vec4<f32>) -> vec4<f32> {\n    return color;\n}\n";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderErrorKind {
    Compile,
    Link,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// A shader that failed to compile or link.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderError {
    pub kind: ShaderErrorKind,
    pub stage: ShaderStage,
    /// Effect name, `None` for core programs.
    pub effect: Option<String>,
    /// Best-effort 1-based line in the author's source.
    pub line: Option<u32>,
    pub message: String,
}

impl std::fmt::Display for ShaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            ShaderErrorKind::Compile => "compile",
            ShaderErrorKind::Link => "link",
        };
        let stage = match self.stage {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        };
        write!(f, "shader {kind} error ({stage} stage")?;
        if let Some(effect) = &self.effect {
            write!(f, ", effect `{effect}`")?;
        }
        if let Some(line) = self.line {
            write!(f, ", line {line}")?;
        }
        write!(f, "): {}", self.message)
    }
}

impl std::error::Error for ShaderError {}

impl ShaderError {
    pub(crate) fn with_effect(mut self, name: &str) -> Self {
        self.effect = Some(name.to_string());
        self
    }
}

/// WGSL source plus the number of generated lines preceding the author's code.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub wgsl: String,
    pub line_offset: u32,
}

impl ShaderSource {
    /// A complete program written by hand.
    pub fn program(wgsl: &str) -> Self {
        Self {
            wgsl: wgsl.to_string(),
            line_offset: 0,
        }
    }

    /// Wraps an effect body (`fn effect(uv, color) -> vec4<f32>`) in the
    /// shared prelude.
    pub fn effect(body: &str) -> Self {
        let mut wgsl = String::with_capacity(EFFECT_PRELUDE_WGSL.len() + body.len() + 1);
        wgsl.push_str(EFFECT_PRELUDE_WGSL);
        if !wgsl.ends_with('\n') {
            wgsl.push('\n');
        }
        let line_offset = wgsl.lines().count() as u32;
        wgsl.push_str(body);
        Self { wgsl, line_offset }
    }
}

/// Parses and validates `source`, then checks its entry points.
pub fn validate(source: &ShaderSource) -> Result<(), ShaderError> {
    let wgsl = source.wgsl.as_str();

    let module = naga::front::wgsl::parse_str(wgsl).map_err(|e| {
        let line = e.location(wgsl).map(|l| l.line_number);
        compile_error(source, line, e.to_string())
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| {
            let line = e.location(wgsl).map(|l| l.line_number);
            compile_error(source, line, e.as_inner().to_string())
        })?;

    for (name, stage, naga_stage) in [
        ("vs_main", ShaderStage::Vertex, naga::ShaderStage::Vertex),
        ("fs_main", ShaderStage::Fragment, naga::ShaderStage::Fragment),
    ] {
        let found = module.entry_points.iter().find(|ep| ep.name == name);
        match found {
            Some(ep) if ep.stage == naga_stage => {}
            Some(_) => return Err(link_error(stage, format!("`{name}` has the wrong stage"))),
            None => return Err(link_error(stage, format!("missing entry point `{name}`"))),
        }
    }

    Ok(())
}

fn compile_error(source: &ShaderSource, line: Option<u32>, message: String) -> ShaderError {
    let stage = line
        .map(|l| stage_at_line(&source.wgsl, l))
        .unwrap_or(if source.line_offset > 0 { ShaderStage::Fragment } else { ShaderStage::Vertex });

    ShaderError {
        kind: ShaderErrorKind::Compile,
        stage,
        effect: None,
        line: line.and_then(|l| l.checked_sub(source.line_offset)).filter(|l| *l > 0),
        message,
    }
}

fn link_error(stage: ShaderStage, message: String) -> ShaderError {
    ShaderError {
        kind: ShaderErrorKind::Link,
        stage,
        effect: None,
        line: None,
        message,
    }
}

/// Everything after the first `@fragment` attribute belongs to the fragment stage.
fn stage_at_line(wgsl: &str, line: u32) -> ShaderStage {
    let fragment_line = wgsl
        .lines()
        .position(|l| l.trim_start().starts_with("@fragment"))
        .map(|i| i as u32 + 1);

    match fragment_line {
        Some(f) if line >= f => ShaderStage::Fragment,
        _ => ShaderStage::Vertex,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_programs_validate() {
        validate(&ShaderSource::program(SPRITE_WGSL)).unwrap();
        validate(&ShaderSource::effect(PASSTHROUGH_EFFECT_WGSL)).unwrap();
    }

    #[test]
    fn effect_error_line_is_relative_to_effect_body() {
        let body = "fn effect(uv: vec2<f32>, color: vec4<f32>) -> vec4<f32> {\n    return colr;\n}\n";
        let err = validate(&ShaderSource::effect(body)).unwrap_err();
        assert_eq!(err.kind, ShaderErrorKind::Compile);
        assert_eq!(err.stage, ShaderStage::Fragment);
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn missing_entry_point_is_link_error() {
        let src = SPRITE_WGSL.replace("fn fs_main", "fn fs_other");
        let err = validate(&ShaderSource::program(&src)).unwrap_err();
        assert_eq!(err.kind, ShaderErrorKind::Link);
        assert_eq!(err.stage, ShaderStage::Fragment);
    }

    #[test]
    fn effect_without_effect_fn_fails_to_compile() {
        let err = validate(&ShaderSource::effect("fn unrelated() {}\n")).unwrap_err();
        assert_eq!(err.kind, ShaderErrorKind::Compile);
    }

    #[test]
    fn display_includes_effect_and_line() {
        let err = ShaderError {
            kind: ShaderErrorKind::Compile,
            stage: ShaderStage::Fragment,
            effect: None,
            line: Some(7),
            message: "unknown identifier".into(),
        }
        .with_effect("bloom");
        assert_eq!(
            err.to_string(),
            "shader compile error (fragment stage, effect `bloom`, line 7): unknown identifier"
        );
    }
}
