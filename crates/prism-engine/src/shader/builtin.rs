//! Built-in stage sources.

/// Pass-through vertex stage: writes `position` unchanged.
pub const PASSTHROUGH_VERTEX: &str = r#"
@vertex
fn vs_main(@location(0) position: vec4<f32>) -> @builtin(position) vec4<f32> {
    return position;
}
"#;

/// Solid white fragment stage.
pub const SOLID_WHITE_FRAGMENT: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
"#;
