/// WGSL shader for instanced cubes.
///
/// The uniform block is `transform` (mat4) followed by `is_picking` (bool as
/// u32), matching the packing backends derive from the program's uniform list.
/// In picking mode each cube writes its encoded id instead of its color.
pub const CUBE_SHADER: &str = r#"
struct Uniforms {
    transform: mat4x4<f32>,
    is_picking: u32,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct CubeInput {
    @location(0) surface: vec3<f32>,
    @location(1) id: vec4<f32>,
    @location(2) color: vec4<f32>,
    @location(3) position: vec3<f32>,
    @location(4) rotation_0: vec4<f32>,
    @location(5) rotation_1: vec4<f32>,
    @location(6) rotation_2: vec4<f32>,
    @location(7) rotation_3: vec4<f32>,
    @location(8) size: f32,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(cube: CubeInput) -> VertexOutput {
    let rotation = mat4x4<f32>(
        cube.rotation_0,
        cube.rotation_1,
        cube.rotation_2,
        cube.rotation_3,
    );
    let local = rotation * vec4<f32>(cube.surface * cube.size, 1.0);
    let world_pos = vec4<f32>(local.xyz + cube.position, 1.0);

    var out: VertexOutput;
    out.clip_position = uniforms.transform * world_pos;
    if (uniforms.is_picking != 0u) {
        out.color = cube.id;
    } else {
        out.color = cube.color;
    }
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;
