/// YUV → RGB 矩阵系数：[Rv, Gu, Gv, Bu]
pub type ColorMatrix = [f32; 4];

pub const BT601: ColorMatrix = [1.402, 0.3441, 0.7141, 1.772];
pub const BT709: ColorMatrix = [1.5748, 0.1873, 0.4681, 1.8556];

/// 流没有标注色彩空间时的惯例：720 行及以上按 BT.709，标清按 BT.601
pub fn color_matrix_for_height(height: u32) -> ColorMatrix {
    if height >= 720 {
        BT709
    } else {
        BT601
    }
}

/// 平面 YUV 4:2:0 → RGB 的 Shader
///
/// 三个平面各自是一张 R8 纹理，色度纹理为亮度的一半尺寸，
/// 由采样器双线性放大。输入按有限范围（16-235/16-240）处理，
/// 矩阵系数来自 uniform。
pub const YUV_TO_RGB_SHADER: &str = r#"
// Vertex shader
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) tex_coords: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) tex_coords: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(in.position, 0.0, 1.0);
    out.tex_coords = in.tex_coords;
    return out;
}

// Fragment shader
@group(0) @binding(0) var y_texture: texture_2d<f32>;
@group(0) @binding(1) var u_texture: texture_2d<f32>;
@group(0) @binding(2) var v_texture: texture_2d<f32>;
@group(0) @binding(3) var texture_sampler: sampler;

struct ColorMatrix {
    // x: Rv, y: Gu, z: Gv, w: Bu
    coeffs: vec4<f32>,
}
@group(0) @binding(4) var<uniform> color: ColorMatrix;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let y = (textureSample(y_texture, texture_sampler, in.tex_coords).r - 0.0627) * 1.1644;
    let u = (textureSample(u_texture, texture_sampler, in.tex_coords).r - 0.5) * 1.1384;
    let v = (textureSample(v_texture, texture_sampler, in.tex_coords).r - 0.5) * 1.1384;

    let r = y + color.coeffs.x * v;
    let g = y - color.coeffs.y * u - color.coeffs.z * v;
    let b = y + color.coeffs.w * u;

    return vec4<f32>(clamp(vec3<f32>(r, g, b), vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
}
"#;

/// RGBA 直接渲染的 Shader（图片查看）
pub const RGBA_SHADER: &str = r#"
// Vertex shader
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) tex_coords: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) tex_coords: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(in.position, 0.0, 1.0);
    out.tex_coords = in.tex_coords;
    return out;
}

// Fragment shader
@group(0) @binding(0) var rgba_texture: texture_2d<f32>;
@group(0) @binding(1) var texture_sampler: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(rgba_texture, texture_sampler, in.tex_coords);
    return vec4<f32>(color.rgb, 1.0);
}
"#;
