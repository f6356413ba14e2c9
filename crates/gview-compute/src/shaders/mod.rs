//! WGSL compute shaders.
//!
//! The grade kernel mirrors the CPU path stage for stage: contrast, gamma,
//! grayscale, LUT blend, clamping to [0, 1] after every stage. `lut_idx`
//! uses the same flat formula as the CPU sampler (red varies fastest).

/// Full grade: tone stages plus trilinear 3D LUT blend, one thread per pixel.
pub const GRADE: &str = r#"
struct Params {
    pixel_count: u32,
    lut_size: u32,
    grayscale: f32,
    use_lut: u32,
    contrast: f32,
    gamma: f32,
    strength: f32,
    _pad: u32,
};

@group(0) @binding(0) var<storage, read> src: array<f32>;
@group(0) @binding(1) var<storage, read_write> dst: array<f32>;
@group(0) @binding(2) var<uniform> params: Params;
@group(0) @binding(3) var<storage, read> lut: array<f32>;

fn lut_idx(ri: u32, gi: u32, bi: u32, ch: u32, s: u32) -> f32 {
    return lut[(ri + gi * s + bi * s * s) * 3u + ch];
}

fn sample_lut(v: vec3<f32>, s: u32) -> vec3<f32> {
    let scale = f32(s - 1u);
    let r = clamp(v.x, 0.0, 1.0) * scale;
    let g = clamp(v.y, 0.0, 1.0) * scale;
    let b = clamp(v.z, 0.0, 1.0) * scale;

    let r0 = min(u32(r), s - 2u);
    let g0 = min(u32(g), s - 2u);
    let b0 = min(u32(b), s - 2u);
    let r1 = r0 + 1u;
    let g1 = g0 + 1u;
    let b1 = b0 + 1u;

    let fr = r - f32(r0);
    let fg = g - f32(g0);
    let fb = b - f32(b0);

    var out = vec3<f32>(0.0);
    for (var ch = 0u; ch < 3u; ch = ch + 1u) {
        let c000 = lut_idx(r0, g0, b0, ch, s);
        let c100 = lut_idx(r1, g0, b0, ch, s);
        let c010 = lut_idx(r0, g1, b0, ch, s);
        let c110 = lut_idx(r1, g1, b0, ch, s);
        let c001 = lut_idx(r0, g0, b1, ch, s);
        let c101 = lut_idx(r1, g0, b1, ch, s);
        let c011 = lut_idx(r0, g1, b1, ch, s);
        let c111 = lut_idx(r1, g1, b1, ch, s);

        let c00 = c000 + fr * (c100 - c000);
        let c10 = c010 + fr * (c110 - c010);
        let c01 = c001 + fr * (c101 - c001);
        let c11 = c011 + fr * (c111 - c011);

        let c0 = c00 + fg * (c10 - c00);
        let c1 = c01 + fg * (c11 - c01);

        out[ch] = c0 + fb * (c1 - c0);
    }
    return out;
}

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let px = id.x;
    if px >= params.pixel_count { return; }

    let base = px * 3u;
    var v = vec3<f32>(src[base], src[base + 1u], src[base + 2u]);

    // Contrast around mid-gray
    v = clamp((v - vec3<f32>(0.5)) * params.contrast + vec3<f32>(0.5),
              vec3<f32>(0.0), vec3<f32>(1.0));

    // Gamma
    v = clamp(pow(v, vec3<f32>(params.gamma)), vec3<f32>(0.0), vec3<f32>(1.0));

    // Grayscale blend toward Rec.709 luma
    if params.grayscale > 0.0 {
        let luma = clamp(0.2126 * v.x + 0.7152 * v.y + 0.0722 * v.z, 0.0, 1.0);
        v = clamp(mix(v, vec3<f32>(luma), params.grayscale),
                  vec3<f32>(0.0), vec3<f32>(1.0));
    }

    // LUT blend
    if params.use_lut == 1u {
        let sampled = sample_lut(v, params.lut_size);
        v = clamp(mix(v, sampled, params.strength), vec3<f32>(0.0), vec3<f32>(1.0));
    }

    dst[base] = v.x;
    dst[base + 1u] = v.y;
    dst[base + 2u] = v.z;
}
"#;
