//! YUV to RGB conversion program for GLES2 and its CPU counterpart.

/// BT.601 full-range coefficients.
pub const R_FROM_V: f32 = 1.402;
pub const G_FROM_U: f32 = 0.344;
pub const G_FROM_V: f32 = 0.714;
pub const B_FROM_U: f32 = 1.772;

pub const VERTEX_SHADER: &str = r#"
attribute vec2 aPosition;
attribute vec2 aTexCoord;
varying vec2 vTexCoord;
void main() {
    gl_Position = vec4(aPosition, 0.0, 1.0);
    vTexCoord = aTexCoord;
}
"#;

pub fn fragment_shader() -> String {
    format!(
        r#"
precision mediump float;
varying vec2 vTexCoord;
uniform sampler2D texY;
uniform sampler2D texU;
uniform sampler2D texV;
void main() {{
    float y = texture2D(texY, vTexCoord).r;
    float u = texture2D(texU, vTexCoord).r - 0.5;
    float v = texture2D(texV, vTexCoord).r - 0.5;
    float r = y + {R_FROM_V:?} * v;
    float g = y - {G_FROM_U:?} * u - {G_FROM_V:?} * v;
    float b = y + {B_FROM_U:?} * u;
    gl_FragColor = vec4(r, g, b, 1.0);
}}
"#
    )
}

pub const POSITION_ATTRIB: &str = "aPosition";
pub const TEX_COORD_ATTRIB: &str = "aTexCoord";
pub const SAMPLERS: [&str; 3] = ["texY", "texU", "texV"];

/// Full-screen triangle strip, `x, y, u, v` per vertex. Texture rows run top
/// down, so `v` is flipped against clip-space `y`.
#[rustfmt::skip]
pub const QUAD: [f32; 16] = [
    -1.0, -1.0, 0.0, 1.0,
     1.0, -1.0, 1.0, 1.0,
    -1.0,  1.0, 0.0, 0.0,
     1.0,  1.0, 1.0, 0.0,
];
pub const QUAD_VERTICES: i32 = 4;
pub const QUAD_STRIDE: i32 = 4 * std::mem::size_of::<f32>() as i32;

/// What the fragment stage computes for normalized samples, including the
/// `[0, 1]` clamp applied on write.
pub fn yuv_to_rgb(y: f32, u: f32, v: f32) -> [f32; 3] {
    let u = u - 0.5;
    let v = v - 0.5;
    [
        y + R_FROM_V * v,
        y - G_FROM_U * u - G_FROM_V * v,
        y + B_FROM_U * u,
    ]
    .map(|c| c.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-3)
    }

    #[test]
    fn neutral_chroma_yields_grey() {
        for k in [0u8, 16, 128, 235, 255] {
            let y = k as f32 / 255.0;
            assert!(close(yuv_to_rgb(y, 0.5, 0.5), [y, y, y]), "k={k}");
        }
    }

    #[test]
    fn saturated_chroma_is_clamped() {
        let [r, g, b] = yuv_to_rgb(1.0, 1.0, 1.0);
        assert_eq!(r, 1.0);
        assert!(g < 1.0);
        assert_eq!(b, 1.0);

        assert_eq!(yuv_to_rgb(0.0, 0.0, 0.0)[0], 0.0);
    }

    #[test]
    fn fragment_source_uses_the_same_coefficients() {
        let src = fragment_shader();
        for needle in ["1.402 * v", "0.344 * u", "0.714 * v", "1.772 * u"] {
            assert!(src.contains(needle), "missing {needle}");
        }
        for sampler in SAMPLERS {
            assert!(src.contains(&format!("uniform sampler2D {sampler};")));
        }
    }

    #[test]
    fn quad_covers_clip_space() {
        let corners: Vec<(f32, f32)> = QUAD.chunks(4).map(|v| (v[0], v[1])).collect();
        assert_eq!(corners.len(), QUAD_VERTICES as usize);
        for corner in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
            assert!(corners.contains(&corner));
        }
    }
}
