//! A padded, semi-planar camera frame travelling relay -> repack -> colour.

use campreview::frame::{OwnedFrame, Plane, YuvFrame};
use campreview::relay::FrameRelay;
use campreview::shader::yuv_to_rgb;
use campreview::upload::pack_plane;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const ROW_STRIDE: usize = 672;

/// Luma with padded rows; U and V share one interleaved buffer the way
/// many camera HALs lay out YUV_420_888.
fn camera_frame(luma: u8, u: u8, v: u8) -> OwnedFrame {
    let y = vec![luma; ROW_STRIDE * (HEIGHT as usize - 1) + WIDTH as usize];

    let chroma_rows = HEIGHT as usize / 2;
    let chroma_span = (WIDTH as usize / 2 - 1) * 2 + 1;
    let mut interleaved = vec![0xEE; ROW_STRIDE * (chroma_rows - 1) + chroma_span + 1];
    for row in 0..chroma_rows {
        for col in 0..WIDTH as usize / 2 {
            interleaved[row * ROW_STRIDE + col * 2] = u;
            interleaved[row * ROW_STRIDE + col * 2 + 1] = v;
        }
    }
    let u_plane = interleaved[..interleaved.len() - 1].to_vec();
    let v_plane = interleaved[1..].to_vec();

    OwnedFrame::with_planes(
        WIDTH,
        HEIGHT,
        [(y, ROW_STRIDE, 1), (u_plane, ROW_STRIDE, 2), (v_plane, ROW_STRIDE, 2)],
    )
}

fn normalized(sample: u8) -> f32 {
    sample as f32 / 255.0
}

#[test]
fn newest_frame_is_packed_and_converted() {
    let relay = FrameRelay::new();
    relay.submit(camera_frame(10, 128, 128));
    relay.submit(camera_frame(180, 90, 200));
    let frame = relay.try_take().unwrap();

    let mut samples = Vec::new();
    let mut scratch = Vec::new();
    for plane in Plane::ALL {
        let view = frame.plane(plane).unwrap();
        let packed = pack_plane(&view, &mut scratch).unwrap();
        let (w, h) = plane.dimensions(frame.width(), frame.height());
        assert_eq!(packed.len(), w as usize * h as usize, "{plane:?}");
        assert!(!packed.contains(&0xEE), "{plane:?} kept padding");

        let center = (h as usize / 2) * w as usize + w as usize / 2;
        samples.push(packed[center]);
    }
    assert_eq!(samples, vec![180u8, 90, 200]);

    let [r, g, b] = yuv_to_rgb(
        normalized(samples[0]),
        normalized(samples[1]),
        normalized(samples[2]),
    );
    // strong V and weak U push towards red, away from blue
    assert!(r > g && r > b);
}

#[test]
fn neutral_chroma_reproduces_luma() {
    let k = 77u8;
    let frame = camera_frame(k, 128, 128);

    let mut scratch = Vec::new();
    let y = frame.plane(Plane::Y).unwrap();
    let packed = pack_plane(&y, &mut scratch).unwrap();
    let sample = packed[packed.len() / 2 + WIDTH as usize / 2];

    let rgb = yuv_to_rgb(normalized(sample), normalized(128), normalized(128));
    let expected = normalized(k);
    for channel in rgb {
        assert!((channel - expected).abs() < 0.01, "{rgb:?}");
    }
}
