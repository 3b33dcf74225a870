//! Repacks camera planes into the tightly packed rows GLES2 texture uploads expect.
//!
//! GLES2 has no `UNPACK_ROW_LENGTH`, so padding past the logical row and
//! interleaved chroma samples have to be stripped on the CPU.

use crate::error::Error;
use crate::frame::PlaneView;

/// Returns exactly `width * height` samples of `view`, row after row.
///
/// Borrows straight from the plane when it is already tight, otherwise packs
/// into `scratch`.
pub fn pack_plane<'a>(view: &PlaneView<'a>, scratch: &'a mut Vec<u8>) -> Result<&'a [u8], Error> {
    let w = view.width as usize;
    let h = view.height as usize;
    let rs = view.row_stride;
    let ps = view.pixel_stride;

    if w == 0 || h == 0 {
        return Err(Error::PlaneLayout {
            plane: view.plane,
            reason: "empty plane",
        });
    }
    if ps == 0 {
        return Err(Error::PlaneLayout {
            plane: view.plane,
            reason: "zero pixel stride",
        });
    }
    let row_span = (w - 1) * ps + 1;
    if rs < row_span {
        return Err(Error::PlaneLayout {
            plane: view.plane,
            reason: "row stride shorter than a row",
        });
    }

    // the last row is not padded out to the stride
    let needed = (h - 1) * rs + row_span;
    if view.data.len() < needed {
        return Err(Error::PlaneTooShort {
            plane: view.plane,
            len: view.data.len(),
            needed,
        });
    }

    let data: &'a [u8] = view.data;
    if ps == 1 && rs == w {
        return Ok(&data[..w * h]);
    }

    scratch.clear();
    scratch.reserve(w * h);
    for row in 0..h {
        let start = row * rs;
        if ps == 1 {
            scratch.extend_from_slice(&data[start..start + w]);
        } else {
            scratch.extend(data[start..start + row_span].iter().step_by(ps));
        }
    }
    Ok(scratch.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Plane;

    fn view(data: &[u8], width: u32, height: u32, row_stride: usize, pixel_stride: usize) -> PlaneView<'_> {
        PlaneView {
            plane: Plane::Y,
            data,
            width,
            height,
            row_stride,
            pixel_stride,
        }
    }

    #[test]
    fn tight_plane_is_borrowed_whole() {
        let data: Vec<u8> = (0..640 * 480).map(|i| (i % 251) as u8).collect();
        let mut scratch = Vec::new();

        let packed = pack_plane(&view(&data, 640, 480, 640, 1), &mut scratch).unwrap();

        assert_eq!(packed.len(), 640 * 480);
        assert_eq!(packed, &data[..]);
        assert!(scratch.is_empty());
    }

    #[test]
    fn row_padding_is_skipped() {
        // 640 valid bytes then 32 bytes of padding per row, last row unpadded.
        // Row values stay below the padding byte.
        let (w, h, stride) = (640usize, 480usize, 672usize);
        let row_value = |row: usize| (row % 200) as u8;
        let mut data = Vec::new();
        for row in 0..h {
            data.extend(std::iter::repeat_n(row_value(row), w));
            if row + 1 < h {
                data.extend(std::iter::repeat_n(0xEE, stride - w));
            }
        }
        let mut scratch = Vec::new();

        let packed = pack_plane(&view(&data, w as u32, h as u32, stride, 1), &mut scratch).unwrap();

        assert_eq!(packed.len(), w * h);
        assert!(!packed.contains(&0xEE));
        for (row, chunk) in packed.chunks(w).enumerate() {
            assert!(chunk.iter().all(|&b| b == row_value(row)), "row {row}");
        }
    }

    #[test]
    fn interleaved_chroma_is_deinterleaved() {
        // VU VU .. with a stride of 8 for a 3-sample row
        let data: [u8; 13] = [10, 99, 11, 99, 12, 0, 0, 0, 20, 99, 21, 99, 22];
        let mut scratch = Vec::new();

        let packed = pack_plane(&view(&data, 3, 2, 8, 2), &mut scratch).unwrap();

        assert_eq!(packed, &[10u8, 11, 12, 20, 21, 22]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let data = vec![0u8; 100];
        let mut scratch = Vec::new();

        let err = pack_plane(&view(&data, 10, 11, 10, 1), &mut scratch).unwrap_err();

        assert!(matches!(
            err,
            Error::PlaneTooShort {
                len: 100,
                needed: 110,
                ..
            }
        ));
    }

    #[test]
    fn stride_narrower_than_row_is_rejected() {
        let data = vec![0u8; 64];
        let mut scratch = Vec::new();

        assert!(matches!(
            pack_plane(&view(&data, 8, 2, 4, 1), &mut scratch),
            Err(Error::PlaneLayout { .. })
        ));
        assert!(matches!(
            pack_plane(&view(&data, 8, 2, 8, 0), &mut scratch),
            Err(Error::PlaneLayout { .. })
        ));
    }
}
