use crate::error::Error;

/// Plane of a planar 4:2:0 frame, numbered the way cameras report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    Y = 0,
    U = 1,
    V = 2,
}

impl Plane {
    pub const ALL: [Plane; 3] = [Plane::Y, Plane::U, Plane::V];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Logical size of this plane in a `width` x `height` frame. Chroma is
    /// half resolution in both directions, rounded up for odd sizes.
    pub fn dimensions(self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Plane::Y => (width, height),
            Plane::U | Plane::V => (width.div_ceil(2), height.div_ceil(2)),
        }
    }
}

/// One plane as the producer laid it out in memory.
///
/// `row_stride` is the byte distance between rows and may exceed `width`;
/// `pixel_stride` is the byte distance between samples in a row (2 for
/// interleaved chroma).
#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a> {
    pub plane: Plane,
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub row_stride: usize,
    pub pixel_stride: usize,
}

/// A captured 4:2:0 image. Dropping the value releases it.
pub trait YuvFrame {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn plane(&self, plane: Plane) -> Result<PlaneView<'_>, Error>;

    fn timestamp_ns(&self) -> Option<i64> {
        None
    }
}

#[derive(Debug, Clone)]
struct OwnedPlane {
    data: Vec<u8>,
    row_stride: usize,
    pixel_stride: usize,
}

/// Heap-backed frame for synthetic sources and tests.
#[derive(Debug, Clone)]
pub struct OwnedFrame {
    width: u32,
    height: u32,
    planes: [OwnedPlane; 3],
}

impl OwnedFrame {
    /// Builds a frame from raw plane buffers given as `(data, row_stride, pixel_stride)`.
    pub fn with_planes(width: u32, height: u32, planes: [(Vec<u8>, usize, usize); 3]) -> Self {
        let planes = planes.map(|(data, row_stride, pixel_stride)| OwnedPlane {
            data,
            row_stride,
            pixel_stride,
        });
        Self {
            width,
            height,
            planes,
        }
    }

    /// Tightly packed frame with every sample of a plane set to one value.
    pub fn filled(width: u32, height: u32, y: u8, u: u8, v: u8) -> Self {
        let plane = |plane: Plane, value: u8| {
            let (w, h) = plane.dimensions(width, height);
            (vec![value; w as usize * h as usize], w as usize, 1)
        };
        Self::with_planes(
            width,
            height,
            [plane(Plane::Y, y), plane(Plane::U, u), plane(Plane::V, v)],
        )
    }
}

impl YuvFrame for OwnedFrame {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn plane(&self, plane: Plane) -> Result<PlaneView<'_>, Error> {
        let owned = &self.planes[plane.index()];
        let (width, height) = plane.dimensions(self.width, self.height);
        Ok(PlaneView {
            plane,
            data: &owned.data,
            width,
            height,
            row_stride: owned.row_stride,
            pixel_stride: owned.pixel_stride,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chroma_is_half_resolution() {
        assert_eq!(Plane::Y.dimensions(640, 480), (640, 480));
        assert_eq!(Plane::U.dimensions(640, 480), (320, 240));
        assert_eq!(Plane::V.dimensions(641, 479), (321, 240));
    }

    #[test]
    fn filled_frame_is_tightly_packed() {
        let frame = OwnedFrame::filled(4, 2, 16, 128, 200);
        let y = frame.plane(Plane::Y).unwrap();
        assert_eq!(y.data.len(), 8);
        assert_eq!(y.row_stride, 4);

        let v = frame.plane(Plane::V).unwrap();
        assert_eq!((v.width, v.height), (2, 1));
        assert_eq!(v.data, &[200u8, 200]);
    }
}
