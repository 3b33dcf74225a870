//! Camera-side decisions that do not depend on the vendor API: which device to
//! open and how an "image available" notification turns into a delivered frame.

use tracing::{trace, warn};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LensFacing {
    Front,
    Back,
    External,
}

impl LensFacing {
    /// Maps the `LENS_FACING` characteristic value.
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(LensFacing::Front),
            1 => Some(LensFacing::Back),
            2 => Some(LensFacing::External),
            _ => None,
        }
    }
}

/// Back-facing camera if one is known, otherwise the first one listed.
pub fn pick_camera<T>(candidates: &[(T, Option<LensFacing>)]) -> Option<&T> {
    candidates
        .iter()
        .find(|(_, facing)| *facing == Some(LensFacing::Back))
        .or_else(|| candidates.first())
        .map(|(id, _)| id)
}

pub trait ImageSource {
    type Image;

    /// Newest buffered image, discarding any older ones. `Ok(None)` when
    /// nothing is buffered.
    fn acquire_latest(&self) -> Result<Option<Self::Image>, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Empty,
    Failed,
}

/// Handles one "image available" notification: hands the newest image to
/// `sink` exactly once, or logs and skips. Never retries.
pub fn deliver_latest<S, F>(source: &S, sink: &F) -> Delivery
where
    S: ImageSource,
    F: Fn(S::Image) + ?Sized,
{
    match source.acquire_latest() {
        Ok(Some(image)) => {
            sink(image);
            Delivery::Delivered
        }
        Ok(None) => {
            trace!("Image notification with nothing buffered");
            Delivery::Empty
        }
        Err(e) => {
            warn!(error = %e, "Failed to acquire image, skipping");
            Delivery::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn back_camera_preferred() {
        let ids = [
            ("0", Some(LensFacing::Front)),
            ("1", None),
            ("2", Some(LensFacing::Back)),
        ];
        assert_eq!(pick_camera(&ids), Some(&"2"));
    }

    #[test]
    fn first_camera_without_back_facing() {
        let ids = [("5", Some(LensFacing::External)), ("7", Some(LensFacing::Front))];
        assert_eq!(pick_camera(&ids), Some(&"5"));

        let none: [(&str, Option<LensFacing>); 0] = [];
        assert_eq!(pick_camera(&none), None);
    }

    #[test]
    fn lens_facing_values() {
        assert_eq!(LensFacing::from_raw(1), Some(LensFacing::Back));
        assert_eq!(LensFacing::from_raw(0), Some(LensFacing::Front));
        assert_eq!(LensFacing::from_raw(9), None);
    }

    struct Scripted(RefCell<Vec<Result<Option<u32>, Error>>>);

    impl ImageSource for Scripted {
        type Image = u32;

        fn acquire_latest(&self) -> Result<Option<u32>, Error> {
            self.0.borrow_mut().remove(0)
        }
    }

    #[test]
    fn each_notification_delivers_at_most_once() {
        let source = Scripted(RefCell::new(vec![
            Ok(Some(1)),
            Err(Error::Media {
                call: "AImageReader_acquireLatestImage",
                status: -10000,
            }),
            Ok(None),
            Ok(Some(4)),
        ]));
        let delivered = RefCell::new(Vec::new());
        let sink = |image: u32| delivered.borrow_mut().push(image);

        let outcomes: Vec<_> = (0..4).map(|_| deliver_latest(&source, &sink)).collect();

        assert_eq!(
            outcomes,
            [
                Delivery::Delivered,
                Delivery::Failed,
                Delivery::Empty,
                Delivery::Delivered
            ]
        );
        assert_eq!(*delivered.borrow(), [1, 4]);
    }
}
