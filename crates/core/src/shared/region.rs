/// A face bounding box in pixel coordinates.
///
/// Edges follow the `(top, right, bottom, left)` convention; `right` and
/// `bottom` are exclusive, so `width = right - left`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaceRegion {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl FaceRegion {
    pub fn new(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Builds a region from floating-point corners `(x1, y1, x2, y2)`,
    /// rounding outward and clamping to the frame.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64, frame_w: u32, frame_h: u32) -> Self {
        Self {
            top: y1.floor() as i32,
            right: x2.ceil() as i32,
            bottom: y2.ceil() as i32,
            left: x1.floor() as i32,
        }
        .clamp_to(frame_w, frame_h)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> i64 {
        self.width().max(0) as i64 * self.height().max(0) as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Clamps every edge into `[0, frame_w] × [0, frame_h]`.
    ///
    /// Inverted edges collapse to a zero-sized region instead of going
    /// negative.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Self {
        let fw = frame_w as i32;
        let fh = frame_h as i32;
        let left = self.left.clamp(0, fw);
        let top = self.top.clamp(0, fh);
        Self {
            top,
            right: self.right.clamp(left, fw),
            bottom: self.bottom.clamp(top, fh),
            left,
        }
    }

    pub fn iou(&self, other: &FaceRegion) -> f64 {
        let ix1 = self.left.max(other.left);
        let iy1 = self.top.max(other.top);
        let ix2 = self.right.min(other.right);
        let iy2 = self.bottom.min(other.bottom);

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        let union = self.area() as f64 + other.area() as f64 - inter;
        inter / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    /// Shorthand in x/y/w/h terms, easier to reason about in IoU cases.
    fn region(x: i32, y: i32, w: i32, h: i32) -> FaceRegion {
        FaceRegion::new(y, x + w, y + h, x)
    }

    #[test]
    fn test_dimensions() {
        let r = FaceRegion::new(10, 60, 40, 20);
        assert_eq!(r.width(), 40);
        assert_eq!(r.height(), 30);
        assert_eq!(r.area(), 1200);
        assert!(!r.is_empty());
    }

    #[test]
    fn test_from_corners_rounds_outward() {
        let r = FaceRegion::from_corners(10.4, 20.6, 30.2, 40.1, 100, 100);
        assert_eq!(r, FaceRegion::new(20, 31, 41, 10));
    }

    #[test]
    fn test_from_corners_clamps_to_frame() {
        let r = FaceRegion::from_corners(-15.0, -5.0, 120.0, 50.0, 100, 80);
        assert_eq!(r, FaceRegion::new(0, 100, 50, 0));
    }

    #[test]
    fn test_clamp_collapses_inverted_region() {
        let r = FaceRegion::new(50, 10, 20, 40).clamp_to(100, 100);
        assert!(r.is_empty());
        assert_eq!(r.width(), 0);
        assert_eq!(r.height(), 0);
    }

    #[test]
    fn test_iou_identical_regions() {
        let a = region(10, 10, 100, 100);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // intersection 50*100 = 5000, union 15000
        let a = region(0, 0, 100, 100);
        let b = region(50, 0, 100, 100);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[rstest]
    #[case::disjoint(region(0, 0, 50, 50), region(100, 100, 50, 50))]
    #[case::touching(region(0, 0, 50, 50), region(50, 0, 50, 50))]
    #[case::zero_width(region(0, 0, 0, 100), region(0, 0, 50, 50))]
    fn test_iou_zero(#[case] a: FaceRegion, #[case] b: FaceRegion) {
        assert_relative_eq!(a.iou(&b), 0.0);
    }
}
