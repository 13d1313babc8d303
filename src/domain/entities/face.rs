/// Axis-aligned face bounding box, in pixel coordinates of the detected image.
///
/// Coordinates are kept as floats the way the detector reports them; they are
/// truncated to integers only when cropping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// One face reported by the detection capability
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    /// Eye landmark points, `(x, y)` in pixel coordinates
    pub left_eye: (f32, f32),
    pub right_eye: (f32, f32),
    /// Detector confidence score
    pub score: f32,
}

impl DetectedFace {
    /// Angle of the eye-to-eye line against the horizontal, in degrees.
    ///
    /// Positive when the right eye sits lower than the left one (y axis points down).
    pub fn eye_angle_degrees(&self) -> f32 {
        let dx = self.right_eye.0 - self.left_eye.0;
        let dy = self.right_eye.1 - self.left_eye.1;
        dy.atan2(dx).to_degrees()
    }
}
