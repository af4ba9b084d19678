//! Heading-up camera for the digital twin view
//!
//! The camera keeps the robot at a fixed screen anchor and rotates the scene
//! so the direction of travel always points up.

use super::path::{normalize_angle, PathPose, Point};
use serde::Serialize;
use std::f64::consts::FRAC_PI_2;

/// Default view width in pixels
pub const DEFAULT_VIEW_WIDTH: f64 = 400.0;

/// Default view height in pixels
pub const DEFAULT_VIEW_HEIGHT: f64 = 250.0;

/// Fraction of the view height at which the robot is anchored
pub const ANCHOR_HEIGHT_FRACTION: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeadingUpCamera {
    pub anchor: Point,
}

impl HeadingUpCamera {
    pub fn new(anchor: Point) -> Self {
        Self { anchor }
    }

    /// Camera anchored horizontally centered, three quarters down the view
    pub fn for_view(width: f64, height: f64) -> Self {
        Self::new(Point::new(width / 2.0, height * ANCHOR_HEIGHT_FRACTION))
    }

    /// Scene rotation that turns `heading` into screen-up
    pub fn scene_rotation(&self, heading: f64) -> f64 {
        normalize_angle(-FRAC_PI_2 - heading)
    }

    /// Map a world point to the screen for a robot at `pose`
    pub fn world_to_screen(&self, pose: &PathPose, point: Point) -> Point {
        let (sin, cos) = self.scene_rotation(pose.heading).sin_cos();
        let dx = point.x - pose.x;
        let dy = point.y - pose.y;
        Point::new(
            self.anchor.x + dx * cos - dy * sin,
            self.anchor.y + dx * sin + dy * cos,
        )
    }

    /// Inverse of [`Self::world_to_screen`]
    pub fn screen_to_world(&self, pose: &PathPose, point: Point) -> Point {
        let (sin, cos) = self.scene_rotation(pose.heading).sin_cos();
        let dx = point.x - self.anchor.x;
        let dy = point.y - self.anchor.y;
        Point::new(pose.x + dx * cos + dy * sin, pose.y - dx * sin + dy * cos)
    }

    /// Screen position of the robot marker for a lateral offset
    ///
    /// A positive offset draws the marker left of the anchor.
    pub fn marker_screen(&self, offset: f64) -> Point {
        Point::new(self.anchor.x - offset, self.anchor.y)
    }
}

impl Default for HeadingUpCamera {
    fn default() -> Self {
        Self::for_view(DEFAULT_VIEW_WIDTH, DEFAULT_VIEW_HEIGHT)
    }
}

/// World position of the robot marker, `offset` to the left of travel
pub fn marker_world(pose: &PathPose, offset: f64) -> Point {
    let (sin, cos) = pose.heading.sin_cos();
    Point::new(pose.x + offset * sin, pose.y - offset * cos)
}
