//! Rounded-square track and the walker that moves along it
//!
//! Coordinates are canvas coordinates: x grows to the right, y grows down.
//! Headings are in radians in the same frame, so travelling along the bottom
//! edge is `0`, up the right edge is `-π/2`, along the top edge `±π` and down
//! the left edge `π/2`. Travel is counter-clockwise on screen.
//!
//! The track is split into nine sections, starting and ending in the middle
//! of the bottom edge:
//!
//! ```text
//!   ┌─────4─────┐
//!   5           3
//!   │           │
//!   6           2
//!   │           │
//!   7           1
//!   └──8──•──0──┘
//! ```

use serde::Serialize;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Default side length of the track
pub const DEFAULT_TRACK_SIZE: f64 = 160.0;

/// Default corner radius of the track
pub const DEFAULT_CORNER_RADIUS: f64 = 40.0;

/// Default progress increment per walker step
pub const DEFAULT_PROGRESS_STEP: f64 = 0.0005;

/// A point in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Position and travel direction at some progress along the track
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathPose {
    pub x: f64,
    pub y: f64,
    /// Travel direction in canvas radians, normalized to (-π, π]
    pub heading: f64,
}

impl PathPose {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Wrap an angle into (-π, π]
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Wrap a progress value into [0, 1)
pub fn wrap_progress(progress: f64) -> f64 {
    if !progress.is_finite() {
        return 0.0;
    }
    let wrapped = progress.rem_euclid(1.0);
    // rem_euclid of a tiny negative value rounds up to exactly 1.0
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Straight {
        start: Point,
        heading: f64,
        length: f64,
    },
    /// Quarter turn to the left around `center`
    Arc {
        center: Point,
        start_heading: f64,
        radius: f64,
    },
}

impl Section {
    fn length(&self) -> f64 {
        match self {
            Section::Straight { length, .. } => *length,
            Section::Arc { radius, .. } => FRAC_PI_2 * radius,
        }
    }

    fn pose_at(&self, distance: f64) -> PathPose {
        match *self {
            Section::Straight {
                start,
                heading,
                length,
            } => {
                let d = distance.clamp(0.0, length);
                PathPose {
                    x: start.x + d * heading.cos(),
                    y: start.y + d * heading.sin(),
                    heading: normalize_angle(heading),
                }
            }
            Section::Arc {
                center,
                start_heading,
                radius,
            } => {
                let swept = if radius > 0.0 {
                    (distance / radius).clamp(0.0, FRAC_PI_2)
                } else {
                    0.0
                };
                let heading = start_heading - swept;
                PathPose {
                    x: center.x - radius * heading.sin(),
                    y: center.y + radius * heading.cos(),
                    heading: normalize_angle(heading),
                }
            }
        }
    }
}

/// Rounded-square track geometry
#[derive(Debug, Clone, PartialEq)]
pub struct TrackGeometry {
    center: Point,
    size: f64,
    radius: f64,
    sections: Vec<Section>,
}

impl TrackGeometry {
    /// Build a track; the radius is clamped to `[0, size / 2]`
    pub fn new(center: Point, size: f64, radius: f64) -> Self {
        let size = if size.is_finite() { size.max(0.0) } else { 0.0 };
        let radius = if radius.is_finite() {
            radius.clamp(0.0, size / 2.0)
        } else {
            0.0
        };
        let sections = build_sections(center, size, radius);
        Self {
            center,
            size,
            radius,
            sections,
        }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Length of one straight edge between two corners
    pub fn straight_length(&self) -> f64 {
        self.size - 2.0 * self.radius
    }

    /// Length of one quarter-circle corner
    pub fn arc_length(&self) -> f64 {
        FRAC_PI_2 * self.radius
    }

    /// Length of one full lap
    pub fn total_length(&self) -> f64 {
        4.0 * self.straight_length() + 4.0 * self.arc_length()
    }

    /// Number of sections a lap is split into
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Pose at a progress value; progress wraps modulo 1
    pub fn pose_at(&self, progress: f64) -> PathPose {
        let mut remaining = wrap_progress(progress) * self.total_length();

        for section in &self.sections {
            let length = section.length();
            if remaining < length {
                return section.pose_at(remaining);
            }
            remaining -= length;
        }

        // Float accumulation can leave a sliver past the last section
        match self.sections.last() {
            Some(last) => last.pose_at(last.length()),
            None => PathPose {
                x: self.center.x,
                y: self.center.y + self.size / 2.0,
                heading: 0.0,
            },
        }
    }
}

fn build_sections(center: Point, size: f64, radius: f64) -> Vec<Section> {
    let half = size / 2.0;
    let straight = size - 2.0 * radius;
    let (left, right) = (center.x - half, center.x + half);
    let (top, bottom) = (center.y - half, center.y + half);

    vec![
        Section::Straight {
            start: Point::new(center.x, bottom),
            heading: 0.0,
            length: straight / 2.0,
        },
        Section::Arc {
            center: Point::new(right - radius, bottom - radius),
            start_heading: 0.0,
            radius,
        },
        Section::Straight {
            start: Point::new(right, bottom - radius),
            heading: -FRAC_PI_2,
            length: straight,
        },
        Section::Arc {
            center: Point::new(right - radius, top + radius),
            start_heading: -FRAC_PI_2,
            radius,
        },
        Section::Straight {
            start: Point::new(right - radius, top),
            heading: PI,
            length: straight,
        },
        Section::Arc {
            center: Point::new(left + radius, top + radius),
            start_heading: -PI,
            radius,
        },
        Section::Straight {
            start: Point::new(left, top + radius),
            heading: FRAC_PI_2,
            length: straight,
        },
        Section::Arc {
            center: Point::new(left + radius, bottom - radius),
            start_heading: -3.0 * FRAC_PI_2,
            radius,
        },
        Section::Straight {
            start: Point::new(left + radius, bottom),
            heading: 0.0,
            length: straight / 2.0,
        },
    ]
}

/// Owns the animation progress along a track
///
/// The progress counter is the only state the digital twin keeps between
/// frames.
#[derive(Debug, Clone)]
pub struct PathWalker {
    geometry: TrackGeometry,
    progress: f64,
    step: f64,
}

impl PathWalker {
    pub fn new(geometry: TrackGeometry, step: f64) -> Self {
        Self {
            geometry,
            progress: 0.0,
            step: if step.is_finite() { step } else { 0.0 },
        }
    }

    pub fn geometry(&self) -> &TrackGeometry {
        &self.geometry
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn set_progress(&mut self, progress: f64) {
        self.progress = wrap_progress(progress);
    }

    /// Move one step forward and return the new progress
    pub fn advance(&mut self) -> f64 {
        self.progress = wrap_progress(self.progress + self.step);
        self.progress
    }

    /// Pose at the current progress
    pub fn pose(&self) -> PathPose {
        self.geometry.pose_at(self.progress)
    }
}

impl Default for PathWalker {
    fn default() -> Self {
        Self::new(
            TrackGeometry::new(Point::new(0.0, 0.0), DEFAULT_TRACK_SIZE, DEFAULT_CORNER_RADIUS),
            DEFAULT_PROGRESS_STEP,
        )
    }
}
