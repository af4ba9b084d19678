//! Digital twin math
//!
//! Pure, deterministic computations that turn one telemetry record into a
//! frame of the digital twin view:
//!
//! - [`deviation`] - Sensor-weighted lateral deviation estimate
//! - [`path`] - Rounded-square track and the walker moving along it
//! - [`camera`] - Heading-up camera transform
//!
//! Every frame is recomputed from scratch. The only state carried between
//! frames is the walker's progress counter inside [`DigitalTwin`].

pub mod camera;
pub mod deviation;
pub mod path;

pub use camera::HeadingUpCamera;
pub use deviation::{effective_error, estimate, DeviationEstimate};
pub use path::{PathPose, PathWalker, Point, TrackGeometry};

use crate::config::TwinSettings;
use crate::types::{TelemetryRecord, SENSOR_CHANNELS};
use serde::Serialize;

/// Everything needed to draw one frame of the twin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwinFrame {
    /// Walker progress in [0, 1)
    pub progress: f64,
    /// Position and heading of the path point under the robot
    pub pose: PathPose,
    /// Estimate recomputed from the sensors, if the record has them
    pub deviation: Option<DeviationEstimate>,
    /// Steering error used for drawing (producer value wins)
    pub error: f64,
    /// Lateral screen offset, `error * deviation_scale`
    pub offset: f64,
    /// Rotation applied to the scene so travel points up
    pub scene_rotation: f64,
    /// Robot marker in screen coordinates
    pub marker_screen: Point,
    /// Robot marker in track coordinates
    pub marker_world: Point,
    /// Per-channel indicator, `true` = line detected
    pub sensors: Option<[bool; SENSOR_CHANNELS]>,
}

/// Stateful frame generator owning the walker
#[derive(Debug, Clone)]
pub struct DigitalTwin {
    walker: PathWalker,
    camera: HeadingUpCamera,
    deviation_scale: f64,
}

impl DigitalTwin {
    pub fn new(walker: PathWalker, camera: HeadingUpCamera, deviation_scale: f64) -> Self {
        Self {
            walker,
            camera,
            deviation_scale,
        }
    }

    /// Build a twin from the `[twin]` config section
    ///
    /// The track is centered in the view.
    pub fn from_settings(settings: &TwinSettings) -> Self {
        let center = Point::new(settings.view_width / 2.0, settings.view_height / 2.0);
        let geometry = TrackGeometry::new(center, settings.track_size, settings.corner_radius);
        Self::new(
            PathWalker::new(geometry, settings.progress_step),
            HeadingUpCamera::for_view(settings.view_width, settings.view_height),
            settings.deviation_scale,
        )
    }

    pub fn walker(&self) -> &PathWalker {
        &self.walker
    }

    pub fn camera(&self) -> &HeadingUpCamera {
        &self.camera
    }

    /// Advance the walker one step and compute the frame for `record`
    pub fn frame(&mut self, record: &TelemetryRecord) -> TwinFrame {
        let progress = self.walker.advance();
        self.frame_at(progress, record)
    }

    /// Compute the frame for `record` at an explicit progress
    pub fn frame_at(&self, progress: f64, record: &TelemetryRecord) -> TwinFrame {
        let progress = path::wrap_progress(progress);
        let pose = self.walker.geometry().pose_at(progress);
        let error = effective_error(record);
        let offset = error * self.deviation_scale;

        TwinFrame {
            progress,
            pose,
            deviation: deviation::estimate_record(record),
            error,
            offset,
            scene_rotation: self.camera.scene_rotation(pose.heading),
            marker_screen: self.camera.marker_screen(offset),
            marker_world: camera::marker_world(&pose, offset),
            sensors: record.sensors.map(|s| {
                let mut lit = [false; SENSOR_CHANNELS];
                for (channel, slot) in lit.iter_mut().enumerate() {
                    *slot = s.is_detected(channel);
                }
                lit
            }),
        }
    }
}

impl Default for DigitalTwin {
    fn default() -> Self {
        Self::from_settings(&TwinSettings::default())
    }
}
