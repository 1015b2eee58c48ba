//! Conversion of the link's camera records onto virtual cameras

use super::{CameraResponseQueue, CineSensor, VirtualCamera};
use crate::foundation::coordinates::CoordinateConverter;
use crate::foundation::math::{utils, Vec3};
use crate::link::{CameraData, CameraResponseData, FrameData, Link};
use crate::streams::StreamRegistry;
use crate::viewport::ViewportTable;

/// Horizontal field of view in degrees from focal length and sensor width
pub fn horizontal_fov_degrees(focal_length: f32, sensor_width: f32) -> f32 {
    utils::rad_to_deg(2.0 * (0.5 / (focal_length / sensor_width)).atan())
}

/// Apply one camera record to a viewport's camera
///
/// A response is queued first, unconditionally, so the render-submission side
/// stays balanced one to one with applied records even when there is no camera
/// to drive.
///
/// # Arguments
/// * `camera` - Target camera, if the viewport has one
/// * `responses` - The viewport's response queue
/// * `t_tracked` - Tracked time of the frame being applied
/// * `data` - The link's camera record
/// * `converter` - Link-to-host coordinate conversion
pub fn apply_camera_data(
    camera: Option<&mut VirtualCamera>,
    responses: &CameraResponseQueue,
    t_tracked: f64,
    data: &CameraData,
    converter: &CoordinateConverter,
) {
    responses.push(CameraResponseData {
        t_tracked,
        camera: *data,
    });

    let Some(camera) = camera else {
        return;
    };

    let aspect = (data.sensor_y > 0.0).then(|| data.sensor_x / data.sensor_y);

    if data.camera_handle == 0 {
        if let Some(aspect) = aspect {
            camera.set_aspect_ratio(aspect);
        }
        return;
    }

    if data.ortho_width > 0.0 {
        camera.set_orthographic(converter.meters_to_host(data.ortho_width));
        if let Some(aspect) = aspect {
            camera.set_aspect_ratio(aspect);
        }
    } else if camera.supports_cine() {
        camera.set_cine_sensor(CineSensor {
            sensor_width: data.sensor_x,
            sensor_height: data.sensor_y,
            focal_length: data.focal_length,
        });
    } else if data.focal_length > 0.0 && data.sensor_x > 0.0 {
        camera.set_field_of_view(horizontal_fov_degrees(data.focal_length, data.sensor_x));
        if let Some(aspect) = aspect {
            camera.set_aspect_ratio(aspect);
        }
    } else {
        log::debug!(
            "Camera {} has unusable lens (focal {}, sensor {}); keeping field of view",
            data.camera_handle,
            data.focal_length,
            data.sensor_x
        );
    }

    camera.set_pose(
        converter.position_to_host(Vec3::new(data.x, data.y, data.z)),
        converter.camera_rotation_to_host(data.rx, data.ry, data.rz),
    );
}

/// Fetch and apply this frame's camera record for every streamed viewport
///
/// Viewports are visited in id order. Viewports without a stream, flagged
/// invalid, or whose stream has no camera record this frame are left as they
/// are.
pub fn apply_cameras(
    frame: &FrameData,
    viewports: &mut ViewportTable,
    streams: &StreamRegistry,
    link: &dyn Link,
    converter: &CoordinateConverter,
) {
    for viewport in viewports.iter_mut() {
        if !viewport.is_valid() {
            continue;
        }
        let Some(stream) = streams.get_stream(viewport.id()) else {
            continue;
        };
        match link.get_frame_camera(stream.handle()) {
            Ok(data) => {
                let (camera, responses) = viewport.camera_and_responses();
                apply_camera_data(camera, responses, frame.t_tracked, &data, converter);
            }
            Err(err) => log::trace!("No camera for stream '{}': {err}", stream.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::ProjectionMode;
    use crate::foundation::coordinates::DistanceUnit;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-4;

    fn record() -> CameraData {
        CameraData {
            camera_handle: 7,
            x: 1.0,
            y: 2.0,
            z: 3.0,
            ry: 90.0,
            focal_length: 18.0,
            sensor_x: 36.0,
            sensor_y: 24.0,
            near_z: 0.1,
            far_z: 100.0,
            ..CameraData::default()
        }
    }

    #[test]
    fn test_fov_formula() {
        assert_relative_eq!(horizontal_fov_degrees(18.0, 36.0), 90.0, epsilon = EPSILON);
        assert_relative_eq!(horizontal_fov_degrees(36.0, 36.0), 53.130_1, epsilon = 1e-3);
    }

    #[test]
    fn test_perspective_record_sets_fov_aspect_and_pose() {
        let converter = CoordinateConverter::new(DistanceUnit::Centimeters);
        let queue = CameraResponseQueue::new();
        let mut camera = VirtualCamera::default();

        apply_camera_data(Some(&mut camera), &queue, 4.0, &record(), &converter);

        assert_eq!(queue.len(), 1);
        assert_eq!(camera.mode, ProjectionMode::Perspective);
        assert_relative_eq!(camera.fov_degrees, 90.0, epsilon = EPSILON);
        assert_relative_eq!(camera.aspect, 1.5, epsilon = EPSILON);
        assert_relative_eq!(camera.position, Vec3::new(300.0, 100.0, 200.0), epsilon = EPSILON);
        assert_relative_eq!(camera.rotation * Vec3::x(), Vec3::y(), epsilon = EPSILON);
    }

    #[test]
    fn test_orthographic_record() {
        let converter = CoordinateConverter::new(DistanceUnit::Centimeters);
        let queue = CameraResponseQueue::new();
        let mut camera = VirtualCamera::default();
        let data = CameraData {
            ortho_width: 2.5,
            ..record()
        };

        apply_camera_data(Some(&mut camera), &queue, 0.0, &data, &converter);

        assert_eq!(camera.mode, ProjectionMode::Orthographic);
        assert_relative_eq!(camera.ortho_width, 250.0, epsilon = EPSILON);
    }

    #[test]
    fn test_cine_camera_takes_sensor_directly() {
        let converter = CoordinateConverter::default();
        let queue = CameraResponseQueue::new();
        let mut camera = VirtualCamera::cine(CineSensor {
            sensor_width: 24.0,
            sensor_height: 24.0,
            focal_length: 50.0,
        });

        apply_camera_data(Some(&mut camera), &queue, 0.0, &record(), &converter);

        let sensor = camera.cine_sensor().unwrap();
        assert_relative_eq!(sensor.sensor_width, 36.0, epsilon = EPSILON);
        assert_relative_eq!(sensor.focal_length, 18.0, epsilon = EPSILON);
    }

    #[test]
    fn test_passthrough_only_sets_aspect() {
        let converter = CoordinateConverter::default();
        let queue = CameraResponseQueue::new();
        let mut camera = VirtualCamera::perspective(60.0, 1.0);
        let data = CameraData {
            camera_handle: 0,
            ..record()
        };

        apply_camera_data(Some(&mut camera), &queue, 0.0, &data, &converter);

        assert_eq!(queue.len(), 1);
        assert_relative_eq!(camera.aspect, 1.5, epsilon = EPSILON);
        assert_relative_eq!(camera.fov_degrees, 60.0, epsilon = EPSILON);
        assert_relative_eq!(camera.position, Vec3::zeros(), epsilon = EPSILON);
    }

    #[test]
    fn test_response_queued_without_camera() {
        let queue = CameraResponseQueue::new();
        apply_camera_data(None, &queue, 9.0, &record(), &CoordinateConverter::default());

        assert_eq!(queue.pop().map(|r| r.t_tracked), Some(9.0));
    }
}
