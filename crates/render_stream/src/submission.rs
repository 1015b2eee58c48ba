//! Render-thread side of camera responses
//!
//! Each rendered frame of a streamed viewport consumes exactly one queued
//! camera response and publishes it back through the link. An empty queue
//! (start-up, or a stalled logic thread) renders with neutral camera values
//! and sends nothing.

use std::sync::Arc;

use crate::camera::apply_clipping;
use crate::foundation::math::Mat4;
use crate::link::{CameraResponseData, Link, StreamHandle};
use crate::viewport::ViewportSubmission;

/// Matrices used for one submitted frame
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedFrame {
    /// Stream the frame belongs to
    pub stream: StreamHandle,
    /// World-to-view transform
    pub view: Mat4,
    /// Clipped projection
    pub projection: Mat4,
    /// Response sent with the frame, if one was queued
    pub response: Option<CameraResponseData>,
}

/// Publishes rendered frames on the render thread
#[derive(Clone)]
pub struct RenderSubmitter {
    link: Arc<dyn Link>,
}

impl RenderSubmitter {
    /// Create a submitter sending through `link`
    pub fn new(link: Arc<dyn Link>) -> Self {
        Self { link }
    }

    /// Consume one response and send the frame for a viewport
    pub fn submit(&self, submission: &ViewportSubmission) -> SubmittedFrame {
        let response = submission.responses.pop();
        let camera = response.unwrap_or_else(CameraResponseData::neutral).camera;

        let projection = apply_clipping(
            &submission.camera.projection_matrix(camera.near_z, camera.far_z),
            &submission.clipping,
            camera.cx,
            camera.cy,
        );

        match &response {
            Some(response) => {
                if let Err(e) = self.link.send_frame(submission.stream, response) {
                    log::warn!("Unable to send frame for '{}': {e}", submission.viewport);
                }
            }
            None => log::trace!("No camera response queued for '{}'", submission.viewport),
        }

        SubmittedFrame {
            stream: submission.stream,
            view: submission.camera.view_matrix(),
            projection,
            response,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::camera::{CameraResponseQueue, VirtualCamera};
    use crate::link::{CameraData, LoopbackLink, ProjectionClipping, StreamDescription};

    fn submission(queue: Arc<CameraResponseQueue>) -> ViewportSubmission {
        ViewportSubmission {
            viewport: "main".to_string(),
            stream: 11,
            clipping: ProjectionClipping::default(),
            camera: VirtualCamera::perspective(90.0, 16.0 / 9.0),
            responses: queue,
        }
    }

    fn link_with_stream() -> Arc<LoopbackLink> {
        let link = Arc::new(LoopbackLink::new());
        link.set_streams(vec![StreamDescription {
            handle: 11,
            name: "main".to_string(),
            width: 1920,
            height: 1080,
            ..StreamDescription::default()
        }]);
        link
    }

    #[test]
    fn test_consumes_one_response_per_frame() {
        let link = link_with_stream();
        let submitter = RenderSubmitter::new(link.clone());
        let queue = Arc::new(CameraResponseQueue::new());
        let response = CameraResponseData {
            t_tracked: 1.5,
            camera: CameraData {
                near_z: 0.5,
                far_z: 50.0,
                ..CameraData::default()
            },
        };
        queue.push(response);

        let frame = submitter.submit(&submission(queue.clone()));
        assert_eq!(frame.response, Some(response));
        assert!(queue.is_empty());
        assert_eq!(link.sent_frames(), vec![(11, response)]);

        let expected = VirtualCamera::perspective(90.0, 16.0 / 9.0).projection_matrix(0.5, 50.0);
        assert_relative_eq!(frame.projection, expected, epsilon = 1e-5);
    }

    #[test]
    fn test_empty_queue_renders_neutral_without_sending() {
        let link = link_with_stream();
        let submitter = RenderSubmitter::new(link.clone());
        let queue = Arc::new(CameraResponseQueue::new());

        let frame = submitter.submit(&submission(queue));
        assert_eq!(frame.response, None);
        assert!(link.sent_frames().is_empty());

        let neutral = CameraResponseData::neutral().camera;
        let expected =
            VirtualCamera::perspective(90.0, 16.0 / 9.0).projection_matrix(neutral.near_z, neutral.far_z);
        assert_relative_eq!(frame.projection, expected, epsilon = 1e-5);
    }
}
