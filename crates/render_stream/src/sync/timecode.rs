//! Timecode derived from the controller's clock

use std::fmt;

use crate::link::FrameData;

/// Non-drop-frame timecode with its frame rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timecode {
    /// Hours
    pub hours: u32,
    /// Minutes
    pub minutes: u32,
    /// Seconds
    pub seconds: u32,
    /// Frames within the second
    pub frames: u32,
    /// Rate numerator
    pub rate_numerator: u32,
    /// Rate denominator
    pub rate_denominator: u32,
}

impl Timecode {
    /// Timecode of a time in seconds at `numerator / denominator` frames per second
    ///
    /// Returns `None` for a zero rate or negative time.
    pub fn from_seconds(seconds: f64, numerator: u32, denominator: u32) -> Option<Self> {
        if numerator == 0 || denominator == 0 || seconds < 0.0 {
            return None;
        }
        let rate = f64::from(numerator) / f64::from(denominator);
        // Bounded by the u32 range checked below
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let total_frames = (seconds * rate).floor() as u64;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let frames_per_second = u64::from(rate.ceil() as u32).max(1);

        let frames = total_frames % frames_per_second;
        let total_seconds = total_frames / frames_per_second;
        let hours = u32::try_from(total_seconds / 3600).ok()?;
        Some(Self {
            hours,
            minutes: u32::try_from((total_seconds / 60) % 60).ok()?,
            seconds: u32::try_from(total_seconds % 60).ok()?,
            frames: u32::try_from(frames).ok()?,
            rate_numerator: numerator,
            rate_denominator: denominator,
        })
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds, self.frames
        )
    }
}

/// Timecode source that holds its last value while frames are missing
#[derive(Debug, Clone, Copy, Default)]
pub struct TimecodeProvider {
    last: Timecode,
}

impl TimecodeProvider {
    /// Create a provider at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current timecode, updated from `frame` when it is valid
    pub fn update(&mut self, frame: &FrameData, valid: bool) -> Timecode {
        if valid {
            if let Some(timecode) =
                Timecode::from_seconds(frame.local_time, frame.frame_rate_numerator, frame.frame_rate_denominator)
            {
                self.last = timecode;
            }
        }
        self.last
    }

    /// Last timecode produced
    pub const fn current(&self) -> Timecode {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_seconds() {
        let timecode = Timecode::from_seconds(3723.5, 50, 1).unwrap();
        assert_eq!(timecode.to_string(), "01:02:03:25");
        assert_eq!(Timecode::from_seconds(1.0, 0, 1), None);
    }

    #[test]
    fn test_fractional_rate_rounds_frame_count_up() {
        // 29.97 counts 30 frames per timecode second
        let timecode = Timecode::from_seconds(1.0, 30000, 1001).unwrap();
        assert_eq!((timecode.seconds, timecode.frames), (0, 29));
    }

    #[test]
    fn test_holds_last_value() {
        let mut provider = TimecodeProvider::new();
        let frame = FrameData {
            local_time: 2.0,
            frame_rate_numerator: 25,
            frame_rate_denominator: 1,
            ..FrameData::default()
        };
        let first = provider.update(&frame, true);
        assert_eq!(first.seconds, 2);

        let stale = FrameData {
            local_time: 9.0,
            ..frame
        };
        assert_eq!(provider.update(&stale, false), first);
        assert_eq!(provider.current(), first);
    }
}
