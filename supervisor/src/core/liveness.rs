//! Output-driven liveness detection
//!
//! Turns a worker's line stream into liveness events. Only lines that carry
//! frame or bitrate progress count as evidence of a flowing stream; any other
//! output merely proves the worker is still talking.

use tokio::time::Instant;

use crate::core::process::OutputLines;
use crate::error::SupervisorResult;

/// Classification of one output line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessEvent {
    /// Nothing usable (blank line)
    NoSignal,
    /// Worker output without progress evidence
    Heartbeat,
    /// Frame or bitrate progress
    Activity,
}

/// Classify a single line of worker output
///
/// Activity requires a frame counter together with a frame-rate or bitrate
/// field, or a processing-speed field together with a bitrate field.
pub fn classify_line(line: &str) -> LivenessEvent {
    let line = line.trim();
    if line.is_empty() {
        return LivenessEvent::NoSignal;
    }

    let has_bitrate = line.contains("bitrate=");
    let frame_progress = line.contains("frame=") && (line.contains("fps=") || has_bitrate);
    let speed_progress = line.contains("speed=") && has_bitrate;

    if frame_progress || speed_progress {
        LivenessEvent::Activity
    } else {
        LivenessEvent::Heartbeat
    }
}

/// A line together with its classification and arrival time
#[derive(Debug, Clone)]
pub struct ClassifiedLine {
    pub line: String,
    pub event: LivenessEvent,
    pub observed_at: Instant,
}

/// Lazy sequence of classified lines over a worker's output
pub struct LivenessDetector {
    output: OutputLines,
}

impl LivenessDetector {
    pub fn new(output: OutputLines) -> Self {
        Self { output }
    }

    /// Next classified line; `None` once the output has closed
    ///
    /// A read error is yielded once and ends the sequence.
    pub async fn next_event(&mut self) -> Option<SupervisorResult<ClassifiedLine>> {
        match self.output.next_line().await? {
            Ok(raw) => {
                let line = raw.trim_end().to_string();
                let event = classify_line(&line);
                Some(Ok(ClassifiedLine {
                    line,
                    event,
                    observed_at: Instant::now(),
                }))
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_with_fps_is_activity() {
        let line = "frame= 1234 fps= 25 q=-1.0 size=   10240kB time=00:00:49.36 bitrate=1699.4kbits/s speed=1.00x";
        assert_eq!(classify_line(line), LivenessEvent::Activity);
        assert_eq!(classify_line("frame=1 fps=0.0"), LivenessEvent::Activity);
    }

    #[test]
    fn test_frame_with_bitrate_is_activity() {
        assert_eq!(classify_line("frame=   10 bitrate=N/A"), LivenessEvent::Activity);
    }

    #[test]
    fn test_speed_with_bitrate_is_activity() {
        // audio-only progress has no frame counter
        let line = "size=     512kB time=00:00:32.00 bitrate= 131.1kbits/s speed=1.01x";
        assert_eq!(classify_line(line), LivenessEvent::Activity);
    }

    #[test]
    fn test_partial_markers_are_heartbeats() {
        assert_eq!(classify_line("frame=12"), LivenessEvent::Heartbeat);
        assert_eq!(classify_line("fps=25 bitrate=100k"), LivenessEvent::Heartbeat);
        assert_eq!(classify_line("speed=1.0x"), LivenessEvent::Heartbeat);
        assert_eq!(
            classify_line("Input #0, mpegts, from 'srt://0.0.0.0:9001?mode=listener':"),
            LivenessEvent::Heartbeat
        );
    }

    #[test]
    fn test_blank_lines_carry_no_signal() {
        assert_eq!(classify_line(""), LivenessEvent::NoSignal);
        assert_eq!(classify_line("   \t"), LivenessEvent::NoSignal);
    }

    #[tokio::test]
    async fn test_detector_yields_each_line_then_ends() {
        let output: &'static [u8] = b"starting\rframe=1 fps=25\r\n\nframe=2 fps=25";
        let mut detector = LivenessDetector::new(OutputLines::from_readers(vec![output]));

        let mut events = Vec::new();
        while let Some(item) = detector.next_event().await {
            let classified = item.unwrap();
            events.push((classified.line, classified.event));
        }

        assert_eq!(
            events,
            vec![
                ("starting".to_string(), LivenessEvent::Heartbeat),
                ("frame=1 fps=25".to_string(), LivenessEvent::Activity),
                ("frame=2 fps=25".to_string(), LivenessEvent::Activity),
            ]
        );
    }
}
