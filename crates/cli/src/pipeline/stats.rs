//! Run statistics and end-of-run summary.

use std::fmt;
use std::time::Duration;

use contracts::ComponentRole;
use frame_parser::MetricsSnapshot;
use observability::NotificationSummary;

/// Why the run loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Ctrl+C or SIGTERM
    Shutdown,
    /// `--timeout` elapsed
    Timeout,
    /// `--max-frames` reached
    MaxFrames,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Shutdown => "shutdown signal",
            Self::Timeout => "timeout",
            Self::MaxFrames => "frame limit reached",
        })
    }
}

/// Per-group figures captured just before the group is stopped
#[derive(Debug, Clone)]
pub struct GroupStats {
    pub name: String,
    pub role: ComponentRole,
    pub members: usize,
    pub initialized: usize,
    pub processed: u64,
    /// Items per second over the whole run
    pub rate: f64,
}

/// Statistics from a concentrator run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub stop_reason: StopReason,

    /// Data frames handed to the parser
    pub frames_generated: u64,

    /// Parser counters at shutdown
    pub parser: MetricsSnapshot,

    /// Group figures, in configuration order
    pub groups: Vec<GroupStats>,

    /// Notifications raised by every group
    pub notifications: NotificationSummary,

    /// Total duration of the run
    pub duration: Duration,
}

impl PipelineStats {
    /// Frames parsed per second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.parser.frames_parsed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of recognized frames that could not be parsed, as a percentage
    pub fn rejection_rate(&self) -> f64 {
        let rejected = self.parser.unknown_types + self.parser.malformed_frames;
        let total = self.parser.frames_parsed + rejected;
        if total > 0 {
            (rejected as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                  Concentrator Statistics                     ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Stopped by: {}", self.stop_reason);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames generated: {}", self.frames_generated);
        println!("   └─ Parsed FPS: {:.2}", self.fps());

        println!("\n📈 Frame Parser");
        println!("   ├─ Bytes received: {}", self.parser.bytes_received);
        println!("   ├─ Frames received: {}", self.parser.frames_received);
        println!("   ├─ Frames parsed: {}", self.parser.frames_parsed);
        println!("   ├─ Unknown frame types: {}", self.parser.unknown_types);
        println!("   ├─ Malformed frames: {}", self.parser.malformed_frames);
        println!("   └─ Rejection rate: {:.2}%", self.rejection_rate());

        if !self.groups.is_empty() {
            println!("\n🧩 Component Groups");
            let last = self.groups.len() - 1;
            for (index, group) in self.groups.iter().enumerate() {
                let branch = if index == last { "└─" } else { "├─" };
                println!(
                    "   {} {} ({:?}): {}/{} initialized, {} processed, {:.2} items/s",
                    branch,
                    group.name,
                    group.role,
                    group.initialized,
                    group.members,
                    group.processed,
                    group.rate
                );
            }
        }

        println!("\n🔔 Notifications");
        for line in self.notifications.to_string().lines().skip(1) {
            println!("   {line}");
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(parser: MetricsSnapshot) -> PipelineStats {
        PipelineStats {
            stop_reason: StopReason::MaxFrames,
            frames_generated: 0,
            parser,
            groups: Vec::new(),
            notifications: NotificationSummary::default(),
            duration: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_fps_and_rejection_rate() {
        let stats = stats(MetricsSnapshot {
            frames_parsed: 90,
            unknown_types: 6,
            malformed_frames: 4,
            ..Default::default()
        });
        assert!((stats.fps() - 45.0).abs() < 1e-9);
        assert!((stats.rejection_rate() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_run_rates_are_zero() {
        let mut stats = stats(MetricsSnapshot::default());
        stats.duration = Duration::ZERO;
        assert_eq!(stats.fps(), 0.0);
        assert_eq!(stats.rejection_rate(), 0.0);
    }
}
