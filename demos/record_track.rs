//! Simulate a short recording session and print the track payload.
//!
//! Run with: cargo run --example record_track

use track_planner::{RecorderConfig, TimestampedFix, TrackRecorder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut recorder = TrackRecorder::new("12345", RecorderConfig::default());
    let t0 = 1_700_000_000_000;

    recorder.start(t0)?;
    for i in 0..10 {
        let lat = 48.8566 + i as f64 * 0.0002;
        let fix = TimestampedFix::new(lat, 2.3522, Some(35.0), t0 + i * 1_000);
        recorder.record(fix)?;
    }

    recorder.pause()?;
    // Ignored while paused
    recorder.record(TimestampedFix::new(48.9, 2.4, None, t0 + 11_000))?;
    recorder.resume()?;

    for i in 0..5 {
        let lng = 2.3522 + i as f64 * 0.0003;
        let fix = TimestampedFix::new(48.8584, lng, None, t0 + 20_000 + i * 1_000);
        recorder.record(fix)?;
    }

    if let Some(region) = recorder.current_region() {
        println!("Following ({:.5}, {:.5})", region.center_latitude, region.center_longitude);
    }

    let track = recorder.finish(t0 + 30_000)?;
    println!(
        "Track for {}: {} fixes, {:.0}m in {}s",
        track.user_id,
        track.path.len(),
        track.distance,
        (track.end_time - track.start_time) / 1000
    );

    Ok(())
}
