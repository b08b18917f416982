//! # Periodic live analysis
//!
//! A background worker captures a frame on every tick and estimates flow against the frame
//! captured on the previous tick. Each estimation is independent, and failed captures only skip
//! their own cycle.

use crate::config::LiveConfig;
use crate::estimator::FlowEstimator;
use crate::frame::Frame;
use crate::summary::FlowSummary;
use anyhow::Result;
use log::*;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Supplier of live frames, such as a stream snapshot grabber.
pub trait FrameSource: Send + 'static {
    /// Capture the most recent frame.
    fn capture(&mut self) -> Result<Frame>;
}

impl<F: FnMut() -> Result<Frame> + Send + 'static> FrameSource for F {
    fn capture(&mut self) -> Result<Frame> {
        self()
    }
}

/// Result of one live cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct LiveUpdate {
    /// Tick that produced the update, starting from 0.
    pub cycle: usize,
    pub summary: FlowSummary,
}

struct Timer {
    start: Instant,
    target: Duration,
}

impl Default for Timer {
    fn default() -> Self {
        Self {
            start: Instant::now(),
            target: Default::default(),
        }
    }
}

impl Timer {
    /// Sleep until the target time, or until `signal` is cleared.
    fn sleep(&self, signal: &AtomicBool) {
        while signal.load(Ordering::Acquire) {
            match self.target.checked_sub(self.start.elapsed()) {
                Some(duration) if !duration.is_zero() => thread::park_timeout(duration),
                _ => break,
            }
        }
    }

    fn add(&mut self, duration: Duration) {
        self.target += duration;
    }
}

/// Handle to a running live analysis worker.
///
/// Dropping the handle stops the worker.
pub struct LiveAnalysis {
    updates: Receiver<LiveUpdate>,
    signal: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LiveAnalysis {
    /// Start analysing frames from `source`.
    ///
    /// The first frame is captured immediately, then one every `live.interval`.
    ///
    /// # Arguments
    ///
    /// * `source` - frame supplier.
    /// * `estimator` - estimator applied to every captured pair.
    /// * `live` - scheduling parameters.
    pub fn spawn(
        mut source: impl FrameSource,
        estimator: impl FlowEstimator + Send + 'static,
        live: LiveConfig,
    ) -> Self {
        let (tx, updates) = mpsc::channel();
        let signal = Arc::new(AtomicBool::new(true));

        let handle = Some({
            let signal = signal.clone();

            thread::spawn(move || {
                info!("Live analysis started, interval {:?}", live.interval);

                let mut timer = Timer::default();
                let mut previous: Option<Frame> = None;
                let mut cycle = 0;

                loop {
                    timer.sleep(&signal);

                    if !signal.load(Ordering::Acquire) {
                        break;
                    }

                    timer.add(live.interval);

                    match source.capture() {
                        Ok(frame) => {
                            let last = previous.replace(frame);

                            if let Some((last, current)) = last.as_ref().zip(previous.as_ref()) {
                                match estimator.analyse(last, current) {
                                    Ok(analysis) => {
                                        let update = LiveUpdate {
                                            cycle,
                                            summary: analysis.summary,
                                        };

                                        if tx.send(update).is_err() {
                                            break;
                                        }
                                    }
                                    Err(e) => warn!("Skipping live cycle {}: {}", cycle, e),
                                }
                            }
                        }
                        Err(e) => warn!("Skipping live cycle {}: capture failed: {}", cycle, e),
                    }

                    cycle += 1;
                }

                info!("Live analysis stopped after {} cycles", cycle);
            })
        });

        Self {
            updates,
            signal,
            handle,
        }
    }

    /// Wait for the next update.
    ///
    /// Returns `None` on timeout, or if the worker has stopped.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<LiveUpdate> {
        self.updates.recv_timeout(timeout).ok()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// Stop the schedule.
    ///
    /// No capture starts after this returns. An estimation that is already running is allowed to
    /// complete first.
    pub fn stop(&mut self) {
        self.signal.store(false, Ordering::Release);

        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

impl Drop for LiveAnalysis {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlowConfig;
    use crate::estimator::LucasKanadeEstimator;
    use anyhow::anyhow;
    use std::sync::atomic::AtomicUsize;

    fn textured(shift: usize) -> Frame {
        Frame::from_fn(48, 48, |x, y| {
            let v = ((((x + 48 - shift % 48) as f32) * 0.4).sin() * 50.0
                + (y as f32 * 0.3).cos() * 50.0
                + 128.0) as u8;
            [v, v, v]
        })
        .unwrap()
    }

    fn fast() -> LiveConfig {
        LiveConfig {
            interval: Duration::from_millis(5),
        }
    }

    fn small() -> LucasKanadeEstimator {
        LucasKanadeEstimator::new(FlowConfig {
            grid_size: 4,
            window_size: 9,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn publishes_updates() {
        let mut n = 0;
        let source = move || -> Result<Frame> {
            n += 1;
            Ok(textured(n))
        };

        let live = LiveAnalysis::spawn(source, small(), fast());

        let first = live.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = live.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(first.cycle, 1);
        assert!(second.cycle > first.cycle);
        assert!(first.summary.average_speed > 0.0);
        assert!(live.is_running());
    }

    #[test]
    fn failed_captures_skip_cycles() {
        let mut n = 0;
        let source = move || -> Result<Frame> {
            n += 1;
            if n % 3 == 0 {
                Err(anyhow!("no frame"))
            } else {
                Ok(textured(n))
            }
        };

        let live = LiveAnalysis::spawn(source, small(), fast());

        let updates = (0..4)
            .filter_map(|_| live.recv_timeout(Duration::from_secs(5)))
            .collect::<Vec<_>>();

        assert_eq!(updates.len(), 4);
        // Capture 3 (cycle 2) failed, so cycle 3 pairs frames 2 and 4.
        assert!(updates.iter().all(|u| u.cycle != 2));
    }

    #[test]
    fn stop_prevents_further_captures() {
        let captures = Arc::new(AtomicUsize::new(0));

        let source = {
            let captures = captures.clone();
            move || -> Result<Frame> {
                let n = captures.fetch_add(1, Ordering::SeqCst);
                Ok(textured(n))
            }
        };

        let mut live = LiveAnalysis::spawn(source, small(), fast());
        live.recv_timeout(Duration::from_secs(5)).unwrap();
        live.stop();

        assert!(!live.is_running());

        let after_stop = captures.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(captures.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn stop_interrupts_long_interval() {
        let live_config = LiveConfig {
            interval: Duration::from_secs(3600),
        };

        let mut live =
            LiveAnalysis::spawn(|| -> Result<Frame> { Ok(textured(0)) }, small(), live_config);

        let start = Instant::now();
        thread::sleep(Duration::from_millis(20));
        live.stop();

        assert!(start.elapsed() < Duration::from_secs(60));
        assert_eq!(live.recv_timeout(Duration::from_millis(10)), None);
    }
}
