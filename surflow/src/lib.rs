//! # Surface Flow Estimation Library
//!
//! This library estimates a water-surface velocity field from pairs of video frames. Frames are
//! reduced to intensity, differentiated, and sampled on a fixed grid where each cell solves a
//! windowed least squares (Lucas-Kanade) system for its motion. Raw motion is then calibrated to
//! physical speed and summarised for reporting.
//!
//! The easiest way to use the library is to import its prelude:
//!
//! ```
//! use surflow::prelude::v1::*;
//!
//! let previous = Frame::from_fn(64, 64, |x, y| [(x * 4) as u8, (y * 4) as u8, 0]).unwrap();
//! let current = previous.clone();
//!
//! let analysis = analyse_flow(&previous, &current, &FlowConfig::default()).unwrap();
//!
//! assert_eq!(analysis.field.size(), 100);
//! assert_eq!(analysis.summary.average_speed, 0.0);
//! ```
//!
//! You may need [`nalgebra`](https://crates.io/crates/nalgebra) to make use of the functionality.

pub mod batch;
pub mod calibration;
pub mod config;
pub mod error;
pub mod estimator;
pub mod flow_field;
pub mod frame;
pub mod gradient;
pub mod grid;
pub mod live;
pub mod properties;
pub mod solver;
pub mod summary;
#[cfg(feature = "visualize")]
pub mod visualize;

pub mod prelude {
    pub mod v1 {
        pub use crate::{
            batch::{
                analyse_sequence, analyse_sequence_flows, PairAnalysis, PairFlow, SequenceReport,
            },
            calibration::VelocityCalibrator,
            config::{FlowConfig, LiveConfig},
            error::{FlowError, FlowResult},
            estimator::{
                analyse_flow, estimate_flow, FlowAnalysis, FlowEstimator, LucasKanadeEstimator,
            },
            flow_field::{FlowField, FlowVector, MotionEntry},
            frame::{Frame, IntensityField, RGBA},
            live::{FrameSource, LiveAnalysis, LiveUpdate},
            properties::{Properties, Property, PropertyMut},
            summary::{CompassDirection, FlowSummary},
        };
        #[cfg(feature = "visualize")]
        pub use crate::visualize::{render_overlay, speed_color, OverlayStyle};
        pub use anyhow::{anyhow, Error, Result};
    }
}
