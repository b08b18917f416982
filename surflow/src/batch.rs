//! # Sampled frame sequence analysis
//!
//! Decoded video is analysed one sampled frame pair at a time. Every pair is independent, so
//! pairs are processed in parallel and reported in sequence order.

use crate::config::FlowConfig;
use crate::error::{FlowError, FlowResult};
use crate::estimator::{analyse_flow, FlowAnalysis};
use crate::frame::Frame;
use crate::summary::{CompassDirection, FlowSummary};
use log::*;
use rayon::prelude::*;
use std::collections::HashMap;

/// Summary of one analysed frame pair.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct PairAnalysis {
    /// Index of the previous frame of the pair.
    pub index: usize,
    pub summary: FlowSummary,
}

/// Flow analysis of one frame pair, with its full field.
#[derive(Clone, Debug, PartialEq)]
pub struct PairFlow {
    /// Index of the previous frame of the pair.
    pub index: usize,
    pub analysis: FlowAnalysis,
}

impl PairFlow {
    pub fn summary(&self) -> PairAnalysis {
        PairAnalysis {
            index: self.index,
            summary: self.analysis.summary,
        }
    }
}

/// Analyse sampled consecutive frame pairs, keeping their flow fields.
///
/// Pairs `(frames[i], frames[i + 1])` are analysed for `i = 0, step, 2 * step, ...`. Any failing
/// pair fails the whole batch.
///
/// # Arguments
///
/// * `frames` - decoded frames in display order.
/// * `step` - sampling step, at least 1.
/// * `config` - estimation parameters.
pub fn analyse_sequence_flows(
    frames: &[Frame],
    step: usize,
    config: &FlowConfig,
) -> FlowResult<Vec<PairFlow>> {
    if step == 0 {
        return Err(FlowError::InvalidConfig(
            "sampling step must be at least 1".into(),
        ));
    }

    config.validate()?;

    let indices = (0..frames.len().saturating_sub(1))
        .step_by(step)
        .collect::<Vec<_>>();

    debug!(
        "Analysing {} frame pairs out of {} frames",
        indices.len(),
        frames.len()
    );

    indices
        .into_par_iter()
        .map(|index| {
            analyse_flow(&frames[index], &frames[index + 1], config)
                .map(|analysis| PairFlow { index, analysis })
        })
        .collect()
}

/// Analyse sampled consecutive frame pairs, keeping only their summaries.
///
/// Sampling and failure behave as in [`analyse_sequence_flows`].
pub fn analyse_sequence(
    frames: &[Frame],
    step: usize,
    config: &FlowConfig,
) -> FlowResult<Vec<PairAnalysis>> {
    Ok(analyse_sequence_flows(frames, step, config)?
        .iter()
        .map(PairFlow::summary)
        .collect())
}

/// Aggregate of a whole analysed sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct SequenceReport {
    pub pairs: usize,
    /// Mean of the per-pair average speeds.
    pub mean_speed: f32,
    /// Highest per-pair average speed.
    pub peak_speed: f32,
    /// Most frequent dominant direction among pairs with any motion. Ties go to the earliest
    /// sector in compass order.
    pub dominant_direction: Option<CompassDirection>,
}

impl SequenceReport {
    pub fn from_pairs(pairs: &[PairAnalysis]) -> Self {
        if pairs.is_empty() {
            return Self::default();
        }

        let speeds = pairs.iter().map(|p| p.summary.average_speed);
        let mean_speed = speeds.clone().sum::<f32>() / pairs.len() as f32;
        let peak_speed = speeds.fold(0f32, f32::max);

        let mut votes = HashMap::new();

        for dir in pairs
            .iter()
            .filter(|p| p.summary.is_moving())
            .map(|p| p.summary.dominant_direction)
        {
            *votes.entry(dir).or_insert(0usize) += 1;
        }

        let dominant_direction = CompassDirection::ALL
            .iter()
            .copied()
            .filter_map(|d| votes.get(&d).map(|&n| (d, n)))
            .fold(None, |best: Option<(CompassDirection, usize)>, (d, n)| match best {
                Some((_, bn)) if bn >= n => best,
                _ => Some((d, n)),
            })
            .map(|(d, _)| d);

        Self {
            pairs: pairs.len(),
            mean_speed,
            peak_speed,
            dominant_direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn frame(shift: usize) -> Frame {
        Frame::from_fn(32, 32, |x, y| {
            let v = ((((x + 32 - shift) as f32) * 0.5).sin() * 60.0
                + (y as f32 * 0.4).cos() * 60.0
                + 128.0) as u8;
            [v, v, v]
        })
        .unwrap()
    }

    fn pair(index: usize, speed: f32, dir: Option<CompassDirection>) -> PairAnalysis {
        PairAnalysis {
            index,
            summary: FlowSummary {
                average_speed: speed,
                flow_magnitude: speed,
                dominant_direction: dir.unwrap_or(CompassDirection::East),
                moving_cells: if dir.is_some() { 100 } else { 0 },
            },
        }
    }

    #[test]
    fn samples_every_step() {
        let frames = (0..6).map(frame).collect::<Vec<_>>();
        let config = FlowConfig {
            grid_size: 4,
            window_size: 7,
            ..Default::default()
        };

        let all = analyse_sequence(&frames, 1, &config).unwrap();
        assert_eq!(all.iter().map(|p| p.index).collect::<Vec<_>>(), [0, 1, 2, 3, 4]);

        let sampled = analyse_sequence(&frames, 2, &config).unwrap();
        assert_eq!(sampled.iter().map(|p| p.index).collect::<Vec<_>>(), [0, 2, 4]);
        assert_eq!(sampled[1], all[2]);

        assert!(analyse_sequence(&frames[..1], 1, &config).unwrap().is_empty());
        assert!(analyse_sequence(&frames, 0, &config).is_err());
    }

    #[test]
    fn flows_carry_fields_of_summaries() {
        let frames = (0..5).map(frame).collect::<Vec<_>>();
        let config = FlowConfig {
            grid_size: 4,
            window_size: 7,
            ..Default::default()
        };

        let flows = analyse_sequence_flows(&frames, 2, &config).unwrap();
        let pairs = analyse_sequence(&frames, 2, &config).unwrap();

        assert_eq!(flows.iter().map(PairFlow::summary).collect::<Vec<_>>(), pairs);

        for flow in &flows {
            let expected = analyse_flow(&frames[flow.index], &frames[flow.index + 1], &config).unwrap();
            assert_eq!(flow.analysis, expected);
            assert_eq!(flow.analysis.field.dim(), (4, 4));
        }
    }

    #[test]
    fn mismatch_fails_batch() {
        let mut frames = (0..3).map(frame).collect::<Vec<_>>();
        frames.push(Frame::from_fn(16, 16, |_, _| [0; 3]).unwrap());

        assert!(matches!(
            analyse_sequence(&frames, 1, &FlowConfig::default()),
            Err(FlowError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn report_aggregates() {
        let report = SequenceReport::from_pairs(&[
            pair(0, 1.0, Some(CompassDirection::West)),
            pair(1, 3.0, Some(CompassDirection::East)),
            pair(2, 2.0, Some(CompassDirection::West)),
            pair(3, 0.0, None),
        ]);

        assert_eq!(report.pairs, 4);
        assert_approx_eq!(report.mean_speed, 1.5);
        assert_eq!(report.peak_speed, 3.0);
        assert_eq!(report.dominant_direction, Some(CompassDirection::West));

        let tie = SequenceReport::from_pairs(&[
            pair(0, 1.0, Some(CompassDirection::South)),
            pair(1, 1.0, Some(CompassDirection::NorthEast)),
        ]);
        assert_eq!(tie.dominant_direction, Some(CompassDirection::NorthEast));

        let still = SequenceReport::from_pairs(&[pair(0, 0.0, None)]);
        assert_eq!(still.dominant_direction, None);

        assert_eq!(SequenceReport::from_pairs(&[]), SequenceReport::default());
    }
}
