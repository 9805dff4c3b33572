// Spectrum bars - squash analyser bins into a handful of averaged columns
// Renderer agnostic: the TUI scales `heights` to whatever space it has.

use crate::config::VisualizationConfig;

/// One animation frame of bar values
#[derive(Debug, Clone, PartialEq)]
pub enum VisualizationFrame {
    /// Nothing is playing; draw `bars` resting columns
    Flat { bars: usize },
    /// Averaged magnitudes, 0.0..=255.0
    Live(Vec<f32>),
}

impl VisualizationFrame {
    pub fn bar_count(&self) -> usize {
        match self {
            VisualizationFrame::Flat { bars } => *bars,
            VisualizationFrame::Live(values) => values.len(),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, VisualizationFrame::Live(_))
    }

    /// Scale to renderer units. Flat frames rest at `min_visible`; live
    /// values scale from zero, so silence while playing draws empty bars.
    pub fn heights(&self, max: u64, min_visible: u64) -> Vec<u64> {
        match self {
            VisualizationFrame::Flat { bars } => vec![min_visible; *bars],
            VisualizationFrame::Live(values) => values
                .iter()
                .map(|v| (v.clamp(0.0, 255.0) / 255.0 * max as f32).round() as u64)
                .collect(),
        }
    }
}

impl Default for VisualizationFrame {
    fn default() -> Self {
        VisualizationFrame::Flat { bars: 0 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VisualizationSampler {
    group_size: usize,
}

impl VisualizationSampler {
    pub fn new(config: &VisualizationConfig) -> Self {
        Self {
            group_size: config.group_size.max(1),
        }
    }

    /// ceil(bins / group_size)
    pub fn bar_count(&self, bins: usize) -> usize {
        bins.div_ceil(self.group_size)
    }

    pub fn flat(&self, bins: usize) -> VisualizationFrame {
        VisualizationFrame::Flat {
            bars: self.bar_count(bins),
        }
    }

    /// Each bar is its group's sum over the full group size, so a short
    /// trailing group reads lower as if padded with zeros.
    pub fn sample(&self, raw: &[u8], playing: bool) -> VisualizationFrame {
        if !playing {
            return self.flat(raw.len());
        }
        let group = self.group_size as f32;
        VisualizationFrame::Live(
            raw.chunks(self.group_size)
                .map(|chunk| chunk.iter().map(|&b| b as f32).sum::<f32>() / group)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler(group_size: usize) -> VisualizationSampler {
        VisualizationSampler::new(&VisualizationConfig { group_size })
    }

    #[test]
    fn bars_are_group_averages() {
        let raw: Vec<u8> = vec![8, 8, 8, 8, 0, 0, 4, 4];
        let frame = sampler(4).sample(&raw, true);
        assert_eq!(frame, VisualizationFrame::Live(vec![8.0, 2.0]));
    }

    #[test]
    fn partial_group_is_divided_by_full_size() {
        let raw: Vec<u8> = vec![10; 10];
        let frame = sampler(4).sample(&raw, true);
        assert_eq!(frame, VisualizationFrame::Live(vec![10.0, 10.0, 5.0]));
        assert_eq!(sampler(4).bar_count(10), 3);
    }

    #[test]
    fn silence_while_playing_is_not_the_flat_signal() {
        let raw = vec![0u8; 256];
        let live = sampler(8).sample(&raw, true);
        let idle = sampler(8).sample(&raw, false);

        assert_eq!(live, VisualizationFrame::Live(vec![0.0; 32]));
        assert_eq!(idle, VisualizationFrame::Flat { bars: 32 });
        assert_ne!(live, idle);
        assert!(live.is_live() && !idle.is_live());
    }

    #[test]
    fn heights_scale_live_values_from_zero() {
        let frame = VisualizationFrame::Live(vec![0.0, 127.5, 255.0, 300.0]);
        assert_eq!(frame.heights(100, 2), vec![0, 50, 100, 100]);

        let flat = VisualizationFrame::Flat { bars: 3 };
        assert_eq!(flat.heights(100, 2), vec![2, 2, 2]);
    }

    #[test]
    fn silent_live_frame_draws_lower_than_resting_frame() {
        let sampler = sampler(8);
        let silent = sampler.sample(&[0u8; 32], true).heights(100, 2);
        let resting = sampler.sample(&[0u8; 32], false).heights(100, 2);

        assert_eq!(silent, vec![0; 4]);
        assert_eq!(resting, vec![2; 4]);
    }
}
