//! Waveform buffer and post-processing helpers

/// Headroom applied after peak normalization so the loudest sample sits
/// just under full scale.
pub const DEFAULT_HEADROOM: f32 = 0.98;

/// In-memory synthesized audio.
///
/// Samples are nominally in [-1.0, 1.0] but the acoustic model may overshoot,
/// so consumers must not assume the range holds until [`Waveform::peak_normalize`]
/// has been applied.
#[derive(Clone, PartialEq)]
pub struct Waveform {
    /// Mono f32 samples
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl std::fmt::Debug for Waveform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waveform")
            .field("samples_len", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("duration_ms", &self.duration_ms())
            .finish()
    }
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }

    /// Largest absolute sample value (0.0 for an empty buffer)
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    /// Scale so the peak is exactly 1.0, then by `headroom`.
    ///
    /// A silent buffer (peak 0) is only scaled by `headroom`.
    pub fn peak_normalize(&mut self, headroom: f32) {
        let peak = self.peak();
        let gain = if peak > 0.0 { headroom / peak } else { headroom };
        for sample in self.samples.iter_mut() {
            *sample *= gain;
        }
    }

    /// Convert to 16-bit PCM, clipping anything outside [-1.0, 1.0].
    pub fn to_pcm16(&self) -> Vec<i16> {
        self.samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_normalize_scales_to_headroom() {
        let mut wav = Waveform::new(vec![0.25, -0.5, 0.1], 22050);
        wav.peak_normalize(DEFAULT_HEADROOM);

        assert!((wav.peak() - 0.98).abs() < 1e-6);
        assert!((wav.samples[0] - 0.49).abs() < 1e-6);
        assert!((wav.samples[1] + 0.98).abs() < 1e-6);
    }

    #[test]
    fn test_peak_normalize_tames_overshoot() {
        let mut wav = Waveform::new(vec![2.0, -1.0], 22050);
        wav.peak_normalize(DEFAULT_HEADROOM);
        assert!((wav.samples[0] - 0.98).abs() < 1e-6);
        assert!((wav.samples[1] + 0.49).abs() < 1e-6);
    }

    #[test]
    fn test_peak_normalize_silence() {
        let mut wav = Waveform::new(vec![0.0; 4], 22050);
        wav.peak_normalize(DEFAULT_HEADROOM);
        assert!(wav.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_to_pcm16_clips() {
        let wav = Waveform::new(vec![1.5, -1.5, 0.0, 1.0], 22050);
        assert_eq!(wav.to_pcm16(), vec![32767, -32767, 0, 32767]);
    }

    #[test]
    fn test_duration() {
        let wav = Waveform::new(vec![0.0; 11025], 22050);
        assert_eq!(wav.duration_ms(), 500);
        assert_eq!(Waveform::new(vec![0.0; 10], 0).duration_ms(), 0);
    }
}
