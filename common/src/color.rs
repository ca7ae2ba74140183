use serde::{Deserialize, Serialize};

/// The three color-temperature presets the panel cycles through, in
/// fixed warm -> neutral -> cool order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorTempPresets {
    pub warm_k: u32,
    pub neutral_k: u32,
    pub cool_k: u32,
}

impl Default for ColorTempPresets {
    fn default() -> Self {
        Self {
            warm_k: 2_700,
            neutral_k: 4_000,
            cool_k: 6_000,
        }
    }
}

impl ColorTempPresets {
    pub fn sanitize(&mut self) {
        self.warm_k = self.warm_k.clamp(1_000, 10_000);
        self.neutral_k = self.neutral_k.clamp(1_000, 10_000);
        self.cool_k = self.cool_k.clamp(1_000, 10_000);
    }

    fn as_array(self) -> [u32; 3] {
        [self.warm_k, self.neutral_k, self.cool_k]
    }

    /// The preset following the one nearest to `current_k`, wrapping
    /// from cool back to warm. Ties go to the earlier preset.
    pub fn next_after(self, current_k: u32) -> u32 {
        let presets = self.as_array();
        let mut nearest = 0;
        for (index, preset) in presets.iter().enumerate() {
            if current_k.abs_diff(*preset) < current_k.abs_diff(presets[nearest]) {
                nearest = index;
            }
        }
        presets[(nearest + 1) % presets.len()]
    }
}
