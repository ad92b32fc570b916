use crate::palette::{self, PALETTE, PALETTE_LEN};
use serde::{Deserialize, Serialize};

pub const NUM_SPARKLES_MIN: u32 = 1;
pub const NUM_SPARKLES_MAX: u32 = 200;
pub const SPARKLE_SIZE_MIN: u32 = 1;
pub const SPARKLE_SIZE_MAX: u32 = 10;
/// Tick interval bounds in milliseconds (lower is faster)
pub const SPEED_MIN: u32 = 10;
pub const SPEED_MAX: u32 = 500;

/// The full set of user-adjustable sparkle parameters.
///
/// `speed` is the raw tick interval in milliseconds, the same value the
/// device receives on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub active_colors: Vec<bool>,
    pub num_sparkles: u32,
    pub sparkle_size: u32,
    pub speed: u32,
}

impl Default for Configuration {
    fn default() -> Self {
        let mut active_colors = vec![false; PALETTE_LEN];
        active_colors[0] = true;
        Self {
            active_colors,
            num_sparkles: 150,
            sparkle_size: 3,
            speed: 40,
        }
    }
}

impl Configuration {
    /// Build a configuration from a set of packed RGB colors (order ignored,
    /// colors outside the palette dropped)
    pub fn from_colors(colors: &[u32], num_sparkles: u32, sparkle_size: u32, speed: u32) -> Self {
        let mut active_colors = vec![false; PALETTE_LEN];
        for index in colors.iter().filter_map(|&rgb| palette::index_of(rgb)) {
            active_colors[index] = true;
        }
        Self {
            active_colors,
            num_sparkles,
            sparkle_size,
            speed,
        }
        .normalized()
    }

    /// Packed RGB values of the active palette entries, in palette order
    pub fn colors(&self) -> Vec<u32> {
        self.active_indices().into_iter().map(|i| PALETTE[i]).collect()
    }

    pub fn active_indices(&self) -> Vec<usize> {
        self.active_colors
            .iter()
            .enumerate()
            .filter(|(_, &active)| active)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.active_colors.iter().filter(|&&a| a).count()
    }

    /// Clamp every field into its domain and restore the at-least-one-color
    /// invariant
    pub fn normalized(mut self) -> Self {
        self.active_colors.resize(PALETTE_LEN, false);
        if self.active_count() == 0 {
            self.active_colors[0] = true;
        }
        self.num_sparkles = self.num_sparkles.clamp(NUM_SPARKLES_MIN, NUM_SPARKLES_MAX);
        self.sparkle_size = self.sparkle_size.clamp(SPARKLE_SIZE_MIN, SPARKLE_SIZE_MAX);
        self.speed = self.speed.clamp(SPEED_MIN, SPEED_MAX);
        self
    }

    /// Flip one palette entry. Turning off the last active color leaves it on.
    /// Returns whether anything changed.
    pub fn toggle_color(&mut self, index: usize) -> bool {
        let Some(&active) = self.active_colors.get(index) else {
            return false;
        };
        if active && self.active_count() == 1 {
            return false;
        }
        self.active_colors[index] = !active;
        true
    }

    pub fn set_num_sparkles(&mut self, value: u32) -> bool {
        let value = value.clamp(NUM_SPARKLES_MIN, NUM_SPARKLES_MAX);
        std::mem::replace(&mut self.num_sparkles, value) != value
    }

    pub fn set_sparkle_size(&mut self, value: u32) -> bool {
        let value = value.clamp(SPARKLE_SIZE_MIN, SPARKLE_SIZE_MAX);
        std::mem::replace(&mut self.sparkle_size, value) != value
    }

    pub fn set_speed(&mut self, value: u32) -> bool {
        let value = value.clamp(SPEED_MIN, SPEED_MAX);
        std::mem::replace(&mut self.speed, value) != value
    }

    /// Short human summary used in the preset list
    pub fn summary(&self) -> String {
        let names: Vec<&str> = self
            .active_indices()
            .into_iter()
            .map(|i| palette::PALETTE_NAMES[i])
            .collect();
        format!(
            "{} x{} size {} {}ms",
            names.join("/"),
            self.num_sparkles,
            self.sparkle_size,
            self.speed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(index: usize) -> Configuration {
        let mut config = Configuration::default();
        config.active_colors = vec![false; PALETTE_LEN];
        config.active_colors[index] = true;
        config
    }

    #[test]
    fn test_toggle_last_active_color_is_noop() {
        for i in 0..PALETTE_LEN {
            let mut config = single(i);
            let before = config.active_colors.clone();
            assert!(!config.toggle_color(i));
            assert_eq!(config.active_colors, before);
        }
    }

    #[test]
    fn test_toggle_adds_and_removes() {
        let mut config = single(0);
        assert!(config.toggle_color(3));
        assert_eq!(config.active_indices(), vec![0, 3]);
        assert!(config.toggle_color(0));
        assert_eq!(config.active_indices(), vec![3]);
    }

    #[test]
    fn test_toggle_out_of_range() {
        let mut config = Configuration::default();
        assert!(!config.toggle_color(PALETTE_LEN));
    }

    #[test]
    fn test_from_colors_ignores_order_and_unknown() {
        let a = Configuration::from_colors(&[0x0000ff, 0xff0000, 0x424242], 10, 2, 50);
        let b = Configuration::from_colors(&[0xff0000, 0x0000ff], 10, 2, 50);
        assert_eq!(a, b);
        assert_eq!(a.active_indices(), vec![0, 5]);
    }

    #[test]
    fn test_normalized_clamps_and_reactivates() {
        let config = Configuration {
            active_colors: vec![false; 3],
            num_sparkles: 0,
            sparkle_size: 99,
            speed: 5000,
        }
        .normalized();
        assert_eq!(config.active_colors.len(), PALETTE_LEN);
        assert_eq!(config.active_indices(), vec![0]);
        assert_eq!(config.num_sparkles, NUM_SPARKLES_MIN);
        assert_eq!(config.sparkle_size, SPARKLE_SIZE_MAX);
        assert_eq!(config.speed, SPEED_MAX);
    }

    #[test]
    fn test_setters_report_change() {
        let mut config = Configuration::default();
        assert!(!config.set_sparkle_size(3));
        assert!(config.set_sparkle_size(5));
        assert!(config.set_num_sparkles(500));
        assert_eq!(config.num_sparkles, NUM_SPARKLES_MAX);
        assert!(!config.set_num_sparkles(NUM_SPARKLES_MAX));
    }

    #[test]
    fn test_storage_keys_are_camel_case() {
        let json = serde_json::to_value(Configuration::default()).unwrap();
        assert!(json.get("activeColors").is_some());
        assert_eq!(json["numSparkles"], 150);
        assert_eq!(json["sparkleSize"], 3);
        assert_eq!(json["speed"], 40);
    }
}
