use ratatui::style::Color;

/// Number of entries in the sparkle palette
pub const PALETTE_LEN: usize = 12;

/// Fixed sparkle palette, in the order the device and presets index it
pub const PALETTE: [u32; PALETTE_LEN] = [
    0xff0000, // Red
    0xff8000, // Orange
    0xffff00, // Yellow
    0x00ff00, // Green
    0x00ffff, // Cyan
    0x0000ff, // Blue
    0x8000ff, // Purple
    0xff00ff, // Magenta
    0xffffff, // White
    0xff69b4, // Hot Pink
    0xdda0dd, // Plum
    0xffd700, // Gold
];

pub const PALETTE_NAMES: [&str; PALETTE_LEN] = [
    "Red", "Orange", "Yellow", "Green", "Cyan", "Blue", "Purple", "Magenta", "White", "Hot Pink",
    "Plum", "Gold",
];

/// Matrix dimensions in LEDs
pub const MATRIX_WIDTH: usize = 64;
pub const MATRIX_HEIGHT: usize = 64;

/// Index of a packed RGB value in the palette
pub fn index_of(rgb: u32) -> Option<usize> {
    PALETTE.iter().position(|&c| c == rgb)
}

/// Convert a packed 0xRRGGBB value to a terminal color
pub fn to_color(rgb: u32) -> Color {
    Color::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}
