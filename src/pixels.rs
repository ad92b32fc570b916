use crate::palette::to_color;
use crate::simulation::Grid;
use ratatui::style::Color;

/// Half-block rendering of the LED grid.
///
/// Each terminal cell draws two stacked LEDs with `▀`: the foreground color
/// is the upper LED, the background color the lower one. Terminal cells are
/// roughly twice as tall as they are wide, so this keeps the LEDs square.
pub const UPPER_HALF: char = '▀';

/// Color of an LED that is off
pub const UNLIT: Color = Color::Rgb(17, 17, 17);

/// A single rendered cell with position and both LED colors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelCell {
    pub x: u16,
    pub y: u16,
    pub top: Color,
    pub bottom: Color,
}

/// Largest square LED area (in terminal columns and rows) fitting the canvas
pub fn fit_square(canvas_width: u16, canvas_height: u16) -> (u16, u16) {
    let side = canvas_width.min(canvas_height.saturating_mul(2)) & !1;
    (side, side / 2)
}

/// Render `grid` into `cols` x `rows` terminal cells
pub fn render_to_cells(grid: &Grid, cols: u16, rows: u16) -> Vec<PixelCell> {
    if cols == 0 || rows == 0 {
        return Vec::new();
    }

    // Two LED rows per terminal row
    let scale_x = grid.width() as f32 / cols as f32;
    let scale_y = grid.height() as f32 / (rows as f32 * 2.0);

    let sample = |px: u16, py: u32| -> Color {
        let x = (px as f32 * scale_x) as usize;
        let y = (py as f32 * scale_y) as usize;
        grid.get(x, y).map(to_color).unwrap_or(UNLIT)
    };

    let mut cells = Vec::with_capacity(cols as usize * rows as usize);
    for cy in 0..rows {
        for cx in 0..cols {
            let top_row = cy as u32 * 2;
            cells.push(PixelCell {
                x: cx,
                y: cy,
                top: sample(cx, top_row),
                bottom: sample(cx, top_row + 1),
            });
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{MATRIX_HEIGHT, MATRIX_WIDTH, PALETTE};

    #[test]
    fn test_fit_square() {
        assert_eq!(fit_square(100, 20), (40, 20));
        assert_eq!(fit_square(30, 40), (30, 15));
        assert_eq!(fit_square(31, 40), (30, 15));
        assert_eq!(fit_square(0, 10), (0, 0));
    }

    #[test]
    fn test_exact_scale_maps_one_to_one() {
        let mut grid = Grid::new(MATRIX_WIDTH, MATRIX_HEIGHT);
        grid.paint_block(0, 1, 1, PALETTE[2]);
        grid.paint_block(63, 62, 1, PALETTE[5]);

        let cells = render_to_cells(&grid, 64, 32);
        assert_eq!(cells.len(), 64 * 32);

        let first = cells[0];
        assert_eq!(first.top, UNLIT);
        assert_eq!(first.bottom, to_color(PALETTE[2]));

        let last = cells[cells.len() - 1];
        assert_eq!((last.x, last.y), (63, 31));
        assert_eq!(last.top, to_color(PALETTE[5]));
        assert_eq!(last.bottom, UNLIT);
    }

    #[test]
    fn test_downscale_samples_grid() {
        let mut grid = Grid::new(MATRIX_WIDTH, MATRIX_HEIGHT);
        grid.paint_block(0, 0, 4, PALETTE[0]);
        let cells = render_to_cells(&grid, 16, 8);
        assert_eq!(cells[0].top, to_color(PALETTE[0]));
        assert!(cells[1..].iter().all(|c| c.top == UNLIT && c.bottom == UNLIT));
    }

    #[test]
    fn test_empty_area() {
        let grid = Grid::new(MATRIX_WIDTH, MATRIX_HEIGHT);
        assert!(render_to_cells(&grid, 0, 5).is_empty());
    }
}
