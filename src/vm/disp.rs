use tui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

const COLOR_ON: Color = Color::White;
const COLOR_OFF: Color = Color::Black;

// Each u64 is one display row, the left-most pixel in the most significant
// bit. XOR-blitting a sprite row is then a single rotate and xor.
type DisplayBuffer = [u64; DISPLAY_HEIGHT];

/// 64×32 monochrome framebuffer.
///
/// Only `clear` and `draw` mutate it; both raise the redraw flag, which the
/// renderer consumes through `take_redraw` once per frame.
pub struct Display {
    buffer: DisplayBuffer,
    redraw: bool,
}

impl Default for Display {
    fn default() -> Self {
        // redraw starts raised so the first frame is drawn
        Display {
            buffer: [0; DISPLAY_HEIGHT],
            redraw: true,
        }
    }
}

impl Display {
    pub fn clear(&mut self) {
        self.buffer = [0; DISPLAY_HEIGHT];
        self.redraw = true;
    }

    /// XOR-blits an 8-pixel-wide sprite at (pos_x, pos_y), wrapping modulo
    /// the display dimensions, and reports whether any lit pixel was unlit.
    pub fn draw(&mut self, sprite: &[u8], pos_x: u8, pos_y: u8) -> bool {
        let shift = (pos_x as usize % DISPLAY_WIDTH) as u32;

        let mut collision = false;
        for (i, &byte) in sprite.iter().enumerate() {
            let row = &mut self.buffer[(pos_y as usize + i) % DISPLAY_HEIGHT];
            let sprite_row = ((byte as u64) << (DISPLAY_WIDTH - 8)).rotate_right(shift);
            collision |= *row & sprite_row != 0;
            *row ^= sprite_row;
        }

        self.redraw = true;
        collision
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.buffer[y] >> (DISPLAY_WIDTH - 1 - x) & 1 == 1
    }

    /// Returns and clears the redraw flag in one read, so a second read
    /// before the next mutation reports false.
    pub fn take_redraw(&mut self) -> bool {
        let redraw = self.redraw;
        self.redraw = false;
        redraw
    }
}

pub struct DisplayWidget<'a> {
    pub display: &'a Display,
}

impl Widget for DisplayWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // each terminal cell covers a vertical pair of pixels: the cell
        // background is the top pixel and a lower-half block (▄) in the
        // foreground color is the bottom pixel
        let width = (area.width as usize).min(DISPLAY_WIDTH);
        let height = (2 * area.height as usize).min(DISPLAY_HEIGHT);

        for y in (0..height).step_by(2) {
            for x in 0..width {
                let top = self.display.pixel(x, y);
                let bottom = y + 1 < height && self.display.pixel(x, y + 1);

                buf.get_mut(area.left() + x as u16, area.top() + y as u16 / 2)
                    .set_bg(if top { COLOR_ON } else { COLOR_OFF })
                    .set_fg(if bottom { COLOR_ON } else { COLOR_OFF })
                    .set_symbol("▄");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redraw_flag_is_one_shot() {
        let mut display = Display::default();
        assert!(display.take_redraw());
        assert!(!display.take_redraw());

        display.draw(&[0x80], 0, 0);
        assert!(display.take_redraw());
        assert!(!display.take_redraw());

        display.clear();
        assert!(display.take_redraw());
        assert!(!display.take_redraw());
    }

    #[test]
    fn draw_sets_pixels_msb_first() {
        let mut display = Display::default();
        assert!(!display.draw(&[0b1010_0000], 4, 2));
        assert!(display.pixel(4, 2));
        assert!(!display.pixel(5, 2));
        assert!(display.pixel(6, 2));
        assert!(!display.pixel(7, 2));
    }

    #[test]
    fn overlapping_draw_reports_collision() {
        let mut display = Display::default();
        assert!(!display.draw(&[0xFF], 0, 0));
        // one shared pixel is enough
        assert!(display.draw(&[0x80], 7, 0));
        assert!(!display.pixel(7, 0));
        assert!(display.pixel(6, 0));
    }

    #[test]
    fn coordinates_wrap() {
        let mut display = Display::default();
        display.draw(&[0xFF, 0xFF], 62, 31);
        for y in [31, 0] {
            for x in [62, 63, 0, 1, 2, 3, 4, 5] {
                assert!(display.pixel(x, y), "pixel ({x}, {y})");
            }
            assert!(!display.pixel(6, y));
            assert!(!display.pixel(61, y));
        }
    }

    #[test]
    fn clear_zeroes_every_row() {
        let mut display = Display::default();
        display.draw(&[0xFF; 15], 0, 0);
        display.draw(&[0xFF; 15], 32, 17);
        display.clear();
        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                assert!(!display.pixel(x, y));
            }
        }
    }
}
