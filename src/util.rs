use ratatui::{buffer::Buffer, layout::Rect, style::Color};

pub fn fill_bg(buf: &mut Buffer, area: Rect, color: Color) {
    let area = area.intersection(buf.area);
    for x in area.left()..area.right() {
        for y in area.top()..area.bottom() {
            buf[(x, y)].set_bg(color);
        }
    }
}

pub fn pad<S: AsRef<str>>(s: S, pad: usize) -> String {
    let s = s.as_ref();
    let spaces = " ".repeat(pad);
    format!("{spaces}{s}{spaces}")
}

/// A `width` x `height` rect centred in `area`, shrunk to fit.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_fits_inside() {
        let area = Rect::new(0, 0, 80, 24);
        assert_eq!(centered(area, 40, 10), Rect::new(20, 7, 40, 10));
        assert_eq!(centered(area, 100, 30), area);
    }

    #[test]
    fn pad_surrounds_text() {
        assert_eq!(pad("Help", 2), "  Help  ");
    }
}
