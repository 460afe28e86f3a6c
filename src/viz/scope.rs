//! Oscilloscope widget for ratatui

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    widgets::{Block, Widget},
};

/// A widget that draws the recent output waveform as a min/max envelope.
pub struct Scope<'a> {
    samples: &'a [f32],
    style: Style,
    block: Option<Block<'a>>,
}

impl<'a> Scope<'a> {
    pub fn new(samples: &'a [f32]) -> Self {
        Self {
            samples,
            style: Style::default(),
            block: None,
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Min/max of the samples that fall into one column.
    fn column_extent(&self, column: usize, width: usize) -> (f32, f32) {
        let per_column = self.samples.len() as f32 / width as f32;
        let start = (column as f32 * per_column) as usize;
        let end = (((column + 1) as f32 * per_column) as usize).min(self.samples.len());

        let mut min = 0.0f32;
        let mut max = 0.0f32;
        for &sample in &self.samples[start..end.max(start)] {
            min = min.min(sample);
            max = max.max(sample);
        }
        (min, max)
    }

    fn render_scope(&self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 || self.samples.is_empty() {
            return;
        }

        let height = area.height as usize;
        let half = height as f32 / 2.0;

        for column in 0..area.width as usize {
            let (min, max) = self.column_extent(column, area.width as usize);

            // Map -1..1 to bottom..top rows of the area.
            let top_row = ((1.0 - max.clamp(-1.0, 1.0)) * half) as u16;
            let bottom_row = ((1.0 - min.clamp(-1.0, 1.0)) * half) as u16;

            let x = area.x + column as u16;
            for row in top_row..=bottom_row.min(area.height.saturating_sub(1)) {
                buf.set_string(x, area.y + row, "█", self.style);
            }
        }
    }
}

impl Widget for Scope<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };

        self.render_scope(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_input_draws_only_the_center() {
        let samples = vec![0.0f32; 64];
        let scope = Scope::new(&samples);
        let area = Rect::new(0, 0, 16, 8);
        let mut buf = Buffer::empty(area);
        scope.render(area, &mut buf);

        // Zero maps to the middle row; only one row per column is drawn.
        let mut drawn_rows = std::collections::HashSet::new();
        for y in 0..8u16 {
            for x in 0..16u16 {
                if buf[(x, y)].symbol() == "█" {
                    drawn_rows.insert(y);
                }
            }
        }
        assert_eq!(drawn_rows.len(), 1);
    }

    #[test]
    fn full_scale_input_fills_the_column() {
        let samples: Vec<f32> = (0..64).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let scope = Scope::new(&samples);
        let area = Rect::new(0, 0, 8, 6);
        let mut buf = Buffer::empty(area);
        scope.render(area, &mut buf);

        for y in 0..6u16 {
            assert_eq!(buf[(0, y)].symbol(), "█", "row {} not drawn", y);
        }
    }

    #[test]
    fn empty_samples_render_nothing() {
        let samples: Vec<f32> = Vec::new();
        let scope = Scope::new(&samples);
        let area = Rect::new(0, 0, 8, 4);
        let mut buf = Buffer::empty(area);
        scope.render(area, &mut buf);

        for y in 0..4u16 {
            for x in 0..8u16 {
                assert_eq!(buf[(x, y)].symbol(), " ");
            }
        }
    }
}
