//! Page-organized pixel buffers
//!
//! Holds the frame being drawn (`current`) next to the frame the controller
//! last received (`last_sent`). Both are laid out the way the controller's
//! RAM is: one byte per column per 8-pixel page, LSB at the top.

use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use crate::error::DisplayError;

/// Drawn and last-transmitted pixel buffers
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    pages: u16,
    current: Vec<u8>,
    last_sent: Vec<u8>,
    /// Set whenever `current` changes; consumed by the synchronizer
    mutated: bool,
}

impl FrameBuffer {
    /// Allocate a zeroed buffer pair for a `width` x `height` panel
    pub fn new(width: u16, height: u16) -> Result<Self, DisplayError> {
        if width == 0 || height == 0 {
            return Err(DisplayError::InvalidDimensions);
        }

        let pages = height.div_ceil(8);
        let len = width as usize * pages as usize;

        let mut current = Vec::new();
        let mut last_sent = Vec::new();
        current
            .try_reserve_exact(len)
            .map_err(|_| DisplayError::OutOfMemory)?;
        last_sent
            .try_reserve_exact(len)
            .map_err(|_| DisplayError::OutOfMemory)?;
        current.resize(len, 0);
        last_sent.resize(len, 0);

        Ok(Self {
            width,
            height,
            pages,
            current,
            last_sent,
            mutated: false,
        })
    }

    /// Panel width in pixels
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Panel height in pixels
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Number of 8-pixel pages
    pub fn pages(&self) -> u16 {
        self.pages
    }

    /// Bytes per buffer
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Whether the buffer holds no bytes (never true for a constructed buffer)
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// The frame being drawn
    pub fn current(&self) -> &[u8] {
        &self.current
    }

    /// The frame the controller last received
    pub fn last_sent(&self) -> &[u8] {
        &self.last_sent
    }

    /// Set or clear a single pixel. Out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: u16, y: u16, on: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.index(y / 8, x);
        let bit = 1u8 << (y % 8);
        let byte = if on {
            self.current[idx] | bit
        } else {
            self.current[idx] & !bit
        };
        self.write_byte(idx, byte);
    }

    /// Read a pixel from the drawn frame
    pub fn pixel(&self, x: u16, y: u16) -> Option<bool> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.index(y / 8, x);
        Some(self.current[idx] & (1 << (y % 8)) != 0)
    }

    /// Set every pixel of the drawn frame
    pub fn fill(&mut self, on: bool) {
        let value = if on { 0xFF } else { 0x00 };
        if self.current.iter().any(|&b| b != value) {
            self.current.fill(value);
            self.mutated = true;
        }
    }

    /// Whether the controller shows exactly what was drawn
    pub fn is_synced(&self) -> bool {
        self.current == self.last_sent
    }

    /// Number of bytes that differ between drawn and transmitted frames
    pub fn dirty_bytes(&self) -> usize {
        self.current
            .iter()
            .zip(self.last_sent.iter())
            .filter(|(a, b)| a != b)
            .count()
    }

    /// Byte index of `column` within `page`
    pub(crate) fn index(&self, page: u16, column: u16) -> usize {
        page as usize * self.width as usize + column as usize
    }

    pub(crate) fn is_dirty(&self, idx: usize) -> bool {
        self.current[idx] != self.last_sent[idx]
    }

    /// Drawn bytes of `page` in `start..end`
    pub(crate) fn run(&self, page: u16, start: u16, end: u16) -> &[u8] {
        let base = self.index(page, 0);
        &self.current[base + start as usize..base + end as usize]
    }

    /// Record that `page` columns `start..end` reached the controller
    pub(crate) fn mark_sent(&mut self, page: u16, start: u16, end: u16) {
        let base = self.index(page, 0);
        let range = base + start as usize..base + end as usize;
        self.last_sent[range.clone()].copy_from_slice(&self.current[range]);
    }

    /// Forget that the controller holds anything but zeroes
    pub(crate) fn reset_last_sent(&mut self) {
        self.last_sent.fill(0);
        if !self.is_synced() {
            self.mutated = true;
        }
    }

    /// Return and clear the mutation flag
    pub(crate) fn take_mutated(&mut self) -> bool {
        core::mem::take(&mut self.mutated)
    }

    fn write_byte(&mut self, idx: usize, byte: u8) {
        if self.current[idx] != byte {
            self.current[idx] = byte;
            self.mutated = true;
        }
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let (Ok(x), Ok(y)) = (u16::try_from(point.x), u16::try_from(point.y)) {
                self.set_pixel(x, y, color.is_on());
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color.is_on());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    #[test]
    fn test_allocation_size() {
        let fb = FrameBuffer::new(128, 64).unwrap();
        assert_eq!(fb.len(), 1024);
        assert_eq!(fb.pages(), 8);
        assert!(fb.is_synced());

        // Partial pages round up
        let fb = FrameBuffer::new(10, 12).unwrap();
        assert_eq!(fb.len(), 20);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert_eq!(
            FrameBuffer::new(0, 64).unwrap_err(),
            DisplayError::InvalidDimensions
        );
    }

    #[test]
    fn test_pixel_layout() {
        let mut fb = FrameBuffer::new(16, 16).unwrap();
        fb.set_pixel(3, 9, true);

        // Page 1, column 3, bit 1
        assert_eq!(fb.current()[16 + 3], 0b0000_0010);
        assert_eq!(fb.pixel(3, 9), Some(true));
        assert_eq!(fb.pixel(3, 8), Some(false));
        assert_eq!(fb.dirty_bytes(), 1);
    }

    #[test]
    fn test_out_of_range_ignored() {
        let mut fb = FrameBuffer::new(16, 16).unwrap();
        fb.set_pixel(16, 0, true);
        fb.set_pixel(0, 16, true);
        assert!(fb.is_synced());
        assert!(!fb.take_mutated());
        assert_eq!(fb.pixel(16, 0), None);
    }

    #[test]
    fn test_mutation_flag_only_on_change() {
        let mut fb = FrameBuffer::new(16, 16).unwrap();
        fb.set_pixel(0, 0, false);
        assert!(!fb.take_mutated());

        fb.set_pixel(0, 0, true);
        assert!(fb.take_mutated());
        assert!(!fb.take_mutated());

        fb.fill(false);
        assert!(fb.take_mutated());
        fb.fill(false);
        assert!(!fb.take_mutated());
    }

    #[test]
    fn test_mark_sent_copies_run() {
        let mut fb = FrameBuffer::new(16, 16).unwrap();
        fb.set_pixel(2, 0, true);
        fb.set_pixel(5, 0, true);
        fb.mark_sent(0, 0, 4);
        assert_eq!(fb.dirty_bytes(), 1);
        fb.mark_sent(0, 4, 16);
        assert!(fb.is_synced());
    }

    #[test]
    fn test_draw_target_clips() {
        let mut fb = FrameBuffer::new(16, 16).unwrap();
        Rectangle::new(Point::new(-4, -4), Size::new(8, 8))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut fb)
            .unwrap();

        assert_eq!(fb.pixel(0, 0), Some(true));
        assert_eq!(fb.pixel(3, 3), Some(true));
        assert_eq!(fb.pixel(4, 4), Some(false));
        assert_eq!(fb.current()[0], 0x0F);
    }

    #[test]
    fn test_clear_via_draw_target() {
        let mut fb = FrameBuffer::new(8, 8).unwrap();
        fb.clear(BinaryColor::On).unwrap();
        assert!(fb.current().iter().all(|&b| b == 0xFF));
        assert_eq!(fb.dirty_bytes(), 8);
    }
}
