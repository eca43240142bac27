//! Fill, FillRect and CopyArea handlers

use usbdisp_hal::{DisplaySink, Transport};
use usbdisp_protocol::{CopyAreaCommand, FillCommand, FillRectCommand};

use super::{fits, Engine, EngineError, COPY_SCRATCH_PIXELS};

impl<'r, T, D, const N: usize> Engine<'r, T, D, N>
where
    T: Transport,
    D: DisplaySink,
{
    pub(super) fn fill(&mut self, cmd: FillCommand) -> Result<(), EngineError> {
        self.drain();
        self.display.fill(cmd.color)?;
        Ok(())
    }

    /// Fill `[left, right) × [top, bottom)`, clipped to the panel
    pub(super) fn fill_rect(&mut self, cmd: FillRectCommand) -> Result<(), EngineError> {
        if !cmd.is_well_formed() {
            return Err(EngineError::InvalidRect);
        }

        let (width, height) = self.display.size();
        let right = cmd.right.min(width);
        let bottom = cmd.bottom.min(height);
        let left = cmd.left.min(right);
        let top = cmd.top.min(bottom);

        if left == right || top == bottom {
            return Ok(());
        }

        self.drain();
        self.display
            .fill_rect(left, top, right - left, bottom - top, cmd.color)?;
        Ok(())
    }

    /// Copy a rectangle in horizontal strips through the scratch buffer
    ///
    /// Strips run bottom-up when the destination lies below the source and
    /// top-down otherwise, so overlapping copies behave like `memmove`.
    pub(super) fn copy_area(&mut self, cmd: CopyAreaCommand) -> Result<(), EngineError> {
        let panel = self.display.size();
        if !fits(cmd.sx, cmd.sy, cmd.width, cmd.height, panel)
            || !fits(cmd.dx, cmd.dy, cmd.width, cmd.height, panel)
        {
            return Err(EngineError::OutOfBounds);
        }

        if cmd.width == 0 || cmd.height == 0 {
            return Ok(());
        }

        let width = cmd.width as usize;
        if width > COPY_SCRATCH_PIXELS {
            return Err(EngineError::OutOfMemory);
        }

        let rows_per_strip = (COPY_SCRATCH_PIXELS / width).min(cmd.height as usize) as u16;
        let strips = cmd.height.div_ceil(rows_per_strip);
        let bottom_up = cmd.dy > cmd.sy;

        for i in 0..strips {
            let strip = if bottom_up { strips - 1 - i } else { i };
            let row = strip * rows_per_strip;
            let rows = rows_per_strip.min(cmd.height - row);
            let pixels = &mut self.scratch[..width * rows as usize];

            self.display
                .read_rect(cmd.sx, cmd.sy + row, cmd.width, rows, pixels)?;
            self.display
                .set_window(cmd.dx, cmd.dy + row, cmd.width, rows)?;
            self.display.push_pixels(pixels)?;

            self.drain();
        }

        Ok(())
    }
}
