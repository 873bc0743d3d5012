//! Differential frame synchronizer
//!
//! Owns the buffer pair and the I2C bus to an SSD1306/SH1106 controller and
//! transmits only what changed since the last successful transfer.
//!
//! # Flush strategies
//!
//! - **Full frame**: when any byte differs, every page is re-addressed and
//!   streamed. Cost is proportional to the panel size.
//! - **Column window**: each flush inspects `K` columns across all pages and
//!   sends the dirty runs it finds, then advances a cursor. A change reaches
//!   the glass within `ceil(width / K)` flushes, but no single flush ever
//!   touches more than `K` columns.

use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use heapless::Vec;

use crate::backend::DisplayBackend;
use crate::buffer::FrameBuffer;
use crate::command::{self, cmd, CONTROL_COMMAND, CONTROL_DATA};
use crate::error::DisplayError;
use crate::settings::{DisplaySettings, FlushMode};

/// Largest data transfer: one full page of controller RAM plus control byte
const DATA_PACKET_LEN: usize = 133;

/// Contrast used while dimmed
const DIM_CONTRAST: u8 = 0x00;

/// Column-window scan position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WindowCursor {
    /// No sweep scheduled; the next drawn change starts one
    Idle,
    /// The window starting at this column is inspected next
    Active(u16),
    /// A fresh sweep starts after the next housekeeping tick
    RestartPending,
}

/// What a single flush did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlushStats {
    /// Display RAM bytes transmitted (excluding address commands)
    pub bytes_sent: usize,
    /// Columns compared between the drawn and transmitted frames
    pub columns_inspected: u16,
    /// Addressed data transfers issued
    pub transfers: u16,
}

/// Frame synchronizer for one panel
pub struct FrameSync<I2C> {
    i2c: I2C,
    settings: DisplaySettings,
    buffer: FrameBuffer,
    mode: FlushMode,
    cursor: WindowCursor,
    /// Buffer changed while a sweep was in progress
    rescan: bool,
    ready: bool,
    absent_reported: bool,
    degraded: bool,
    bus_errors: u32,
    contrast: u8,
    dimmed: bool,
    dim_after: Option<Duration>,
    last_activity: Option<Instant>,
    /// A flush transmitted bytes since the last housekeeping tick
    activity: bool,
}

impl<I2C> FrameSync<I2C>
where
    I2C: I2c,
{
    /// Create a synchronizer and allocate its buffers
    ///
    /// The panel is not touched until [`FrameSync::init`] is called.
    pub fn new(i2c: I2C, settings: DisplaySettings) -> Result<Self, DisplayError> {
        settings.validate()?;
        let buffer = FrameBuffer::new(settings.width, settings.height)?;

        Ok(Self {
            i2c,
            mode: settings.flush_mode(),
            contrast: settings.contrast,
            dim_after: settings
                .dim_after_ms
                .map(|ms| Duration::from_millis(ms as u64)),
            settings,
            buffer,
            cursor: WindowCursor::Idle,
            rescan: false,
            ready: false,
            absent_reported: false,
            degraded: false,
            bus_errors: 0,
            dimmed: false,
            last_activity: None,
            activity: false,
        })
    }

    /// Pulse the panel's reset line
    pub fn reset<P, D>(&mut self, rst: &mut P, delay: &mut D) -> Result<(), DisplayError>
    where
        P: OutputPin,
        D: DelayNs,
    {
        rst.set_high().map_err(|_| DisplayError::ResetPin)?;
        delay.delay_ms(1);
        rst.set_low().map_err(|_| DisplayError::ResetPin)?;
        delay.delay_ms(10);
        rst.set_high().map_err(|_| DisplayError::ResetPin)?;
        delay.delay_ms(10);
        Ok(())
    }

    /// Pulse the reset line when the board wires one, then [`init`](Self::init)
    pub fn init_with_reset<P, D>(
        &mut self,
        rst: Option<&mut P>,
        delay: &mut D,
    ) -> Result<(), DisplayError>
    where
        P: OutputPin,
        D: DelayNs,
    {
        if let Some(rst) = rst {
            self.reset(rst, delay)?;
        }
        self.init()
    }

    /// Run the controller init sequence and blank its RAM
    ///
    /// On failure the synchronizer stays unready: flushes become no-ops and
    /// the condition is logged once.
    pub fn init(&mut self) -> Result<(), DisplayError> {
        let seq = command::init_sequence(&self.settings);
        let result = seq
            .iter()
            .try_for_each(|&c| self.send_command(c))
            .and_then(|()| self.clear_ram());

        match result {
            Ok(()) => {
                self.ready = true;
                self.degraded = false;
                self.buffer.reset_last_sent();
                self.cursor = WindowCursor::Idle;
                info!(
                    "display ready: {=u16}x{=u16} at {=u8:#x}",
                    self.settings.width,
                    self.settings.height,
                    self.settings.address
                );
                Ok(())
            }
            Err(_) => {
                self.ready = false;
                self.report_absent();
                Err(DisplayError::NotInitialized)
            }
        }
    }

    /// Whether init succeeded
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether the last flush failed part way through
    pub fn degraded(&self) -> bool {
        self.degraded
    }

    /// Number of flushes that hit a bus error
    pub fn bus_errors(&self) -> u32 {
        self.bus_errors
    }

    /// Panel width in pixels
    pub fn width(&self) -> u16 {
        self.settings.width
    }

    /// Panel height in pixels
    pub fn height(&self) -> u16 {
        self.settings.height
    }

    /// Settings this synchronizer was built with
    pub fn settings(&self) -> &DisplaySettings {
        &self.settings
    }

    /// Buffers widgets draw into
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Mutable access to the drawn frame
    pub fn buffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.buffer
    }

    /// Current flush strategy
    pub fn flush_mode(&self) -> FlushMode {
        self.mode
    }

    /// Switch flush strategy; any sweep in progress restarts
    pub fn set_flush_mode(&mut self, mode: FlushMode) {
        self.mode = mode;
        self.rescan = false;
        self.buffer.take_mutated();
        self.cursor = if self.buffer.is_synced() {
            WindowCursor::Idle
        } else {
            WindowCursor::Active(0)
        };
    }

    /// Column-window cursor
    pub fn cursor(&self) -> WindowCursor {
        self.cursor
    }

    /// Underlying bus
    pub fn bus(&self) -> &I2C {
        &self.i2c
    }

    /// Mutable access to the underlying bus
    pub fn bus_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    /// Consume the synchronizer and return the bus
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Hold off column-window scanning until the next housekeeping tick
    ///
    /// Call after redrawing the whole frame so the sweep starts from column
    /// zero against the new frame instead of finishing a stale one.
    pub fn request_full_redraw(&mut self) {
        if matches!(self.mode, FlushMode::ColumnWindow { .. }) {
            self.cursor = WindowCursor::RestartPending;
        }
    }

    /// Transmit what changed since the last successful flush
    pub fn display_buff(&mut self) -> Result<FlushStats, DisplayError> {
        if !self.ready {
            self.report_absent();
            return Ok(FlushStats::default());
        }

        let result = match self.mode {
            FlushMode::FullFrame => self.flush_full(),
            FlushMode::ColumnWindow { columns } => self.flush_window(columns as u16),
        }
        .and_then(|stats| self.note_activity(stats));

        match result {
            Ok(stats) => {
                if self.degraded {
                    info!("display bus recovered");
                    self.degraded = false;
                }
                Ok(stats)
            }
            Err(e) => {
                self.bus_errors = self.bus_errors.saturating_add(1);
                if !self.degraded {
                    warn!("display flush failed, frame partially sent");
                }
                self.degraded = true;
                Err(e)
            }
        }
    }

    /// Record bus activity and wake a dimmed panel
    fn note_activity(&mut self, stats: FlushStats) -> Result<FlushStats, DisplayError> {
        if stats.bytes_sent > 0 {
            self.activity = true;
            if self.dimmed {
                self.set_dim(false)?;
            }
        }
        Ok(stats)
    }

    /// Periodic housekeeping: restarts pending sweeps and dims an idle panel
    pub fn housekeeping(&mut self, now: Instant) -> Result<(), DisplayError> {
        if self.cursor == WindowCursor::RestartPending {
            self.buffer.take_mutated();
            self.rescan = false;
            self.cursor = WindowCursor::Active(0);
        }

        if !self.ready {
            return Ok(());
        }

        if core::mem::take(&mut self.activity) || self.last_activity.is_none() {
            self.last_activity = Some(now);
        }

        if let (Some(dim_after), Some(last)) = (self.dim_after, self.last_activity) {
            if !self.dimmed && now.saturating_duration_since(last) >= dim_after {
                debug!("dimming idle display");
                self.set_dim(true)?;
            }
        }
        Ok(())
    }

    /// Configure the idle time after which housekeeping dims the panel
    pub fn set_dim_after(&mut self, dim_after: Option<Duration>) {
        self.dim_after = dim_after;
    }

    /// Set panel contrast (applied immediately unless dimmed)
    pub fn set_contrast(&mut self, contrast: u8) -> Result<(), DisplayError> {
        self.ensure_ready()?;
        self.contrast = contrast;
        if self.dimmed {
            return Ok(());
        }
        self.send_commands(&[cmd::SET_CONTRAST, contrast])
    }

    /// Set the VCOMH deselect level
    pub fn set_vcom_detect(&mut self, level: u8) -> Result<(), DisplayError> {
        self.ensure_ready()?;
        self.send_commands(&[cmd::SET_VCOM_DETECT, level])
    }

    /// Invert all pixels in hardware
    pub fn set_inverted(&mut self, inverted: bool) -> Result<(), DisplayError> {
        self.ensure_ready()?;
        self.send_command(if inverted {
            cmd::SET_INVERSE
        } else {
            cmd::SET_NORMAL
        })
    }

    /// Dim the panel, or restore the configured contrast
    pub fn set_dim(&mut self, dim: bool) -> Result<(), DisplayError> {
        self.ensure_ready()?;
        let contrast = if dim { DIM_CONTRAST } else { self.contrast };
        self.send_commands(&[cmd::SET_CONTRAST, contrast])?;
        self.dimmed = dim;
        Ok(())
    }

    /// Whether the panel is dimmed
    pub fn is_dimmed(&self) -> bool {
        self.dimmed
    }

    /// Turn the panel on or off
    pub fn set_display_on(&mut self, on: bool) -> Result<(), DisplayError> {
        self.ensure_ready()?;
        self.send_command(if on { cmd::DISPLAY_ON } else { cmd::DISPLAY_OFF })
    }

    fn ensure_ready(&self) -> Result<(), DisplayError> {
        if self.ready {
            Ok(())
        } else {
            Err(DisplayError::NotInitialized)
        }
    }

    fn report_absent(&mut self) {
        if !self.absent_reported {
            error!(
                "display at {=u8:#x} not initialized, drawing disabled",
                self.settings.address
            );
            self.absent_reported = true;
        }
    }

    fn flush_full(&mut self) -> Result<FlushStats, DisplayError> {
        let mut stats = FlushStats {
            columns_inspected: self.settings.width,
            ..Default::default()
        };
        self.buffer.take_mutated();

        if self.buffer.is_synced() {
            return Ok(stats);
        }

        for page in 0..self.buffer.pages() {
            stats.bytes_sent += self.update_page(page, 0, self.settings.width)?;
            stats.transfers += 1;
        }
        trace!("full frame sent: {=usize} bytes", stats.bytes_sent);
        Ok(stats)
    }

    fn flush_window(&mut self, columns: u16) -> Result<FlushStats, DisplayError> {
        let mut stats = FlushStats::default();
        let mutated = self.buffer.take_mutated();

        let start = match self.cursor {
            WindowCursor::RestartPending => return Ok(stats),
            WindowCursor::Idle if !mutated => return Ok(stats),
            WindowCursor::Idle => 0,
            WindowCursor::Active(column) => {
                self.rescan |= mutated;
                column
            }
        };

        let width = self.settings.width;
        let end = (start + columns).min(width);
        self.cursor = WindowCursor::Active(start);
        stats.columns_inspected = end - start;

        let (bytes, transfers) = self.update_cols(start, end)?;
        stats.bytes_sent = bytes;
        stats.transfers = transfers;

        self.cursor = if end < width {
            WindowCursor::Active(end)
        } else if core::mem::take(&mut self.rescan) {
            WindowCursor::Active(0)
        } else {
            WindowCursor::Idle
        };
        Ok(stats)
    }

    /// Send the dirty run of each page within columns `start..end`
    fn update_cols(&mut self, start: u16, end: u16) -> Result<(usize, u16), DisplayError> {
        let mut bytes = 0;
        let mut transfers = 0;

        for page in 0..self.buffer.pages() {
            let dirty = |col: &u16| self.buffer.is_dirty(self.buffer.index(page, *col));
            let Some(first) = (start..end).find(dirty) else {
                continue;
            };
            let last = (first..end).rev().find(dirty).unwrap_or(first);

            bytes += if first == last {
                self.update_area(self.buffer.index(page, first))?
            } else {
                self.update_page(page, first, last + 1)?
            };
            transfers += 1;
        }
        Ok((bytes, transfers))
    }

    /// Send the single byte at buffer index `idx`
    fn update_area(&mut self, idx: usize) -> Result<usize, DisplayError> {
        let width = self.settings.width as usize;
        let page = (idx / width) as u16;
        let column = (idx % width) as u16;
        self.update_page(page, column, column + 1)
    }

    /// Address `page` at `start` and stream columns `start..end`
    fn update_page(&mut self, page: u16, start: u16, end: u16) -> Result<usize, DisplayError> {
        let ram_column = start + self.settings.controller.column_offset();
        self.send_commands(&command::address(page, ram_column))?;

        let mut packet: Vec<u8, DATA_PACKET_LEN> = Vec::new();
        let _ = packet.push(CONTROL_DATA);
        packet
            .extend_from_slice(self.buffer.run(page, start, end))
            .map_err(|_| DisplayError::InvalidDimensions)?;
        self.write(&packet)?;

        self.buffer.mark_sent(page, start, end);
        Ok((end - start) as usize)
    }

    /// Zero the whole controller RAM, including columns outside the panel
    fn clear_ram(&mut self) -> Result<(), DisplayError> {
        let ram_columns = self.settings.controller.ram_columns() as usize;
        let mut packet: Vec<u8, DATA_PACKET_LEN> = Vec::new();
        let _ = packet.push(CONTROL_DATA);
        let _ = packet.resize(ram_columns + 1, 0);

        for page in 0..self.buffer.pages() {
            self.send_commands(&command::address(page, 0))?;
            self.write(&packet)?;
        }
        Ok(())
    }

    fn send_command(&mut self, c: u8) -> Result<(), DisplayError> {
        self.write(&[CONTROL_COMMAND, c])
    }

    fn send_commands(&mut self, cmds: &[u8]) -> Result<(), DisplayError> {
        cmds.iter().try_for_each(|&c| self.send_command(c))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.i2c
            .write(self.settings.address, bytes)
            .map_err(|_| DisplayError::Bus)
    }
}

impl<I2C> DisplayBackend for FrameSync<I2C>
where
    I2C: I2c,
{
    fn width(&self) -> u16 {
        self.settings.width
    }

    fn height(&self) -> u16 {
        self.settings.height
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn frame(&mut self) -> &mut FrameBuffer {
        &mut self.buffer
    }

    fn display_buff(&mut self) -> Result<FlushStats, DisplayError> {
        FrameSync::display_buff(self)
    }

    fn request_full_redraw(&mut self) {
        FrameSync::request_full_redraw(self)
    }

    fn housekeeping(&mut self, now: Instant) -> Result<(), DisplayError> {
        FrameSync::housekeeping(self, now)
    }
}
