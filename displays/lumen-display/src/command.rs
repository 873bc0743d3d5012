//! SSD1306 / SH1106 command set
//!
//! Opcodes are fixed by the controllers; both parts share the page
//! addressing subset used here.

use heapless::Vec;

use crate::settings::{Controller, DisplaySettings};

/// Control byte prefixing a single command
pub const CONTROL_COMMAND: u8 = 0x00;

/// Control byte prefixing a run of display RAM data
pub const CONTROL_DATA: u8 = 0x40;

/// Maximum length of the controller init sequence
pub const INIT_SEQUENCE_LEN: usize = 32;

/// Controller opcodes
#[allow(dead_code)]
pub mod cmd {
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const SET_CONTRAST: u8 = 0x81;
    pub const SET_NORMAL: u8 = 0xA6;
    pub const SET_INVERSE: u8 = 0xA7;
    pub const RESUME_TO_RAM: u8 = 0xA4;
    pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
    pub const SET_COM_PINS: u8 = 0xDA;
    pub const SET_VCOM_DETECT: u8 = 0xDB;
    pub const SET_CLOCK_DIV: u8 = 0xD5;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_MUX_RATIO: u8 = 0xA8;
    pub const SET_MEMORY_MODE: u8 = 0x20;
    pub const SET_LOW_COLUMN: u8 = 0x00;
    pub const SET_HIGH_COLUMN: u8 = 0x10;
    pub const SET_PAGE_ADDR: u8 = 0xB0;
    pub const SET_START_LINE: u8 = 0x40;
    pub const SET_SEG_REMAP: u8 = 0xA1;
    pub const SET_COM_SCAN_DEC: u8 = 0xC8;
    pub const SET_CHARGE_PUMP: u8 = 0x8D;
    pub const DEACTIVATE_SCROLL: u8 = 0x2E;
    pub const ACTIVATE_SCROLL: u8 = 0x2F;
}

/// Page addressing memory mode argument for `SET_MEMORY_MODE`
const MEMORY_MODE_PAGE: u8 = 0x02;

/// Build the power-on command sequence for the given panel
pub fn init_sequence(settings: &DisplaySettings) -> Vec<u8, INIT_SEQUENCE_LEN> {
    // Multiplex ratio register is 6 bits wide
    let mux = settings.height.saturating_sub(1).min(63) as u8;
    // 128x32 modules wire COM pins sequentially, taller ones alternate
    let com_pins = if settings.height > 32 { 0x12 } else { 0x02 };

    let mut seq = Vec::new();
    let mut push = |bytes: &[u8]| {
        for &b in bytes {
            let _ = seq.push(b);
        }
    };

    push(&[cmd::DISPLAY_OFF]);
    push(&[cmd::SET_CLOCK_DIV, 0x80]);
    push(&[cmd::SET_MUX_RATIO, mux]);
    push(&[cmd::SET_DISPLAY_OFFSET, 0x00]);
    push(&[cmd::SET_START_LINE]);
    push(&[cmd::SET_CHARGE_PUMP, 0x14]);
    if settings.controller == Controller::Ssd1306 {
        push(&[cmd::SET_MEMORY_MODE, MEMORY_MODE_PAGE]);
    }
    push(&[cmd::SET_SEG_REMAP, cmd::SET_COM_SCAN_DEC]);
    push(&[cmd::SET_COM_PINS, com_pins]);
    push(&[cmd::SET_CONTRAST, settings.contrast]);
    push(&[cmd::SET_PRECHARGE, 0xF1]);
    push(&[cmd::SET_VCOM_DETECT, 0x40]);
    push(&[cmd::DEACTIVATE_SCROLL]);
    push(&[cmd::RESUME_TO_RAM, cmd::SET_NORMAL]);
    push(&[cmd::DISPLAY_ON]);

    seq
}

/// Address commands selecting `page` and RAM column `column`
pub const fn address(page: u16, column: u16) -> [u8; 3] {
    [
        cmd::SET_PAGE_ADDR | (page as u8 & 0x0F),
        cmd::SET_LOW_COLUMN | (column as u8 & 0x0F),
        cmd::SET_HIGH_COLUMN | ((column >> 4) as u8 & 0x0F),
    ]
}
