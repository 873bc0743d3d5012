//! Lumen - Widget Rotation Firmware
//!
//! Board binary for STM32F072 boards with an SSD1306/SH1106 OLED on I2C1.
//! Rotates a boot banner, a board summary and an uptime widget on the panel,
//! pushing only changed bytes over the bus.

#![no_std]
#![no_main]

extern crate alloc;

mod uptime;

use alloc::boxed::Box;
use core::fmt::Write;

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::i2c::{self, I2c};
use embassy_time::{Delay, Duration, Ticker, Timer};
use embedded_alloc::LlffHeap as Heap;
use lumen_core::{ActionFlags, MessageWidget, SystemClock, WidgetScheduler};
use lumen_display::FrameSync;
use {defmt_rtt as _, panic_probe as _};

use crate::uptime::UptimeWidget;

/// Board constants generated from board.toml
mod board {
    include!(concat!(env!("OUT_DIR"), "/board.rs"));
}

// Heap allocator for frame buffers and widgets
#[global_allocator]
static HEAP: Heap = Heap::empty();

// Heap size: 6KB (two 1KB frame buffers plus widgets)
const HEAP_SIZE: usize = 6 * 1024;

/// Scheduler tick period
const TICK_MS: u64 = 20;

/// How long the boot banner stays up
const BANNER_MS: u64 = 2000;

/// Delay between attempts to bring up a missing panel
const INIT_RETRY_SECS: u64 = 5;

/// Main entry point
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Lumen firmware starting...");

    // Initialize heap allocator
    init_heap();

    let p = embassy_stm32::init(Default::default());
    info!("Peripherals initialized");

    // Setup I2C for OLED (PB6=SCL, PB7=SDA); build.rs rejects other wiring
    let mut i2c_config = i2c::Config::default();
    i2c_config.timeout = Duration::from_millis(100);
    let i2c = I2c::new_blocking(p.I2C1, p.PB6, p.PB7, i2c_config);

    let mut display = match FrameSync::new(i2c, board::DISPLAY) {
        Ok(display) => display,
        Err(e) => {
            error!("Failed to create display: {}", e);
            halt().await
        }
    };

    // Port B reset line, checked against this list by build.rs
    let mut reset_pin = match board::DISPLAY.reset_pin {
        Some(5) => Some(Output::new(p.PB5, Level::High, Speed::Low)),
        Some(8) => Some(Output::new(p.PB8, Level::High, Speed::Low)),
        Some(9) => Some(Output::new(p.PB9, Level::High, Speed::Low)),
        _ => None,
    };

    // Retry until the panel answers; widgets are refused while it is absent
    while let Err(e) = display.init_with_reset(reset_pin.as_mut(), &mut Delay) {
        warn!("Display init failed: {}, retrying", e);
        Timer::after_secs(INIT_RETRY_SECS).await;
    }

    let mut scheduler = WidgetScheduler::new(display, SystemClock);
    add_boot_widgets(&mut scheduler);
    scheduler.start();
    info!("Scheduler started with {} widgets", scheduler.len());

    let mut ticker = Ticker::every(Duration::from_millis(TICK_MS));
    loop {
        scheduler.tick();
        ticker.next().await;
    }
}

/// Queue the widgets shown from boot
fn add_boot_widgets<D>(scheduler: &mut WidgetScheduler<D, SystemClock>)
where
    D: lumen_display::DisplayBackend,
{
    let default_time = Duration::from_millis(board::DEFAULT_DISPLAY_TIME_MS as u64);
    let settings = board::DISPLAY;

    let banner = MessageWidget::new("Banner", "Lumen\nv0.1", Duration::from_millis(BANNER_MS))
        .with_action(ActionFlags::AUTO_REMOVE);

    let mut summary: heapless::String<64> = heapless::String::new();
    let _ = write!(
        summary,
        "{:?} {}x{}\naddr {:#04x}\n{:?}",
        settings.controller, settings.width, settings.height, settings.address, settings.flush_mode
    );
    let board_info = MessageWidget::new("Board", &summary, default_time);

    let widgets: [Box<dyn lumen_core::Widget>; 3] = [
        Box::new(banner),
        Box::new(board_info),
        Box::new(UptimeWidget::new(default_time)),
    ];
    for widget in widgets {
        if let Err(rejected) = scheduler.add_widget(widget) {
            warn!("Widget {=str} rejected", rejected.name());
        }
    }
}

/// Park forever after an unrecoverable setup error
async fn halt() -> ! {
    loop {
        Timer::after_secs(60).await;
        trace!("Halted");
    }
}

/// Initialize the heap allocator
fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}
