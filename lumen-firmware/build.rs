//! Build script for lumen-firmware
//!
//! - Passes the cortex-m-rt and defmt linker scripts
//! - Validates board.toml at compile time
//! - Generates `board.rs` with the board's display and scheduler constants

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    let config = load_config();
    let board = generate_board(&config);

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::write(out_dir.join("board.rs"), board).expect("failed to write board.rs");
}

/// Linker scripts for cortex-m-rt and defmt (memory.x comes from embassy-stm32)
fn setup_linker() {
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Read and validate board.toml
fn load_config() -> toml::Value {
    println!("cargo:rerun-if-changed=board.toml");

    let config_path = Path::new("board.toml");
    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: board.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a board.toml configuration file.          ║\n\
            ║  Please create one in the lumen-firmware directory.              ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read board.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in board.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&e.to_string())
            );
        }
    };

    let mut errors = Vec::new();
    validate_display(&config, &mut errors);
    validate_scheduler(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid board configuration                              ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=board.toml validated successfully");
    config
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn section<'a>(config: &'a toml::Value, name: &str) -> Option<&'a toml::value::Table> {
    config.get(name).and_then(|v| v.as_table())
}

/// Integer key, or `default` when absent
fn int(table: Option<&toml::value::Table>, key: &str, default: i64) -> i64 {
    table
        .and_then(|t| t.get(key))
        .and_then(|v| v.as_integer())
        .unwrap_or(default)
}

fn string<'a>(table: Option<&'a toml::value::Table>, key: &str, default: &'a str) -> &'a str {
    table
        .and_then(|t| t.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or(default)
}

fn validate_display(config: &toml::Value, errors: &mut Vec<String>) {
    let display = section(config, "display");

    let width = int(display, "width", 128);
    if !(1..=128).contains(&width) {
        errors.push("[display] width must be 1-128".into());
    }

    let height = int(display, "height", 64);
    if !(8..=64).contains(&height) || height % 8 != 0 {
        errors.push("[display] height must be a multiple of 8, up to 64".into());
    }

    let address = int(display, "address", 0x3C);
    if !(0..=0x7F).contains(&address) {
        errors.push("[display] address must be a 7-bit I2C address".into());
    }

    for key in ["bus", "sda_pin", "scl_pin", "contrast", "reset_pin", "window_columns"] {
        if let Some(value) = display.and_then(|t| t.get(key)) {
            if !value.as_integer().is_some_and(|v| (0..=255).contains(&v)) {
                errors.push(format!("[display] {} must be 0-255", key));
            }
        }
    }

    // The binary wires I2C1 on PB6/PB7 and a port B reset line
    if int(display, "bus", 0) != 0 {
        errors.push("[display] bus must be 0 (I2C1)".into());
    }
    if int(display, "scl_pin", 6) != 6 || int(display, "sda_pin", 7) != 7 {
        errors.push("[display] I2C1 is wired as scl_pin = 6, sda_pin = 7 (PB6/PB7)".into());
    }
    if let Some(pin) = display.and_then(|t| t.get("reset_pin")).and_then(|v| v.as_integer()) {
        if ![5, 8, 9].contains(&pin) {
            errors.push("[display] reset_pin must be 5, 8 or 9 (PB5/PB8/PB9)".into());
        }
    }

    if let Some(value) = display.and_then(|t| t.get("dim_after_ms")) {
        if !value.as_integer().is_some_and(|v| (0..=u32::MAX as i64).contains(&v)) {
            errors.push("[display] dim_after_ms must be a positive u32".into());
        }
    }

    let controller = string(display, "controller", "ssd1306");
    if !["ssd1306", "sh1106"].contains(&controller) {
        errors.push("[display] controller must be 'ssd1306' or 'sh1106'".into());
    }

    let flush_mode = string(display, "flush_mode", "column_window");
    match flush_mode {
        "full_frame" => {}
        "column_window" => {
            let k = int(display, "window_columns", 4);
            if !(1..=32).contains(&k) || (k & (k - 1)) != 0 {
                errors.push("[display] window_columns must be a power of two, up to 32".into());
            }
        }
        _ => errors.push("[display] flush_mode must be 'full_frame' or 'column_window'".into()),
    }
}

fn validate_scheduler(config: &toml::Value, errors: &mut Vec<String>) {
    let scheduler = section(config, "scheduler");
    let ms = int(scheduler, "default_display_time_ms", 5000);
    if !(100..=u32::MAX as i64).contains(&ms) {
        errors.push("[scheduler] default_display_time_ms must be at least 100".into());
    }
}

/// Render the validated configuration as Rust constants
fn generate_board(config: &toml::Value) -> String {
    let display = section(config, "display");
    let scheduler = section(config, "scheduler");

    let optional = |key: &str| match display.and_then(|t| t.get(key)).and_then(|v| v.as_integer()) {
        Some(v) => format!("Some({})", v),
        None => "None".to_string(),
    };
    let controller = match string(display, "controller", "ssd1306") {
        "sh1106" => "Controller::Sh1106",
        _ => "Controller::Ssd1306",
    };
    let flush_mode = match string(display, "flush_mode", "column_window") {
        "full_frame" => "FlushStrategy::FullFrame",
        _ => "FlushStrategy::ColumnWindow",
    };

    format!(
        "// Generated from board.toml by build.rs\n\
         \n\
         use lumen_display::{{Controller, DisplaySettings, FlushStrategy}};\n\
         \n\
         /// Panel wiring and flush behavior\n\
         pub const DISPLAY: DisplaySettings = DisplaySettings {{\n\
         \x20   bus: {bus},\n\
         \x20   sda_pin: {sda},\n\
         \x20   scl_pin: {scl},\n\
         \x20   address: {address:#04x},\n\
         \x20   width: {width},\n\
         \x20   height: {height},\n\
         \x20   reset_pin: {reset},\n\
         \x20   controller: {controller},\n\
         \x20   flush_mode: {flush_mode},\n\
         \x20   window_columns: {window},\n\
         \x20   contrast: {contrast},\n\
         \x20   dim_after_ms: {dim},\n\
         }};\n\
         \n\
         /// Display time for widgets that do not choose their own (ms)\n\
         pub const DEFAULT_DISPLAY_TIME_MS: u32 = {display_time};\n",
        bus = int(display, "bus", 0),
        sda = int(display, "sda_pin", 7),
        scl = int(display, "scl_pin", 6),
        address = int(display, "address", 0x3C),
        width = int(display, "width", 128),
        height = int(display, "height", 64),
        reset = optional("reset_pin"),
        controller = controller,
        flush_mode = flush_mode,
        window = int(display, "window_columns", 4),
        contrast = int(display, "contrast", 0xCF),
        dim = optional("dim_after_ms"),
        display_time = int(scheduler, "default_display_time_ms", 5000),
    )
}
