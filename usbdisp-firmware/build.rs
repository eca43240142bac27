//! Build script for usbdisp-firmware
//!
//! - Sets up linker search paths and arguments for memory.x
//! - Validates panel.toml and embeds it as a postcard blob

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use usbdisp_core::config::{ConfigError, DeviceConfig, MAX_CONFIG_BYTES};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    setup_linker(&out_dir);
    embed_config(&out_dir);
}

/// Copy memory.x next to the build output and pass the cortex-m-rt/defmt scripts
fn setup_linker(out_dir: &Path) {
    fs::write(out_dir.join("memory.x"), include_bytes!("memory.x")).unwrap();
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    if env::var_os("CARGO_FEATURE_DEFMT").is_some() {
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate panel.toml and write OUT_DIR/panel.bin
fn embed_config(out_dir: &Path) {
    println!("cargo:rerun-if-changed=panel.toml");

    let config_path = Path::new("panel.toml");
    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: panel.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a panel.toml configuration file.          ║\n\
            ║  Please create one in the usbdisp-firmware directory.            ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read panel.toml", &e.to_string()),
    };

    let value: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => fail("Invalid TOML syntax in panel.toml", &e.to_string()),
    };
    validate_required_sections(&value);

    let config: DeviceConfig = match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => fail("Invalid settings in panel.toml", &e.to_string()),
    };
    if let Err(e) = config.validate() {
        fail("Out-of-range value in panel.toml", describe(e));
    }

    let mut buffer = [0u8; MAX_CONFIG_BYTES];
    let blob = match config.to_slice(&mut buffer) {
        Ok(blob) => blob,
        Err(e) => fail("Failed to encode panel.toml", describe(e)),
    };
    fs::write(out_dir.join("panel.bin"), blob).unwrap();

    println!(
        "cargo:warning=panel.toml validated: {}x{} panel, {}-byte packets",
        config.engine.panel.width, config.engine.panel.height, config.engine.packet_size
    );
}

fn describe(e: ConfigError) -> &'static str {
    match e {
        ConfigError::PacketSizeOutOfRange => "engine.packet_size must be 16, 32 or 64",
        ConfigError::EmptyPanel => "engine.panel width and height must be non-zero",
        ConfigError::SpiFrequencyOutOfRange => "display.spi_frequency_hz must be 1-62500000",
        ConfigError::Deserialize => "binary config could not be decoded",
        ConfigError::Serialize => "config does not fit the embedded blob",
    }
}

/// Abort the build with a boxed error message
fn fail(title: &str, detail: &str) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        format_error_lines(detail)
    );
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

/// Validate that required sections exist
fn validate_required_sections(config: &toml::Value) {
    let mut errors = Vec::new();

    match config.get("engine") {
        Some(engine) => {
            if engine.get("packet_size").is_none() {
                errors.push("[engine] missing 'packet_size'");
            }
            if engine.get("panel").is_none() {
                errors.push("Missing [engine.panel] section");
            }
        }
        None => errors.push("Missing [engine] section"),
    }

    if config.get("display").is_none() {
        errors.push("Missing [display] section");
    }

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Missing required sections in panel.toml                  ║\n\
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
}
