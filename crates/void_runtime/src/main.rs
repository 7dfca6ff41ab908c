//! Streaming demo runtime
//!
//! Boots a scene from `boot.toml`, walks a stream boundary over a grid of
//! collection tiles and logs every residency change.
//!
//! Run with: cargo run -p void_runtime
//!       or: cargo run --bin void-stream -- path/to/boot.toml

mod boot_config;
mod demo;

use boot_config::BootConfig;
use demo::StreamDemo;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("PANIC: {}", panic_info);
    }));

    let config = match BootConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid boot configuration: {}", e);
            std::process::exit(2);
        }
    };
    config.print_summary();

    let mut demo = match StreamDemo::new(&config) {
        Ok(demo) => demo,
        Err(e) => {
            log::error!("Failed to boot scene: {}", e);
            std::process::exit(1);
        }
    };

    let report = demo.run();
    log::info!(
        "Walked {} frames: {} tiles streamed in, {} became resident, {} unloaded",
        report.frames, report.fade_ins, report.arrivals, report.unloads
    );
    log::info!("Final state: {:?}", report.stats);
}
