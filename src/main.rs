mod cli;
mod core;
mod driver;
mod storage;

use clap::Parser;
use cli::{Cli, Commands, DemoArgs, StatusArgs};
use crate::core::config::{Config, ConfigManager};
use crate::core::error::VmError;
use crate::storage::bitmap;
use crate::storage::manager::{PagingManager, SENTINEL};
use logly::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

fn main() {
    if let Err(e) = run_app() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new()?;
    let mut config = config_manager.load_config()?;
    cli.global.apply(&mut config);

    let logger = Arc::new(Logger::new());
    let mut logger_config = LoggerConfig::default();
    logger_config.color = true;
    logger.configure(logger_config);

    if cli.global.silent {
        logger.remove_all_sinks();
    }
    if config.logging.log_to_file {
        std::fs::create_dir_all(config_manager.log_dir())?;
        logger.add_sink(SinkConfig {
            path: Some(config_manager.log_dir().join("swapvm.log")),
            rotation: Some("daily".to_string()),
            retention: Some(7),
            async_write: true,
            ..Default::default()
        })?;
    }

    match &cli.command {
        Some(Commands::Init) => {
            run_init(&config_manager, &config, &logger)?;
        }
        Some(Commands::Status(args)) => {
            print_status(args, &config, &logger)?;
        }
        Some(Commands::Write { index, value }) => {
            let mut manager = open_manager(&config, &logger)?;
            println!("{}", manager.write_element(*index, *value));
        }
        Some(Commands::Read { index }) => {
            let mut manager = open_manager(&config, &logger)?;
            let value = manager.read_element(*index);
            // -1 is also a legal stored value; only the range check tells them apart
            if value == SENTINEL && *index < manager.capacity() {
                logger.info(format!("Index {} holds -1", index))?;
            }
            println!("{}", value);
        }
        Some(Commands::Demo(args)) => {
            run_demo(args, &config, &logger)?;
        }
        Some(Commands::Inspect { page }) => {
            inspect_page(*page, &config, &logger)?;
        }
        None => {
            run_demo(&DemoArgs { seed: None }, &config, &logger)?;
        }
    }

    Ok(())
}

/// Open the paging manager. A swap file that cannot be zero-filled is fatal:
/// report, wait, exit.
fn open_manager(config: &Config, logger: &Arc<Logger>) -> anyhow::Result<PagingManager> {
    let path = config.swap_path();
    match PagingManager::open(&path, config.swap.element_count, config.paging_options()) {
        Ok(manager) => {
            if manager.store().created() {
                logger.info(format!(
                    "Created swap file {:?} ({} pages)",
                    manager.store().path(),
                    manager.page_count()
                ))?;
            }
            Ok(manager.with_logger(logger.clone()))
        }
        Err(e @ VmError::StorageExhausted { .. }) => {
            let _ = logger.error(e.to_string());
            eprintln!("Error: {}", e);
            std::thread::sleep(Duration::from_secs(config.swap.exit_delay_secs));
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn run_init(manager: &ConfigManager, config: &Config, logger: &Arc<Logger>) -> anyhow::Result<()> {
    logger.info("Initializing swapvm...".to_string())?;
    manager.init()?;
    logger.info(format!("Config: {:?}", manager.config_path()))?;

    let paging = open_manager(config, logger)?;
    if !paging.store().created() {
        logger.info(format!("Swap file {:?} already exists, left unchanged", config.swap_path()))?;
    }
    logger.success(format!(
        "Ready: {} elements across {} pages",
        paging.size(),
        paging.page_count()
    ))?;
    Ok(())
}

#[derive(Serialize)]
struct StatusReport {
    swap_path: String,
    exists: bool,
    file_len: u64,
    signature: Option<String>,
    element_count: usize,
    page_count: u32,
    capacity: usize,
    frame_limit: usize,
    restore_bitmap: bool,
}

fn print_status(args: &StatusArgs, config: &Config, logger: &Arc<Logger>) -> anyhow::Result<()> {
    let path = config.swap_path();
    let page_count = storage::layout::page_count(config.swap.element_count)?;
    let exists = path.exists();

    let (file_len, signature) = if exists {
        let mut manager = open_manager(config, logger)?;
        let len = manager.store().len()?;
        let signature = match manager.store_mut().verify_signature() {
            Ok(()) => Some(String::from_utf8_lossy(storage::layout::SIGNATURE).into_owned()),
            Err(VmError::InvalidSignature { found }) => {
                logger.error(format!("Invalid signature {:?}", found))?;
                None
            }
            Err(e) => return Err(e.into()),
        };
        (len, signature)
    } else {
        (0, None)
    };

    let report = StatusReport {
        swap_path: path.display().to_string(),
        exists,
        file_len,
        signature,
        element_count: config.swap.element_count,
        page_count,
        capacity: page_count as usize * storage::page::PAGE_ELEMENTS,
        frame_limit: config.paging.frame_limit.max(1),
        restore_bitmap: config.paging.restore_bitmap,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("swapvm v{}", env!("CARGO_PKG_VERSION"));
    println!("Swap file: {} ({})", report.swap_path, if exists { "present" } else { "missing" });
    if exists {
        println!("  Size: {} bytes (expected {})", report.file_len, storage::layout::file_len(page_count));
        println!("  Signature: {}", report.signature.as_deref().unwrap_or("invalid"));
    }
    println!("Elements: {}", report.element_count);
    println!("Pages: {} ({} addressable elements)", report.page_count, report.capacity);
    println!("Frames: {} (restore bitmap: {})", report.frame_limit, report.restore_bitmap);
    Ok(())
}

fn run_demo(args: &DemoArgs, config: &Config, logger: &Arc<Logger>) -> anyhow::Result<()> {
    let mut manager = open_manager(config, logger)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    logger.info(format!("Running driver (seed {})", seed))?;

    let mut rng = StdRng::seed_from_u64(seed);
    let report = driver::run_demo(&mut manager, &mut rng);

    logger.info(format!("Preloaded pages: {:?}", report.preloaded))?;
    if config.logging.verbose() {
        for (index, before, after) in &report.sweep {
            logger.info(format!("[{}] {} before write, {} after write", index, before, after))?;
        }
    }

    let dirty = manager.frames().filter(|f| f.dirty).count();
    for slot in 0..manager.frame_limit() {
        if let Some(frame) = manager.frame(slot) {
            logger.info(format!(
                "Frame {}: page {}, last touched {}, dirty {}, {} occupied",
                slot,
                frame.page_number,
                frame.last_touched,
                frame.dirty,
                bitmap::occupied_count(&frame.bitmap)
            ))?;
        }
    }
    manager.flush_all()?;

    logger.success(format!(
        "Driver finished: {} swept, {} write errors, {} read errors, {} dirty frames flushed",
        report.sweep.len(),
        report.write_failures.len(),
        report.read_failures.len(),
        dirty
    ))?;
    Ok(())
}

fn inspect_page(page: u32, config: &Config, logger: &Arc<Logger>) -> anyhow::Result<()> {
    let mut manager = open_manager(config, logger)?;
    let store = manager.store_mut();
    if let Err(e) = store.verify_signature() {
        logger.error(e.to_string())?;
    }

    let record = store.read_record(page)?;
    let occupied: Vec<usize> = (0..storage::page::PAGE_ELEMENTS)
        .filter(|&offset| bitmap::is_occupied(&record.bitmap, offset))
        .collect();

    println!("Page {} @ byte {}", page, storage::layout::record_offset(page));
    println!(
        "Occupied elements ({}): {:?}",
        bitmap::occupied_count(&record.bitmap),
        occupied
    );
    for (offset, value) in record.data.iter().enumerate() {
        if *value != 0 {
            println!("  [{}] = {}", page as usize * storage::page::PAGE_ELEMENTS + offset, value);
        }
    }
    Ok(())
}
