use clap::{Parser, Subcommand, Args};
use crate::core::config::Config;

#[derive(Parser)]
#[command(name = "swapvm")]
#[command(about = "swapvm: demand-paged virtual memory over a swap file", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Swap file path
    #[arg(long, global = true)]
    pub swap: Option<String>,
    /// Number of elements in the simulated array
    #[arg(long, global = true)]
    pub size: Option<usize>,
    /// Resident frames kept before eviction starts
    #[arg(long, global = true)]
    pub frames: Option<usize>,
    /// Reload persisted occupancy bitmaps on page load
    #[arg(long, global = true)]
    pub restore_bitmap: bool,
    #[arg(long, global = true)]
    pub silent: bool,
}

impl GlobalArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.swap {
            config.swap.path = path.clone();
        }
        if let Some(size) = self.size {
            config.swap.element_count = size;
        }
        if let Some(frames) = self.frames {
            config.paging.frame_limit = frames;
        }
        if self.restore_bitmap {
            config.paging.restore_bitmap = true;
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the default config and create the swap file
    Init,
    /// Show swap file and paging status
    Status(StatusArgs),
    /// Write a value at an element index
    Write { index: usize, value: i32 },
    /// Read the value at an element index
    Read { index: usize },
    /// Run the scripted read/write driver
    Demo(DemoArgs),
    /// Dump a persisted page record
    Inspect { page: u32 },
}

#[derive(Args)]
pub struct StatusArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct DemoArgs {
    /// Seed for the random stimulus
    #[arg(long)]
    pub seed: Option<u64>,
}
