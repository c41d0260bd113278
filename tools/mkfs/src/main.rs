//! `mkfs <image> --inodes <N> --data <N>` — creates a fresh, zero-filled
//! image file of the right size and formats it with a super block,
//! free-space bitmaps, and a root directory.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;

use blockfs::{format, BLOCK_SIZE};
use clap::Parser;

#[derive(Parser)]
#[command(about = "Create and format a blockfs image file")]
struct Cli {
    /// Path of the image file to create
    image: PathBuf,
    /// Number of inodes to provision
    #[arg(long, default_value_t = 128)]
    inodes: usize,
    /// Number of data blocks to provision
    #[arg(long, default_value_t = 1024)]
    data: usize,
}

fn main() -> ExitCode {
    blockfs_cli::init_logging();
    let cli = Cli::parse();
    blockfs_cli::run("mkfs", || {
        let sb = format::plan_layout(cli.inodes, cli.data);
        let total = format::total_blocks(&sb);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&cli.image)?;
        file.set_len((total * BLOCK_SIZE) as u64)?;

        let dev = blockfs::FileDevice::new(file)?;
        blockfs::Filesystem::create(dev, cli.inodes, cli.data)?;
        log::info!("formatted {} blocks at {}", total, cli.image.display());
        Ok(())
    })
}
