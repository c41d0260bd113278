//! `cp <image> <host-file> <dst-inum>` — copies a host file's content
//! into an already-existing regular file inode.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

#[derive(Parser)]
#[command(about = "Copy a host file's content into a blockfs inode")]
struct Cli {
    /// Path to the disk image
    image: PathBuf,
    /// Host file to read
    source: PathBuf,
    /// Inode number of the destination regular file
    dst_inum: usize,
}

fn main() -> ExitCode {
    blockfs_cli::init_logging();
    let cli = Cli::parse();
    blockfs_cli::run("cp", || {
        let mut fs = blockfs_cli::open_image(&cli.image)?;
        let data = std::fs::read(&cli.source)?;

        let n = fs.write(cli.dst_inum, &data, data.len())?;
        if n < data.len() {
            log::warn!("short write: {n} of {} bytes copied", data.len());
        }
        Ok(())
    })
}
