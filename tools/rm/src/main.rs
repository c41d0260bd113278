//! `rm <image> <parent-inum> <name>` — removes a directory entry.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

#[derive(Parser)]
#[command(about = "Remove a directory entry from a blockfs image")]
struct Cli {
    /// Path to the disk image
    image: PathBuf,
    /// Inode number of the parent directory
    parent_inum: usize,
    /// Name of the entry to remove
    name: String,
}

fn main() -> ExitCode {
    blockfs_cli::init_logging();
    let cli = Cli::parse();
    blockfs_cli::run("rm", || {
        let mut fs = blockfs_cli::open_image(&cli.image)?;
        fs.unlink(cli.parent_inum, &cli.name)?;
        Ok(())
    })
}
