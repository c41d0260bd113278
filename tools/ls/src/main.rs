//! `ls <image> <path>` — prints `inum\tname` for each entry of a
//! directory, sorted ascending by name bytes, or a single line for a
//! regular file target.

use std::path::PathBuf;
use std::process::ExitCode;

use blockfs::InodeType;
use clap::Parser;

#[derive(Parser)]
#[command(about = "List a directory or file on a blockfs image")]
struct Cli {
    /// Path to the disk image
    image: PathBuf,
    /// Absolute path inside the filesystem to list
    path: String,
}

fn main() -> ExitCode {
    blockfs_cli::init_logging();
    let cli = Cli::parse();
    blockfs_cli::run("ls", || {
        let mut fs = blockfs_cli::open_image(&cli.image)?;
        let inum = fs.resolve_path(&cli.path)?;
        let inode = fs.stat(inum)?;
        if inode.ty == InodeType::Directory {
            for entry in fs.read_dir(inum)? {
                println!("{}\t{}", entry.inum, entry.name);
            }
        } else {
            let name = cli.path.rsplit('/').next().unwrap_or(&cli.path);
            println!("{inum}\t{name}");
        }
        Ok(())
    })
}
