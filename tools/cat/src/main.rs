//! `cat <image> <inum>` — prints the direct block pointers in use
//! followed by the file's raw byte content, matching the "File blocks"
//! / "File data" debugging format.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use blockfs::InodeType;
use clap::Parser;

#[derive(Parser)]
#[command(about = "Print a blockfs file's direct pointers and content")]
struct Cli {
    /// Path to the disk image
    image: PathBuf,
    /// Inode number of the regular file to print
    inum: usize,
}

fn main() -> ExitCode {
    blockfs_cli::init_logging();
    let cli = Cli::parse();
    blockfs_cli::run("cat", || {
        let mut fs = blockfs_cli::open_image(&cli.image)?;
        let inode = fs.stat(cli.inum)?;
        if inode.ty != InodeType::Regular {
            return Err(blockfs::FsError::InvalidType);
        }

        println!("File blocks");
        for i in 0..inode.blocks_in_use() {
            println!("{}", inode.direct[i]);
        }
        println!();
        println!("File data");

        let size = inode.size as usize;
        let mut buf = vec![0u8; size];
        fs.read(cli.inum, &mut buf, size)?;
        std::io::stdout().write_all(&buf)?;
        Ok(())
    })
}
