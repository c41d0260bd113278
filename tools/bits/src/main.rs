//! `bits <image>` — dumps the super block fields and the inode/data
//! bitmaps as bit strings, for inspecting allocator state while
//! debugging.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

#[derive(Parser)]
#[command(about = "Dump super block fields and free-space bitmaps")]
struct Cli {
    /// Path to the disk image
    image: PathBuf,
}

fn bit_string(bytes: &[u8], num_bits: usize) -> String {
    let mut s = String::with_capacity(num_bits);
    for i in 0..num_bits {
        let byte = bytes[i / 8];
        let bit = (byte >> (i % 8)) & 1;
        s.push(if bit == 1 { '1' } else { '0' });
    }
    s
}

fn main() -> ExitCode {
    blockfs_cli::init_logging();
    let cli = Cli::parse();
    blockfs_cli::run("bits", || {
        let mut fs = blockfs_cli::open_image(&cli.image)?;
        let sb = *fs.superblock();

        println!("num_inodes: {}", sb.num_inodes);
        println!("num_data: {}", sb.num_data);
        println!("inode_bitmap: addr={} len={}", sb.inode_bitmap_addr, sb.inode_bitmap_len);
        println!("data_bitmap: addr={} len={}", sb.data_bitmap_addr, sb.data_bitmap_len);
        println!("inode_region: addr={} len={}", sb.inode_region_addr, sb.inode_region_len);
        println!("data_region: addr={} len={}", sb.data_region_addr, sb.data_region_len);

        let inode_bits = fs.inode_bitmap_bytes()?;
        println!("inode bitmap: {}", bit_string(&inode_bits, sb.num_inodes as usize));

        let data_bits = fs.data_bitmap_bytes()?;
        println!("data bitmap:  {}", bit_string(&data_bits, sb.num_data as usize));
        Ok(())
    })
}
