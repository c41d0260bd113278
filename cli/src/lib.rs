//! Glue shared by the `ls`/`cat`/`cp`/`rm`/`bits`/`mkfs` binaries: opening
//! an image file as a [`blockfs::Filesystem`], and the common
//! single-line-to-stderr, exit-1 error convention every utility follows.

use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;

use blockfs::{FileDevice, Filesystem, Result};

/// Installs the shared logger. Every binary calls this first in `main`.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Opens `path` as an existing, already-formatted filesystem image.
pub fn open_image(path: &Path) -> Result<Filesystem<FileDevice>> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    let dev = FileDevice::new(file)?;
    Filesystem::open(dev)
}

/// Runs `body`, and on error prints `{prog}: {err}` to stderr and exits 1,
/// matching the convention every CLI utility follows. On success, exits 0.
pub fn run(prog: &str, body: impl FnOnce() -> Result<()>) -> ExitCode {
    match body() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{prog}: {err}");
            ExitCode::FAILURE
        }
    }
}
