//! # UAST Dev CLI
//!
//! HTTP backend for the development server plus the pieces the `uast-dev` binary is built from.

pub mod http_backend;
pub mod ops;

pub use http_backend::{HttpBackend, DEFAULT_SERVER};
pub use ops::SessionOp;

use std::io::{self, Write};

/// Writes one line to stdout; a closed pipe is not an error.
pub fn print_stdout(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.write_all(b"\n"))
        .and_then(|()| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err);
    }
    Ok(())
}
