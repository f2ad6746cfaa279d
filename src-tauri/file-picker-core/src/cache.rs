//! Copies provider-backed content into the private cache dir.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::host::Host;
use crate::resolver::ResourceHandle;
use crate::Result;

/// Deterministic destination: the same display name always maps to the same file.
#[inline]
pub fn destination(cache_dir: &Path, display_name: &str) -> PathBuf {
    cache_dir.join(display_name)
}

/// Input for hosts that serve content as byte ranges instead of a stream.
///
/// `fetch(offset, len)` returns at most `len` bytes starting at `offset`; an
/// empty range marks the end of the content. Each `read` asks for no more
/// than the caller's buffer, so memory stays bounded by the copy chunk.
pub struct RangedReader<F> {
    fetch: F,
    offset: u64,
    done: bool,
}

impl<F> RangedReader<F>
where
    F: FnMut(u64, usize) -> io::Result<Vec<u8>>,
{
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            offset: 0,
            done: false,
        }
    }

    /// Bytes handed out so far.
    pub fn position(&self) -> u64 {
        self.offset
    }
}

impl<F> Read for RangedReader<F>
where
    F: FnMut(u64, usize) -> io::Result<Vec<u8>>,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }
        let chunk = (self.fetch)(self.offset, buf.len())?;
        if chunk.is_empty() {
            self.done = true;
            return Ok(0);
        }
        if chunk.len() > buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("range at {} returned {} bytes, asked for {}", self.offset, chunk.len(), buf.len()),
            ));
        }
        buf[..chunk.len()].copy_from_slice(&chunk);
        self.offset += chunk.len() as u64;
        Ok(chunk.len())
    }
}

/// Streams `handle` into `dest` in `chunk_size` pieces, then flushes and syncs.
/// An existing file at `dest` is truncated first.
pub fn materialize<H: Host + ?Sized>(
    host: &H,
    handle: &ResourceHandle,
    dest: &Path,
    chunk_size: usize,
) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut input = host.open_input(handle)?;
    let file = File::create(dest)?;
    let mut out = BufWriter::new(file);
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        out.write_all(&buf[..n])?;
        total += n as u64;
    }
    out.flush()?;
    let file = out.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    tracing::info!(handle = %handle, path = %dest.display(), bytes = total, "cloud file cached");
    Ok(total)
}
