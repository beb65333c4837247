use super::{BlockReader, ReadError};
use crate::config::BlockSize;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Reads in-process through a single block-sized buffer
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeReader;

impl BlockReader for NativeReader {
    fn read_file(&self, path: &Path, block_size: &BlockSize, cancel: &CancellationToken) -> Result<u64, ReadError> {
        let mut file = File::open(path)?;
        let mut buffer = vec![0u8; block_size.bytes() as usize];
        let mut total = 0u64;

        loop {
            if cancel.is_cancelled() {
                return Err(ReadError::Cancelled);
            }
            match file.read(&mut buffer) {
                Ok(0) => return Ok(total),
                Ok(n) => total += n as u64,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
