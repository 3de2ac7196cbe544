//! File hashing utilities

use md5::{Digest, Md5};
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::utils::config::HashingConsts;
use crate::{DigestAlgorithm, DigestError, FileDigest};

/// Running state for one file's digest.
enum DigestState {
    Md5(Md5),
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Md5 => DigestState::Md5(Md5::new()),
            DigestAlgorithm::Blake3 => DigestState::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            DigestState::Md5(h) => h.update(data),
            DigestState::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize(self) -> FileDigest {
        match self {
            DigestState::Md5(h) => FileDigest::Md5(h.finalize().into()),
            DigestState::Blake3(h) => FileDigest::Blake3(*h.finalize().as_bytes()),
        }
    }
}

/// Digest a byte slice in one go.
pub fn digest_bytes(algorithm: DigestAlgorithm, data: &[u8]) -> FileDigest {
    let mut state = DigestState::new(algorithm);
    state.update(data);
    state.finalize()
}

/// Digest the full contents of the file at `path`. Uses memory-mapped I/O above the threshold,
/// chunked reading otherwise. Any I/O failure comes back as [`DigestError::Read`] for `key`.
pub fn digest_file(
    path: &Path,
    key: &Path,
    algorithm: DigestAlgorithm,
) -> Result<FileDigest, DigestError> {
    let read_err = |source: std::io::Error| DigestError::Read {
        path: key.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_err)?;
    let size = file.metadata().map_err(read_err)?.len();
    let mut state = DigestState::new(algorithm);

    if size > HashingConsts::HASH_MMAP_THRESHOLD {
        // Memory-mapped I/O for large files
        let mmap = unsafe { Mmap::map(&file) }.map_err(read_err)?;
        state.update(&mmap);
    } else {
        let mut reader =
            std::io::BufReader::with_capacity(HashingConsts::HASH_READ_CHUNK_SIZE, file);
        let mut buffer = vec![0u8; HashingConsts::HASH_READ_CHUNK_SIZE.min(size as usize + 1)];
        loop {
            let n = match reader.read(&mut buffer) {
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(read_err(e)),
            };
            if n == 0 {
                break;
            }
            state.update(&buffer[..n]);
        }
    }

    Ok(state.finalize())
}
