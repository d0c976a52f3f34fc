use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::num::NonZeroU32;

use rand::RngCore;

use crate::error::EraseError;

const CHUNK_SIZE: usize = 65536;

/// Overwrite the first `size` bytes of `file` with fresh random data, `passes` times.
///
/// Every pass starts at offset 0, covers exactly `size` bytes and is flushed
/// and synced to stable storage before the next one begins. The file is never
/// truncated or extended: if its length no longer matches `size` when a pass
/// is about to start, the remaining passes are abandoned.
pub fn overwrite_in_place(
    file: &mut File,
    size: u64,
    passes: NonZeroU32,
    on_pass: &mut dyn FnMut(u32),
) -> Result<(), EraseError> {
    let mut rng = rand::rng();
    let mut buf = vec![0u8; chunk_len(size, CHUNK_SIZE)];

    for pass in 1..=passes.get() {
        let fail = |source| EraseError::PassFailed { pass, source };

        let actual = file.metadata().map_err(fail)?.len();
        if actual != size {
            return Err(EraseError::SizeChanged {
                pass,
                expected: size,
                actual,
            });
        }

        file.seek(SeekFrom::Start(0)).map_err(fail)?;
        let mut remaining = size;

        while remaining > 0 {
            let chunk = chunk_len(remaining, buf.len());
            rng.fill_bytes(&mut buf[..chunk]);
            file.write_all(&buf[..chunk]).map_err(fail)?;
            remaining -= chunk as u64;
        }

        file.flush().map_err(fail)?;
        file.sync_all().map_err(fail)?;
        on_pass(pass);
    }

    Ok(())
}

/// Bytes to write next: `remaining` capped at `cap`, without truncating on 32-bit targets.
fn chunk_len(remaining: u64, cap: usize) -> usize {
    usize::try_from(remaining).map_or(cap, |r| r.min(cap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Read;
    use tempfile::NamedTempFile;

    fn passes(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn open_rw(tmp: &NamedTempFile) -> File {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(tmp.path())
            .unwrap()
    }

    #[test]
    fn overwrites_contents_without_changing_length() {
        let original = vec![b'A'; CHUNK_SIZE * 2 + 17];
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&original).unwrap();
        tmp.flush().unwrap();

        let mut file = open_rw(&tmp);
        let mut seen = Vec::new();
        overwrite_in_place(&mut file, original.len() as u64, passes(3), &mut |p| {
            seen.push(p)
        })
        .unwrap();

        assert_eq!(seen, vec![1, 2, 3]);

        let mut after = Vec::new();
        File::open(tmp.path())
            .unwrap()
            .read_to_end(&mut after)
            .unwrap();
        assert_eq!(after.len(), original.len());
        assert_ne!(after, original);
    }

    #[test]
    fn length_change_aborts_before_writing() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"secret data").unwrap();
        tmp.flush().unwrap();

        let mut file = open_rw(&tmp);
        file.set_len(4).unwrap();

        let mut calls = 0;
        let err = overwrite_in_place(&mut file, 11, passes(2), &mut |_| calls += 1).unwrap_err();

        assert!(matches!(
            err,
            EraseError::SizeChanged {
                pass: 1,
                expected: 11,
                actual: 4
            }
        ));
        assert_eq!(calls, 0);
        assert_eq!(std::fs::read(tmp.path()).unwrap(), b"secr");
    }

    #[test]
    fn chunks_never_wrap_for_huge_files() {
        assert_eq!(chunk_len(11, CHUNK_SIZE), 11);
        assert_eq!(chunk_len(CHUNK_SIZE as u64, CHUNK_SIZE), CHUNK_SIZE);
        assert_eq!(chunk_len((1u64 << 32) + 5, CHUNK_SIZE), CHUNK_SIZE);
        assert_eq!(chunk_len(1u64 << 32, CHUNK_SIZE), CHUNK_SIZE);
        assert_eq!(chunk_len(u64::MAX, CHUNK_SIZE), CHUNK_SIZE);
        assert_eq!(chunk_len(0, CHUNK_SIZE), 0);
    }
}
