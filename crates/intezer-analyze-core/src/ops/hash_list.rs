use std::fs;
use std::path::Path;

use tracing::{debug, error};

use super::OpContext;
use crate::batch::Batch;
use crate::dispatch::{Dispatcher, Subject};
use crate::error::Error;

/// One hash per line. Surrounding whitespace and blank lines are dropped.
pub fn read_hashes(path: &Path) -> Result<Vec<String>, Error> {
    let content = fs::read_to_string(path).map_err(|source| {
        error!("Failed reading hash list {}: {}", path.display(), source);
        Error::Unreadable {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// MD5, SHA-1 or SHA-256 in hex.
pub fn is_valid_hash(hash: &str) -> bool {
    matches!(hash.len(), 32 | 40 | 64) && hash.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Submit every hash in order. Malformed hashes are counted unsupported.
pub(crate) fn submit_hashes(
    ctx: &OpContext<'_>,
    hashes: &[String],
    dispatcher: &Dispatcher<'_>,
    label: &str,
) -> Result<Batch, Error> {
    let mut batch = Batch::new();
    let mut stopped = None;

    ctx.reporter.on_batch_start(label, hashes.len());
    for hash in hashes {
        let recorded = if is_valid_hash(hash) {
            batch.record(hash.clone(), dispatcher.submit(Subject::Hash(hash)))
        } else {
            debug!("Skipping malformed hash {:?}", hash);
            batch.unsupported();
            Ok(())
        };
        ctx.reporter.on_item_done();

        if let Err(failure) = recorded {
            stopped = Some(failure);
            break;
        }
    }
    ctx.reporter.on_batch_complete();

    match stopped {
        Some(failure) => Err(Error::Api(failure.error)),
        None => Ok(batch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_hashes_skips_blank_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hashes.txt");
        fs::write(
            &path,
            "  44d88612fea8a8f36de82e1278abb02f\n\n3395856ce81f2b7382dee72602f798b642f14140\r\n",
        )
        .unwrap();

        let hashes = read_hashes(&path).unwrap();
        assert_eq!(
            hashes,
            vec![
                "44d88612fea8a8f36de82e1278abb02f",
                "3395856ce81f2b7382dee72602f798b642f14140"
            ]
        );
    }

    #[test]
    fn test_unreadable_hash_list_names_the_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hashes.txt");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x41]).unwrap();

        match read_hashes(&path) {
            Err(err @ Error::Unreadable { .. }) => assert_eq!(
                err.to_string(),
                format!("No read permissions for {}", path.display())
            ),
            other => panic!("expected Unreadable, got {:?}", other),
        }
        assert!(matches!(
            read_hashes(&tmp.path().join("missing.txt")),
            Err(Error::Unreadable { .. })
        ));
    }

    #[test]
    fn test_is_valid_hash() {
        assert!(is_valid_hash("44d88612fea8a8f36de82e1278abb02f"));
        assert!(is_valid_hash(
            "275a021bbfb6489e54d471899f7db9d1663fc695ec2fe2a2c4538aabf651fd0f"
        ));
        assert!(!is_valid_hash("not-a-hash"));
        assert!(!is_valid_hash("44d88612fea8a8f36de82e1278abb02g"));
    }
}
