//! Scratch names for atomic config writes.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static SEQ: AtomicU64 = AtomicU64::new(0);

/// A hidden file next to `target` that no other writer will pick.
/// The name mixes pid, wall clock and a process-local sequence number.
pub(super) fn tmp_sibling_name(target: &Path) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let file_name = format!(
        ".sync_relocate.{}.{stamp}.{}.partial",
        std::process::id(),
        SEQ.fetch_add(1, Ordering::Relaxed)
    );
    match target.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn names_do_not_collide_across_threads() {
        let handles: Vec<_> = (0..16)
            .map(|_| thread::spawn(|| tmp_sibling_name(Path::new("/cfg/config.xml"))))
            .collect();
        let set: HashSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(set.len(), 16);
        assert!(set.iter().all(|p| p.parent() == Some(Path::new("/cfg"))));
    }
}
