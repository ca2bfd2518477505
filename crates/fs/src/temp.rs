use std::{
    path::{Path, PathBuf},
    process,
    sync::atomic::{AtomicU64, Ordering},
};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Construct a path under `dir` that no other call in this process has
/// returned, without depending on a UUID crate or system time.
///
/// Combines the current process id with a monotonically increasing counter,
/// which is enough to avoid collisions between concurrent downloads within
/// one `pacm` invocation (spec: "download to a uniquely-named temp file").
pub fn unique_temp_path(dir: &Path, prefix: &str) -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("{prefix}-{pid}-{n}.tmp", pid = process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_repeats_within_a_process() {
        let dir = Path::new("/tmp");
        let a = unique_temp_path(dir, "dl");
        let b = unique_temp_path(dir, "dl");
        assert_ne!(a, b);
    }
}
