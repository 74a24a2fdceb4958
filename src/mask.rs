use std::path::{Path, PathBuf};

/// Existence check for mask assets, injected so path resolution can be
/// exercised without touching the disk.
pub trait PathProbe: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

/// Probe backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl PathProbe for FsProbe {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

impl<F> PathProbe for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn exists(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Filename with its final extension removed (`leaf.v2.jpg` -> `leaf.v2`).
/// Leading dots never start an extension (`..png` stays `..png`).
pub fn basename(filename: &str) -> &str {
    let leading = filename.len() - filename.trim_start_matches('.').len();
    match filename[leading..].rfind('.') {
        Some(idx) => &filename[..leading + idx],
        None => filename,
    }
}

/// `<root>/<label>/<basename>_mask.png`
pub fn mask_path(root: &Path, label: &str, filename: &str) -> PathBuf {
    root.join(label)
        .join(format!("{}_mask.png", basename(filename)))
}

/// Resolves the mask for `filename` under `label`, or `None` when the probe
/// says the file is not there.
pub fn resolve(
    root: &Path,
    label: &str,
    filename: &str,
    probe: &dyn PathProbe,
) -> Option<PathBuf> {
    let path = mask_path(root, label, filename);
    probe.exists(&path).then_some(path)
}
