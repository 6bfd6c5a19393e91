use std::fs::{File as StdFile, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use scopeguard::guard;
use serde::Serialize;
use tokio::task;

/// Atomically replace `path` with the pretty-printed JSON of `value`.
pub(crate) async fn write_snapshot<T: Serialize>(path: String, value: &T) -> Result<()> {
    let contents = serde_json::to_vec_pretty(value)?;

    task::spawn_blocking(move || -> Result<()> {
        let path = Path::new(&path);
        let dir = parent_dir(path);
        std::fs::create_dir_all(dir)?;

        let tmp_file = format!("{}.tmp", path.display());
        let cleanup = guard(tmp_file.clone(), |tmp| {
            let _ = std::fs::remove_file(tmp);
        });
        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_file)?;
            let mut writer = std::io::BufWriter::new(&file);
            writer.write_all(&contents)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_file, path)?;
        scopeguard::ScopeGuard::into_inner(cleanup);
        if let Ok(dir) = StdFile::open(dir) {
            let _ = dir.sync_all();
        }
        Ok(())
    })
    .await??;

    Ok(())
}

/// Directory holding `path`; a bare file name lives in the working directory.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
