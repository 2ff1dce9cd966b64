use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use crate::common::MapReduceApp;

pub fn part_file_name(partition: usize) -> String {
    format!("part-{:05}", partition)
}

/// Creates `dir` if needed and refuses to reuse one that already holds
/// part files.
pub fn prepare_output_dir(dir: &Path) -> anyhow::Result<()> {
    if dir.is_file() {
        bail!("output path {} is a file", dir.display());
    }
    if dir.exists() {
        for entry in fs::read_dir(dir)? {
            let name = entry?.file_name();
            if name.to_string_lossy().starts_with("part-") {
                bail!("output directory {} already contains results", dir.display());
            }
        }
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    Ok(())
}

/// Writes final records for one partition. `records` must already be sorted
/// by key.
pub fn write_part<A: MapReduceApp>(
    app: &A,
    dir: &Path,
    partition: usize,
    records: &[(A::Key, A::Value)],
) -> anyhow::Result<PathBuf> {
    let path = dir.join(part_file_name(partition));
    let file = fs::File::create(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for (key, value) in records {
        for line in app.render(key, value) {
            writeln!(out, "{}", line)?;
        }
    }
    out.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_names_are_zero_padded() {
        assert_eq!(part_file_name(0), "part-00000");
        assert_eq!(part_file_name(42), "part-00042");
    }

    #[test]
    fn refuses_to_overwrite_results() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        prepare_output_dir(&out).unwrap();
        prepare_output_dir(&out).unwrap();
        fs::write(out.join("part-00000"), "x\t1\n").unwrap();
        assert!(prepare_output_dir(&out).is_err());
    }
}
