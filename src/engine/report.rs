//! Rendering a digest map for the terminal.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use crate::{DigestMap, FileDigest};

/// Entries sorted by the whole path string (bytewise), the same order as the JSON keys.
pub fn sorted_entries(map: &DigestMap) -> Vec<(&PathBuf, &FileDigest)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.as_os_str().cmp(b.0.as_os_str()));
    entries
}

/// Write `<hex-digest>  <path>` lines, sorted by path.
pub fn write_lines<W: Write>(out: &mut W, map: &DigestMap) -> std::io::Result<()> {
    for (path, digest) in sorted_entries(map) {
        writeln!(out, "{}  {}", digest, path.display())?;
    }
    Ok(())
}

/// Write the map as a JSON object of path → hex digest (keys sorted).
pub fn write_json<W: Write>(out: &mut W, map: &DigestMap) -> anyhow::Result<()> {
    let obj: BTreeMap<String, String> = map
        .iter()
        .map(|(p, d)| (p.to_string_lossy().into_owned(), d.to_hex()))
        .collect();
    serde_json::to_writer_pretty(&mut *out, &obj)?;
    writeln!(out)?;
    Ok(())
}
