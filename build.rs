use std::collections::BTreeSet;
use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "CHAT_ARCHIVE_";

/// Every `.rs` file under `root`, depth first.
fn source_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut pending = vec![root.to_path_buf()];
    let mut files = Vec::new();
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Identifier-shaped tokens carrying the prefix, e.g. `CHAT_ARCHIVE_FORMAT`.
/// A bare prefix or a token ending in `_` (a prefix built by concatenation)
/// is not a key.
fn env_keys_in(source: &str) -> impl Iterator<Item = &str> {
    source
        .split(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'))
        .filter(|token| {
            token.len() > ENV_PREFIX.len() && token.starts_with(ENV_PREFIX) && !token.ends_with('_')
        })
}

fn render_key_table(keys: &BTreeSet<String>) -> String {
    let mut out = String::from("pub const KNOWN_ENV_KEYS: &[&str] = &[\n");
    for key in keys {
        let _ = writeln!(out, "    {key:?},");
    }
    out.push_str("];\n");
    out
}

fn main() -> std::io::Result<()> {
    let mut keys = BTreeSet::new();
    for file in source_files(Path::new("src"))? {
        println!("cargo:rerun-if-changed={}", file.display());
        let source = fs::read_to_string(&file)?;
        keys.extend(env_keys_in(&source).map(str::to_string));
    }

    let out_dir = env::var_os("OUT_DIR").ok_or_else(|| std::io::Error::other("OUT_DIR is not set"))?;
    fs::write(Path::new(&out_dir).join("env_keys.rs"), render_key_table(&keys))?;

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
    Ok(())
}
