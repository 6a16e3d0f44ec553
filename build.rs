use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const ENV_PREFIX: &str = "INTEL_REPORT_";
const TEST_MODULE_MARKER: &str = "\nmod tests {";

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_rs_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
    out.sort();
    Ok(())
}

/// Only whole string literals count, e.g. `"INTEL_REPORT_HOME"`. The bare
/// prefix and keys mentioned in prose or test modules are not recognised.
fn collect_env_keys(source: &str, out: &mut BTreeSet<String>) {
    let production = source
        .split_once(TEST_MODULE_MARKER)
        .map_or(source, |(head, _)| head);

    let literals = production
        .lines()
        .flat_map(|line| line.split('"').skip(1).step_by(2));
    for literal in literals {
        let Some(suffix) = literal.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let well_formed = !suffix.is_empty()
            && suffix
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');
        if well_formed {
            out.insert(literal.to_string());
        }
    }
}

fn write_generated_allowlist(files: &[PathBuf]) -> std::io::Result<()> {
    let mut keys = BTreeSet::new();
    for file in files {
        let content = fs::read_to_string(file)?;
        collect_env_keys(&content, &mut keys);
    }

    let out_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| std::io::Error::other("OUT_DIR not set"))?;
    let mut f = fs::File::create(out_dir.join("intel_env_allowlist.rs"))?;
    writeln!(f, "/// `{ENV_PREFIX}*` keys read outside test code.")?;
    writeln!(f, "pub const GENERATED_INTEL_ENV_ALLOWLIST: &[&str] = &[")?;
    for key in &keys {
        writeln!(f, "    {key:?},")?;
    }
    writeln!(f, "];")?;
    Ok(())
}

fn main() {
    let mut files = Vec::new();
    if let Err(err) = collect_rs_files(Path::new("src"), &mut files) {
        panic!("failed to scan src for env keys: {err}");
    }
    if let Err(err) = write_generated_allowlist(&files) {
        panic!("failed to generate {ENV_PREFIX} env allowlist: {err}");
    }

    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    let version = env::var("CARGO_PKG_VERSION").unwrap_or_default();
    println!(
        "cargo:rustc-env=BUILD_UUID={version}+{:x}{:08x}",
        now.as_secs(),
        now.subsec_nanos()
    );

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
    for file in &files {
        println!("cargo:rerun-if-changed={}", file.display());
    }
}
