// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use walkdir::WalkDir;

const LICENSE_HEADER: &str = "\
// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.
";

/// Directories that hold workspace sources.
const SOURCE_ROOTS: [&str; 3] = ["cli", "crates", "tools"];

/// Entries every checkout needs ignored.
const GITIGNORE_ENTRIES: [&str; 4] = ["/target", ".env", "*.pem", ".DS_Store"];

fn workspace_root() -> PathBuf {
    // tools/xtask/ -> workspace root
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("xtask manifest dir has a workspace root")
        .to_path_buf()
}

fn source_files() -> impl Iterator<Item = PathBuf> {
    let root = workspace_root();
    SOURCE_ROOTS.into_iter().flat_map(move |dir| {
        WalkDir::new(root.join(dir))
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "rs")
                    && !entry.path().components().any(|c| c.as_os_str() == "target")
            })
            .map(|entry| entry.into_path())
    })
}

fn check_license() -> anyhow::Result<()> {
    let mut missing = Vec::new();
    for path in source_files() {
        let contents =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        if !contents.starts_with(LICENSE_HEADER) {
            missing.push(path);
        }
    }

    if missing.is_empty() {
        println!("All source files carry the license header.");
        Ok(())
    } else {
        for path in &missing {
            eprintln!("missing license header: {}", path.display());
        }
        bail!("{} file(s) missing the license header", missing.len())
    }
}

fn fix_license() -> anyhow::Result<()> {
    let mut fixed = 0usize;
    for path in source_files() {
        let contents =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        if contents.starts_with(LICENSE_HEADER) {
            continue;
        }
        fs::write(&path, format!("{LICENSE_HEADER}\n{contents}"))
            .with_context(|| format!("writing {}", path.display()))?;
        println!("added license header: {}", path.display());
        fixed += 1;
    }
    println!("{fixed} file(s) updated.");
    Ok(())
}

fn update_gitignore() -> anyhow::Result<()> {
    let path = workspace_root().join(".gitignore");
    let mut contents = fs::read_to_string(&path).unwrap_or_default();

    let mut appended = 0usize;
    for entry in GITIGNORE_ENTRIES {
        if contents.lines().any(|line| line.trim() == entry) {
            continue;
        }
        if !contents.is_empty() && !contents.ends_with('\n') {
            contents.push('\n');
        }
        contents.push_str(entry);
        contents.push('\n');
        appended += 1;
    }

    if appended > 0 {
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
    }
    println!("{appended} entry(ies) appended to .gitignore.");
    Ok(())
}

fn print_help() {
    println!(
        "
Usage: Run with `cargo xtask <task>`, eg. `cargo xtask check-license`.
Tasks:
    check-license: Verify that every source file carries the license header.
    fix-license: Insert the license header where it is missing.
    update-gitignore: Append required entries to the workspace .gitignore.
"
    );
}

fn main() -> anyhow::Result<()> {
    let task = env::args().nth(1);
    match task {
        None => print_help(),
        Some(t) => match t.as_str() {
            "check-license" => check_license()?,
            "fix-license" => fix_license()?,
            "update-gitignore" => update_gitignore()?,
            invalid => {
                print_help();
                bail!("Invalid task name: {}", invalid)
            }
        },
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_shape() {
        assert!(LICENSE_HEADER.starts_with("// Copyright"));
        assert!(LICENSE_HEADER.ends_with("Apache License, Version 2.0.\n"));
        assert_eq!(LICENSE_HEADER.lines().count(), 9);
    }
}
