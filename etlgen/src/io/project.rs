//! Project directory lifecycle: naming, reset, script placement.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rand::{Rng, distributions::Alphanumeric};
use tracing::debug;

/// Directory the pipeline owns for one run.
pub fn resolve_project_dir(base_dir: &Path, name: &str, unique: bool) -> PathBuf {
    if unique {
        let run_name = build_run_dir_name(name, &generate_timestamp(), &generate_short_id());
        base_dir.join(run_name)
    } else {
        base_dir.join(name)
    }
}

pub fn build_run_dir_name(name: &str, timestamp: &str, short_id: &str) -> String {
    format!("{name}_{timestamp}_{short_id}")
}

fn generate_timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

fn generate_short_id() -> String {
    let mut rng = rand::thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(6)
        .collect::<String>()
        .to_lowercase()
}

/// Delete `dir` recursively if it exists, then recreate it empty.
pub fn reset_project_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        debug!(dir = %dir.display(), "removing previous project directory");
        fs::remove_dir_all(dir).with_context(|| format!("remove {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(())
}

/// Write the generated script verbatim into the project directory.
pub fn write_script(dir: &Path, file_name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(file_name);
    fs::write(&path, contents).with_context(|| format!("write script {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_dir_name_uses_expected_format() {
        let name = build_run_dir_name("generated_project", "20260118_120000", "abc123");
        assert_eq!(name, "generated_project_20260118_120000_abc123");
    }

    #[test]
    fn fixed_name_resolves_directly_under_base() {
        let dir = resolve_project_dir(Path::new("work"), "proj", false);
        assert_eq!(dir, PathBuf::from("work/proj"));
    }

    #[test]
    fn unique_names_differ_between_calls() {
        let a = resolve_project_dir(Path::new("work"), "proj", true);
        let b = resolve_project_dir(Path::new("work"), "proj", true);
        assert_ne!(a, b);
        let name = a.file_name().and_then(|n| n.to_str()).expect("name");
        assert!(name.starts_with("proj_"));
        assert_eq!(name.len(), "proj_".len() + "20260118_120000".len() + 1 + 6);
    }

    #[test]
    fn reset_clears_previous_contents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path().join("proj");
        fs::create_dir_all(dir.join("nested")).expect("mkdir");
        fs::write(dir.join("nested/old.txt"), "stale").expect("write");

        reset_project_dir(&dir).expect("reset");

        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).expect("read_dir").count(), 0);
    }

    #[test]
    fn write_script_is_verbatim() {
        let temp = tempfile::tempdir().expect("tempdir");
        let text = "import os\n\nprint('hi')";
        let path = write_script(temp.path(), "run.py", text).expect("write");
        assert_eq!(fs::read_to_string(path).expect("read"), text);
    }
}
