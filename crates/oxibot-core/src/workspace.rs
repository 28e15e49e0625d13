//! Workspace materialization — copying a session's bootstrap files and
//! skills into another directory tree (namely, a sandbox's isolated
//! workspace) so sandboxed commands see the same context the agent does.
//!
//! Shared between [`crate::config`] consumers and the sandbox crate so
//! neither has to depend on the other for this one list of filenames.

use std::path::Path;

/// Bootstrap files read from a session workspace's root to build the
/// system prompt, and copied into sandbox workspaces verbatim.
pub const BOOTSTRAP_FILES: &[&str] = &["AGENTS.md", "SOUL.md", "USER.md", "TOOLS.md", "IDENTITY.md"];

/// Name of the skills subdirectory under a workspace.
pub const SKILLS_DIR: &str = "skills";

/// Name of the source workspace's optional init-tree directory. When
/// present, its contents are copied wholesale into the sandbox workspace
/// instead of copying `BOOTSTRAP_FILES` individually.
pub const INIT_DIR: &str = "init";

/// Copy bootstrap files and merged skills from `source_workspace` into
/// `dest_workspace`.
///
/// Precedence for `skills/`: files already present at the destination
/// (i.e. copied from `source_workspace/skills` first) are never
/// overwritten by `builtin_skills_dir` — builtin skills only fill gaps.
/// This is a deliberate divergence from a recursive directory merge that
/// lets a later pass clobber same-named files; that such a merge would
/// silently let a builtin skill shadow a user skill of the same name is
/// exactly the precedence this function exists to prevent.
pub fn materialize_bootstrap(
    source_workspace: &Path,
    dest_workspace: &Path,
    builtin_skills_dir: Option<&Path>,
) -> std::io::Result<()> {
    std::fs::create_dir_all(dest_workspace)?;

    // Prefer the source workspace's `init/` directory tree, if present,
    // over individually copying BOOTSTRAP_FILES.
    let init_dir = source_workspace.join(INIT_DIR);
    if init_dir.is_dir() {
        copy_dir_overwrite(&init_dir, dest_workspace)?;
    } else {
        for filename in BOOTSTRAP_FILES {
            let src = source_workspace.join(filename);
            if src.exists() {
                std::fs::copy(&src, dest_workspace.join(filename))?;
            }
        }
    }

    let dest_skills = dest_workspace.join(SKILLS_DIR);
    let source_skills = source_workspace.join(SKILLS_DIR);
    if source_skills.is_dir() {
        copy_dir_no_overwrite(&source_skills, &dest_skills)?;
    }
    if let Some(builtin) = builtin_skills_dir {
        if builtin.is_dir() {
            copy_dir_no_overwrite(builtin, &dest_skills)?;
        }
    }

    Ok(())
}

/// Recursively copy `src` into `dest`, overwriting any file already
/// present at the destination path.
fn copy_dir_overwrite(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_overwrite(&src_path, &dest_path)?;
        } else {
            std::fs::copy(&src_path, &dest_path)?;
        }
    }
    Ok(())
}

/// Recursively copy `src` into `dest`, skipping any file or directory that
/// already exists at the destination path.
fn copy_dir_no_overwrite(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_no_overwrite(&src_path, &dest_path)?;
        } else if !dest_path.exists() {
            std::fs::copy(&src_path, &dest_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copies_bootstrap_files() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        std::fs::write(source.path().join("AGENTS.md"), "agents content").unwrap();
        std::fs::write(source.path().join("SOUL.md"), "soul content").unwrap();

        materialize_bootstrap(source.path(), dest.path(), None).unwrap();

        assert_eq!(std::fs::read_to_string(dest.path().join("AGENTS.md")).unwrap(), "agents content");
        assert_eq!(std::fs::read_to_string(dest.path().join("SOUL.md")).unwrap(), "soul content");
        assert!(!dest.path().join("USER.md").exists());
    }

    #[test]
    fn test_skills_precedence_user_over_builtin() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let builtin = TempDir::new().unwrap();

        std::fs::create_dir_all(source.path().join("skills").join("shared-skill")).unwrap();
        std::fs::write(
            source.path().join("skills").join("shared-skill").join("SKILL.md"),
            "user version",
        )
        .unwrap();

        std::fs::create_dir_all(builtin.path().join("shared-skill")).unwrap();
        std::fs::write(builtin.path().join("shared-skill").join("SKILL.md"), "builtin version").unwrap();
        std::fs::create_dir_all(builtin.path().join("builtin-only")).unwrap();
        std::fs::write(builtin.path().join("builtin-only").join("SKILL.md"), "builtin only").unwrap();

        materialize_bootstrap(source.path(), dest.path(), Some(builtin.path())).unwrap();

        let shared = std::fs::read_to_string(dest.path().join("skills").join("shared-skill").join("SKILL.md")).unwrap();
        assert_eq!(shared, "user version", "user skill must take precedence over builtin");

        let builtin_only = std::fs::read_to_string(dest.path().join("skills").join("builtin-only").join("SKILL.md")).unwrap();
        assert_eq!(builtin_only, "builtin only", "builtin skills fill gaps not covered by user skills");
    }

    #[test]
    fn test_init_dir_tree_takes_precedence_over_bootstrap_files() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        // An init/ tree with its own nested layout, plus a top-level
        // AGENTS.md that should be ignored since init/ is present.
        std::fs::create_dir_all(source.path().join("init").join("notes")).unwrap();
        std::fs::write(source.path().join("init").join("AGENTS.md"), "from init").unwrap();
        std::fs::write(
            source.path().join("init").join("notes").join("NOTE.md"),
            "nested note",
        )
        .unwrap();
        std::fs::write(source.path().join("AGENTS.md"), "top-level, should be ignored").unwrap();

        materialize_bootstrap(source.path(), dest.path(), None).unwrap();

        assert_eq!(
            std::fs::read_to_string(dest.path().join("AGENTS.md")).unwrap(),
            "from init"
        );
        assert_eq!(
            std::fs::read_to_string(dest.path().join("notes").join("NOTE.md")).unwrap(),
            "nested note"
        );
    }

    #[test]
    fn test_missing_source_dirs_are_skipped() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        // No AGENTS.md, no skills/ at all — should not error.
        materialize_bootstrap(source.path(), dest.path(), None).unwrap();
        assert!(dest.path().exists());
    }
}
