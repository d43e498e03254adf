//! Git-backed versioned store.
//!
//! Snapshots live in one local repository: each skill occupies a
//! top-level directory of the working tree, every capture is a commit on
//! a single linear branch, and versions are addressed by annotated tags
//! `<skill>/v<N>`. When an `origin` remote is configured, saves push the
//! branch and tag; without one every operation is purely local.
//!
//! The store is the single source of truth. The fingerprint cache lives
//! under [`CACHE_DIR_NAME`] inside this repository but is kept out of
//! history via `.gitignore`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use git2::build::CheckoutBuilder;
use git2::{
    DiffOptions, IndexAddOption, ObjectType, Repository, ResetType, Signature, StatusOptions,
    TreeWalkMode, TreeWalkResult,
};
use serde::Serialize;
use tracing::debug;

use crate::core::exclude::ExcludePolicy;
use crate::core::version::VersionTag;
use crate::error::{Result, SnapError};
use crate::utils::fs::{copy_tree_filtered, ensure_dir};

/// Cache directory inside the store; never committed.
pub const CACHE_DIR_NAME: &str = ".snapshot_cache";

pub const DEFAULT_BRANCH: &str = "main";

/// One version of a skill as recorded in the store.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub tag: VersionTag,
    pub message: String,
    pub created: DateTime<Utc>,
}

pub struct SnapshotStore {
    repo: Repository,
    root: PathBuf,
    branch: String,
}

impl SnapshotStore {
    /// Whether a store exists at `root`.
    #[must_use]
    pub fn is_initialized(root: &Path) -> bool {
        root.join(".git").exists()
    }

    /// Open an existing store. Fails with `NotInitialized` if none exists.
    pub fn open(root: &Path, branch: &str) -> Result<Self> {
        if !Self::is_initialized(root) {
            return Err(SnapError::NotInitialized(root.to_path_buf()));
        }
        let repo = Repository::open(root)?;
        Ok(Self {
            repo,
            root: root.to_path_buf(),
            branch: branch.to_string(),
        })
    }

    /// Create (or adopt) the store at `root`: init the repository, seed
    /// `README.md` and a `.gitignore` covering the cache directory, and
    /// make the initial commit if the branch is unborn. Idempotent.
    pub fn init(root: &Path, branch: &str) -> Result<Self> {
        ensure_dir(root)?;
        let repo = Repository::init(root)?;
        let store = Self {
            repo,
            root: root.to_path_buf(),
            branch: branch.to_string(),
        };
        if store.head_commit()?.is_none() {
            store.repo.set_head(&format!("refs/heads/{branch}"))?;
        }
        store.write_seed_files()?;
        if store.head_commit()?.is_none() {
            let sig = store.signature()?;
            let mut index = store.repo.index()?;
            index.add_path(Path::new("README.md"))?;
            index.add_path(Path::new(".gitignore"))?;
            index.write()?;
            let tree_id = index.write_tree()?;
            let tree = store.repo.find_tree(tree_id)?;
            store
                .repo
                .commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])?;
            debug!(target: "store", root = %root.display(), "store initialized");
        }
        Ok(store)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Whether an `origin` remote is configured.
    pub fn has_remote(&self) -> Result<bool> {
        Ok(self.find_origin()?.is_some())
    }

    /// Uncommitted changes in the store's working tree or index.
    pub fn is_dirty(&self) -> Result<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(!statuses.is_empty())
    }

    // ------------------------------------------------------------------
    // Staging and committing

    /// Replace the store's working copy for `name` with a filtered copy
    /// of `src`, then stage it (including deletions of vanished files).
    pub fn stage(&self, name: &str, src: &Path, exclude: &ExcludePolicy) -> Result<()> {
        let dest = self.root.join(name);
        if dest.exists() {
            std::fs::remove_dir_all(&dest)?;
        }
        copy_tree_filtered(src, &dest, exclude)?;

        let mut index = self.repo.index()?;
        index.add_all([name], IndexAddOption::DEFAULT, None)?;
        index.update_all([name], None)?;
        index.write()?;
        Ok(())
    }

    /// Store-level no-op check: is the staged content for `name`
    /// byte-identical to the last committed snapshot? Independent of the
    /// fingerprint cache, as a second line of defense against staleness.
    pub fn staged_matches_head(&self, name: &str) -> Result<bool> {
        let index = self.repo.index()?;
        let head_tree = match self.head_commit()? {
            Some(commit) => Some(commit.tree()?),
            None => None,
        };
        let mut opts = DiffOptions::new();
        opts.pathspec(name);
        let diff =
            self.repo
                .diff_tree_to_index(head_tree.as_ref(), Some(&index), Some(&mut opts))?;
        Ok(diff.deltas().len() == 0)
    }

    /// Commit the staged index and attach the annotated version tag. If
    /// tagging fails the commit is rolled back, leaving the store at its
    /// prior state.
    pub fn commit_and_tag(&self, tag: &VersionTag, message: &str) -> Result<()> {
        let sig = self.signature()?;
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let parent = self.head_commit()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let summary = format!("[{}] v{}: {message}", tag.skill, tag.number);
        let commit_id = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, &summary, &tree, &parents)?;
        let object = self.repo.find_object(commit_id, None)?;

        if let Err(err) = self.repo.tag(&tag.to_string(), &object, &sig, message, false) {
            self.rollback_commit(parent.as_ref())?;
            return Err(SnapError::Integrity(format!(
                "tagging {tag} failed ({}); commit rolled back",
                err.message()
            )));
        }
        debug!(target: "store", %tag, "snapshot committed");
        Ok(())
    }

    /// Drop staged changes for `name` and restore its working copy to the
    /// last committed state (or remove it, on an unborn branch).
    pub fn discard_staged(&self, name: &str) -> Result<()> {
        match self.head_commit()? {
            Some(head) => {
                self.repo
                    .reset_default(Some(head.as_object()), [name])?;
                let mut checkout = CheckoutBuilder::new();
                checkout.force().remove_untracked(true).path(name);
                self.repo.checkout_head(Some(&mut checkout))?;
            }
            None => {
                let mut index = self.repo.index()?;
                index.remove_dir(Path::new(name), 0)?;
                index.write()?;
                let dest = self.root.join(name);
                if dest.exists() {
                    std::fs::remove_dir_all(dest)?;
                }
            }
        }
        Ok(())
    }

    /// Remove a version that was committed and tagged locally but never
    /// durably persisted: delete the tag and move the branch back to the
    /// parent commit. The staged working copy is left for
    /// [`Self::discard_staged`] to clean up.
    pub fn undo_version(&self, tag: &VersionTag) -> Result<()> {
        if self.has_version(tag) {
            self.repo.tag_delete(&tag.to_string())?;
        }
        let parent = match self.head_commit()? {
            Some(commit) => commit.parent(0).ok(),
            None => None,
        };
        self.rollback_commit(parent.as_ref())?;
        Ok(())
    }

    fn rollback_commit(&self, parent: Option<&git2::Commit<'_>>) -> Result<()> {
        match parent {
            Some(commit) => {
                self.repo.reset(commit.as_object(), ResetType::Mixed, None)?;
            }
            None => {
                let mut branch = self
                    .repo
                    .find_reference(&format!("refs/heads/{}", self.branch))?;
                branch.delete()?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Version lookup

    /// Existing version numbers for a skill, ascending. Malformed tags
    /// are ignored rather than failing the operation.
    pub fn version_numbers(&self, name: &str) -> Result<Vec<u32>> {
        let pattern = format!("{name}/v*");
        let names = self.repo.tag_names(Some(&pattern))?;
        let mut numbers: Vec<u32> = names
            .iter()
            .flatten()
            .filter_map(|tag| VersionTag::parse_for(name, tag))
            .collect();
        numbers.sort_unstable();
        Ok(numbers)
    }

    /// Most recent version tag for a skill, if any.
    pub fn latest_version(&self, name: &str) -> Result<Option<VersionTag>> {
        Ok(self
            .version_numbers(name)?
            .last()
            .map(|&n| VersionTag::new(name, n)))
    }

    /// All versions of a skill with annotations and timestamps, ascending.
    pub fn list_versions(&self, name: &str) -> Result<Vec<VersionInfo>> {
        let mut infos = Vec::new();
        for number in self.version_numbers(name)? {
            let tag = VersionTag::new(name, number);
            let object = self.repo.revparse_single(&format!("refs/tags/{tag}"))?;
            let (message, seconds) = match object.as_tag() {
                Some(annotated) => (
                    annotated.message().unwrap_or("").trim().to_string(),
                    annotated.tagger().map_or(0, |t| t.when().seconds()),
                ),
                None => {
                    let commit = object.peel_to_commit()?;
                    (
                        commit.summary().unwrap_or("").to_string(),
                        commit.time().seconds(),
                    )
                }
            };
            let created = DateTime::<Utc>::from_timestamp(seconds, 0).unwrap_or_default();
            infos.push(VersionInfo {
                tag,
                message,
                created,
            });
        }
        Ok(infos)
    }

    /// All versions across every skill, ascending by skill then number.
    pub fn list_all_versions(&self) -> Result<Vec<VersionInfo>> {
        let names = self.repo.tag_names(Some("*/v*"))?;
        let mut skills: Vec<String> = names
            .iter()
            .flatten()
            .filter_map(VersionTag::parse)
            .map(|tag| tag.skill)
            .collect();
        skills.sort();
        skills.dedup();

        let mut infos = Vec::new();
        for skill in skills {
            infos.extend(self.list_versions(&skill)?);
        }
        Ok(infos)
    }

    pub fn has_version(&self, tag: &VersionTag) -> bool {
        self.repo
            .revparse_single(&format!("refs/tags/{tag}"))
            .is_ok()
    }

    fn version_not_found(&self, tag: &VersionTag) -> SnapError {
        SnapError::VersionNotFound {
            name: tag.skill.clone(),
            version: tag.number,
            available: self.version_numbers(&tag.skill).unwrap_or_default(),
        }
    }

    /// Read the file contents of a skill's tree at a given version. The
    /// result holds only blob content keyed by slash-separated relative
    /// path, so store bookkeeping can never leak into a working tree.
    pub fn read_version_tree(&self, tag: &VersionTag) -> Result<BTreeMap<String, Vec<u8>>> {
        let object = self
            .repo
            .revparse_single(&format!("refs/tags/{tag}"))
            .map_err(|_| self.version_not_found(tag))?;
        let commit = object.peel_to_commit()?;
        let tree = commit.tree()?;
        let entry = tree.get_path(Path::new(&tag.skill)).map_err(|_| {
            SnapError::Integrity(format!("snapshot {tag} holds no content for '{}'", tag.skill))
        })?;
        let subtree = entry.to_object(&self.repo)?.peel_to_tree()?;

        let mut files = BTreeMap::new();
        let mut walk_err: Option<git2::Error> = None;
        subtree.walk(TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                let name = entry.name().unwrap_or_default();
                match self.repo.find_blob(entry.id()) {
                    Ok(blob) => {
                        files.insert(format!("{dir}{name}"), blob.content().to_vec());
                    }
                    Err(err) => {
                        walk_err = Some(err);
                        return TreeWalkResult::Abort;
                    }
                }
            }
            TreeWalkResult::Ok
        })?;
        if let Some(err) = walk_err {
            return Err(err.into());
        }
        Ok(files)
    }

    /// Delete a version tag locally and, when a remote is configured,
    /// remotely. The commit itself stays; numbers are never reissued.
    pub fn delete_version(&self, tag: &VersionTag) -> Result<()> {
        if !self.has_version(tag) {
            return Err(self.version_not_found(tag));
        }
        self.repo.tag_delete(&tag.to_string())?;
        if let Some(mut remote) = self.find_origin()? {
            let spec = format!(":refs/tags/{tag}");
            remote.push(&[spec.as_str()], None)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Remote sync

    /// Fetch tags from `origin`. Returns false when no remote exists.
    pub fn fetch_tags(&self) -> Result<bool> {
        let Some(mut remote) = self.find_origin()? else {
            debug!(target: "store", "no origin remote, skipping fetch");
            return Ok(false);
        };
        remote.fetch(&["refs/tags/*:refs/tags/*"], None, None)?;
        Ok(true)
    }

    /// Push the branch and one version tag to `origin`. Returns false
    /// when no remote exists.
    pub fn push_version(&self, tag: &VersionTag) -> Result<bool> {
        let Some(mut remote) = self.find_origin()? else {
            debug!(target: "store", "no origin remote, skipping push");
            return Ok(false);
        };
        let branch_spec = format!("refs/heads/{b}:refs/heads/{b}", b = self.branch);
        let tag_spec = format!("refs/tags/{tag}:refs/tags/{tag}");
        remote.push(&[branch_spec.as_str(), tag_spec.as_str()], None)?;
        Ok(true)
    }

    /// Point `origin` at the given URL, creating the remote if needed.
    /// Provisioning and authentication of the remote itself stay outside
    /// this tool.
    pub fn configure_remote(&self, url: &str) -> Result<()> {
        if self.find_origin()?.is_some() {
            self.repo.remote_set_url("origin", url)?;
        } else {
            self.repo.remote("origin", url)?;
        }
        Ok(())
    }

    fn find_origin(&self) -> Result<Option<git2::Remote<'_>>> {
        match self.repo.find_remote("origin") {
            Ok(remote) => Ok(Some(remote)),
            Err(err) if err.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    // ------------------------------------------------------------------

    fn head_commit(&self) -> Result<Option<git2::Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(err)
                if err.code() == git2::ErrorCode::UnbornBranch
                    || err.code() == git2::ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Repository signature, falling back to a fixed identity when no
    /// git config is present (fresh machines, CI).
    fn signature(&self) -> Result<Signature<'static>> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig),
            Err(_) => Ok(Signature::now("sksnap", "sksnap@localhost")?),
        }
    }

    fn write_seed_files(&self) -> Result<()> {
        let readme = self.root.join("README.md");
        if !readme.exists() {
            std::fs::write(
                &readme,
                "# Skill Snapshots\n\nPrivate backup for Claude Code skills, managed by sksnap.\n",
            )?;
        }

        let gitignore = self.root.join(".gitignore");
        let cache_line = format!("{CACHE_DIR_NAME}/");
        match std::fs::read_to_string(&gitignore) {
            Ok(content) if content.lines().any(|l| l.trim() == cache_line) => {}
            Ok(content) => {
                std::fs::write(&gitignore, format!("{content}\n{cache_line}\n"))?;
            }
            Err(_) => {
                std::fs::write(&gitignore, format!("{cache_line}\n"))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_skill(content: &str) -> (tempfile::TempDir, SnapshotStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::init(&dir.path().join("store"), DEFAULT_BRANCH).unwrap();
        let skill = dir.path().join("alpha");
        std::fs::create_dir_all(&skill).unwrap();
        std::fs::write(skill.join("SKILL.md"), content).unwrap();
        (dir, store)
    }

    #[test]
    fn open_requires_init() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nowhere");
        assert!(matches!(
            SnapshotStore::open(&missing, DEFAULT_BRANCH),
            Err(SnapError::NotInitialized(_))
        ));
    }

    #[test]
    fn init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        SnapshotStore::init(&root, DEFAULT_BRANCH).unwrap();
        SnapshotStore::init(&root, DEFAULT_BRANCH).unwrap();
        let store = SnapshotStore::open(&root, DEFAULT_BRANCH).unwrap();
        assert!(!store.is_dirty().unwrap());
    }

    #[test]
    fn stage_commit_tag_and_read_back() {
        let (dir, store) = store_with_skill("manifest");
        let exclude = ExcludePolicy::default();
        store.stage("alpha", &dir.path().join("alpha"), &exclude).unwrap();
        assert!(!store.staged_matches_head("alpha").unwrap());

        let tag = VersionTag::new("alpha", 1);
        store.commit_and_tag(&tag, "first").unwrap();
        assert_eq!(store.version_numbers("alpha").unwrap(), vec![1]);

        let files = store.read_version_tree(&tag).unwrap();
        assert_eq!(files.get("SKILL.md").map(Vec::as_slice), Some(b"manifest".as_slice()));

        // Re-staging identical content is a store-level no-op.
        store.stage("alpha", &dir.path().join("alpha"), &exclude).unwrap();
        assert!(store.staged_matches_head("alpha").unwrap());
    }

    #[test]
    fn deleted_versions_keep_gaps() {
        let (dir, store) = store_with_skill("v1");
        let exclude = ExcludePolicy::default();
        let skill = dir.path().join("alpha");

        for (n, content) in [(1, "v1"), (2, "v2"), (3, "v3")] {
            std::fs::write(skill.join("SKILL.md"), content).unwrap();
            store.stage("alpha", &skill, &exclude).unwrap();
            store
                .commit_and_tag(&VersionTag::new("alpha", n), "snap")
                .unwrap();
        }

        store.delete_version(&VersionTag::new("alpha", 2)).unwrap();
        assert_eq!(store.version_numbers("alpha").unwrap(), vec![1, 3]);
        assert!(matches!(
            store.read_version_tree(&VersionTag::new("alpha", 2)),
            Err(SnapError::VersionNotFound { available, .. }) if available == vec![1, 3]
        ));
    }

    #[test]
    fn discard_staged_restores_prior_state() {
        let (dir, store) = store_with_skill("committed");
        let exclude = ExcludePolicy::default();
        let skill = dir.path().join("alpha");
        store.stage("alpha", &skill, &exclude).unwrap();
        store
            .commit_and_tag(&VersionTag::new("alpha", 1), "snap")
            .unwrap();

        std::fs::write(skill.join("SKILL.md"), "edited").unwrap();
        store.stage("alpha", &skill, &exclude).unwrap();
        store.discard_staged("alpha").unwrap();

        let staged = std::fs::read_to_string(store.root().join("alpha/SKILL.md")).unwrap();
        assert_eq!(staged, "committed");
        assert!(store.staged_matches_head("alpha").unwrap());
    }
}
