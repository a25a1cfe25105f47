//! In-memory collaborators for pipeline tests.
//!
//! `FakeGit` keeps commits as snapshots of the entry directory so that
//! checkout and reset really rewrite the files on disk, which is what the
//! patcher and the proposer observe.

#![allow(dead_code)]

use catalog_release_sync::artifact::ArtifactBuilder;
use catalog_release_sync::cli::RuntimeConfig;
use catalog_release_sync::error::{BuildError, DigestError, GitError, HostError, VerifyError};
use catalog_release_sync::git::{CommitOutcome, PushMode, SourceControl};
use catalog_release_sync::github::{CodeHost, NewProposal, Proposal};
use catalog_release_sync::lint::Linter;
use catalog_release_sync::{RepoSlug, SyncConfig};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const APP: &str = "myapp";
pub const IMAGE: &str = "ghcr.io/x/y";
pub const DIGEST: &str = "sha256:deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef";

pub const COMPOSE: &str = "\
version: \"3.7\"

services:
  app_proxy:
    environment:
      APP_HOST: myapp_web_1
      APP_PORT: 3000

  web:
    image: ghcr.io/x/y:v2026.1.0@sha256:old # pinned
    restart: on-failure
";

pub const MANIFEST: &str = "\
manifestVersion: 1
id: myapp
name: My App
version: \"2026.1.0\"
releaseNotes: \"Update to v2026.1.0 (2026-01-02)\"
port: 3000
";

type Tree = BTreeMap<PathBuf, Vec<u8>>;

#[derive(Debug, Default)]
struct GitState {
    cloned: bool,
    remotes: HashMap<String, String>,
    branches: HashMap<String, String>,
    current: String,
    remote_refs: HashMap<String, String>,
    trees: HashMap<String, Tree>,
    config: HashMap<String, String>,
    next_commit: usize,
}

/// Source control fake backed by snapshots of `<repo>/<app>`
pub struct FakeGit {
    repo_path: PathBuf,
    app_id: String,
    state: RefCell<GitState>,
    pub calls: RefCell<Vec<String>>,
    pub reject_safe_push: Cell<bool>,
    pub reject_forced_push: Cell<bool>,
    /// Safe push fails as an authentication error, not a rejection
    pub deny_safe_push: Cell<bool>,
}

impl FakeGit {
    /// Upstream `main` at commit `u0` holding `initial` as the entry
    pub fn new(repo_path: &Path, app_id: &str, initial: &[(&str, &str)]) -> Self {
        let tree: Tree = initial
            .iter()
            .map(|(path, content)| (PathBuf::from(path), content.as_bytes().to_vec()))
            .collect();
        let mut state = GitState::default();
        state.remote_refs.insert("upstream/main".to_string(), "u0".to_string());
        state.trees.insert("u0".to_string(), tree);
        Self {
            repo_path: repo_path.to_path_buf(),
            app_id: app_id.to_string(),
            state: RefCell::new(state),
            calls: RefCell::new(Vec::new()),
            reject_safe_push: Cell::new(false),
            reject_forced_push: Cell::new(false),
            deny_safe_push: Cell::new(false),
        }
    }

    /// Calls whose name starts with `prefix`
    pub fn calls_to(&self, prefix: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Commit the branch `branch` points at
    pub fn branch_head(&self, branch: &str) -> Option<String> {
        self.state.borrow().branches.get(branch).cloned()
    }

    /// What origin holds for `branch`
    pub fn pushed(&self, branch: &str) -> Option<String> {
        self.state
            .borrow()
            .remote_refs
            .get(&format!("origin/{branch}"))
            .cloned()
    }

    /// Simulate upstream merging `branch`: the upstream tip gets its tree
    pub fn merge_upstream(&self, branch: &str) {
        let mut state = self.state.borrow_mut();
        let sha = state.branches[branch].clone();
        state.remote_refs.insert("upstream/main".to_string(), sha);
    }

    fn log(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn entry_dir(&self) -> PathBuf {
        self.repo_path.join(&self.app_id)
    }

    fn read_tree(&self) -> Tree {
        let root = self.entry_dir();
        if !root.is_dir() {
            return Tree::new();
        }
        WalkDir::new(&root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = e.path().strip_prefix(&root).unwrap().to_path_buf();
                (rel, std::fs::read(e.path()).unwrap())
            })
            .collect()
    }

    fn write_tree(&self, tree: &Tree) {
        let root = self.entry_dir();
        if root.exists() {
            std::fs::remove_dir_all(&root).unwrap();
        }
        for (rel, content) in tree {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
    }

    fn resolve(&self, reference: &str) -> Option<String> {
        let state = self.state.borrow();
        if reference == "HEAD" {
            return state.branches.get(&state.current).cloned();
        }
        state
            .branches
            .get(reference)
            .or_else(|| state.remote_refs.get(reference))
            .cloned()
    }

    fn failed(operation: &str, stderr: &str) -> GitError {
        GitError::Failed {
            operation: operation.to_string(),
            code: 128,
            stderr: stderr.to_string(),
        }
    }
}

impl SourceControl for FakeGit {
    fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn is_cloned(&self) -> bool {
        self.state.borrow().cloned
    }

    async fn clone_from(&self, url: &str) -> Result<(), GitError> {
        self.log(format!("clone {url}"));
        std::fs::create_dir_all(self.repo_path.join(".git")).unwrap();
        let tree = {
            let mut state = self.state.borrow_mut();
            state.cloned = true;
            state.remotes.insert("origin".to_string(), url.to_string());
            let tip = state.remote_refs["upstream/main"].clone();
            state.branches.insert("main".to_string(), tip.clone());
            state.current = "main".to_string();
            state.trees[&tip].clone()
        };
        self.write_tree(&tree);
        Ok(())
    }

    async fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        Ok(self.state.borrow().remotes.get(name).cloned())
    }

    async fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        self.log(format!("remote add {name}"));
        let mut state = self.state.borrow_mut();
        if state.remotes.contains_key(name) {
            return Err(GitError::AlreadyExists {
                operation: "remote".to_string(),
                name: name.to_string(),
            });
        }
        state.remotes.insert(name.to_string(), url.to_string());
        Ok(())
    }

    async fn fetch(&self, remote: &str) -> Result<(), GitError> {
        self.log(format!("fetch {remote}"));
        Ok(())
    }

    async fn checkout(&self, reference: &str, force: bool) -> Result<(), GitError> {
        self.log(format!("checkout {reference} force={force}"));
        let sha = {
            let state = self.state.borrow();
            state
                .branches
                .get(reference)
                .cloned()
                .ok_or_else(|| Self::failed("checkout", "pathspec did not match"))?
        };
        self.state.borrow_mut().current = reference.to_string();
        let tree = self.state.borrow().trees[&sha].clone();
        self.write_tree(&tree);
        Ok(())
    }

    async fn create_branch(&self, name: &str, start: &str) -> Result<(), GitError> {
        self.log(format!("branch {name} {start}"));
        if self.state.borrow().branches.contains_key(name) {
            return Err(GitError::AlreadyExists {
                operation: "checkout".to_string(),
                name: name.to_string(),
            });
        }
        let sha = self
            .resolve(start)
            .ok_or_else(|| Self::failed("checkout", "invalid reference"))?;
        {
            let mut state = self.state.borrow_mut();
            state.branches.insert(name.to_string(), sha.clone());
            state.current = name.to_string();
        }
        let tree = self.state.borrow().trees[&sha].clone();
        self.write_tree(&tree);
        Ok(())
    }

    async fn reset_hard(&self, reference: &str) -> Result<(), GitError> {
        self.log(format!("reset {reference}"));
        let sha = self
            .resolve(reference)
            .ok_or_else(|| Self::failed("reset", "unknown revision"))?;
        let tree = {
            let mut state = self.state.borrow_mut();
            let current = state.current.clone();
            state.branches.insert(current, sha.clone());
            state.trees[&sha].clone()
        };
        self.write_tree(&tree);
        Ok(())
    }

    async fn config_get(&self, key: &str) -> Result<Option<String>, GitError> {
        Ok(self.state.borrow().config.get(key).cloned())
    }

    async fn config_set(&self, key: &str, value: &str) -> Result<(), GitError> {
        self.log(format!("config {key}"));
        self.state
            .borrow_mut()
            .config
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn add(&self, path: &str) -> Result<(), GitError> {
        self.log(format!("add {path}"));
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<CommitOutcome, GitError> {
        self.log(format!("commit {}", message.lines().next().unwrap_or_default()));
        let tree = self.read_tree();
        let mut state = self.state.borrow_mut();
        let head = state.branches[&state.current].clone();
        if state.trees.get(&head) == Some(&tree) {
            return Ok(CommitOutcome::NothingToCommit);
        }
        state.next_commit += 1;
        let sha = format!("c{}", state.next_commit);
        state.trees.insert(sha.clone(), tree);
        let current = state.current.clone();
        state.branches.insert(current, sha.clone());
        Ok(CommitOutcome::Committed { sha })
    }

    async fn push(&self, remote: &str, branch: &str, mode: PushMode) -> Result<(), GitError> {
        self.log(format!("push {remote} {branch} {}", mode.flag()));
        if mode == PushMode::Safe && self.deny_safe_push.get() {
            return Err(Self::failed("push", "fatal: Authentication failed"));
        }
        let rejected = match mode {
            PushMode::Safe => self.reject_safe_push.get(),
            PushMode::Forced => self.reject_forced_push.get(),
        };
        if rejected {
            return Err(GitError::PushRejected {
                branch: branch.to_string(),
                stderr: "[rejected] (stale info)".to_string(),
            });
        }
        let sha = self.state.borrow().branches[branch].clone();
        self.state
            .borrow_mut()
            .remote_refs
            .insert(format!("{remote}/{branch}"), sha);
        Ok(())
    }

    async fn rev_parse(&self, reference: &str) -> Result<String, GitError> {
        self.resolve(reference)
            .ok_or_else(|| Self::failed("rev-parse", "unknown revision"))
    }
}

/// Code host fake; proposals are kept per `owner:branch` head
#[derive(Default)]
pub struct FakeHost {
    pub user: String,
    pub fork: Option<RepoSlug>,
    pub latest_tag: Option<String>,
    pub open: RefCell<Vec<(String, Proposal)>>,
    pub created: Cell<usize>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            user: "alice".to_string(),
            ..Default::default()
        }
    }

    /// Close every open proposal
    pub fn close_all(&self) {
        self.open.borrow_mut().clear();
    }
}

impl CodeHost for FakeHost {
    fn is_authenticated(&self) -> bool {
        true
    }

    async fn latest_release_tag(&self, project: &RepoSlug) -> Result<Option<String>, HostError> {
        self.calls.borrow_mut().push(format!("latest {project}"));
        Ok(self.latest_tag.clone())
    }

    async fn current_user(&self) -> Result<String, HostError> {
        Ok(self.user.clone())
    }

    async fn find_fork(&self, _upstream: &RepoSlug, _owner: &str) -> Result<Option<RepoSlug>, HostError> {
        Ok(self.fork.clone())
    }

    async fn list_open_proposals(&self, _repo: &RepoSlug, head: &str) -> Result<Vec<Proposal>, HostError> {
        self.calls.borrow_mut().push(format!("list {head}"));
        Ok(self
            .open
            .borrow()
            .iter()
            .filter(|(h, _)| h == head)
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn create_proposal(&self, repo: &RepoSlug, proposal: &NewProposal) -> Result<Proposal, HostError> {
        self.calls.borrow_mut().push(format!("create {}", proposal.head));
        self.created.set(self.created.get() + 1);
        let number = 100 + self.created.get() as u64;
        let created = Proposal {
            number,
            html_url: format!("https://github.com/{repo}/pull/{number}"),
            state: "open".to_string(),
            head_ref: proposal.head.split_once(':').map(|(_, b)| b).unwrap_or_default().to_string(),
            head_sha: String::new(),
        };
        self.open
            .borrow_mut()
            .push((proposal.head.clone(), created.clone()));
        Ok(created)
    }

    async fn view_proposal(&self, _repo: &RepoSlug, number: u64) -> Result<Proposal, HostError> {
        self.calls.borrow_mut().push(format!("view {number}"));
        self.open
            .borrow()
            .iter()
            .map(|(_, p)| p.clone())
            .find(|p| p.number == number)
            .ok_or_else(|| HostError::Decode {
                url: format!("pulls/{number}"),
                reason: "not found".to_string(),
            })
    }
}

/// Image builder fake
#[derive(Default)]
pub struct FakeBuilder {
    pub calls: RefCell<Vec<String>>,
}

impl ArtifactBuilder for FakeBuilder {
    async fn build_and_publish(&self, image: &str, tags: &[&str], _platforms: &[String]) -> Result<(), BuildError> {
        self.calls
            .borrow_mut()
            .push(format!("build {image} {}", tags.join(",")));
        Ok(())
    }

    async fn inspect_digest(&self, image_ref: &str) -> Result<String, DigestError> {
        self.calls.borrow_mut().push(format!("inspect {image_ref}"));
        Ok(DIGEST.to_string())
    }
}

/// Lint fake
#[derive(Default)]
pub struct FakeLinter {
    pub calls: RefCell<Vec<String>>,
    pub fail: bool,
}

impl Linter for FakeLinter {
    async fn lint(&self, app_id: &str) -> Result<(), VerifyError> {
        self.calls.borrow_mut().push(app_id.to_string());
        if self.fail {
            return Err(VerifyError::LintFailed {
                entry: app_id.to_string(),
                code: 1,
            });
        }
        Ok(())
    }
}

/// A work dir holding a catalog whose entry is the stock compose and manifest
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub config: SyncConfig,
    pub git: FakeGit,
    pub host: FakeHost,
    pub builder: FakeBuilder,
    pub linter: FakeLinter,
    pub runtime: RuntimeConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SyncConfig::new(APP, IMAGE, RepoSlug::new("getumbrel", "umbrel-apps"));
        config.work_dir = dir.path().join("work");
        config.template_dir = dir.path().join("template");
        config.version = Some("v2026.1.24".to_string());
        config.create_proposal = true;
        let git = FakeGit::new(
            &config.repo_dir(),
            APP,
            &[("docker-compose.yml", COMPOSE), ("umbrel-app.yml", MANIFEST)],
        );
        let mut host = FakeHost::new();
        host.fork = Some(RepoSlug::new("alice", "umbrel-apps"));
        Self {
            dir,
            config,
            git,
            host,
            builder: FakeBuilder::default(),
            linter: FakeLinter::default(),
            runtime: RuntimeConfig::quiet(),
        }
    }

    pub fn entry_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.config.repo_dir().join(APP).join(name)).unwrap()
    }

    /// Proposal branch for the configured version
    pub fn branch(&self) -> String {
        self.config.branch_name(self.config.version.as_deref().unwrap())
    }
}
