use std::{
   path::{Path, PathBuf},
   process::Command,
};

use git2::{
   Delta, Diff, DiffFindOptions, DiffFormat, ErrorCode, Oid, Repository, Sort, Tree,
};

use crate::{
   error::{CommitGenError, Result},
   types::{ChangeKind, CommitRecord, DiffSummary, FileChange},
};

/// Commits fetched for prompt context when the caller has no preference.
pub const DEFAULT_HISTORY_COUNT: usize = 5;

const SHORT_HASH_LEN: usize = 7;

/// Read access to the staged state of one repository, plus commit creation.
pub struct GitRepo {
   repo: Repository,
}

impl GitRepo {
   /// Open the repository enclosing `path`, searching parent directories.
   pub fn open(path: &Path) -> Result<Self> {
      let repo = Repository::discover(path).map_err(|e| {
         log::debug!("Repository discovery from {} failed: {e}", path.display());
         CommitGenError::Repository("Not a git repository".to_string())
      })?;
      log::debug!("Opened repository at {}", repo.path().display());
      Ok(Self { repo })
   }

   /// Working tree root (`None` for bare repositories).
   pub fn workdir(&self) -> Option<&Path> {
      self.repo.workdir()
   }

   /// HEAD's tree, or `None` when HEAD is unborn.
   fn head_tree(&self) -> Result<Option<Tree<'_>>> {
      let head = match self.repo.head() {
         Ok(head) => head,
         Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
            return Ok(None);
         },
         Err(e) => return Err(e.into()),
      };
      Ok(Some(head.peel_to_tree()?))
   }

   /// Index-vs-HEAD diff with rename detection.
   fn staged(&self) -> Result<Diff<'_>> {
      let mut index = self.repo.index()?;
      index.read(false)?;
      let tree = self.head_tree()?;
      let mut diff = self.repo.diff_tree_to_index(tree.as_ref(), Some(&index), None)?;

      let mut find = DiffFindOptions::new();
      find.renames(true);
      diff.find_similar(Some(&mut find))?;
      Ok(diff)
   }

   pub fn has_staged_changes(&self) -> Result<bool> {
      Ok(self.staged()?.deltas().len() > 0)
   }

   /// Unified diff text of the staged changes.
   pub fn get_staged_diff(&self) -> Result<String> {
      let diff = self.staged()?;
      if diff.deltas().len() == 0 {
         return Err(CommitGenError::NoStagedChanges);
      }

      let mut text = String::new();
      diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
         let origin = line.origin();
         if matches!(origin, '+' | '-' | ' ') {
            text.push(origin);
         }
         text.push_str(&String::from_utf8_lossy(line.content()));
         true
      })?;
      Ok(text)
   }

   /// Paths of all staged entries, in diff order.
   pub fn get_staged_files(&self) -> Result<Vec<String>> {
      Ok(self.staged()?.deltas().filter_map(|delta| delta_path(&delta)).collect())
   }

   /// Classify every staged entry.
   pub fn get_diff_summary(&self) -> Result<DiffSummary> {
      let diff = self.staged()?;
      let changes = diff
         .deltas()
         .filter_map(|delta| {
            let kind = match delta.status() {
               Delta::Added | Delta::Untracked => ChangeKind::Added,
               Delta::Deleted => ChangeKind::Deleted,
               Delta::Renamed => ChangeKind::Renamed,
               // Copied, Typechange and anything else libgit2 reports
               _ => ChangeKind::Modified,
            };
            delta_path(&delta).map(|path| FileChange::new(path, kind))
         })
         .collect();
      Ok(DiffSummary::from_changes(changes))
   }

   /// `(files_changed, insertions + deletions)` for the staged changes.
   pub fn get_commit_stats(&self) -> Result<(usize, usize)> {
      let diff = self.staged()?;
      match diff.stats() {
         Ok(stats) => Ok((stats.files_changed(), stats.insertions() + stats.deletions())),
         Err(e) => {
            log::warn!("Diff statistics unavailable ({e}), falling back to git shortstat");
            let files = diff.deltas().len();
            let lines = self.shortstat_lines().unwrap_or(0);
            Ok((files, lines))
         },
      }
   }

   fn shortstat_lines(&self) -> Option<usize> {
      let dir = self.workdir().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
      let output = Command::new("git")
         .args(["diff", "--cached", "--shortstat"])
         .current_dir(dir)
         .output()
         .ok()?;
      if !output.status.success() {
         return None;
      }
      Some(parse_shortstat(&String::from_utf8_lossy(&output.stdout)).1)
   }

   /// Up to `count` commits reachable from HEAD, newest first. Empty when
   /// HEAD is unborn.
   pub fn get_recent_commits(&self, count: usize) -> Result<Vec<CommitRecord>> {
      if count == 0 || self.head_tree()?.is_none() {
         return Ok(Vec::new());
      }

      let mut revwalk = self.repo.revwalk()?;
      revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
      revwalk.push_head()?;

      let mut commits = Vec::with_capacity(count);
      for oid in revwalk.take(count) {
         let commit = self.repo.find_commit(oid?)?;
         commits.push(CommitRecord {
            short_hash: short_hash(commit.id()),
            message:    commit.message().unwrap_or_default().trim().to_string(),
            author:     commit.author().name().unwrap_or_default().to_string(),
         });
      }
      Ok(commits)
   }

   /// Commit the staged tree on HEAD and return the new commit id.
   pub fn commit(&self, message: &str) -> Result<String> {
      let mut index = self.repo.index()?;
      index.read(false)?;
      let tree = self.repo.find_tree(index.write_tree()?)?;
      let sig = self.repo.signature().map_err(|e| {
         CommitGenError::Repository(format!(
            "No commit identity configured ({}). Set user.name and user.email.",
            e.message()
         ))
      })?;

      let parent = match self.repo.head() {
         Ok(head) => Some(head.peel_to_commit()?),
         Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
         Err(e) => return Err(e.into()),
      };
      let parents: Vec<_> = parent.iter().collect();

      let oid = self.repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
      log::info!("Created commit {oid}");
      Ok(oid.to_string())
   }
}

fn delta_path(delta: &git2::DiffDelta<'_>) -> Option<String> {
   delta
      .new_file()
      .path()
      .or_else(|| delta.old_file().path())
      .map(|p| p.to_string_lossy().into_owned())
      .filter(|p| !p.is_empty())
}

pub fn short_hash(oid: Oid) -> String {
   oid.to_string().chars().take(SHORT_HASH_LEN).collect()
}

/// Parse `git diff --shortstat` output into `(files, insertions + deletions)`.
///
/// Absent or malformed fields count as zero.
pub fn parse_shortstat(text: &str) -> (usize, usize) {
   let mut files = 0;
   let mut lines = 0;
   for part in text.trim().split(',') {
      let mut words = part.split_whitespace();
      let Some(count) = words.next().and_then(|n| n.parse::<usize>().ok()) else {
         continue;
      };
      match words.next() {
         Some(w) if w.starts_with("file") => files = count,
         Some(w) if w.starts_with("insertion") || w.starts_with("deletion") => lines += count,
         _ => {},
      }
   }
   (files, lines)
}

#[cfg(test)]
mod tests {
   use std::fs;

   use git2::{Signature, Time};

   use super::*;

   struct Fixture {
      repo: Repository,
      dir:  tempfile::TempDir,
   }

   impl Fixture {
      fn new() -> Self {
         let dir = tempfile::tempdir().unwrap();
         let repo = Repository::init(dir.path()).unwrap();
         let mut config = repo.config().unwrap();
         config.set_str("user.name", "Test User").unwrap();
         config.set_str("user.email", "test@example.com").unwrap();
         Self { repo, dir }
      }

      fn write(&self, path: &str, contents: &str) {
         fs::write(self.dir.path().join(path), contents).unwrap();
      }

      fn stage(&self, path: &str) {
         let mut index = self.repo.index().unwrap();
         index.add_path(Path::new(path)).unwrap();
         index.write().unwrap();
      }

      fn unstage_removed(&self, path: &str) {
         let mut index = self.repo.index().unwrap();
         index.remove_path(Path::new(path)).unwrap();
         index.write().unwrap();
      }

      fn git(&self) -> GitRepo {
         GitRepo::open(self.dir.path()).unwrap()
      }

      fn commit_all(&self, message: &str) -> String {
         self.git().commit(message).unwrap()
      }
   }

   #[test]
   fn test_open_outside_repository_fails() {
      let dir = tempfile::tempdir().unwrap();
      let err = GitRepo::open(dir.path()).err().unwrap();
      assert!(matches!(err, CommitGenError::Repository(_)));
      assert_eq!(err.label(), "Git Error");
   }

   #[test]
   fn test_open_discovers_parent_repository() {
      let fx = Fixture::new();
      fs::create_dir(fx.dir.path().join("nested")).unwrap();
      assert!(GitRepo::open(&fx.dir.path().join("nested")).is_ok());
   }

   #[test]
   fn test_has_staged_changes_after_commit_and_stage() {
      let fx = Fixture::new();
      fx.write("README.md", "# demo\n");
      fx.stage("README.md");
      fx.commit_all("initial");
      assert!(!fx.git().has_staged_changes().unwrap());

      fx.write("api.py", "print('hi')\n");
      fx.stage("api.py");
      assert!(fx.git().has_staged_changes().unwrap());
   }

   #[test]
   fn test_staged_diff_requires_changes() {
      let fx = Fixture::new();
      fx.write("README.md", "# demo\n");
      fx.stage("README.md");
      fx.commit_all("initial");

      let err = fx.git().get_staged_diff().unwrap_err();
      assert!(matches!(err, CommitGenError::NoStagedChanges));
   }

   #[test]
   fn test_staged_diff_on_unborn_head() {
      let fx = Fixture::new();
      fx.write("api.py", "print('hi')\n");
      fx.stage("api.py");

      let git = fx.git();
      let diff = git.get_staged_diff().unwrap();
      assert!(diff.contains("diff --git a/api.py b/api.py"));
      assert!(diff.contains("+print('hi')"));
      assert!(git.get_recent_commits(DEFAULT_HISTORY_COUNT).unwrap().is_empty());

      let summary = git.get_diff_summary().unwrap();
      assert_eq!(summary.files_changed(), [FileChange::new("api.py", ChangeKind::Added)]);
      assert_eq!(summary.additions(), 1);
   }

   #[test]
   fn test_summary_classifies_each_kind() {
      let fx = Fixture::new();
      fx.write("keep.txt", "one\n");
      fx.write("gone.txt", "bye\n");
      fx.write("old_name.txt", "a file with enough content to be recognised as renamed\n");
      for path in ["keep.txt", "gone.txt", "old_name.txt"] {
         fx.stage(path);
      }
      fx.commit_all("initial");

      fx.write("keep.txt", "one\ntwo\n");
      fx.stage("keep.txt");
      fs::remove_file(fx.dir.path().join("gone.txt")).unwrap();
      fx.unstage_removed("gone.txt");
      fs::rename(fx.dir.path().join("old_name.txt"), fx.dir.path().join("new_name.txt")).unwrap();
      fx.unstage_removed("old_name.txt");
      fx.stage("new_name.txt");
      fx.write("fresh.txt", "new\n");
      fx.stage("fresh.txt");

      let git = fx.git();
      let summary = git.get_diff_summary().unwrap();
      let kind_of = |path: &str| {
         summary
            .files_changed()
            .iter()
            .find(|c| c.path == path)
            .map(|c| c.kind)
      };
      assert_eq!(kind_of("keep.txt"), Some(ChangeKind::Modified));
      assert_eq!(kind_of("gone.txt"), Some(ChangeKind::Deleted));
      assert_eq!(kind_of("new_name.txt"), Some(ChangeKind::Renamed));
      assert_eq!(kind_of("fresh.txt"), Some(ChangeKind::Added));
      assert_eq!(
         summary.additions() + summary.deletions() + summary.modifications(),
         summary.files_changed().len()
      );
      assert_eq!(git.get_staged_files().unwrap().len(), 4);
   }

   #[test]
   fn test_commit_stats_count_lines() {
      let fx = Fixture::new();
      fx.write("a.txt", "1\n2\n3\n");
      fx.stage("a.txt");
      fx.commit_all("initial");

      fx.write("a.txt", "1\nchanged\n3\n4\n");
      fx.stage("a.txt");
      fx.write("b.txt", "b\n");
      fx.stage("b.txt");

      // a.txt: -1 +2, b.txt: +1
      assert_eq!(fx.git().get_commit_stats().unwrap(), (2, 4));
   }

   #[test]
   fn test_recent_commits_newest_first_and_limited() {
      let fx = Fixture::new();
      for i in 0..4 {
         let name = format!("f{i}.txt");
         fx.write(&name, "x\n");
         fx.stage(&name);
         fx.commit_all(&format!("commit {i}\n\nbody {i}\n"));
      }

      let commits = fx.git().get_recent_commits(2).unwrap();
      assert_eq!(commits.len(), 2);
      assert_eq!(commits[0].message, "commit 3\n\nbody 3");
      assert_eq!(commits[1].message, "commit 2\n\nbody 2");
      assert_eq!(commits[0].short_hash.len(), 7);
      assert!(commits[0].short_hash.chars().all(|c| c.is_ascii_hexdigit()));
      assert_eq!(commits[0].author, "Test User");
   }

   #[test]
   fn test_recent_commits_date_ordered_across_merge() {
      let fx = Fixture::new();
      let tree = fx.repo.find_tree(fx.repo.index().unwrap().write_tree().unwrap()).unwrap();
      let commit_at = |update_ref: Option<&str>, message: &str, secs: i64, parents: &[Oid]| {
         let sig = Signature::new("Test User", "test@example.com", &Time::new(secs, 0)).unwrap();
         let parents: Vec<_> = parents.iter().map(|id| fx.repo.find_commit(*id).unwrap()).collect();
         let parents: Vec<_> = parents.iter().collect();
         fx.repo.commit(update_ref, &sig, &sig, message, &tree, &parents).unwrap()
      };

      let root = commit_at(Some("HEAD"), "root", 1000, &[]);
      let side = commit_at(None, "side branch work", 2000, &[root]);
      let m1 = commit_at(Some("HEAD"), "mainline one", 3000, &[root]);
      let m2 = commit_at(Some("HEAD"), "mainline two", 5000, &[m1]);
      commit_at(Some("HEAD"), "merge side branch", 6000, &[m2, side]);

      let messages: Vec<String> =
         fx.git().get_recent_commits(5).unwrap().into_iter().map(|c| c.message).collect();
      assert_eq!(messages, [
         "merge side branch",
         "mainline two",
         "mainline one",
         "side branch work",
         "root"
      ]);
   }

   #[test]
   fn test_commit_returns_full_id_of_new_head() {
      let fx = Fixture::new();
      fx.write("a.txt", "a\n");
      fx.stage("a.txt");
      let first = fx.commit_all("feat: first");

      fx.write("b.txt", "b\n");
      fx.stage("b.txt");
      let second = fx.git().commit("feat: second").unwrap();

      assert_eq!(second.len(), 40);
      let head = fx.repo.head().unwrap().peel_to_commit().unwrap();
      assert_eq!(head.id().to_string(), second);
      assert_eq!(head.parent(0).unwrap().id().to_string(), first);
      assert_eq!(head.message(), Some("feat: second"));
      assert!(!fx.git().has_staged_changes().unwrap());
   }

   #[test]
   fn test_parse_shortstat() {
      assert_eq!(
         parse_shortstat(" 2 files changed, 10 insertions(+), 3 deletions(-)\n"),
         (2, 13)
      );
      assert_eq!(parse_shortstat(" 1 file changed, 1 insertion(+)"), (1, 1));
      assert_eq!(parse_shortstat(" 1 file changed, 4 deletions(-)"), (1, 4));
      assert_eq!(parse_shortstat(""), (0, 0));
      assert_eq!(parse_shortstat("garbage, more garbage"), (0, 0));
      assert_eq!(parse_shortstat("3 files changed, x insertions(+)"), (3, 0));
   }
}
