use crate::error::{ChurnError, Result};
use crate::model::{ChangeRecord, DateRange};
use crate::util::is_ignored;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gix::object::tree::diff::ChangeDetached;
use gix::{discover, ObjectId, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use similar::{ChangeTag, TextDiff};
use std::collections::HashSet;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Knobs for walking history into change records.
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    pub include_merges: bool,
    pub binary: bool,
    /// Normalized extensions (lowercase, no dot) whose files are skipped.
    pub ignored_extensions: Vec<String>,
    pub progress: bool,
}

struct FileChurn {
    path: String,
    added: u64,
    deleted: u64,
}

pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
}

impl GitRepo {
    /// Open a repository at `path`, or current dir if `None`
    pub fn open<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let repo_path = match path {
            Some(p) => p.as_ref().to_path_buf(),
            None => std::env::current_dir()?,
        };

        let repo = discover(&repo_path)?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();
        info!(path = %path.display(), "opened repository");

        Ok(Self { repo, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn resolve_range(&self, since: Option<&str>, until: Option<&str>) -> Result<DateRange> {
        let mut range = DateRange::new();

        let since_dt = since.map(|s| self.parse_commit_or_date(s)).transpose()?;
        let until_dt = until.map(|u| self.parse_commit_or_date(u)).transpose()?;

        if let (Some(s), Some(u)) = (since_dt, until_dt) {
            if s > u {
                return Err(ChurnError::InvalidDate(format!(
                    "Invalid range: since ({s}) is after until ({u})"
                )));
            }
        }

        if let Some(s) = since_dt {
            range = range.with_since(s);
        }
        if let Some(u) = until_dt {
            range = range.with_until(u);
        }

        Ok(range)
    }

    fn parse_commit_or_date(&self, input: &str) -> Result<DateTime<Utc>> {
        if let Some(dt) = parse_date(input) {
            return Ok(dt);
        }

        if let Some(duration) = parse_natural_duration(input) {
            let target = SystemTime::now()
                .checked_sub(duration)
                .ok_or_else(|| ChurnError::InvalidDate(format!("Duration overflow for '{input}'")))?;
            return Ok(DateTime::<Utc>::from(target));
        }

        // Fallback to Git ref
        let id = self
            .repo
            .rev_parse_single(input)
            .map_err(|e| ChurnError::Parse(format!("Invalid commit or date '{input}': {e}")))?;

        let commit = id
            .object()?
            .try_into_commit()
            .map_err(|_| ChurnError::Parse(format!("Not a commit: {input}")))?;

        let secs = commit.time()?.seconds;
        DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| ChurnError::InvalidDate(format!("Invalid timestamp: {secs}")))
    }

    /// Walks history from HEAD and returns one record per commit in range, oldest first.
    pub fn collect_changes(&self, range: &DateRange, opts: &CollectOptions) -> Result<Vec<ChangeRecord>> {
        let mut head = self.repo.head()?;
        let head_commit = match head.peel_to_commit_in_place() {
            Ok(commit) => commit,
            Err(e) if head.is_unborn() => {
                debug!(error = %e, "unborn HEAD, no history");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let pb = if opts.progress {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} {pos}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Collecting commits...");

        let order = parents_first(head_commit.id, |id| {
            let commit = self.repo.find_commit(id)?;
            Ok(commit.parent_ids().map(|p| p.into()).collect())
        })?;

        let mut records = Vec::new();
        for commit_id in order.iter().copied() {
            let commit = self.repo.find_commit(commit_id)?;
            let time = commit.time()?;
            let timestamp = DateTime::from_timestamp(time.seconds, 0)
                .ok_or_else(|| ChurnError::InvalidDate(format!("Invalid timestamp: {}", time.seconds)))?;

            if !range.contains(&timestamp) {
                continue;
            }

            let parents: Vec<ObjectId> = commit.parent_ids().map(|id| id.into()).collect();
            if !opts.include_merges && parents.len() > 1 {
                pb.inc(1);
                continue;
            }

            let files = self.diff_commit(commit_id, parents.first().copied(), opts.binary)?;

            let (mut insertions, mut deletions) = (0u64, 0u64);
            for f in files.iter().filter(|f| !is_ignored(&f.path, &opts.ignored_extensions)) {
                insertions += f.added;
                deletions += f.deleted;
            }

            records.push(ChangeRecord {
                date: local_date(time.seconds, time.offset)?,
                timestamp,
                insertions,
                deletions,
                id: Some(commit_id.to_string()),
                summary: Some(commit.message()?.title.to_string()),
            });

            pb.inc(1);
        }

        pb.finish_and_clear();

        // stable: commits sharing a timestamp keep their parent-before-child order
        records.sort_by_key(|r| r.timestamp);
        debug!(commits = records.len(), visited = order.len(), "history collected");
        Ok(records)
    }

    fn diff_commit(&self, commit_id: ObjectId, parent_id: Option<ObjectId>, binary: bool) -> Result<Vec<FileChurn>> {
        let commit_tree = self.repo.find_commit(commit_id)?.tree()?;
        let parent_tree = match parent_id {
            Some(id) => Some(self.repo.find_commit(id)?.tree()?),
            None => None,
        };

        let changes: Vec<ChangeDetached> =
            self.repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), None)?;

        let mut files = Vec::new();
        for change in changes {
            self.handle_change(change, binary, &mut files);
        }
        Ok(files)
    }

    fn handle_change(&self, change: ChangeDetached, binary: bool, files: &mut Vec<FileChurn>) {
        match change {
            ChangeDetached::Addition { id, location, .. } => {
                if let Some(lines) = self.blob_lines(id, binary) {
                    files.push(FileChurn {
                        path: location.to_string(),
                        added: lines,
                        deleted: 0,
                    });
                }
            }
            ChangeDetached::Deletion { id, location, .. } => {
                if let Some(lines) = self.blob_lines(id, binary) {
                    files.push(FileChurn {
                        path: location.to_string(),
                        added: 0,
                        deleted: lines,
                    });
                }
            }
            ChangeDetached::Modification {
                previous_id,
                id,
                location,
                ..
            } => {
                if let Some((added, deleted)) = self.blob_diff(previous_id, id, binary) {
                    files.push(FileChurn {
                        path: location.to_string(),
                        added,
                        deleted,
                    });
                }
            }
            ChangeDetached::Rewrite {
                source_id,
                id,
                source_location,
                location,
                copy,
                ..
            } => {
                if let Some((added, deleted)) = self.blob_diff(source_id, id, binary) {
                    if !copy {
                        files.push(FileChurn {
                            path: source_location.to_string(),
                            added: 0,
                            deleted,
                        });
                    }
                    files.push(FileChurn {
                        path: location.to_string(),
                        added,
                        deleted: 0,
                    });
                }
            }
        }
    }

    /// Line count of a blob, `None` when it is binary and binaries are excluded.
    fn blob_lines(&self, id: ObjectId, binary: bool) -> Option<u64> {
        let obj = match self.repo.find_object(id) {
            Ok(obj) => obj,
            Err(e) => {
                warn!(%id, error = %e, "skipping unreadable blob");
                return None;
            }
        };
        if is_binary(obj.data.as_slice()) {
            return binary.then_some(0);
        }
        Some(count_lines(obj.data.as_slice()))
    }

    fn blob_diff(&self, old: ObjectId, new: ObjectId, binary: bool) -> Option<(u64, u64)> {
        let (old_obj, new_obj) = match (self.repo.find_object(old), self.repo.find_object(new)) {
            (Ok(o), Ok(n)) => (o, n),
            _ => {
                warn!(%old, %new, "skipping unreadable blob pair");
                return None;
            }
        };
        if is_binary(old_obj.data.as_slice()) || is_binary(new_obj.data.as_slice()) {
            return binary.then_some((0, 0));
        }
        Some(line_diff(old_obj.data.as_slice(), new_obj.data.as_slice()))
    }
}

/// Commits reachable from `head`, every commit after all of its parents.
fn parents_first<T, F>(head: T, mut parents_of: F) -> Result<Vec<T>>
where
    T: Copy + Eq + Hash,
    F: FnMut(T) -> Result<Vec<T>>,
{
    let mut order = Vec::new();
    let mut seen: HashSet<T> = HashSet::new();
    // (id, parents already pushed)
    let mut stack: Vec<(T, bool)> = vec![(head, false)];

    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            order.push(id);
            continue;
        }
        if !seen.insert(id) {
            continue;
        }
        stack.push((id, true));
        for parent in parents_of(id)?.into_iter().rev() {
            if !seen.contains(&parent) {
                stack.push((parent, false));
            }
        }
    }
    Ok(order)
}

fn is_binary(data: &[u8]) -> bool {
    data.iter().take(8192).any(|&b| b == 0)
}

fn count_lines(data: &[u8]) -> u64 {
    std::str::from_utf8(data)
        .map(|t| t.lines().count() as u64)
        .unwrap_or(0)
}

/// Inserted and deleted line counts between two text blobs.
fn line_diff(old: &[u8], new: &[u8]) -> (u64, u64) {
    let old_text = String::from_utf8_lossy(old);
    let new_text = String::from_utf8_lossy(new);
    let diff = TextDiff::from_lines(&*old_text, &*new_text);

    diff.iter_all_changes()
        .fold((0, 0), |(added, deleted), change| match change.tag() {
            ChangeTag::Insert => (added + 1, deleted),
            ChangeTag::Delete => (added, deleted + 1),
            ChangeTag::Equal => (added, deleted),
        })
}

/// Calendar day of a commit in the committer's own timezone.
fn local_date(seconds: i64, offset: i32) -> Result<NaiveDate> {
    DateTime::<Utc>::from_timestamp(seconds + offset as i64, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| ChurnError::InvalidDate(format!("Invalid timestamp: {seconds}")))
}

fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    // RFC3339
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    // YYYY-MM-DD
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| Utc.from_utc_datetime(&datetime))
}

/// "3 days ago", "2 weeks ago", "6 months ago", or a humantime span like "90d" / "-2weeks".
fn parse_natural_duration(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();
    let body = input.strip_suffix(" ago").unwrap_or(&input).trim();

    for (suffix, secs) in [("days", 86_400u64), ("weeks", 7 * 86_400), ("months", 30 * 86_400)] {
        if let Some(n) = body.strip_suffix(suffix) {
            if let Ok(n) = n.trim().parse::<u64>() {
                return Some(Duration::from_secs(n * secs));
            }
        }
    }

    humantime::parse_duration(body.trim_start_matches('-')).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_diff_counts_edits() {
        assert_eq!(line_diff(b"a\nb\nc\n", b"a\nb\nc\n"), (0, 0));
        assert_eq!(line_diff(b"a\nb\n", b"a\nb\nc\nd\n"), (2, 0));
        assert_eq!(line_diff(b"a\nb\nc\n", b"a\nc\n"), (0, 1));
        assert_eq!(line_diff(b"a\nb\nc\n", b"a\nx\nc\n"), (1, 1));
    }

    fn walk(graph: &[(u32, &[u32])], head: u32) -> Vec<u32> {
        parents_first(head, |id| {
            Ok(graph
                .iter()
                .find(|(node, _)| *node == id)
                .map(|(_, parents)| parents.to_vec())
                .unwrap_or_default())
        })
        .unwrap()
    }

    #[test]
    fn linear_history_comes_out_oldest_first() {
        let graph: &[(u32, &[u32])] = &[(5, &[4]), (4, &[3]), (3, &[2]), (2, &[1]), (1, &[0]), (0, &[])];
        assert_eq!(walk(graph, 5), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn merges_emit_every_parent_before_the_child() {
        // 0 <- 1 <- 3(merge) ; 0 <- 2 <- 3 ; 3 <- 4
        let graph: &[(u32, &[u32])] = &[(4, &[3]), (3, &[1, 2]), (2, &[0]), (1, &[0]), (0, &[])];
        let order = walk(graph, 4);
        assert_eq!(order.len(), 5);
        let pos = |id: u32| order.iter().position(|x| *x == id).unwrap();
        for (child, parents) in graph {
            for parent in parents.iter() {
                assert!(pos(*parent) < pos(*child), "{parent} should precede {child} in {order:?}");
            }
        }
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn binary_detection_and_line_count() {
        assert!(is_binary(b"PNG\0\0data"));
        assert!(!is_binary(b"fn main() {}\n"));
        assert_eq!(count_lines(b"one\ntwo\nthree"), 3);
        assert_eq!(count_lines(b""), 0);
    }

    #[test]
    fn local_date_applies_offset() {
        // 2024-01-01T23:30:00Z is already Jan 2nd at +01:00
        let secs = 1_704_151_800;
        assert_eq!(local_date(secs, 0).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(local_date(secs, 3600).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(local_date(secs, -86_400).unwrap(), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn parses_dates_and_durations() {
        let d = parse_date("2024-03-01").unwrap();
        assert_eq!(d.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(parse_date("2024-03-01T10:00:00+02:00").is_some());
        assert!(parse_date("yesterday-ish").is_none());

        assert_eq!(parse_natural_duration("3 days ago"), Some(Duration::from_secs(3 * 86_400)));
        assert_eq!(parse_natural_duration("2 weeks ago"), Some(Duration::from_secs(14 * 86_400)));
        assert_eq!(parse_natural_duration("-90d"), Some(Duration::from_secs(90 * 86_400)));
        assert_eq!(parse_natural_duration("HEAD~3"), None);
    }
}
