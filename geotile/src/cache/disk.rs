use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{debug, warn};

use crate::cache::config::CostStrategy;
use crate::cache::entry::LogicalClock;
use crate::codec::{DecodedFilename, TileSpecCodec};
use crate::tile_spec::TileSpec;

const TEMP_SUFFIX: &str = ".tmp";

struct DiskEntry {
    path: PathBuf,
    format: String,
    cost: usize,
    last_access: u64,
    seq: u64,
}

/// Result of the startup directory scan.
#[derive(Debug, Default)]
pub(super) struct ScanReport {
    pub indexed: usize,
    pub foreign: usize,
    pub removed_temp: usize,
    pub corrupt: Vec<(Option<TileSpec>, PathBuf)>,
}

struct FoundTile {
    spec: TileSpec,
    format: String,
    path: PathBuf,
    size: usize,
    modified: SystemTime,
}

/// Disk tier of the cache: an index of the tile files in the cache directory.
///
/// Files are written to a temporary file first and then renamed into place, so an interrupted
/// write never leaves a truncated tile under a valid name.
pub(super) struct DiskTier {
    directory: PathBuf,
    cost_strategy: CostStrategy,
    entries: HashMap<TileSpec, DiskEntry, ahash::RandomState>,
    pending: HashSet<TileSpec, ahash::RandomState>,
    usage: usize,
    next_seq: u64,
}

impl DiskTier {
    pub fn new(directory: impl AsRef<Path>, cost_strategy: CostStrategy) -> Self {
        Self {
            directory: directory.as_ref().into(),
            cost_strategy,
            entries: HashMap::default(),
            pending: HashSet::default(),
            usage: 0,
            next_seq: 0,
        }
    }

    /// Indexes all files of this cache in the directory. Oldest files get the oldest access time.
    pub fn scan(
        &mut self,
        codec: &dyn TileSpecCodec,
        clock: &LogicalClock,
    ) -> std::io::Result<ScanReport> {
        let mut report = ScanReport::default();
        let mut found = vec![];

        for dir_entry in fs::read_dir(&self.directory)? {
            let dir_entry = match dir_entry {
                Ok(v) => v,
                Err(err) => {
                    warn!("Failed to read cache directory entry: {err}");
                    continue;
                }
            };

            if !dir_entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            let path = dir_entry.path();
            let Some(filename) = dir_entry.file_name().to_str().map(str::to_owned) else {
                report.foreign += 1;
                continue;
            };

            if let Some(stem) = filename.strip_suffix(TEMP_SUFFIX) {
                if codec.decode(stem) != DecodedFilename::NotMine {
                    debug!("Removing unfinished cache write {path:?}");
                    if delete_file(&path) {
                        report.removed_temp += 1;
                    }
                    continue;
                }
            }

            match codec.decode(&filename) {
                DecodedFilename::NotMine => report.foreign += 1,
                DecodedFilename::Corrupt => {
                    warn!("Removing cache file with malformed name {path:?}");
                    delete_file(&path);
                    report.corrupt.push((None, path));
                }
                DecodedFilename::Tile { spec, format } => match dir_entry.metadata() {
                    Ok(metadata) if metadata.len() > 0 => found.push(FoundTile {
                        spec,
                        format,
                        path,
                        size: metadata.len() as usize,
                        modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                    }),
                    Ok(_) => {
                        warn!("Removing empty cache file {path:?}");
                        delete_file(&path);
                        report.corrupt.push((Some(spec), path));
                    }
                    Err(err) => {
                        warn!("Removing unreadable cache file {path:?}: {err}");
                        delete_file(&path);
                        report.corrupt.push((Some(spec), path));
                    }
                },
            }
        }

        found.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
        for tile in found {
            let cost = self.cost_strategy.cost(tile.size);
            self.index(tile.spec, tile.path, tile.format, cost, clock.tick());
            report.indexed += 1;
        }

        Ok(report)
    }

    /// Writes the tile file and indexes it.
    pub fn write(
        &mut self,
        spec: &TileSpec,
        filename: &str,
        format: &str,
        bytes: &[u8],
        tick: u64,
    ) -> std::io::Result<PathBuf> {
        let path = self.directory.join(filename);
        let temp_path = self.directory.join(format!("{filename}{TEMP_SUFFIX}"));

        debug!("Saving tile {spec} to the cache file {path:?}");
        if let Err(err) = fs::write(&temp_path, bytes).and_then(|_| fs::rename(&temp_path, &path))
        {
            delete_file(&temp_path);
            return Err(err);
        }

        self.pending.remove(spec);
        let cost = self.cost_strategy.cost(bytes.len());
        self.index(spec.clone(), path.clone(), format.to_owned(), cost, tick);

        Ok(path)
    }

    /// Bumps the access time and returns the file of the tile.
    pub fn lookup(&mut self, spec: &TileSpec, tick: u64) -> Option<(PathBuf, String)> {
        let entry = self.entries.get_mut(spec)?;
        entry.last_access = entry.last_access.max(tick);
        Some((entry.path.clone(), entry.format.clone()))
    }

    pub fn contains(&self, spec: &TileSpec) -> bool {
        self.entries.contains_key(spec)
    }

    /// Removes the tile if it is still stored in the given file. Returns true if it was removed.
    pub fn remove_if_stored_at(&mut self, spec: &TileSpec, path: &Path) -> bool {
        if self.entries.get(spec).map(|e| e.path.as_path()) != Some(path) {
            return false;
        }

        if let Some(entry) = self.entries.remove(spec) {
            self.usage -= entry.cost;
            delete_file(&entry.path);
        }

        true
    }

    /// Removes the tile and deletes its file. Returns the path of the removed file.
    pub fn remove(&mut self, spec: &TileSpec) -> Option<PathBuf> {
        let entry = self.entries.remove(spec)?;
        self.usage -= entry.cost;
        delete_file(&entry.path);
        Some(entry.path)
    }

    /// Deletes least recently used files until the usage is not larger than `target`.
    pub fn evict_to(&mut self, target: usize) -> Vec<(TileSpec, PathBuf)> {
        if self.usage <= target {
            return vec![];
        }

        let mut candidates: Vec<(u64, u64, TileSpec)> = self
            .entries
            .iter()
            .map(|(spec, entry)| (entry.last_access, entry.seq, spec.clone()))
            .collect();
        candidates.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut evicted = vec![];
        for (_, _, spec) in candidates {
            if self.usage <= target {
                break;
            }

            if let Some(entry) = self.entries.remove(&spec) {
                self.usage -= entry.cost;
                debug!("Evicting tile {spec} from disk: {:?}", entry.path);
                delete_file(&entry.path);
                evicted.push((spec, entry.path));
            }
        }

        evicted
    }

    /// Deletes all files of this cache, or of one map of this cache. Files not recognized by the
    /// codec are left untouched. Returns the number of deleted files.
    pub fn clear(
        &mut self,
        codec: &dyn TileSpecCodec,
        map_id: Option<u32>,
    ) -> std::io::Result<usize> {
        let mut removed = 0;
        let mut undeleted = HashSet::<PathBuf>::new();
        for dir_entry in fs::read_dir(&self.directory)? {
            let Ok(dir_entry) = dir_entry else {
                continue;
            };
            let Some(filename) = dir_entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };

            let decoded = filename
                .strip_suffix(TEMP_SUFFIX)
                .map(|stem| codec.decode(stem))
                .filter(|decoded| *decoded != DecodedFilename::NotMine)
                .unwrap_or_else(|| codec.decode(&filename));

            let remove = match (&decoded, map_id) {
                (DecodedFilename::NotMine, _) => false,
                (_, None) => true,
                (DecodedFilename::Tile { spec, .. }, Some(id)) => spec.map_id() == id,
                (DecodedFilename::Corrupt, Some(_)) => false,
            };

            if remove {
                let path = dir_entry.path();
                if delete_file(&path) {
                    removed += 1;
                } else {
                    undeleted.insert(path);
                }
            }
        }

        // Files that could not be deleted stay indexed so they are still evicted later.
        let keep = |spec: &TileSpec| map_id.is_some_and(|id| spec.map_id() != id);
        self.entries
            .retain(|spec, entry| keep(spec) || undeleted.contains(&entry.path));
        self.pending.retain(|spec| keep(spec));
        self.usage = self.entries.values().map(|e| e.cost).sum();

        Ok(removed)
    }

    pub fn add_pending(&mut self, spec: TileSpec) {
        self.pending.insert(spec);
    }

    pub fn remove_pending(&mut self, spec: &TileSpec) {
        self.pending.remove(spec);
    }

    pub fn pending(&self) -> Vec<TileSpec> {
        let mut pending: Vec<_> = self.pending.iter().cloned().collect();
        pending.sort();
        pending
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn usage(&self) -> usize {
        self.usage
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn index(&mut self, spec: TileSpec, path: PathBuf, format: String, cost: usize, tick: u64) {
        let seq = self.next_seq;
        self.next_seq += 1;

        let entry = DiskEntry {
            path: path.clone(),
            format,
            cost,
            last_access: tick,
            seq,
        };

        self.usage += cost;
        if let Some(replaced) = self.entries.insert(spec, entry) {
            self.usage -= replaced.cost;
            if replaced.path != path {
                delete_file(&replaced.path);
            }
        }
    }
}

/// Deletes a file, returns false if it could not be deleted. A missing file counts as deleted.
fn delete_file(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(err) if err.kind() == ErrorKind::NotFound => true,
        Err(err) => {
            warn!("Failed to delete cache file {path:?}: {err}");
            false
        }
    }
}
