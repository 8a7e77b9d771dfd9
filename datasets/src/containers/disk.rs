use std::{
    env,
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Read, Seek, SeekFrom, Write},
    path::PathBuf,
    process,
    sync::atomic::{AtomicU64, Ordering},
};

use log::{debug, warn};
use ndarray::{Array1, Array2};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{Container, Item};
use crate::{DatasetErr, FieldKind, Result};

/// Default cap for a single data file, 128 MiB.
pub const MAX_FILE_SIZE: u64 = 128 * 1024 * 1024;

const VALUE_SIZE: u64 = size_of::<f64>() as u64;

static NEXT_FILE: AtomicU64 = AtomicU64::new(0);

/// Options for the disk backed containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskOptions {
    /// Directory where the data files are created.
    pub dir: PathBuf,
    /// Leave the data files in place when the container is dropped.
    pub keep_files: bool,
    /// Maximum size in bytes of each data file.
    pub max_file_size: u64,
}

impl Default for DiskOptions {
    fn default() -> Self {
        Self {
            dir: env::temp_dir(),
            keep_files: false,
            max_file_size: MAX_FILE_SIZE,
        }
    }
}

/// Decides whether an append of `needed` bytes has to go to a fresh file.
///
/// # Arguments
/// * `current` - The size of the file being written to, or `None` if there is none yet.
/// * `needed` - The size of the item about to be written.
/// * `cap` - The maximum size of a file.
///
/// # Returns
/// `true` if a new file must be opened. A non empty file is never grown past `cap`, but an
/// empty one always takes the item so that oversized items still have somewhere to go.
pub fn needs_new_file(current: Option<u64>, needed: u64, cap: u64) -> bool {
    match current {
        None => true,
        Some(size) => size > 0 && size + needed > cap,
    }
}

/// Where a sequence lives on disk.
#[derive(Debug, Clone, Copy)]
struct SeqLocation {
    file: usize,
    offset: u64,
    rows: usize,
}

/// The one open file of a container.
enum Handle {
    Reader { file: usize, inner: File },
    Writer { file: usize, inner: BufWriter<File> },
}

impl Handle {
    fn close(self) -> io::Result<()> {
        match self {
            Handle::Reader { .. } => Ok(()),
            Handle::Writer { mut inner, .. } => inner.flush(),
        }
    }
}

/// A container that spreads its values across size capped files.
///
/// Items are written as raw native endian doubles and never split across files. Vectors and
/// scalars are located by the logical index each file starts at, sequences record their file and
/// byte offset when appended so reads don't need to scan the preceding sequences.
pub struct DiskContainer {
    kind: FieldKind,
    dim: usize,
    options: DiskOptions,
    files: Vec<PathBuf>,
    sizes: Vec<u64>,
    file_starts: Vec<usize>,
    sequences: Vec<SeqLocation>,
    len: usize,
    handle: Mutex<Option<Handle>>,
}

impl DiskContainer {
    /// Creates a new empty `DiskContainer`, no file is created until the first append.
    ///
    /// # Errors
    /// An io error if the data directory can't be created.
    pub fn new(kind: FieldKind, dim: usize, options: DiskOptions) -> Result<Self> {
        fs::create_dir_all(&options.dir)?;

        Ok(Self {
            kind,
            dim,
            options,
            files: Vec::new(),
            sizes: Vec::new(),
            file_starts: Vec::new(),
            sequences: Vec::new(),
            len: 0,
            handle: Mutex::new(None),
        })
    }

    /// The paths of the data files created so far.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    fn create_file(&mut self) -> Result<()> {
        let (path, file) = loop {
            let n = NEXT_FILE.fetch_add(1, Ordering::Relaxed);
            let path = self
                .options
                .dir
                .join(format!("ds-{}-{n}.bin", process::id()));

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        };

        debug!("opened data file {}", path.display());

        let idx = self.files.len();
        self.files.push(path);
        self.sizes.push(0);
        self.file_starts.push(self.len);

        let previous = self.handle.get_mut().replace(Handle::Writer {
            file: idx,
            inner: BufWriter::new(file),
        });

        if let Some(handle) = previous {
            handle.close()?;
        }

        Ok(())
    }

    fn write(&mut self, file: usize, values: &[f64]) -> Result<()> {
        let slot = self.handle.get_mut();

        let reusable = matches!(slot, Some(Handle::Writer { file: f, .. }) if *f == file);
        if !reusable {
            if let Some(handle) = slot.take() {
                handle.close()?;
            }

            let inner = OpenOptions::new().append(true).open(&self.files[file])?;
            *slot = Some(Handle::Writer {
                file,
                inner: BufWriter::new(inner),
            });
        }

        if let Some(Handle::Writer { inner, .. }) = slot {
            inner.write_all(bytemuck::cast_slice(values))?;
        }

        Ok(())
    }

    fn read(&self, file: usize, offset: u64, count: usize) -> Result<Vec<f64>> {
        let mut values = vec![0.0f64; count];
        if count == 0 {
            return Ok(values);
        }

        let mut slot = self.handle.lock();

        let reusable = matches!(&*slot, Some(Handle::Reader { file: f, .. }) if *f == file);
        if !reusable {
            if let Some(handle) = slot.take() {
                handle.close()?;
            }

            let inner = File::open(&self.files[file])?;
            *slot = Some(Handle::Reader { file, inner });
        }

        if let Some(Handle::Reader { inner, .. }) = slot.as_mut() {
            inner.seek(SeekFrom::Start(offset))?;
            inner.read_exact(bytemuck::cast_slice_mut(&mut values))?;
        }

        Ok(values)
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.close()?;
        }

        Ok(())
    }
}

impl Container for DiskContainer {
    fn kind(&self) -> FieldKind {
        self.kind
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.len
    }

    fn append(&mut self, item: Item) -> Result<()> {
        item.check(self.kind, self.dim)?;

        let values = item.as_flat().map(<[f64]>::to_vec).unwrap_or_else(|| match &item {
            Item::Sequence(seq) => seq.iter().copied().collect(),
            Item::Vector(v) => v.to_vec(),
            Item::Scalar(x) => vec![*x],
        });

        let needed = values.len() as u64 * VALUE_SIZE;
        if needs_new_file(self.sizes.last().copied(), needed, self.options.max_file_size) {
            self.create_file()?;
        }

        let file = self.files.len() - 1;
        let offset = self.sizes[file];

        self.write(file, &values)?;
        self.sizes[file] += needed;

        if let Item::Sequence(seq) = &item {
            self.sequences.push(SeqLocation {
                file,
                offset,
                rows: seq.nrows(),
            });
        }

        self.len += 1;
        Ok(())
    }

    fn get(&self, idx: usize) -> Result<Item> {
        if idx >= self.len {
            return Err(DatasetErr::IndexOutOfRange {
                index: idx,
                len: self.len,
            });
        }

        let item = match self.kind {
            FieldKind::Sequences => {
                let loc = self.sequences[idx];
                let values = self.read(loc.file, loc.offset, loc.rows * self.dim)?;

                let seq = Array2::from_shape_vec((loc.rows, self.dim), values).map_err(|_| {
                    DatasetErr::DimMismatch {
                        got: 0,
                        expected: self.dim,
                    }
                })?;

                Item::Sequence(seq)
            }
            kind => {
                let file = self.file_starts.partition_point(|&start| start <= idx) - 1;
                let offset = (idx - self.file_starts[file]) as u64 * self.dim as u64 * VALUE_SIZE;
                let values = self.read(file, offset, self.dim)?;

                match kind {
                    FieldKind::Scalars => Item::Scalar(values[0]),
                    _ => Item::Vector(Array1::from(values)),
                }
            }
        };

        Ok(item)
    }

    fn finalize(&mut self) -> Result<()> {
        self.flush()?;
        self.sequences.shrink_to_fit();
        self.file_starts.shrink_to_fit();
        Ok(())
    }
}

impl Drop for DiskContainer {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("failed to flush data file: {e}");
        }

        if self.options.keep_files {
            return;
        }

        for path in &self.files {
            if let Err(e) = fs::remove_file(path) {
                warn!("failed to remove data file {}: {e}", path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(dir: &str, max_file_size: u64) -> DiskOptions {
        DiskOptions {
            dir: env::temp_dir().join(dir),
            keep_files: false,
            max_file_size,
        }
    }

    #[test]
    fn rollover_rules() {
        assert!(needs_new_file(None, 8, 64));
        assert!(!needs_new_file(Some(0), 128, 64));
        assert!(!needs_new_file(Some(48), 16, 64));
        assert!(needs_new_file(Some(56), 16, 64));
        assert!(!needs_new_file(Some(56), 0, 64));
    }

    #[test]
    fn vectors_are_spread_across_files() {
        // Three 2d vectors fit in 48 bytes.
        let mut c = DiskContainer::new(FieldKind::Vectors, 2, options("ds-disk-vectors", 48)).unwrap();

        for i in 0..10 {
            let x = i as f64;
            c.append(Item::vector([x, x * 10.])).unwrap();
        }

        assert_eq!(c.files().len(), 4);
        for i in (0..10).rev() {
            let x = i as f64;
            assert_eq!(c.get(i).unwrap(), Item::vector([x, x * 10.]));
        }

        assert!(matches!(
            c.get(10),
            Err(DatasetErr::IndexOutOfRange { index: 10, len: 10 })
        ));
    }

    #[test]
    fn reads_and_writes_can_interleave() {
        let mut c = DiskContainer::new(FieldKind::Scalars, 1, options("ds-disk-scalars", 64)).unwrap();

        for i in 0..20 {
            c.append(Item::Scalar(i as f64)).unwrap();
            assert_eq!(c.get(i / 2).unwrap(), Item::Scalar((i / 2) as f64));
        }
    }

    #[test]
    fn sequences_are_never_split() {
        let mut c = DiskContainer::new(FieldKind::Sequences, 1, options("ds-disk-seqs", 32)).unwrap();

        for len in [3, 2, 5, 0, 1] {
            let rows: Vec<[f64; 1]> = (0..len).map(|i| [i as f64]).collect();
            c.append(Item::sequence(1, &rows).unwrap()).unwrap();
        }

        assert_eq!(c.len(), 5);
        for (idx, len) in [3, 2, 5, 0, 1].into_iter().enumerate() {
            let seq = c.get(idx).unwrap();
            let expected: Vec<[f64; 1]> = (0..len).map(|i| [i as f64]).collect();
            assert_eq!(seq, Item::sequence(1, &expected).unwrap());
        }
    }

    #[test]
    fn files_are_removed_on_drop_unless_kept() {
        let mut c = DiskContainer::new(FieldKind::Scalars, 1, options("ds-disk-drop", 64)).unwrap();
        c.append(Item::Scalar(1.)).unwrap();
        let files = c.files().to_vec();
        drop(c);
        assert!(files.iter().all(|path| !path.exists()));

        let mut opts = options("ds-disk-keep", 64);
        opts.keep_files = true;

        let mut c = DiskContainer::new(FieldKind::Scalars, 1, opts).unwrap();
        c.append(Item::Scalar(1.)).unwrap();
        let files = c.files().to_vec();
        drop(c);
        assert!(files.iter().all(|path| path.exists()));

        for path in files {
            fs::remove_file(path).unwrap();
        }
    }
}
