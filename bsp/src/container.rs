//! Hierarchical container file for named typed arrays
//!
//! A container holds groups addressed by `/`-separated paths. Each group
//! carries string attributes and typed datasets. Dataset payloads are split
//! into chunks that are stored raw or zlib-compressed.
//!
//! File layout (little-endian):
//!
//! ```text
//! [ContainerHeader: 64 bytes][chunk data ...][directory: JSON]
//! ```
//!
//! The header points at the directory, which lists every group, attribute
//! and chunk. Appending to an existing file writes new chunks after the old
//! directory, which stays valid until a new directory and header replace it.

use bsp_core::{
    ArrayStore, ArrayStoreMut, ArrayView, DatasetOptions, ElementType, Error, Result, TypedArray,
};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::mem::size_of;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Fixed header at the start of every container file (64 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Magic bytes: "BSPK"
    pub magic: [u8; 4],
    /// Format version
    pub version: u8,
    /// Padding for alignment
    pub _padding: [u8; 3],
    /// Offset of the directory from file start
    pub directory_offset: u64,
    /// Size of the directory in bytes
    pub directory_size: u64,
    /// Reserved space for future extensions
    pub reserved: [u8; 40],
}

impl Default for ContainerHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerHeader {
    pub const MAGIC: [u8; 4] = *b"BSPK";

    pub const VERSION: u8 = 1;

    pub const SIZE: usize = size_of::<Self>();

    pub const fn new() -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            _padding: [0; 3],
            directory_offset: 0,
            directory_size: 0,
            reserved: [0; 40],
        }
    }

    /// Byte range of the directory, or `None` for a file that was never
    /// finished
    pub fn directory_region(&self) -> Option<(u64, u64)> {
        if self.directory_offset == 0 {
            None
        } else {
            Some((self.directory_offset, self.directory_size))
        }
    }

    /// Parse header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::InvalidContainer(format!(
                "file holds {} bytes, smaller than the {} byte header",
                bytes.len(),
                Self::SIZE
            )));
        }

        if bytes[0..4] != Self::MAGIC {
            return Err(Error::InvalidContainer("bad magic bytes".to_string()));
        }

        let version = bytes[4];
        if version > Self::VERSION {
            return Err(Error::InvalidContainer(format!(
                "unsupported container version {version}"
            )));
        }

        let mut reserved = [0u8; 40];
        reserved.copy_from_slice(&bytes[24..64]);

        Ok(Self {
            magic: Self::MAGIC,
            version,
            _padding: [0; 3],
            directory_offset: read_u64(bytes, 8),
            directory_size: read_u64(bytes, 16),
            reserved,
        })
    }

    /// Convert header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes[8..16].copy_from_slice(&self.directory_offset.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.directory_size.to_le_bytes());
        bytes[24..64].copy_from_slice(&self.reserved);
        bytes
    }
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(word)
}

/// Location of one stored chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkEntry {
    pub offset: u64,
    pub stored_size: u64,
}

/// Directory record for one dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub name: String,
    pub dtype: ElementType,
    pub len: u64,
    /// Elements per chunk; every chunk but the last is full
    pub chunk_len: u64,
    pub compression_level: u32,
    pub chunks: Vec<ChunkEntry>,
}

impl DatasetEntry {
    /// Element range covered by chunk `index`
    fn chunk_elements(&self, index: usize) -> (usize, usize) {
        let chunk_len = self.chunk_len as usize;
        let start = index * chunk_len;
        (start, (start + chunk_len).min(self.len as usize))
    }
}

/// Directory record for one group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub path: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub datasets: Vec<DatasetEntry>,
}

impl GroupEntry {
    fn new(path: String) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    fn dataset(&self, name: &str) -> Option<&DatasetEntry> {
        self.datasets.iter().find(|dataset| dataset.name == name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Directory {
    groups: Vec<GroupEntry>,
}

impl Directory {
    fn position(&self, path: &str) -> Option<usize> {
        self.groups.iter().position(|group| group.path == path)
    }

    /// Index of the group at `path`, creating it and its parents as needed
    fn ensure(&mut self, path: &str) -> usize {
        if let Some(index) = self.position(path) {
            return index;
        }
        if let Some(split) = path.rfind('/').filter(|&split| split > 0) {
            self.ensure(&path[..split]);
        } else if path != "/" {
            self.ensure("/");
        }
        self.groups.push(GroupEntry::new(path.to_string()));
        self.groups.len() - 1
    }
}

/// Canonical form of a group path: `/` for the root, else `/a/b`
pub fn normalize_group_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

fn load_directory(file: &mut File) -> Result<(ContainerHeader, Directory)> {
    let mut header_bytes = [0u8; ContainerHeader::SIZE];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut header_bytes)
        .map_err(|_| Error::InvalidContainer("file is too short for a header".to_string()))?;
    let header = ContainerHeader::from_bytes(&header_bytes)?;

    let (offset, size) = header
        .directory_region()
        .ok_or_else(|| Error::InvalidContainer("container was not finished".to_string()))?;
    let file_len = file.metadata()?.len();
    if offset.checked_add(size).map_or(true, |end| end > file_len) {
        return Err(Error::InvalidContainer(format!(
            "directory at {offset}+{size} lies outside the {file_len} byte file"
        )));
    }
    let mut directory = vec![0u8; size as usize];
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(&mut directory)?;
    Ok((header, serde_json::from_slice(&directory)?))
}

/// Writes groups and datasets into a container file
///
/// The directory is written by [`ContainerWriter::finish`]. Dropping an
/// unfinished writer finishes it on a best-effort basis, unless a dataset
/// write failed or [`ContainerWriter::abandon`] was called. In those cases the
/// file is cut back to the length it had when the writer opened it.
pub struct ContainerWriter {
    path: PathBuf,
    file: BufWriter<File>,
    position: u64,
    /// File length when the writer was opened
    committed_len: u64,
    directory: Directory,
    finished: bool,
    poisoned: bool,
}

impl ContainerWriter {
    /// Create a new, empty container, truncating any existing file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = BufWriter::new(File::create(&path)?);
        file.write_all(&ContainerHeader::new().to_bytes())?;
        info!(path = %path.display(), "created container");

        Ok(Self {
            path,
            file,
            position: ContainerHeader::SIZE as u64,
            committed_len: ContainerHeader::SIZE as u64,
            directory: Directory::default(),
            finished: false,
            poisoned: false,
        })
    }

    /// Open an existing container for appending, or create it if missing
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Self::create(path);
        }

        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let (header, directory) = load_directory(&mut file)?;

        // the header keeps pointing at the old directory until finish
        let end = header.directory_offset + header.directory_size;
        file.set_len(end)?;
        file.seek(SeekFrom::Start(end))?;
        info!(
            path = %path.display(),
            groups = directory.groups.len(),
            "opened container for append"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file: BufWriter::new(file),
            position: end,
            committed_len: end,
            directory,
            finished: false,
            poisoned: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the group at `path`, replacing any group already stored there
    pub fn create_group(&mut self, path: &str) -> GroupWriter<'_> {
        let path = normalize_group_path(path);
        let index = self.directory.ensure(&path);
        let group = &mut self.directory.groups[index];
        group.attributes.clear();
        group.datasets.clear();
        GroupWriter {
            writer: self,
            index,
        }
    }

    fn write_chunk(&mut self, bytes: &[u8], level: u32) -> Result<ChunkEntry> {
        let stored: Cow<'_, [u8]> = if level > 0 {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
            encoder.write_all(bytes)?;
            Cow::Owned(encoder.finish()?)
        } else {
            Cow::Borrowed(bytes)
        };

        self.file.write_all(&stored)?;
        let entry = ChunkEntry {
            offset: self.position,
            stored_size: stored.len() as u64,
        };
        self.position += entry.stored_size;
        Ok(entry)
    }

    fn write_directory(&mut self) -> Result<()> {
        self.finished = true;
        let directory = serde_json::to_vec(&self.directory)?;
        self.file.write_all(&directory)?;

        let header = ContainerHeader {
            directory_offset: self.position,
            directory_size: directory.len() as u64,
            ..ContainerHeader::new()
        };
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header.to_bytes())?;
        self.file.flush()?;

        debug!(
            path = %self.path.display(),
            groups = self.directory.groups.len(),
            directory_size = directory.len(),
            "wrote container directory"
        );
        Ok(())
    }

    /// Write the directory and header, closing the container
    pub fn finish(mut self) -> Result<()> {
        self.write_directory()
    }

    /// Close the container without writing a directory
    ///
    /// Chunks written since the writer was opened are discarded, so an
    /// appended file keeps its previous groups.
    pub fn abandon(mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        self.finished = true;
        let result = self
            .file
            .flush()
            .and_then(|()| self.file.get_ref().set_len(self.committed_len));
        match result {
            Ok(()) => debug!(
                path = %self.path.display(),
                len = self.committed_len,
                "discarded unfinished writes"
            ),
            Err(err) => warn!(
                path = %self.path.display(),
                error = %err,
                "failed to discard unfinished writes"
            ),
        }
    }
}

impl Drop for ContainerWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if self.poisoned {
            self.discard();
        } else if let Err(err) = self.write_directory() {
            warn!(path = %self.path.display(), error = %err, "failed to finish container");
        }
    }
}

/// Write access to one group of a [`ContainerWriter`]
pub struct GroupWriter<'a> {
    writer: &'a mut ContainerWriter,
    index: usize,
}

impl GroupWriter<'_> {
    pub fn path(&self) -> &str {
        &self.writer.directory.groups[self.index].path
    }
}

impl ArrayStoreMut for GroupWriter<'_> {
    fn write_array(
        &mut self,
        name: &str,
        array: ArrayView<'_>,
        options: &DatasetOptions,
    ) -> Result<()> {
        let dtype = array.element_type();
        let width = dtype.size_bytes();
        let chunk_len = options.chunk_len(array.len(), width);
        let level = options.compression_level;

        let mut chunks = Vec::with_capacity(array.len().div_ceil(chunk_len));
        for bytes in array.as_bytes().chunks(chunk_len * width) {
            match self.writer.write_chunk(bytes, level) {
                Ok(chunk) => chunks.push(chunk),
                Err(err) => {
                    self.writer.poisoned = true;
                    return Err(err);
                }
            }
        }

        debug!(
            group = self.path(),
            name,
            %dtype,
            len = array.len(),
            chunks = chunks.len(),
            compression_level = level,
            "wrote dataset"
        );

        let entry = DatasetEntry {
            name: name.to_string(),
            dtype,
            len: array.len() as u64,
            chunk_len: chunk_len as u64,
            compression_level: level,
            chunks,
        };
        let datasets = &mut self.writer.directory.groups[self.index].datasets;
        match datasets.iter_mut().find(|dataset| dataset.name == name) {
            Some(existing) => *existing = entry,
            None => datasets.push(entry),
        }
        Ok(())
    }

    fn set_attribute(&mut self, name: &str, value: &str) -> Result<()> {
        self.writer.directory.groups[self.index]
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }
}

enum Backing {
    #[cfg(feature = "mmap")]
    Mapped(memmap2::Mmap),
    #[cfg_attr(feature = "mmap", allow(dead_code))]
    Buffer(Vec<u8>),
}

impl Backing {
    fn open(file: &mut File) -> Result<Self> {
        #[cfg(feature = "mmap")]
        {
            // SAFETY: the map is read-only and lives as long as the reader;
            // containers are not modified while a reader holds them
            let map = unsafe { memmap2::Mmap::map(&*file)? };
            Ok(Backing::Mapped(map))
        }
        #[cfg(not(feature = "mmap"))]
        {
            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer)?;
            Ok(Backing::Buffer(buffer))
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            #[cfg(feature = "mmap")]
            Backing::Mapped(map) => map.as_ref(),
            Backing::Buffer(buffer) => buffer.as_slice(),
        }
    }
}

/// Read-only view of a container file
pub struct ContainerReader {
    path: PathBuf,
    backing: Backing,
    groups: Vec<GroupEntry>,
    index: hashbrown::HashMap<String, usize>,
}

impl ContainerReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let backing = Backing::open(&mut file)?;
        let bytes = backing.bytes();

        let header = ContainerHeader::from_bytes(bytes)?;
        let (offset, size) = header
            .directory_region()
            .ok_or_else(|| Error::InvalidContainer("container was not finished".to_string()))?;
        let directory_bytes = byte_range(bytes, offset, size)?;
        let directory: Directory = serde_json::from_slice(directory_bytes)?;

        let index = directory
            .groups
            .iter()
            .enumerate()
            .map(|(i, group)| (group.path.clone(), i))
            .collect();
        info!(path = %path.display(), groups = directory.groups.len(), "opened container");

        Ok(Self {
            path,
            backing,
            groups: directory.groups,
            index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every group in the order it was first written
    pub fn groups(&self) -> impl Iterator<Item = Group<'_>> {
        self.groups.iter().map(move |entry| Group {
            reader: self,
            entry,
        })
    }

    /// The group at `path`; `"/"` and `""` name the root
    pub fn group(&self, path: &str) -> Result<Group<'_>> {
        let path = normalize_group_path(path);
        self.index
            .get(&path)
            .map(|&i| Group {
                reader: self,
                entry: &self.groups[i],
            })
            .ok_or(Error::MissingGroup(path))
    }

    fn bytes(&self) -> &[u8] {
        self.backing.bytes()
    }
}

fn byte_range(bytes: &[u8], offset: u64, size: u64) -> Result<&[u8]> {
    let start = usize::try_from(offset).ok();
    let end = start.and_then(|start| start.checked_add(usize::try_from(size).ok()?));
    match (start, end) {
        (Some(start), Some(end)) if end <= bytes.len() => Ok(&bytes[start..end]),
        _ => Err(Error::InvalidContainer(format!(
            "region {offset}+{size} lies outside the {} byte file",
            bytes.len()
        ))),
    }
}

/// Read access to one group of a [`ContainerReader`]
#[derive(Clone, Copy)]
pub struct Group<'a> {
    reader: &'a ContainerReader,
    entry: &'a GroupEntry,
}

impl<'a> Group<'a> {
    pub fn path(&self) -> &'a str {
        &self.entry.path
    }

    pub fn attributes(&self) -> &'a BTreeMap<String, String> {
        &self.entry.attributes
    }

    pub fn datasets(&self) -> &'a [DatasetEntry] {
        &self.entry.datasets
    }

    pub fn dataset(&self, name: &str) -> Result<&'a DatasetEntry> {
        self.entry.dataset(name).ok_or_else(|| Error::MissingDataset {
            group: self.entry.path.clone(),
            name: name.to_string(),
        })
    }

    fn allocate(dataset: &DatasetEntry) -> Result<TypedArray> {
        let len = usize::try_from(dataset.len).map_err(|_| {
            Error::InvalidContainer(format!("dataset {} is too large", dataset.name))
        })?;
        if len > 0 && dataset.chunk_len == 0 {
            return Err(Error::InvalidContainer(format!(
                "dataset {} has zero-length chunks",
                dataset.name
            )));
        }
        TypedArray::new(len, dataset.dtype)
    }

    /// Decode the elements starting at `first` into `out`
    ///
    /// Only the chunks overlapping the requested range are decoded.
    fn fill(&self, dataset: &DatasetEntry, first: usize, out: &mut [u8]) -> Result<()> {
        let width = dataset.dtype.size_bytes();
        let last = first + out.len() / width;
        if out.is_empty() {
            return Ok(());
        }

        let chunk_len = dataset.chunk_len as usize;
        for index in first / chunk_len..=(last - 1) / chunk_len {
            let chunk = dataset.chunks.get(index).ok_or_else(|| {
                Error::InvalidContainer(format!(
                    "dataset {} is missing chunk {index}",
                    dataset.name
                ))
            })?;
            let (start, end) = dataset.chunk_elements(index);
            let decoded = self.decode_chunk(dataset, chunk, (end - start) * width)?;

            let from = first.max(start);
            let to = last.min(end);
            out[(from - first) * width..(to - first) * width]
                .copy_from_slice(&decoded[(from - start) * width..(to - start) * width]);
        }
        Ok(())
    }

    fn decode_chunk(
        &self,
        dataset: &DatasetEntry,
        chunk: &ChunkEntry,
        expected: usize,
    ) -> Result<Cow<'a, [u8]>> {
        let stored = byte_range(self.reader.bytes(), chunk.offset, chunk.stored_size)?;
        let decoded = if dataset.compression_level > 0 {
            let mut decoded = Vec::with_capacity(expected);
            ZlibDecoder::new(stored).read_to_end(&mut decoded)?;
            Cow::Owned(decoded)
        } else {
            Cow::Borrowed(stored)
        };

        if decoded.len() != expected {
            return Err(Error::InvalidContainer(format!(
                "chunk of dataset {} decoded to {} bytes, expected {expected}",
                dataset.name,
                decoded.len()
            )));
        }
        Ok(decoded)
    }
}

impl ArrayStore for Group<'_> {
    fn read_array(&self, name: &str) -> Result<TypedArray> {
        let dataset = self.dataset(name)?;
        let mut array = Self::allocate(dataset)?;
        self.fill(dataset, 0, array.as_bytes_mut())?;
        debug!(group = self.path(), name, len = array.len(), "read dataset");
        Ok(array)
    }

    /// Split the dataset into `num_threads` contiguous element ranges and
    /// decode them concurrently into one buffer
    fn read_array_parallel(&self, name: &str, num_threads: usize) -> Result<TypedArray> {
        let dataset = self.dataset(name)?;
        let mut array = Self::allocate(dataset)?;
        let num_threads = num_threads.max(1);
        if array.is_empty() || num_threads == 1 {
            self.fill(dataset, 0, array.as_bytes_mut())?;
            return Ok(array);
        }

        let width = dataset.dtype.size_bytes();
        let per_thread = array.len().div_ceil(num_threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|err| Error::Io(std::io::Error::other(err)))?;

        pool.install(|| {
            array
                .as_bytes_mut()
                .par_chunks_mut(per_thread * width)
                .enumerate()
                .try_for_each(|(t, out)| self.fill(dataset, t * per_thread, out))
        })?;

        debug!(
            group = self.path(),
            name,
            len = array.len(),
            num_threads,
            "read dataset in parallel"
        );
        Ok(array)
    }

    fn has_array(&self, name: &str) -> bool {
        self.entry.dataset(name).is_some()
    }

    fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.entry.attributes.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_arrays(path: &Path, group: &str, options: &DatasetOptions) {
        let mut writer = ContainerWriter::create(path).unwrap();
        let mut g = writer.create_group(group);
        let values: Vec<f64> = (0..1000).map(|i| i as f64 * 0.5).collect();
        g.write_array("values", TypedArray::from(values).view(), options)
            .unwrap();
        g.write_array("empty", TypedArray::from(Vec::<u32>::new()).view(), options)
            .unwrap();
        g.set_attribute("note", "hello").unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn test_header_round_trip() {
        let header = ContainerHeader {
            directory_offset: 4096,
            directory_size: 77,
            ..ContainerHeader::new()
        };
        assert_eq!(ContainerHeader::SIZE, 64);
        let bytes = header.to_bytes();
        assert_eq!(ContainerHeader::from_bytes(&bytes).unwrap(), header);
        assert_eq!(header.directory_region(), Some((4096, 77)));
        assert_eq!(ContainerHeader::new().directory_region(), None);
    }

    #[test]
    fn test_header_rejects_bad_input() {
        assert!(matches!(
            ContainerHeader::from_bytes(&[0u8; 10]),
            Err(Error::InvalidContainer(_))
        ));
        let mut bytes = ContainerHeader::new().to_bytes();
        bytes[0] = b'X';
        assert!(ContainerHeader::from_bytes(&bytes).is_err());
        bytes = ContainerHeader::new().to_bytes();
        bytes[4] = ContainerHeader::VERSION + 1;
        assert!(ContainerHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_normalize_group_path() {
        assert_eq!(normalize_group_path(""), "/");
        assert_eq!(normalize_group_path("/"), "/");
        assert_eq!(normalize_group_path("a"), "/a");
        assert_eq!(normalize_group_path("/a//b/"), "/a/b");
    }

    #[test]
    fn test_write_read_raw_and_compressed() {
        let dir = TempDir::new().unwrap();
        for level in [0, 1, 9] {
            let path = dir.path().join(format!("level{level}.bsp"));
            // small chunks force several chunks per dataset
            let options = DatasetOptions::default()
                .with_compression_level(level)
                .with_chunk_bytes(512);
            write_arrays(&path, "/", &options);

            let reader = ContainerReader::open(&path).unwrap();
            let root = reader.group("/").unwrap();
            let values = root.read_array("values").unwrap();
            assert_eq!(values.len(), 1000);
            assert_eq!(values.read::<f64>(999), 499.5);
            assert_eq!(root.dataset("values").unwrap().chunks.len(), 16);

            let empty = root.read_array("empty").unwrap();
            assert!(empty.is_empty());
            assert_eq!(empty.element_type(), ElementType::UInt32);
            assert_eq!(root.attribute("note").unwrap().as_deref(), Some("hello"));
        }
    }

    #[test]
    fn test_compression_shrinks_repetitive_data() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("raw.bsp");
        let packed = dir.path().join("packed.bsp");
        write_arrays(&raw, "/", &DatasetOptions::default().with_compression_level(0));
        write_arrays(&packed, "/", &DatasetOptions::default());

        let raw_len = std::fs::metadata(&raw).unwrap().len();
        let packed_len = std::fs::metadata(&packed).unwrap().len();
        assert!(packed_len < raw_len);
    }

    #[test]
    fn test_parallel_read_matches_serial() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("parallel.bsp");
        write_arrays(&path, "m", &DatasetOptions::default().with_chunk_bytes(200));

        let reader = ContainerReader::open(&path).unwrap();
        let group = reader.group("m").unwrap();
        let serial = group.read_array("values").unwrap();
        for threads in [0, 1, 2, 3, 7, 64, 1500] {
            let parallel = group.read_array_parallel("values", threads).unwrap();
            assert_eq!(parallel, serial, "{threads} threads");
        }
        assert!(group.read_array_parallel("empty", 4).unwrap().is_empty());
    }

    #[test]
    fn test_append_groups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("multi.bsp");
        write_arrays(&path, "/first", &DatasetOptions::default());

        let mut writer = ContainerWriter::open_or_create(&path).unwrap();
        writer
            .create_group("/second/nested")
            .write_array(
                "values",
                TypedArray::from(vec![1i8, -2]).view(),
                &DatasetOptions::default(),
            )
            .unwrap();
        writer.finish().unwrap();

        let reader = ContainerReader::open(&path).unwrap();
        let paths: Vec<&str> = reader.groups().map(|group| group.path()).collect();
        assert_eq!(paths, ["/", "/first", "/second", "/second/nested"]);
        assert_eq!(
            reader.group("first").unwrap().read_array("values").unwrap().len(),
            1000
        );
        let nested = reader.group("/second/nested").unwrap();
        assert_eq!(nested.read_array("values").unwrap().read::<i64>(1), -2);
    }

    #[test]
    fn test_recreating_group_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("replace.bsp");
        write_arrays(&path, "g", &DatasetOptions::default());

        let writer = {
            let mut writer = ContainerWriter::open_or_create(&path).unwrap();
            writer.create_group("g");
            writer
        };
        // dropping finishes the container
        drop(writer);

        let reader = ContainerReader::open(&path).unwrap();
        let group = reader.group("g").unwrap();
        assert!(group.datasets().is_empty());
        assert!(!group.has_array("values"));
    }

    #[test]
    fn test_abandoned_append_keeps_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abandon.bsp");
        write_arrays(&path, "/first", &DatasetOptions::default());
        let before = std::fs::read(&path).unwrap();

        let mut writer = ContainerWriter::open_or_create(&path).unwrap();
        writer
            .create_group("/first")
            .write_array(
                "values",
                TypedArray::from(vec![9u64; 300]).view(),
                &DatasetOptions::default().with_compression_level(0),
            )
            .unwrap();
        writer.abandon();

        assert_eq!(std::fs::read(&path).unwrap(), before);
        let reader = ContainerReader::open(&path).unwrap();
        let first = reader.group("first").unwrap();
        assert_eq!(first.read_array("values").unwrap().len(), 1000);
        assert_eq!(first.attribute("note").unwrap().as_deref(), Some("hello"));
    }

    #[test]
    fn test_append_leaves_old_directory_until_finish() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pending.bsp");
        write_arrays(&path, "/first", &DatasetOptions::default());

        let mut writer = ContainerWriter::open_or_create(&path).unwrap();
        writer
            .create_group("/second")
            .write_array(
                "values",
                TypedArray::from(vec![1u8; 4096]).view(),
                &DatasetOptions::default().with_chunk_bytes(64),
            )
            .unwrap();
        writer.file.flush().unwrap();

        // the header still points at the previous directory
        let reader = ContainerReader::open(&path).unwrap();
        assert!(reader.group("/first").is_ok());
        assert!(reader.group("/second").is_err());
        drop(reader);

        writer.finish().unwrap();
        let reader = ContainerReader::open(&path).unwrap();
        assert_eq!(
            reader.group("/second").unwrap().read_array("values").unwrap().len(),
            4096
        );
        assert!(reader.group("/first").is_ok());
    }

    #[test]
    fn test_rejects_directory_past_end_of_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("oversized.bsp");
        write_arrays(&path, "/", &DatasetOptions::default());

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[16..24].copy_from_slice(&(u64::MAX - 8).to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            ContainerWriter::open_or_create(&path),
            Err(Error::InvalidContainer(_))
        ));
        assert!(matches!(
            ContainerReader::open(&path),
            Err(Error::InvalidContainer(_))
        ));
        // the rejected open leaves the file alone
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_missing_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.bsp");
        write_arrays(&path, "/", &DatasetOptions::default());

        let reader = ContainerReader::open(&path).unwrap();
        assert!(matches!(reader.group("nope"), Err(Error::MissingGroup(p)) if p == "/nope"));
        assert!(matches!(
            reader.group("/").unwrap().read_array("indices_0"),
            Err(Error::MissingDataset { .. })
        ));
    }

    #[test]
    fn test_rejects_foreign_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foreign.bsp");
        std::fs::write(&path, b"%%MatrixMarket matrix coordinate real general\n").unwrap();
        assert!(matches!(
            ContainerReader::open(&path),
            Err(Error::InvalidContainer(_))
        ));
        assert!(ContainerWriter::open_or_create(&path).is_err());
    }
}
