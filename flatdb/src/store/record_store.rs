use crate::common::COUNT_FIELD_LEN;
use crate::errors::{ErrorKind, FlatdbError, FlatdbResult};
use crate::index::BalancedIndex;
use crate::store::record::{FixedRecord, RecordSlot};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Flat-file record store with a balanced in-memory lookup index.
///
/// # Purpose
/// `RecordStore` maps an append-only, delete-compacting collection of
/// fixed-size records onto a single flat file:
///
/// ```text
/// [header: head_size bytes][count: u32 LE][record_0]...[record_{count-1}]
/// ```
///
/// Every live record is cached in a [`BalancedIndex`] keyed by the record's
/// own key, together with its file offset. Lookups and traversal are served
/// entirely from the index; the file is read only when an existing store is
/// reopened (to rebuild the index) and written only on mutation.
///
/// # Characteristics
/// - **Thread-Safe**: a cloneable handle; clones share one store, and every
///   operation runs under a single store-wide lock so the file and the index
///   never diverge
/// - **Fixed Layout**: `head_size` and the record width are fixed when the
///   file is created and are not persisted; reopening with different sizes
///   misreads silently (caller contract)
/// - **Compacting Deletes**: deleting a non-last record relocates the file's
///   last record into the freed slot and shrinks the file, so the record
///   region never holds holes
/// - **Opaque Header**: the header blob is user data, copied verbatim and
///   never interpreted
///
/// # Lifecycle
/// [`close`](RecordStore::close) releases the in-memory cache and leaves the
/// file on disk; [`destroy`](RecordStore::destroy) also deletes the file.
/// Both are terminal: any later operation returns `StoreClosed`. Dropping
/// the last handle without calling either simply releases memory.
#[derive(Debug)]
pub struct RecordStore<R: FixedRecord> {
    inner: Arc<RecordStoreInner<R>>,
}

impl<R: FixedRecord> Clone for RecordStore<R> {
    fn clone(&self) -> Self {
        RecordStore {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[derive(Debug)]
struct StoreState {
    count: u32,
    header: Vec<u8>,
}

#[derive(Debug)]
struct RecordStoreInner<R: FixedRecord> {
    path: PathBuf,
    head_size: usize,
    data_size: usize,
    state: Mutex<StoreState>,
    index: BalancedIndex<RecordSlot<R>>,
    closed: AtomicBool,
    destroyed: AtomicBool,
}

impl<R: FixedRecord> RecordStore<R> {
    /// Opens the store at `path`, creating the file if it does not exist.
    ///
    /// On creation, `default_header` is written verbatim as the file header
    /// followed by a zero record count. On reopen, the on-disk header is read
    /// back (retrievable via [`header`](RecordStore::header)) and the index
    /// is rebuilt by scanning every stored record; any I/O failure, short
    /// read, or duplicate key aborts the open and no store is returned.
    ///
    /// `head_size` must be non-zero and equal `default_header.len()`; the
    /// record width is taken from [`FixedRecord::encoded_len`].
    pub fn open(
        path: impl AsRef<Path>,
        head_size: usize,
        default_header: &[u8],
    ) -> FlatdbResult<RecordStore<R>> {
        let data_size = R::encoded_len();
        if head_size == 0 {
            return Err(FlatdbError::new(
                "header size must be non-zero",
                ErrorKind::InvalidArgument,
            ));
        }
        if data_size == 0 {
            return Err(FlatdbError::new(
                "record width must be non-zero",
                ErrorKind::InvalidArgument,
            ));
        }
        if default_header.len() != head_size {
            return Err(FlatdbError::new(
                &format!(
                    "header buffer is {} bytes but head_size is {}",
                    default_header.len(),
                    head_size
                ),
                ErrorKind::InvalidArgument,
            ));
        }

        let path = path.as_ref().to_path_buf();
        let index = BalancedIndex::new();

        let (count, header) = if path.exists() {
            Self::reload(&path, head_size, data_size, &index)?
        } else {
            Self::create(&path, default_header)?;
            (0, default_header.to_vec())
        };

        log::debug!(
            "opened record store at {} with {} records",
            path.display(),
            count
        );
        Ok(RecordStore {
            inner: Arc::new(RecordStoreInner {
                path,
                head_size,
                data_size,
                state: Mutex::new(StoreState { count, header }),
                index,
                closed: AtomicBool::new(false),
                destroyed: AtomicBool::new(false),
            }),
        })
    }

    /// Appends a record to the store.
    ///
    /// Rejects with `DuplicateKey` if a record with the same key is already
    /// live. On an I/O failure any partially appended bytes are truncated
    /// away and the index is left unchanged; a failed truncate surfaces as
    /// `RollbackFailed`.
    pub fn add(&self, record: R) -> FlatdbResult<()> {
        self.inner.check_open()?;
        let key = record.key();
        let mut state = self.inner.state.lock();

        if self.inner.index.contains_key(key) {
            return Err(FlatdbError::new(
                &format!("a record with key {} already exists", key),
                ErrorKind::DuplicateKey,
            ));
        }

        let mut file = self.inner.open_rw()?;
        let offset = file.seek(SeekFrom::End(0))?;
        let mut buf = vec![0u8; self.inner.data_size];
        record.encode(&mut buf);
        if let Err(err) = file.write_all(&buf) {
            let err = FlatdbError::from(err);
            log::error!(
                "record append failed at {}: {}",
                self.inner.path.display(),
                err
            );
            return Err(Self::rolled_back(&file, offset, err));
        }

        let new_count = state.count + 1;
        if let Err(err) = self.inner.write_count(&mut file, new_count) {
            log::error!(
                "count update failed after append at {}: {}",
                self.inner.path.display(),
                err
            );
            return Err(Self::rolled_back(&file, offset, err));
        }

        state.count = new_count;
        self.inner.index.insert(RecordSlot { offset, record })?;
        log::debug!("added record with key {} at offset {}", key, offset);
        Ok(())
    }

    /// Deletes the record stored under `key`.
    ///
    /// If the record is not the last one in the file, the last record's bytes
    /// are relocated into the freed slot and its cached offset is refreshed,
    /// then the file is shrunk by one record width.
    pub fn delete(&self, key: i64) -> FlatdbResult<()> {
        self.inner.check_open()?;
        let mut state = self.inner.state.lock();

        let slot = self.inner.index.get(key).ok_or_else(|| {
            FlatdbError::new(&format!("no record with key {}", key), ErrorKind::NotFound)
        })?;
        let count = state.count;
        if count == 0 {
            return Err(FlatdbError::new(
                "record count and index disagree",
                ErrorKind::InternalError,
            ));
        }

        let mut file = self.inner.open_rw()?;
        let tail_offset = self.inner.record_offset(count - 1);
        if slot.offset < tail_offset {
            let mut buf = vec![0u8; self.inner.data_size];
            file.seek(SeekFrom::Start(tail_offset))?;
            file.read_exact(&mut buf)?;
            file.seek(SeekFrom::Start(slot.offset))?;
            file.write_all(&buf)?;

            let moved = R::decode(&buf)?;
            let moved_key = moved.key();
            self.inner.index.replace(
                moved_key,
                RecordSlot {
                    offset: slot.offset,
                    record: moved,
                },
            )?;
            log::debug!(
                "relocated record with key {} from offset {} to {}",
                moved_key,
                tail_offset,
                slot.offset
            );
        }

        let new_count = count - 1;
        self.inner.write_count(&mut file, new_count)?;
        file.set_len(self.inner.record_end(new_count))?;
        state.count = new_count;

        self.inner.index.remove(key)?;
        log::debug!("deleted record with key {}", key);
        Ok(())
    }

    /// Overwrites the record stored under `key` with `record`.
    ///
    /// The record's own key must equal `key` (`KeyMismatch` otherwise); the
    /// record keeps its slot in the file and its position in the index.
    pub fn edit(&self, key: i64, record: R) -> FlatdbResult<()> {
        self.inner.check_open()?;
        if record.key() != key {
            return Err(FlatdbError::new(
                &format!(
                    "record carries key {} but key {} was addressed",
                    record.key(),
                    key
                ),
                ErrorKind::KeyMismatch,
            ));
        }
        let _state = self.inner.state.lock();

        let slot = self.inner.index.get(key).ok_or_else(|| {
            FlatdbError::new(&format!("no record with key {}", key), ErrorKind::NotFound)
        })?;

        let mut file = self.inner.open_rw()?;
        let mut buf = vec![0u8; self.inner.data_size];
        record.encode(&mut buf);
        file.seek(SeekFrom::Start(slot.offset))?;
        file.write_all(&buf)?;

        self.inner.index.replace(
            key,
            RecordSlot {
                offset: slot.offset,
                record,
            },
        )?;
        log::debug!("edited record with key {} at offset {}", key, slot.offset);
        Ok(())
    }

    /// Returns a copy of the record stored under `key`, served from the
    /// index without touching the file.
    pub fn query(&self, key: i64) -> FlatdbResult<Option<R>> {
        self.inner.check_open()?;
        let _state = self.inner.state.lock();
        Ok(self.inner.index.get(key).map(|slot| slot.record))
    }

    /// Number of live records.
    pub fn size(&self) -> FlatdbResult<usize> {
        self.inner.check_open()?;
        let state = self.inner.state.lock();
        Ok(state.count as usize)
    }

    /// Visits every live record in ascending key order.
    pub fn traverse<F: FnMut(&R)>(&self, mut visit: F) -> FlatdbResult<()> {
        self.inner.check_open()?;
        let _state = self.inner.state.lock();
        self.inner.index.for_each(|slot| visit(&slot.record));
        Ok(())
    }

    /// Reads the header blob back from file offset 0.
    pub fn read_header(&self) -> FlatdbResult<Vec<u8>> {
        self.inner.check_open()?;
        let mut state = self.inner.state.lock();
        let mut file = File::open(&self.inner.path)?;
        let mut header = vec![0u8; self.inner.head_size];
        file.read_exact(&mut header)?;
        state.header = header.clone();
        Ok(header)
    }

    /// Overwrites the header blob at file offset 0. `header` must be exactly
    /// `head_size` bytes; the record region is unaffected.
    pub fn write_header(&self, header: &[u8]) -> FlatdbResult<()> {
        self.inner.check_open()?;
        if header.len() != self.inner.head_size {
            return Err(FlatdbError::new(
                &format!(
                    "header buffer is {} bytes but head_size is {}",
                    header.len(),
                    self.inner.head_size
                ),
                ErrorKind::InvalidArgument,
            ));
        }
        let mut state = self.inner.state.lock();
        let mut file = self.inner.open_rw()?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(header)?;
        state.header = header.to_vec();
        Ok(())
    }

    /// Returns the cached header copy without touching the file.
    pub fn header(&self) -> FlatdbResult<Vec<u8>> {
        self.inner.check_open()?;
        Ok(self.inner.state.lock().header.clone())
    }

    /// Discards every record while preserving the header: the file is shrunk
    /// to the header and a zero count, and the index is emptied.
    pub fn clear(&self) -> FlatdbResult<()> {
        self.inner.check_open()?;
        let mut state = self.inner.state.lock();
        let mut file = self.inner.open_rw()?;
        self.inner.write_count(&mut file, 0)?;
        file.set_len((self.inner.head_size + COUNT_FIELD_LEN) as u64)?;
        state.count = 0;
        self.inner.index.clear();
        log::debug!("cleared record store at {}", self.inner.path.display());
        Ok(())
    }

    /// Releases the in-memory cache and marks the store closed. The backing
    /// file is left on disk; any later operation returns `StoreClosed`.
    pub fn close(&self) -> FlatdbResult<()> {
        self.inner.check_open()?;
        self.inner.closed.store(true, Ordering::Relaxed);
        self.inner.index.clear();
        log::debug!("closed record store at {}", self.inner.path.display());
        Ok(())
    }

    /// Closes the store and deletes the backing file.
    pub fn destroy(&self) -> FlatdbResult<()> {
        self.inner.check_open()?;
        self.inner.closed.store(true, Ordering::Relaxed);
        self.inner.destroyed.store(true, Ordering::Relaxed);
        self.inner.index.clear();
        fs::remove_file(&self.inner.path)?;
        log::debug!("destroyed record store at {}", self.inner.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn head_size(&self) -> usize {
        self.inner.head_size
    }

    pub fn data_size(&self) -> usize {
        self.inner.data_size
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Relaxed)
    }

    fn create(path: &Path, header: &[u8]) -> FlatdbResult<()> {
        let result = Self::write_initial_layout(path, header);
        if result.is_err() {
            // do not leave a half-initialized file behind
            let _ = fs::remove_file(path);
        }
        result
    }

    fn write_initial_layout(path: &Path, header: &[u8]) -> FlatdbResult<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(header)?;
        file.write_all(&0u32.to_le_bytes())?;
        Ok(())
    }

    /// Rebuilds the index by scanning the record region of an existing file.
    fn reload(
        path: &Path,
        head_size: usize,
        data_size: usize,
        index: &BalancedIndex<RecordSlot<R>>,
    ) -> FlatdbResult<(u32, Vec<u8>)> {
        let mut file = File::open(path)?;
        let mut header = vec![0u8; head_size];
        file.read_exact(&mut header)?;
        let mut count_buf = [0u8; COUNT_FIELD_LEN];
        file.read_exact(&mut count_buf)?;
        let count = u32::from_le_bytes(count_buf);

        let mut buf = vec![0u8; data_size];
        for position in 0..count {
            let offset =
                (head_size + COUNT_FIELD_LEN) as u64 + u64::from(position) * data_size as u64;
            file.read_exact(&mut buf)?;
            let record = R::decode(&buf)?;
            let key = record.key();
            index
                .insert(RecordSlot { offset, record })
                .map_err(|err| {
                    FlatdbError::new_with_cause(
                        &format!("file holds two records with key {} (slot {})", key, position),
                        ErrorKind::FileCorrupted,
                        err,
                    )
                })?;
        }
        Ok((count, header))
    }

    /// Truncates a failed append away, preserving `err` as the reported
    /// failure unless the truncate itself fails.
    fn rolled_back(file: &File, offset: u64, err: FlatdbError) -> FlatdbError {
        match file.set_len(offset) {
            Ok(()) => err,
            Err(trunc_err) => FlatdbError::new_with_cause(
                &format!(
                    "truncating back to {} bytes failed after a write error: {}",
                    offset, trunc_err
                ),
                ErrorKind::RollbackFailed,
                err,
            ),
        }
    }
}

impl<R: FixedRecord> RecordStoreInner<R> {
    fn check_open(&self) -> FlatdbResult<()> {
        if self.destroyed.load(Ordering::Relaxed) {
            log::error!("record store at {} is destroyed", self.path.display());
            return Err(FlatdbError::new(
                &format!("record store at {} is destroyed", self.path.display()),
                ErrorKind::StoreClosed,
            ));
        }
        if self.closed.load(Ordering::Relaxed) {
            log::error!("record store at {} is closed", self.path.display());
            return Err(FlatdbError::new(
                &format!("record store at {} is closed", self.path.display()),
                ErrorKind::StoreClosed,
            ));
        }
        Ok(())
    }

    fn open_rw(&self) -> FlatdbResult<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)?)
    }

    /// Byte offset of the record slot at `position`.
    fn record_offset(&self, position: u32) -> u64 {
        (self.head_size + COUNT_FIELD_LEN) as u64 + u64::from(position) * self.data_size as u64
    }

    /// Logical end of the file when holding `count` records.
    fn record_end(&self, count: u32) -> u64 {
        self.record_offset(count)
    }

    fn write_count(&self, file: &mut File, count: u32) -> FlatdbResult<()> {
        file.seek(SeekFrom::Start(self.head_size as u64))?;
        file.write_all(&count.to_le_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Keyed;
    use tempfile::TempDir;

    const HEAD_SIZE: usize = 8;
    const VALUE_LEN: usize = 12;

    #[derive(Clone, Debug, PartialEq)]
    struct TestRecord {
        id: i32,
        value: [u8; VALUE_LEN],
    }

    impl TestRecord {
        fn new(id: i32, fill: u8) -> Self {
            TestRecord {
                id,
                value: [fill; VALUE_LEN],
            }
        }
    }

    impl Keyed for TestRecord {
        fn key(&self) -> i64 {
            self.id as i64
        }
    }

    impl FixedRecord for TestRecord {
        fn encoded_len() -> usize {
            4 + VALUE_LEN
        }

        fn encode(&self, buf: &mut [u8]) {
            buf[0..4].copy_from_slice(&self.id.to_le_bytes());
            buf[4..].copy_from_slice(&self.value);
        }

        fn decode(buf: &[u8]) -> FlatdbResult<Self> {
            let id_bytes: [u8; 4] = buf[0..4].try_into().map_err(|_| {
                FlatdbError::new("record buffer too short", ErrorKind::FileCorrupted)
            })?;
            let mut value = [0u8; VALUE_LEN];
            value.copy_from_slice(&buf[4..]);
            Ok(TestRecord {
                id: i32::from_le_bytes(id_bytes),
                value,
            })
        }
    }

    fn test_header() -> Vec<u8> {
        vec![0xA5; HEAD_SIZE]
    }

    fn open_store(dir: &TempDir) -> RecordStore<TestRecord> {
        RecordStore::open(dir.path().join("records.db"), HEAD_SIZE, &test_header()).unwrap()
    }

    fn file_len(store: &RecordStore<TestRecord>) -> u64 {
        fs::metadata(store.path()).unwrap().len()
    }

    fn expected_len(records: usize) -> u64 {
        (HEAD_SIZE + COUNT_FIELD_LEN + records * TestRecord::encoded_len()) as u64
    }

    #[test]
    fn test_open_creates_file_with_initial_layout() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert_eq!(store.size().unwrap(), 0);

        let bytes = fs::read(store.path()).unwrap();
        assert_eq!(bytes.len(), HEAD_SIZE + COUNT_FIELD_LEN);
        assert_eq!(&bytes[0..HEAD_SIZE], test_header().as_slice());
        assert_eq!(&bytes[HEAD_SIZE..], 0u32.to_le_bytes().as_slice());
    }

    #[test]
    fn test_open_rejects_invalid_arguments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.db");

        let err = RecordStore::<TestRecord>::open(&path, 0, &[]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidArgument);

        let err = RecordStore::<TestRecord>::open(&path, HEAD_SIZE, &[0u8; 3]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_add_and_query() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.add(TestRecord::new(7, b'a')).unwrap();
        store.add(TestRecord::new(3, b'b')).unwrap();

        assert_eq!(store.size().unwrap(), 2);
        assert_eq!(store.query(7).unwrap(), Some(TestRecord::new(7, b'a')));
        assert_eq!(store.query(3).unwrap(), Some(TestRecord::new(3, b'b')));
        assert_eq!(store.query(99).unwrap(), None);
        assert_eq!(file_len(&store), expected_len(2));
    }

    #[test]
    fn test_add_rejects_duplicate_key() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.add(TestRecord::new(7, b'a')).unwrap();
        let err = store.add(TestRecord::new(7, b'b')).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::DuplicateKey);

        assert_eq!(store.size().unwrap(), 1);
        assert_eq!(store.query(7).unwrap(), Some(TestRecord::new(7, b'a')));
        assert_eq!(file_len(&store), expected_len(1));
    }

    #[test]
    fn test_reopen_reconstructs_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.db");
        {
            let store: RecordStore<TestRecord> =
                RecordStore::open(&path, HEAD_SIZE, &test_header()).unwrap();
            for id in [5, 1, 9] {
                store.add(TestRecord::new(id, b'x')).unwrap();
            }
        }

        let store: RecordStore<TestRecord> =
            RecordStore::open(&path, HEAD_SIZE, &test_header()).unwrap();
        assert_eq!(store.size().unwrap(), 3);
        for id in [5, 1, 9] {
            assert_eq!(store.query(id as i64).unwrap(), Some(TestRecord::new(id, b'x')));
        }
        assert_eq!(store.header().unwrap(), test_header());
    }

    #[test]
    fn test_reopen_rejects_duplicate_keys_in_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.db");
        {
            let store: RecordStore<TestRecord> =
                RecordStore::open(&path, HEAD_SIZE, &test_header()).unwrap();
            store.add(TestRecord::new(4, b'x')).unwrap();
            store.add(TestRecord::new(6, b'y')).unwrap();
        }
        // corrupt the second slot so both records carry key 4
        let mut bytes = fs::read(&path).unwrap();
        let second = HEAD_SIZE + COUNT_FIELD_LEN + TestRecord::encoded_len();
        bytes[second..second + 4].copy_from_slice(&4i32.to_le_bytes());
        fs::write(&path, bytes).unwrap();

        let err = RecordStore::<TestRecord>::open(&path, HEAD_SIZE, &test_header()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::FileCorrupted);
    }

    #[test]
    fn test_reopen_fails_on_truncated_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.db");
        {
            let store: RecordStore<TestRecord> =
                RecordStore::open(&path, HEAD_SIZE, &test_header()).unwrap();
            store.add(TestRecord::new(4, b'x')).unwrap();
        }
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

        assert!(RecordStore::<TestRecord>::open(&path, HEAD_SIZE, &test_header()).is_err());
    }

    #[test]
    fn test_delete_last_record_shrinks_file() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.add(TestRecord::new(1, b'a')).unwrap();
        store.add(TestRecord::new(2, b'b')).unwrap();

        store.delete(2).unwrap();
        assert_eq!(store.size().unwrap(), 1);
        assert_eq!(store.query(2).unwrap(), None);
        assert_eq!(store.query(1).unwrap(), Some(TestRecord::new(1, b'a')));
        assert_eq!(file_len(&store), expected_len(1));
    }

    #[test]
    fn test_delete_middle_record_compacts_file() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.add(TestRecord::new(1, b'a')).unwrap();
        store.add(TestRecord::new(2, b'b')).unwrap();
        store.add(TestRecord::new(3, b'c')).unwrap();

        store.delete(1).unwrap();
        assert_eq!(store.size().unwrap(), 2);
        assert_eq!(store.query(1).unwrap(), None);
        assert_eq!(store.query(2).unwrap(), Some(TestRecord::new(2, b'b')));
        assert_eq!(store.query(3).unwrap(), Some(TestRecord::new(3, b'c')));
        assert_eq!(file_len(&store), expected_len(2));

        // the former tail now occupies the freed slot on disk
        let bytes = fs::read(store.path()).unwrap();
        let first = HEAD_SIZE + COUNT_FIELD_LEN;
        let decoded = TestRecord::decode(&bytes[first..first + TestRecord::encoded_len()]).unwrap();
        assert_eq!(decoded, TestRecord::new(3, b'c'));
    }

    #[test]
    fn test_delete_missing_key() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.add(TestRecord::new(1, b'a')).unwrap();

        let err = store.delete(42).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NotFound);
        assert_eq!(store.size().unwrap(), 1);
    }

    #[test]
    fn test_edit_relocated_record_lands_in_correct_slot() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.add(TestRecord::new(1, b'a')).unwrap();
        store.add(TestRecord::new(2, b'b')).unwrap();
        store.add(TestRecord::new(3, b'c')).unwrap();

        // compaction moves record 3 into record 1's slot
        store.delete(1).unwrap();
        store.edit(3, TestRecord::new(3, b'z')).unwrap();

        // the edit must hit the relocated slot, not the stale tail position
        let path = store.path().to_path_buf();
        drop(store);
        let reopened: RecordStore<TestRecord> =
            RecordStore::open(&path, HEAD_SIZE, &test_header()).unwrap();
        assert_eq!(reopened.size().unwrap(), 2);
        assert_eq!(reopened.query(3).unwrap(), Some(TestRecord::new(3, b'z')));
        assert_eq!(reopened.query(2).unwrap(), Some(TestRecord::new(2, b'b')));
    }

    #[test]
    fn test_edit_overwrites_record_in_place() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.add(TestRecord::new(5, b'a')).unwrap();

        store.edit(5, TestRecord::new(5, b'z')).unwrap();
        assert_eq!(store.query(5).unwrap(), Some(TestRecord::new(5, b'z')));
        assert_eq!(store.size().unwrap(), 1);
        assert_eq!(file_len(&store), expected_len(1));
    }

    #[test]
    fn test_edit_rejects_key_mismatch() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.add(TestRecord::new(5, b'a')).unwrap();

        let err = store.edit(5, TestRecord::new(6, b'z')).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::KeyMismatch);

        // record 5 is unchanged in memory and on disk
        assert_eq!(store.query(5).unwrap(), Some(TestRecord::new(5, b'a')));
        let bytes = fs::read(store.path()).unwrap();
        let first = HEAD_SIZE + COUNT_FIELD_LEN;
        let decoded = TestRecord::decode(&bytes[first..first + TestRecord::encoded_len()]).unwrap();
        assert_eq!(decoded, TestRecord::new(5, b'a'));
    }

    #[test]
    fn test_edit_missing_key() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let err = store.edit(5, TestRecord::new(5, b'a')).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NotFound);
    }

    #[test]
    fn test_traverse_ascending_key_order() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        for id in [42, 7, 19, 3] {
            store.add(TestRecord::new(id, b'x')).unwrap();
        }

        let mut keys = Vec::new();
        store.traverse(|record| keys.push(record.id)).unwrap();
        assert_eq!(keys, vec![3, 7, 19, 42]);
    }

    #[test]
    fn test_write_and_read_header() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let header = vec![0x11; HEAD_SIZE];
        store.write_header(&header).unwrap();
        assert_eq!(store.read_header().unwrap(), header);
        assert_eq!(store.header().unwrap(), header);

        let err = store.write_header(&[0u8; 2]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_header_survives_record_mutations() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let header = vec![0x42; HEAD_SIZE];
        store.write_header(&header).unwrap();

        store.add(TestRecord::new(1, b'a')).unwrap();
        store.add(TestRecord::new(2, b'b')).unwrap();
        store.delete(1).unwrap();

        assert_eq!(store.read_header().unwrap(), header);
    }

    #[test]
    fn test_clear_preserves_header_discards_records() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        for id in 1..=5 {
            store.add(TestRecord::new(id, b'x')).unwrap();
        }

        store.clear().unwrap();
        assert_eq!(store.size().unwrap(), 0);
        assert_eq!(store.query(1).unwrap(), None);
        assert_eq!(file_len(&store), expected_len(0));
        assert_eq!(store.read_header().unwrap(), test_header());

        // store stays usable after a clear
        store.add(TestRecord::new(9, b'y')).unwrap();
        assert_eq!(store.size().unwrap(), 1);
    }

    #[test]
    fn test_close_leaves_file_and_blocks_operations() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.add(TestRecord::new(1, b'a')).unwrap();
        let path = store.path().to_path_buf();

        store.close().unwrap();
        assert!(store.is_closed());
        assert!(path.exists());

        let err = store.add(TestRecord::new(2, b'b')).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::StoreClosed);
        let err = store.query(1).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::StoreClosed);
        let err = store.close().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::StoreClosed);
    }

    #[test]
    fn test_destroy_removes_file() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.add(TestRecord::new(1, b'a')).unwrap();
        let path = store.path().to_path_buf();

        store.destroy().unwrap();
        assert!(!path.exists());

        let err = store.size().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::StoreClosed);
    }

    #[test]
    fn test_size_matches_index_len() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        for id in 1..=10 {
            store.add(TestRecord::new(id, b'x')).unwrap();
        }
        store.delete(4).unwrap();
        store.delete(8).unwrap();

        assert_eq!(store.size().unwrap(), 8);
        assert_eq!(store.inner.index.len(), 8);
    }

    #[test]
    fn test_clones_share_one_store() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let other = store.clone();

        store.add(TestRecord::new(1, b'a')).unwrap();
        assert_eq!(other.query(1).unwrap(), Some(TestRecord::new(1, b'a')));
        assert_eq!(other.size().unwrap(), 1);
    }
}
