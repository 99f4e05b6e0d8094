use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use supplytrace_types::{Identity, Mutation};
use tracing::{debug, info, warn};

use crate::error::JournalError;
use crate::record::JournalRecord;
use crate::storage::{FileJournal, JournalStorage, MemoryJournal};

/// Journal magic bytes: "SCTJ" (SupplyTrace Journal)
const JOURNAL_MAGIC: [u8; 4] = *b"SCTJ";
const JOURNAL_VERSION: u16 = 1;
/// magic(4) + version(2) + reserved(2)
const HEADER_SIZE: usize = 8;
/// length(4) + sequence(8)
const FRAME_PREFIX: usize = 12;
/// length(4) + sequence(8) + crc32(4)
const FRAME_OVERHEAD: usize = 16;

/// When appended bytes are forced to stable storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// fsync after every record
    #[default]
    Immediate,
    /// flush userspace buffers only
    Flush,
    /// leave it to the OS
    OsManaged,
}

/// Result of walking the whole journal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub total_records: u64,
    pub verified_records: u64,
    /// Offsets of frames whose checksum or payload is bad.
    pub corrupted_offsets: Vec<u64>,
    /// Sequences whose hash or back-link does not match.
    pub broken_links: Vec<u64>,
    pub torn_tail: bool,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.corrupted_offsets.is_empty() && self.broken_links.is_empty()
    }
}

struct RawFrame {
    offset: u64,
    sequence: u64,
    payload: Vec<u8>,
    stored_crc: u32,
}

struct FrameScan {
    frames: Vec<RawFrame>,
    /// Length of the well-formed prefix (header + complete frames).
    valid_len: u64,
    torn: bool,
}

/// Write-ahead journal of committed transactions.
///
/// Layout: `[magic:4][version:2][reserved:2][frames...]`
/// Frame:  `[length:4][sequence:8][record json:N][crc32:4]`, little-endian.
pub struct Journal {
    storage: Box<dyn JournalStorage>,
    sync_mode: SyncMode,
    last_sequence: u64,
    last_hash: Option<String>,
    len: u64,
}

impl Journal {
    /// Open a journal, creating its header if the storage is empty.
    ///
    /// Returns the journal positioned for appending plus every committed
    /// record, in order, for replay. A partially written final frame is cut
    /// off; anything else that does not check out is an error.
    pub fn open(
        mut storage: Box<dyn JournalStorage>,
        sync_mode: SyncMode,
    ) -> Result<(Self, Vec<JournalRecord>), JournalError> {
        let bytes = storage.read_all()?;

        if bytes.len() < HEADER_SIZE {
            if !bytes.is_empty() {
                warn!(
                    journal = %storage.describe(),
                    bytes = bytes.len(),
                    "Truncated journal header, reinitializing empty journal"
                );
                storage.truncate(0)?;
            }
            storage.append(&encode_header())?;
            storage.sync()?;
            info!(journal = %storage.describe(), "Journal created");
            let journal = Self {
                storage,
                sync_mode,
                last_sequence: 0,
                last_hash: None,
                len: HEADER_SIZE as u64,
            };
            return Ok((journal, Vec::new()));
        }

        let scan = split_frames(&bytes)?;
        if scan.torn {
            warn!(
                journal = %storage.describe(),
                valid_len = scan.valid_len,
                dropped_bytes = bytes.len() as u64 - scan.valid_len,
                "Dropping torn journal tail"
            );
            storage.truncate(scan.valid_len)?;
        }

        let mut records = Vec::with_capacity(scan.frames.len());
        let mut last_hash: Option<String> = None;
        let mut last_sequence = 0u64;

        for frame in scan.frames {
            if crc32fast::hash(&frame.payload) != frame.stored_crc {
                return Err(JournalError::Corruption {
                    offset: frame.offset,
                    reason: "crc mismatch".to_string(),
                });
            }
            let record: JournalRecord =
                serde_json::from_slice(&frame.payload).map_err(|e| JournalError::Corruption {
                    offset: frame.offset,
                    reason: format!("undecodable record: {e}"),
                })?;
            if record.sequence != frame.sequence || record.sequence != last_sequence + 1 {
                return Err(JournalError::Corruption {
                    offset: frame.offset,
                    reason: format!(
                        "expected sequence {}, found {}",
                        last_sequence + 1,
                        record.sequence
                    ),
                });
            }
            if record.previous_hash != last_hash || !record.verify_hash() {
                return Err(JournalError::BrokenChain {
                    sequence: record.sequence,
                });
            }
            last_sequence = record.sequence;
            last_hash = Some(record.hash.clone());
            records.push(record);
        }

        info!(
            journal = %storage.describe(),
            records = records.len(),
            last_sequence,
            "Journal opened"
        );

        let journal = Self {
            storage,
            sync_mode,
            last_sequence,
            last_hash,
            len: scan.valid_len,
        };
        Ok((journal, records))
    }

    pub fn open_file(
        path: impl AsRef<Path>,
        sync_mode: SyncMode,
    ) -> Result<(Self, Vec<JournalRecord>), JournalError> {
        Self::open(Box::new(FileJournal::open(path)?), sync_mode)
    }

    pub fn open_memory(
        storage: MemoryJournal,
    ) -> Result<(Self, Vec<JournalRecord>), JournalError> {
        Self::open(Box::new(storage), SyncMode::OsManaged)
    }

    /// Append one committed transaction. Nothing is written on error.
    pub fn append(
        &mut self,
        caller: &Identity,
        committed_at: DateTime<Utc>,
        mutations: Vec<Mutation>,
    ) -> Result<JournalRecord, JournalError> {
        let sequence = self.last_sequence + 1;
        let record = JournalRecord::seal(
            sequence,
            committed_at,
            caller.clone(),
            mutations,
            self.last_hash.clone(),
        )?;
        let payload = serde_json::to_vec(&record)?;
        let frame = encode_frame(sequence, &payload)?;

        if let Err(e) = self.write_frame(&frame) {
            if let Err(repair) = self.storage.truncate(self.len) {
                warn!(
                    sequence,
                    error = %repair,
                    "Could not cut back a failed journal write"
                );
            }
            return Err(e);
        }

        self.len += frame.len() as u64;
        self.last_sequence = sequence;
        self.last_hash = Some(record.hash.clone());
        debug!(
            sequence,
            mutations = record.mutations.len(),
            caller = %record.caller,
            "Journal record appended"
        );
        Ok(record)
    }

    /// Every committed record, in order.
    pub fn read_all(&self) -> Result<Vec<JournalRecord>, JournalError> {
        let bytes = self.storage.read_all()?;
        let scan = split_frames(&bytes)?;
        let mut records = Vec::with_capacity(scan.frames.len());
        for frame in scan.frames {
            if crc32fast::hash(&frame.payload) != frame.stored_crc {
                return Err(JournalError::Corruption {
                    offset: frame.offset,
                    reason: "crc mismatch".to_string(),
                });
            }
            records.push(serde_json::from_slice(&frame.payload)?);
        }
        Ok(records)
    }

    /// Walk every frame, checking checksums and the hash chain.
    ///
    /// Unlike [`Journal::open`] this does not stop at the first problem.
    pub fn verify(&self) -> Result<IntegrityReport, JournalError> {
        let bytes = self.storage.read_all()?;
        let scan = split_frames(&bytes)?;
        let mut report = IntegrityReport {
            torn_tail: scan.torn,
            ..IntegrityReport::default()
        };
        let mut expected_previous: Option<String> = None;

        for frame in scan.frames {
            report.total_records += 1;
            if crc32fast::hash(&frame.payload) != frame.stored_crc {
                report.corrupted_offsets.push(frame.offset);
                expected_previous = None;
                continue;
            }
            let record: JournalRecord = match serde_json::from_slice(&frame.payload) {
                Ok(record) => record,
                Err(_) => {
                    report.corrupted_offsets.push(frame.offset);
                    expected_previous = None;
                    continue;
                }
            };
            let linked = (report.total_records == 1 && record.previous_hash.is_none())
                || (expected_previous.is_some() && record.previous_hash == expected_previous);
            if linked && record.verify_hash() {
                report.verified_records += 1;
            } else {
                report.broken_links.push(record.sequence);
            }
            expected_previous = Some(record.hash);
        }

        Ok(report)
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn head_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    pub fn describe(&self) -> String {
        self.storage.describe()
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), JournalError> {
        self.storage.append(frame)?;
        match self.sync_mode {
            SyncMode::Immediate => self.storage.sync(),
            SyncMode::Flush => self.storage.flush(),
            SyncMode::OsManaged => Ok(()),
        }
    }
}

fn encode_header() -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[..4].copy_from_slice(&JOURNAL_MAGIC);
    header[4..6].copy_from_slice(&JOURNAL_VERSION.to_le_bytes());
    // bytes 6..8 reserved
    header
}

fn encode_frame(sequence: u64, payload: &[u8]) -> Result<Vec<u8>, JournalError> {
    let length = u32::try_from(payload.len())
        .map_err(|_| JournalError::Serialization("record exceeds 4 GiB".to_string()))?;
    let crc = crc32fast::hash(payload);
    let mut frame = Vec::with_capacity(FRAME_OVERHEAD + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&sequence.to_le_bytes());
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&crc.to_le_bytes());
    Ok(frame)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

/// Split raw bytes into frames without checking checksums.
fn split_frames(bytes: &[u8]) -> Result<FrameScan, JournalError> {
    if bytes.len() < HEADER_SIZE {
        return Ok(FrameScan {
            frames: Vec::new(),
            valid_len: 0,
            torn: !bytes.is_empty(),
        });
    }
    if bytes[..4] != JOURNAL_MAGIC {
        return Err(JournalError::Corruption {
            offset: 0,
            reason: "bad magic".to_string(),
        });
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != JOURNAL_VERSION {
        return Err(JournalError::Corruption {
            offset: 4,
            reason: format!("unsupported journal version {version}"),
        });
    }

    let mut frames = Vec::new();
    let mut pos = HEADER_SIZE;
    let mut torn = false;

    while pos < bytes.len() {
        if bytes.len() - pos < FRAME_PREFIX {
            torn = true;
            break;
        }
        let length = read_u32(bytes, pos) as usize;
        let sequence = read_u64(bytes, pos + 4);
        if length == 0 {
            return Err(JournalError::Corruption {
                offset: pos as u64,
                reason: "zero-length frame".to_string(),
            });
        }
        let end = pos + FRAME_OVERHEAD + length;
        if end > bytes.len() {
            // A torn write only ever leaves a prefix of the last frame. If an
            // intact frame follows, the length field itself is damaged.
            if let Some(next) = intact_frame_after(bytes, pos + FRAME_PREFIX) {
                return Err(JournalError::Corruption {
                    offset: pos as u64,
                    reason: format!(
                        "frame length {length} overruns the journal, but an intact frame follows at {next}"
                    ),
                });
            }
            torn = true;
            break;
        }
        let payload_start = pos + FRAME_PREFIX;
        frames.push(RawFrame {
            offset: pos as u64,
            sequence,
            payload: bytes[payload_start..payload_start + length].to_vec(),
            stored_crc: read_u32(bytes, payload_start + length),
        });
        pos = end;
    }

    Ok(FrameScan {
        frames,
        valid_len: pos as u64,
        torn,
    })
}

/// Offset of the first complete, checksum-valid frame at or after `from`.
fn intact_frame_after(bytes: &[u8], from: usize) -> Option<usize> {
    (from..bytes.len().saturating_sub(FRAME_OVERHEAD)).find(|&at| {
        let length = read_u32(bytes, at) as usize;
        let payload_start = at + FRAME_PREFIX;
        length > 0
            && bytes.len() - payload_start >= length + 4
            && bytes[payload_start] == b'{'
            && crc32fast::hash(&bytes[payload_start..payload_start + length])
                == read_u32(bytes, payload_start + length)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use supplytrace_types::{EntityId, OperationalRole};

    fn admin() -> Identity {
        Identity::new("deployer")
    }

    fn open_fresh() -> (Journal, MemoryJournal) {
        let storage = MemoryJournal::new();
        let (journal, records) = Journal::open_memory(storage.clone()).unwrap();
        assert!(records.is_empty());
        (journal, storage)
    }

    fn append_grants(journal: &mut Journal, n: usize) {
        journal
            .append(
                &admin(),
                Utc::now(),
                vec![Mutation::Genesis { admin: admin() }],
            )
            .unwrap();
        for i in 0..n {
            journal
                .append(
                    &admin(),
                    Utc::now(),
                    vec![Mutation::RoleGranted {
                        role: OperationalRole::OperatorTransit,
                        identity: Identity::new(format!("carrier-{i}")),
                    }],
                )
                .unwrap();
        }
    }

    #[test]
    fn new_journal_has_header_only() {
        let (journal, storage) = open_fresh();
        assert_eq!(journal.last_sequence(), 0);
        assert!(journal.head_hash().is_none());
        let bytes = storage.snapshot().unwrap();
        assert_eq!(&bytes[..4], b"SCTJ");
        assert_eq!(bytes.len(), HEADER_SIZE);
    }

    #[test]
    fn append_then_reopen_returns_records_in_order() {
        let (mut journal, storage) = open_fresh();
        append_grants(&mut journal, 3);
        assert_eq!(journal.last_sequence(), 4);
        let head = journal.head_hash().map(str::to_string);
        drop(journal);

        let (reopened, records) = Journal::open_memory(storage).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(
            records.iter().map(|r| r.sequence).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert!(records[0].previous_hash.is_none());
        assert_eq!(records[1].previous_hash.as_deref(), Some(records[0].hash.as_str()));
        assert_eq!(reopened.head_hash().map(str::to_string), head);
        assert_eq!(reopened.last_sequence(), 4);
    }

    #[test]
    fn composite_transaction_is_one_record() {
        let (mut journal, _) = open_fresh();
        append_grants(&mut journal, 0);
        let record = journal
            .append(
                &Identity::new("orchestrator"),
                Utc::now(),
                vec![
                    Mutation::StatusUpdated {
                        id: EntityId(1),
                        status: "RAW".to_string(),
                    },
                    Mutation::StatusUpdated {
                        id: EntityId(1),
                        status: "PACKED".to_string(),
                    },
                ],
            )
            .unwrap();
        assert_eq!(record.sequence, 2);
        assert_eq!(journal.read_all().unwrap()[1].mutations.len(), 2);
    }

    #[test]
    fn torn_tail_is_dropped_on_open() {
        let (mut journal, storage) = open_fresh();
        append_grants(&mut journal, 2);
        drop(journal);

        let mut bytes = storage.snapshot().unwrap();
        let full_len = bytes.len();
        bytes.truncate(full_len - 5);
        let torn = MemoryJournal::from_bytes(bytes);

        let (mut reopened, records) = Journal::open_memory(torn.clone()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(reopened.last_sequence(), 2);

        // Appending after repair continues the chain cleanly.
        reopened
            .append(&admin(), Utc::now(), vec![Mutation::Genesis { admin: admin() }])
            .unwrap();
        let report = reopened.verify().unwrap();
        assert!(report.is_clean());
        assert!(!report.torn_tail);
        assert_eq!(report.total_records, 3);
    }

    #[test]
    fn damaged_length_in_a_middle_frame_is_not_a_torn_tail() {
        let (mut journal, storage) = open_fresh();
        append_grants(&mut journal, 4);
        drop(journal);

        let mut bytes = storage.snapshot().unwrap();
        let original_len = bytes.len();
        let second = HEADER_SIZE + FRAME_OVERHEAD + read_u32(&bytes, HEADER_SIZE) as usize;
        // High byte of the second frame's length: it now runs past the end.
        bytes[second + 3] ^= 0x40;
        let damaged = MemoryJournal::from_bytes(bytes);

        match Journal::open_memory(damaged.clone()) {
            Err(JournalError::Corruption { offset, .. }) => assert_eq!(offset, second as u64),
            other => panic!("expected corruption, got {:?}", other.map(|(_, r)| r.len())),
        }
        // Nothing committed was cut away.
        assert_eq!(damaged.snapshot().unwrap().len(), original_len);
    }

    #[test]
    fn crc_mismatch_is_corruption() {
        let (mut journal, storage) = open_fresh();
        append_grants(&mut journal, 1);
        drop(journal);

        let mut bytes = storage.snapshot().unwrap();
        // Flip a byte inside the first payload.
        bytes[HEADER_SIZE + FRAME_PREFIX + 2] ^= 0xff;
        let damaged = MemoryJournal::from_bytes(bytes);

        match Journal::open_memory(damaged) {
            Err(JournalError::Corruption { offset, .. }) => assert_eq!(offset, HEADER_SIZE as u64),
            other => panic!("expected corruption, got {:?}", other.map(|(_, r)| r.len())),
        }
    }

    #[test]
    fn bad_magic_is_rejected() {
        let damaged = MemoryJournal::from_bytes(b"NOPE\x01\x00\x00\x00".to_vec());
        assert!(matches!(
            Journal::open_memory(damaged),
            Err(JournalError::Corruption { offset: 0, .. })
        ));
    }

    #[test]
    fn verify_reports_corrupted_frames_without_stopping() {
        let (mut journal, storage) = open_fresh();
        append_grants(&mut journal, 2);
        assert!(journal.verify().unwrap().is_clean());

        let mut bytes = storage.snapshot().unwrap();
        bytes[HEADER_SIZE + FRAME_PREFIX + 2] ^= 0xff;
        let damaged = MemoryJournal::from_bytes(bytes);
        let storage: Box<dyn JournalStorage> = Box::new(damaged);
        let inspector = Journal {
            storage,
            sync_mode: SyncMode::OsManaged,
            last_sequence: 0,
            last_hash: None,
            len: 0,
        };
        let report = inspector.verify().unwrap();
        assert_eq!(report.total_records, 3);
        assert_eq!(report.corrupted_offsets, vec![HEADER_SIZE as u64]);
        // The record after the damaged one cannot be linked.
        assert_eq!(report.broken_links, vec![2]);
        assert_eq!(report.verified_records, 1);
    }

    #[test]
    fn failed_write_appends_nothing() {
        let (mut journal, storage) = open_fresh();
        append_grants(&mut journal, 0);
        let before = storage.snapshot().unwrap();

        storage.fail_writes(true);
        let result = journal.append(&admin(), Utc::now(), vec![Mutation::Genesis { admin: admin() }]);
        assert!(matches!(result, Err(JournalError::Io(_))));
        assert_eq!(storage.snapshot().unwrap(), before);
        assert_eq!(journal.last_sequence(), 1);

        storage.fail_writes(false);
        let record = journal
            .append(&admin(), Utc::now(), vec![Mutation::Genesis { admin: admin() }])
            .unwrap();
        assert_eq!(record.sequence, 2);
    }

    #[test]
    fn file_journal_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("supplytrace.journal");
        {
            let (mut journal, _) = Journal::open_file(&path, SyncMode::Immediate).unwrap();
            append_grants(&mut journal, 1);
        }
        let (journal, records) = Journal::open_file(&path, SyncMode::Flush).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(journal.last_sequence(), 2);
        assert!(journal.verify().unwrap().is_clean());
    }

    #[test]
    fn sync_mode_parses_from_config_strings() {
        let mode: SyncMode = serde_json::from_str("\"os_managed\"").unwrap();
        assert_eq!(mode, SyncMode::OsManaged);
        assert_eq!(SyncMode::default(), SyncMode::Immediate);
    }
}
