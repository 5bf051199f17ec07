//! Fixed-offset image of the calibration record.
//!
//! ```text
//! [0]  marker    u16 LE   validity sentinel
//! [2]  floor     f32 LE
//! [6]  triggers  8 x f32 LE
//! [38] wires     u8 bitmap
//! [39] checksum  u8, XOR over bytes 2..39
//! ```
//!
//! The marker is written last, so a save interrupted before the final
//! write leaves the store unloadable instead of half-valid. The checksum
//! turns the remaining partial-write window (marker written, payload
//! stale) from silent corruption into a recalibration.

use crate::config::{
    ActionTable, CalibrationRecord, StoreError, TriggerTable, WireAssignment, SLOT_COUNT,
};

/// Validity sentinel; anything else means "uninitialized or erased".
pub const RECORD_MARKER: u16 = 101;

pub const MARKER_OFFSET: usize = 0;
pub const FLOOR_OFFSET: usize = 2;
pub const TRIGGERS_OFFSET: usize = 6;
pub const WIRES_OFFSET: usize = 38;
pub const CHECKSUM_OFFSET: usize = 39;

/// Total image size in bytes.
pub const IMAGE_LEN: usize = 40;

/// Payload span covered by the checksum (floor, triggers, wires).
const PAYLOAD_LEN: usize = CHECKSUM_OFFSET - FLOOR_OFFSET;

/// Byte-addressed storage for the record image, EEPROM-like.
///
/// Writes are expected to land individually and in call order; `save`
/// relies on that to sequence the marker after the payload.
pub trait ConfigStorage {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError>;
    fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<(), StoreError>;
}

/// In-memory image. The host-test backend, and the staging buffer for the
/// NVS blob backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RamStorage {
    bytes: [u8; IMAGE_LEN],
}

impl RamStorage {
    /// Zeroed image (no valid marker).
    pub const fn new() -> Self {
        Self {
            bytes: [0; IMAGE_LEN],
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Default for RamStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStorage for RamStorage {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError> {
        let end = offset + buf.len();
        if end > IMAGE_LEN {
            return Err(StoreError::OutOfBounds);
        }
        buf.copy_from_slice(&self.bytes[offset..end]);
        Ok(())
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<(), StoreError> {
        let end = offset + bytes.len();
        if end > IMAGE_LEN {
            return Err(StoreError::OutOfBounds);
        }
        self.bytes[offset..end].copy_from_slice(bytes);
        Ok(())
    }
}

fn xor_checksum(payload: &[u8]) -> u8 {
    let mut sum = 0;
    for b in payload {
        sum ^= b;
    }
    sum
}

fn encode_payload(record: &CalibrationRecord) -> [u8; PAYLOAD_LEN] {
    let mut payload = [0u8; PAYLOAD_LEN];
    payload[..4].copy_from_slice(&record.floor.to_le_bytes());
    let triggers_at = TRIGGERS_OFFSET - FLOOR_OFFSET;
    for (i, t) in record.triggers.values().iter().enumerate() {
        let at = triggers_at + i * 4;
        payload[at..at + 4].copy_from_slice(&t.to_le_bytes());
    }
    payload[WIRES_OFFSET - FLOOR_OFFSET] = record.wires.bits();
    payload
}

fn read_f32(payload: &[u8], at: usize) -> f32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&payload[at..at + 4]);
    f32::from_le_bytes(bytes)
}

/// Persist a record. The payload and its checksum go first, the validity
/// marker strictly last.
pub fn save<S: ConfigStorage>(store: &mut S, record: &CalibrationRecord) -> Result<(), StoreError> {
    let payload = encode_payload(record);
    store.write(FLOOR_OFFSET, &payload)?;
    store.write(CHECKSUM_OFFSET, &[xor_checksum(&payload)])?;
    store.write(MARKER_OFFSET, &RECORD_MARKER.to_le_bytes())?;
    Ok(())
}

/// Load the persisted record, rebuilding it around the caller's action
/// table (action levels are not part of the image).
///
/// Returns `Ok(None)` when the marker is missing or the checksum does not
/// verify; both mean "recalibrate", never a hard error.
pub fn load<S: ConfigStorage>(
    store: &S,
    actions: &ActionTable,
) -> Result<Option<CalibrationRecord>, StoreError> {
    let mut marker = [0u8; 2];
    store.read(MARKER_OFFSET, &mut marker)?;
    if u16::from_le_bytes(marker) != RECORD_MARKER {
        return Ok(None);
    }

    let mut payload = [0u8; PAYLOAD_LEN];
    store.read(FLOOR_OFFSET, &mut payload)?;
    let mut checksum = [0u8; 1];
    store.read(CHECKSUM_OFFSET, &mut checksum)?;
    if xor_checksum(&payload) != checksum[0] {
        return Ok(None);
    }

    let floor = read_f32(&payload, 0);
    let mut triggers = [0f32; SLOT_COUNT];
    let triggers_at = TRIGGERS_OFFSET - FLOOR_OFFSET;
    for (i, t) in triggers.iter_mut().enumerate() {
        *t = read_f32(&payload, triggers_at + i * 4);
    }
    let wires = WireAssignment::from_bits(payload[WIRES_OFFSET - FLOOR_OFFSET]);

    Ok(Some(CalibrationRecord {
        floor,
        triggers: TriggerTable::new(triggers),
        actions: *actions,
        wires,
    }))
}

/// Erase the validity marker, leaving the payload in place. The next boot
/// sees no record and recalibrates.
pub fn invalidate<S: ConfigStorage>(store: &mut S) -> Result<(), StoreError> {
    store.write(MARKER_OFFSET, &[0, 0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> CalibrationRecord {
        CalibrationRecord {
            floor: 1.5,
            triggers: TriggerTable::new([4.9, 4.5, 3.9, 3.1, 4.8, 4.4, 3.8, 3.0]),
            actions: ActionTable::new([2.18, 1.86, 1.43, 1.63, 0.66, 1.24, 1.24, 0.89]),
            wires: WireAssignment::from_bits(0b1111_0000),
        }
    }

    #[test]
    fn test_offsets() {
        assert_eq!(MARKER_OFFSET, 0);
        assert_eq!(FLOOR_OFFSET, 2);
        assert_eq!(TRIGGERS_OFFSET, 6);
        assert_eq!(WIRES_OFFSET, 38);
        assert_eq!(CHECKSUM_OFFSET, 39);
        assert_eq!(IMAGE_LEN, 40);
    }

    #[test]
    fn test_save_load_round_trip() {
        let record = sample_record();
        let mut store = RamStorage::new();
        save(&mut store, &record).unwrap();

        let loaded = load(&store, &record.actions).unwrap();
        assert_eq!(loaded, Some(record));
    }

    #[test]
    fn test_load_without_marker() {
        let store = RamStorage::new();
        let actions = ActionTable::default();
        assert_eq!(load(&store, &actions).unwrap(), None);
    }

    #[test]
    fn test_corrupt_marker_rejected() {
        let record = sample_record();
        let mut store = RamStorage::new();
        save(&mut store, &record).unwrap();

        store.bytes_mut()[MARKER_OFFSET] ^= 0xFF;
        assert_eq!(load(&store, &record.actions).unwrap(), None);
    }

    #[test]
    fn test_corrupt_payload_rejected_by_checksum() {
        let record = sample_record();
        let mut store = RamStorage::new();
        save(&mut store, &record).unwrap();

        // Flip one trigger byte; the marker is still intact.
        store.bytes_mut()[TRIGGERS_OFFSET + 5] ^= 0x01;
        assert_eq!(load(&store, &record.actions).unwrap(), None);
    }

    #[test]
    fn test_invalidate_erases_marker_only() {
        let record = sample_record();
        let mut store = RamStorage::new();
        save(&mut store, &record).unwrap();

        invalidate(&mut store).unwrap();
        assert_eq!(load(&store, &record.actions).unwrap(), None);
        // Payload survives the erase.
        assert_eq!(store.bytes()[WIRES_OFFSET], record.wires.bits());
    }

    #[test]
    fn test_marker_written_last() {
        // Storage that dies after the first N writes.
        struct Truncating {
            inner: RamStorage,
            writes_left: usize,
        }
        impl ConfigStorage for Truncating {
            fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError> {
                self.inner.read(offset, buf)
            }
            fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<(), StoreError> {
                if self.writes_left == 0 {
                    return Err(StoreError::Backend);
                }
                self.writes_left -= 1;
                self.inner.write(offset, bytes)
            }
        }

        let record = sample_record();
        // Payload and checksum land, the marker write never happens.
        let mut store = Truncating {
            inner: RamStorage::new(),
            writes_left: 2,
        };
        assert!(save(&mut store, &record).is_err());
        assert_eq!(load(&store.inner, &record.actions).unwrap(), None);
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut store = RamStorage::new();
        let mut buf = [0u8; 8];
        assert!(matches!(
            store.read(IMAGE_LEN - 4, &mut buf),
            Err(StoreError::OutOfBounds)
        ));
        assert!(matches!(
            store.write(IMAGE_LEN, &[1]),
            Err(StoreError::OutOfBounds)
        ));
    }
}
