//! NVS persistence for the calibration record.
//!
//! The 40-byte record image is kept as a single blob under a dedicated
//! namespace. `NvsStore` stages the image in RAM and flushes the blob on
//! every write, so the marker-last ordering of `layout::save` still holds
//! at blob granularity: a power loss before the final flush leaves the
//! stored marker invalid.

use crate::config::layout::{ConfigStorage, RamStorage};
use crate::config::StoreError;

/// NVS namespace for the calibration record.
pub const NVS_NAMESPACE: &str = "ladder_cfg";

/// Blob key holding the record image.
#[cfg(target_os = "espidf")]
const RECORD_KEY: &str = "record";

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

    /// Calibration record store backed by the default NVS partition.
    pub struct NvsStore {
        nvs: EspNvs<NvsDefault>,
        image: RamStorage,
    }

    impl NvsStore {
        /// Open the namespace and pull the stored image, if any.
        pub fn open() -> Result<Self, StoreError> {
            let partition = EspDefaultNvsPartition::take().map_err(StoreError::Nvs)?;
            let nvs = EspNvs::new(partition, NVS_NAMESPACE, true).map_err(StoreError::Nvs)?;

            let mut image = RamStorage::new();
            nvs.get_blob(RECORD_KEY, image.bytes_mut())
                .map_err(StoreError::Nvs)?;

            Ok(Self { nvs, image })
        }

        fn flush(&mut self) -> Result<(), StoreError> {
            self.nvs
                .set_blob(RECORD_KEY, self.image.bytes())
                .map_err(StoreError::Nvs)
        }
    }

    impl ConfigStorage for NvsStore {
        fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError> {
            self.image.read(offset, buf)
        }

        fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<(), StoreError> {
            self.image.write(offset, bytes)?;
            self.flush()
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::NvsStore;

/// Stub for non-ESP platforms.
#[cfg(not(target_os = "espidf"))]
pub struct NvsStore {
    image: RamStorage,
}

#[cfg(not(target_os = "espidf"))]
impl NvsStore {
    pub fn open() -> Result<Self, StoreError> {
        Err(StoreError::NotAvailable)
    }
}

#[cfg(not(target_os = "espidf"))]
impl ConfigStorage for NvsStore {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError> {
        self.image.read(offset, buf)
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<(), StoreError> {
        self.image.write(offset, bytes)
    }
}
