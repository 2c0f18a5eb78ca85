use foraging_core::SummaryRecord;

pub const GALLERY_VERSION: u32 = 1;

pub const GALLERY_KEY: &str = "gallery.v1";

/// Finished games kept on this device, most recent first.
#[derive(Clone, Debug, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub struct GalleryBlob {
    pub version: u32,
    pub records: Vec<SummaryRecord>,
}

impl Default for GalleryBlob {
    fn default() -> Self {
        Self {
            version: GALLERY_VERSION,
            records: Vec::new(),
        }
    }
}
