pub mod builder;
pub mod reference_set;
pub mod rescale;

pub use builder::{StreamBuilder, EXPECTED_DIR, INITIAL_SELECT_DELAY, INSERT_DIR, SELECT_DIR};
pub use reference_set::ReferenceStore;
pub use rescale::{rescale, rescale_buckets};
