pub mod framebuffer;
pub mod types;
pub mod utils;

pub use framebuffer::{CaptureResult, MockFramebuffer};
pub use types::{Snapshot, SnapshotConfig, SnapshotError, SnapshotResult};
pub use utils::{create_base_metadata, generate_timestamp, save_capture, write_description, write_manifest};
