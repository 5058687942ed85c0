mod json_registry;
mod jsonl_log;
mod traits;

pub use json_registry::JsonChatRegistry;
pub use jsonl_log::JsonlMessageLog;
pub use traits::{ChatRegistry, MessageLog};

use std::fs;
use std::io::Write;
use std::path::Path;

/// Write `contents` to `path` through a sibling temp file and a rename, so a
/// crash mid-write never leaves a half-written file behind.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}
