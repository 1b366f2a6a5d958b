//! Process groups: live OS processes grouped by executable name.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ============================================================================
// OS Snapshot Entry
// ============================================================================

/// One live process as reported by the OS process facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub pid: u32,
    /// Executable display name (e.g. "firefox", "Code.exe")
    pub name: String,
    /// Absolute executable path, `None` when protected or unresolvable
    pub executable: Option<PathBuf>,
}

impl ProcessEntry {
    pub fn new(pid: u32, name: impl Into<String>, executable: Option<PathBuf>) -> Self {
        Self {
            pid,
            name: name.into(),
            executable,
        }
    }

    /// Returns true if the entry has a non-empty executable path.
    ///
    /// Processes without one are treated as system/background processes.
    #[must_use]
    pub fn has_executable(&self) -> bool {
        self.executable
            .as_deref()
            .is_some_and(|p| !p.as_os_str().is_empty())
    }
}

// ============================================================================
// Icon Blob
// ============================================================================

/// Opaque image bytes produced by an icon provider.
///
/// Cheap to clone; the core never inspects the contents.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBlob(Arc<[u8]>);

impl ImageBlob {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ImageBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageBlob({} bytes)", self.0.len())
    }
}

// ============================================================================
// Process Group
// ============================================================================

/// All live processes sharing one executable display name.
///
/// Created fresh on every registry refresh and never merged with an earlier
/// snapshot. The PIDs are those seen at the last refresh; some may have
/// exited since.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessGroup {
    pub name: String,
    pub pids: BTreeSet<u32>,
    /// First non-empty executable path seen for this name
    pub executable: Option<PathBuf>,
    #[serde(skip)]
    pub icon: Option<ImageBlob>,
}

impl ProcessGroup {
    /// Creates an empty group for a display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pids: BTreeSet::new(),
            executable: None,
            icon: None,
        }
    }

    /// Adds a process entry to the group.
    ///
    /// The executable path is taken from the first entry that has one.
    pub fn push(&mut self, entry: &ProcessEntry) {
        self.pids.insert(entry.pid);
        if self.executable.is_none() && entry.has_executable() {
            self.executable = entry.executable.clone();
        }
    }

    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }

    /// Number of processes in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    /// Returns true if no member exposed an executable path.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.executable.is_none()
    }

    /// Case-insensitive name comparison used for selection.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}
