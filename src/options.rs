use std::ops::{BitOr, BitOrAssign};

use libsqlite3_sys as ffi;

/// Flags controlling how a database file is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OpenFlags(i32);

impl OpenFlags {
    pub const READ_ONLY: Self = Self(ffi::SQLITE_OPEN_READONLY);
    pub const READ_WRITE: Self = Self(ffi::SQLITE_OPEN_READWRITE);
    /// Create the file if it does not exist. Must be combined with `READ_WRITE`.
    pub const CREATE: Self = Self(ffi::SQLITE_OPEN_CREATE);
    /// Interpret the path as a `file:` URI.
    pub const URI: Self = Self(ffi::SQLITE_OPEN_URI);
    pub const NO_MUTEX: Self = Self(ffi::SQLITE_OPEN_NOMUTEX);
    pub const FULL_MUTEX: Self = Self(ffi::SQLITE_OPEN_FULLMUTEX);

    pub const fn bits(self) -> i32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self::READ_WRITE | Self::CREATE
    }
}

impl BitOr for OpenFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OpenFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Configures how a connection is opened.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnectionOptions {
    /// Open flags handed to the engine.
    pub flags: OpenFlags,
    /// How long a statement waits on a locked database before failing
    /// with a busy error. `None` fails immediately.
    pub busy_timeout_ms: Option<u32>,
}

impl ConnectionOptions {
    pub fn with_flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_busy_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.busy_timeout_ms = Some(timeout_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectionOptions, OpenFlags};

    #[test]
    fn default_flags_read_write_create() {
        let flags = OpenFlags::default();
        assert!(flags.contains(OpenFlags::READ_WRITE));
        assert!(flags.contains(OpenFlags::CREATE));
        assert!(!flags.contains(OpenFlags::READ_ONLY));
    }

    #[test]
    fn builder_sets_fields() {
        let opts = ConnectionOptions::default()
            .with_flags(OpenFlags::READ_ONLY)
            .with_busy_timeout_ms(250);
        assert_eq!(opts.flags, OpenFlags::READ_ONLY);
        assert_eq!(opts.busy_timeout_ms, Some(250));
    }
}
