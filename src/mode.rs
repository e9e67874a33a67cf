//! Platform-independent file mode bits.
//!
//! The layout keeps the nine permission bits at the bottom and puts the file type and
//! special bits at the top of a `u32`, one bit each, so that the mode of any entry can be
//! rendered without knowing which platform wrote the archive:
//!
//! | Bit | Letter | Meaning          |
//! |-----|--------|------------------|
//! | 31  | `d`    | directory        |
//! | 30  | `a`    | append-only      |
//! | 29  | `l`    | exclusive use    |
//! | 28  | `T`    | temporary        |
//! | 27  | `L`    | symbolic link    |
//! | 26  | `D`    | device           |
//! | 25  | `p`    | named pipe       |
//! | 24  | `S`    | socket           |
//! | 23  | `u`    | setuid           |
//! | 22  | `g`    | setgid           |
//! | 21  | `c`    | character device |
//! | 20  | `t`    | sticky           |
//! | 19  | `?`    | irregular        |

use std::fmt;

use serde::Serialize;

use crate::registry::EntryType;

// Unix mode bits as stored in the tar header's mode field.
const C_ISUID: i64 = 0o4000;
const C_ISGID: i64 = 0o2000;
const C_ISVTX: i64 = 0o1000;
const C_ISDIR: u32 = 0o040000;
const C_ISFIFO: u32 = 0o010000;
const C_ISLNK: u32 = 0o120000;
const C_ISBLK: u32 = 0o060000;
const C_ISCHR: u32 = 0o020000;
const C_ISSOCK: u32 = 0o140000;

const TYPE_LETTERS: &[u8; 13] = b"dalTLDpSugct?";

/// File type and permission bits, independent of the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct FileMode(u32);

impl FileMode {
    pub const DIR: FileMode = FileMode(1 << 31);
    pub const APPEND: FileMode = FileMode(1 << 30);
    pub const EXCLUSIVE: FileMode = FileMode(1 << 29);
    pub const TEMPORARY: FileMode = FileMode(1 << 28);
    pub const SYMLINK: FileMode = FileMode(1 << 27);
    pub const DEVICE: FileMode = FileMode(1 << 26);
    pub const NAMED_PIPE: FileMode = FileMode(1 << 25);
    pub const SOCKET: FileMode = FileMode(1 << 24);
    pub const SETUID: FileMode = FileMode(1 << 23);
    pub const SETGID: FileMode = FileMode(1 << 22);
    pub const CHAR_DEVICE: FileMode = FileMode(1 << 21);
    pub const STICKY: FileMode = FileMode(1 << 20);
    pub const IRREGULAR: FileMode = FileMode(1 << 19);

    pub const PERM: u32 = 0o777;

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        FileMode(bits)
    }

    pub const fn contains(self, other: FileMode) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn perm(self) -> u32 {
        self.0 & Self::PERM
    }

    pub fn is_dir(self) -> bool {
        self.contains(Self::DIR)
    }

    /// Interpret a tar header's `mode` field for an entry of the given type.
    ///
    /// Type bits come both from the Unix `S_IFMT` bits in `mode` and from the entry type,
    /// so a directory entry is a directory even if its mode lacks `S_IFDIR`.
    pub fn from_header(mode: i64, entry_type: EntryType) -> Self {
        let mut bits = (mode as u32) & Self::PERM;

        if mode & C_ISUID != 0 {
            bits |= Self::SETUID.0;
        }
        if mode & C_ISGID != 0 {
            bits |= Self::SETGID.0;
        }
        if mode & C_ISVTX != 0 {
            bits |= Self::STICKY.0;
        }

        bits |= match (mode as u32) & !0o7777 {
            C_ISDIR => Self::DIR.0,
            C_ISFIFO => Self::NAMED_PIPE.0,
            C_ISLNK => Self::SYMLINK.0,
            C_ISBLK => Self::DEVICE.0,
            C_ISCHR => Self::DEVICE.0 | Self::CHAR_DEVICE.0,
            C_ISSOCK => Self::SOCKET.0,
            _ => 0,
        };

        bits |= match entry_type {
            EntryType::SymbolicLink => Self::SYMLINK.0,
            EntryType::CharDevice => Self::DEVICE.0 | Self::CHAR_DEVICE.0,
            EntryType::BlockDevice => Self::DEVICE.0,
            EntryType::Directory => Self::DIR.0,
            EntryType::Fifo => Self::NAMED_PIPE.0,
            _ => 0,
        };

        FileMode(bits)
    }
}

impl std::ops::BitOr for FileMode {
    type Output = FileMode;

    fn bitor(self, rhs: FileMode) -> FileMode {
        FileMode(self.0 | rhs.0)
    }
}

/// Renders as e.g. `drwxr-xr-x` or `-rw-r--r--`.
impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = String::with_capacity(TYPE_LETTERS.len() + 9);

        for (i, &c) in TYPE_LETTERS.iter().enumerate() {
            if self.0 & (1 << (31 - i)) != 0 {
                buf.push(c as char);
            }
        }
        if buf.is_empty() {
            buf.push('-');
        }

        for (i, c) in "rwxrwxrwx".chars().enumerate() {
            if self.0 & (1 << (8 - i)) != 0 {
                buf.push(c);
            } else {
                buf.push('-');
            }
        }

        f.write_str(&buf)
    }
}
