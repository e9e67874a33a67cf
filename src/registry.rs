//! Closed mappings from raw tar codes to entry types and archive formats.

use std::fmt;

use serde::Serialize;

/// The kind of object an archive entry describes.
///
/// Each variant corresponds to exactly one raw type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u8")]
pub enum EntryType {
    RegularFile,
    HardLink,
    SymbolicLink,
    CharDevice,
    BlockDevice,
    Directory,
    Fifo,
    /// Contiguous file; reserved by POSIX.
    Reserved,
    PaxNonGlobalRecord,
    PaxGlobalRecord,
    SparseFile,
    LongName,
    LongLink,
}

impl EntryType {
    pub const ALL: [EntryType; 13] = [
        EntryType::RegularFile,
        EntryType::HardLink,
        EntryType::SymbolicLink,
        EntryType::CharDevice,
        EntryType::BlockDevice,
        EntryType::Directory,
        EntryType::Fifo,
        EntryType::Reserved,
        EntryType::PaxNonGlobalRecord,
        EntryType::PaxGlobalRecord,
        EntryType::SparseFile,
        EntryType::LongName,
        EntryType::LongLink,
    ];

    /// The raw type code stored in the header's typeflag field.
    pub const fn code(self) -> u8 {
        match self {
            EntryType::RegularFile => b'0',
            EntryType::HardLink => b'1',
            EntryType::SymbolicLink => b'2',
            EntryType::CharDevice => b'3',
            EntryType::BlockDevice => b'4',
            EntryType::Directory => b'5',
            EntryType::Fifo => b'6',
            EntryType::Reserved => b'7',
            EntryType::PaxNonGlobalRecord => b'x',
            EntryType::PaxGlobalRecord => b'g',
            EntryType::SparseFile => b'S',
            EntryType::LongName => b'L',
            EntryType::LongLink => b'K',
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            EntryType::RegularFile => "Regular File",
            EntryType::HardLink => "Hard Link",
            EntryType::SymbolicLink => "Symbolic Link",
            EntryType::CharDevice => "Character Device",
            EntryType::BlockDevice => "Block Device",
            EntryType::Directory => "Directory",
            EntryType::Fifo => "FIFO",
            EntryType::Reserved => "(reserved)",
            EntryType::PaxNonGlobalRecord => "Non-global Key/Val records(PAX)",
            EntryType::PaxGlobalRecord => "Global Key/Val records(PAX)",
            EntryType::SparseFile => "Sparse File",
            EntryType::LongName => "Long Path",
            EntryType::LongLink => "Long Link Name",
        }
    }

    pub fn is_device(self) -> bool {
        matches!(self, EntryType::CharDevice | EntryType::BlockDevice)
    }
}

impl From<EntryType> for u8 {
    fn from(entry_type: EntryType) -> u8 {
        entry_type.code()
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Look up the entry type for a raw type code.
///
/// Returns `None` for codes outside the closed set; callers must treat that as an error.
pub fn lookup_entry_type(code: u8) -> Option<EntryType> {
    let entry_type = match code {
        b'0' => EntryType::RegularFile,
        b'1' => EntryType::HardLink,
        b'2' => EntryType::SymbolicLink,
        b'3' => EntryType::CharDevice,
        b'4' => EntryType::BlockDevice,
        b'5' => EntryType::Directory,
        b'6' => EntryType::Fifo,
        b'7' => EntryType::Reserved,
        b'x' => EntryType::PaxNonGlobalRecord,
        b'g' => EntryType::PaxGlobalRecord,
        b'S' => EntryType::SparseFile,
        b'L' => EntryType::LongName,
        b'K' => EntryType::LongLink,
        _ => return None,
    };
    Some(entry_type)
}

/// Raw format bits as reported by the decoder.
///
/// While the decoder cannot tell formats apart several bits may be set at once; only a
/// single USTAR, PAX or GNU bit maps to a known [`ArchiveFormat`].
pub type FormatCode = u8;

pub const FORMAT_V7: FormatCode = 1 << 1;
pub const FORMAT_USTAR: FormatCode = 1 << 2;
pub const FORMAT_PAX: FormatCode = 1 << 3;
pub const FORMAT_GNU: FormatCode = 1 << 4;
pub const FORMAT_STAR: FormatCode = 1 << 5;

/// The tar dialect an entry was written in.
///
/// Serializes as its format bit, the same encoding as [`FormatCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "u8")]
pub enum ArchiveFormat {
    #[default]
    Unknown,
    Ustar,
    Pax,
    Gnu,
}

impl ArchiveFormat {
    pub const fn label(self) -> &'static str {
        match self {
            ArchiveFormat::Unknown => "Unknown",
            ArchiveFormat::Ustar => "USTAR",
            ArchiveFormat::Pax => "PAX",
            ArchiveFormat::Gnu => "GNU",
        }
    }

    /// The format bit; `0` for `Unknown`.
    pub const fn code(self) -> FormatCode {
        match self {
            ArchiveFormat::Unknown => 0,
            ArchiveFormat::Ustar => FORMAT_USTAR,
            ArchiveFormat::Pax => FORMAT_PAX,
            ArchiveFormat::Gnu => FORMAT_GNU,
        }
    }
}

impl From<ArchiveFormat> for u8 {
    fn from(format: ArchiveFormat) -> u8 {
        format.code()
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map raw format bits to an [`ArchiveFormat`]; anything unrecognized is `Unknown`.
pub fn lookup_format(code: FormatCode) -> ArchiveFormat {
    match code {
        FORMAT_USTAR => ArchiveFormat::Ustar,
        FORMAT_PAX => ArchiveFormat::Pax,
        FORMAT_GNU => ArchiveFormat::Gnu,
        _ => ArchiveFormat::Unknown,
    }
}
