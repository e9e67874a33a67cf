//! Raw and normalized entry headers.
//!
//! A [`RawHeader`] is what the archive decoder hands over for each entry: the header
//! fields with GNU and PAX extensions already applied, but with the type and format still
//! in their raw, format-native encoding. [`normalize`] turns it into a
//! [`NormalizedRecord`], resolving the codes through the [registry](crate::registry) and
//! computing the derived fields.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::{Error, Result},
    mode::FileMode,
    registry::{lookup_entry_type, lookup_format, ArchiveFormat, EntryType, FormatCode},
};

/// Entry metadata as decoded from the archive, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawHeader {
    /// Raw typeflag byte.
    pub type_flag: u8,
    pub name: String,
    /// Empty unless the entry is a link.
    pub link_name: String,
    pub size: i64,
    pub mode: i64,
    pub uid: i64,
    pub gid: i64,
    pub uname: String,
    pub gname: String,
    pub mod_time: Option<DateTime<Utc>>,
    pub access_time: Option<DateTime<Utc>>,
    pub change_time: Option<DateTime<Utc>>,
    pub dev_major: i64,
    pub dev_minor: i64,
    /// PAX records attached to this entry, if it had a PAX header at all.
    pub pax_records: Option<BTreeMap<String, String>>,
    /// Format bits as guessed by the decoder.
    pub format: FormatCode,
}

/// The normalized, serializable description of one archive entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    #[serde(rename = "type_flag")]
    pub entry_type: EntryType,
    #[serde(rename = "type_string")]
    pub type_label: &'static str,

    pub name: String,
    pub link_name: String,
    #[serde(rename = "basename")]
    pub base_name: String,
    pub hidden: bool,

    pub size: i64,
    pub mode: i64,
    pub uid: i64,
    pub gid: i64,
    pub uname: String,
    pub gname: String,

    pub file_mode: FileMode,
    #[serde(rename = "file_mode_string")]
    pub file_mode_label: String,

    /// [`zero_time`] when the archive does not record it, as are the other two times.
    pub mod_time: DateTime<Utc>,
    pub access_time: DateTime<Utc>,
    pub change_time: DateTime<Utc>,

    pub dev_major: i64,
    pub dev_minor: i64,

    pub pax_records: BTreeMap<String, String>,

    pub format: ArchiveFormat,
}

/// Seconds from the Unix epoch back to 0001-01-01T00:00:00Z.
const ZERO_TIME_SECS: i64 = -62_135_596_800;

/// The timestamp reported for times an entry does not record, `0001-01-01T00:00:00Z`.
pub fn zero_time() -> DateTime<Utc> {
    DateTime::from_timestamp(ZERO_TIME_SECS, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Returns the last element of a `/`-separated path.
///
/// Trailing slashes are ignored, a path made only of slashes yields `/` and an empty path
/// yields an empty string.
pub fn base_name(name: &str) -> &str {
    if name.is_empty() {
        return "";
    }
    let trimmed = name.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Converts a decoded header into a [`NormalizedRecord`].
///
/// Fails with [`Error::UnknownEntryType`] if the type code is not in the registry; no
/// other field can cause a failure.
pub fn normalize(raw: &RawHeader) -> Result<NormalizedRecord> {
    let entry_type =
        lookup_entry_type(raw.type_flag).ok_or(Error::UnknownEntryType(raw.type_flag))?;

    let file_mode = FileMode::from_header(raw.mode, entry_type);
    let base_name = base_name(&raw.name).to_owned();
    let hidden = base_name.starts_with('.');

    Ok(NormalizedRecord {
        entry_type,
        type_label: entry_type.label(),
        name: raw.name.clone(),
        link_name: raw.link_name.clone(),
        base_name,
        hidden,
        size: raw.size,
        mode: raw.mode,
        uid: raw.uid,
        gid: raw.gid,
        uname: raw.uname.clone(),
        gname: raw.gname.clone(),
        file_mode,
        file_mode_label: file_mode.to_string(),
        mod_time: raw.mod_time.unwrap_or_else(zero_time),
        access_time: raw.access_time.unwrap_or_else(zero_time),
        change_time: raw.change_time.unwrap_or_else(zero_time),
        dev_major: raw.dev_major,
        dev_minor: raw.dev_minor,
        pax_records: raw.pax_records.clone().unwrap_or_default(),
        format: lookup_format(raw.format),
    })
}
