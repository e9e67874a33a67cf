//! Lazy conversion of a tar archive into a stream of normalized records.
//!
//! The archive is read one entry at a time through a [`RawDecoder`]. [`HeaderStream`]
//! pulls from the decoder only when it is itself pulled, normalizes each header and
//! yields a `Result` per entry. The first error ends the stream: it is yielded once and
//! the decoder is never called again.
//!
//! ```no_run
//! use std::io::stdin;
//!
//! use tar2headers::{stream_headers, Limits, TarDecoder};
//!
//! let mut archive = tar::Archive::new(stdin().lock());
//! let decoder = TarDecoder::new(&mut archive, Limits::default()).unwrap();
//! for record in stream_headers(decoder) {
//!     let record = record.unwrap();
//!     println!("{} {}", record.file_mode_label, record.name);
//! }
//! ```

use std::{collections::BTreeMap, io::Read, iter::FusedIterator};

use chrono::{DateTime, Utc};
use log::{debug, trace};
use tar::{Archive, Entries, Entry};

use crate::{
    error::{Error, Result},
    header::{normalize, NormalizedRecord, RawHeader},
    limits::Limits,
    registry::{FormatCode, FORMAT_GNU, FORMAT_PAX, FORMAT_STAR, FORMAT_USTAR, FORMAT_V7},
};

/// Source of raw headers, one archive entry per call.
pub trait RawDecoder {
    /// Decodes the next entry header.
    ///
    /// Returns `Ok(None)` at the end of the archive.
    fn next_header(&mut self) -> Result<Option<RawHeader>>;
}

impl<D: RawDecoder + ?Sized> RawDecoder for &mut D {
    fn next_header(&mut self) -> Result<Option<RawHeader>> {
        (**self).next_header()
    }
}

/// [`RawDecoder`] backed by the `tar` crate.
///
/// GNU long name/link and PAX local headers are folded into the entry that follows them;
/// PAX global headers are reported as entries of their own. Entry contents are skipped,
/// never read.
pub struct TarDecoder<'a, R: 'a + Read> {
    entries: Entries<'a, R>,
    limits: Limits,
}

impl<'a, R: Read> TarDecoder<'a, R> {
    /// Starts decoding `archive`, which must not have been read from yet.
    pub fn new(archive: &'a mut Archive<R>, limits: Limits) -> Result<Self> {
        let entries = archive.entries().map_err(Error::Decode)?;
        Ok(Self { entries, limits })
    }
}

impl<R: Read> RawDecoder for TarDecoder<'_, R> {
    fn next_header(&mut self) -> Result<Option<RawHeader>> {
        match self.entries.next() {
            None => Ok(None),
            Some(Err(err)) => Err(Error::Decode(err)),
            Some(Ok(mut entry)) => decode_entry(&mut entry, &self.limits).map(Some),
        }
    }
}

fn decode_entry<R: Read>(entry: &mut Entry<'_, R>, limits: &Limits) -> Result<RawHeader> {
    // this consumes the PAX data, so it has to come before anything borrows the entry
    let pax_records = read_pax_records(entry, limits)?;

    let header = entry.header();

    // a GNU long name wins over a PAX `path`, which wins over the header field
    let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
    let link_name = entry
        .link_name_bytes()
        .map(|l| String::from_utf8_lossy(&l).into_owned())
        .unwrap_or_default();
    check_len("name", name.len(), limits.max_path_len)?;
    check_len("link name", link_name.len(), limits.max_path_len)?;

    let mut type_flag = header.as_old().linkflag[0];
    if type_flag == 0 {
        // pre-POSIX archives mark both regular files and directories with NUL
        type_flag = if name.ends_with('/') { b'5' } else { b'0' };
    }

    let format = guess_format(header, pax_records.is_some());

    if type_flag == b'g' {
        // a global header describes the entries after it, not a file of its own
        return Ok(RawHeader {
            type_flag,
            name,
            pax_records,
            format,
            ..Default::default()
        });
    }

    let old = header.as_old();
    let mode = numeric(&old.mode, || header.mode())?;
    let uid = numeric(&old.uid, || header.uid())?;
    let gid = numeric(&old.gid, || header.gid())?;
    let mtime = numeric(&old.mtime, || header.mtime())?;

    let mut raw = RawHeader {
        type_flag,
        size: to_i64("size", entry.size())?,
        mode: mode.into(),
        uid: to_i64("uid", uid)?,
        gid: to_i64("gid", gid)?,
        uname: lossy(header.username_bytes()),
        gname: lossy(header.groupname_bytes()),
        mod_time: Some(unix_time(to_i64("mtime", mtime)?, 0)?),
        format,
        name,
        link_name,
        ..Default::default()
    };

    if let Some(gnu) = header.as_gnu() {
        if gnu.atime[0] != 0 {
            let secs = to_i64("atime", gnu.atime().map_err(Error::Decode)?)?;
            raw.access_time = Some(unix_time(secs, 0)?);
        }
        if gnu.ctime[0] != 0 {
            let secs = to_i64("ctime", gnu.ctime().map_err(Error::Decode)?)?;
            raw.change_time = Some(unix_time(secs, 0)?);
        }
    }

    if matches!(type_flag, b'3' | b'4') {
        if let Some((major, minor)) = device_fields(header) {
            raw.dev_major = numeric(major, || header.device_major())?.unwrap_or(0).into();
            raw.dev_minor = numeric(minor, || header.device_minor())?.unwrap_or(0).into();
        }
    }

    if let Some(records) = &pax_records {
        apply_pax_overrides(&mut raw, records)?;
    }
    raw.pax_records = pax_records;

    Ok(raw)
}

/// Reads a numeric header field, taking a field of only NULs and spaces as zero.
///
/// Writers commonly leave fields they have no value for blank, which the `tar` accessors
/// reject.
fn numeric<T: Default>(field: &[u8], parse: impl FnOnce() -> std::io::Result<T>) -> Result<T> {
    if field.iter().all(|&b| b == 0 || b == b' ') {
        return Ok(T::default());
    }
    parse().map_err(Error::Decode)
}

/// The raw device number fields, for headers that have them.
fn device_fields(header: &tar::Header) -> Option<(&[u8], &[u8])> {
    if let Some(gnu) = header.as_gnu() {
        Some((&gnu.dev_major[..], &gnu.dev_minor[..]))
    } else {
        header
            .as_ustar()
            .map(|ustar| (&ustar.dev_major[..], &ustar.dev_minor[..]))
    }
}

fn read_pax_records<R: Read>(
    entry: &mut Entry<'_, R>,
    limits: &Limits,
) -> Result<Option<BTreeMap<String, String>>> {
    let Some(extensions) = entry.pax_extensions().map_err(Error::Decode)? else {
        return Ok(None);
    };

    let mut records = BTreeMap::new();
    for extension in extensions {
        let extension = extension.map_err(Error::Decode)?;
        records.insert(
            String::from_utf8_lossy(extension.key_bytes()).into_owned(),
            String::from_utf8_lossy(extension.value_bytes()).into_owned(),
        );
        check_len("PAX record count", records.len(), limits.max_pax_records)?;
    }
    Ok(Some(records))
}

/// PAX values take precedence over the fixed header fields they replace.
fn apply_pax_overrides(raw: &mut RawHeader, records: &BTreeMap<String, String>) -> Result<()> {
    for (key, value) in records {
        match key.as_str() {
            "uid" => raw.uid = parse_pax_int(key, value)?,
            "gid" => raw.gid = parse_pax_int(key, value)?,
            "size" => raw.size = parse_pax_int(key, value)?,
            "uname" => raw.uname = value.clone(),
            "gname" => raw.gname = value.clone(),
            "mtime" => raw.mod_time = Some(parse_pax_time(key, value)?),
            "atime" => raw.access_time = Some(parse_pax_time(key, value)?),
            "ctime" => raw.change_time = Some(parse_pax_time(key, value)?),
            _ => {}
        }
    }
    Ok(())
}

fn parse_pax_int(key: &str, value: &str) -> Result<i64> {
    value
        .parse()
        .map_err(|_| Error::InvalidHeader(format!("invalid PAX {key}: {value:?}")))
}

/// Parses a PAX timestamp such as `1350244992.023960108` or `-1.5`.
fn parse_pax_time(key: &str, value: &str) -> Result<DateTime<Utc>> {
    let invalid = || Error::InvalidHeader(format!("invalid PAX {key}: {value:?}"));

    let (secs, frac) = value.split_once('.').unwrap_or((value, ""));
    let secs: i64 = secs.parse().map_err(|_| invalid())?;
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    // anything beyond nanosecond precision is truncated
    let mut nanos: u32 = 0;
    for i in 0..9 {
        let digit = frac.as_bytes().get(i).map_or(0, |b| b - b'0');
        nanos = nanos * 10 + u32::from(digit);
    }

    if value.starts_with('-') && nanos != 0 {
        let secs = secs.checked_sub(1).ok_or_else(invalid)?;
        unix_time(secs, 1_000_000_000 - nanos)
    } else {
        unix_time(secs, nanos)
    }
}

fn unix_time(secs: i64, nanos: u32) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| Error::InvalidHeader(format!("timestamp out of range: {secs}")))
}

fn to_i64(field: &str, value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::InvalidHeader(format!("{field} out of range: {value}")))
}

fn lossy(bytes: Option<&[u8]>) -> String {
    bytes
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_default()
}

fn check_len(what: &'static str, len: usize, limit: usize) -> Result<()> {
    if len > limit {
        return Err(Error::LimitExceeded { what, len, limit });
    }
    Ok(())
}

/// Narrows down which tar dialect an entry was written in.
///
/// A UStar header alone can't be told apart from PAX, so both bits stay set until a PAX
/// header shows up; an entry that is still ambiguous at the end is reported as UStar.
fn guess_format(header: &tar::Header, has_pax: bool) -> FormatCode {
    let detected = if header.as_gnu().is_some() {
        FORMAT_GNU
    } else if header.as_ustar().is_some() {
        if &header.as_bytes()[508..512] == b"tar\0" {
            FORMAT_STAR
        } else {
            FORMAT_USTAR | FORMAT_PAX
        }
    } else {
        FORMAT_V7
    };

    let mut format = (FORMAT_USTAR | FORMAT_PAX | FORMAT_GNU) & detected;
    if has_pax {
        format &= FORMAT_PAX;
    }
    if format == FORMAT_USTAR | FORMAT_PAX {
        format = FORMAT_USTAR;
    }
    format
}

/// Lazy sequence of normalized records, one per archive entry.
///
/// Yields `Err` at most once, after which it is exhausted. Dropping the stream early
/// leaves the rest of the archive undecoded.
pub struct HeaderStream<D> {
    decoder: D,
    index: usize,
    done: bool,
}

impl<D: RawDecoder> HeaderStream<D> {
    /// Number of entries decoded so far, including a failed one.
    pub fn decoded(&self) -> usize {
        self.index
    }
}

impl<D: RawDecoder> Iterator for HeaderStream<D> {
    type Item = Result<NormalizedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let item = match self.decoder.next_header() {
            Ok(None) => {
                debug!("end of archive after {} entries", self.index);
                self.done = true;
                return None;
            }
            Ok(Some(raw)) => normalize(&raw),
            Err(err) => Err(err),
        };

        self.index += 1;
        match &item {
            Ok(record) => trace!("entry {}: {:?} {}", self.index, record.entry_type, record.name),
            Err(err) => {
                debug!("stopping at entry {}: {err}", self.index);
                self.done = true;
            }
        }
        Some(item)
    }
}

impl<D: RawDecoder> FusedIterator for HeaderStream<D> {}

/// Wraps `decoder` into a lazy [`HeaderStream`].
pub fn stream_headers<D: RawDecoder>(decoder: D) -> HeaderStream<D> {
    HeaderStream {
        decoder,
        index: 0,
        done: false,
    }
}

/// Convenience wrapper around [`TarDecoder::new`] and [`stream_headers`] with default
/// [`Limits`].
pub fn read_headers<R: Read>(archive: &mut Archive<R>) -> Result<HeaderStream<TarDecoder<'_, R>>> {
    Ok(stream_headers(TarDecoder::new(archive, Limits::default())?))
}
