//! Describe the entries of a tar archive as newline-delimited JSON.
//!
//! The archive is never extracted: each entry's header is decoded, normalized into a
//! [`NormalizedRecord`] and written out, and the entry's content is skipped.
//!
//! The pipeline has three stages, each usable on its own:
//!
//! - [`TarDecoder`] reads raw headers from a [`tar::Archive`];
//! - [`stream_headers`] turns any [`RawDecoder`] into a lazy iterator of
//!   `Result<NormalizedRecord>` that ends at the first error;
//! - [`drain`] writes such an iterator to a [`RecordSink`] such as [`JsonLinesSink`],
//!   checking a [`CancellationToken`] before every entry.
//!
//! ```
//! use tar2headers::{drain, read_headers, CancellationToken, JsonLinesSink};
//!
//! let mut data = Vec::new();
//! {
//!     let mut builder = tar::Builder::new(&mut data);
//!     let mut header = tar::Header::new_ustar();
//!     header.set_entry_type(tar::EntryType::Regular);
//!     header.set_size(5);
//!     header.set_mode(0o644);
//!     builder.append_data(&mut header, "dir/.profile", &b"hello"[..]).unwrap();
//!     builder.finish().unwrap();
//! }
//!
//! let mut archive = tar::Archive::new(&data[..]);
//! let mut sink = JsonLinesSink::new(Vec::new());
//! let written = drain(read_headers(&mut archive)?, &mut sink, &CancellationToken::new())?;
//! assert_eq!(written, 1);
//!
//! let output = String::from_utf8(sink.into_inner()?).unwrap();
//! assert!(output.contains(r#""basename":".profile","hidden":true"#));
//! # Ok::<(), tar2headers::Error>(())
//! ```

pub mod error;
pub mod header;
pub mod limits;
pub mod mode;
pub mod registry;
pub mod sink;
pub mod stream;

pub use error::{Error, Result};
pub use header::{normalize, zero_time, NormalizedRecord, RawHeader};
pub use limits::Limits;
pub use mode::FileMode;
pub use registry::{lookup_entry_type, lookup_format, ArchiveFormat, EntryType};
pub use sink::{drain, CancellationToken, JsonLinesSink, RecordSink};
pub use stream::{read_headers, stream_headers, HeaderStream, RawDecoder, TarDecoder};
