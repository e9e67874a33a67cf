//! Writing record streams to an output, with cooperative cancellation.

use std::{
    io::{BufWriter, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use log::debug;

use crate::{
    error::{Error, Result},
    header::NormalizedRecord,
};

/// A cancellation flag shared between the caller and a running [`drain`].
///
/// Clones share the same flag. Cancellation is only observed between entries.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Destination for normalized records.
pub trait RecordSink {
    /// Encodes and writes one record.
    fn write_record(&mut self, record: &NormalizedRecord) -> Result<()>;

    /// Flushes anything buffered. Called once, after the last record.
    fn finish(&mut self) -> Result<()>;
}

/// Writes each record as one line of JSON.
pub struct JsonLinesSink<W: Write> {
    writer: BufWriter<W>,
    line: Vec<u8>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            line: Vec::new(),
        }
    }

    /// Returns the underlying writer, flushing it first.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| Error::Write(err.into_error()))
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn write_record(&mut self, record: &NormalizedRecord) -> Result<()> {
        // encode the whole line first so a failed record never leaves a partial line behind
        self.line.clear();
        serde_json::to_writer(&mut self.line, record).map_err(Error::Serialize)?;
        self.line.push(b'\n');
        self.writer.write_all(&self.line).map_err(Error::Write)
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::Write)
    }
}

/// Writes every record of `records` to `sink`, in order.
///
/// The token is checked before each element is pulled, so after cancellation no further
/// entry is decoded. The first error (from the stream, the sink, or cancellation) stops
/// the run and is returned; records written before it stay written. On success the sink
/// is finished and the number of records is returned.
pub fn drain<I, S>(records: I, sink: &mut S, cancel: &CancellationToken) -> Result<usize>
where
    I: IntoIterator<Item = Result<NormalizedRecord>>,
    S: RecordSink + ?Sized,
{
    let mut records = records.into_iter();
    let mut written = 0;

    loop {
        if cancel.is_cancelled() {
            debug!("cancelled after {written} records");
            return Err(Error::Cancelled);
        }

        let Some(record) = records.next() else {
            break;
        };

        sink.write_record(&record?)?;
        written += 1;
    }

    sink.finish()?;
    debug!("wrote {written} records");
    Ok(written)
}
