use std::io::Cursor;

use serde_json::Value;
use similar_asserts::assert_eq;

use tar2headers::{
    drain, read_headers, stream_headers, ArchiveFormat, CancellationToken, EntryType, Error,
    JsonLinesSink, Limits, NormalizedRecord, RecordSink, TarDecoder,
};

fn create_tar_with<F>(f: F) -> Vec<u8>
where
    F: FnOnce(&mut tar::Builder<&mut Vec<u8>>),
{
    let mut data = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut data);
        f(&mut builder);
        builder.finish().unwrap();
    }
    data
}

fn append(
    builder: &mut tar::Builder<&mut Vec<u8>>,
    entry_type: tar::EntryType,
    path: &str,
    content: &[u8],
) {
    let mut header = tar::Header::new_ustar();
    header.set_mode(0o644);
    header.set_uid(1000);
    header.set_gid(1000);
    header.set_username("user").unwrap();
    header.set_groupname("group").unwrap();
    header.set_mtime(1700000000);
    header.set_size(content.len() as u64);
    header.set_entry_type(entry_type);
    builder.append_data(&mut header, path, content).unwrap();
}

fn lines(output: &[u8]) -> Vec<Value> {
    output
        .split(|&b| b == b'\n')
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_slice(line).unwrap())
        .collect()
}

fn run(data: Vec<u8>, token: &CancellationToken) -> (Vec<Value>, tar2headers::Result<usize>) {
    let mut archive = tar::Archive::new(Cursor::new(data));
    let mut sink = JsonLinesSink::new(Vec::new());
    let result = drain(read_headers(&mut archive).unwrap(), &mut sink, token);
    (lines(&sink.into_inner().unwrap()), result)
}

#[test]
fn test_hidden_regular_file() {
    let data = create_tar_with(|b| append(b, tar::EntryType::Regular, "sub/.hidden", &[7; 42]));

    let (records, result) = run(data, &CancellationToken::new());
    assert_eq!(result.unwrap(), 1);
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record["type_flag"], Value::from(b'0'));
    assert_eq!(record["type_string"], Value::from("Regular File"));
    assert_eq!(record["name"], Value::from("sub/.hidden"));
    assert_eq!(record["link_name"], Value::from(""));
    assert_eq!(record["basename"], Value::from(".hidden"));
    assert_eq!(record["hidden"], Value::from(true));
    assert_eq!(record["size"], Value::from(42));
    assert_eq!(record["mode"], Value::from(0o644));
    assert_eq!(record["uid"], Value::from(1000));
    assert_eq!(record["uname"], Value::from("user"));
    assert_eq!(record["gname"], Value::from("group"));
    assert_eq!(record["file_mode"], Value::from(0o644));
    assert_eq!(record["file_mode_string"], Value::from("-rw-r--r--"));
    assert_eq!(record["mod_time"], Value::from("2023-11-14T22:13:20Z"));
    assert_eq!(record["access_time"], Value::from("0001-01-01T00:00:00Z"));
    assert_eq!(record["change_time"], Value::from("0001-01-01T00:00:00Z"));
    assert_eq!(record["dev_major"], Value::from(0));
    assert_eq!(record["pax_records"], serde_json::json!({}));
    assert_eq!(record["format"], Value::from(4));
}

#[test]
fn test_entries_in_archive_order() {
    let data = create_tar_with(|b| {
        append(b, tar::EntryType::Directory, "etc/", b"");
        append(b, tar::EntryType::Regular, "etc/hosts", b"127.0.0.1 localhost\n");
        append(b, tar::EntryType::Fifo, "etc/pipe", b"");
        append(b, tar::EntryType::Regular, "etc/.secret", b"s");

        let mut header = tar::Header::new_ustar();
        header.set_mode(0o777);
        header.set_size(0);
        header.set_entry_type(tar::EntryType::Symlink);
        b.append_link(&mut header, "etc/localtime", "/usr/share/zoneinfo/UTC").unwrap();
    });

    let (records, result) = run(data, &CancellationToken::new());
    assert_eq!(result.unwrap(), 5);

    let summary: Vec<(String, String, bool)> = records
        .iter()
        .map(|r| {
            (
                r["type_string"].as_str().unwrap().to_owned(),
                r["basename"].as_str().unwrap().to_owned(),
                r["hidden"].as_bool().unwrap(),
            )
        })
        .collect();
    let expected: Vec<(String, String, bool)> = [
        ("Directory", "etc", false),
        ("Regular File", "hosts", false),
        ("FIFO", "pipe", false),
        ("Regular File", ".secret", true),
        ("Symbolic Link", "localtime", false),
    ]
    .into_iter()
    .map(|(t, n, h)| (t.to_owned(), n.to_owned(), h))
    .collect();
    assert_eq!(summary, expected);

    assert_eq!(records[0]["file_mode_string"], Value::from("drw-r--r--"));
    assert_eq!(records[2]["file_mode_string"], Value::from("prw-r--r--"));
    assert_eq!(records[4]["link_name"], Value::from("/usr/share/zoneinfo/UTC"));
}

#[test]
fn test_unknown_type_emits_nothing() {
    let data = create_tar_with(|b| {
        append(b, tar::EntryType::new(b'Z'), "weird", b"");
        append(b, tar::EntryType::Regular, "ok", b"");
    });

    let (records, result) = run(data, &CancellationToken::new());
    assert!(records.is_empty());
    assert!(matches!(result, Err(Error::UnknownEntryType(b'Z'))));
}

#[test]
fn test_malformed_entry_stops_the_run() {
    let data = create_tar_with(|b| {
        append(b, tar::EntryType::Regular, "one", b"1");
        append(b, tar::EntryType::Regular, "two", b"2");
        b.append_pax_extensions([("gid", b"-".as_slice())]).unwrap();
        append(b, tar::EntryType::Regular, "three", b"3");
        append(b, tar::EntryType::Regular, "four", b"4");
    });

    let (records, result) = run(data, &CancellationToken::new());
    let names: Vec<&str> = records.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["one", "two"]);
    assert!(result.unwrap_err().is_decode());
}

#[test]
fn test_pax_entry() {
    let data = create_tar_with(|b| {
        b.append_pax_extensions([
            ("path", b"renamed/by/pax.txt".as_slice()),
            ("SCHILY.xattr.user.key", b"value".as_slice()),
        ])
        .unwrap();
        append(b, tar::EntryType::Regular, "short", b"data");
    });

    let (records, result) = run(data, &CancellationToken::new());
    assert_eq!(result.unwrap(), 1);
    let record = &records[0];
    assert_eq!(record["name"], Value::from("renamed/by/pax.txt"));
    assert_eq!(record["basename"], Value::from("pax.txt"));
    assert_eq!(record["format"], Value::from(8));
    assert_eq!(
        record["pax_records"],
        serde_json::json!({
            "SCHILY.xattr.user.key": "value",
            "path": "renamed/by/pax.txt",
        })
    );
}

#[test]
fn test_global_pax_header_is_an_entry() {
    let data = create_tar_with(|b| {
        let body = b"17 comment=hello\n";
        let mut header = tar::Header::new_ustar();
        header.set_mode(0o644);
        header.set_uid(7);
        header.set_size(body.len() as u64);
        header.set_entry_type(tar::EntryType::XGlobalHeader);
        b.append_data(&mut header, "pax_global_header", body.as_slice()).unwrap();
        append(b, tar::EntryType::Regular, "file", b"");
    });

    let mut archive = tar::Archive::new(Cursor::new(data));
    let records: Vec<NormalizedRecord> = read_headers(&mut archive)
        .unwrap()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].entry_type, EntryType::PaxGlobalRecord);
    assert_eq!(records[0].format, ArchiveFormat::Pax);
    assert_eq!((records[0].size, records[0].mode, records[0].uid), (0, 0, 0));
    assert_eq!(records[0].file_mode_label, "----------");
    assert_eq!(
        records[0].pax_records.get("comment").map(String::as_str),
        Some("hello")
    );
    assert_eq!(records[1].entry_type, EntryType::RegularFile);
    assert_eq!(records[1].format, ArchiveFormat::Ustar);
    assert!(records[1].pax_records.is_empty());
}

#[test]
fn test_cancel_before_start() {
    let data = create_tar_with(|b| append(b, tar::EntryType::Regular, "file", b""));

    let token = CancellationToken::new();
    token.cancel();
    let (records, result) = run(data, &token);
    assert!(records.is_empty());
    assert!(matches!(result, Err(Error::Cancelled)));
}

/// Cancels the run once `limit` records have been written.
struct StopAfter<'a> {
    inner: JsonLinesSink<Vec<u8>>,
    limit: usize,
    token: &'a CancellationToken,
    written: usize,
}

impl RecordSink for StopAfter<'_> {
    fn write_record(&mut self, record: &NormalizedRecord) -> tar2headers::Result<()> {
        self.inner.write_record(record)?;
        self.written += 1;
        if self.written == self.limit {
            self.token.cancel();
        }
        Ok(())
    }

    fn finish(&mut self) -> tar2headers::Result<()> {
        self.inner.finish()
    }
}

#[test]
fn test_cancel_midway_leaves_rest_undecoded() {
    let data = create_tar_with(|b| {
        for i in 0..5 {
            append(b, tar::EntryType::Regular, &format!("file{i}"), b"");
        }
    });

    let token = CancellationToken::new();
    let mut archive = tar::Archive::new(Cursor::new(data));
    let mut stream = stream_headers(TarDecoder::new(&mut archive, Limits::default()).unwrap());
    let mut sink = StopAfter {
        inner: JsonLinesSink::new(Vec::new()),
        limit: 2,
        token: &token,
        written: 0,
    };

    let result = drain(stream.by_ref(), &mut sink, &token);
    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(stream.decoded(), 2);

    let records = lines(&sink.inner.into_inner().unwrap());
    let names: Vec<&str> = records.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["file0", "file1"]);
}

#[test]
fn test_output_is_deterministic() {
    let data = create_tar_with(|b| {
        b.append_pax_extensions([("z", b"1".as_slice()), ("a", b"2".as_slice())]).unwrap();
        append(b, tar::EntryType::Regular, "x", b"");
    });

    let render = |data: Vec<u8>| {
        let mut archive = tar::Archive::new(Cursor::new(data));
        let mut sink = JsonLinesSink::new(Vec::new());
        drain(read_headers(&mut archive).unwrap(), &mut sink, &CancellationToken::new()).unwrap();
        sink.into_inner().unwrap()
    };
    assert_eq!(render(data.clone()), render(data));
}
