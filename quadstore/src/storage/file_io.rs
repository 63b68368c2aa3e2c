/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Binary snapshot of the committed store.
//!
//! Layout: the magic bytes `BMSF`, one version byte, then a gzip stream of
//! tagged records closed by an end-of-file tag. Strings are a big-endian
//! `u32` byte length followed by UTF-8 (version 1 used a `u16` length).

use super::namespace_store::NamespaceStore;
use crate::error::{Result, StoreError};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, warn};
use shared::quad::Statement;
use shared::terms::{Literal, Term};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const MAGIC: &[u8; 4] = b"BMSF";
pub const CURRENT_VERSION: u8 = 2;

pub const DATA_FILE_NAME: &str = "memorystore.data";
pub const SYNC_FILE_NAME: &str = "memorystore.sync";

const NAMESPACE_MARKER: u8 = 1;
const EXPL_TRIPLE_MARKER: u8 = 2;
const EXPL_QUAD_MARKER: u8 = 3;
const INF_TRIPLE_MARKER: u8 = 4;
const INF_QUAD_MARKER: u8 = 5;
const URI_MARKER: u8 = 6;
const BNODE_MARKER: u8 = 7;
const PLAIN_LITERAL_MARKER: u8 = 8;
const LANG_LITERAL_MARKER: u8 = 9;
const DATATYPE_LITERAL_MARKER: u8 = 10;
const EOF_MARKER: u8 = 127;

/// Contents of a snapshot file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub version: u8,
    pub namespaces: Vec<(String, String)>,
    pub statements: Vec<Statement>,
}

/// Reads and writes the snapshot files of one data directory.
#[derive(Debug, Clone)]
pub struct FileIo {
    data_file: PathBuf,
    sync_file: PathBuf,
}

impl FileIo {
    pub fn new(data_dir: &Path) -> Self {
        FileIo {
            data_file: data_dir.join(DATA_FILE_NAME),
            sync_file: data_dir.join(SYNC_FILE_NAME),
        }
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    pub fn exists(&self) -> bool {
        self.data_file.exists()
    }

    /// Loads the data file. An empty file yields `Ok(None)`.
    pub fn read(&self) -> Result<Option<Snapshot>> {
        let file = File::open(&self.data_file)?;
        if file.metadata()?.len() == 0 {
            warn!(
                "Ignoring empty data file {}",
                self.data_file.display()
            );
            return Ok(None);
        }
        let snapshot = read_snapshot(BufReader::new(file))?;
        debug!(
            "Read {} namespaces and {} statements from {}",
            snapshot.namespaces.len(),
            snapshot.statements.len(),
            self.data_file.display()
        );
        Ok(Some(snapshot))
    }

    /// Writes a new snapshot to the sync file and moves it over the data file.
    pub fn write(
        &self,
        namespaces: &NamespaceStore,
        statements: impl Iterator<Item = Statement>,
    ) -> Result<()> {
        if let Some(dir) = self.data_file.parent() {
            fs::create_dir_all(dir)?;
        }
        {
            let file = File::create(&self.sync_file)?;
            let mut out = BufWriter::new(file);
            write_snapshot(&mut out, namespaces, statements)?;
            let file = out.into_inner().map_err(|e| StoreError::Io(e.into_error()))?;
            file.sync_all()?;
        }

        if fs::rename(&self.sync_file, &self.data_file).is_err() {
            // Some platforms refuse to rename over an existing file
            if self.data_file.exists() {
                fs::remove_file(&self.data_file)?;
            }
            fs::rename(&self.sync_file, &self.data_file)?;
        }
        debug!("Wrote snapshot to {}", self.data_file.display());
        Ok(())
    }
}

pub fn write_snapshot<W: Write>(
    out: &mut W,
    namespaces: &NamespaceStore,
    statements: impl Iterator<Item = Statement>,
) -> Result<()> {
    out.write_all(MAGIC)?;
    out.write_all(&[CURRENT_VERSION])?;

    let mut gz = GzEncoder::new(out, Compression::default());
    for (prefix, name) in namespaces.iter() {
        gz.write_all(&[NAMESPACE_MARKER])?;
        write_string(&mut gz, prefix)?;
        write_string(&mut gz, name)?;
    }
    for st in statements {
        let marker = match (st.explicit, st.context.is_some()) {
            (true, false) => EXPL_TRIPLE_MARKER,
            (true, true) => EXPL_QUAD_MARKER,
            (false, false) => INF_TRIPLE_MARKER,
            (false, true) => INF_QUAD_MARKER,
        };
        gz.write_all(&[marker])?;
        write_value(&mut gz, &st.subject)?;
        write_value(&mut gz, &st.predicate)?;
        write_value(&mut gz, &st.object)?;
        if let Some(ctx) = &st.context {
            write_value(&mut gz, ctx)?;
        }
    }
    gz.write_all(&[EOF_MARKER])?;
    gz.finish()?.flush()?;
    Ok(())
}

fn write_string<W: Write>(out: &mut W, s: &str) -> io::Result<()> {
    out.write_all(&(s.len() as u32).to_be_bytes())?;
    out.write_all(s.as_bytes())
}

fn write_value<W: Write>(out: &mut W, term: &Term) -> io::Result<()> {
    match term {
        Term::Iri(iri) => {
            out.write_all(&[URI_MARKER])?;
            write_string(out, iri)
        }
        Term::BlankNode(id) => {
            out.write_all(&[BNODE_MARKER])?;
            write_string(out, id)
        }
        // A datatype wins over a language tag
        Term::Literal(Literal {
            label,
            datatype: Some(dt),
            ..
        }) => {
            out.write_all(&[DATATYPE_LITERAL_MARKER])?;
            write_string(out, label)?;
            out.write_all(&[URI_MARKER])?;
            write_string(out, dt)
        }
        Term::Literal(Literal {
            label,
            language: Some(lang),
            ..
        }) => {
            out.write_all(&[LANG_LITERAL_MARKER])?;
            write_string(out, label)?;
            write_string(out, lang)
        }
        Term::Literal(lit) => {
            out.write_all(&[PLAIN_LITERAL_MARKER])?;
            write_string(out, &lit.label)
        }
    }
}

pub fn read_snapshot<R: Read>(mut input: R) -> Result<Snapshot> {
    let mut magic = [0u8; 4];
    input
        .read_exact(&mut magic)
        .map_err(|_| StoreError::CorruptSnapshot("missing file header".to_string()))?;
    if &magic != MAGIC {
        return Err(StoreError::CorruptSnapshot(
            "file does not contain a snapshot".to_string(),
        ));
    }

    let mut version = [0u8; 1];
    input
        .read_exact(&mut version)
        .map_err(|_| StoreError::CorruptSnapshot("missing format version".to_string()))?;
    let version = version[0];
    if version == 0 || version > CURRENT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: version,
            supported: CURRENT_VERSION,
        });
    }

    let mut reader = RecordReader {
        input: GzDecoder::new(input),
        version,
    };
    let mut snapshot = Snapshot {
        version,
        ..Snapshot::default()
    };

    loop {
        match reader.byte()? {
            NAMESPACE_MARKER => {
                let prefix = reader.string()?;
                let name = reader.string()?;
                if version <= 1 {
                    // Obsolete "up to date" flag
                    reader.byte()?;
                }
                snapshot.namespaces.push((prefix, name));
            }
            marker @ EXPL_TRIPLE_MARKER..=INF_QUAD_MARKER => {
                let subject = reader.value()?;
                let predicate = reader.value()?;
                let object = reader.value()?;
                let context = match marker {
                    EXPL_QUAD_MARKER | INF_QUAD_MARKER => Some(reader.value()?),
                    _ => None,
                };
                snapshot.statements.push(Statement {
                    subject,
                    predicate,
                    object,
                    context,
                    explicit: matches!(marker, EXPL_TRIPLE_MARKER | EXPL_QUAD_MARKER),
                });
            }
            EOF_MARKER => break,
            other => {
                return Err(StoreError::CorruptSnapshot(format!(
                    "invalid record type marker: {}",
                    other
                )))
            }
        }
    }

    Ok(snapshot)
}

struct RecordReader<R: Read> {
    input: R,
    version: u8,
}

impl<R: Read> RecordReader<R> {
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.input.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                StoreError::CorruptSnapshot("unexpected end of snapshot".to_string())
            }
            _ => StoreError::Io(e),
        })
    }

    fn byte(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.fill(&mut b)?;
        Ok(b[0])
    }

    fn string(&mut self) -> Result<String> {
        let len = if self.version <= 1 {
            let mut b = [0u8; 2];
            self.fill(&mut b)?;
            u16::from_be_bytes(b) as usize
        } else {
            let mut b = [0u8; 4];
            self.fill(&mut b)?;
            u32::from_be_bytes(b) as usize
        };
        let mut bytes = vec![0u8; len];
        self.fill(&mut bytes)?;
        String::from_utf8(bytes)
            .map_err(|_| StoreError::CorruptSnapshot("string is not valid UTF-8".to_string()))
    }

    fn value(&mut self) -> Result<Term> {
        match self.byte()? {
            URI_MARKER => Ok(Term::Iri(self.string()?)),
            BNODE_MARKER => Ok(Term::BlankNode(self.string()?)),
            PLAIN_LITERAL_MARKER => Ok(Term::literal(self.string()?)),
            LANG_LITERAL_MARKER => {
                let label = self.string()?;
                let language = self.string()?;
                Ok(Term::lang_literal(label, language))
            }
            DATATYPE_LITERAL_MARKER => {
                let label = self.string()?;
                match self.byte()? {
                    URI_MARKER => Ok(Term::typed_literal(label, self.string()?)),
                    other => Err(StoreError::CorruptSnapshot(format!(
                        "datatype must be an IRI, found value type marker {}",
                        other
                    ))),
                }
            }
            other => Err(StoreError::CorruptSnapshot(format!(
                "invalid value type marker: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> (NamespaceStore, Vec<Statement>) {
        let mut ns = NamespaceStore::new();
        ns.set("ex", "http://ex.org/").unwrap();
        let statements = vec![
            Statement::new(
                Term::iri("http://ex.org/a"),
                Term::iri("http://ex.org/name"),
                Term::lang_literal("Alice", "en"),
                None,
            ),
            Statement {
                explicit: false,
                ..Statement::new(
                    Term::blank("b1"),
                    Term::iri("http://ex.org/age"),
                    Term::integer(42),
                    Some(Term::iri("http://ex.org/g")),
                )
            },
        ];
        (ns, statements)
    }

    #[test]
    fn test_snapshot_round_trip() {
        let (ns, statements) = sample();
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &ns, statements.clone().into_iter()).unwrap();
        assert_eq!(&buf[..4], MAGIC);
        assert_eq!(buf[4], CURRENT_VERSION);

        let snapshot = read_snapshot(Cursor::new(buf)).unwrap();
        assert_eq!(snapshot.namespaces, vec![("ex".to_string(), "http://ex.org/".to_string())]);
        assert_eq!(snapshot.statements, statements);
    }

    #[test]
    fn test_bad_magic_is_fatal() {
        let err = read_snapshot(Cursor::new(b"XXXX\x02".to_vec())).unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot(_)));
    }

    #[test]
    fn test_future_version_is_fatal() {
        let err = read_snapshot(Cursor::new(b"BMSF\x09".to_vec())).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedVersion { found: 9, .. }));
    }

    #[test]
    fn test_invalid_record_marker() {
        let err = read_snapshot(Cursor::new(gzip_body(&[42]))).unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot(_)));
    }

    fn gzip_body(body: &[u8]) -> Vec<u8> {
        let mut buf = MAGIC.to_vec();
        buf.push(CURRENT_VERSION);
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(body).unwrap();
        buf.extend(gz.finish().unwrap());
        buf
    }

    #[test]
    fn test_nested_datatype_markers_are_rejected() {
        let mut body = vec![EXPL_TRIPLE_MARKER];
        for _ in 0..200_000 {
            body.push(DATATYPE_LITERAL_MARKER);
            body.extend_from_slice(&0u32.to_be_bytes());
        }
        let err = read_snapshot(Cursor::new(gzip_body(&body))).unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot(_)));
    }

    #[test]
    fn test_datatype_must_be_iri() {
        let mut body = vec![EXPL_TRIPLE_MARKER, DATATYPE_LITERAL_MARKER];
        body.extend_from_slice(&1u32.to_be_bytes());
        body.push(b'x');
        body.push(BNODE_MARKER);
        body.extend_from_slice(&1u32.to_be_bytes());
        body.push(b'b');
        let err = read_snapshot(Cursor::new(gzip_body(&body))).unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot(_)));
    }

    #[test]
    fn test_datatype_takes_precedence_over_language() {
        let ns = NamespaceStore::new();
        let both = Term::Literal(Literal {
            label: "chat".to_string(),
            language: Some("fr".to_string()),
            datatype: Some("http://ex.org/word".to_string()),
        });
        let st = Statement::new(Term::iri("http://ex.org/a"), Term::iri("http://ex.org/p"), both, None);
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &ns, std::iter::once(st)).unwrap();

        let snapshot = read_snapshot(Cursor::new(buf)).unwrap();
        assert_eq!(
            snapshot.statements[0].object,
            Term::typed_literal("chat", "http://ex.org/word")
        );
    }

    #[test]
    fn test_reads_version_one_records() {
        let mut buf = MAGIC.to_vec();
        buf.push(1);
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        let short = |s: &str| {
            let mut v = (s.len() as u16).to_be_bytes().to_vec();
            v.extend_from_slice(s.as_bytes());
            v
        };
        gz.write_all(&[NAMESPACE_MARKER]).unwrap();
        gz.write_all(&short("ex")).unwrap();
        gz.write_all(&short("http://ex.org/")).unwrap();
        gz.write_all(&[1]).unwrap();
        gz.write_all(&[EXPL_TRIPLE_MARKER, URI_MARKER]).unwrap();
        gz.write_all(&short("http://ex.org/a")).unwrap();
        gz.write_all(&[URI_MARKER]).unwrap();
        gz.write_all(&short("http://ex.org/p")).unwrap();
        gz.write_all(&[PLAIN_LITERAL_MARKER]).unwrap();
        gz.write_all(&short("v")).unwrap();
        gz.write_all(&[EOF_MARKER]).unwrap();
        buf.extend(gz.finish().unwrap());

        let snapshot = read_snapshot(Cursor::new(buf)).unwrap();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.namespaces.len(), 1);
        assert_eq!(snapshot.statements[0].object, Term::literal("v"));
    }

    #[test]
    fn test_file_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let io = FileIo::new(dir.path());
        let (ns, statements) = sample();
        io.write(&ns, statements.clone().into_iter()).unwrap();
        assert!(io.exists());
        assert!(!dir.path().join(SYNC_FILE_NAME).exists());
        let snapshot = io.read().unwrap().unwrap();
        assert_eq!(snapshot.statements, statements);
    }

    #[test]
    fn test_empty_file_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join(DATA_FILE_NAME)).unwrap();
        assert!(FileIo::new(dir.path()).read().unwrap().is_none());
    }
}
