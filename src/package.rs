//! DOCX/ODT package access.
//!
//! Both formats are ZIP archives of XML parts. [`Package`] reads parts on
//! demand and rewrites the archive in one pass on commit: untouched entries
//! are raw-copied (keeping ODT's stored `mimetype` first), replaced entries
//! are deflated, and the result lands in a sibling temp file that is renamed
//! over the original only after the archive has been written completely.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Package format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Docx,
    Odt,
}

impl PackageKind {
    /// Detect the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "docx" => Some(PackageKind::Docx),
            "odt" => Some(PackageKind::Odt),
            _ => None,
        }
    }

    /// Detect the format from the archive's entry names.
    pub fn from_entries<S: AsRef<str>>(names: &[S]) -> Option<Self> {
        if names.iter().any(|n| n.as_ref() == "word/document.xml") {
            Some(PackageKind::Docx)
        } else if names.iter().any(|n| n.as_ref() == "content.xml") {
            Some(PackageKind::Odt)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::Docx => "docx",
            PackageKind::Odt => "odt",
        }
    }

    /// Text-bearing parts present in the archive, in processing order.
    ///
    /// DOCX: the main document, then headers and footers (sorted), then
    /// footnotes and endnotes. ODT: `content.xml`, then `styles.xml`.
    pub fn text_parts<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        let has = |target: &str| names.iter().any(|n| n.as_ref() == target);
        let mut parts = Vec::new();

        match self {
            PackageKind::Docx => {
                if has("word/document.xml") {
                    parts.push("word/document.xml".to_string());
                }
                let mut headers_footers: Vec<String> = names
                    .iter()
                    .map(|n| n.as_ref())
                    .filter(|n| {
                        n.strip_prefix("word/").is_some_and(|rest| {
                            !rest.contains('/')
                                && rest.ends_with(".xml")
                                && (rest.starts_with("header") || rest.starts_with("footer"))
                        })
                    })
                    .map(str::to_string)
                    .collect();
                headers_footers.sort();
                parts.extend(headers_footers);
                for notes in ["word/footnotes.xml", "word/endnotes.xml"] {
                    if has(notes) {
                        parts.push(notes.to_string());
                    }
                }
            }
            PackageKind::Odt => {
                for part in ["content.xml", "styles.xml"] {
                    if has(part) {
                        parts.push(part.to_string());
                    }
                }
            }
        }

        parts
    }
}

impl std::fmt::Display for PackageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationships part that belongs to an OOXML part
/// (`word/document.xml` -> `word/_rels/document.xml.rels`).
pub fn relationships_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

#[cfg(feature = "archive")]
pub use archive::Package;

#[cfg(feature = "archive")]
mod archive {
    use std::collections::BTreeMap;
    use std::fs::File;
    use std::io::{BufReader, BufWriter, Read, Seek, Write};
    use std::path::{Path, PathBuf};

    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipArchive, ZipWriter};

    use super::PackageKind;
    use crate::error::Result;
    use crate::util::decode_text;

    /// An opened DOCX or ODT archive.
    pub struct Package<R: Read + Seek> {
        archive: ZipArchive<R>,
        names: Vec<String>,
        kind: Option<PackageKind>,
    }

    impl Package<BufReader<File>> {
        /// Open a package file; the format comes from the extension, or
        /// from the entries when the extension is not recognised.
        pub fn open(path: &Path) -> Result<Self> {
            let file = File::open(path)?;
            let mut package = Package::from_reader(BufReader::new(file))?;
            if let Some(kind) = PackageKind::from_path(path) {
                package.kind = Some(kind);
            }
            Ok(package)
        }
    }

    impl<R: Read + Seek> Package<R> {
        pub fn from_reader(reader: R) -> Result<Self> {
            let archive = ZipArchive::new(reader)?;
            let names: Vec<String> = archive.file_names().map(str::to_string).collect();
            let kind = PackageKind::from_entries(&names);
            Ok(Self {
                archive,
                names,
                kind,
            })
        }

        pub fn kind(&self) -> Option<PackageKind> {
            self.kind
        }

        pub fn names(&self) -> &[String] {
            &self.names
        }

        pub fn contains(&self, name: &str) -> bool {
            self.names.iter().any(|n| n == name)
        }

        /// Text-bearing parts, in processing order.
        pub fn text_parts(&self) -> Vec<String> {
            self.kind
                .map(|kind| kind.text_parts(&self.names))
                .unwrap_or_default()
        }

        /// Raw bytes of an entry, or `None` if it does not exist.
        pub fn read_part(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
            if !self.contains(name) {
                return Ok(None);
            }
            let mut file = self.archive.by_name(name)?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            Ok(Some(data))
        }

        /// An entry decoded to text.
        pub fn read_text_part(&mut self, name: &str) -> Result<Option<String>> {
            Ok(self
                .read_part(name)?
                .map(|bytes| decode_text(&bytes).into_owned()))
        }

        /// Write every entry to `writer`, substituting `replacements`.
        ///
        /// Replacement names not present in the archive are appended as new
        /// entries.
        pub fn write_to<W: Write + Seek>(
            &mut self,
            writer: W,
            mut replacements: BTreeMap<String, Vec<u8>>,
        ) -> Result<W> {
            let mut zip = ZipWriter::new(writer);
            let deflated =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

            for index in 0..self.archive.len() {
                let name = self.archive.by_index_raw(index)?.name().to_string();
                match replacements.remove(&name) {
                    Some(data) => {
                        zip.start_file(name.as_str(), deflated)?;
                        zip.write_all(&data)?;
                    }
                    None => {
                        let entry = self.archive.by_index_raw(index)?;
                        zip.raw_copy_file(entry)?;
                    }
                }
            }

            for (name, data) in replacements {
                zip.start_file(name.as_str(), deflated)?;
                zip.write_all(&data)?;
            }

            Ok(zip.finish()?)
        }
    }

    impl Package<BufReader<File>> {
        /// Rewrite the package at `path` with `replacements` applied.
        ///
        /// The new archive is written to a temporary file in the same
        /// directory and renamed over `path` on success, so a failure leaves
        /// the original untouched.
        pub fn commit(
            mut self,
            path: &Path,
            replacements: BTreeMap<String, Vec<u8>>,
        ) -> Result<()> {
            if replacements.is_empty() {
                return Ok(());
            }

            let dir: PathBuf = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let mut temp = tempfile::Builder::new()
                .prefix(".docfill-")
                .suffix(".tmp")
                .tempfile_in(&dir)?;

            {
                let buffered = self.write_to(BufWriter::new(temp.as_file_mut()), replacements)?;
                buffered.into_inner().map_err(|e| e.into_error())?;
            }
            temp.as_file().sync_all()?;

            drop(self);
            temp.persist(path).map_err(|e| e.error)?;
            Ok(())
        }
    }
}
