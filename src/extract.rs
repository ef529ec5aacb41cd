//! Extraction driver: wires resolver, pipeline and consumer for one run.

use crate::adapter::{ArchiveAdapter, ChunkReader};
use crate::container::Container;
use crate::decompress::{BlockDecoder, XzBlockDecoder};
use crate::error::{ExtractError, Result};
use crate::file_media::LocalFileMedia;
use crate::pipeline::{write_blocks, Pipeline, PipelineOptions};
use crate::want::WantList;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Options for an extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Path filters. Empty means the whole archive.
    pub specs: Vec<String>,
    /// Parse the output as tar and report each member (needs a file index).
    pub verify: bool,
    /// Decoder workers.
    pub threads: usize,
    /// Pooled blocks; `None` picks `2 * threads + 3`.
    pub pool_blocks: Option<usize>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        let pipeline = PipelineOptions::default();
        Self {
            specs: Vec::new(),
            verify: true,
            threads: pipeline.threads,
            pool_blocks: pipeline.pool_blocks,
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Bytes written to the output.
    pub bytes_written: u64,
    /// Members the tar parser walked; zero when not verifying.
    pub entries: u64,
    pub verified: bool,
}

/// One archive, opened and indexed, ready to extract from.
pub struct Extractor<R> {
    source: R,
    container: Container,
}

impl Extractor<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let media = LocalFileMedia::new(path)?;
        debug!(name = media.name(), length = media.length(), "opening archive");
        Self::new(media.open()?)
    }
}

impl<R: Read + Seek + Send + 'static> Extractor<R> {
    pub fn new(mut source: R) -> Result<Self> {
        let container = Container::open(&mut source)?;
        Ok(Self { source, container })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Extract into `out`, calling `on_entry` with each member name the
    /// tar parser walks.
    ///
    /// With verification on and a file index present, the selection is
    /// trimmed to the wanted members and checked by the tar parser.
    /// Otherwise every block the selection touches is written whole.
    pub fn run<W, F>(self, options: &ExtractOptions, out: &mut W, mut on_entry: F) -> Result<ExtractSummary>
    where
        W: Write,
        F: FnMut(&str),
    {
        let Self { source, container } = self;
        let wants = Arc::new(WantList::resolve(&options.specs, container.file_index())?);
        let decoder: Arc<dyn BlockDecoder> = Arc::new(XzBlockDecoder::new(container.check()));
        let pipeline_options = PipelineOptions {
            threads: options.threads,
            pool_blocks: options.pool_blocks,
        };
        let mut pipeline = Pipeline::start(
            source,
            &container,
            wants.cursor(),
            decoder,
            &pipeline_options,
        )?;

        let verify = options.verify && container.file_index().is_some();
        let summary = if verify {
            let adapter = ArchiveAdapter::new(pipeline, wants.cursor());
            let mut reader = ChunkReader::new(adapter, out);
            let listed = {
                let mut archive = tar::Archive::new(&mut reader);
                list_entries(&mut archive, &mut on_entry)
            };
            let entries = match listed {
                Ok(entries) => entries,
                Err(e) => return Err(reader.take_error().unwrap_or(e)),
            };
            let adapter = reader.finish()?;
            let bytes_written = adapter.flushed();
            adapter.into_inner().finish()?;
            ExtractSummary {
                bytes_written,
                entries,
                verified: true,
            }
        } else {
            let bytes_written = write_blocks(&mut pipeline, out)?;
            pipeline.finish()?;
            ExtractSummary {
                bytes_written,
                entries: 0,
                verified: false,
            }
        };
        out.flush()?;

        info!(
            bytes = summary.bytes_written,
            entries = summary.entries,
            verified = summary.verified,
            "extraction finished"
        );
        Ok(summary)
    }
}

fn list_entries<R: Read>(archive: &mut tar::Archive<R>, on_entry: &mut dyn FnMut(&str)) -> Result<u64> {
    let mut count = 0;
    for entry in archive.entries().map_err(archive_error)? {
        let entry = entry.map_err(archive_error)?;
        let path = entry.path_bytes();
        on_entry(&String::from_utf8_lossy(&path));
        count += 1;
    }
    Ok(count)
}

fn archive_error(e: std::io::Error) -> ExtractError {
    ExtractError::Archive(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompress::Check;
    use crate::test_support::{tar_fixture, ContainerBuilder, TarFixture};
    use std::io::Cursor;

    fn fixture() -> TarFixture {
        let files: [(&str, &[u8]); 5] = [
            ("a", b"first file\n"),
            ("b", &[0x5A; 3000]),
            ("c", b"third\n"),
            ("dir/", b""),
            ("dir/x", &[7; 700]),
        ];
        tar_fixture(&files)
    }

    fn options(specs: &[&str], verify: bool) -> ExtractOptions {
        ExtractOptions {
            specs: specs.iter().map(|s| s.to_string()).collect(),
            verify,
            threads: 2,
            pool_blocks: None,
        }
    }

    fn extract(bytes: Vec<u8>, options: &ExtractOptions) -> Result<(Vec<u8>, Vec<String>, ExtractSummary)> {
        let extractor = Extractor::new(Cursor::new(bytes))?;
        let mut out = Vec::new();
        let mut names = Vec::new();
        // Directory names may or may not keep their trailing slash.
        let summary = extractor.run(options, &mut out, |name| {
            names.push(name.trim_end_matches('/').to_string())
        })?;
        Ok((out, names, summary))
    }

    #[test]
    fn test_verified_single_member() {
        let fixture = fixture();
        let bytes = fixture.to_container(1024, Check::Crc64);
        let (out, names, summary) = extract(bytes, &options(&["b"], true)).unwrap();
        assert_eq!(names, ["b"]);
        assert_eq!(out, fixture.member_bytes(&["b"]));
        assert_eq!(summary.entries, 1);
        assert!(summary.verified);
        assert_eq!(summary.bytes_written, out.len() as u64);
    }

    #[test]
    fn test_verified_directory() {
        let fixture = fixture();
        let bytes = fixture.to_container(512, Check::Crc32);
        let (out, names, _) = extract(bytes, &options(&["dir"], true)).unwrap();
        assert_eq!(names, ["dir", "dir/x"]);
        assert_eq!(out, fixture.member_bytes(&["dir/", "dir/x"]));
    }

    #[test]
    fn test_verified_everything() {
        let fixture = fixture();
        let bytes = fixture.to_container(2048, Check::Sha256);
        let (out, names, summary) = extract(bytes, &options(&[], true)).unwrap();
        assert_eq!(names, ["a", "b", "c", "dir", "dir/x"]);
        assert_eq!(out, fixture.tar);
        assert_eq!(summary.entries, 5);
    }

    #[test]
    fn test_unverified_writes_whole_blocks() {
        let fixture = fixture();
        let bytes = fixture.to_container(1024, Check::Crc32);
        let (out, names, summary) = extract(bytes, &options(&[], false)).unwrap();
        assert!(names.is_empty());
        assert!(!summary.verified);
        assert_eq!(out, fixture.tar);
    }

    #[test]
    fn test_plain_xz() {
        let data: Vec<u8> = (0..50_000u32).map(|i| (i % 97) as u8).collect();
        let mut builder = ContainerBuilder::new(Check::Crc64);
        for piece in data.chunks(16_384) {
            builder.add_block(piece);
        }
        let (out, _, summary) = extract(builder.build(), &options(&[], true)).unwrap();
        assert_eq!(out, data);
        assert!(!summary.verified);
    }

    #[test]
    fn test_filter_plain_xz() {
        let mut builder = ContainerBuilder::new(Check::Crc32);
        builder.add_block(b"just bytes");
        assert!(matches!(
            extract(builder.build(), &options(&["a"], true)),
            Err(ExtractError::UnsupportedFilter)
        ));
    }

    #[test]
    fn test_missing_member() {
        let bytes = fixture().to_container(1024, Check::Crc32);
        let err = extract(bytes, &options(&["b", "bee"], true)).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(ref spec) if spec == "bee"));
        assert_eq!(err.to_string(), "\"bee\" not found in archive");
    }

    #[test]
    fn test_from_file() {
        let fixture = fixture();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&fixture.to_container(1024, Check::Crc32)).unwrap();
        let extractor = Extractor::open(file.path()).unwrap();
        assert!(extractor.container().file_index().is_some());
        let mut out = Vec::new();
        extractor
            .run(&options(&["c"], true), &mut out, |_| {})
            .unwrap();
        assert_eq!(out, fixture.member_bytes(&["c"]));
    }
}
