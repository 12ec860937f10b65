use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;

use crate::error::{FloppError, Result};
use crate::header::{self, HEADER_SIZE, PageGroups, VolumeHeader};
use crate::placer;

/// One backup volume, either an image file or a floppy device.
#[derive(Debug)]
pub struct Volume {
    file: File,
    max_pages: usize,
    header: VolumeHeader,
}

impl Volume {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path).map_err(|source| FloppError::Stat {
            path: path.to_path_buf(),
            source,
        })?;

        // Devices report no useful size, only files can be checked up front
        let is_regular = meta.is_file();
        if is_regular && meta.len() < HEADER_SIZE as u64 {
            return Err(FloppError::TooSmall { path: path.to_path_buf() });
        }

        let mut file = File::open(path).map_err(|source| FloppError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut buf = [0u8; HEADER_SIZE];
        file.read_exact(&mut buf)
            .map_err(|source| FloppError::ReadHeader {
                path: path.to_path_buf(),
                source,
            })?;

        let max_pages = header::max_pages(is_regular, meta.len());
        let header = VolumeHeader::parse(&buf)?;
        debug!(
            path = %path.display(),
            volume = header.volume_index,
            of = header.volume_total,
            max_pages,
            "opened volume"
        );

        Ok(Volume {
            file,
            max_pages,
            header,
        })
    }

    pub fn header(&self) -> &VolumeHeader {
        &self.header
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn page_groups(&self) -> PageGroups<'_> {
        self.header.page_groups(self.max_pages)
    }

    /// Number of data pages the page table says this volume carries.
    /// Nothing is read past the header.
    pub fn present_pages(&self) -> usize {
        self.page_groups().map(|group| group.present()).sum()
    }

    /// Write the pages of this volume into the image at `output`.
    pub fn update_image(&mut self, output: &Path) -> Result<usize> {
        let mut image = placer::open_image(output)?;

        let start = HEADER_SIZE as u64;
        let pos = self
            .file
            .seek(SeekFrom::Start(start))
            .map_err(FloppError::InputSeek)?;
        if pos != start {
            return Err(FloppError::InputSeek(std::io::Error::other(format!(
                "landed at {pos}, wanted {start}"
            ))));
        }

        let groups = self.header.page_groups(self.max_pages);
        placer::place_pages(&mut self.file, groups, &mut image)
    }
}
