use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, trace};

use crate::error::{FloppError, Result};
use crate::header::{PAGE_SIZE, PageGroup, Slot};

/// Byte offset of an absolute page number in the image.
pub fn page_offset(page: i32) -> Result<u64> {
    u64::try_from(page)
        .map(|n| n * PAGE_SIZE as u64)
        .map_err(|_| FloppError::InvalidPage { page })
}

/// Open the output image for update, creating it if it isn't there.
/// Existing content is kept.
pub fn open_image(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|source| FloppError::OpenOutput {
            path: path.to_path_buf(),
            source,
        })
}

/// Copy the data pages of a volume to their place in the image.
///
/// `volume` must be positioned at the first data page. It is only ever
/// read forward, one page at a time, since a floppy drive may not seek.
/// Blank slots consume nothing from the volume. Returns the number of
/// pages written.
pub fn place_pages<R, W, I>(volume: &mut R, groups: I, image: &mut W) -> Result<usize>
where
    R: Read,
    W: Write + Seek,
    I: IntoIterator<Item = PageGroup>,
{
    let mut page = [0u8; PAGE_SIZE];
    let mut placed = 0;

    for group in groups {
        if group.is_terminator() {
            break;
        }
        for slot in group.slots() {
            let Slot::Page(page_no) = slot else {
                continue;
            };

            volume.read_exact(&mut page).map_err(FloppError::ReadPage)?;

            let offset = page_offset(page_no)?;
            let pos = image
                .seek(SeekFrom::Start(offset))
                .map_err(|source| FloppError::SeekOutput { page: page_no, source })?;
            if pos != offset {
                return Err(FloppError::SeekOutput {
                    page: page_no,
                    source: std::io::Error::other(format!("landed at {pos}, wanted {offset}")),
                });
            }
            image
                .write_all(&page)
                .map_err(|source| FloppError::WriteOutput { page: page_no, source })?;

            trace!(page = page_no, offset, "placed page");
            placed += 1;
        }
    }

    debug!(placed, "volume placement done");
    Ok(placed)
}
