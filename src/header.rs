//! The WINCH-TO-FLOPP volume header.
//!
//! Layout (big-endian, ND is a big-endian machine):
//! ```text
//! offset 0x0000: u16        volume index (1-based)
//! offset 0x0002: [u8; 16]   directory name, 7-bit, ends at an apostrophe
//! offset 0x0012: [u8; 50]   volume label
//! offset 0x0044: u16        number of volumes in the backup set
//! offset 0x0046: [u8; 6]    unused
//! offset 0x004c: page table, groups of 8 x i32 page numbers + u32 count
//! ```
//! Data pages follow the header at offset 16384, one 2048 byte page for
//! every page number in the table that is not -1.

use std::io::Cursor;

use binrw::{BinRead, binrw};

use crate::error::Result;

pub const HEADER_SIZE: usize = 16384;
pub const PAGE_SIZE: usize = 2048;
pub const GROUP_SLOTS: usize = 8;
pub const GROUP_SIZE: usize = GROUP_SLOTS * 4 + 4;
pub const PAGE_TABLE_OFFSET: usize = 76;
pub const PAGE_TABLE_LEN: usize = HEADER_SIZE - PAGE_TABLE_OFFSET;
// 453 groups, the table fills the header exactly
pub const MAX_GROUPS: usize = PAGE_TABLE_LEN / GROUP_SIZE;
pub const BLANK_PAGE: i32 = -1;

// A HD floppy holds 608 pages in this format. Used when the volume is a
// device and its size can't be taken from the file system.
pub const FLOPPY_MAX_PAGES: usize = 608;

pub const NAME_LEN: usize = 16;
pub const LABEL_LEN: usize = 50;
const RESERVED_LEN: usize = 6;

#[binrw]
#[brw(big)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeHeader {
    pub volume_index: u16,
    pub dir_name: [u8; NAME_LEN],
    pub raw_label: [u8; LABEL_LEN],
    pub volume_total: u16,
    pub reserved: [u8; RESERVED_LEN],
    pub page_table: [u8; PAGE_TABLE_LEN],
}

impl VolumeHeader {
    pub fn parse(buf: &[u8; HEADER_SIZE]) -> Result<Self> {
        Ok(Self::read(&mut Cursor::new(&buf[..]))?)
    }

    pub fn directory_name(&self) -> String {
        decode_name(&self.dir_name)
    }

    /// The label bytes as stored, up to the first NUL if there is one.
    /// Unlike the directory name the high bit is kept.
    pub fn label(&self) -> &[u8] {
        let end = self
            .raw_label
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(LABEL_LEN);
        &self.raw_label[..end]
    }

    /// Walk the page table of a volume holding at most `max_pages` data
    /// pages. Every call starts again from the first group.
    pub fn page_groups(&self, max_pages: usize) -> PageGroups<'_> {
        PageGroups {
            table: Cursor::new(&self.page_table[..]),
            remaining: max_pages.div_ceil(GROUP_SLOTS).min(MAX_GROUPS),
        }
    }
}

#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGroup {
    pub pages: [i32; GROUP_SLOTS],
    pub count: u32,
}

impl PageGroup {
    pub fn slots(&self) -> impl Iterator<Item = Slot> {
        self.pages.into_iter().map(Slot::from)
    }

    /// Number of slots that carry a page in this volume.
    pub fn present(&self) -> usize {
        self.pages.iter().filter(|&&page| page != BLANK_PAGE).count()
    }

    /// A zero count marks the end of a short volume.
    pub fn is_terminator(&self) -> bool {
        self.count == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Blank,
    Page(i32),
}

impl From<i32> for Slot {
    fn from(page: i32) -> Self {
        if page == BLANK_PAGE {
            Slot::Blank
        } else {
            Slot::Page(page)
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageGroups<'a> {
    table: Cursor<&'a [u8]>,
    remaining: usize,
}

impl Iterator for PageGroups<'_> {
    type Item = PageGroup;

    fn next(&mut self) -> Option<PageGroup> {
        if self.remaining == 0 {
            return None;
        }
        match PageGroup::read(&mut self.table) {
            Ok(group) if !group.is_terminator() => {
                self.remaining -= 1;
                Some(group)
            }
            _ => {
                self.remaining = 0;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

pub fn decode_name(field: &[u8]) -> String {
    field
        .iter()
        .take(NAME_LEN)
        .map(|b| b & 0x7f) // ND text may carry a parity bit
        .take_while(|&c| c != b'\'')
        .map(char::from)
        .collect()
}

/// Number of data pages a volume can hold. Regular files are measured,
/// anything else is assumed to be a HD floppy.
pub fn max_pages(is_regular: bool, size: u64) -> usize {
    if is_regular {
        (size.saturating_sub(HEADER_SIZE as u64) / PAGE_SIZE as u64) as usize
    } else {
        FLOPPY_MAX_PAGES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::BinWrite;

    fn group(pages: [i32; GROUP_SLOTS], count: u32) -> PageGroup {
        PageGroup { pages, count }
    }

    fn header_with(groups: &[PageGroup]) -> VolumeHeader {
        let mut table = [0u8; PAGE_TABLE_LEN];
        {
            let mut cursor = Cursor::new(&mut table[..]);
            for g in groups {
                g.write(&mut cursor).unwrap();
            }
        }
        VolumeHeader {
            volume_index: 1,
            dir_name: *b"TEST'XXXXXXXXXXX",
            raw_label: [b' '; LABEL_LEN],
            volume_total: 1,
            reserved: [0; RESERVED_LEN],
            page_table: table,
        }
    }

    #[test]
    fn layout_matches_header_size() {
        assert_eq!(GROUP_SIZE, 36);
        assert_eq!(MAX_GROUPS, 453);
        assert_eq!(MAX_GROUPS * GROUP_SIZE, PAGE_TABLE_LEN);

        let mut out = Cursor::new(Vec::new());
        header_with(&[]).write(&mut out).unwrap();
        assert_eq!(out.into_inner().len(), HEADER_SIZE);
    }

    #[test]
    fn counters_are_big_endian() {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = 0x01;
        buf[1] = 0x02;
        buf[68] = 0x00;
        buf[69] = 0x03;
        let header = VolumeHeader::parse(&buf).unwrap();
        assert_eq!(header.volume_index, 0x0102);
        assert_eq!(header.volume_total, 3);
    }

    #[test]
    fn page_table_starts_at_offset_76() {
        let mut buf = [0u8; HEADER_SIZE];
        buf[76..80].copy_from_slice(&[0xff; 4]);
        buf[80..84].copy_from_slice(&[0x00, 0x00, 0x01, 0x00]);
        buf[108..112].copy_from_slice(&[0x00, 0x00, 0x00, 0x02]);

        let header = VolumeHeader::parse(&buf).unwrap();
        let groups: Vec<_> = header.page_groups(8).collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].pages[0], BLANK_PAGE);
        assert_eq!(groups[0].pages[1], 256);
        assert_eq!(groups[0].count, 2);
    }

    #[test]
    fn name_stops_at_apostrophe() {
        assert_eq!(decode_name(b"TEST'XXXXXXXXXXX"), "TEST");
        assert_eq!(decode_name(b"'XXXXXXXXXXXXXXX"), "");
        assert_eq!(header_with(&[]).directory_name(), "TEST");
    }

    #[test]
    fn name_without_apostrophe_is_sixteen_chars() {
        let name = decode_name(b"ABCDEFGHIJKLMNOPQRS");
        assert_eq!(name, "ABCDEFGHIJKLMNOP");
    }

    #[test]
    fn name_ignores_high_bit() {
        let mut field = *b"PACK-ONE'       ";
        for b in field.iter_mut() {
            *b |= 0x80;
        }
        assert_eq!(decode_name(&field), "PACK-ONE");
    }

    #[test]
    fn label_is_kept_verbatim() {
        let mut header = header_with(&[]);
        header.raw_label[..12].copy_from_slice(b"SYSTEM BACKU");
        assert_eq!(header.label().len(), LABEL_LEN);
        assert!(header.label().starts_with(b"SYSTEM BACKU"));

        header.raw_label[12] = 0;
        assert_eq!(header.label(), b"SYSTEM BACKU");
    }

    #[test]
    fn label_keeps_high_bit() {
        let mut header = header_with(&[]);
        let raw = [0xc4, 0xc1, 0xd9, 0xc5];
        header.raw_label[..4].copy_from_slice(&raw);
        assert!(header.label().starts_with(&raw));
        assert_eq!(header.label()[4..], [b' '; LABEL_LEN - 4]);
    }

    #[test]
    fn zero_count_terminates_table() {
        let header = header_with(&[
            group([0, 1, 2, 3, 4, 5, 6, 7], 8),
            group([8, 9, -1, -1, -1, -1, -1, -1], 0),
            group([10, 11, 12, 13, 14, 15, 16, 17], 8),
        ]);
        let groups: Vec<_> = header.page_groups(FLOPPY_MAX_PAGES).collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].pages[7], 7);
    }

    #[test]
    fn groups_are_bounded_by_max_pages() {
        let full = group([0, 1, 2, 3, 4, 5, 6, 7], 8);
        let header = header_with(&[full; 4]);
        assert_eq!(header.page_groups(16).count(), 2);
        // a partial group of 8 is still consulted
        assert_eq!(header.page_groups(17).count(), 3);
        assert_eq!(header.page_groups(4).count(), 1);
        assert_eq!(header.page_groups(0).count(), 0);
    }

    #[test]
    fn groups_never_run_past_the_header() {
        let full = group([0, 1, 2, 3, 4, 5, 6, 7], 8);
        let header = header_with(&[full; MAX_GROUPS]);
        assert_eq!(header.page_groups(usize::MAX / 2).count(), MAX_GROUPS);
    }

    #[test]
    fn page_groups_restart() {
        let header = header_with(&[group([0, -1, 2, -1, 4, -1, 6, -1], 4)]);
        let first: Vec<_> = header.page_groups(8).collect();
        let second: Vec<_> = header.page_groups(8).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn blank_slots() {
        let g = group([0, 1, 2, 3, -1, -1, -1, -1], 4);
        assert_eq!(g.present(), 4);
        let slots: Vec<_> = g.slots().collect();
        assert_eq!(slots[3], Slot::Page(3));
        assert_eq!(slots[4], Slot::Blank);
    }

    #[test]
    fn capacity_of_regular_file_and_device() {
        assert_eq!(max_pages(true, (HEADER_SIZE + 4 * PAGE_SIZE) as u64), 4);
        assert_eq!(max_pages(true, (HEADER_SIZE + 4 * PAGE_SIZE + 100) as u64), 4);
        assert_eq!(max_pages(true, HEADER_SIZE as u64), 0);
        assert_eq!(max_pages(false, 0), FLOPPY_MAX_PAGES);
        assert_eq!(max_pages(false, 1 << 30), FLOPPY_MAX_PAGES);
    }
}
