//! Tools for Norsk Data SINTRAN-III backup floppies.
//!
//! The backup utility WINCH-TO-FLOPP spreads the 2048 byte pages of a
//! filesystem over a set of floppy volumes. Every volume starts with a
//! 16384 byte header whose page table tells where each of the following
//! data pages belongs in the filesystem image. This crate reads those
//! volumes back and puts the pages where they belong.

pub mod error;
pub mod header;
pub mod placer;
pub mod restore;
pub mod volume;

pub use error::FloppError;
pub use header::{PageGroup, PageGroups, Slot, VolumeHeader};
pub use restore::{RestoreSummary, VolumeOutcome, restore};
pub use volume::Volume;
