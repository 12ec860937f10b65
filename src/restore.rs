//! Processing a whole list of volumes, in the order given.

use std::io::Write;
use std::path::Path;

use tracing::{error, info, warn};

use crate::error::{FloppError, Result};
use crate::volume::Volume;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeOutcome {
    /// Header read and reported, no output requested.
    Surveyed { pages: usize },
    /// Pages written to the output image.
    Restored { pages: usize },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    pub processed: usize,
    pub failed: usize,
    /// Set when a failure with an output image stopped the run early.
    pub halted: bool,
}

impl RestoreSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Report on, and with `output` restore, each volume in turn.
///
/// The volume report goes to `out`, failures to `err`. Once an output
/// image is being written the first failure ends the run, since the
/// remaining volumes would be applied on top of an incomplete image.
pub fn restore<P, O, E>(
    volumes: &[P],
    output: Option<&Path>,
    out: &mut O,
    err: &mut E,
) -> RestoreSummary
where
    P: AsRef<Path>,
    O: Write,
    E: Write,
{
    let mut summary = RestoreSummary::default();
    let mut set_total = None;

    for (idx, path) in volumes.iter().enumerate() {
        let path = path.as_ref();
        summary.processed += 1;

        match process_volume(path, output, out, &mut set_total) {
            Ok(VolumeOutcome::Restored { pages }) => {
                info!(path = %path.display(), pages, "volume restored");
            }
            Ok(VolumeOutcome::Surveyed { .. }) => {}
            Err(e) => {
                summary.failed += 1;
                if let Err(io) = writeln!(err, "{e}") {
                    error!(error = %e, %io, "could not report volume failure");
                }
                if output.is_some() {
                    summary.halted = idx + 1 < volumes.len();
                    break;
                }
            }
        }

        if idx + 1 < volumes.len() {
            if let Err(io) = writeln!(out) {
                warn!(%io, "could not write volume separator");
            }
        }
    }

    summary
}

fn process_volume<O: Write>(
    path: &Path,
    output: Option<&Path>,
    out: &mut O,
    set_total: &mut Option<u16>,
) -> Result<VolumeOutcome> {
    let mut volume = Volume::open(path)?;
    let header = volume.header();
    check_set(path, header.volume_index, header.volume_total, set_total);

    writeln!(out, "Vol {:02} of {:02}", header.volume_index, header.volume_total)
        .map_err(FloppError::Console)?;
    writeln!(out, "Dir {}", header.directory_name()).map_err(FloppError::Console)?;
    out.write_all(header.label())
        .and_then(|()| out.write_all(b"\n"))
        .map_err(FloppError::Console)?;

    match output {
        Some(output) => {
            let pages = volume.update_image(output)?;
            Ok(VolumeOutcome::Restored { pages })
        }
        None => {
            let pages = volume.present_pages();
            writeln!(out, "{pages} pages").map_err(FloppError::Console)?;
            Ok(VolumeOutcome::Surveyed { pages })
        }
    }
}

// Odd headers are worth a warning but nothing here depends on them.
fn check_set(path: &Path, index: u16, total: u16, set_total: &mut Option<u16>) {
    if index == 0 || index > total {
        warn!(path = %path.display(), index, total, "volume index outside the backup set");
    }
    match *set_total {
        Some(expected) if expected != total => {
            warn!(path = %path.display(), expected, total, "volume belongs to a different backup set size");
        }
        Some(_) => {}
        None => *set_total = Some(total),
    }
}
