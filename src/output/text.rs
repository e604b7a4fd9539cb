//! Plain-text report.
//!
//! ```text
//! Found 5 images
//! Found 2 groups of duplicate/similar images
//! Total of 4 duplicate/similar image files
//! Marked 2 image files for deletion (1.2 MiB):
//!
//! keep   photos/a.png
//! delete photos/a_copy.jpg
//!
//! keep   photos/b.png
//! delete photos/b_small.png
//! ```

use std::io::{self, Write};

use crate::duplicates::SieveReport;

/// Human-readable rendering of a [`SieveReport`].
#[derive(Debug)]
pub struct TextReport<'a> {
    report: &'a SieveReport,
}

impl<'a> TextReport<'a> {
    /// Wrap a report.
    #[must_use]
    pub fn new(report: &'a SieveReport) -> Self {
        Self { report }
    }

    /// Write the full report.
    ///
    /// # Errors
    ///
    /// Propagates write errors.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let summary = &self.report.summary;

        writeln!(w, "Found {} images", summary.images_found)?;
        for skipped in &summary.skipped {
            writeln!(w, "Skipped {}: {}", skipped.path.display(), skipped.reason)?;
        }
        if summary.images_hashed == 0 {
            return Ok(());
        }

        writeln!(
            w,
            "Found {} groups of duplicate/similar images",
            summary.duplicate_groups
        )?;
        if !self.report.has_duplicates() {
            return Ok(());
        }
        writeln!(
            w,
            "Total of {} duplicate/similar image files",
            summary.grouped_images
        )?;
        writeln!(
            w,
            "Marked {} image files for deletion ({}):",
            summary.marked_for_deletion,
            summary.reclaimable_display()
        )?;

        for resolution in &self.report.resolutions {
            writeln!(w)?;
            writeln!(w, "keep   {}", resolution.retained.display())?;
            for path in &resolution.discarded {
                writeln!(w, "delete {}", path.display())?;
            }
        }
        writeln!(w)?;
        Ok(())
    }

    /// Render to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        // Writing to a Vec cannot fail
        let _ = self.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
