//! Thumbnail generation for one directory.
//!
//! A thumbnail lives at `<dir>/<thumb dir>/<image name>`. Its existence is the
//! whole cache: a thumbnail is generated if and only if nothing exists at that
//! path when the directory is scanned. Changing the source image later does
//! not refresh it.
//!
//! ## Parallel Processing
//!
//! Missing thumbnails of a directory are generated in parallel on the global
//! [rayon](https://docs.rs/rayon) pool, which the binary sizes from
//! `processing.max_processes` (capped at the core count). The call returns
//! once every job has finished. A failing job never cancels its siblings;
//! all failures are collected in input order.

use crate::config::Layout;
use crate::imaging::{BackendError, ImageBackend, Quality, ThumbnailParams};
use crate::scan::DirectoryNode;
use rayon::prelude::*;
use std::fs;
use std::path::PathBuf;

/// One thumbnail that could not be produced.
#[derive(Debug)]
pub struct ThumbnailFailure {
    pub source: PathBuf,
    pub error: BackendError,
}

/// Outcome of generating the missing thumbnails of one directory.
#[derive(Debug, Default)]
pub struct ThumbnailReport {
    /// Jobs handed to the backend.
    pub attempted: usize,
    pub failures: Vec<ThumbnailFailure>,
}

impl ThumbnailReport {
    pub fn generated(&self) -> usize {
        self.attempted - self.failures.len()
    }

    /// The accumulated error: the first failure in input order.
    pub fn first_error(&self) -> Option<&BackendError> {
        self.failures.first().map(|f| &f.error)
    }
}

/// Jobs for every image of `node` whose thumbnail does not exist yet.
///
/// Anything already at the thumbnail path counts as cached, including a file
/// we did not write.
pub fn plan_thumbnails(node: &DirectoryNode, layout: &Layout) -> Vec<ThumbnailParams> {
    node.thumbnail_pairs(layout)
        .into_iter()
        .filter(|(_, thumb)| fs::symlink_metadata(thumb).is_err())
        .map(|(source, output)| ThumbnailParams {
            source,
            output,
            width: layout.thumb_width,
            height: layout.thumb_height,
            quality: Quality::new(layout.thumb_quality),
        })
        .collect()
}

/// Run `jobs` concurrently and wait for all of them.
pub fn generate_thumbnails(backend: &impl ImageBackend, jobs: &[ThumbnailParams]) -> ThumbnailReport {
    let failures = jobs
        .par_iter()
        .filter_map(|job| {
            backend
                .thumbnail(job)
                .err()
                .map(|error| ThumbnailFailure {
                    source: job.source.clone(),
                    error,
                })
        })
        .collect();

    ThumbnailReport {
        attempted: jobs.len(),
        failures,
    }
}
