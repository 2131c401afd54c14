// ─────────────────────────────────────────────────────────────────────
// RTI Layer Core — Snapshot
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Field snapshots and fitter traces.
//!
//! The solver works on the half-domain 0 <= r <= rmax with the source on
//! the axis. For output the half-domain is mirrored about the axis into
//! a full (nz, 2 nr - 1) frame, so the source sits in the middle column
//! and the image is left-right symmetric.
//!
//! Writing is the sink's business: the kernel only hands over the frame
//! plus per-snapshot min/max metadata, and treats a sink error as a
//! warning, never as a reason to stop the run.

use ndarray::Array2;
use rti_types::error::RtiResult;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Metadata accompanying one emitted frame.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotMeta {
    /// Running snapshot index, starting at 0.
    pub index: usize,
    /// Time relative to source onset (s).
    pub time: f64,
    /// Smallest concentration in the half-domain field.
    pub min: f64,
    /// Largest concentration in the half-domain field.
    pub max: f64,
}

/// Consumer of mirrored full-domain frames.
pub trait SnapshotSink {
    fn write(&mut self, meta: &SnapshotMeta, frame: &Array2<f64>) -> RtiResult<()>;
}

/// Consumer of per-iteration fitter tuples.
pub trait TraceSink {
    fn record(&mut self, iteration: usize, params: &[f64], mse: f64, size: f64) -> RtiResult<()>;
}

/// Mirror the half-domain field (nz, nr + 1) into `frame` (nz, 2 nr - 1).
/// Column jr = 1 (the axis) lands on the central column nr - 1; the left
/// half repeats the right half.
pub fn mirror_into(c: &Array2<f64>, frame: &mut Array2<f64>) {
    let (nz, cols) = c.dim();
    let nr = cols - 1;
    assert_eq!(frame.dim(), (nz, 2 * nr - 1), "frame shape mismatch");

    for i in 0..nz {
        for j in 0..cols {
            let v = c[[i, j]];
            frame[[i, nr + j - 2]] = v;
            frame[[i, nr - j]] = v;
        }
    }
}

/// Min and max over the half-domain field.
pub fn field_extrema(c: &Array2<f64>) -> (f64, f64) {
    let mut min = c[[0, 0]];
    let mut max = c[[0, 0]];
    for &v in c.iter() {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    (min, max)
}

/// File-backed snapshot sink: one `.npy` frame per snapshot plus a text
/// companion listing dimensions and per-frame extrema.
///
/// Creating the sink opens the info file; that failure is the caller's
/// (a missing output directory is a setup error). Per-frame write
/// failures surface as `Err` and are downgraded to warnings by the
/// simulation loop.
pub struct NpySnapshotSink {
    base: PathBuf,
    info: File,
}

impl NpySnapshotSink {
    pub fn create(base: impl Into<PathBuf>, nz: usize, nr: usize) -> RtiResult<Self> {
        let base = base.into();
        let mut info = File::create(info_path(&base))?;
        writeln!(
            info,
            "Frame dimensions: {} x {} (64-bit floats)",
            2 * nr - 1,
            nz
        )?;
        Ok(NpySnapshotSink { base, info })
    }
}

impl SnapshotSink for NpySnapshotSink {
    fn write(&mut self, meta: &SnapshotMeta, frame: &Array2<f64>) -> RtiResult<()> {
        let millis = (meta.time * 1000.0).round() as i64;
        let mut path = self.base.clone().into_os_string();
        path.push(format!(".{millis}ms.npy"));
        let path = PathBuf::from(path);

        ndarray_npy::write_npy(&path, frame)
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        writeln!(
            self.info,
            "Frame #{}: {}: max = {:.6}, min = {:.6}",
            meta.index,
            path.display(),
            meta.max,
            meta.min
        )?;
        Ok(())
    }
}

fn info_path(base: &PathBuf) -> PathBuf {
    let mut p = base.clone().into_os_string();
    p.push(".info.txt");
    PathBuf::from(p)
}

/// File-backed fitter trace: one tab-separated line per iteration.
pub struct FileTraceSink {
    file: File,
}

impl FileTraceSink {
    pub fn create(path: impl Into<PathBuf>) -> RtiResult<Self> {
        let path = path.into();
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        writeln!(file, "iter\tparams\tmse\tsimplex_size")?;
        Ok(FileTraceSink { file })
    }
}

impl TraceSink for FileTraceSink {
    fn record(&mut self, iteration: usize, params: &[f64], mse: f64, size: f64) -> RtiResult<()> {
        let joined = params
            .iter()
            .map(|p| format!("{p:.6}"))
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(self.file, "{iteration}\t{joined}\t{mse:.6e}\t{size:.6e}")?;
        Ok(())
    }
}

/// Snapshot sink that keeps frames in memory.
#[derive(Debug, Default)]
pub struct VecSnapshotSink {
    pub frames: Vec<(SnapshotMeta, Array2<f64>)>,
}

impl SnapshotSink for VecSnapshotSink {
    fn write(&mut self, meta: &SnapshotMeta, frame: &Array2<f64>) -> RtiResult<()> {
        self.frames.push((*meta, frame.clone()));
        Ok(())
    }
}

/// Trace sink that keeps everything in memory; used by tests and callers
/// that post-process the path themselves.
#[derive(Debug, Default)]
pub struct VecTraceSink {
    pub entries: Vec<(usize, Vec<f64>, f64, f64)>,
}

impl TraceSink for VecTraceSink {
    fn record(&mut self, iteration: usize, params: &[f64], mse: f64, size: f64) -> RtiResult<()> {
        self.entries.push((iteration, params.to_vec(), mse, size));
        Ok(())
    }
}
