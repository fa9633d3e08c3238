//! Append-only record of per-step training losses.
//!
//! Each line is `epoch<TAB>step<TAB>loss`. Runs append, so a log can span
//! several invocations.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossEntry {
    pub epoch: usize,
    pub step: usize,
    pub loss: f32,
}

#[derive(Debug, Clone)]
pub struct LossLog {
    path: PathBuf,
}

impl LossLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line per step of `epoch`.
    pub fn append(&self, epoch: usize, losses: &[f32]) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut out = BufWriter::new(file);
        for (step, loss) in losses.iter().enumerate() {
            writeln!(out, "{epoch}\t{step}\t{loss}")?;
        }
        out.flush()
    }

    /// Read every entry back in file order.
    pub fn read(&self) -> io::Result<Vec<LossEntry>> {
        let file = fs::File::open(&self.path)?;
        let mut entries = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(parse_line(&line).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("malformed loss log line {}: {line:?}", n + 1),
                )
            })?);
        }
        Ok(entries)
    }
}

fn parse_line(line: &str) -> Option<LossEntry> {
    let mut fields = line.split('\t');
    let epoch = fields.next()?.parse().ok()?;
    let step = fields.next()?.parse().ok()?;
    let loss = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(LossEntry { epoch, step, loss })
}
