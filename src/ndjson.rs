use crate::error::{IoContext, Result};
use crate::paths::tmp_sibling;
use crate::util::{create_with_backoff, ensure_parent, open_with_backoff, remove_with_backoff, replace_file_atomic_backoff};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Buffered NDJSON reader that tracks the 1-based line number.
pub struct NdjsonReader {
    rdr: BufReader<File>,
    line_no: usize,
}

impl NdjsonReader {
    pub fn open(path: &Path, buf_bytes: usize) -> io::Result<Self> {
        let f = open_with_backoff(path)?;
        Ok(Self { rdr: BufReader::with_capacity(buf_bytes.max(8 * 1024), f), line_no: 0 })
    }

    /// Read the next line into `buf`, stripping `\r?\n`. Returns bytes read (0 on EOF).
    pub fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        buf.clear();
        let n = self.rdr.read_line(buf)?;
        if n == 0 {
            return Ok(0);
        }
        self.line_no += 1;
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') {
                buf.pop();
            }
        }
        Ok(n)
    }

    /// Line number of the line most recently returned by [`read_line`](Self::read_line).
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

/// NDJSON writer that stages output in a `<dest>.tmp` sibling and promotes it
/// on [`finish_atomic`](Self::finish_atomic). Dropping the writer without finishing
/// removes the temp file, so `dest` never shows a partial write.
pub struct NdjsonWriter {
    tmp: PathBuf,
    dest: PathBuf,
    w: Option<BufWriter<File>>,
}

impl NdjsonWriter {
    /// Start a fresh file that will replace `dest`.
    pub fn create(dest: &Path, buf_bytes: usize) -> Result<Self> {
        ensure_parent(dest)?;
        let tmp = tmp_sibling(dest);
        let f = create_with_backoff(&tmp).io_context(|| format!("create {}", tmp.display()))?;
        Ok(Self {
            tmp,
            dest: dest.to_path_buf(),
            w: Some(BufWriter::with_capacity(buf_bytes.max(8 * 1024), f)),
        })
    }

    /// Start a file that continues `dest`: existing content is copied into the
    /// temp file first and new lines go after it.
    pub fn append(dest: &Path, buf_bytes: usize) -> Result<Self> {
        let mut writer = Self::create(dest, buf_bytes)?;
        if dest.exists() {
            let mut src = open_with_backoff(dest).io_context(|| format!("open {}", dest.display()))?;
            if let Some(w) = writer.w.as_mut() {
                io::copy(&mut src, w).io_context(|| format!("copy {} into temp", dest.display()))?;
            }
        }
        Ok(writer)
    }

    #[inline]
    pub fn write_line(&mut self, s: &str) -> Result<()> {
        if let Some(w) = &mut self.w {
            w.write_all(s.as_bytes())
                .and_then(|_| w.write_all(b"\n"))
                .io_context(|| format!("write {}", self.tmp.display()))?;
        }
        Ok(())
    }

    /// Flush, fsync and promote the temp file to the destination.
    pub fn finish_atomic(mut self) -> Result<PathBuf> {
        if let Some(w) = self.w.take() {
            let synced = w
                .into_inner()
                .map_err(|e| e.into_error())
                .and_then(|f| f.sync_all())
                .io_context(|| format!("flush {}", self.tmp.display()));
            if synced.is_err() {
                let _ = remove_with_backoff(&self.tmp);
            }
            synced?;
        }
        replace_file_atomic_backoff(&self.tmp, &self.dest)?;
        Ok(self.dest.clone())
    }
}

impl Drop for NdjsonWriter {
    fn drop(&mut self) {
        if self.w.take().is_some() {
            let _ = remove_with_backoff(&self.tmp);
        }
    }
}

