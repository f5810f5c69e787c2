//! Output plumbing for plugin requests.
//!
//! Every request routes its build/process output through an [`OutputTee`]:
//! an in-memory capture always, a line-oriented forwarder to the
//! observability sink always, and the user-visible stream only when the
//! request opted into echoing. [`LineBufferer`] turns raw byte chunks into
//! complete lines for the forwarder.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Fan-out byte sink mirroring writes to every downstream in list order.
///
/// Downstreams can be appended at runtime; none are ever removed.
#[derive(Default)]
pub struct OutputTee {
    streams: Vec<Box<dyn Write + Send>>,
}

impl OutputTee {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a downstream. Subsequent writes reach it; earlier writes are
    /// not replayed.
    pub fn add_stream(&mut self, stream: Box<dyn Write + Send>) {
        self.streams.push(stream);
    }
}

impl Write for OutputTee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for stream in &mut self.streams {
            stream.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for stream in &mut self.streams {
            stream.flush()?;
        }
        Ok(())
    }
}

/// Accumulates raw output bytes and emits complete lines only.
///
/// Each complete line is handed to the handler without its newline byte,
/// UTF-8 decoded with best-effort substitution for malformed input. A
/// trailing partial line is retained until its newline arrives and is
/// never emitted on its own.
pub struct LineBufferer {
    buffer: Vec<u8>,
    handler: Box<dyn FnMut(&str) + Send>,
}

impl LineBufferer {
    pub fn new(handler: impl FnMut(&str) + Send + 'static) -> Self {
        Self {
            buffer: Vec::new(),
            handler: Box::new(handler),
        }
    }
}

impl Write for LineBufferer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        while let Some(newline) = self.buffer.iter().position(|&byte| byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let text = String::from_utf8_lossy(&line[..newline]);
            (self.handler)(&text);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Cloneable in-memory capture sink.
///
/// Clones share the same buffer, so one clone can sit inside an
/// [`OutputTee`] while another reads the captured text afterwards.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured bytes decoded lossily.
    pub fn contents(&self) -> String {
        match self.inner.lock() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::new(),
        }
    }

    /// Captured raw bytes.
    pub fn bytes(&self) -> Vec<u8> {
        match self.inner.lock() {
            Ok(bytes) => bytes.clone(),
            Err(_) => Vec::new(),
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "capture buffer poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Cloneable thread-safe handle to an arbitrary writable stream, used for
/// the user-visible echo stream shared across concurrent requests.
#[derive(Clone)]
pub struct SharedStream {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl SharedStream {
    pub fn new(stream: Box<dyn Write + Send>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(stream)),
        }
    }
}

impl Write for SharedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut stream = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "echo stream poisoned"))?;
        stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut stream = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "echo stream poisoned"))?;
        stream.flush()
    }
}
