//! Terminal output for rendered frames.
//!
//! A frame is written in place of the previous one: the writer remembers how
//! many lines it printed last time, moves the cursor back over them and clears
//! to the end of the screen before writing the new frame.
//!
//! The orchestrator only talks to the terminal through [`FrameWriter`], so
//! tests can swap in an in-memory sink.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crossterm::cursor::MoveToPreviousLine;
use crossterm::queue;
use crossterm::terminal::{self, Clear, ClearType};

/// Sink for rendered frames.
///
/// `write` may be called several times per frame; `flush` ends the frame.
pub trait FrameWriter: Send {
    /// Buffers part of the current frame.
    ///
    /// # Errors
    /// Returns an error if the bytes cannot be buffered.
    fn write(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Replaces the previous frame on screen with the buffered one.
    ///
    /// # Errors
    /// Returns an error if the underlying output fails.
    fn flush(&mut self) -> io::Result<()>;

    /// Drops whatever part of the current frame has been buffered.
    fn discard(&mut self);

    /// Current terminal width in columns.
    ///
    /// Queried once per tick so bars adapt to resizes.
    ///
    /// # Errors
    /// Returns an error if the width cannot be determined (e.g. not a TTY).
    fn width(&self) -> io::Result<usize>;
}

/// Frame writer that rewinds the cursor over the previous frame.
pub struct CursorWriter<W: Write + Send> {
    out: W,
    buf: Vec<u8>,
    /// Lines printed by the last flush.
    line_count: u16,
    /// Overrides the terminal size query when set.
    fixed_width: Option<usize>,
}

impl CursorWriter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> CursorWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            buf: Vec::new(),
            line_count: 0,
            fixed_width: None,
        }
    }

    /// Reports `width` instead of querying the terminal.
    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.fixed_width = Some(width);
        self
    }

    fn clear_previous(&mut self) -> io::Result<()> {
        // MoveToPreviousLine(0) is treated as 1 by most terminals.
        if self.line_count > 0 {
            queue!(self.out, MoveToPreviousLine(self.line_count))?;
        }
        queue!(self.out, Clear(ClearType::FromCursorDown))
    }
}

impl<W: Write + Send> FrameWriter for CursorWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.clear_previous()?;
        let lines = self.buf.iter().filter(|&&b| b == b'\n').count();
        self.out.write_all(&self.buf)?;
        self.buf.clear();
        self.line_count = u16::try_from(lines).unwrap_or(u16::MAX);
        self.out.flush()
    }

    fn discard(&mut self) {
        self.buf.clear();
    }

    fn width(&self) -> io::Result<usize> {
        if let Some(width) = self.fixed_width {
            return Ok(width);
        }
        terminal::size().map(|(cols, _)| usize::from(cols))
    }
}

/// In-memory frame sink that records every flushed frame.
///
/// Cloning shares the underlying storage, so a clone can be handed to a
/// `Progress` while another handle inspects what was written.
#[derive(Clone, Default)]
pub struct CaptureWriter {
    inner: Arc<Mutex<Capture>>,
    width: Option<usize>,
}

#[derive(Default)]
struct Capture {
    pending: Vec<u8>,
    frames: Vec<Vec<u8>>,
}

impl CaptureWriter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// All frames flushed so far, oldest first.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.lock().frames.clone()
    }

    /// The most recently flushed frame as UTF-8 (lossy).
    pub fn last_frame(&self) -> Option<String> {
        self.lock()
            .frames
            .last()
            .map(|frame| String::from_utf8_lossy(frame).into_owned())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Capture> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FrameWriter for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.lock().pending.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut capture = self.lock();
        let frame = std::mem::take(&mut capture.pending);
        capture.frames.push(frame);
        Ok(())
    }

    fn discard(&mut self) {
        self.lock().pending.clear();
    }

    fn width(&self) -> io::Result<usize> {
        self.width
            .ok_or_else(|| io::Error::new(io::ErrorKind::Unsupported, "capture has no width"))
    }
}
