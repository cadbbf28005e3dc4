use super::Record;

/// Writes a record to an output destination with [`Recorder::write`].
pub trait Recorder {
    /// Write a record to the [`Recorder`].
    fn write(&mut self, record: Record);

    /// Flushes buffered output, if any. `step` is the current episode.
    fn flush(&mut self, _step: i64) {}
}
