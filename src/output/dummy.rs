use super::{MediaSink, SinkType};
use crate::error::Result;
use crate::keying::Frame;

/// Sink used when no output file was requested
#[derive(Debug, Default)]
pub struct DummyWriter;

impl MediaSink for DummyWriter {
    fn write(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }

    fn media_type(&self) -> SinkType {
        SinkType::Dummy
    }
}
