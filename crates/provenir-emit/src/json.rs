use crate::emitter::{EmitContext, EmitResult, Emitter};
use crate::graph::DepGraphDoc;
use std::io::Write;

pub struct JsonEmitter {
    pretty: bool,
}

impl JsonEmitter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Default for JsonEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter for JsonEmitter {
    type Item = DepGraphDoc;

    fn emit<W: Write>(
        &self,
        item: &Self::Item,
        writer: &mut W,
        _context: &mut EmitContext,
    ) -> EmitResult {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, item)?;
        } else {
            serde_json::to_writer(&mut *writer, item)?;
        }
        writeln!(writer)?;
        Ok(())
    }
}
