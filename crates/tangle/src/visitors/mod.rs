//! AST visitors for the two parse passes.

pub mod function_scan;
pub mod import_scan;

pub use function_scan::{FunctionScanVisitor, ScannedFunction};
pub use import_scan::{ImportScanVisitor, RawImport};
use ruff_text_size::TextSize;

/// Byte-offset to 1-based line number mapping for one source file.
#[derive(Debug)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset as u32 + 1);
            }
        }
        Self { line_starts }
    }

    pub fn line(&self, offset: TextSize) -> usize {
        self.line_starts
            .partition_point(|&start| start <= offset.to_u32())
    }
}
