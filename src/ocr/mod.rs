//! Raster OCR: the last-resort extraction strategy.
//!
//! Pages are rendered with pdftoppm (Poppler) and recognized with
//! Tesseract. Both sit behind traits so other engines, or fakes in tests,
//! can be plugged into [`RasterOcrExtractor`].

mod backend;
mod pdftoppm;
mod raster;
mod tesseract;

pub use backend::{OcrConfig, OcrEngine, OcrError, OcrSession, PageRasterizer};
pub use pdftoppm::PdftoppmRasterizer;
pub use raster::RasterOcrExtractor;
pub use tesseract::TesseractEngine;
