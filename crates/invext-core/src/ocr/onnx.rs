//! Recognition with `pure-onnx-ocr` and PaddleOCR models.

use std::path::Path;

use image::DynamicImage;
use tracing::{debug, info};

use super::{Result, TextRecognizer};
use crate::error::OcrError;

/// Model files expected in the model directory.
const DET_MODEL: &str = "det.onnx";
const REC_MODEL: &str = "latin_rec.onnx";
const DICTIONARY: &str = "latin_dict.txt";

/// OCR engine backed by `pure-onnx-ocr` (no external runtime needed).
pub struct OnnxRecognizer {
    engine: pure_onnx_ocr::engine::OcrEngine,
}

impl OnnxRecognizer {
    /// Load the detection and recognition models from a directory.
    ///
    /// Missing model files are reported as [`OcrError::Unavailable`].
    pub fn from_dir(model_dir: &Path) -> Result<Self> {
        let det_path = model_dir.join(DET_MODEL);
        let rec_path = model_dir.join(REC_MODEL);
        let dict_path = model_dir.join(DICTIONARY);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::Unavailable(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::Unavailable(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());
        Ok(Self { engine })
    }
}

impl TextRecognizer for OnnxRecognizer {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String> {
        let regions = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        debug!("pure-onnx-ocr returned {} text regions", regions.len());

        Ok(regions
            .iter()
            .map(|r| r.text.replace("[UNK]", " "))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
