//! GLiNER span-mode engine, built with the `gliner` feature.

use std::path::PathBuf;
use std::time::Instant;

use gliner::model::GLiNER;
use gliner::model::input::text::TextInput;
use gliner::model::params::Parameters;
use gliner::model::pipeline::span::SpanMode;
use orp::params::RuntimeParameters;
use parking_lot::Mutex;
use tracing::info;

use crate::{NerEngine, NerError, NerSpan, Result};

/// Files and threshold for a local GLiNER model.
#[derive(Debug, Clone)]
pub struct GlinerConfig {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    /// Spans scoring below this are dropped by the model itself.
    pub threshold: f32,
}

/// Local ONNX inference. The model needs `&mut` to run, so calls are
/// serialized on a mutex.
pub struct GlinerEngine {
    model: Mutex<GLiNER<SpanMode>>,
}

impl GlinerEngine {
    pub fn new(config: &GlinerConfig) -> Result<Self> {
        for path in [&config.model_path, &config.tokenizer_path] {
            if !path.is_file() {
                return Err(NerError::ModelLoad(format!(
                    "{} does not exist",
                    path.display()
                )));
            }
        }

        let started = Instant::now();
        let model = GLiNER::<SpanMode>::new(
            Parameters::default().with_threshold(config.threshold),
            RuntimeParameters::default(),
            &config.tokenizer_path,
            &config.model_path,
        )
        .map_err(|e| NerError::ModelLoad(e.to_string()))?;
        info!(
            model = %config.model_path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "GLiNER model loaded"
        );

        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl NerEngine for GlinerEngine {
    fn extract(&self, text: &str, labels: &[&str]) -> Result<Vec<NerSpan>> {
        let input = TextInput::from_str(&[text], labels)
            .map_err(|e| NerError::Inference(format!("bad input: {e}")))?;
        let output = self
            .model
            .lock()
            .inference(input)
            .map_err(|e| NerError::Inference(e.to_string()))?;

        // One input text, so one batch.
        Ok(output
            .spans
            .into_iter()
            .flatten()
            .map(|span| NerSpan {
                text: span.text().to_string(),
                label: span.class().to_string(),
                score: span.probability(),
            })
            .collect())
    }

    fn name(&self) -> &str {
        "gliner"
    }
}
