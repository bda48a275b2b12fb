use once_cell::sync::OnceCell;
use onnxruntime::{environment::Environment, session::Session};
use std::cell::RefCell;
use tokenizers::{Tokenizer, TruncationParams};

use crate::assets::ModelAssets;
use crate::SemanticError;

static ORT_ENV: OnceCell<Environment> = OnceCell::new();

/// Tokenizer and ONNX session for one model, ready to run.
pub(crate) struct LoadedModel {
    pub(crate) tokenizer: Tokenizer,
    pub(crate) session: RefCell<Session<'static>>,
}

impl LoadedModel {
    pub(crate) fn load(
        assets: &ModelAssets,
        max_sequence_length: usize,
    ) -> Result<Self, SemanticError> {
        let mut tokenizer = Tokenizer::from_file(&assets.tokenizer_path)
            .map_err(|e| SemanticError::Inference(e.to_string()))?;
        // Batch padding is done by hand so the attention mask matches the tensor exactly.
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_sequence_length,
                ..Default::default()
            }))
            .map_err(|e| SemanticError::InvalidConfig(e.to_string()))?;

        let env = ort_environment()?;
        let session = env
            .new_session_builder()
            .map_err(|e| SemanticError::Inference(e.to_string()))?
            .with_model_from_file(assets.model_path.clone())
            .map_err(|e| SemanticError::Inference(e.to_string()))?;

        Ok(Self {
            tokenizer,
            session: RefCell::new(session),
        })
    }

    /// Names of the inputs the ONNX graph declares, in order.
    pub(crate) fn input_names(&self) -> Vec<String> {
        self.session
            .borrow()
            .inputs
            .iter()
            .map(|input| input.name.clone())
            .collect()
    }
}

fn ort_environment() -> Result<&'static Environment, SemanticError> {
    ORT_ENV.get_or_try_init(|| {
        Environment::builder()
            .with_name("sentvec")
            .build()
            .map_err(|e| SemanticError::Inference(e.to_string()))
    })
}
