use std::sync::Arc;

use crate::{
    error::{TranslateError, ValidationError},
    model::TextModel,
};

pub fn translation_prompt(text: &str) -> String {
    format!(
        "Translate the following Manglish text into simple, natural-sounding English. \
Provide ONLY the English translation, with no extra phrases like 'The translation is:'. \
Manglish text: \"{text}\""
    )
}

/// Renders challenge text in plain English using the same model as the generator.
pub struct Translator<M: TextModel> {
    model: Arc<M>,
}

impl<M: TextModel> Translator<M> {
    pub fn new(model: Arc<M>) -> Self {
        Self { model }
    }

    pub async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        if text.is_empty() {
            return Err(ValidationError::MissingText.into());
        }

        log::info!("Translating {:?}", text);
        Ok(self.model.generate(&translation_prompt(text)).await?)
    }
}
