#![forbid(unsafe_code)]

use propbind_core::convert::BindingConverter;
use propbind_core::error::ConversionError;

/// Parses text into numbers and formats numbers back to text.
///
/// `None` and non-numeric text fail to convert.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextToNumberConverter;

impl BindingConverter<Option<String>, i32> for TextToNumberConverter {
    fn source_to_target(&self, value: Option<String>) -> Result<i32, ConversionError> {
        let text = value.ok_or_else(|| ConversionError::new::<i32>("expected text, found none"))?;
        text.trim()
            .parse::<i32>()
            .map_err(|e| ConversionError::new::<i32>(format!("{text:?}: {e}")))
    }

    fn target_to_source(&self, value: i32) -> Result<Option<String>, ConversionError> {
        Ok(Some(value.to_string()))
    }
}

/// The reverse pairing: numbers on the source side, text on the target side.
///
/// Formatting never fails; parsing text back fails like
/// [`TextToNumberConverter`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NumberToTextConverter;

impl BindingConverter<i32, Option<String>> for NumberToTextConverter {
    fn source_to_target(&self, value: i32) -> Result<Option<String>, ConversionError> {
        TextToNumberConverter.target_to_source(value)
    }

    fn target_to_source(&self, value: Option<String>) -> Result<i32, ConversionError> {
        TextToNumberConverter.source_to_target(value)
    }
}
