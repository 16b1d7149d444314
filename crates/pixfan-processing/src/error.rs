use pixfan_core::PipelineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode {format} image: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    #[error("Image has no pixels")]
    EmptyImage,
}

impl From<ProcessingError> for PipelineError {
    fn from(err: ProcessingError) -> Self {
        PipelineError::ImageProcessing(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_to_image_processing() {
        let err: PipelineError = ProcessingError::Decode("truncated".to_string()).into();
        match err {
            PipelineError::ImageProcessing(msg) => assert!(msg.contains("truncated")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
