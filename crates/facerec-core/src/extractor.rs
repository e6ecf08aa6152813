//! Embedding extraction seam and uploaded-picture helpers.

use std::path::Path;

use thiserror::Error;

use crate::detector::DetectorError;
use crate::recognizer::RecognizerError;
use crate::types::Embedding;

/// File extensions accepted as pictures (compared lower-cased).
pub const PICTURE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("could not find any face in the given training image")]
    NoFace,
    #[error("found more than one face in the given training image ({count} faces)")]
    MultipleFaces { count: usize },
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

impl ExtractError {
    /// True when the failure is caused by the submitted image rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExtractError::Decode(_) | ExtractError::NoFace | ExtractError::MultipleFaces { .. }
        )
    }
}

/// Turns an encoded image into one embedding per detected face.
///
/// Implementations may hold inference sessions that need exclusive access,
/// hence `&mut self`. Embeddings are returned in detection order.
pub trait Extractor: Send {
    fn embed(&mut self, image: &[u8]) -> Result<Vec<Embedding>, ExtractError>;
}

impl<E: Extractor + ?Sized> Extractor for Box<E> {
    fn embed(&mut self, image: &[u8]) -> Result<Vec<Embedding>, ExtractError> {
        (**self).embed(image)
    }
}

/// Extract the embedding of an image that must contain exactly one face.
pub fn embed_single<E: Extractor + ?Sized>(
    extractor: &mut E,
    image: &[u8],
) -> Result<Embedding, ExtractError> {
    let mut faces = extractor.embed(image)?;
    match faces.len() {
        0 => Err(ExtractError::NoFace),
        1 => Ok(faces.remove(0)),
        count => Err(ExtractError::MultipleFaces { count }),
    }
}

/// Whether a filename carries one of the accepted picture extensions.
pub fn is_picture(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            PICTURE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Enrollment label for a reference picture: the file name without directory or extension.
pub fn label_for(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

/// Deterministic extractor for tests.
///
/// The image bytes are read as text: faces separated by `;`, values by `,`.
/// Blank input has no faces.
#[cfg(test)]
pub(crate) struct FakeExtractor;

#[cfg(test)]
impl Extractor for FakeExtractor {
    fn embed(&mut self, image: &[u8]) -> Result<Vec<Embedding>, ExtractError> {
        let text = std::str::from_utf8(image).map_err(|e| ExtractError::Decode(e.to_string()))?;
        text.split(';')
            .map(str::trim)
            .filter(|face| !face.is_empty())
            .map(|face| {
                face.split(',')
                    .map(|v| v.trim().parse::<f32>())
                    .collect::<Result<Vec<_>, _>>()
                    .map(Embedding::new)
                    .map_err(|e| ExtractError::Decode(e.to_string()))
            })
            .collect()
    }
}
