//! facerec-core — Face enrollment registry and identification.
//!
//! Holds enrolled `(embedding, label)` pairs in memory and finds the closest
//! one for each face found in an uploaded image. Embeddings come from an
//! [`Extractor`]; the bundled [`OnnxExtractor`] runs SCRFD detection and
//! ArcFace recognition on CPU.

pub mod alignment;
pub mod detector;
pub mod extractor;
pub mod onnx;
pub mod recognizer;
pub mod registry;
pub mod types;

pub use extractor::{embed_single, is_picture, ExtractError, Extractor};
pub use onnx::{default_model_dir, OnnxExtractor};
pub use registry::{detect_faces, LoadError, LoadPolicy, Registry, RegistryError};
pub use types::{BoundingBox, Detection, Embedding, Enrollment, EuclideanMatcher, MatchResult, Matcher};
