//! Schema - JSON Schema → 정규화된 파라미터 모델
//!
//! Providers declare tool inputs with loosely written JSON Schema documents.
//! [`normalize`] folds them into the closed [`NormalizedSchema`] model that
//! stub generation consumes.

mod normalize;

pub use normalize::{normalize, NormalizedSchema, Property, ScalarKind};
