pub mod face_analyzer;
pub mod face_embedding;
pub mod face_encoder;
pub mod face_matcher;
pub mod identity_encoder;
