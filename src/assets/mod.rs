//! Media ingestion: image decode, the asset library, audio and fonts.

pub mod audio;
pub mod decode;
pub mod store;
pub mod svg;
pub mod text;
