pub mod cipher;
pub mod config;
pub mod engine;
pub mod host;
pub mod names;
pub mod playback;
pub mod responses;
pub mod substitution;
pub mod tokenizer;
