//! Storage abstractions for the lead slot
//!
//! A string-keyed, string-valued store in the shape of browser local storage,
//! with an in-memory backend and a JSON-file backend.

pub mod kv;
pub mod memory;
pub mod json_file_kv;

pub use kv::KvBackend;
pub use memory::MemoryKv;
pub use json_file_kv::JsonFileKv;
