//! Blob store backend implementations.

pub mod filesystem;

pub use filesystem::FilesystemStore;
