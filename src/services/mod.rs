pub mod blob_service;
pub mod memory_storage;
pub mod storage;
