pub mod channels;
pub mod config;
pub mod cursor;
pub mod daily;
pub mod lock;
pub mod render;
pub mod rows;
pub mod sync;
pub mod threads;
pub mod timestamp;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;
