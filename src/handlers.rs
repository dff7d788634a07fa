mod consumer;
mod storage;

pub use self::{
    consumer::ConsumerHandler,
    storage::{StorageHandler, StorageMode},
};
