//! Core abstractions for Daybook: the task data model and the key-value
//! storage contract.

pub mod storage;
pub mod tasks;
