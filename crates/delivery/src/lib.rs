//! Splitting local artifacts into size-bounded parts and delivering them in
//! order over a channel, with a fixed pause between sends.

pub mod error;
pub mod scheduler;
pub mod split;

pub use {
    error::{Error, Result},
    scheduler::{
        Deliverable, DeliveryOutcome, DeliveryPlan, DeliveryPolicy, DeliveryReport,
        DeliveryScheduler,
    },
    split::{Chunk, ChunkSet, part_path, split_file},
};
