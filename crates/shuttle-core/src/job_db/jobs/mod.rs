//! Job CRUD, split by direction, plus aggregate statistics.

mod read;
mod stats;
mod write;
