#![allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]

mod ask_tell;
mod builder;
mod summary;
mod workflow;
