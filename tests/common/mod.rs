#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
mod helpers;

pub use helpers::{init_test_tracing, write_document, FakePfctl};
