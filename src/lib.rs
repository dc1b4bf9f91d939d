#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links
)]
#![forbid(non_ascii_idents, unsafe_code)]
#![warn(
    deprecated_in_future,
    missing_debug_implementations,
    missing_docs,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications
)]

mod cell;
pub mod config;
pub mod error;
pub mod executor;
pub mod handle;
mod queue;
#[cfg(feature = "rt_tokio_1")]
#[cfg_attr(docsrs, doc(cfg(feature = "rt_tokio_1")))]
pub mod runtime;
#[cfg(feature = "sync")]
#[cfg_attr(docsrs, doc(cfg(feature = "sync")))]
pub mod sync;
pub mod storage;
pub mod time;

#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub mod r#async;

pub use crate::config::PoolConfig;
pub use crate::error::Error;
pub use crate::handle::Handle;
