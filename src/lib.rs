#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::uninlined_format_args
)]

pub mod compose;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod layout;
pub mod router;
pub mod server;
pub mod signature;
pub mod template;

pub use config::Config;
