//! Interactive day view of application usage.
//!
//! Usage intervals reported by a tracker are aggregated into a ranked list, projected onto a
//! single-day timeline and combined with hover and disclosure state into a [LayoutModel] that a
//! presenter draws.
//!
//! [LayoutModel]: dashboard::layout::LayoutModel

pub mod cli;
pub mod dashboard;
pub mod hotkey;
pub mod interaction;
pub mod source;
pub mod timeline;
pub mod usage;
pub mod utils;
