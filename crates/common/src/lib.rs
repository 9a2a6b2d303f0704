#![allow(clippy::uninlined_format_args)]

pub mod error;
pub mod resref;
pub mod stream;
pub mod util;
