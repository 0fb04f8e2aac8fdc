// Licensed under the Apache-2.0 license

// Enforce coding guidelines - prevent panic-prone patterns in production code only
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::indexing_slicing))]
#![cfg_attr(not(test), warn(clippy::expect_used))]
#![cfg_attr(not(test), no_std)]
pub mod app;
pub mod common;
pub mod i2c;
pub mod pinctrl;
pub mod registers;
pub mod syscon;
pub mod tests;
pub mod watchdog;
