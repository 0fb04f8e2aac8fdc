// Licensed under the Apache-2.0 license

#[cfg(any(test, feature = "sim"))]
pub mod i2c_test;
