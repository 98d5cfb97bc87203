//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives the whole core against
//! mock adapters.  All tests run on the host with no radio or ADC.

mod lifecycle_tests;
mod mock_hw;
mod scenario_tests;
