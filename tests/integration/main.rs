//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises the gateway against mock
//! peripherals.  All tests run on the host with no real hardware required.

mod gateway_flow_tests;
mod mock_hw;
mod worker_tests;
