//! Serial communication
//!
//! - `transport`: the contract the reader loop depends on
//! - `serial`: the `serialport` backed implementation and port discovery
//! - `reader`: the controller handed out to callers
//! - `worker`: the loop that owns the device

pub mod reader;
pub mod serial;
pub mod transport;
mod worker;
