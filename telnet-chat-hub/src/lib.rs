//! Line-oriented TCP chat hub you can talk to with `telnet` or `nc`.
//!
//! Every line a client sends is rebroadcast to all connected clients as
//! `Client {id} > {line}`. Ids are handed out in accept order starting at 0
//! and are never reused.
//!
//! - [`cli`] parses the listen address and the accept-failure policy.
//! - [`server`] runs the accept loop over a bound listener and starts the
//!   hub.
//! - [`hub`] is the single task that owns membership and fans out broadcasts.
//! - [`reader`] runs one line-reading task per client.
//! - [`membership`] holds the member table and id counter owned by the hub.
//! - [`frame`] reads raw lines and encodes tagged broadcast frames.

pub mod cli;
pub mod frame;
pub mod hub;
pub mod membership;
pub mod reader;
pub mod server;
