//! The messaging fabric shared by every RoboOne process: a length-prefixed
//! request/response protocol over loopback TCP (spec.md §4.1, §6.1).

pub mod client;
pub mod server;
pub mod wire;

pub use client::{run_messaging_client, send_fire_and_forget, ClientReturnCode};
pub use server::{run_messaging_server, run_messaging_server_on, HandlerOutcome, ServerHandler, ServerReturnCode};
pub use wire::{Encode, Frame, ShortFrame};
