//! Interface adapters: the HTTP surface.

pub mod http;
