// SPDX-License-Identifier: MIT

//! Middleware modules (session gateway, security headers).

pub mod security;
pub mod session;

pub use session::{session_gateway, CurrentIdentity};
