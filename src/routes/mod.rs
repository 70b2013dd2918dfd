//! Router Module Index
//!
//! Organizes the routes by access level. Access control is attached per module in
//! `create_router`, so a handler cannot end up exposed by being registered in the
//! wrong place.

/// Routes open to anonymous clients: health, login and registration.
pub mod public;

/// Routes behind the session gate. Anonymous requests are redirected to `/login`.
pub mod authenticated;

/// Routes that additionally require the ADMIN role.
pub mod admin;
