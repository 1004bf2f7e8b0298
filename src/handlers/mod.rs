//! Request handlers, one module per resource.

pub mod accounts;
pub mod categories;
pub mod todos;
