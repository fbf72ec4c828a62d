//! HTTP request handlers.

pub(crate) mod api;
pub(crate) mod pages;
pub(crate) mod search;
pub(crate) mod sidebar;
