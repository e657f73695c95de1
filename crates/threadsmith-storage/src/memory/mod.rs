//! In-process store backend

mod backend;

pub use backend::{LocalConfig, LocalStore};
pub(crate) use backend::MIN_TTL;
