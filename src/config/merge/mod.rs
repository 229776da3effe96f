pub(crate) mod policy;
pub mod service;
