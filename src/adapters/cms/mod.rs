pub mod client;

pub use client::CmsStore;
