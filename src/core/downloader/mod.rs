mod client;

pub use client::{disambiguate, file_name_from_url, Downloader};
