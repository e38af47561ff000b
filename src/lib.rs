#![warn(missing_docs)]

//! Library for the app rating endpoint.

pub mod config;
pub mod credential;
pub mod error;
pub mod error_response;
pub mod origin;
pub mod parameters;
pub mod response;
pub mod review;
pub mod sdk_error_ext;
pub mod store;
