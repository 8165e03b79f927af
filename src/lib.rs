pub mod auth;
pub mod aws;
pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod constants;
pub mod error;
pub mod idp;
pub mod login;
pub mod saml;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
