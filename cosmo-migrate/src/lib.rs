pub mod args;
pub mod backend;
pub mod error;
pub mod expand;
#[cfg(test)]
mod fakes;
pub mod files;
pub mod secret;
