pub mod upstream;
pub mod webhook;
