// Library root: re-exports the app modules so the binary and tests share
// one command protocol and event loop.

pub mod app;
pub mod input;
pub mod protocol;
pub mod render;
