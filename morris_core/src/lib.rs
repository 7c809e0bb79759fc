pub mod engine;
pub mod logic;
#[cfg(target_arch = "wasm32")]
pub mod worker;
