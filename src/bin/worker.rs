#[cfg(target_arch = "wasm32")]
fn main() {
    use gloo_worker::Registrable;

    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    morris_core::worker::SearchWorker::registrar().register();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    eprintln!("the search worker only runs in a browser; build it for wasm32");
}
