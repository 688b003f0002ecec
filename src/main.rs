fn main() {
    if let Err(err) = evsync_core::app::run() {
        eprintln!("application startup failed: {err}");
        std::process::exit(1);
    }
}
