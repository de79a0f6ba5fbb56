fn main() {
    // The desktop shell only builds on Windows; elsewhere main() is a stub.
    if std::env::var_os("CARGO_CFG_WINDOWS").is_some() {
        tauri_build::build();
    }
}
