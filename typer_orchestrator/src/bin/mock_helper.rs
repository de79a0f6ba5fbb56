//! Stand-in for the typing helper. Invoked as `mock_helper <script>`, it
//! reads the request from the temp directory and "types" it into
//! `mock_typed.txt`, honoring the stop signal between characters.
//!
//! The script argument is a `key=value` file: `char_delay_ms`, `exit_code`,
//! `ignore_stop`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;
use typer_protocol::{REQUEST_FILE_NAME, STOP_FILE_NAME};

const TYPED_FILE_NAME: &str = "mock_typed.txt";

fn read_settings(path: &Path) -> HashMap<String, String> {
    let Ok(text) = fs::read_to_string(path) else {
        return HashMap::new();
    };
    text.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

fn setting<T: std::str::FromStr>(settings: &HashMap<String, String>, key: &str, default: T) -> T {
    settings
        .get(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--version") {
        println!("mock_helper {}", env!("CARGO_PKG_VERSION"));
        return;
    }
    let Some(script) = args.get(1) else {
        eprintln!("usage: mock_helper <script>");
        std::process::exit(2);
    };

    let settings = read_settings(Path::new(script));
    let delay = Duration::from_millis(setting(&settings, "char_delay_ms", 0u64));
    let exit_code = setting(&settings, "exit_code", 0i32);
    let ignore_stop = setting(&settings, "ignore_stop", false);

    let dir = std::env::temp_dir();
    let request = match fs::read_to_string(dir.join(REQUEST_FILE_NAME)) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("reading request failed: {e}");
            std::process::exit(1);
        }
    };

    let stop_path = dir.join(STOP_FILE_NAME);
    let mut typed = String::new();
    let mut stopped = false;
    for ch in request.chars() {
        if !ignore_stop && stop_path.exists() {
            stopped = true;
            break;
        }
        typed.push(ch);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    if let Err(e) = fs::write(dir.join(TYPED_FILE_NAME), &typed) {
        eprintln!("recording typed text failed: {e}");
    }
    if stopped {
        println!("stopped after {} chars", typed.chars().count());
        return;
    }
    println!("{typed}");
    std::process::exit(exit_code);
}
