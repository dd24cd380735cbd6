use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds (tests, simulation) need nothing from here
    let target = env::var("TARGET").unwrap_or_default();
    if !target.contains("avr") {
        return;
    }

    if env::var("CARGO_FEATURE_ATMEGA128").is_ok() {
        println!("cargo:rustc-link-arg=-mmcu=atmega128");
    }
}
