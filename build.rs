fn main() {
    println!("cargo:rerun-if-env-changed=GATEWAY_CONFIG");

    // ESP-IDF link arguments are only meaningful when cross-compiling for the
    // chip; host builds (tests) skip them.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
