//! Bakes Wi-Fi credentials from `.env` (or the environment) into the binary.

fn main() {
    // A missing .env is fine as long as the variables are set some other way
    let _ = dotenvy::dotenv();

    for key in ["WIFI_SSID", "WIFI_PASSWORD"] {
        println!("cargo:rerun-if-env-changed={key}");
        match std::env::var(key) {
            Ok(value) => println!("cargo:rustc-env={key}={value}"),
            Err(_) => println!("cargo:warning={key} is not set; Wi-Fi will not associate"),
        }
    }
    println!("cargo:rerun-if-changed=.env");
}
