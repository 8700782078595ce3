fn main() {
    println!("cargo:rerun-if-env-changed=GATEKEEPER_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=GATEKEEPER_WIFI_PASSWORD");
    println!("cargo:rerun-if-env-changed=GATEKEEPER_ENDPOINT");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
