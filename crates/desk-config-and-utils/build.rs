fn main() {
    // option_env!() values are cached by cargo unless declared here.
    println!("cargo:rerun-if-env-changed=ORDERSDESK_API_URL");
}
