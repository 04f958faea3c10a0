fn main() {
    if let Err(err) = enginehealth_lib::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
