fn main() {
    if let Err(err) = catalog_prep::run() {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
