fn main() {
    // Set up logging; RUST_LOG controls verbosity
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if let Err(err) = aoi_studio::cli::run(&args) {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}
