use proctree::{cli, logger};

fn main() {
    if let Err(err) = logger::init_logger() {
        eprintln!("Warning: failed to initialize logger: {err}");
    }

    let res = cli::run();
    if let Err(err) = res {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
