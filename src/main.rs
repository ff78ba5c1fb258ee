use tracing_subscriber::EnvFilter;

fn main() {
    // Log to stderr so encoder output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = svtenc::cli::parse();
    svtenc::app::run(cli);
}
