//! Lanewise command-line entry point.

fn main() -> anyhow::Result<()> {
    lanewise::cli::run()
}
