use anyhow::Result;

fn main() -> Result<()> {
    chatvault::utils::init_tracing();
    chatvault::cli::run()
}
