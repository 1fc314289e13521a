use anyhow::Result;
use nl_spl_engine::AppConfig;

fn main() -> Result<()> {
    let config = AppConfig::from_env();

    println!("Natural Language to SPL Engine - CLI Mode");
    println!("{}", "=".repeat(80));
    println!("Splunk:  {}", config.splunk.base_url());
    println!("Model:   {}", config.llm.model);
    match config.validate() {
        Ok(()) => println!("Config:  ok"),
        Err(e) => println!("Config:  {}", e),
    }
    println!();
    println!("Use the 'spl_server' binary for the HTTP API:");
    println!("  cargo run --bin spl_server");
    println!();
    println!("Use the 'spl_repl' binary to ask questions interactively:");
    println!("  cargo run --bin spl_repl");
    println!();

    Ok(())
}
