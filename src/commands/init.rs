use camino::Utf8Path;
use dependagraph::Result;
use dependagraph::config::Config;

pub fn init_config(output: &Utf8Path) -> Result<()> {
    Config::save_default(output)?;
    println!("Generated default configuration file: {output}");
    Ok(())
}
