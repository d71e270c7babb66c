use anyhow::Result;
use mgc_config::Config;
use std::path::Path;

/// Load the config and build everything a run would, without reading input.
pub fn handle(path: &Path) -> Result<()> {
    let config = Config::load(path)?;
    let chain = mgc_engine::obfuscators(&config)?;
    let omit = mgc_engine::omitters(&config)?;

    println!("✓ {} is valid", path.display());
    println!("  Workers: {}", config.workers);
    println!("  Obfuscators ({}):", chain.len());
    for (entry, report) in config.obfuscate.iter().zip(chain.reports()) {
        println!(
            "    {} [{:?}, {:?}]",
            report.kind,
            entry.replacement_mode(),
            entry.target
        );
    }
    println!("  Omission rules: {}", omit.len());

    Ok(())
}
