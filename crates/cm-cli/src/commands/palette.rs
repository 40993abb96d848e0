use anyhow::{Context, Result};
use cm_core::PALETTE;

pub fn print_palette(json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(&PALETTE).context("serialize palette")?;
        println!("{out}");
        return Ok(());
    }
    for c in PALETTE.iter() {
        println!("name={} hex={} description={}", c.name, c.hex, c.description);
    }
    Ok(())
}
