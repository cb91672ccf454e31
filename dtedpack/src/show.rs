use crate::options::Show;
use anyhow::{Context, Result};
use coverage::index;

impl Show {
    pub fn run(&self) -> Result<()> {
        let index = index::read(&self.index)
            .with_context(|| format!("reading index {}", self.index.display()))?;
        println!("Version: {}", index.version);
        println!("Timestamp: {} ms since epoch", index.timestamp);
        for row in index.grid.rows() {
            let line: String = row.iter().map(|&cell| char::from(b'0' + cell)).collect();
            println!("{line}");
        }
        Ok(())
    }
}
