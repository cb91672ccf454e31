use crate::options::Validate;
use anyhow::{Context, Result};
use coverage::index;

impl Validate {
    pub fn run(&self) -> Result<()> {
        index::validate(&self.index)
            .with_context(|| format!("index {} failed validation", self.index.display()))?;
        println!("{} is a valid coverage index", self.index.display());
        Ok(())
    }
}
