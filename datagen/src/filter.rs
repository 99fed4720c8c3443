use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::Error;

/// Turns the raw position file of a batch into the filtered one.
pub trait PositionFilter: Sync {
    fn run(&self, input: &Path, output: &Path) -> Result<(), Error>;
}

/// An external binary invoked as `<binary> -i <input> -o <output>`.
pub struct ExternalFilter {
    binary: String,
}

impl ExternalFilter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl PositionFilter for ExternalFilter {
    fn run(&self, input: &Path, output: &Path) -> Result<(), Error> {
        log::debug!(
            "Running {} -i {} -o {}",
            self.binary,
            input.display(),
            output.display()
        );

        let status = Command::new(&self.binary)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .stdin(Stdio::null())
            .status()
            .map_err(|source| Error::FilterSpawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !status.success() {
            return Err(Error::FilterFailed {
                binary: self.binary.clone(),
                status,
            });
        }

        Ok(())
    }
}
