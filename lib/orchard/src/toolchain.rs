use crate::errors::MissingTools;
use crate::manifest::Tools;
use std::path::Path;

/// The external tools the build depends on, checked to exist on disk. The
/// packer is optional: a missing one only matters if there are packed images
/// left to generate.
#[derive(Debug)]
pub struct Toolchain {
    pub assembler: String,
    pub libdir: String,
    pub disk: String,
    pub packer: Option<String>,
}

impl Toolchain {
    /// Check every tool path declared in the manifest. All missing required
    /// tools are reported at once so they can be installed in a single go.
    pub fn locate(tools: &Tools) -> Result<Self, MissingTools> {
        let mut missing = vec![];
        for path in [&tools.assembler, &tools.libdir, &tools.disk] {
            if !Path::new(path).exists() {
                missing.push(path.clone());
            }
        }
        if !missing.is_empty() {
            return Err(MissingTools { paths: missing });
        }

        let packer = match &tools.packer {
            Some(path) if Path::new(path).exists() => Some(path.clone()),
            Some(path) => {
                eprintln!(
                    "warning: optional build tool '{}' could not be found and will not be used",
                    path
                );
                None
            }
            None => None,
        };

        Ok(Toolchain {
            assembler: tools.assembler.clone(),
            libdir: tools.libdir.clone(),
            disk: tools.disk.clone(),
            packer,
        })
    }
}
