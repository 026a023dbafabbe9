use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use orchard::compose::{self, Policy};
use orchard::manifest::Manifest;
use orchard::process::System;
use orchard::toolchain::Toolchain;
use orchard::{assemble, disk, pack, stamp};

/// Build the release disk image: stamp the version into the generated
/// sources, assemble the 6502 modules, pack the splash screens, compose the
/// system image and hand everything over to the disk-image CLI.
#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Build manifest to be used. Defaults to 'build.toml' in the current
    /// directory.
    manifest: Option<String>,

    /// Fail when two segments of the system image cover a common byte range,
    /// instead of letting the later one win.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let path = args.manifest.unwrap_or(String::from("build.toml"));
    let manifest = Manifest::load(&path).map_err(|e| anyhow!(e))?;

    // Make sure the external tools are all there before touching anything.
    let toolchain = Toolchain::locate(&manifest.tools)
        .context("install the required build tools and rerun the build")?;

    let mut runner = System;

    println!("Generating 6502 source code...");
    stamp::stamp(
        &manifest.help.template,
        &manifest.help.output,
        &manifest.help.token,
        &manifest.version,
    )
    .with_context(|| format!("failed to generate '{}'", manifest.help.output))?;

    println!("Assembling 6502 source code...");
    assemble::assemble_sources(
        &mut runner,
        &toolchain.assembler,
        &toolchain.libdir,
        &manifest.sources,
    )
    .context("assembling")?;

    println!("Compressing splash screen images...");
    pack::pack_images(&mut runner, toolchain.packer.as_deref(), &manifest.packed)
        .context("compressing")?;

    println!("Building the system image...");
    let policy = if args.strict {
        Policy::Strict
    } else {
        Policy::Overwrite
    };
    compose::compose_image(&manifest.image, policy).context("composing the system image")?;

    println!("Generating documentation...");
    stamp::stamp(
        &manifest.docs.template,
        &manifest.docs.output,
        &manifest.docs.token,
        &manifest.version,
    )
    .with_context(|| format!("failed to generate '{}'", manifest.docs.output))?;

    println!("Building the release disk image...");
    disk::build_disk(
        &mut runner,
        &toolchain.disk,
        &manifest.disk,
        &manifest.version,
        &manifest.image.output,
    )
    .context("building the disk image")?;

    println!("Build v{} complete.", manifest.version);
    Ok(())
}
