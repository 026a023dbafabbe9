use crate::errors::StepError;
use crate::manifest::Disk;
use crate::process::{run_checked, Runner};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;

/// Catalog notes the disk CLI keeps next to the files it manages. They must
/// not end up on the release image.
const FILE_INFORMATION: &str = "_FileInformation.txt";

/// Delete `path` if it is there. A file that never existed is fine; any
/// other failure (permissions, say) is reported instead of swallowed.
pub fn remove_stale(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Produce the release disk image by driving the disk CLI: create the image,
/// rename its volume to carry the version, add the system files and the
/// composed system image, add the scenario directories, and import the BASIC
/// programs. Any failing invocation aborts the sequence with the tool's
/// captured output; files written by earlier steps are left as they are.
pub fn build_disk(
    runner: &mut dyn Runner,
    cli: &str,
    disk: &Disk,
    version: &str,
    system_image: &str,
) -> Result<(), StepError> {
    let output = Path::new(&disk.output);
    remove_stale(output).map_err(|e| io_error(output, e))?;

    println!(
        "Creating {} ({}, {})",
        disk.output, disk.size, disk.filesystem
    );
    run(
        runner,
        cli,
        &disk.output,
        &["create-disk-image", &disk.output, &disk.size, &disk.filesystem],
    )?;

    let volume = format!("{}_{}", disk.volume, version);
    run(runner, cli, &volume, &["rename", &disk.output, ":", &volume])?;

    let info = Path::new(&disk.system).join(FILE_INFORMATION);
    remove_stale(&info).map_err(|e| io_error(&info, e))?;

    println!("Adding system files from {}", disk.system);
    run(
        runner,
        cli,
        &disk.system,
        &["add", "--strip-paths", &disk.output, &disk.system],
    )?;
    run(
        runner,
        cli,
        system_image,
        &["add", "--strip-paths", &disk.output, system_image],
    )?;

    println!("Adding scenarios from {}", disk.scenarios);
    run(
        runner,
        cli,
        &disk.scenarios,
        &["add", &disk.output, &disk.scenarios],
    )?;
    rename_scenarios(runner, cli, disk)?;

    import_basic(runner, cli, disk)?;

    Ok(())
}

// Directory names carry a trailing '.' on the target filesystem, so every
// scenario directory gets renamed to its dotted form on the image.
fn rename_scenarios(runner: &mut dyn Runner, cli: &str, disk: &Disk) -> Result<(), StepError> {
    let dir = Path::new(&disk.scenarios);

    for entry in fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
        let entry = entry.map_err(|e| io_error(dir, e))?;
        if !entry.file_type().map_err(|e| io_error(dir, e))?.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let from = format!("{}/{}", disk.scenarios, name);
        let to = format!("{}/{}.", disk.scenarios, name);
        run(runner, cli, &from, &["rename", &disk.output, &from, &to])?;
        println!("Renamed: {}", from);
    }

    Ok(())
}

// The import tool infers the program type from the absence of an extension,
// so every program gets imported through an extension-less temporary copy
// which is cleaned up right after.
fn import_basic(runner: &mut dyn Runner, cli: &str, disk: &Disk) -> Result<(), StepError> {
    let suffix = format!(".{}", disk.basic_extension.to_uppercase());
    let dir = Path::new(&disk.basic);

    for entry in fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
        let entry = entry.map_err(|e| io_error(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.to_uppercase().ends_with(&suffix) {
            continue;
        }
        let stem = &name[..name.len() - suffix.len()];

        let temp = dir.join(stem);
        remove_stale(&temp).map_err(|e| io_error(&temp, e))?;
        fs::copy(entry.path(), &temp).map_err(|e| io_error(&temp, e))?;

        let imported = format!("{}/{}", disk.basic, stem);
        run(
            runner,
            cli,
            &name,
            &[
                "import",
                "--strip-paths",
                &disk.output,
                &disk.basic_format,
                &imported,
            ],
        )?;

        fs::remove_file(&temp).map_err(|e| io_error(&temp, e))?;
        println!("Imported: {}/{} as {}", disk.basic, name, stem);
    }

    Ok(())
}

fn run(
    runner: &mut dyn Runner,
    cli: &str,
    subject: &str,
    args: &[&str],
) -> Result<(), StepError> {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();

    run_checked(runner, cli, &args)
        .map(|_| ())
        .map_err(|source| StepError::Tool {
            subject: subject.to_string(),
            source,
        })
}

fn io_error(path: &Path, source: io::Error) -> StepError {
    StepError::Io {
        path: path.display().to_string(),
        source,
    }
}
