use crate::errors::StepError;
use crate::manifest::Source;
use crate::process::{run_checked, Runner};

/// Assemble every source in declared order. The assembler is invoked with
/// the library directory as its first argument, exactly like a by-hand run;
/// the first failing source aborts the whole batch with the tool's captured
/// output attached.
pub fn assemble_sources(
    runner: &mut dyn Runner,
    assembler: &str,
    libdir: &str,
    sources: &[Source],
) -> Result<(), StepError> {
    for source in sources {
        println!("Assembling: {} @ ${:04X}", source.file, source.address);

        run_checked(
            runner,
            assembler,
            &[libdir.to_string(), source.file.clone()],
        )
        .map_err(|e| StepError::Tool {
            subject: source.file.clone(),
            source: e,
        })?;
    }

    Ok(())
}
