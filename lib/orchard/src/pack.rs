use crate::errors::StepError;
use crate::manifest::Packed;
use crate::process::{run_checked, Runner};
use std::path::Path;

/// Run the packer over every raster image whose packed output does not exist
/// yet. Outputs that are already there are kept as-is, so a re-run does not
/// pay for the compression again.
pub fn pack_images(
    runner: &mut dyn Runner,
    packer: Option<&str>,
    images: &[Packed],
) -> Result<(), StepError> {
    for image in images {
        if Path::new(&image.output).exists() {
            continue;
        }

        // The packer is an optional tool, so its absence only matters now
        // that there is an output left to generate.
        let Some(packer) = packer else {
            return Err(StepError::MissingPacker {
                output: image.output.clone(),
            });
        };

        run_checked(
            runner,
            packer,
            &[
                String::from("-c"),
                image.source.clone(),
                image.output.clone(),
            ],
        )
        .map_err(|e| StepError::Tool {
            subject: image.source.clone(),
            source: e,
        })?;

        println!("Generated: {}", image.output);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake::Recorder;
    use std::fs;

    fn job(dir: &tempfile::TempDir, source: &str, output: &str) -> Packed {
        Packed {
            source: dir.path().join(source).to_string_lossy().into_owned(),
            output: dir.path().join(output).to_string_lossy().into_owned(),
        }
    }

    #[test]
    fn packs_missing_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![job(&dir, "splash.hgr", "splash.fgr")];
        let mut runner = Recorder::new();

        pack_images(&mut runner, Some("fhpackd"), &images).unwrap();

        assert_eq!(runner.calls.len(), 1);
        assert_eq!(runner.calls[0].0, "fhpackd");
        assert_eq!(
            runner.calls[0].1,
            &[
                String::from("-c"),
                images[0].source.clone(),
                images[0].output.clone()
            ]
        );
    }

    #[test]
    fn existing_outputs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![
            job(&dir, "splash.hgr", "splash.fgr"),
            job(&dir, "play.hgr", "play.fgr"),
        ];
        fs::write(&images[0].output, b"packed").unwrap();

        let mut runner = Recorder::new();
        pack_images(&mut runner, Some("fhpackd"), &images).unwrap();

        // Only the second pair was generated.
        assert_eq!(runner.calls.len(), 1);
        assert!(runner.calls[0].1[1].ends_with("play.hgr"));
    }

    #[test]
    fn missing_packer_only_matters_with_work_to_do() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![job(&dir, "splash.hgr", "splash.fgr")];

        let mut runner = Recorder::new();
        let err = pack_images(&mut runner, None, &images).unwrap_err();
        assert!(matches!(err, StepError::MissingPacker { .. }));
        assert_eq!(runner.calls.len(), 0);

        // With the output in place the absence of the tool is irrelevant.
        fs::write(&images[0].output, b"packed").unwrap();
        pack_images(&mut runner, None, &images).unwrap();
        assert_eq!(runner.calls.len(), 0);
    }

    #[test]
    fn a_failing_packer_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![
            job(&dir, "splash.hgr", "splash.fgr"),
            job(&dir, "play.hgr", "play.fgr"),
        ];

        let mut runner = Recorder::failing_at(0, "");
        let err = pack_images(&mut runner, Some("fhpackd"), &images).unwrap_err();

        assert_eq!(runner.calls.len(), 1);
        assert!(err.to_string().contains("splash.hgr"));
    }
}
