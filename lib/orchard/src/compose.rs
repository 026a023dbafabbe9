use crate::errors::ComposeError;
use crate::manifest;
use std::fs;
use std::ops::Range;

/// What to do when two segments land on a common byte range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Policy {
    /// Later segments silently win. The stock layout relies on this: a
    /// region that the loader relocates at boot gets re-covered on purpose.
    Overwrite,

    /// Fail on the first detected overlap, naming both segments.
    Strict,
}

/// A compiled blob loaded in memory, ready to be overlaid.
#[derive(Debug)]
pub struct Segment {
    pub name: String,
    pub address: u16,
    pub bytes: Vec<u8>,
}

/// Overlay every segment onto `buffer`, whose first byte sits at the
/// absolute address `base`. Segments are applied in the given order and the
/// bounds of each one are checked before any byte of it is copied.
pub fn overlay(
    buffer: &mut [u8],
    base: u16,
    segments: &[Segment],
    policy: Policy,
) -> Result<(), ComposeError> {
    let mut covered: Vec<(&str, Range<usize>)> = vec![];

    for segment in segments {
        if segment.address < base {
            return Err(ComposeError::BelowBase {
                name: segment.name.clone(),
                address: segment.address,
                base,
            });
        }

        let offset = (segment.address - base) as usize;
        let end = offset + segment.bytes.len();
        if end > buffer.len() {
            return Err(ComposeError::PastEnd {
                name: segment.name.clone(),
                address: segment.address,
                len: segment.bytes.len(),
                size: buffer.len(),
            });
        }

        if policy == Policy::Strict {
            for (other, range) in &covered {
                if offset < range.end && range.start < end {
                    return Err(ComposeError::Overlap {
                        name: segment.name.clone(),
                        other: other.to_string(),
                    });
                }
            }
            covered.push((&segment.name, offset..end));
        }

        buffer[offset..end].copy_from_slice(&segment.bytes);
    }

    Ok(())
}

/// Build the system image: read the template, overlay every segment listed
/// in the manifest, and write the result to the configured output path.
pub fn compose_image(image: &manifest::Image, policy: Policy) -> Result<(), ComposeError> {
    let read = |path: &str| {
        fs::read(path).map_err(|source| ComposeError::Io {
            path: path.to_string(),
            source,
        })
    };

    let mut data = read(&image.template)?;

    let mut segments = Vec::with_capacity(image.segments.len());
    for segment in &image.segments {
        println!("Loading {} at ${:04X}", segment.file, segment.address);
        segments.push(Segment {
            name: segment.file.clone(),
            address: segment.address,
            bytes: read(&segment.file)?,
        });
    }

    overlay(&mut data, image.base, &segments, policy)?;

    fs::write(&image.output, &data).map_err(|source| ComposeError::Io {
        path: image.output.clone(),
        source,
    })?;
    println!("Wrote system image: {}", image.output);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(name: &str, address: u16, bytes: Vec<u8>) -> Segment {
        Segment {
            name: String::from(name),
            address,
            bytes,
        }
    }

    #[test]
    fn overlay_round_trip() {
        // The stock template spans $2000..$FF00.
        let mut buffer = vec![0xEEu8; 0xDD00];
        let segments = vec![segment("A.BIN", 0x2000, vec![0x42; 0x100])];

        overlay(&mut buffer, 0x2000, &segments, Policy::Overwrite).unwrap();

        assert!(buffer[..0x100].iter().all(|b| *b == 0x42));
        assert_eq!(buffer[0x100], 0xEE);
    }

    #[test]
    fn segments_land_at_their_offsets() {
        let mut buffer = vec![0u8; 0x400];
        let segments = vec![
            segment("A.BIN", 0x2100, vec![1, 2, 3]),
            segment("B.BIN", 0x23FD, vec![9, 9, 9]),
        ];

        overlay(&mut buffer, 0x2000, &segments, Policy::Overwrite).unwrap();

        assert_eq!(&buffer[0x100..0x103], &[1, 2, 3]);
        assert_eq!(&buffer[0x3FD..], &[9, 9, 9]);
    }

    #[test]
    fn later_segments_win_on_overlap() {
        let mut buffer = vec![0u8; 0x100];
        let segments = vec![
            segment("FIRST.BIN", 0x2000, vec![0x11; 0x20]),
            segment("SECOND.BIN", 0x2010, vec![0x22; 0x20]),
        ];

        overlay(&mut buffer, 0x2000, &segments, Policy::Overwrite).unwrap();

        assert!(buffer[..0x10].iter().all(|b| *b == 0x11));
        assert!(buffer[0x10..0x30].iter().all(|b| *b == 0x22));
        assert!(buffer[0x30..].iter().all(|b| *b == 0x00));
    }

    #[test]
    fn strict_policy_rejects_overlaps() {
        let mut buffer = vec![0u8; 0x100];
        let segments = vec![
            segment("FIRST.BIN", 0x2000, vec![0x11; 0x20]),
            segment("SECOND.BIN", 0x2010, vec![0x22; 0x20]),
        ];

        let err = overlay(&mut buffer, 0x2000, &segments, Policy::Strict).unwrap_err();

        match err {
            ComposeError::Overlap { name, other } => {
                assert_eq!(name, "SECOND.BIN");
                assert_eq!(other, "FIRST.BIN");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn strict_policy_accepts_adjacent_segments() {
        let mut buffer = vec![0u8; 0x100];
        let segments = vec![
            segment("FIRST.BIN", 0x2000, vec![0x11; 0x20]),
            segment("SECOND.BIN", 0x2020, vec![0x22; 0x20]),
        ];

        overlay(&mut buffer, 0x2000, &segments, Policy::Strict).unwrap();
    }

    #[test]
    fn address_below_base_is_rejected() {
        let mut buffer = vec![0u8; 0x100];
        let segments = vec![segment("LOW.BIN", 0x1FFF, vec![0x11])];

        let err = overlay(&mut buffer, 0x2000, &segments, Policy::Overwrite).unwrap_err();

        assert_eq!(
            err.to_string(),
            "segment 'LOW.BIN' at $1FFF lies below the image base $2000"
        );
    }

    #[test]
    fn segment_past_the_end_is_rejected() {
        let mut buffer = vec![0u8; 0x100];
        let segments = vec![segment("BIG.BIN", 0x20FF, vec![0x11, 0x22])];

        let err = overlay(&mut buffer, 0x2000, &segments, Policy::Overwrite).unwrap_err();

        assert!(matches!(err, ComposeError::PastEnd { .. }));
        // Nothing was copied: bounds are checked before writing.
        assert!(buffer.iter().all(|b| *b == 0));
    }

    #[test]
    fn compose_image_writes_the_composed_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = |name: &str| dir.path().join(name).to_string_lossy().into_owned();

        std::fs::write(path("orig.bin"), vec![0u8; 0x200]).unwrap();
        std::fs::write(path("A.BIN"), [0x42; 0x10]).unwrap();

        let image = manifest::Image {
            template: path("orig.bin"),
            base: 0x2000,
            output: path("SYSTEM.OUT"),
            segments: vec![manifest::Segment {
                file: path("A.BIN"),
                address: 0x2100,
            }],
        };

        compose_image(&image, Policy::Overwrite).unwrap();

        let data = std::fs::read(path("SYSTEM.OUT")).unwrap();
        assert_eq!(data.len(), 0x200);
        assert!(data[0x100..0x110].iter().all(|b| *b == 0x42));
        assert!(data[..0x100].iter().all(|b| *b == 0x00));
    }

    #[test]
    fn compose_image_reports_missing_segment_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = |name: &str| dir.path().join(name).to_string_lossy().into_owned();

        std::fs::write(path("orig.bin"), vec![0u8; 0x200]).unwrap();

        let image = manifest::Image {
            template: path("orig.bin"),
            base: 0x2000,
            output: path("SYSTEM.OUT"),
            segments: vec![manifest::Segment {
                file: path("MISSING.BIN"),
                address: 0x2000,
            }],
        };

        let err = compose_image(&image, Policy::Overwrite).unwrap_err();
        assert!(matches!(err, ComposeError::Io { .. }));
    }
}
