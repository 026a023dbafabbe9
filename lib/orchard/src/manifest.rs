use std::fs;
use toml::{Table, Value};

/// Placeholder that gets replaced by the release version when stamping
/// templates, unless the manifest picks another one.
pub const DEFAULT_TOKEN: &str = "V_NUM";

/// The build manifest. Everything that used to be a hard-coded table lives
/// here so the composer and the disk builder can be exercised against
/// synthetic manifests.
#[derive(Debug)]
pub struct Manifest {
    /// Release version. Declared exactly once and shared by both stamp jobs.
    pub version: String,
    pub tools: Tools,
    pub help: Stamp,
    pub docs: Stamp,
    pub sources: Vec<Source>,
    pub packed: Vec<Packed>,
    pub image: Image,
    pub disk: Disk,
}

/// Paths of the external executables driven by the build.
#[derive(Debug)]
pub struct Tools {
    pub assembler: String,
    pub libdir: String,
    pub disk: String,
    pub packer: Option<String>,
}

/// One template-to-output stamping job.
#[derive(Debug)]
pub struct Stamp {
    pub template: String,
    pub output: String,
    pub token: String,
}

/// An assembly source together with its target load address. The address is
/// informational only: the assembler takes it from directives inside the
/// source itself.
#[derive(Debug)]
pub struct Source {
    pub file: String,
    pub address: u16,
}

/// A raster image to be run through the packer.
#[derive(Debug)]
pub struct Packed {
    pub source: String,
    pub output: String,
}

/// The system image: a template binary plus the segments overlaid on it.
#[derive(Debug)]
pub struct Image {
    pub template: String,
    /// Absolute address of the template's first byte.
    pub base: u16,
    pub output: String,
    pub segments: Vec<Segment>,
}

/// A compiled blob and the absolute address it must land on inside the
/// system image.
#[derive(Debug)]
pub struct Segment {
    pub file: String,
    pub address: u16,
}

/// Layout of the release disk image.
#[derive(Debug)]
pub struct Disk {
    pub output: String,
    pub size: String,
    pub filesystem: String,
    /// Volume name stem; the volume gets renamed to `{volume}_{version}`.
    pub volume: String,
    pub system: String,
    pub scenarios: String,
    pub basic: String,
    /// Extension (without the dot) that marks importable BASIC programs.
    /// Matched case-insensitively.
    pub basic_extension: String,
    /// Format identifier handed to the disk CLI's import command.
    pub basic_format: String,
}

impl Manifest {
    /// Read and parse the manifest at `path`.
    pub fn load(path: &str) -> Result<Manifest, String> {
        let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
        parse(&text)
    }
}

/// Parse the given blob of `text` as a build manifest.
pub fn parse(text: &str) -> Result<Manifest, String> {
    let root: Table = text
        .parse()
        .map_err(|e| format!("manifest is not valid TOML: {}", e))?;

    let version = match root.get("version") {
        Some(value) => value
            .as_str()
            .map(String::from)
            .ok_or_else(|| String::from("'version' must be a string"))?,
        None => return Err(String::from("missing 'version'")),
    };

    let tools = parse_tools(section(&root, "tools")?)?;
    let help = parse_stamp(section(&root, "help")?, "help")?;
    let docs = parse_stamp(section(&root, "docs")?, "docs")?;

    let mut sources = vec![];
    for record in records(&root, "source")? {
        sources.push(Source {
            file: string(record, "file", "source")?,
            address: address(record, "address", "source")?,
        });
    }

    let mut packed = vec![];
    for record in records(&root, "packed")? {
        packed.push(Packed {
            source: string(record, "source", "packed")?,
            output: string(record, "output", "packed")?,
        });
    }

    let image = parse_image(section(&root, "image")?)?;
    let disk = parse_disk(section(&root, "disk")?)?;

    Ok(Manifest {
        version,
        tools,
        help,
        docs,
        sources,
        packed,
        image,
        disk,
    })
}

fn parse_tools(table: &Table) -> Result<Tools, String> {
    Ok(Tools {
        assembler: string(table, "assembler", "tools")?,
        libdir: string(table, "libdir", "tools")?,
        disk: string(table, "disk", "tools")?,
        packer: optional_string(table, "packer", "tools")?,
    })
}

fn parse_stamp(table: &Table, name: &str) -> Result<Stamp, String> {
    Ok(Stamp {
        template: string(table, "template", name)?,
        output: string(table, "output", name)?,
        token: optional_string(table, "token", name)?
            .unwrap_or_else(|| String::from(DEFAULT_TOKEN)),
    })
}

fn parse_image(table: &Table) -> Result<Image, String> {
    let mut segments = vec![];
    for record in records(table, "segment")? {
        segments.push(Segment {
            file: string(record, "file", "image.segment")?,
            address: address(record, "address", "image.segment")?,
        });
    }

    Ok(Image {
        template: string(table, "template", "image")?,
        base: address(table, "base", "image")?,
        output: string(table, "output", "image")?,
        segments,
    })
}

fn parse_disk(table: &Table) -> Result<Disk, String> {
    Ok(Disk {
        output: string(table, "output", "disk")?,
        size: string(table, "size", "disk")?,
        filesystem: string(table, "filesystem", "disk")?,
        volume: string(table, "volume", "disk")?,
        system: string(table, "system", "disk")?,
        scenarios: string(table, "scenarios", "disk")?,
        basic: string(table, "basic", "disk")?,
        basic_extension: string(table, "basic-extension", "disk")?,
        basic_format: string(table, "basic-format", "disk")?,
    })
}

// Returns the sub-table under `name`, which has to exist.
fn section<'a>(root: &'a Table, name: &str) -> Result<&'a Table, String> {
    match root.get(name) {
        Some(value) => value
            .as_table()
            .ok_or_else(|| format!("'{}' must be a table", name)),
        None => Err(format!("missing the [{}] section", name)),
    }
}

// Returns the array of tables under `name`, or an empty list if the key is
// absent entirely.
fn records<'a>(root: &'a Table, name: &str) -> Result<Vec<&'a Table>, String> {
    let Some(value) = root.get(name) else {
        return Ok(vec![]);
    };
    let array = value
        .as_array()
        .ok_or_else(|| format!("'{}' must be an array of tables", name))?;

    array
        .iter()
        .map(|v| {
            v.as_table()
                .ok_or_else(|| format!("every '{}' entry must be a table", name))
        })
        .collect()
}

fn string(table: &Table, key: &str, section: &str) -> Result<String, String> {
    match table.get(key) {
        Some(value) => value
            .as_str()
            .map(String::from)
            .ok_or_else(|| format!("'{}' in [{}] must be a string", key, section)),
        None => Err(format!("missing '{}' in [{}]", key, section)),
    }
}

fn optional_string(table: &Table, key: &str, section: &str) -> Result<Option<String>, String> {
    match table.get(key) {
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| format!("'{}' in [{}] must be a string", key, section)),
        None => Ok(None),
    }
}

fn address(table: &Table, key: &str, section: &str) -> Result<u16, String> {
    match table.get(key) {
        Some(value) => parse_address(value, key, section),
        None => Err(format!("missing '{}' in [{}]", key, section)),
    }
}

// Addresses can be written either as plain integers or as '$XXXX' hex
// strings, the notation the assembly sources themselves use.
fn parse_address(value: &Value, key: &str, section: &str) -> Result<u16, String> {
    match value {
        Value::Integer(n) if (0..=0xFFFF).contains(n) => Ok(*n as u16),
        Value::String(s) => {
            let Some(hex) = s.strip_prefix('$') else {
                return Err(format!("malformed address '{}' in [{}]", s, section));
            };
            if hex.is_empty() || hex.len() > 4 {
                return Err(format!("malformed address '{}' in [{}]", s, section));
            }
            u16::from_str_radix(hex, 16)
                .map_err(|_| format!("malformed address '{}' in [{}]", s, section))
        }
        _ => Err(format!(
            "'{}' in [{}] must be an address ('$XXXX' or an integer)",
            key, section
        )),
    }
}
