use std::fs;
use std::io;

/// Burn the version into a template: replace every occurrence of `token` in
/// the file at `template` with `version` and write the result to `output`,
/// overwriting whatever was there. Returns the number of occurrences that
/// were replaced; a template without the token is left as-is, which is fine.
pub fn stamp(template: &str, output: &str, token: &str, version: &str) -> io::Result<usize> {
    let text = fs::read_to_string(template)?;
    let count = text.matches(token).count();
    fs::write(output, text.replace(token, version))?;
    Ok(count)
}
