use std::io::Read;
use std::path::Path;

use eyre::WrapErr;
use serde::de::DeserializeOwned;

/// Reads JSON from `path`, or from stdin when no path (or `-`) is given.
pub fn read_json<T: DeserializeOwned>(path: Option<&Path>) -> eyre::Result<T> {
    let text = match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?,
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .wrap_err("failed to read stdin")?;
            text
        }
    };
    serde_json::from_str(&text).wrap_err("input is not valid JSON for this command")
}

/// Prints `value` as pretty JSON on stdout.
pub fn print_json(value: &impl serde::Serialize) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
