//! CSV files written under a temporary name and renamed into place.
//!
//! A reader never sees a half-written file under its final name: the content
//! goes to `temp` first and is renamed to `target` only after it has been
//! flushed. On failure the temporary file is removed.
//!
//! Records are serialized as UTF-8 and transcoded to the configured
//! [`Encoding`] when the file is written.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use encoding_rs::{SHIFT_JIS, UTF_8};
use tracing::{debug, warn};

use super::error::OutputError;
use crate::config::Encoding;

/// UTF-8 byte-order mark.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV writer handed to the content callback.
pub type CsvWriter = csv::Writer<Vec<u8>>;

fn codec(encoding: Encoding) -> &'static encoding_rs::Encoding {
    match encoding {
        Encoding::Cp932 => SHIFT_JIS,
        Encoding::Utf8 | Encoding::Utf8Sig => UTF_8,
    }
}

/// Writes a CSV file via `temp` and renames it to `target`.
///
/// An existing `target` is replaced.
///
/// # Errors
///
/// Returns [`OutputError`] if creating, writing or renaming fails, or if
/// `write` fails.
pub fn write_csv_atomically<F>(
    temp: &Path,
    target: &Path,
    encoding: Encoding,
    write: F,
) -> Result<(), OutputError>
where
    F: FnOnce(&mut CsvWriter) -> Result<(), csv::Error>,
{
    if let Err(error) = write_csv(temp, encoding, write) {
        discard(temp);
        return Err(error);
    }
    std::fs::rename(temp, target).map_err(|e| {
        discard(temp);
        OutputError::io(target, e)
    })?;
    debug!(path = %target.display(), %encoding, "file committed");
    Ok(())
}

fn write_csv<F>(path: &Path, encoding: Encoding, write: F) -> Result<(), OutputError>
where
    F: FnOnce(&mut CsvWriter) -> Result<(), csv::Error>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    write(&mut writer).map_err(|e| OutputError::csv(path, e))?;
    let utf8 = writer
        .into_inner()
        .map_err(|e| OutputError::io(path, e.into_error()))?;

    let text = String::from_utf8_lossy(&utf8);
    let (encoded, _, unmappable) = codec(encoding).encode(&text);
    if unmappable {
        warn!(
            path = %path.display(),
            %encoding,
            "characters without a mapping were written as numeric references"
        );
    }

    let mut file = File::create(path).map_err(|e| OutputError::io(path, e))?;
    if encoding.writes_bom() {
        file.write_all(UTF8_BOM)
            .map_err(|e| OutputError::io(path, e))?;
    }
    file.write_all(&encoded)
        .map_err(|e| OutputError::io(path, e))?;
    file.sync_all().map_err(|e| OutputError::io(path, e))
}

/// Removes a temporary file, ignoring a missing file.
pub fn discard(temp: &Path) {
    match std::fs::remove_file(temp) {
        Ok(()) => debug!(path = %temp.display(), "temporary file removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %temp.display(), error = %e, "failed to remove temporary file"),
    }
}

/// Reads a whole CSV file written in `encoding`.
///
/// A leading byte-order mark is dropped (and selects UTF-8 regardless of
/// `encoding`). Records may have any number of fields; undecodable bytes
/// are replaced.
///
/// # Errors
///
/// Returns [`OutputError`] if the file cannot be read or parsed.
pub fn read_csv_records(
    path: &Path,
    encoding: Encoding,
) -> Result<Vec<Vec<String>>, OutputError> {
    let bytes = std::fs::read(path).map_err(|e| OutputError::io(path, e))?;
    let (text, used, malformed) = codec(encoding).decode(&bytes);
    if malformed {
        warn!(path = %path.display(), encoding = used.name(), "undecodable bytes replaced");
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| OutputError::csv(path, e))?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(records)
}
