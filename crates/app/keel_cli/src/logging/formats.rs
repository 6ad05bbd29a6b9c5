use std::io::Write;

use flexi_logger::{DeferredNow, Record, style};

/// `LEVEL message`, coloured by level when the terminal supports it.
pub fn cli_format(
    w: &mut dyn Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    let level = record.level();
    write!(
        w,
        "{} {}",
        style(level).paint(format!("{level:<5}")),
        style(level).paint(record.args().to_string())
    )
}
