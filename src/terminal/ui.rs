use std::io::{self, Write};

use crate::domain::message::MessageDetail;
use crate::mail::session::BatchDetails;

pub fn print_ids<W: Write>(out: &mut W, ids: &[String]) -> io::Result<()> {
    writeln!(out, "Email IDs:")?;
    for id in ids {
        writeln!(out, "{id}")?;
    }
    Ok(())
}

/// `ID`, then Subject/From in the order the message carries them, then the snippet.
pub fn print_detail<W: Write>(out: &mut W, m: &MessageDetail) -> io::Result<()> {
    writeln!(out, "ID: {}", m.id)?;
    for h in &m.headers {
        if h.name == "Subject" || h.name == "From" {
            writeln!(out, "{}: {}", h.name, h.value)?;
        }
    }
    writeln!(out, "Snippet: {}\n", m.snippet)
}

pub fn print_batch<W: Write>(out: &mut W, batch: &BatchDetails) -> io::Result<()> {
    writeln!(out, "Email Details:")?;
    for m in &batch.details {
        print_detail(out, m)?;
    }
    if !batch.failures.is_empty() {
        writeln!(out, "({} message(s) could not be fetched)", batch.failures.len())?;
    }
    Ok(())
}
